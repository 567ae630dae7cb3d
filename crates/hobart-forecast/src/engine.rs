//! Forecast engine
//!
//! Training pairs a filing at time `t` with the same registrant's next
//! filing at `t+1`: growth of the input quantities at `t` predicts growth of
//! the output quantities at `t+1`. Each output quantity has its own network.
//!
//! Every `train` call recomputes the column statistics from its own batch
//! and returns them as a [`ModelVersion`]. Batches are expected to arrive
//! chronologically; the networks keep learning across calls while the
//! statistics always describe the latest batch.

use crate::config::ForecastConfig;
use crate::growth::{GrowthVector, GrowthVectorBuilder};
use crate::interpolate::Interpolator;
use crate::{ForecastError, Result};
use hobart_data::{
    DataError, FilingQuery, FilingSnapshot, FilingStore, FilerStatus, load_snapshots, snapshot,
};
use hobart_neural::NeuralNetwork;
use hobart_stats::{RobustStatistic, TrimConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, trace, warn};

/// Statistics produced by one training call.
///
/// Required by [`ForecastEngine::predict`]; a model from an earlier call is
/// rejected once the engine has been trained again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    engine: u64,
    version: u64,
    inputs: Vec<RobustStatistic>,
    outputs: Vec<RobustStatistic>,
}

impl ModelVersion {
    /// Identifier of the engine that produced this model
    pub const fn engine_id(&self) -> u64 {
        self.engine
    }

    /// Training call that produced this model, starting at 1
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Input column statistics, in input quantity order
    pub fn input_stats(&self) -> &[RobustStatistic] {
        &self.inputs
    }

    /// Output column statistics, in output quantity order
    pub fn output_stats(&self) -> &[RobustStatistic] {
        &self.outputs
    }
}

/// Result of a training call.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Statistics to predict with
    pub model: ModelVersion,
    /// Accession numbers of the filings whose pairs were trained on
    pub used: Vec<String>,
    /// Same-registrant consecutive pairs found in the batch
    pub candidates: usize,
}

/// A training pair after interpolation and normalization.
struct PreparedPair<'a> {
    accession: &'a str,
    input: Vec<f64>,
    targets: Vec<f64>,
}

/// A raw training pair
struct RawPair<'a> {
    current: &'a FilingSnapshot,
    input: GrowthVector,
    output: GrowthVector,
}

/// Per-quantity growth forecaster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastEngine {
    inputs: GrowthVectorBuilder,
    outputs: GrowthVectorBuilder,
    networks: Vec<NeuralNetwork>,
    config: ForecastConfig,
    id: u64,
    version: u64,
}

impl ForecastEngine {
    /// Create an untrained engine.
    ///
    /// Every output network has topology
    /// `[1 + inputs + 1, hidden_layers.., 1]`: the average deviation, the
    /// input columns and the filer status.
    ///
    /// # Errors
    /// Returns [`ForecastError::NoColumns`] when either quantity list is
    /// empty and [`ForecastError::InvalidConfig`] for a bad configuration.
    pub fn new<I, O, S, T>(inputs: I, outputs: O, config: ForecastConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        O: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        config.validate()?;

        let inputs = GrowthVectorBuilder::new(inputs);
        let outputs = GrowthVectorBuilder::new(outputs);
        if inputs.is_empty() || outputs.is_empty() {
            return Err(ForecastError::NoColumns);
        }

        let mut topology = Vec::with_capacity(config.hidden_layers.len() + 2);
        topology.push(inputs.len() + 2);
        topology.extend_from_slice(&config.hidden_layers);
        topology.push(1);

        let mut rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let networks = (0..outputs.len())
            .map(|_| NeuralNetwork::with_rng(&topology, &mut rng))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(?topology, networks = networks.len(), "Created forecast engine");

        Ok(Self {
            inputs,
            outputs,
            networks,
            config,
            id: rand::random(),
            version: 0,
        })
    }

    /// Input quantity names
    pub fn input_quantities(&self) -> &[String] {
        self.inputs.quantities()
    }

    /// Output quantity names
    pub fn output_quantities(&self) -> &[String] {
        self.outputs.quantities()
    }

    /// Input and output quantity names, inputs first, without duplicates
    pub fn quantities(&self) -> Vec<String> {
        let mut names = self.inputs.quantities().to_vec();
        for name in self.outputs.quantities() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Configuration
    pub const fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Random identifier stamped on every [`ModelVersion`] this engine
    /// produces
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Number of completed training calls
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Train on a batch of filings.
    ///
    /// `confidence` is the minimum fraction of input quantities a filing
    /// must report for its pair to be used.
    ///
    /// # Errors
    /// Returns [`ForecastError::InvalidConfig`] when `confidence` is outside
    /// `[0, 1]` and [`ForecastError::Stats`] when a column has too few
    /// usable values. Networks are untouched on error.
    pub fn train(&mut self, filings: &[FilingSnapshot], confidence: f64) -> Result<TrainingOutcome> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ForecastError::InvalidConfig(format!(
                "confidence must lie in [0, 1], got {confidence}"
            )));
        }

        let mut ordered: Vec<&FilingSnapshot> = filings.iter().collect();
        ordered.sort_by(|a, b| {
            (a.filing.cik, a.filing.filed, &a.filing.accession).cmp(&(
                b.filing.cik,
                b.filing.filed,
                &b.filing.accession,
            ))
        });

        let candidates: Vec<(&FilingSnapshot, &FilingSnapshot)> = ordered
            .windows(2)
            .filter(|w| w[0].cik() == w[1].cik())
            .map(|w| (w[0], w[1]))
            .collect();

        let max_missing = 1.0 - confidence;
        let raw: Vec<RawPair<'_>> = candidates
            .iter()
            .filter_map(|&(current, next)| {
                let input = self.inputs.build(current);
                let missing = input.iter().filter(|v| v.is_none()).count();
                if missing as f64 / input.len() as f64 > max_missing {
                    trace!(accession = current.accession(), missing, "Too many missing inputs");
                    return None;
                }

                let output = self.outputs.build(next);
                if output.iter().all(Option::is_none) {
                    trace!(accession = next.accession(), "No observed outputs");
                    return None;
                }

                Some(RawPair {
                    current,
                    input,
                    output,
                })
            })
            .collect();

        debug!(
            filings = filings.len(),
            candidates = candidates.len(),
            complete = raw.len(),
            "Built training pairs"
        );

        let trim = &self.config.trim;
        let inputs = column_statistics(
            self.inputs.quantities(),
            raw.iter().map(|p| &p.input),
            trim,
        )?;
        let outputs = column_statistics(
            self.outputs.quantities(),
            raw.iter().map(|p| &p.output),
            trim,
        )?;

        let ceiling = self.config.max_deviations;
        let input_interpolator = Interpolator::new(&inputs)?;
        let output_interpolator = Interpolator::new(&outputs)?;

        let mut prepared = Vec::with_capacity(raw.len());
        for pair in &raw {
            let (input, input_scores) = network_input(
                &input_interpolator,
                &pair.input,
                pair.current.filing.filer_status,
            )?;

            let output = output_interpolator.interpolate(&pair.output)?;
            let output_scores = output_interpolator.scores(&output)?;

            if input_scores
                .iter()
                .chain(&output_scores)
                .any(|z| z.is_nan() || z.abs() > ceiling)
            {
                trace!(accession = pair.current.accession(), "Pair exceeds deviation ceiling");
                continue;
            }

            prepared.push(PreparedPair {
                accession: pair.current.accession(),
                input,
                targets: output_scores.iter().map(|z| z / ceiling + 0.5).collect(),
            });
        }

        for _ in 0..self.config.epochs {
            for pair in &prepared {
                for (network, &target) in self.networks.iter_mut().zip(&pair.targets) {
                    network.backpropagate(&pair.input, &[target], self.config.learning_rate)?;
                }
            }
        }

        self.version += 1;
        let used: Vec<String> = prepared.iter().map(|p| p.accession.to_string()).collect();

        info!(
            version = self.version,
            candidates = candidates.len(),
            used = used.len(),
            discarded = candidates.len() - used.len(),
            "Trained forecast"
        );

        Ok(TrainingOutcome {
            model: ModelVersion {
                engine: self.id,
                version: self.version,
                inputs,
                outputs,
            },
            used,
            candidates: candidates.len(),
        })
    }

    /// Predict the growth of every output quantity in the period after
    /// `filing`.
    ///
    /// # Errors
    /// Returns [`ForecastError::ForeignModel`] when `model` came from another
    /// engine and [`ForecastError::StaleModel`] when it is not the result of
    /// the latest training call.
    pub fn predict(&self, model: &ModelVersion, filing: &FilingSnapshot) -> Result<Vec<f64>> {
        self.check_model(model)?;
        if model.outputs.len() != self.networks.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.networks.len(),
                actual: model.outputs.len(),
            });
        }

        let interpolator = Interpolator::new(&model.inputs)?;
        let raw = self.inputs.build(filing);
        let (input, _) = network_input(&interpolator, &raw, filing.filing.filer_status)?;

        let ceiling = self.config.max_deviations;
        self.networks
            .iter()
            .zip(&model.outputs)
            .map(|(network, stat)| -> Result<f64> {
                let out = network.execute(&input)?;
                Ok(stat.denormalize((out[0] - 0.5) * ceiling))
            })
            .collect()
    }

    /// Train on the filings of an industry loaded from `store`.
    pub fn train_industry<S: FilingStore + ?Sized>(
        &mut self,
        store: &S,
        query: &FilingQuery,
        confidence: f64,
    ) -> Result<TrainingOutcome> {
        let snapshots = load_snapshots(store, query, &self.quantities())?;
        info!(
            sic = query.sic,
            start = %query.start,
            end = %query.end,
            filings = snapshots.len(),
            "Loaded training filings"
        );
        self.train(&snapshots, confidence)
    }

    /// Predict from a registrant's most recent filing in `store`.
    ///
    /// # Errors
    /// Returns [`DataError::MissingData`] when the registrant has no filings.
    pub fn predict_latest<S: FilingStore + ?Sized>(
        &self,
        store: &S,
        model: &ModelVersion,
        cik: u64,
    ) -> Result<Vec<f64>> {
        let filing = store
            .latest_filing(cik)?
            .ok_or_else(|| DataError::MissingData {
                cik,
                reason: "No periodic filings".to_string(),
            })?;
        debug!(cik, accession = %filing.accession, "Predicting from latest filing");

        let snapshot = snapshot(store, filing, self.inputs.quantities())?;
        self.predict(model, &snapshot)
    }

    fn check_model(&self, model: &ModelVersion) -> Result<()> {
        if model.engine != self.id {
            return Err(ForecastError::ForeignModel {
                expected: self.id,
                actual: model.engine,
            });
        }
        if model.version != self.version {
            return Err(ForecastError::StaleModel {
                expected: self.version,
                actual: model.version,
            });
        }
        Ok(())
    }
}

/// The `limit` most commonly reported standard quantities of an industry.
pub fn select_input_quantities<S: FilingStore + ?Sized>(
    store: &S,
    sic: u32,
    limit: usize,
) -> Result<Vec<String>> {
    Ok(store
        .most_common_tags(sic, limit)?
        .into_iter()
        .map(|tag| tag.name)
        .collect())
}

/// A trained engine together with the model it was last trained into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedForecast {
    /// Engine with trained networks
    pub engine: ForecastEngine,
    /// Statistics of the latest training call
    pub model: ModelVersion,
}

impl TrainedForecast {
    /// Bundle an engine with its model.
    ///
    /// # Errors
    /// Returns [`ForecastError::ForeignModel`] or
    /// [`ForecastError::StaleModel`] when `model` is not the engine's latest.
    pub fn new(engine: ForecastEngine, model: ModelVersion) -> Result<Self> {
        engine.check_model(&model)?;
        Ok(Self { engine, model })
    }

    /// Predict output growth for `filing`.
    pub fn predict(&self, filing: &FilingSnapshot) -> Result<Vec<f64>> {
        self.engine.predict(&self.model, filing)
    }

    /// Write as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref()).map_err(DataError::Io)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    /// Read from JSON written by [`TrainedForecast::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref()).map_err(DataError::Io)?;
        let saved: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        Self::new(saved.engine, saved.model)
    }
}

/// Trimmed statistics of every column over the non-empty values.
fn column_statistics<'a>(
    names: &[String],
    vectors: impl Iterator<Item = &'a GrowthVector> + Clone,
    trim: &TrimConfig,
) -> Result<Vec<RobustStatistic>> {
    names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let sample: Vec<f64> = vectors.clone().filter_map(|v| v[j]).collect();
            RobustStatistic::with_config(&sample, trim)
                .inspect_err(|e| warn!(quantity = %name, error = %e, "Degenerate column"))
                .map_err(ForecastError::from)
        })
        .collect()
}

/// `[avg, z_1 .. z_n, filer status]` and the column scores `z_i`.
fn network_input(
    interpolator: &Interpolator<'_>,
    raw: &[Option<f64>],
    filer_status: FilerStatus,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let filled = interpolator.interpolate(raw)?;
    let scores = interpolator.scores(&filled)?;

    let mut input = Vec::with_capacity(scores.len() + 2);
    input.push(filled[0]);
    input.extend_from_slice(&scores);
    input.push(filer_status.ordinal() as f64);
    Ok((input, scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};
    use hobart_data::{Fact, Filing, FormType};
    use std::collections::BTreeMap;

    fn quarter_end(q: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 3, 31)
            .unwrap()
            .checked_add_days(Days::new(91 * q))
            .unwrap()
    }

    /// A filing for quarter `q` reporting quarterly revenue and cost for
    /// quarters `q` and `q - 1`.
    fn filing(cik: u64, q: u64, revenue: [f64; 2], costs: [f64; 2]) -> FilingSnapshot {
        let filing = Filing {
            accession: format!("{cik:010}-{q:02}"),
            cik,
            sic: 1311,
            form: FormType::TenQ,
            filer_status: FilerStatus::Accelerated,
            fiscal_period: None,
            fiscal_year: None,
            filed: quarter_end(q).checked_add_days(Days::new(40)).unwrap(),
        };
        let mut s = FilingSnapshot::new(filing, BTreeMap::new());
        s.push_fact("Revenues", Fact::new(quarter_end(q), 1, revenue[1]));
        s.push_fact("Revenues", Fact::new(quarter_end(q - 1), 1, revenue[0]));
        s.push_fact("Costs", Fact::new(quarter_end(q), 1, costs[1]));
        s.push_fact("Costs", Fact::new(quarter_end(q - 1), 1, costs[0]));
        s
    }

    fn batch() -> Vec<FilingSnapshot> {
        let growth = [1.02, 0.98, 1.05, 1.01, 0.97, 1.03, 1.00, 1.04];
        let mut filings = Vec::new();
        for cik in 1..=3u64 {
            let mut revenue = 100.0 * cik as f64;
            let mut costs = 80.0 * cik as f64;
            for q in 1..=8u64 {
                let g = growth[((q + cik) % 8) as usize];
                let h = growth[((q + 2 * cik) % 8) as usize];
                filings.push(filing(cik, q, [revenue, revenue * g], [costs, costs * h]));
                revenue *= g;
                costs *= h;
            }
        }
        filings
    }

    fn engine() -> ForecastEngine {
        let config = ForecastConfig {
            seed: Some(17),
            max_deviations: 4.0,
            ..Default::default()
        };
        ForecastEngine::new(["Revenues", "Costs"], ["Revenues"], config).unwrap()
    }

    #[test]
    fn test_network_topology() {
        let engine = engine();
        assert_eq!(engine.networks.len(), 1);
        assert_eq!(engine.networks[0].topology(), vec![4, 10, 1]);
        assert_eq!(engine.quantities(), vec!["Revenues", "Costs"]);
    }

    #[test]
    fn test_empty_quantities_rejected() {
        let result = ForecastEngine::new(
            Vec::<String>::new(),
            ["Revenues"],
            ForecastConfig::default(),
        );
        assert!(matches!(result, Err(ForecastError::NoColumns)));
    }

    #[test]
    fn test_train_then_predict() {
        let mut engine = engine();
        let filings = batch();
        let outcome = engine.train(&filings, 0.9).unwrap();

        // 3 registrants x 7 consecutive pairs
        assert_eq!(outcome.candidates, 21);
        assert!(!outcome.used.is_empty());
        assert_eq!(outcome.model.version(), 1);
        assert_eq!(outcome.model.input_stats().len(), 2);

        let prediction = engine.predict(&outcome.model, &filings[3]).unwrap();
        assert_eq!(prediction.len(), 1);
        assert!(prediction[0].is_finite());
    }

    #[test]
    fn test_last_filing_of_registrant_never_used() {
        let mut engine = engine();
        let filings = batch();
        let outcome = engine.train(&filings, 0.0).unwrap();

        for cik in 1..=3u64 {
            let last = format!("{cik:010}-08");
            assert!(!outcome.used.contains(&last));
        }
    }

    #[test]
    fn test_stale_model_rejected() {
        let mut engine = engine();
        let filings = batch();
        let first = engine.train(&filings, 0.9).unwrap().model;
        let second = engine.train(&filings, 0.9).unwrap().model;

        assert!(matches!(
            engine.predict(&first, &filings[0]),
            Err(ForecastError::StaleModel {
                expected: 2,
                actual: 1
            })
        ));
        assert!(engine.predict(&second, &filings[0]).is_ok());
        assert!(TrainedForecast::new(engine.clone(), first).is_err());
    }

    #[test]
    fn test_invalid_confidence() {
        let mut engine = engine();
        for confidence in [-0.1, 1.5, f64::NAN] {
            assert!(matches!(
                engine.train(&batch(), confidence),
                Err(ForecastError::InvalidConfig(_))
            ));
        }
        assert_eq!(engine.version(), 0);
    }

    #[test]
    fn test_degenerate_batch_leaves_networks_untouched() {
        let mut engine = engine();
        let before = engine.networks.clone();

        // A single filing per registrant yields no pairs
        let filings: Vec<FilingSnapshot> = batch().into_iter().step_by(8).collect();
        assert!(matches!(
            engine.train(&filings, 0.9),
            Err(ForecastError::Stats(_))
        ));
        assert_eq!(engine.networks, before);
        assert_eq!(engine.version(), 0);
    }

    fn accession(cik: u64, q: u64) -> String {
        format!("{cik:010}-{q:02}")
    }

    fn position(filings: &[FilingSnapshot], cik: u64, q: u64) -> usize {
        let accession = accession(cik, q);
        filings
            .iter()
            .position(|s| s.filing.accession == accession)
            .unwrap()
    }

    #[test]
    fn test_clean_batch_uses_every_pair() {
        let mut engine = engine();
        let outcome = engine.train(&batch(), 0.9).unwrap();
        assert_eq!(outcome.used.len(), outcome.candidates);
    }

    #[test]
    fn test_pair_with_missing_inputs_discarded() {
        let mut filings = batch();
        let i = position(&filings, 2, 3);
        filings[i].facts.remove("Costs");

        // Half the inputs missing exceeds the 10% allowance
        let outcome = engine().train(&filings, 0.9).unwrap();
        assert!(!outcome.used.contains(&accession(2, 3)));
        assert!(outcome.used.contains(&accession(2, 2)));
        assert_eq!(outcome.used.len(), outcome.candidates - 1);

        // ... but not a 50% allowance
        let outcome = engine().train(&filings, 0.5).unwrap();
        assert!(outcome.used.contains(&accession(2, 3)));
    }

    #[test]
    fn test_pair_without_outputs_discarded() {
        let mut filings = batch();
        let i = position(&filings, 1, 5);
        filings[i].facts.remove("Revenues");

        let outcome = engine().train(&filings, 0.0).unwrap();
        // Filing 4 predicts filing 5, which reports no revenue
        assert!(!outcome.used.contains(&accession(1, 4)));
        assert!(outcome.used.contains(&accession(1, 5)));
        assert!(outcome.used.contains(&accession(1, 3)));
    }

    #[test]
    fn test_pair_beyond_deviation_ceiling_discarded() {
        let mut filings = batch();
        let i = position(&filings, 3, 4);
        // Current-quarter revenue jumps fiftyfold
        filings[i].facts.get_mut("Revenues").unwrap()[0].value *= 50.0;

        let outcome = engine().train(&filings, 0.9).unwrap();
        // The jump is the output of pair 3 and the input of pair 4
        assert!(!outcome.used.contains(&accession(3, 3)));
        assert!(!outcome.used.contains(&accession(3, 4)));
        assert!(outcome.used.contains(&accession(3, 5)));
        assert_eq!(outcome.used.len(), outcome.candidates - 2);
    }

    #[test]
    fn test_model_from_other_engine_rejected() {
        let filings = batch();
        let mut first = engine();
        let mut second = engine();
        first.train(&filings, 0.9).unwrap();
        let foreign = second.train(&filings, 0.9).unwrap().model;

        assert_eq!(foreign.version(), first.version());
        assert_ne!(first.id(), second.id());
        assert!(matches!(
            first.predict(&foreign, &filings[0]),
            Err(ForecastError::ForeignModel { .. })
        ));
        assert!(TrainedForecast::new(first, foreign).is_err());
    }
}
