//! Free cash flow projection
//!
//! `FCF = revenue - costs - taxes - net investments - change in working capital`,
//! with every component grown by its predicted rate.

use crate::engine::{ForecastEngine, ModelVersion};
use crate::{ForecastError, Result};
use hobart_data::FilingStore;
use serde::{Deserialize, Serialize};

/// Output quantities a cash flow forecast must predict, in this order
pub const CASH_FLOW_QUANTITIES: [&str; 6] = [
    "Revenues",
    "CostsAndExpenses",
    "TaxesOther",
    "InvestmentIncomeNonOperating",
    "AssetsCurrent",
    "LiabilitiesCurrent",
];

/// Current values of the cash flow components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashFlowBase {
    /// Revenue
    pub revenue: f64,
    /// Operating costs and expenses
    pub costs: f64,
    /// Taxes
    pub taxes: f64,
    /// Net investments
    pub net_investments: f64,
    /// Current assets
    pub assets: f64,
    /// Current liabilities
    pub liabilities: f64,
}

/// Projected cash flow components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashFlowProjection {
    /// Projected revenue
    pub revenue: f64,
    /// Projected costs and expenses
    pub costs: f64,
    /// Projected taxes
    pub taxes: f64,
    /// Projected net investments
    pub net_investments: f64,
    /// Projected current assets
    pub assets: f64,
    /// Projected current liabilities
    pub liabilities: f64,
    /// Projected free cash flow
    pub free_cash_flow: f64,
}

impl CashFlowBase {
    /// Working capital
    pub fn working_capital(&self) -> f64 {
        self.assets - self.liabilities
    }

    /// Grow every component by its rate in `growth` (ordered as
    /// [`CASH_FLOW_QUANTITIES`]) and derive free cash flow.
    ///
    /// # Errors
    /// Returns [`ForecastError::DimensionMismatch`] unless `growth` has six
    /// entries.
    pub fn project(&self, growth: &[f64]) -> Result<CashFlowProjection> {
        let &[revenue, costs, taxes, investments, assets, liabilities] = growth else {
            return Err(ForecastError::DimensionMismatch {
                expected: CASH_FLOW_QUANTITIES.len(),
                actual: growth.len(),
            });
        };

        let revenue = revenue * self.revenue;
        let costs = costs * self.costs;
        let taxes = taxes * self.taxes;
        let net_investments = investments * self.net_investments;
        let assets = assets * self.assets;
        let liabilities = liabilities * self.liabilities;

        let working_capital_change = (assets - liabilities) - self.working_capital();
        let free_cash_flow = revenue - costs - taxes - net_investments - working_capital_change;

        Ok(CashFlowProjection {
            revenue,
            costs,
            taxes,
            net_investments,
            assets,
            liabilities,
            free_cash_flow,
        })
    }
}

/// Project a registrant's next-period cash flow from its latest filing.
///
/// # Errors
/// Returns [`ForecastError::InvalidConfig`] when the engine does not predict
/// exactly [`CASH_FLOW_QUANTITIES`].
pub fn project_cash_flow<S: FilingStore + ?Sized>(
    engine: &ForecastEngine,
    model: &ModelVersion,
    store: &S,
    cik: u64,
    base: &CashFlowBase,
) -> Result<CashFlowProjection> {
    if engine.output_quantities() != CASH_FLOW_QUANTITIES {
        return Err(ForecastError::InvalidConfig(format!(
            "cash flow forecast must predict {:?}, engine predicts {:?}",
            CASH_FLOW_QUANTITIES,
            engine.output_quantities()
        )));
    }

    let growth = engine.predict_latest(store, model, cik)?;
    base.project(&growth)
}
