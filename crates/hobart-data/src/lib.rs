#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod edgar;
pub mod error;
pub mod model;
pub mod sqlite;
pub mod store;

pub use error::{DataError, Result};
pub use model::{
    Balance, Fact, Filing, FilerStatus, FilingSnapshot, FiscalPeriod, FormType, PeriodKind,
    Registrant, TagMetadata,
};
pub use sqlite::{SqliteStore, StoreStats};
pub use store::{FilingQuery, FilingStore, MemoryStore, load_snapshots, snapshot};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
