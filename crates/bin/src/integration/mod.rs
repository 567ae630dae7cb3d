//! Integration module for the command-line interface.
//!
//! Wires the EDGAR client, the filing store and the forecast engine together
//! and owns the default on-disk locations.

pub(crate) mod ingest;
pub(crate) mod store_manager;
