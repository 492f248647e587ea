//! StockPulse Library
//!
//! Quote and sentiment aggregation service for the StockPulse stock
//! tracker: fetches price series from an external quote source, runs an
//! external sentiment scorer over them, and merges the results.

pub mod config;
pub mod pipeline;
pub mod process;
pub mod server;
pub mod types;
