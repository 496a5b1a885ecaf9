//! Air zone achievement and management level classification.
//!
//! Turns per-station pollutant metrics and per-zone ambient categories into
//! labeled, colored map layers: one per regulatory metric (1-hour and annual).

pub mod classify;
pub mod config;
pub mod ingest;
pub mod layers;
pub mod levels;
pub mod logging;
pub mod model;
pub mod pipeline;
