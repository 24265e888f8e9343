//! Battery energy storage simulator for renewable plants on the spot market.

pub mod config;
pub mod devices;
pub mod error;
/// Result file writers.
pub mod io {
    pub mod export;
}
pub mod prices;
pub mod profile;
pub mod scenario;
pub mod series;
/// Simulation engine, decision policies, KPIs and the capacity sweep.
pub mod sim;
