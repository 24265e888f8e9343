pub mod engine;
pub mod kpi;
/// Battery decision policies.
pub mod strategy;
/// Parallel capacity sweep.
pub mod sweep;
pub mod types;
