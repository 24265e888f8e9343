//! Physical components: the storage model and the generation/demand sources.

/// Stationary battery storage model.
pub mod battery;
/// Renewable source scaling.
pub mod source;
pub mod types;

pub use battery::{Battery, BatteryCommand, BatteryOutcome, BatteryParams};
pub use source::{EnergySource, SourceKind};
