//! Rainfall-driven terrain evolution: SIMWE, USPED, and RUSLE erosion
//! models stepped over an event or observed-precipitation schedule.
//!
//! The entry point is [`DynamicEvolution`]: give it a [`GridEngine`], a
//! [`ModelVariant`], the coefficient set, and a [`TimeDriver`], then run it
//! against an initial elevation raster. Every grid a run produces lands in
//! a [`TimeSeriesCollection`] keyed by category and timestamp.

pub mod driver;
pub mod engine;
pub mod error;
pub mod evolution;
pub mod kernels;
pub mod models;
pub mod params;
pub mod precip;
pub mod raster;
pub mod series;
pub mod state;

pub use driver::{PrecipRecord, SchedulePoint, TimeDriver};
pub use engine::{GridEngine, SurfaceDerivatives, WalkerEngine};
pub use error::{EngineError, EvolutionError, NumericError, Result, StepError};
pub use evolution::{DynamicEvolution, OutputNames, RunSummary};
pub use models::DiagnosticBundle;
pub use params::{ModelVariant, SimulationParameters};
pub use precip::{parse_precipitation, read_precipitation};
pub use raster::Raster;
pub use series::TimeSeriesCollection;
pub use state::TerrainState;
