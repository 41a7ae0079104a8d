//! The evolution loop: drives the chosen model over the time schedule,
//! feeding each step's evolved elevation into the next and registering
//! every produced grid in the output collection.
//!
//! Validation is eager: configuration and input problems surface before
//! anything is registered. A mid-loop engine or numeric failure aborts the
//! run with the failing step's index attached; grids registered by earlier
//! steps remain available through [`DynamicEvolution::series`].

use crate::driver::TimeDriver;
use crate::engine::GridEngine;
use crate::error::{EvolutionError, Result};
use crate::params::{ModelVariant, SimulationParameters};
use crate::raster::Raster;
use crate::series::TimeSeriesCollection;
use crate::state::TerrainState;
use chrono::NaiveDateTime;
use std::sync::Arc;

/// Output category names used when registering grids.
#[derive(Debug, Clone)]
pub struct OutputNames {
    pub elevation: String,
    pub depth: String,
    /// Erosion-deposition rate (SIMWE/USPED) or sediment flux (RUSLE).
    pub diagnostic: String,
    pub difference: String,
}

impl Default for OutputNames {
    fn default() -> Self {
        Self {
            elevation: "elevation".to_string(),
            depth: "depth".to_string(),
            diagnostic: "erdep".to_string(),
            difference: "difference".to_string(),
        }
    }
}

/// What a completed run reports back.
#[derive(Debug)]
pub struct RunSummary {
    /// Number of evolution steps executed.
    pub steps: usize,
    /// Final minus initial elevation over the whole run.
    pub net_difference: Raster,
    pub final_timestamp: NaiveDateTime,
}

/// Orchestrator owning the engine, configuration, time driver, and the
/// output collection for one simulation run.
pub struct DynamicEvolution<E: GridEngine> {
    engine: E,
    variant: ModelVariant,
    params: SimulationParameters,
    driver: TimeDriver,
    names: OutputNames,
    series: TimeSeriesCollection,
}

impl<E: GridEngine> DynamicEvolution<E> {
    pub fn new(
        engine: E,
        variant: ModelVariant,
        params: SimulationParameters,
        driver: TimeDriver,
    ) -> Self {
        Self {
            engine,
            variant,
            params,
            driver,
            names: OutputNames::default(),
            series: TimeSeriesCollection::new(),
        }
    }

    pub fn with_output_names(mut self, names: OutputNames) -> Self {
        self.names = names;
        self
    }

    /// Everything registered so far, including grids from steps completed
    /// before a mid-loop failure.
    pub fn series(&self) -> &TimeSeriesCollection {
        &self.series
    }

    pub fn into_series(self) -> TimeSeriesCollection {
        self.series
    }

    /// Run the full schedule against `initial` elevation.
    pub fn run(&mut self, initial: Raster) -> Result<RunSummary> {
        self.params.validate()?;
        self.driver.validate()?;
        if initial.data.is_empty() {
            return Err(EvolutionError::Input("initial elevation grid is empty".to_string()));
        }
        if !initial.all_finite() {
            return Err(EvolutionError::Input(
                "initial elevation grid contains non-finite cells".to_string(),
            ));
        }

        let schedule = self.driver.schedule();
        let mut state = TerrainState::initial(initial, self.driver.initial_timestamp());
        let initial_grid = Arc::clone(&state.grid);
        self.series
            .register(&self.names.elevation, state.timestamp, Arc::clone(&state.grid))?;

        let mut prev_depth: Option<Arc<Raster>> = None;
        for (i, point) in schedule.iter().enumerate() {
            let step = i + 1;

            // Ponded-depth feedback: water standing on the surface from the
            // previous step adds to this step's effective intensity.
            let feedback = prev_depth
                .as_ref()
                .map(|d| d.mean() / 1000.0 / self.params.rain_interval * 60.0)
                .unwrap_or(0.0);
            let intensity = point.base_intensity + feedback;

            let (next, bundle) = self
                .variant
                .step(&self.engine, &state, &self.params, intensity, point.timestamp)
                .map_err(|e| e.at_step(step))?;

            let depth = Arc::new(bundle.depth);
            self.series
                .register(&self.names.depth, point.timestamp, Arc::clone(&depth))?;
            self.series
                .register(&self.names.diagnostic, point.timestamp, Arc::new(bundle.diagnostic))?;
            self.series
                .register(&self.names.difference, point.timestamp, Arc::new(bundle.difference))?;
            self.series
                .register(&self.names.elevation, point.timestamp, Arc::clone(&next.grid))?;

            prev_depth = Some(depth);
            state = next;
        }

        let net_difference = state.grid.zip_map(&initial_grid, |a, b| a - b);
        Ok(RunSummary {
            steps: schedule.len(),
            net_difference,
            final_timestamp: state.timestamp,
        })
    }
}
