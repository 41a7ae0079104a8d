//! Current terrain state: an elevation grid handle plus its timestamp.
//!
//! A state is immutable once created; each evolution step produces a new
//! state rather than mutating the old one, so a step's intermediate grids
//! can never alias the next step's input.

use crate::raster::Raster;
use chrono::NaiveDateTime;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct TerrainState {
    pub grid: Arc<Raster>,
    pub timestamp: NaiveDateTime,
}

impl TerrainState {
    /// State for the initial input elevation at the start of a run.
    pub fn initial(grid: Raster, timestamp: NaiveDateTime) -> Self {
        Self {
            grid: Arc::new(grid),
            timestamp,
        }
    }

    /// Successor state holding the evolved elevation.
    pub fn advance(&self, grid: Raster, timestamp: NaiveDateTime) -> Self {
        Self {
            grid: Arc::new(grid),
            timestamp,
        }
    }
}
