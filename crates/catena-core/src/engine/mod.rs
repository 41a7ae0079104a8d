//! Grid-engine contract consumed by the evolution steps, plus the built-in
//! walker engine implementing it.
//!
//! The orchestrator never reimplements raster analysis; every slope, flow,
//! or solver call goes through this trait and any failure surfaces as a
//! [`EngineError`] that aborts the run.

pub mod surface;
pub mod walkers;

use crate::error::EngineError;
use crate::raster::Raster;

/// Slope/aspect/partial-derivative decomposition of an elevation surface.
///
/// Slope is in radians; aspect is the flow direction angle (radians,
/// counter-clockwise from +x) such that `(cos aspect, sin aspect)` is the
/// unit vector of steepest descent. `dx`/`dy` are first derivatives,
/// `dxx`/`dyy` second derivatives.
#[derive(Debug, Clone)]
pub struct SurfaceDerivatives {
    pub slope: Raster,
    pub aspect: Raster,
    pub dx: Raster,
    pub dy: Raster,
    pub dxx: Raster,
    pub dyy: Raster,
}

/// Raster analysis and hydrologic/sediment solvers delegated by the
/// evolution loop. All calls are synchronous.
pub trait GridEngine {
    /// Decompose elevation into slope, aspect, and partial derivatives.
    fn slope_aspect(&self, elev: &Raster) -> Result<SurfaceDerivatives, EngineError>;

    /// Upstream contributing area per cell, in cells (including the cell
    /// itself).
    fn flow_accumulate(&self, elev: &Raster) -> Result<Raster, EngineError>;

    /// Fill closed depressions so every cell drains.
    fn fill_sinks(&self, elev: &Raster) -> Result<Raster, EngineError>;

    /// Stochastic overland-flow solver: water depth (m) under a constant
    /// effective rainfall `forcing_mm_hr`, sampled with `walkers` particle
    /// paths on a worker pool of `threads`.
    fn simulate_hydrology(
        &self,
        elev: &Raster,
        forcing_mm_hr: f64,
        mannings: f64,
        walkers: usize,
        threads: usize,
    ) -> Result<Raster, EngineError>;

    /// Sediment-transport solver: net erosion-deposition rate
    /// (kg·m⁻²·s⁻¹, negative = erosion) from the water depth and surface
    /// derivatives.
    #[allow(clippy::too_many_arguments)]
    fn simulate_sediment_transport(
        &self,
        elev: &Raster,
        depth: &Raster,
        derivs: &SurfaceDerivatives,
        detachment: f64,
        transport: f64,
        shear_stress: f64,
        mannings: f64,
    ) -> Result<Raster, EngineError>;
}

/// Built-in engine: Horn-gradient surface analysis, D8 accumulation,
/// Planchon–Darboux depression filling, and a stochastic walker solver.
#[derive(Debug, Default, Clone, Copy)]
pub struct WalkerEngine;

impl WalkerEngine {
    pub fn new() -> Self {
        Self
    }
}

impl GridEngine for WalkerEngine {
    fn slope_aspect(&self, elev: &Raster) -> Result<SurfaceDerivatives, EngineError> {
        surface::slope_aspect(elev)
    }

    fn flow_accumulate(&self, elev: &Raster) -> Result<Raster, EngineError> {
        surface::flow_accumulate(elev)
    }

    fn fill_sinks(&self, elev: &Raster) -> Result<Raster, EngineError> {
        surface::fill_sinks(elev)
    }

    fn simulate_hydrology(
        &self,
        elev: &Raster,
        forcing_mm_hr: f64,
        mannings: f64,
        walkers: usize,
        threads: usize,
    ) -> Result<Raster, EngineError> {
        walkers::simulate_hydrology(elev, forcing_mm_hr, mannings, walkers, threads)
    }

    fn simulate_sediment_transport(
        &self,
        elev: &Raster,
        depth: &Raster,
        derivs: &SurfaceDerivatives,
        detachment: f64,
        transport: f64,
        shear_stress: f64,
        mannings: f64,
    ) -> Result<Raster, EngineError> {
        walkers::simulate_sediment_transport(
            elev,
            depth,
            derivs,
            detachment,
            transport,
            shear_stress,
            mannings,
        )
    }
}
