//! The three governing erosion models, dispatched once per run on
//! [`ModelVariant`]. Each step consumes the current terrain state and
//! produces a successor state plus the transient diagnostic grids; nothing
//! here mutates a registered grid.

pub mod rusle;
pub mod simwe;
pub mod usped;

use crate::engine::GridEngine;
use crate::error::{NumericError, StepError};
use crate::kernels;
use crate::params::{ModelVariant, SimulationParameters};
use crate::raster::Raster;
use crate::state::TerrainState;
use chrono::NaiveDateTime;

/// Per-step transient output: persisted immediately by the orchestrator,
/// never retained across steps.
#[derive(Debug)]
pub struct DiagnosticBundle {
    /// Water depth (SIMWE) or accumulation-based depth proxy (USPED/RUSLE),
    /// in metres.
    pub depth: Raster,
    /// Principal diagnostic: erosion-deposition rate (SIMWE/USPED) or
    /// sediment flux (RUSLE).
    pub diagnostic: Raster,
    /// Evolved minus previous elevation.
    pub difference: Raster,
}

impl ModelVariant {
    /// Advance the terrain by one rainfall interval.
    pub fn step<E: GridEngine>(
        self,
        engine: &E,
        state: &TerrainState,
        params: &SimulationParameters,
        rain_intensity: f64,
        timestamp: NaiveDateTime,
    ) -> Result<(TerrainState, DiagnosticBundle), StepError> {
        let (next, bundle) = match self {
            ModelVariant::Simwe => simwe::step(engine, state, params, rain_intensity)?,
            ModelVariant::Usped => usped::step(engine, state, params, rain_intensity)?,
            ModelVariant::Rusle => rusle::step(engine, state, params, rain_intensity)?,
        };
        ensure_shape(&state.grid, &next, "evolved elevation")?;
        Ok((state.advance(next, timestamp), bundle))
    }
}

/// Grid dimensions and resolution are constant across the whole run.
pub(crate) fn ensure_shape(
    reference: &Raster,
    grid: &Raster,
    name: &'static str,
) -> Result<(), NumericError> {
    if !reference.same_shape(grid) {
        return Err(NumericError::new(
            name,
            format!(
                "shape changed: {}×{} @ {} vs {}×{} @ {}",
                grid.width, grid.height, grid.cellsize,
                reference.width, reference.height, reference.cellsize
            ),
        ));
    }
    Ok(())
}

/// Accumulation-based water depth proxy (m): upstream cells × cell size.
pub(crate) fn depth_proxy<E: GridEngine>(
    engine: &E,
    elev: &Raster,
) -> Result<Raster, StepError> {
    let acc = engine.flow_accumulate(elev)?;
    Ok(acc.map(|a| a * elev.cellsize))
}

/// `elev + interval_s·rate/divisor`, rejecting non-finite results.
pub(crate) fn integrate_rate(
    elev: &Raster,
    rate: &Raster,
    interval_s: f64,
    divisor: f64,
    quantity: &'static str,
) -> Result<Raster, NumericError> {
    let out = elev.zip_map(rate, |z, x| z + interval_s * x / divisor);
    if !out.all_finite() {
        return Err(NumericError::new(quantity, "integrated elevation non-finite"));
    }
    Ok(out)
}

/// Post-step finish shared by all variants: gravitational diffusion, then
/// the difference against the pre-step elevation.
pub(crate) fn diffuse_and_diff(
    evolved: Raster,
    original: &Raster,
    params: &SimulationParameters,
) -> Result<(Raster, Raster), NumericError> {
    let smoothed = kernels::gravitational_diffusion(
        &evolved,
        params.interval_seconds(),
        params.density,
        params.grav_diffusion,
    )?;
    let difference = smoothed.zip_map(original, |a, b| a - b);
    Ok((smoothed, difference))
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn every_variant_preserves_grid_shape() {
        let engine = engine();
        let state = ramp_state(8, 8);
        let params = quick_params();
        for variant in [ModelVariant::Simwe, ModelVariant::Usped, ModelVariant::Rusle] {
            let (next, bundle) = variant
                .step(&engine, &state, &params, 50.0, ts("2020-01-01 00:10"))
                .unwrap_or_else(|e| panic!("{variant} step failed: {e}"));
            assert!(state.grid.same_shape(&next.grid), "{variant}: elevation shape");
            assert!(state.grid.same_shape(&bundle.depth), "{variant}: depth shape");
            assert!(state.grid.same_shape(&bundle.diagnostic), "{variant}: diagnostic shape");
            assert!(state.grid.same_shape(&bundle.difference), "{variant}: difference shape");
            assert!(next.grid.all_finite(), "{variant}: non-finite elevation");
        }
    }

    #[test]
    fn step_replaces_state_instead_of_mutating() {
        let engine = engine();
        let state = ramp_state(8, 8);
        let before = state.grid.data.clone();
        let (next, _) = ModelVariant::Usped
            .step(&engine, &state, &quick_params(), 50.0, ts("2020-01-01 00:10"))
            .unwrap();
        assert_eq!(state.grid.data, before, "input state must be untouched");
        assert_eq!(next.timestamp, ts("2020-01-01 00:10"));
    }
}
