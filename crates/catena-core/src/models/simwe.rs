//! SIMWE: stochastic process-based erosion-deposition (Mitasova et al.
//! 2004). Water depth comes from the walker hydrologic solver under the
//! runoff-reduced rainfall; the net erosion-deposition rate from the
//! sediment solver is clipped and integrated into elevation.

use super::{diffuse_and_diff, DiagnosticBundle};
use crate::engine::GridEngine;
use crate::error::StepError;
use crate::kernels;
use crate::params::SimulationParameters;
use crate::raster::Raster;
use crate::state::TerrainState;

pub(super) fn step<E: GridEngine>(
    engine: &E,
    state: &TerrainState,
    params: &SimulationParameters,
    rain_intensity: f64,
) -> Result<(Raster, DiagnosticBundle), StepError> {
    let elev = &*state.grid;
    let derivs = engine.slope_aspect(elev)?;

    // Effective forcing: only the runoff fraction of rainfall flows.
    let forcing = rain_intensity * params.runoff;
    let depth = engine.simulate_hydrology(
        elev,
        forcing,
        params.mannings,
        params.walkers,
        params.threads,
    )?;

    let erdep_raw = engine.simulate_sediment_transport(
        elev,
        &depth,
        &derivs,
        params.detachment,
        params.transport,
        params.shear_stress,
        params.mannings,
    )?;
    let erdep = kernels::clip(&erdep_raw, params.erdepmin, params.erdepmax);

    let mut evolved = super::integrate_rate(
        elev,
        &erdep,
        params.interval_seconds(),
        params.density,
        "simwe elevation",
    )?;
    if params.fill_sinks {
        evolved = engine.fill_sinks(&evolved)?;
    }
    let (evolved, difference) = diffuse_and_diff(evolved, elev, params)?;

    Ok((
        evolved,
        DiagnosticBundle {
            depth,
            diagnostic: erdep,
            difference,
        },
    ))
}
