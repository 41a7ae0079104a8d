//! RUSLE 3D: detachment-limited soil loss (Renard et al. 1997, terrain
//! form after Mitasova). The sediment flux is everywhere non-negative, so
//! the surface can only lose material before diffusion redistributes it.

use super::{depth_proxy, diffuse_and_diff, DiagnosticBundle};
use crate::engine::GridEngine;
use crate::error::StepError;
use crate::kernels;
use crate::params::SimulationParameters;
use crate::raster::Raster;
use crate::state::TerrainState;

/// Reference slope length (m) of the unit RUSLE plot.
const REFERENCE_LENGTH: f64 = 22.1;

/// Sine of the reference slope (9%), as a percent-slope ratio.
const REFERENCE_SLOPE: f64 = 5.14;

pub(super) fn step<E: GridEngine>(
    engine: &E,
    state: &TerrainState,
    params: &SimulationParameters,
    rain_intensity: f64,
) -> Result<(Raster, DiagnosticBundle), StepError> {
    let elev = &*state.grid;
    let r_factor = kernels::erosivity(rain_intensity, params.rain_interval)?;
    let derivs = engine.slope_aspect(elev)?;
    let depth = depth_proxy(engine, elev)?;

    // 3D LS factor: LS = (m+1)·(h/22.1)^m·(sin β/5.14)^n.
    let (m, n) = (params.m, params.n);
    let soil = r_factor * params.k_factor * params.c_factor;
    let flux_raw = depth.zip_map(&derivs.slope, |h, beta| {
        let ls = (m + 1.0) * (h / REFERENCE_LENGTH).powf(m) * (beta.sin() / REFERENCE_SLOPE).powf(n);
        kernels::tons_ha_yr_to_kg_m2_s(soil * ls)
    });
    let flux = kernels::clip_upper(&flux_raw, params.fluxmax);

    // Detachment-limited: flux only removes material.
    let loss = flux.map(|q| -q);
    let evolved = super::integrate_rate(
        elev,
        &loss,
        params.interval_seconds(),
        params.mass,
        "rusle elevation",
    )?;
    let (evolved, difference) = diffuse_and_diff(evolved, elev, params)?;

    Ok((
        evolved,
        DiagnosticBundle {
            depth,
            diagnostic: flux,
            difference,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::params::ModelVariant;

    #[test]
    fn flux_is_non_negative_and_bounded() {
        let engine = engine();
        let state = ramp_state(8, 8);
        let mut params = quick_params();
        params.fluxmax = 1e-5;
        let (_, bundle) = ModelVariant::Rusle
            .step(&engine, &state, &params, 100.0, ts("2020-01-01 00:10"))
            .unwrap();
        assert!(
            bundle.diagnostic.data.iter().all(|&v| (0.0..=1e-5).contains(&v)),
            "flux must stay within [0, fluxmax]"
        );
    }

    #[test]
    fn interior_cells_only_lose_material_before_diffusion() {
        let engine = engine();
        let state = ramp_state(8, 8);
        let mut params = quick_params();
        params.grav_diffusion = 0.0; // isolate the detachment-limited loss
        let (next, _) = ModelVariant::Rusle
            .step(&engine, &state, &params, 100.0, ts("2020-01-01 00:10"))
            .unwrap();
        for r in 0..8 {
            for c in 0..8 {
                assert!(
                    next.grid.get(r, c) <= state.grid.get(r, c),
                    "cell ({r},{c}) gained material under a loss-only model"
                );
            }
        }
    }

    #[test]
    fn stronger_rain_erodes_more() {
        let engine = engine();
        let state = ramp_state(8, 8);
        let mut params = quick_params();
        params.grav_diffusion = 0.0;
        let (light, _) = ModelVariant::Rusle
            .step(&engine, &state, &params, 10.0, ts("2020-01-01 00:10"))
            .unwrap();
        let (heavy, _) = ModelVariant::Rusle
            .step(&engine, &state, &params, 120.0, ts("2020-01-01 00:10"))
            .unwrap();
        assert!(
            heavy.grid.mean() < light.grid.mean(),
            "mean elevation after heavy rain {} should sit below light rain {}",
            heavy.grid.mean(),
            light.grid.mean()
        );
    }
}
