//! USPED: Unit Stream Power Erosion/Deposition (Mitasova et al. 1996).
//! Transport capacity is built from the erosivity index and the topographic
//! LS factor, decomposed along the flow direction, and its divergence gives
//! the net erosion-deposition rate.

use super::{depth_proxy, diffuse_and_diff, DiagnosticBundle};
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
    let r_factor = kernels::erosivity(rain_intensity, params.rain_interval)?;
    let derivs = engine.slope_aspect(elev)?;
    let depth = depth_proxy(engine, elev)?;

    // Topographic factor LS = h^m·sin(β)^n and transport capacity
    // T = R·K·C·LS, converted to kg·m⁻¹·s⁻¹.
    let (m, n) = (params.m, params.n);
    let soil = r_factor * params.k_factor * params.c_factor;
    let capacity = depth.zip_map(&derivs.slope, |h, beta| {
        kernels::tons_ha_yr_to_kg_m2_s(soil * h.powf(m) * beta.sin().powf(n))
    });

    // Flux components along the flow direction; the divergence is the raw
    // erosion-deposition rate.
    let qs_x = capacity.zip_map(&derivs.aspect, |t, a| t * a.cos());
    let qs_y = capacity.zip_map(&derivs.aspect, |t, a| t * a.sin());
    let mut erdep_raw = elev.like(0.0);
    let cs = elev.cellsize;
    if elev.height >= 3 && elev.width >= 3 {
        for r in 1..elev.height - 1 {
            for c in 1..elev.width - 1 {
                let div = (qs_x.get(r, c + 1) - qs_x.get(r, c - 1)) / (2.0 * cs)
                    + (qs_y.get(r + 1, c) - qs_y.get(r - 1, c)) / (2.0 * cs);
                erdep_raw.set(r, c, div);
            }
        }
    }
    let erdep = kernels::clip(&erdep_raw, params.erdepmin, params.erdepmax);

    let evolved = super::integrate_rate(
        elev,
        &erdep,
        params.interval_seconds(),
        params.density,
        "usped elevation",
    )?;
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

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::params::ModelVariant;
    use crate::raster::Raster;
    use crate::state::TerrainState;

    #[test]
    fn flat_terrain_produces_no_erosion() {
        let engine = engine();
        let flat = Raster::filled(5, 5, 1.0, 20.0);
        let state = TerrainState::initial(flat, ts("2020-01-01 00:00"));
        let (_, bundle) = ModelVariant::Usped
            .step(&engine, &state, &quick_params(), 80.0, ts("2020-01-01 00:10"))
            .unwrap();
        assert!(
            bundle.diagnostic.data.iter().all(|&v| v == 0.0),
            "zero slope means zero transport capacity everywhere"
        );
    }

    #[test]
    fn depth_proxy_scales_with_contributing_area() {
        let engine = engine();
        let state = ramp_state(6, 12);
        let (_, bundle) = ModelVariant::Usped
            .step(&engine, &state, &quick_params(), 50.0, ts("2020-01-01 00:10"))
            .unwrap();
        // The ramp drains east, so the proxy grows downslope.
        assert!(
            bundle.depth.get(3, 10) > bundle.depth.get(3, 2),
            "depth proxy {} downslope should exceed {} upslope",
            bundle.depth.get(3, 10),
            bundle.depth.get(3, 2)
        );
    }

    #[test]
    fn zero_erodibility_freezes_the_surface() {
        let engine = engine();
        let state = ramp_state(6, 6);
        let mut params = quick_params();
        params.k_factor = 0.0;
        params.grav_diffusion = 0.0;
        let (next, bundle) = ModelVariant::Usped
            .step(&engine, &state, &params, 50.0, ts("2020-01-01 00:10"))
            .unwrap();
        assert!(bundle.diagnostic.data.iter().all(|&v| v == 0.0));
        assert_eq!(next.grid.data, state.grid.data);
    }
}
