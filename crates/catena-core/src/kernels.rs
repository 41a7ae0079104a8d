//! Closed-form numeric kernels shared by the erosion models.
//!
//! These are exact formula reproductions; the models thread their outputs
//! back into the next step, so no kernel is allowed to return a non-finite
//! value silently.

use crate::error::NumericError;
use crate::raster::Raster;

/// Seconds per Julian year, used by the tons/ha/yr unit conversion.
const SECONDS_PER_YEAR: f64 = 31_557_600.0;

/// Minutes per year, used to annualise the storm erosivity index.
const MINUTES_PER_YEAR: f64 = 525_600.0;

/// Rainfall erosivity factor R (MJ·mm·ha⁻¹·hr⁻¹·yr⁻¹) for one rainfall
/// interval.
///
/// ```text
/// energy = 0.29·(1 − 0.72·e^(−0.05·I))
/// volume = I·(interval_min/60)
/// EI     = energy·volume·I
/// R      = EI / (interval_min/525600)
/// ```
///
/// Strictly increasing in `I` for `I > 0` and fixed interval.
pub fn erosivity(intensity_mm_hr: f64, interval_min: f64) -> Result<f64, NumericError> {
    let energy = 0.29 * (1.0 - 0.72 * (-0.05 * intensity_mm_hr).exp());
    let volume = intensity_mm_hr * (interval_min / 60.0);
    let ei = energy * volume * intensity_mm_hr;
    let r = ei / (interval_min / MINUTES_PER_YEAR);
    if !r.is_finite() {
        return Err(NumericError::new(
            "erosivity",
            format!("R non-finite for intensity {intensity_mm_hr} over {interval_min} min"),
        ));
    }
    Ok(r)
}

/// One gravitational-diffusion smoothing pass.
///
/// ```text
/// E'' = E − (interval_s/density)·k_diff·(∂²E/∂x² + ∂²E/∂y²)
/// ```
///
/// Second derivatives are central differences over the raster cell size;
/// border cells are carried unchanged. Models sediment settling after each
/// evolution step, applied after the optional sink fill and before the
/// difference grid is computed.
pub fn gravitational_diffusion(
    elev: &Raster,
    interval_s: f64,
    density: f64,
    k_diff: f64,
) -> Result<Raster, NumericError> {
    if density <= 0.0 {
        return Err(NumericError::new(
            "gravitational_diffusion",
            format!("density must be positive, got {density}"),
        ));
    }
    let cs2 = elev.cellsize * elev.cellsize;
    let coeff = interval_s / density * k_diff;

    let mut out = elev.clone();
    for r in 1..elev.height.saturating_sub(1) {
        for c in 1..elev.width.saturating_sub(1) {
            let z = elev.get(r, c);
            let dxx = (elev.get(r, c - 1) - 2.0 * z + elev.get(r, c + 1)) / cs2;
            let dyy = (elev.get(r - 1, c) - 2.0 * z + elev.get(r + 1, c)) / cs2;
            out.set(r, c, z - coeff * (dxx + dyy));
        }
    }
    if !out.all_finite() {
        return Err(NumericError::new(
            "gravitational_diffusion",
            "diffused elevation contains non-finite cells",
        ));
    }
    Ok(out)
}

/// Elementwise clamp into `[lo, hi]`. Idempotent. Suppresses numerically
/// unstable extremes from stochastic and divergence outputs before they are
/// integrated into elevation.
pub fn clip(grid: &Raster, lo: f64, hi: f64) -> Raster {
    grid.map(|v| v.clamp(lo, hi))
}

/// Upper-bound-only clamp, for the RUSLE flux (non-negative by construction).
pub fn clip_upper(grid: &Raster, hi: f64) -> Raster {
    grid.map(|v| v.min(hi))
}

/// tons·ha⁻¹·yr⁻¹ → kg·m⁻²·s⁻¹.
pub fn tons_ha_yr_to_kg_m2_s(x: f64) -> f64 {
    x * 1000.0 / 10_000.0 / SECONDS_PER_YEAR
}

/// Precipitation depth over one interval (mm) → rain intensity (mm/hr).
pub fn mm_to_intensity(precip_mm: f64, interval_min: f64) -> f64 {
    precip_mm / interval_min * 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn erosivity_strictly_increasing_in_intensity() {
        // Sampled sweep over the physically plausible range.
        let mut prev = 0.0;
        let mut i = 0.5;
        while i < 300.0 {
            let r = erosivity(i, 30.0).unwrap();
            assert!(
                r > prev,
                "erosivity must increase with intensity: R({i}) = {r} ≤ {prev}"
            );
            prev = r;
            i += 0.5;
        }
    }

    #[test]
    fn erosivity_known_value() {
        // I = 50 mm/hr over 60 min:
        //   energy = 0.29·(1 − 0.72·e^(−2.5)) ≈ 0.272862
        //   volume = 50, EI = energy·50·50
        //   R = EI/(60/525600) = EI·8760
        let r = erosivity(50.0, 60.0).unwrap();
        let energy = 0.29 * (1.0 - 0.72 * (-2.5f64).exp());
        assert_relative_eq!(r, energy * 50.0 * 50.0 * 8760.0, max_relative = 1e-12);
    }

    #[test]
    fn erosivity_interval_cancels() {
        // The interval appears in volume and in the annualisation and cancels.
        let a = erosivity(30.0, 10.0).unwrap();
        let b = erosivity(30.0, 120.0).unwrap();
        assert_relative_eq!(a, b, max_relative = 1e-12);
    }

    #[test]
    fn clip_is_idempotent() {
        let mut g = Raster::filled(4, 4, 1.0, 0.0);
        for (i, v) in g.data.iter_mut().enumerate() {
            *v = i as f64 - 8.0;
        }
        let once = clip(&g, -2.0, 3.0);
        let twice = clip(&once, -2.0, 3.0);
        assert_eq!(once.data, twice.data);
        assert!(once.data.iter().all(|&v| (-2.0..=3.0).contains(&v)));
    }

    #[test]
    fn clip_upper_leaves_lower_tail() {
        let mut g = Raster::filled(2, 2, 1.0, 0.0);
        g.data = vec![-5.0, 0.0, 5.0, 50.0];
        let c = clip_upper(&g, 10.0);
        assert_eq!(c.data, vec![-5.0, 0.0, 5.0, 10.0]);
    }

    #[test]
    fn diffusion_of_flat_surface_is_identity() {
        let flat = Raster::filled(5, 5, 10.0, 42.0);
        let out = gravitational_diffusion(&flat, 3600.0, 1.4, 0.2).unwrap();
        for (&a, &b) in flat.data.iter().zip(out.data.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-12);
        }
    }

    #[test]
    fn diffusion_exact_value_at_a_spike() {
        // Spike of 100 at the centre of a flat 5×5, unit cell size.
        // Centre Laplacian = −200 − 200 = −400, so with
        // E'' = E − (interval_s/density)·k·∇²E the centre moves by
        // +coeff·400 and each direct neighbour (∇² = +100) by −coeff·100.
        let mut g = Raster::filled(5, 5, 1.0, 0.0);
        g.set(2, 2, 100.0);
        let (interval_s, density, k) = (60.0, 1.4, 0.2);
        let coeff = interval_s / density * k;
        let out = gravitational_diffusion(&g, interval_s, density, k).unwrap();
        assert_relative_eq!(out.get(2, 2), 100.0 + coeff * 400.0, max_relative = 1e-12);
        assert_relative_eq!(out.get(2, 1), -coeff * 100.0, max_relative = 1e-12);
    }

    #[test]
    fn diffusion_rejects_zero_density() {
        let flat = Raster::filled(3, 3, 1.0, 0.0);
        assert!(gravitational_diffusion(&flat, 60.0, 0.0, 0.2).is_err());
    }

    #[test]
    fn unit_conversion_spot_value() {
        // 1 t/ha/yr = 1000 kg / 10000 m² / 31557600 s
        assert_relative_eq!(
            tons_ha_yr_to_kg_m2_s(1.0),
            1000.0 / 10_000.0 / 31_557_600.0,
            max_relative = 1e-15
        );
    }

    #[test]
    fn mm_to_intensity_spot_values() {
        assert_relative_eq!(mm_to_intensity(15.0, 30.0), 30.0);
        assert_relative_eq!(mm_to_intensity(10.0, 60.0), 10.0);
    }
}
