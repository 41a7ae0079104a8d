//! Deterministic surface analysis: Horn (1981) 3×3 gradients, slope/aspect
//! decomposition, D8 flow accumulation, and Planchon–Darboux (2002)
//! depression filling.

use super::SurfaceDerivatives;
use crate::error::EngineError;
use crate::raster::Raster;

/// D8 neighbour offsets (row, col) and their distances in cell units.
pub(crate) const D8_OFFSETS: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),           (0, 1),
    (1, -1), (1, 0), (1, 1),
];
pub(crate) const D8_DIST: [f64; 8] = [
    std::f64::consts::SQRT_2, 1.0, std::f64::consts::SQRT_2,
    1.0,                           1.0,
    std::f64::consts::SQRT_2, 1.0, std::f64::consts::SQRT_2,
];

/// Horn (1981) weighted 3×3 gradient at interior cell `(r, c)`.
///
/// `dz/dx = ((NE + 2E + SE) − (NW + 2W + SW)) / (8 · cellsize)`
/// `dz/dy = ((SW + 2S + SE) − (NW + 2N + NE)) / (8 · cellsize)`
///
/// Caller must ensure `1 ≤ r ≤ height−2` and `1 ≤ c ≤ width−2`.
pub(crate) fn horn_gradient(elev: &Raster, r: usize, c: usize) -> (f64, f64) {
    let cs = elev.cellsize;
    let nw = elev.get(r - 1, c - 1);
    let n = elev.get(r - 1, c);
    let ne = elev.get(r - 1, c + 1);
    let w = elev.get(r, c - 1);
    let e = elev.get(r, c + 1);
    let sw = elev.get(r + 1, c - 1);
    let s = elev.get(r + 1, c);
    let se = elev.get(r + 1, c + 1);

    let dz_dx = ((ne + 2.0 * e + se) - (nw + 2.0 * w + sw)) / (8.0 * cs);
    let dz_dy = ((sw + 2.0 * s + se) - (nw + 2.0 * n + ne)) / (8.0 * cs);
    (dz_dx, dz_dy)
}

/// Full slope/aspect/derivative decomposition. Border cells carry zero
/// derivatives (flat); grids smaller than 3×3 decompose as entirely flat.
pub fn slope_aspect(elev: &Raster) -> Result<SurfaceDerivatives, EngineError> {
    if elev.data.is_empty() {
        return Err(EngineError::new("slope_aspect", "empty elevation grid"));
    }
    if !elev.all_finite() {
        return Err(EngineError::new("slope_aspect", "elevation contains non-finite cells"));
    }

    let mut slope = elev.like(0.0);
    let mut aspect = elev.like(0.0);
    let mut dx = elev.like(0.0);
    let mut dy = elev.like(0.0);
    let mut dxx = elev.like(0.0);
    let mut dyy = elev.like(0.0);

    if elev.width >= 3 && elev.height >= 3 {
        let cs2 = elev.cellsize * elev.cellsize;
        for r in 1..elev.height - 1 {
            for c in 1..elev.width - 1 {
                let (dz_dx, dz_dy) = horn_gradient(elev, r, c);
                let z = elev.get(r, c);
                let d2x = (elev.get(r, c - 1) - 2.0 * z + elev.get(r, c + 1)) / cs2;
                let d2y = (elev.get(r - 1, c) - 2.0 * z + elev.get(r + 1, c)) / cs2;
                let mag = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt();

                dx.set(r, c, dz_dx);
                dy.set(r, c, dz_dy);
                dxx.set(r, c, d2x);
                dyy.set(r, c, d2y);
                slope.set(r, c, mag.atan());
                // Flow direction: unit vector of steepest descent. Flat
                // cells keep aspect 0 — harmless, since every consumer
                // multiplies by a slope-derived magnitude.
                if mag > 0.0 {
                    aspect.set(r, c, (-dz_dy).atan2(-dz_dx));
                }
            }
        }
    }

    Ok(SurfaceDerivatives { slope, aspect, dx, dy, dxx, dyy })
}

/// D8 upstream contributing area in cells, including the cell itself.
///
/// Cells are visited in descending elevation order so each cell's full
/// accumulation is known before it is passed downslope.
pub fn flow_accumulate(elev: &Raster) -> Result<Raster, EngineError> {
    if elev.data.is_empty() {
        return Err(EngineError::new("flow_accumulate", "empty elevation grid"));
    }
    let rows = elev.height;
    let cols = elev.width;

    let mut order: Vec<usize> = (0..rows * cols).collect();
    order.sort_unstable_by(|&a, &b| {
        elev.data[b]
            .partial_cmp(&elev.data[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut acc = elev.like(1.0);
    for &i in &order {
        let r = i / cols;
        let c = i % cols;
        let z0 = elev.data[i];

        // Steepest descent D8 neighbour.
        let mut best_drop = 0.0f64;
        let mut best: Option<usize> = None;
        for (k, &(dr, dc)) in D8_OFFSETS.iter().enumerate() {
            let nr = r as isize + dr;
            let nc = c as isize + dc;
            if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                continue;
            }
            let j = nr as usize * cols + nc as usize;
            let drop = (z0 - elev.data[j]) / (elev.cellsize * D8_DIST[k]);
            if drop > best_drop {
                best_drop = drop;
                best = Some(j);
            }
        }
        if let Some(j) = best {
            acc.data[j] += acc.data[i];
        }
    }
    Ok(acc)
}

/// Minimal elevation increment used to keep filled depressions draining.
const FILL_EPSILON: f64 = 1e-5;

/// Planchon–Darboux depression filling: raise interior cells until every
/// cell has a monotonically descending path to the grid border.
pub fn fill_sinks(elev: &Raster) -> Result<Raster, EngineError> {
    if elev.data.is_empty() {
        return Err(EngineError::new("fill_sinks", "empty elevation grid"));
    }
    let rows = elev.height;
    let cols = elev.width;
    if rows < 3 || cols < 3 {
        return Ok(elev.clone());
    }

    // Water level: border cells at terrain height, interior flooded.
    let mut water = elev.like(f64::INFINITY);
    for r in 0..rows {
        for c in 0..cols {
            if r == 0 || c == 0 || r == rows - 1 || c == cols - 1 {
                water.set(r, c, elev.get(r, c));
            }
        }
    }

    // Drain the flood iteratively until stable.
    let mut changed = true;
    while changed {
        changed = false;
        for r in 1..rows - 1 {
            for c in 1..cols - 1 {
                let z = elev.get(r, c);
                let w = water.get(r, c);
                if w <= z {
                    continue;
                }
                for &(dr, dc) in &D8_OFFSETS {
                    let nr = (r as isize + dr) as usize;
                    let nc = (c as isize + dc) as usize;
                    let wn = water.get(nr, nc) + FILL_EPSILON;
                    if z >= wn {
                        water.set(r, c, z);
                        changed = true;
                        break;
                    }
                    if wn < water.get(r, c) {
                        water.set(r, c, wn);
                        changed = true;
                    }
                }
            }
        }
    }
    Ok(water)
}
