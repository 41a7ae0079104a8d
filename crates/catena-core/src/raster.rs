use serde::{Deserialize, Serialize};

/// A 2D raster storing cell values as f64, row-major.
///
/// Spatial metadata (extent origin and cell size) travels with the grid;
/// nothing is inferred from ambient configuration. All rasters in one
/// simulation run share the same shape and cell size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Raster {
    /// Row-major cell values.
    pub data: Vec<f64>,
    pub width: usize,
    pub height: usize,
    /// Western edge of the extent (metres, projected).
    pub west: f64,
    /// Southern edge of the extent (metres, projected).
    pub south: f64,
    /// Cell size in metres (isotropic).
    pub cellsize: f64,
}

impl Raster {
    /// Create a new Raster filled with the given value.
    pub fn filled(width: usize, height: usize, cellsize: f64, fill: f64) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
            west: 0.0,
            south: 0.0,
            cellsize,
        }
    }

    /// Wrap an existing row-major buffer. Returns `None` when the buffer
    /// length does not match the stated dimensions.
    pub fn from_data(
        data: Vec<f64>,
        width: usize,
        height: usize,
        west: f64,
        south: f64,
        cellsize: f64,
    ) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
            west,
            south,
            cellsize,
        })
    }

    /// Create a Raster sharing this one's shape and extent, filled with `fill`.
    pub fn like(&self, fill: f64) -> Self {
        Self {
            data: vec![fill; self.width * self.height],
            width: self.width,
            height: self.height,
            west: self.west,
            south: self.south,
            cellsize: self.cellsize,
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f64) {
        self.data[row * self.width + col] = val;
    }

    /// True when `other` has the same shape and cell size as `self`.
    pub fn same_shape(&self, other: &Raster) -> bool {
        self.width == other.width
            && self.height == other.height
            && (self.cellsize - other.cellsize).abs() < f64::EPSILON
    }

    /// Elementwise transform into a new Raster with the same metadata.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Raster {
        let mut out = self.clone();
        for v in &mut out.data {
            *v = f(*v);
        }
        out
    }

    /// Elementwise combination of two same-shape rasters.
    pub fn zip_map(&self, other: &Raster, f: impl Fn(f64, f64) -> f64) -> Raster {
        debug_assert!(self.same_shape(other), "zip_map on mismatched rasters");
        let mut out = self.clone();
        for (v, &o) in out.data.iter_mut().zip(other.data.iter()) {
            *v = f(*v, o);
        }
        out
    }

    pub fn min_value(&self) -> f64 {
        self.data.iter().cloned().fold(f64::INFINITY, f64::min)
    }

    pub fn max_value(&self) -> f64 {
        self.data.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// True when every cell is finite.
    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}
