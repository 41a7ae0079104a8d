//! Append-only per-category time series of grids — the run's only durable
//! output. Timestamps must be strictly increasing and unique within a
//! category; enumeration returns entries in temporal order.

use crate::error::{EvolutionError, Result};
use crate::raster::Raster;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct TimeSeriesCollection {
    series: BTreeMap<String, Vec<(NaiveDateTime, Arc<Raster>)>>,
}

impl TimeSeriesCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `grid` at `timestamp` under `category`, creating the category
    /// on first use. Rejects timestamps at or before the category's last
    /// entry.
    pub fn register(
        &mut self,
        category: &str,
        timestamp: NaiveDateTime,
        grid: Arc<Raster>,
    ) -> Result<()> {
        let entries = self.series.entry(category.to_string()).or_default();
        if let Some(&(last, _)) = entries.last() {
            if timestamp <= last {
                return Err(EvolutionError::Input(format!(
                    "series `{category}`: timestamp {timestamp} not after previous entry {last}"
                )));
            }
        }
        entries.push((timestamp, grid));
        Ok(())
    }

    /// Entries of one category in strictly increasing timestamp order.
    /// Unknown categories enumerate as empty.
    pub fn enumerate(&self, category: &str) -> &[(NaiveDateTime, Arc<Raster>)] {
        self.series.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self, category: &str) -> usize {
        self.enumerate(category).len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(Vec::is_empty)
    }

    /// Category names, sorted.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn grid(fill: f64) -> Arc<Raster> {
        Arc::new(Raster::filled(2, 2, 1.0, fill))
    }

    #[test]
    fn register_then_enumerate_preserves_order_and_references() {
        let mut col = TimeSeriesCollection::new();
        let grids: Vec<_> = (0..5).map(|i| grid(i as f64)).collect();
        for (i, g) in grids.iter().enumerate() {
            col.register(
                "elevation",
                ts(&format!("2020-01-01 0{i}:00")),
                Arc::clone(g),
            )
            .unwrap();
        }

        let entries = col.enumerate("elevation");
        assert_eq!(entries.len(), 5);
        for w in entries.windows(2) {
            assert!(w[0].0 < w[1].0, "timestamps must be strictly increasing");
        }
        for (g, (_, stored)) in grids.iter().zip(entries.iter()) {
            assert!(Arc::ptr_eq(g, stored), "registered grid reference must be preserved");
        }
    }

    #[test]
    fn duplicate_timestamp_rejected() {
        let mut col = TimeSeriesCollection::new();
        col.register("depth", ts("2020-01-01 00:10"), grid(0.0)).unwrap();
        let err = col.register("depth", ts("2020-01-01 00:10"), grid(1.0));
        assert!(matches!(err, Err(EvolutionError::Input(_))));
    }

    #[test]
    fn regressing_timestamp_rejected() {
        let mut col = TimeSeriesCollection::new();
        col.register("depth", ts("2020-01-01 01:00"), grid(0.0)).unwrap();
        assert!(col.register("depth", ts("2020-01-01 00:30"), grid(1.0)).is_err());
    }

    #[test]
    fn categories_are_independent() {
        let mut col = TimeSeriesCollection::new();
        let t = ts("2020-01-01 00:10");
        col.register("elevation", t, grid(0.0)).unwrap();
        // Same timestamp in a different category is fine.
        col.register("depth", t, grid(0.0)).unwrap();
        assert_eq!(col.len("elevation"), 1);
        assert_eq!(col.len("depth"), 1);
        assert_eq!(col.len("missing"), 0);
    }
}
