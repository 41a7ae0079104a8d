//! Time drivers: the ordered (timestamp, base rain intensity) sequence that
//! feeds the evolution loop.
//!
//! Event mode applies one constant intensity over a fixed duration at a
//! fixed interval. Series mode follows an externally supplied precipitation
//! record, converting each depth to an intensity; irregular spacing is
//! allowed but timestamps must be strictly increasing.
//!
//! The ponded-depth feedback term (intensity boost from the previous step's
//! depth) is applied by the orchestrator, not here: it depends on results
//! that only exist once the loop is running.

use crate::error::{EvolutionError, Result};
use crate::kernels::mm_to_intensity;
use chrono::{Duration, NaiveDateTime};

/// One externally supplied precipitation record (Series mode).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecipRecord {
    pub timestamp: NaiveDateTime,
    pub precip_mm: f64,
}

/// One scheduled step: when it happens and the rain intensity before the
/// depth feedback is added.
#[derive(Debug, Clone, Copy)]
pub struct SchedulePoint {
    pub timestamp: NaiveDateTime,
    /// Base rain intensity (mm/hr).
    pub base_intensity: f64,
}

#[derive(Debug, Clone)]
pub enum TimeDriver {
    /// Constant-intensity design storm.
    Event {
        start: NaiveDateTime,
        /// Constant base intensity (mm/hr).
        intensity: f64,
        /// Total duration (minutes).
        duration_min: f64,
        /// Step interval (minutes).
        interval_min: f64,
    },
    /// Observed precipitation record.
    Series {
        records: Vec<PrecipRecord>,
        /// Interval (minutes) used for the depth → intensity conversion.
        interval_min: f64,
    },
}

impl TimeDriver {
    fn interval_min(&self) -> f64 {
        match self {
            TimeDriver::Event { interval_min, .. } => *interval_min,
            TimeDriver::Series { interval_min, .. } => *interval_min,
        }
    }

    fn interval(&self) -> Duration {
        Duration::seconds((self.interval_min() * 60.0).round() as i64)
    }

    /// Event-mode iteration count: floor(duration / interval). A trailing
    /// partial interval is dropped — 61/30 yields 2 steps, same as 60/30.
    fn event_iterations(duration_min: f64, interval_min: f64) -> usize {
        (duration_min / interval_min).floor() as usize
    }

    /// Eager validation, before the loop starts and before anything is
    /// registered.
    pub fn validate(&self) -> Result<()> {
        if !(self.interval_min() > 0.0) {
            return Err(EvolutionError::Configuration(format!(
                "rain_interval must be positive, got {}",
                self.interval_min()
            )));
        }
        match self {
            TimeDriver::Event { duration_min, interval_min, .. } => {
                if Self::event_iterations(*duration_min, *interval_min) == 0 {
                    return Err(EvolutionError::Configuration(format!(
                        "rain_duration ({duration_min} min) shorter than rain_interval \
                         ({interval_min} min): no steps to run"
                    )));
                }
            }
            TimeDriver::Series { records, .. } => {
                if records.is_empty() {
                    return Err(EvolutionError::Input(
                        "precipitation record is empty".to_string(),
                    ));
                }
                for w in records.windows(2) {
                    if w[1].timestamp <= w[0].timestamp {
                        return Err(EvolutionError::Input(format!(
                            "precipitation timestamps not strictly increasing: {} then {}",
                            w[0].timestamp, w[1].timestamp
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Timestamp at which the initial elevation is registered (t₀). Series
    /// mode anchors t₀ one interval before the first record so that step
    /// timestamps coincide exactly with the record's own timestamps.
    pub fn initial_timestamp(&self) -> NaiveDateTime {
        match self {
            TimeDriver::Event { start, .. } => *start,
            TimeDriver::Series { records, .. } => {
                records.first().map(|r| r.timestamp - self.interval()).unwrap_or_default()
            }
        }
    }

    /// The full ordered step schedule. `validate` must have passed.
    pub fn schedule(&self) -> Vec<SchedulePoint> {
        match self {
            TimeDriver::Event { start, intensity, duration_min, interval_min } => {
                let iterations = Self::event_iterations(*duration_min, *interval_min);
                (0..iterations)
                    .map(|i| SchedulePoint {
                        timestamp: *start + self.interval() * (i as i32 + 1),
                        base_intensity: *intensity,
                    })
                    .collect()
            }
            TimeDriver::Series { records, interval_min } => records
                .iter()
                .map(|r| SchedulePoint {
                    timestamp: r.timestamp,
                    base_intensity: mm_to_intensity(r.precip_mm, *interval_min),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn event(duration_min: f64, interval_min: f64) -> TimeDriver {
        TimeDriver::Event {
            start: ts("2020-01-01 00:00"),
            intensity: 50.0,
            duration_min,
            interval_min,
        }
    }

    #[test]
    fn event_60_over_30_yields_two_steps() {
        let d = event(60.0, 30.0);
        d.validate().unwrap();
        let sched = d.schedule();
        assert_eq!(sched.len(), 2);
        assert_eq!(sched[0].timestamp, ts("2020-01-01 00:30"));
        assert_eq!(sched[1].timestamp, ts("2020-01-01 01:00"));
    }

    #[test]
    fn event_iteration_count_floors_partial_interval() {
        // Pinned rounding rule: the trailing partial interval is dropped.
        assert_eq!(event(61.0, 30.0).schedule().len(), 2);
        assert_eq!(event(89.9, 30.0).schedule().len(), 2);
        assert_eq!(event(90.0, 30.0).schedule().len(), 3);
    }

    #[test]
    fn event_60_over_60_yields_one_step() {
        let d = event(60.0, 60.0);
        d.validate().unwrap();
        assert_eq!(d.schedule().len(), 1);
    }

    #[test]
    fn event_shorter_than_interval_rejected() {
        let err = event(20.0, 30.0).validate().unwrap_err();
        assert!(matches!(err, EvolutionError::Configuration(_)), "got {err}");
    }

    #[test]
    fn series_follows_record_timestamps() {
        let d = TimeDriver::Series {
            records: vec![
                PrecipRecord { timestamp: ts("2020-01-01 00:00"), precip_mm: 15.0 },
                PrecipRecord { timestamp: ts("2020-01-01 00:30"), precip_mm: 5.0 },
                // Irregular spacing is allowed.
                PrecipRecord { timestamp: ts("2020-01-01 01:45"), precip_mm: 10.0 },
            ],
            interval_min: 30.0,
        };
        d.validate().unwrap();
        assert_eq!(d.initial_timestamp(), ts("2019-12-31 23:30"));

        let sched = d.schedule();
        assert_eq!(sched.len(), 3);
        assert_eq!(sched[2].timestamp, ts("2020-01-01 01:45"));
        // 15 mm over 30 min = 30 mm/hr.
        assert_relative_eq!(sched[0].base_intensity, 30.0);
        assert_relative_eq!(sched[1].base_intensity, 10.0);
    }

    #[test]
    fn series_non_monotonic_rejected() {
        let d = TimeDriver::Series {
            records: vec![
                PrecipRecord { timestamp: ts("2020-01-01 01:00"), precip_mm: 1.0 },
                PrecipRecord { timestamp: ts("2020-01-01 00:30"), precip_mm: 1.0 },
            ],
            interval_min: 30.0,
        };
        assert!(matches!(d.validate(), Err(EvolutionError::Input(_))));
    }

    #[test]
    fn series_empty_rejected() {
        let d = TimeDriver::Series { records: vec![], interval_min: 30.0 };
        assert!(matches!(d.validate(), Err(EvolutionError::Input(_))));
    }
}
