//! Time-table external resource.
//!
//! Constructed once at initialization from an in-memory data matrix,
//! queried for value-at-time and next-discontinuity-time during evaluation,
//! and dropped with the owning context. Loading table data from files is the
//! embedding application's concern.

use crate::error::{ModelError, ModelResult};
use hf_core::Real;

/// Interpolation mode between table breakpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Smoothness {
    /// Piecewise constant: value of the segment start.
    ConstantSegments,
    /// Piecewise linear.
    LinearSegments,
}

/// Behavior outside the table's time range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Extrapolation {
    HoldLastPoint,
    /// Extrapolate linearly through the outermost two points.
    LastTwoPoints,
    Error,
}

/// Which breakpoints become time events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeEvents {
    /// Every breakpoint.
    Always,
    /// Only jumps: duplicated abscissas, or every breakpoint under
    /// constant segments.
    AtDiscontinuities,
    NoTimeEvents,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableConfig {
    pub name: String,
    /// Rows of `[time, v1, v2, ...]`, time nondecreasing.
    pub rows: Vec<Vec<Real>>,
    /// Selected value columns, 1-based into a row (column 0 is time).
    pub columns: Vec<usize>,
    pub start_time: Real,
    pub shift_time: Real,
    pub smoothness: Smoothness,
    pub extrapolation: Extrapolation,
    pub time_events: TimeEvents,
}

pub struct TimeTable {
    cfg: TableConfig,
}

impl TimeTable {
    /// Construct and validate. Failures here are fatal at initialization,
    /// before any integration begins.
    pub fn new(cfg: TableConfig) -> ModelResult<Self> {
        let fail = |what: &str| {
            Err(ModelError::Table {
                name: cfg.name.clone(),
                what: what.to_string(),
            })
        };
        if cfg.rows.is_empty() {
            return fail("empty data matrix");
        }
        let width = cfg.rows[0].len();
        if width < 2 {
            return fail("rows need a time column and at least one value column");
        }
        if cfg.rows.iter().any(|r| r.len() != width) {
            return fail("ragged data matrix");
        }
        if cfg.rows.windows(2).any(|w| w[1][0] < w[0][0]) {
            return fail("time column not nondecreasing");
        }
        if cfg.columns.is_empty() {
            return fail("no value columns selected");
        }
        if cfg.columns.iter().any(|&c| c == 0 || c >= width) {
            return fail("value column selector out of range");
        }
        if !cfg.start_time.is_finite() || !cfg.shift_time.is_finite() {
            return fail("start/shift time must be finite");
        }
        Ok(Self { cfg })
    }

    pub fn name(&self) -> &str {
        &self.cfg.name
    }

    fn times(&self) -> impl Iterator<Item = Real> + '_ {
        self.cfg.rows.iter().map(|r| r[0])
    }

    fn value(&self, row: usize, col: usize) -> Real {
        self.cfg.rows[row][self.cfg.columns[col]]
    }

    /// Table value at simulated time `t` for selected column `col`
    /// (an index into the `columns` selector list).
    pub fn value_at(&self, t: Real, col: usize) -> ModelResult<Real> {
        let rows = &self.cfg.rows;
        let n = rows.len();
        // output held at its initial value before start_time
        let u = t.max(self.cfg.start_time) - self.cfg.shift_time;

        let t_first = rows[0][0];
        let t_last = rows[n - 1][0];

        if u < t_first {
            return match self.cfg.extrapolation {
                Extrapolation::HoldLastPoint => Ok(self.value(0, col)),
                Extrapolation::LastTwoPoints if n >= 2 => {
                    Ok(self.interpolate(0, u, col))
                }
                Extrapolation::LastTwoPoints => Ok(self.value(0, col)),
                Extrapolation::Error => Err(ModelError::Table {
                    name: self.cfg.name.clone(),
                    what: format!("query time {u} before table range [{t_first}, {t_last}]"),
                }),
            };
        }
        if u >= t_last {
            return match self.cfg.extrapolation {
                Extrapolation::HoldLastPoint => Ok(self.value(n - 1, col)),
                Extrapolation::LastTwoPoints if n >= 2 && u > t_last => {
                    Ok(self.interpolate(n - 2, u, col))
                }
                Extrapolation::LastTwoPoints => Ok(self.value(n - 1, col)),
                Extrapolation::Error if u > t_last => Err(ModelError::Table {
                    name: self.cfg.name.clone(),
                    what: format!("query time {u} after table range [{t_first}, {t_last}]"),
                }),
                Extrapolation::Error => Ok(self.value(n - 1, col)),
            };
        }

        // rightmost segment start with times[i] <= u; duplicated abscissas
        // make the query at a jump see the post-jump row
        let mut i = match rows.binary_search_by(|r| {
            r[0].partial_cmp(&u).unwrap_or(core::cmp::Ordering::Less)
        }) {
            Ok(hit) => hit,
            Err(ins) => ins - 1,
        };
        while i + 1 < n && rows[i + 1][0] <= u {
            i += 1;
        }

        match self.cfg.smoothness {
            Smoothness::ConstantSegments => Ok(self.value(i, col)),
            Smoothness::LinearSegments => Ok(self.interpolate(i, u, col)),
        }
    }

    /// Linear interpolation on the segment starting at `row`.
    fn interpolate(&self, row: usize, u: Real, col: usize) -> Real {
        let t0 = self.cfg.rows[row][0];
        let t1 = self.cfg.rows[row + 1][0];
        let v0 = self.value(row, col);
        let v1 = self.value(row + 1, col);
        if t1 == t0 {
            return v1;
        }
        v0 + (v1 - v0) * (u - t0) / (t1 - t0)
    }

    /// Next time event strictly after `t`, or +inf when exhausted.
    pub fn next_event_after(&self, t: Real) -> Real {
        if matches!(self.cfg.time_events, TimeEvents::NoTimeEvents) {
            return Real::INFINITY;
        }
        if t < self.cfg.start_time {
            return self.cfg.start_time;
        }

        let jumps_only = matches!(self.cfg.time_events, TimeEvents::AtDiscontinuities)
            && matches!(self.cfg.smoothness, Smoothness::LinearSegments);

        let mut prev: Option<Real> = None;
        for bp in self.times() {
            let is_duplicate = prev == Some(bp);
            prev = Some(bp);
            if is_duplicate != jumps_only {
                continue;
            }
            let event = bp + self.cfg.shift_time;
            if event > t && event >= self.cfg.start_time {
                return event;
            }
        }
        Real::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn step_table() -> TimeTable {
        TimeTable::new(TableConfig {
            name: "step".into(),
            rows: vec![vec![0.0, 0.0], vec![0.5, 1.0], vec![1.0, 0.0]],
            columns: vec![1],
            start_time: 0.0,
            shift_time: 0.0,
            smoothness: Smoothness::ConstantSegments,
            extrapolation: Extrapolation::HoldLastPoint,
            time_events: TimeEvents::Always,
        })
        .unwrap()
    }

    #[test]
    fn constant_segments_hold_segment_start() {
        let table = step_table();
        assert_eq!(table.value_at(0.0, 0).unwrap(), 0.0);
        assert_eq!(table.value_at(0.49, 0).unwrap(), 0.0);
        assert_eq!(table.value_at(0.5, 0).unwrap(), 1.0);
        assert_eq!(table.value_at(0.99, 0).unwrap(), 1.0);
        // at and past the last breakpoint the last value holds
        assert_eq!(table.value_at(1.0, 0).unwrap(), 0.0);
        assert_eq!(table.value_at(5.0, 0).unwrap(), 0.0);
    }

    #[test]
    fn linear_segments_interpolate() {
        let table = TimeTable::new(TableConfig {
            name: "ramp".into(),
            rows: vec![vec![0.0, 0.0], vec![1.0, 2.0]],
            columns: vec![1],
            start_time: 0.0,
            shift_time: 0.0,
            smoothness: Smoothness::LinearSegments,
            extrapolation: Extrapolation::LastTwoPoints,
            time_events: TimeEvents::NoTimeEvents,
        })
        .unwrap();
        assert_eq!(table.value_at(0.5, 0).unwrap(), 1.0);
        // linear extrapolation through the outermost points
        assert_eq!(table.value_at(2.0, 0).unwrap(), 4.0);
        assert_eq!(table.value_at(-1.0, 0).unwrap(), -2.0);
        assert_eq!(table.next_event_after(0.0), Real::INFINITY);
    }

    #[test]
    fn duplicated_abscissa_jump() {
        let table = TimeTable::new(TableConfig {
            name: "jump".into(),
            rows: vec![vec![0.0, 0.0], vec![0.5, 0.0], vec![0.5, 3.0], vec![1.0, 3.0]],
            columns: vec![1],
            start_time: 0.0,
            shift_time: 0.0,
            smoothness: Smoothness::LinearSegments,
            extrapolation: Extrapolation::HoldLastPoint,
            time_events: TimeEvents::AtDiscontinuities,
        })
        .unwrap();
        assert_eq!(table.value_at(0.25, 0).unwrap(), 0.0);
        assert_eq!(table.value_at(0.5, 0).unwrap(), 3.0);
        assert_eq!(table.value_at(0.75, 0).unwrap(), 3.0);
        // only the duplicated abscissa is a time event
        assert_eq!(table.next_event_after(0.0), 0.5);
        assert_eq!(table.next_event_after(0.5), Real::INFINITY);
    }

    #[test]
    fn always_policy_walks_breakpoints() {
        let table = step_table();
        assert_eq!(table.next_event_after(0.0), 0.5);
        assert_eq!(table.next_event_after(0.5), 1.0);
        assert_eq!(table.next_event_after(1.0), Real::INFINITY);
    }

    #[test]
    fn error_extrapolation_rejects_out_of_range() {
        let table = TimeTable::new(TableConfig {
            name: "strict".into(),
            rows: vec![vec![0.0, 1.0], vec![1.0, 2.0]],
            columns: vec![1],
            start_time: 0.0,
            shift_time: 0.0,
            smoothness: Smoothness::LinearSegments,
            extrapolation: Extrapolation::Error,
            time_events: TimeEvents::NoTimeEvents,
        })
        .unwrap();
        assert!(table.value_at(1.5, 0).is_err());
        assert_eq!(table.value_at(1.0, 0).unwrap(), 2.0);
    }

    #[test]
    fn construction_rejects_bad_matrices() {
        let base = TableConfig {
            name: "bad".into(),
            rows: vec![],
            columns: vec![1],
            start_time: 0.0,
            shift_time: 0.0,
            smoothness: Smoothness::ConstantSegments,
            extrapolation: Extrapolation::HoldLastPoint,
            time_events: TimeEvents::Always,
        };
        assert!(TimeTable::new(base.clone()).is_err());

        let mut nonmono = base.clone();
        nonmono.rows = vec![vec![1.0, 0.0], vec![0.0, 0.0]];
        assert!(TimeTable::new(nonmono).is_err());

        let mut bad_col = base;
        bad_col.rows = vec![vec![0.0, 0.0]];
        bad_col.columns = vec![2];
        assert!(TimeTable::new(bad_col).is_err());
    }

    proptest! {
        #[test]
        fn next_event_is_strictly_increasing(start in 0.0_f64..2.0) {
            let table = step_table();
            let e = table.next_event_after(start);
            prop_assert!(e > start);
        }
    }
}
