//! Rolling per-user intensity history and trend detection.
//!
//! Grounded on `IntensityEngine._record_intensity` / `get_intensity_trend`:
//! a capped 100-reading window per user, trend decided by comparing the
//! mean of the last 5 readings against the mean of everything before them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tenant_types::{Trend, UserId};

const WINDOW_SIZE: usize = 100;
const RECENT_WINDOW: usize = 5;
const TREND_THRESHOLD: f64 = 10.0;

#[derive(Debug, Clone)]
struct Reading {
    #[allow(dead_code)]
    timestamp: DateTime<Utc>,
    intensity: f64,
}

/// Trend summary returned by [`IntensityHistory::trend`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrendReport {
    /// Direction of movement.
    pub trend: Trend,
    /// Signed change between the recent mean and the prior mean.
    pub change: f64,
    /// Most recent recorded intensity, or `0.0` if none recorded yet.
    pub current: f64,
    /// Total readings retained for this user (capped at [`WINDOW_SIZE`]).
    pub history_count: usize,
}

/// Per-user rolling intensity history, capped at the last 100 readings.
#[derive(Debug, Default)]
pub struct IntensityHistory {
    by_user: HashMap<UserId, Vec<Reading>>,
}

impl IntensityHistory {
    /// Create an empty history tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new reading for `user_id`, evicting the oldest once the
    /// window exceeds [`WINDOW_SIZE`].
    pub fn record(&mut self, user_id: UserId, intensity: f64) {
        let readings = self.by_user.entry(user_id).or_default();
        readings.push(Reading {
            timestamp: Utc::now(),
            intensity,
        });
        if readings.len() > WINDOW_SIZE {
            let overflow = readings.len() - WINDOW_SIZE;
            readings.drain(0..overflow);
        }
    }

    /// Compute the current trend for `user_id`. Returns a stable,
    /// zero-change report when no history has been recorded.
    pub fn trend(&self, user_id: &UserId) -> TrendReport {
        let readings = match self.by_user.get(user_id) {
            Some(r) if !r.is_empty() => r,
            _ => {
                return TrendReport {
                    trend: Trend::Stable,
                    change: 0.0,
                    current: 0.0,
                    history_count: 0,
                }
            }
        };

        let current = readings.last().unwrap().intensity;

        if readings.len() < 2 {
            return TrendReport {
                trend: Trend::Stable,
                change: 0.0,
                current,
                history_count: readings.len(),
            };
        }

        let tail_start = readings.len().saturating_sub(RECENT_WINDOW);
        let recent = &readings[tail_start..];
        let recent_mean = mean(recent.iter().map(|r| r.intensity));

        let older = &readings[..tail_start];
        let (trend, change) = if older.is_empty() {
            (Trend::Stable, 0.0)
        } else {
            let older_mean = mean(older.iter().map(|r| r.intensity));
            let change = recent_mean - older_mean;
            let trend = if change > TREND_THRESHOLD {
                Trend::Escalating
            } else if change < -TREND_THRESHOLD {
                Trend::Improving
            } else {
                Trend::Stable
            };
            (trend, change)
        };

        TrendReport {
            trend,
            change: round1(change),
            current,
            history_count: readings.len(),
        }
    }
}

fn mean(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let count = values.clone().count();
    if count == 0 {
        return 0.0;
    }
    values.sum::<f64>() / count as f64
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid() -> UserId {
        UserId::new("tenant-1").unwrap()
    }

    #[test]
    fn empty_history_is_stable_with_zero() {
        let history = IntensityHistory::new();
        let report = history.trend(&uid());
        assert_eq!(report.trend, Trend::Stable);
        assert_eq!(report.current, 0.0);
        assert_eq!(report.history_count, 0);
    }

    #[test]
    fn single_reading_is_stable() {
        let mut history = IntensityHistory::new();
        history.record(uid(), 42.0);
        let report = history.trend(&uid());
        assert_eq!(report.trend, Trend::Stable);
        assert_eq!(report.current, 42.0);
    }

    #[test]
    fn escalating_when_recent_mean_jumps() {
        let mut history = IntensityHistory::new();
        let user = uid();
        for v in [10.0, 10.0, 10.0, 10.0, 10.0, 10.0] {
            history.record(user.clone(), v);
        }
        for v in [50.0, 50.0, 50.0, 50.0, 50.0] {
            history.record(user.clone(), v);
        }
        let report = history.trend(&user);
        assert_eq!(report.trend, Trend::Escalating);
        assert!(report.change > 10.0);
    }

    #[test]
    fn improving_when_recent_mean_drops() {
        let mut history = IntensityHistory::new();
        let user = uid();
        for v in [80.0, 80.0, 80.0, 80.0, 80.0, 80.0] {
            history.record(user.clone(), v);
        }
        for v in [10.0, 10.0, 10.0, 10.0, 10.0] {
            history.record(user.clone(), v);
        }
        let report = history.trend(&user);
        assert_eq!(report.trend, Trend::Improving);
    }

    #[test]
    fn window_caps_at_100_readings() {
        let mut history = IntensityHistory::new();
        let user = uid();
        for i in 0..150 {
            history.record(user.clone(), i as f64);
        }
        let report = history.trend(&user);
        assert_eq!(report.history_count, 100);
        assert_eq!(report.current, 149.0);
    }
}
