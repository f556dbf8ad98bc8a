// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Training activity models for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored training activity.
///
/// The pair (provider, external_activity_id) is globally unique for ingested
/// activities; re-ingesting the same external id is a no-op. Manual uploads
/// carry neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingActivity {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Source provider ("strava"), `None` for manual uploads.
    pub provider: Option<String>,
    /// Activity id on the provider side.
    pub external_activity_id: Option<i64>,
    pub start_date: DateTime<Utc>,
    /// Meters
    pub distance: Option<f64>,
    /// Seconds
    pub elapsed_time: Option<i64>,
    /// m/s
    pub average_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub average_cadence: Option<f64>,
    /// Classifier title, e.g. "Interval Run"
    pub title: String,
    pub detail: ClassificationDetail,
    pub created_at: DateTime<Utc>,
}

/// One lap of a training activity. Created together with its parent and
/// removed only by cascading deletion of the parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lap {
    pub lap_index: i32,
    /// Meters
    pub distance: f64,
    /// Seconds
    pub elapsed_time: i64,
    /// m/s
    pub average_speed: f64,
    pub max_speed: f64,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub average_cadence: Option<f64>,
    pub elevation_gain: Option<f64>,
}

/// Per-second sample series of a training activity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamData {
    pub heartrate: Option<Vec<f64>>,
    pub cadence: Option<Vec<f64>>,
    pub distance: Option<Vec<f64>>,
    pub velocity: Option<Vec<f64>>,
    pub altitude: Option<Vec<f64>>,
    pub time: Option<Vec<i64>>,
}

/// Structured classifier outcome, one variant per rule.
///
/// Rendering to a display string is a separate step so callers can work with
/// the rule's parameters instead of parsing text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationDetail {
    Interval {
        /// Number of work repetitions
        reps: usize,
        /// Rounded mean work-lap distance, meters
        rep_distance: f64,
        /// Mean work-lap pace, sec/km
        rep_pace: f64,
        recovery: RecoveryPattern,
    },
    Tempo {
        distance: f64,
        avg_heartrate_pct: f64,
    },
    Speed {
        distance: f64,
        avg_heartrate_pct: f64,
    },
    Jogging {
        distance: f64,
        avg_heartrate_pct: f64,
    },
    LongRun {
        distance: f64,
        avg_heartrate_pct: f64,
    },
    Recovery {
        distance: f64,
        avg_heartrate_pct: f64,
    },
    /// Fallback when heart-rate or distance data is missing.
    Summary {
        distance: Option<f64>,
        elapsed_time: Option<i64>,
    },
}

/// How the recovery segments of an interval workout repeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RecoveryPattern {
    /// Recovery lap distances are nearly constant.
    Distance { meters: f64 },
    /// Recovery varies by distance; described by time instead.
    Time { seconds: f64 },
}

impl ClassificationDetail {
    /// Human-readable rendering of the structured outcome.
    pub fn render(&self) -> String {
        match self {
            ClassificationDetail::Interval {
                reps,
                rep_distance,
                rep_pace,
                recovery,
            } => {
                let recovery_desc = match recovery {
                    RecoveryPattern::Distance { meters } => format!("{:.0} m recovery", meters),
                    RecoveryPattern::Time { seconds } => format!("{:.0} s recovery", seconds),
                };
                format!(
                    "{} x {:.0} m @ {} with {}",
                    reps,
                    rep_distance,
                    format_pace(*rep_pace),
                    recovery_desc
                )
            }
            ClassificationDetail::Tempo {
                distance,
                avg_heartrate_pct,
            } => format!(
                "Tempo {:.1} km at {:.0}% of max HR",
                distance / 1000.0,
                avg_heartrate_pct
            ),
            ClassificationDetail::Speed {
                distance,
                avg_heartrate_pct,
            } => format!(
                "Speed work {:.1} km at {:.0}% of max HR",
                distance / 1000.0,
                avg_heartrate_pct
            ),
            ClassificationDetail::Jogging {
                distance,
                avg_heartrate_pct,
            } => format!(
                "Easy {:.1} km at {:.0}% of max HR",
                distance / 1000.0,
                avg_heartrate_pct
            ),
            ClassificationDetail::LongRun {
                distance,
                avg_heartrate_pct,
            } => format!(
                "Long run {:.1} km at {:.0}% of max HR",
                distance / 1000.0,
                avg_heartrate_pct
            ),
            ClassificationDetail::Recovery {
                distance,
                avg_heartrate_pct,
            } => format!(
                "Recovery {:.1} km at {:.0}% of max HR",
                distance / 1000.0,
                avg_heartrate_pct
            ),
            ClassificationDetail::Summary {
                distance,
                elapsed_time,
            } => match (distance, elapsed_time) {
                (Some(d), Some(t)) => {
                    format!("{:.1} km in {}", d / 1000.0, format_duration(*t))
                }
                (Some(d), None) => format!("{:.1} km", d / 1000.0),
                (None, Some(t)) => format_duration(*t),
                (None, None) => "Workout".to_string(),
            },
        }
    }
}

/// Format a pace in sec/km as "M:SS/km".
fn format_pace(sec_per_km: f64) -> String {
    let total = sec_per_km.round() as i64;
    format!("{}:{:02}/km", total / 60, total % 60)
}

/// Format elapsed seconds as "H:MM:SS" or "M:SS".
fn format_duration(secs: i64) -> String {
    if secs >= 3600 {
        format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else {
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

/// Activity list entry returned by the read path (and hashed for ETags).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub activity_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub distance: Option<f64>,
    pub avg_speed: Option<f64>,
    pub elapsed_time: Option<i64>,
    pub title: String,
    pub detail: ClassificationDetail,
}

impl ActivitySummary {
    pub fn from_activity(activity: &TrainingActivity) -> Self {
        Self {
            activity_id: activity.id,
            start_date: activity.start_date,
            distance: activity.distance,
            avg_speed: activity.average_speed,
            elapsed_time: activity.elapsed_time,
            title: activity.title.clone(),
            detail: activity.detail.clone(),
        }
    }
}

/// Laps and stream of a single activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityDetail {
    pub laps: Vec<Lap>,
    pub stream: Option<StreamData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_interval() {
        let detail = ClassificationDetail::Interval {
            reps: 3,
            rep_distance: 1000.0,
            rep_pace: 240.0,
            recovery: RecoveryPattern::Distance { meters: 400.0 },
        };
        assert_eq!(detail.render(), "3 x 1000 m @ 4:00/km with 400 m recovery");
    }

    #[test]
    fn test_render_summary_full() {
        let detail = ClassificationDetail::Summary {
            distance: Some(5000.0),
            elapsed_time: Some(1500),
        };
        assert_eq!(detail.render(), "5.0 km in 25:00");
    }

    #[test]
    fn test_render_summary_missing_everything() {
        let detail = ClassificationDetail::Summary {
            distance: None,
            elapsed_time: None,
        };
        assert_eq!(detail.render(), "Workout");
    }

    #[test]
    fn test_format_duration_over_an_hour() {
        let detail = ClassificationDetail::Summary {
            distance: Some(21097.0),
            elapsed_time: Some(5400),
        };
        assert_eq!(detail.render(), "21.1 km in 1:30:00");
    }
}
