// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout classifier.
//!
//! A pure, ordered rule chain over (activity metrics, laps, stream). The
//! first matching rule wins, so an interval-shaped run that also covers a
//! long distance is reported as an interval. A rule missing its required
//! fields is skipped, never an error; the final rule always matches.

use crate::models::{ClassificationDetail, Lap, RecoveryPattern, StreamData};

/// Tunables for the rule chain.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Configured max heart rate (bpm); effort percentages are relative to
    /// this, not to a measured max.
    pub max_heart_rate: f64,
    /// Minimum pace gap (sec/km) between a work lap and the following
    /// recovery lap that marks an interval boundary.
    pub interval_pace_gap: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_heart_rate: 190.0,
            interval_pace_gap: 120.0,
        }
    }
}

/// The metrics the rule chain reads from an activity.
#[derive(Debug, Clone, Default)]
pub struct ActivityMetrics {
    /// Meters
    pub distance: Option<f64>,
    /// Seconds
    pub elapsed_time: Option<i64>,
    pub average_heartrate: Option<f64>,
}

/// Classifier outcome: a display title plus the structured rule result.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub title: String,
    pub detail: ClassificationDetail,
}

/// Classify a workout. Pure function of its inputs and the config.
pub fn classify(
    metrics: &ActivityMetrics,
    laps: &[Lap],
    _stream: &StreamData,
    config: &ClassifierConfig,
) -> Classification {
    if let Some(detail) = detect_interval(laps, config.interval_pace_gap) {
        return Classification {
            title: "Interval Run".to_string(),
            detail,
        };
    }

    let hr_pct = metrics
        .average_heartrate
        .map(|hr| hr / config.max_heart_rate * 100.0);

    // The remaining effort rules all need heart rate and distance.
    if let (Some(pct), Some(distance)) = (hr_pct, metrics.distance) {
        if (75.0..=85.0).contains(&pct)
            && (6_000.0..=15_000.0).contains(&distance)
            && lap_speed_stddev(laps).is_some_and(|sd| sd < 0.3)
        {
            return Classification {
                title: "Tempo Run".to_string(),
                detail: ClassificationDetail::Tempo {
                    distance,
                    avg_heartrate_pct: pct,
                },
            };
        }

        if pct >= 85.0 && (3_000.0..=10_000.0).contains(&distance) {
            return Classification {
                title: "Speed Run".to_string(),
                detail: ClassificationDetail::Speed {
                    distance,
                    avg_heartrate_pct: pct,
                },
            };
        }

        // Catch-all for moderate efforts, any distance.
        if (40.0..=75.0).contains(&pct) {
            return Classification {
                title: "Jogging".to_string(),
                detail: ClassificationDetail::Jogging {
                    distance,
                    avg_heartrate_pct: pct,
                },
            };
        }

        if (65.0..=75.0).contains(&pct) && distance >= 15_000.0 {
            return Classification {
                title: "Long Run".to_string(),
                detail: ClassificationDetail::LongRun {
                    distance,
                    avg_heartrate_pct: pct,
                },
            };
        }

        if pct <= 50.0 && (2_000.0..=8_000.0).contains(&distance) {
            return Classification {
                title: "Recovery Run".to_string(),
                detail: ClassificationDetail::Recovery {
                    distance,
                    avg_heartrate_pct: pct,
                },
            };
        }
    }

    Classification {
        title: "Workout".to_string(),
        detail: ClassificationDetail::Summary {
            distance: metrics.distance,
            elapsed_time: metrics.elapsed_time,
        },
    }
}

// ─── Interval detection ──────────────────────────────────────────────────

/// Detect a (work, recovery, work, recovery, …) lap structure.
///
/// A lap index i is a candidate boundary when lap i+1 is slower than lap i
/// by at least `pace_gap` sec/km. Candidates repeating at a stride of 2 form
/// the interval block; at least 2 repetitions are required.
fn detect_interval(laps: &[Lap], pace_gap: f64) -> Option<ClassificationDetail> {
    if laps.len() < 4 {
        return None;
    }

    // Pace per lap in sec/km; a lap without a usable speed kills the rule.
    let paces: Vec<f64> = laps
        .iter()
        .map(|lap| {
            if lap.average_speed > 0.0 {
                Some(1000.0 / lap.average_speed)
            } else {
                None
            }
        })
        .collect::<Option<Vec<_>>>()?;

    let candidates: Vec<usize> = (0..paces.len() - 1)
        .filter(|&i| paces[i + 1] - paces[i] >= pace_gap)
        .collect();

    let block = longest_stride2_run(&candidates);
    if block.len() < 2 {
        return None;
    }

    let work_distances: Vec<f64> = block.iter().map(|&i| laps[i].distance).collect();
    let work_paces: Vec<f64> = block.iter().map(|&i| paces[i]).collect();
    let recovery_laps: Vec<&Lap> = block.iter().map(|&i| &laps[i + 1]).collect();

    let recovery_distances: Vec<f64> = recovery_laps.iter().map(|lap| lap.distance).collect();
    let recovery_mean = mean(&recovery_distances);
    let recovery = if std_dev(&recovery_distances) < recovery_mean * 0.1 {
        RecoveryPattern::Distance {
            meters: recovery_mean.round(),
        }
    } else {
        let times: Vec<f64> = recovery_laps
            .iter()
            .map(|lap| lap.elapsed_time as f64)
            .collect();
        RecoveryPattern::Time {
            seconds: mean(&times).round(),
        }
    };

    Some(ClassificationDetail::Interval {
        reps: block.len(),
        rep_distance: mean(&work_distances).round(),
        rep_pace: mean(&work_paces),
        recovery,
    })
}

/// Longest run of values spaced exactly 2 apart within a sorted slice.
fn longest_stride2_run(candidates: &[usize]) -> Vec<usize> {
    let mut best: &[usize] = &[];
    let mut start = 0;
    for i in 0..candidates.len() {
        let end_of_run =
            i + 1 == candidates.len() || candidates[i + 1] != candidates[i] + 2;
        if end_of_run {
            if i + 1 - start > best.len() {
                best = &candidates[start..=i];
            }
            start = i + 1;
        }
    }
    best.to_vec()
}

/// Population standard deviation of lap speeds; `None` without laps.
fn lap_speed_stddev(laps: &[Lap]) -> Option<f64> {
    if laps.is_empty() {
        return None;
    }
    let speeds: Vec<f64> = laps.iter().map(|lap| lap.average_speed).collect();
    Some(std_dev(&speeds))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lap with a given pace (sec/km) and distance.
    fn lap(index: i32, pace_sec_per_km: f64, distance: f64) -> Lap {
        Lap {
            lap_index: index,
            distance,
            elapsed_time: (pace_sec_per_km * distance / 1000.0) as i64,
            average_speed: 1000.0 / pace_sec_per_km,
            max_speed: 1000.0 / pace_sec_per_km + 0.5,
            average_heartrate: None,
            max_heartrate: None,
            average_cadence: None,
            elevation_gain: None,
        }
    }

    fn metrics(distance: Option<f64>, elapsed: Option<i64>, hr: Option<f64>) -> ActivityMetrics {
        ActivityMetrics {
            distance,
            elapsed_time: elapsed,
            average_heartrate: hr,
        }
    }

    fn config() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    #[test]
    fn test_interval_detection_three_reps() {
        // Alternating work/recovery paces; three work laps at indices 0,2,4.
        let paces = [240.0, 420.0, 235.0, 430.0, 245.0, 410.0];
        let laps: Vec<Lap> = paces
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let distance = if i % 2 == 0 { 1000.0 } else { 400.0 };
                lap(i as i32, p, distance)
            })
            .collect();

        let result = classify(
            &metrics(Some(4200.0), Some(1800), Some(160.0)),
            &laps,
            &StreamData::default(),
            &config(),
        );

        assert_eq!(result.title, "Interval Run");
        match result.detail {
            ClassificationDetail::Interval {
                reps,
                rep_distance,
                rep_pace,
                recovery,
            } => {
                assert_eq!(reps, 3);
                assert_eq!(rep_distance, 1000.0);
                // Mean of 240, 235, 245
                assert!((rep_pace - 240.0).abs() < 0.01);
                assert_eq!(recovery, RecoveryPattern::Distance { meters: 400.0 });
            }
            other => panic!("expected interval, got {:?}", other),
        }
    }

    #[test]
    fn test_interval_uneven_recovery_described_by_time() {
        // Work laps constant, recovery distances spread far apart.
        let laps = vec![
            lap(0, 240.0, 1000.0),
            lap(1, 420.0, 200.0),
            lap(2, 240.0, 1000.0),
            lap(3, 420.0, 600.0),
            lap(4, 240.0, 1000.0),
            lap(5, 420.0, 250.0),
        ];

        let result = classify(
            &metrics(Some(4050.0), Some(1700), Some(158.0)),
            &laps,
            &StreamData::default(),
            &config(),
        );

        match result.detail {
            ClassificationDetail::Interval { recovery, .. } => {
                assert!(matches!(recovery, RecoveryPattern::Time { .. }));
            }
            other => panic!("expected interval, got {:?}", other),
        }
    }

    #[test]
    fn test_interval_requires_two_repetitions() {
        // One fast/slow pair only.
        let laps = vec![
            lap(0, 240.0, 1000.0),
            lap(1, 420.0, 400.0),
            lap(2, 400.0, 1000.0),
            lap(3, 405.0, 1000.0),
        ];

        let result = classify(
            &metrics(Some(3400.0), Some(1500), None),
            &laps,
            &StreamData::default(),
            &config(),
        );
        assert_ne!(result.title, "Interval Run");
    }

    #[test]
    fn test_interval_beats_distance_rules() {
        // Interval structure over a long total distance still reads as an
        // interval, not a long run.
        let paces = [250.0, 400.0, 250.0, 395.0, 255.0, 410.0];
        let laps: Vec<Lap> = paces
            .iter()
            .enumerate()
            .map(|(i, &p)| lap(i as i32, p, 3000.0))
            .collect();

        let result = classify(
            &metrics(Some(18_000.0), Some(5400), Some(133.0)),
            &laps,
            &StreamData::default(),
            &config(),
        );
        assert_eq!(result.title, "Interval Run");
    }

    #[test]
    fn test_tempo_run() {
        // 80% of 190 = 152 bpm, 10 km, steady lap speeds.
        let laps: Vec<Lap> = (0..10).map(|i| lap(i, 300.0, 1000.0)).collect();

        let result = classify(
            &metrics(Some(10_000.0), Some(3000), Some(152.0)),
            &laps,
            &StreamData::default(),
            &config(),
        );
        assert_eq!(result.title, "Tempo Run");
    }

    #[test]
    fn test_high_lap_variance_is_not_tempo() {
        let mut laps: Vec<Lap> = (0..5).map(|i| lap(i, 300.0, 1000.0)).collect();
        laps.extend((5..10).map(|i| lap(i, 390.0, 1000.0)));

        let result = classify(
            &metrics(Some(10_000.0), Some(3450), Some(152.0)),
            &laps,
            &StreamData::default(),
            &config(),
        );
        assert_ne!(result.title, "Tempo Run");
    }

    #[test]
    fn test_speed_run() {
        // 88% of max, 5 km.
        let result = classify(
            &metrics(Some(5_000.0), Some(1200), Some(167.0)),
            &[],
            &StreamData::default(),
            &config(),
        );
        assert_eq!(result.title, "Speed Run");
    }

    #[test]
    fn test_jogging_catch_all() {
        // 60% of max, 20 km: moderate effort wins over the distance rules.
        let result = classify(
            &metrics(Some(20_000.0), Some(7200), Some(114.0)),
            &[],
            &StreamData::default(),
            &config(),
        );
        assert_eq!(result.title, "Jogging");
    }

    #[test]
    fn test_fallback_without_heartrate() {
        let result = classify(
            &metrics(Some(5000.0), Some(1500), None),
            &[],
            &StreamData::default(),
            &config(),
        );

        assert_eq!(result.title, "Workout");
        assert_eq!(
            result.detail,
            ClassificationDetail::Summary {
                distance: Some(5000.0),
                elapsed_time: Some(1500),
            }
        );
        assert_eq!(result.detail.render(), "5.0 km in 25:00");
    }

    #[test]
    fn test_fallback_without_distance() {
        // Heart rate present but no distance: effort rules are skipped.
        let result = classify(
            &metrics(None, Some(1800), Some(150.0)),
            &[],
            &StreamData::default(),
            &config(),
        );
        assert_eq!(result.title, "Workout");
    }

    #[test]
    fn test_nothing_at_all_still_classifies() {
        let result = classify(
            &metrics(None, None, None),
            &[],
            &StreamData::default(),
            &config(),
        );
        assert_eq!(result.detail.render(), "Workout");
    }

    #[test]
    fn test_longest_stride2_run_picks_largest_block() {
        assert_eq!(longest_stride2_run(&[0, 2, 4, 7, 9]), vec![0, 2, 4]);
        assert_eq!(longest_stride2_run(&[1, 3, 5, 7]), vec![1, 3, 5, 7]);
        assert_eq!(longest_stride2_run(&[0, 1, 2]), vec![0]);
        assert!(longest_stride2_run(&[]).is_empty());
    }
}
