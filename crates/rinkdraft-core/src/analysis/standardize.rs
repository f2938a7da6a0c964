// Z-score standardization of player metrics against a reference population.

use serde::{Deserialize, Serialize};

use crate::analysis::metrics::MetricSet;
use crate::error::EngineError;
use crate::players::position::Position;
use crate::players::record::Player;

// ---------------------------------------------------------------------------
// Population statistics
// ---------------------------------------------------------------------------

/// Mean and standard deviation for a single metric across a population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub mean: f64,
    pub stdev: f64,
}

/// Threshold below which standard deviation is treated as zero.
const STDEV_EPSILON: f64 = 1e-9;

/// Compute mean and standard deviation for a slice of values.
///
/// Returns `MetricStats { mean: 0.0, stdev: 0.0 }` for an empty slice.
/// Uses the population standard deviation (N denominator): the reference
/// table is the whole league, not a sample of it.
pub fn compute_metric_stats(values: &[f64]) -> MetricStats {
    if values.is_empty() {
        return MetricStats {
            mean: 0.0,
            stdev: 0.0,
        };
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    MetricStats {
        mean,
        stdev: variance.sqrt(),
    }
}

// ---------------------------------------------------------------------------
// Standardized rows
// ---------------------------------------------------------------------------

/// A player's identity carried alongside their standardized feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizedPlayer {
    pub name: String,
    pub team: String,
    pub position: Position,
    pub salary: u64,
    pub features: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Standardizer
// ---------------------------------------------------------------------------

/// A fitted per-metric (mean, stdev) transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    metrics: MetricSet,
    stats: Vec<MetricStats>,
}

impl Standardizer {
    /// Fit on the raw metric values of `players`.
    pub fn fit(players: &[Player], metrics: &MetricSet) -> Result<Self, EngineError> {
        let rows = players
            .iter()
            .map(|p| p.stat_vector(metrics))
            .collect::<Result<Vec<_>, _>>()?;
        Self::fit_rows(&rows, metrics)
    }

    /// Fit on a pre-extracted matrix whose columns follow `metrics`.
    ///
    /// Every column must vary across the rows; a constant column would divide
    /// by zero and is reported as `DegenerateMetric`.
    pub fn fit_rows(rows: &[Vec<f64>], metrics: &MetricSet) -> Result<Self, EngineError> {
        if rows.is_empty() {
            return Err(EngineError::EmptyPopulation);
        }
        let mut stats = Vec::with_capacity(metrics.len());
        for (col, metric) in metrics.iter().enumerate() {
            let values: Vec<f64> = rows
                .iter()
                .map(|r| {
                    r.get(col).copied().ok_or_else(|| EngineError::Schema {
                        column: metric.to_string(),
                    })
                })
                .collect::<Result<_, _>>()?;
            let s = compute_metric_stats(&values);
            if !s.stdev.is_finite() || s.stdev < STDEV_EPSILON {
                return Err(EngineError::DegenerateMetric {
                    metric: metric.to_string(),
                });
            }
            stats.push(s);
        }
        Ok(Standardizer {
            metrics: metrics.clone(),
            stats,
        })
    }

    pub fn metrics(&self) -> &MetricSet {
        &self.metrics
    }

    pub fn stats(&self) -> &[MetricStats] {
        &self.stats
    }

    /// `(x - mean) / stdev` for each column of a raw row.
    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(&self.stats)
            .map(|(x, s)| (x - s.mean) / s.stdev)
            .collect()
    }

    pub fn transform_player(&self, player: &Player) -> Result<StandardizedPlayer, EngineError> {
        let raw = player.stat_vector(&self.metrics)?;
        Ok(StandardizedPlayer {
            name: player.name.clone(),
            team: player.team.clone(),
            position: player.position,
            salary: player.salary,
            features: self.transform_row(&raw),
        })
    }

    pub fn transform(&self, players: &[Player]) -> Result<Vec<StandardizedPlayer>, EngineError> {
        players.iter().map(|p| self.transform_player(p)).collect()
    }
}

/// Fit a standardizer on `players` and transform the same rows.
pub fn standardize(
    players: &[Player],
    metrics: &MetricSet,
) -> Result<(Vec<StandardizedPlayer>, Standardizer), EngineError> {
    let standardizer = Standardizer::fit(players, metrics)?;
    let rows = standardizer.transform(players)?;
    Ok((rows, standardizer))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn player(name: &str, goals: f64, hits: f64) -> Player {
        Player::new(name, "TST", Position::Forward, 1_000_000)
            .with_stat("goals", goals)
            .with_stat("hits", hits)
    }

    #[test]
    fn metric_stats_known_values() {
        // Mean = 5.0, population variance = 4.0, stdev = 2.0
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = compute_metric_stats(&values);
        assert!(approx_eq(stats.mean, 5.0, 1e-10));
        assert!(approx_eq(stats.stdev, 2.0, 1e-10));
    }

    #[test]
    fn metric_stats_empty() {
        let stats = compute_metric_stats(&[]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.stdev, 0.0);
    }

    #[test]
    fn standardized_columns_have_zero_mean_unit_stdev() {
        let players = vec![
            player("A", 10.0, 100.0),
            player("B", 25.0, 40.0),
            player("C", 3.0, 75.0),
            player("D", 41.0, 12.0),
            player("E", 17.0, 160.0),
        ];
        let metrics = MetricSet::new(["goals", "hits"]);
        let (rows, _) = standardize(&players, &metrics).unwrap();

        for col in 0..metrics.len() {
            let column: Vec<f64> = rows.iter().map(|r| r.features[col]).collect();
            let stats = compute_metric_stats(&column);
            assert!(approx_eq(stats.mean, 0.0, 1e-12), "mean {}", stats.mean);
            assert!(approx_eq(stats.stdev, 1.0, 1e-12), "stdev {}", stats.stdev);
        }
    }

    #[test]
    fn identity_fields_carried_through() {
        let players = vec![player("A", 1.0, 2.0), player("B", 3.0, 5.0)];
        let metrics = MetricSet::new(["goals", "hits"]);
        let (rows, _) = standardize(&players, &metrics).unwrap();
        assert_eq!(rows[0].name, "A");
        assert_eq!(rows[1].team, "TST");
        assert_eq!(rows[1].salary, 1_000_000);
        assert_eq!(rows[0].position, Position::Forward);
        assert!(approx_eq(rows[0].features[0], -1.0, 1e-12));
        assert!(approx_eq(rows[1].features[0], 1.0, 1e-12));
    }

    #[test]
    fn zero_variance_metric_is_degenerate() {
        let players = vec![player("A", 5.0, 1.0), player("B", 5.0, 2.0)];
        let err = Standardizer::fit(&players, &MetricSet::new(["goals", "hits"])).unwrap_err();
        assert_eq!(
            err,
            EngineError::DegenerateMetric {
                metric: "goals".into()
            }
        );
    }

    #[test]
    fn missing_metric_is_schema_error() {
        let players = vec![player("A", 5.0, 1.0), player("B", 6.0, 2.0)];
        let err = Standardizer::fit(&players, &MetricSet::new(["goals", "assists"])).unwrap_err();
        assert_eq!(
            err,
            EngineError::Schema {
                column: "assists".into()
            }
        );
    }

    #[test]
    fn empty_population_rejected() {
        let err = Standardizer::fit(&[], &MetricSet::new(["goals"])).unwrap_err();
        assert_eq!(err, EngineError::EmptyPopulation);
    }

    #[test]
    fn transform_uses_fitted_population() {
        let reference = vec![player("A", 0.0, 0.0), player("B", 10.0, 20.0)];
        let metrics = MetricSet::new(["goals", "hits"]);
        let standardizer = Standardizer::fit(&reference, &metrics).unwrap();

        // mean (5, 10), stdev (5, 10)
        let outsider = standardizer.transform_player(&player("Z", 15.0, 0.0)).unwrap();
        assert!(approx_eq(outsider.features[0], 2.0, 1e-12));
        assert!(approx_eq(outsider.features[1], -1.0, 1e-12));
    }
}
