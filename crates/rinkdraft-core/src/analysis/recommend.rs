// Nearest-neighbour player recommendation in standardized metric space.
//
// One pipeline serves every position group: filter the pool to the group,
// standardize against that group, optionally project onto the top principal
// components, then rank by Euclidean distance to the target.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::metrics::MetricSet;
use crate::analysis::pca::PrincipalComponents;
use crate::analysis::standardize::{standardize, StandardizedPlayer};
use crate::error::EngineError;
use crate::players::position::Position;
use crate::players::record::PlayerTable;

/// Number of recommendations returned when the caller doesn't say.
pub const DEFAULT_NEIGHBORS: usize = 5;

/// A recommended player and how far they sit from the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub name: String,
    pub team: String,
    pub position: Position,
    pub salary: u64,
    pub distance: f64,
}

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// The `n` rows of `table` closest to `target`, nearest first.
///
/// The target row itself is never returned. Equal distances keep table
/// order.
pub fn find_closest(
    target: &str,
    table: &[StandardizedPlayer],
    n: usize,
) -> Result<Vec<Neighbor>, EngineError> {
    let target_idx = table
        .iter()
        .position(|p| p.name == target)
        .ok_or_else(|| EngineError::NotFound {
            name: target.to_string(),
        })?;
    let anchor = &table[target_idx].features;

    let mut ranked: Vec<(usize, f64)> = table
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != target_idx)
        .map(|(i, p)| (i, euclidean_distance(anchor, &p.features)))
        .collect();
    // sort_by is stable, which gives the pool-order tie break.
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(n);

    Ok(ranked
        .into_iter()
        .map(|(i, distance)| {
            let p = &table[i];
            Neighbor {
                name: p.name.clone(),
                team: p.team.clone(),
                position: p.position,
                salary: p.salary,
                distance,
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Configurable pipeline
// ---------------------------------------------------------------------------

/// Similar-player search for one position group.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommender {
    group: Position,
    metrics: MetricSet,
    pca_components: Option<usize>,
}

impl Recommender {
    pub fn new(group: Position, metrics: MetricSet) -> Self {
        Recommender {
            group,
            metrics,
            pca_components: None,
        }
    }

    /// Compare players on their top `components` principal components
    /// instead of the full standardized vector.
    pub fn with_pca(mut self, components: usize) -> Self {
        self.pca_components = Some(components);
        self
    }

    pub fn group(&self) -> Position {
        self.group
    }

    /// Recommend up to `n` players from `pool` similar to `target`.
    ///
    /// The target must exist in `pool` and play in this recommender's group.
    pub fn recommend(
        &self,
        target: &str,
        pool: &PlayerTable,
        n: usize,
    ) -> Result<Vec<Neighbor>, EngineError> {
        let target_player = pool.require(target)?;
        if target_player.position != self.group {
            return Err(EngineError::PositionMismatch {
                name: target.to_string(),
                expected: self.group,
                actual: target_player.position,
            });
        }

        let group_pool = pool.by_position(self.group);
        let (mut rows, _) = standardize(group_pool.players(), &self.metrics)?;

        if let Some(k) = self.pca_components {
            let matrix: Vec<Vec<f64>> = rows.iter().map(|r| r.features.clone()).collect();
            let pcs = PrincipalComponents::fit(&matrix, k)?;
            for row in &mut rows {
                row.features = pcs.project(&row.features);
            }
        }

        debug!(
            "Ranking {} {} candidates against '{}'",
            rows.len().saturating_sub(1),
            self.group.long_name(),
            target
        );
        find_closest(target, &rows, n)
    }
}

/// Similar forwards to `target` within `pool`.
pub fn recommend_forwards(
    target: &str,
    pool: &PlayerTable,
    metrics: &MetricSet,
    n: usize,
) -> Result<Vec<Neighbor>, EngineError> {
    Recommender::new(Position::Forward, metrics.clone()).recommend(target, pool, n)
}

/// Similar defensemen to `target` within `pool`.
pub fn recommend_defense(
    target: &str,
    pool: &PlayerTable,
    metrics: &MetricSet,
    n: usize,
) -> Result<Vec<Neighbor>, EngineError> {
    Recommender::new(Position::Defense, metrics.clone()).recommend(target, pool, n)
}

/// Similar goalies to `target` within `pool`.
pub fn recommend_goalies(
    target: &str,
    pool: &PlayerTable,
    metrics: &MetricSet,
    n: usize,
) -> Result<Vec<Neighbor>, EngineError> {
    Recommender::new(Position::Goalie, metrics.clone()).recommend(target, pool, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::players::record::Player;

    fn row(name: &str, features: Vec<f64>) -> StandardizedPlayer {
        StandardizedPlayer {
            name: name.into(),
            team: "TST".into(),
            position: Position::Forward,
            salary: 1_000_000,
            features,
        }
    }

    fn skater(name: &str, position: Position, goals: f64, hits: f64) -> Player {
        Player::new(name, "TST", position, 1_000_000)
            .with_stat("goals", goals)
            .with_stat("hits", hits)
    }

    #[test]
    fn distance_known_value() {
        assert_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    }

    #[test]
    fn returns_all_others_in_non_decreasing_distance() {
        let table = vec![
            row("Far", vec![10.0, 0.0]),
            row("Target", vec![0.0, 0.0]),
            row("Near", vec![1.0, 0.0]),
            row("Mid", vec![0.0, 4.0]),
        ];
        let result = find_closest("Target", &table, 10).unwrap();
        let names: Vec<&str> = result.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Near", "Mid", "Far"]);
        assert!(result.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn truncates_to_n() {
        let table: Vec<StandardizedPlayer> = (0..10)
            .map(|i| row(&format!("P{i}"), vec![i as f64]))
            .collect();
        let result = find_closest("P0", &table, 5).unwrap();
        assert_eq!(result.len(), 5);
        assert_eq!(result[0].name, "P1");
        assert_eq!(result[4].name, "P5");
    }

    #[test]
    fn ties_keep_table_order() {
        let table = vec![
            row("B", vec![-1.0]),
            row("Target", vec![0.0]),
            row("A", vec![1.0]),
            row("Clone", vec![0.0]),
        ];
        let result = find_closest("Target", &table, 3).unwrap();
        let names: Vec<&str> = result.iter().map(|n| n.name.as_str()).collect();
        // The zero-distance clone is returned; the target is not.
        assert_eq!(names, vec!["Clone", "B", "A"]);
    }

    #[test]
    fn unknown_target_is_not_found() {
        let table = vec![row("A", vec![0.0])];
        assert_eq!(
            find_closest("Nobody", &table, 5).unwrap_err(),
            EngineError::NotFound {
                name: "Nobody".into()
            }
        );
    }

    #[test]
    fn recommender_only_returns_same_group() {
        let pool = PlayerTable::from_players(vec![
            skater("F1", Position::Forward, 30.0, 20.0),
            skater("F2", Position::Forward, 28.0, 25.0),
            skater("D1", Position::Defense, 29.0, 22.0),
            skater("F3", Position::Forward, 5.0, 120.0),
        ]);
        let metrics = MetricSet::new(["goals", "hits"]);
        let result = recommend_forwards("F1", &pool, &metrics, 5).unwrap();
        let names: Vec<&str> = result.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["F2", "F3"]);
    }

    #[test]
    fn recommender_rejects_wrong_group() {
        let pool = PlayerTable::from_players(vec![
            skater("F1", Position::Forward, 30.0, 20.0),
            skater("D1", Position::Defense, 3.0, 80.0),
            skater("D2", Position::Defense, 5.0, 60.0),
        ]);
        let err = recommend_forwards("D1", &pool, &MetricSet::new(["goals", "hits"]), 5)
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::PositionMismatch {
                name: "D1".into(),
                expected: Position::Forward,
                actual: Position::Defense,
            }
        );
    }

    #[test]
    fn recommender_unknown_target() {
        let pool = PlayerTable::from_players(vec![skater("G1", Position::Goalie, 0.0, 1.0)]);
        let err = recommend_goalies("G9", &pool, &MetricSet::new(["hits"]), 5).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn pca_reduction_keeps_dominant_axis_ordering() {
        // Players lie almost on a line; one component preserves their order.
        let pool = PlayerTable::from_players(vec![
            skater("D0", Position::Defense, 0.0, 0.0),
            skater("D1", Position::Defense, 1.0, 2.1),
            skater("D2", Position::Defense, 2.0, 3.9),
            skater("D3", Position::Defense, 3.0, 6.2),
            skater("D4", Position::Defense, 4.0, 7.9),
        ]);
        let metrics = MetricSet::new(["goals", "hits"]);
        let result = Recommender::new(Position::Defense, metrics)
            .with_pca(1)
            .recommend("D0", &pool, 4)
            .unwrap();
        let names: Vec<&str> = result.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["D1", "D2", "D3", "D4"]);
    }

    fn goalie(name: &str, base: f64) -> Player {
        MetricSet::goalie_similarity()
            .iter()
            .enumerate()
            .fold(Player::new(name, "TST", Position::Goalie, 1_000_000), |p, (j, m)| {
                p.with_stat(m, base * (1.0 + 0.1 * j as f64))
            })
            .with_stat("points", 0.0)
    }

    #[test]
    fn goalies_compare_on_goalie_metrics() {
        let pool = PlayerTable::from_players(vec![
            goalie("G0", 10.0),
            goalie("G1", 20.0),
            goalie("G2", 32.0),
            goalie("G3", 60.0),
        ]);
        let result = recommend_goalies("G1", &pool, &MetricSet::goalie_similarity(), 5).unwrap();
        let names: Vec<&str> = result.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["G0", "G2", "G3"]);

        // Skater counting stats are flat across goalies.
        let err = recommend_goalies("G1", &pool, &MetricSet::new(["points", "goals"]), 5)
            .unwrap_err();
        assert!(matches!(err, EngineError::DegenerateMetric { .. }));
    }
}
