// Linear roster scoring from persisted loadings.
//
// Scores use raw metric values, not z-scores. The loadings only carry the
// relative importance learned from population variance, so high-volume
// counting stats (goals, assists) dominate a player's absolute score.

use serde::{Deserialize, Serialize};

use crate::analysis::loadings::Loadings;
use crate::analysis::metrics::MetricSet;
use crate::players::position::Position;
use crate::players::record::Player;

/// `raw value × loading` for one metric of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricContribution {
    pub metric: String,
    pub value: f64,
}

/// A player's total score and the per-metric terms behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub name: String,
    pub position: Position,
    pub score: f64,
    pub contributions: Vec<MetricContribution>,
}

impl PlayerScore {
    pub fn contribution(&self, metric: &str) -> Option<f64> {
        self.contributions
            .iter()
            .find(|c| c.metric == metric)
            .map(|c| c.value)
    }
}

/// Per-player scores for a roster plus their sum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamScore {
    pub players: Vec<PlayerScore>,
    pub total: f64,
}

/// Σ `value × loading` over every loading metric the player has.
pub fn player_score(player: &Player, loadings: &Loadings) -> f64 {
    loadings
        .iter()
        .filter_map(|(metric, weight)| player.stat(metric).map(|v| v * weight))
        .sum()
}

/// Contribution terms for the metrics in `metrics` that both the player and
/// the loadings carry, in metric-set order.
pub fn player_contributions(
    player: &Player,
    loadings: &Loadings,
    metrics: &MetricSet,
) -> Vec<MetricContribution> {
    metrics
        .iter()
        .filter_map(|metric| {
            let value = player.stat(metric)?;
            let weight = loadings.get(metric)?;
            Some(MetricContribution {
                metric: metric.to_string(),
                value: value * weight,
            })
        })
        .collect()
}

/// Score one player.
///
/// `score` sums over every loading metric, while `contributions` only cover
/// `metrics`. When the loadings file carries metrics outside that set the
/// contributions do not add up to the score.
pub fn score_player(player: &Player, loadings: &Loadings, metrics: &MetricSet) -> PlayerScore {
    PlayerScore {
        name: player.name.clone(),
        position: player.position,
        score: player_score(player, loadings),
        contributions: player_contributions(player, loadings, metrics),
    }
}

/// Score every player on a roster. The team score is the sum of player
/// scores.
pub fn score_team(players: &[Player], loadings: &Loadings, metrics: &MetricSet) -> TeamScore {
    let players: Vec<PlayerScore> = players
        .iter()
        .map(|p| score_player(p, loadings, metrics))
        .collect();
    let total = players.iter().map(|p| p.score).sum();
    TeamScore { players, total }
}
