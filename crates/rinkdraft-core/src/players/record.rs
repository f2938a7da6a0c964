// Player records and in-memory player tables.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::position::Position;
use crate::analysis::metrics::MetricSet;
use crate::error::EngineError;

/// One player from a season snapshot: identity, salary and raw metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub team: String,
    pub position: Position,
    /// Cap hit in whole currency units.
    pub salary: u64,
    /// Raw (unstandardized) metric values keyed by column name.
    pub stats: BTreeMap<String, f64>,
}

impl Player {
    pub fn new(name: &str, team: &str, position: Position, salary: u64) -> Self {
        Player {
            name: name.to_string(),
            team: team.to_string(),
            position,
            salary,
            stats: BTreeMap::new(),
        }
    }

    /// Builder-style helper used by loaders and fixtures.
    pub fn with_stat(mut self, metric: &str, value: f64) -> Self {
        self.stats.insert(metric.to_string(), value);
        self
    }

    pub fn stat(&self, metric: &str) -> Option<f64> {
        self.stats.get(metric).copied()
    }

    /// Raw values for `metrics`, in metric-set order.
    ///
    /// Fails with `Schema` naming the first metric the player lacks.
    pub fn stat_vector(&self, metrics: &MetricSet) -> Result<Vec<f64>, EngineError> {
        metrics
            .iter()
            .map(|m| {
                self.stat(m).ok_or_else(|| EngineError::Schema {
                    column: m.to_string(),
                })
            })
            .collect()
    }
}

/// An ordered table of players with unique names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerTable {
    players: Vec<Player>,
}

impl PlayerTable {
    /// Build a table, keeping the first row for any repeated name.
    pub fn from_players(players: Vec<Player>) -> Self {
        let mut seen: HashSet<String> = HashSet::new();
        let mut kept = Vec::with_capacity(players.len());
        for player in players {
            if !seen.insert(player.name.clone()) {
                warn!("duplicate player '{}' in table, keeping first row", player.name);
                continue;
            }
            kept.push(player);
        }
        PlayerTable { players: kept }
    }

    /// Concatenate tables (e.g. forwards + defense into one reference
    /// population). Later duplicates are dropped.
    pub fn concat(tables: &[&PlayerTable]) -> Self {
        let all: Vec<Player> = tables
            .iter()
            .flat_map(|t| t.players.iter().cloned())
            .collect();
        PlayerTable::from_players(all)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn into_players(self) -> Vec<Player> {
        self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Player> {
        self.players.iter()
    }

    pub fn find(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    /// Like `find`, but a missing name is a `NotFound` error.
    pub fn require(&self, name: &str) -> Result<&Player, EngineError> {
        self.find(name).ok_or_else(|| EngineError::NotFound {
            name: name.to_string(),
        })
    }

    /// Players at `position`, in table order.
    pub fn by_position(&self, position: Position) -> PlayerTable {
        PlayerTable {
            players: self
                .players
                .iter()
                .filter(|p| p.position == position)
                .cloned()
                .collect(),
        }
    }
}

/// Every player whose salary is at most `max_salary`, in pool order.
///
/// Returns `None` for a zero limit, which the caller should treat as "no
/// limit entered" rather than "nobody qualifies".
pub fn players_within_salary(pool: &PlayerTable, max_salary: u64) -> Option<Vec<&Player>> {
    if max_salary == 0 {
        return None;
    }
    Some(pool.iter().filter(|p| p.salary <= max_salary).collect())
}
