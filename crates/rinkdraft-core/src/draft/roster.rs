// Roster composition quotas and a salary-capped roster.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::EngineError;
use crate::players::position::Position;
use crate::players::record::Player;

/// Default league salary cap, in whole currency units.
pub const DEFAULT_SALARY_CAP: u64 = 30_000_000;

// ---------------------------------------------------------------------------
// Quota
// ---------------------------------------------------------------------------

/// Exact number of players required at each position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterQuota {
    pub forwards: usize,
    pub defense: usize,
    #[serde(default)]
    pub goalies: usize,
}

impl RosterQuota {
    /// Three forwards and two defensemen.
    pub fn primary() -> Self {
        RosterQuota {
            forwards: 3,
            defense: 2,
            goalies: 0,
        }
    }

    /// The six-player variant with a goalie.
    pub fn legacy() -> Self {
        RosterQuota {
            goalies: 1,
            ..RosterQuota::primary()
        }
    }

    pub fn required(&self, position: Position) -> usize {
        match position {
            Position::Forward => self.forwards,
            Position::Defense => self.defense,
            Position::Goalie => self.goalies,
        }
    }

    pub fn total(&self) -> usize {
        self.forwards + self.defense + self.goalies
    }

    /// Positions with a non-zero requirement, in display order.
    pub fn positions(&self) -> Vec<Position> {
        Position::ALL
            .into_iter()
            .filter(|&p| self.required(p) > 0)
            .collect()
    }

    /// Whether `players` match this quota exactly.
    pub fn is_satisfied_by(&self, players: &[Player]) -> bool {
        let (f, d, g) = position_counts(players);
        f == self.forwards && d == self.defense && g == self.goalies
    }

    /// `Ok` when `players` match exactly, otherwise `CompositionUnsatisfied`.
    pub fn check(&self, players: &[Player]) -> Result<(), EngineError> {
        if self.is_satisfied_by(players) {
            return Ok(());
        }
        let (forwards, defense, goalies) = position_counts(players);
        Err(EngineError::CompositionUnsatisfied {
            forwards,
            defense,
            goalies,
            required_forwards: self.forwards,
            required_defense: self.defense,
            required_goalies: self.goalies,
        })
    }
}

impl Default for RosterQuota {
    fn default() -> Self {
        RosterQuota::primary()
    }
}

/// (forwards, defense, goalies) in `players`.
pub fn position_counts(players: &[Player]) -> (usize, usize, usize) {
    players
        .iter()
        .fold((0, 0, 0), |(f, d, g), p| match p.position {
            Position::Forward => (f + 1, d, g),
            Position::Defense => (f, d + 1, g),
            Position::Goalie => (f, d, g + 1),
        })
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Why a roster edit was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("{name} is already on the team")]
    Duplicate { name: String },

    #[error("the team already has {required} {position} slot(s) filled")]
    PositionFull { position: Position, required: usize },

    #[error("adding {name} (${salary}) would exceed the remaining cap of ${remaining_cap}")]
    CapExceeded {
        name: String,
        salary: u64,
        remaining_cap: u64,
    },

    #[error("{name} is not on the team")]
    NotOnRoster { name: String },
}

/// Players picked so far against a quota and a salary cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    quota: RosterQuota,
    salary_cap: u64,
    players: Vec<Player>,
}

impl Roster {
    pub fn new(quota: RosterQuota, salary_cap: u64) -> Self {
        Roster {
            quota,
            salary_cap,
            players: Vec::new(),
        }
    }

    pub fn quota(&self) -> RosterQuota {
        self.quota
    }

    pub fn salary_cap(&self) -> u64 {
        self.salary_cap
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

    pub fn total_salary(&self) -> u64 {
        self.players.iter().map(|p| p.salary).sum()
    }

    pub fn remaining_cap(&self) -> u64 {
        self.salary_cap.saturating_sub(self.total_salary())
    }

    pub fn count(&self, position: Position) -> usize {
        self.players.iter().filter(|p| p.position == position).count()
    }

    pub fn has_player(&self, name: &str) -> bool {
        self.players.iter().any(|p| p.name == name)
    }

    pub fn has_open_slot(&self, position: Position) -> bool {
        self.count(position) < self.quota.required(position)
    }

    pub fn is_complete(&self) -> bool {
        self.quota.is_satisfied_by(&self.players)
    }

    /// Check whether `player` could be added, without adding them.
    ///
    /// Checks run in order: duplicate, position quota, salary.
    pub fn can_add(&self, player: &Player) -> Result<(), RosterError> {
        if self.has_player(&player.name) {
            return Err(RosterError::Duplicate {
                name: player.name.clone(),
            });
        }
        if !self.has_open_slot(player.position) {
            return Err(RosterError::PositionFull {
                position: player.position,
                required: self.quota.required(player.position),
            });
        }
        let remaining_cap = self.remaining_cap();
        if player.salary > remaining_cap {
            return Err(RosterError::CapExceeded {
                name: player.name.clone(),
                salary: player.salary,
                remaining_cap,
            });
        }
        Ok(())
    }

    pub fn add(&mut self, player: Player) -> Result<(), RosterError> {
        self.can_add(&player)?;
        self.players.push(player);
        Ok(())
    }

    /// Remove the named player, returning their salary to the cap.
    pub fn remove(&mut self, name: &str) -> Result<Player, RosterError> {
        let idx = self
            .players
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| RosterError::NotOnRoster {
                name: name.to_string(),
            })?;
        Ok(self.players.remove(idx))
    }
}
