// Hockey positions used for roster quotas and recommendation groups.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three position categories a player can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Forward,
    Defense,
    Goalie,
}

impl Position {
    pub const ALL: [Position; 3] = [Position::Forward, Position::Defense, Position::Goalie];

    /// Parse a position string into a Position enum.
    ///
    /// Handles the usual abbreviations:
    /// - "F", "C", "L", "R", "LW", "RW", "W" -> Forward
    /// - "D", "LD", "RD" -> Defense
    /// - "G" -> Goalie
    ///
    /// Full words ("Forward", "Defense", "Defence", "Goalie") are accepted too.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "F" | "C" | "L" | "R" | "LW" | "RW" | "W" | "FORWARD" => Some(Position::Forward),
            "D" | "LD" | "RD" | "DEFENSE" | "DEFENCE" => Some(Position::Defense),
            "G" | "GOALIE" | "GOALTENDER" => Some(Position::Goalie),
            _ => None,
        }
    }

    /// Decode the legacy `position_encoded` column (0 = defense, 1 = forward).
    pub fn from_encoded(code: i64) -> Option<Self> {
        match code {
            0 => Some(Position::Defense),
            1 => Some(Position::Forward),
            _ => None,
        }
    }

    /// Return the single-letter code written to snapshot files.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Forward => "F",
            Position::Defense => "D",
            Position::Goalie => "G",
        }
    }

    /// Human-readable name, used in log lines and error messages.
    pub fn long_name(&self) -> &'static str {
        match self {
            Position::Forward => "forward",
            Position::Defense => "defenseman",
            Position::Goalie => "goalie",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.long_name())
    }
}
