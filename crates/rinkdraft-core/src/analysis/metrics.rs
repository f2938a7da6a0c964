// Metric sets and per-metric weight multipliers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metrics used to derive loadings and score rosters.
pub const SCORING_METRICS: &[&str] = &[
    "giveaways",
    "goals",
    "high_danger_goals",
    "high_danger_shots",
    "hits",
    "low_danger_goals",
    "low_danger_shots",
    "medium_danger_goals",
    "medium_danger_shots",
    "shifts",
    "shot_attempts",
    "shots_on_goal",
    "takeaways",
    "faceoffs_lost",
    "faceoffs_won",
    "icetime",
    "on_ice_corsi_percentage",
    "on_ice_fenwick_percentage",
    "shots_blocked_by_player",
    "assists",
];

/// Metrics the AI drafter and the skater recommenders compare candidates on.
pub const SIMILARITY_METRICS: &[&str] = &[
    "goals",
    "high_danger_goals",
    "high_danger_shots",
    "hits",
    "penalty_minutes",
    "points",
    "shifts",
    "shots_on_goal",
    "games_played",
    "assists",
];

/// Goalie comparison metrics. Goalie exports report the shot and goal
/// columns as counts against.
pub const GOALIE_SIMILARITY_METRICS: &[&str] = &[
    "games_played",
    "icetime",
    "goals",
    "high_danger_goals",
    "high_danger_shots",
    "medium_danger_goals",
    "medium_danger_shots",
    "low_danger_goals",
    "low_danger_shots",
    "rebounds",
];

/// The wide, unweighted metric set.
pub const EXTENDED_METRICS: &[&str] = &[
    "d_zone_shift_starts",
    "giveaways",
    "goals",
    "high_danger_goals",
    "high_danger_shots",
    "hits",
    "low_danger_goals",
    "low_danger_shots",
    "medium_danger_goals",
    "medium_danger_shots",
    "missed_shots",
    "o_zone_shift_starts",
    "penalty_minutes",
    "points",
    "rebound_goals",
    "rebounds",
    "shifts",
    "shot_attempts",
    "shots_on_goal",
    "takeaways",
    "faceoffs_lost",
    "faceoffs_won",
    "games_played",
    "icetime",
    "on_ice_corsi_percentage",
    "on_ice_fenwick_percentage",
    "penalties_drawn",
    "shots_blocked_by_player",
    "assists",
];

/// Priority multipliers applied to raw values before loadings are fitted.
/// Goals and assists dominate; faceoffs barely register.
pub const DEFAULT_WEIGHTS: &[(&str, f64)] = &[
    ("giveaways", 1.0),
    ("goals", 25.0),
    ("high_danger_goals", 4.0),
    ("high_danger_shots", 4.0),
    ("hits", 1.0),
    ("low_danger_goals", 0.5),
    ("low_danger_shots", 0.5),
    ("medium_danger_goals", 2.0),
    ("medium_danger_shots", 2.0),
    ("shifts", 1.0),
    ("shot_attempts", 0.5),
    ("shots_on_goal", 1.0),
    ("takeaways", 0.5),
    ("faceoffs_lost", 0.3),
    ("faceoffs_won", 0.3),
    ("icetime", 1.0),
    ("on_ice_corsi_percentage", 1.0),
    ("on_ice_fenwick_percentage", 1.0),
    ("shots_blocked_by_player", 1.0),
    ("assists", 20.0),
];

// ---------------------------------------------------------------------------
// MetricSet
// ---------------------------------------------------------------------------

/// An ordered list of metric names defining a feature space.
///
/// The same set must be used to fit a transform and to apply it. In TOML a
/// set is either a list of names or the name of a preset
/// (`metrics = "extended"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MetricSetRepr", into = "Vec<String>")]
pub struct MetricSet {
    names: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MetricSetRepr {
    Preset(String),
    List(Vec<String>),
}

impl TryFrom<MetricSetRepr> for MetricSet {
    type Error = String;

    fn try_from(repr: MetricSetRepr) -> Result<Self, Self::Error> {
        match repr {
            MetricSetRepr::List(names) => Ok(MetricSet { names }),
            MetricSetRepr::Preset(name) => MetricSet::preset(&name).ok_or_else(|| {
                format!(
                    "unknown metric preset `{name}`, expected one of: {}",
                    PRESET_NAMES.join(", ")
                )
            }),
        }
    }
}

impl From<MetricSet> for Vec<String> {
    fn from(set: MetricSet) -> Self {
        set.names
    }
}

const PRESET_NAMES: [&str; 4] = ["scoring", "similarity", "goalie_similarity", "extended"];

impl MetricSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MetricSet {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn scoring() -> Self {
        MetricSet::new(SCORING_METRICS.iter().copied())
    }

    pub fn similarity() -> Self {
        MetricSet::new(SIMILARITY_METRICS.iter().copied())
    }

    pub fn goalie_similarity() -> Self {
        MetricSet::new(GOALIE_SIMILARITY_METRICS.iter().copied())
    }

    pub fn extended() -> Self {
        MetricSet::new(EXTENDED_METRICS.iter().copied())
    }

    /// Look up a preset by its config name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "scoring" => Some(MetricSet::scoring()),
            "similarity" => Some(MetricSet::similarity()),
            "goalie_similarity" => Some(MetricSet::goalie_similarity()),
            "extended" => Some(MetricSet::extended()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, metric: &str) -> bool {
        self.names.iter().any(|n| n == metric)
    }

    /// First name that appears more than once, if any.
    pub fn first_duplicate(&self) -> Option<&str> {
        self.names
            .iter()
            .enumerate()
            .find(|(i, n)| self.names[..*i].contains(n))
            .map(|(_, n)| n.as_str())
    }
}

// ---------------------------------------------------------------------------
// MetricWeights
// ---------------------------------------------------------------------------

/// Per-metric multipliers. Metrics without an entry weigh 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricWeights {
    weights: HashMap<String, f64>,
}

impl MetricWeights {
    pub fn new(weights: HashMap<String, f64>) -> Self {
        MetricWeights { weights }
    }

    pub fn defaults() -> Self {
        MetricWeights {
            weights: DEFAULT_WEIGHTS
                .iter()
                .map(|(m, w)| (m.to_string(), *w))
                .collect(),
        }
    }

    pub fn weight(&self, metric: &str) -> f64 {
        self.weights.get(metric).copied().unwrap_or(1.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(m, w)| (m.as_str(), *w))
    }
}
