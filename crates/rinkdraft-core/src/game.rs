// Match resolution between the user's roster and the AI roster.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::analysis::loadings::{load_loadings, Loadings, LoadingsError};
use crate::analysis::metrics::MetricSet;
use crate::analysis::scoring::{score_team, TeamScore};
use crate::error::EngineError;
use crate::players::csv_io::{load_players, PlayerDataError};
use crate::players::record::Player;

/// Raw team scores are divided by this before rounding.
pub const DEFAULT_SCALING_FACTOR: f64 = 1000.0;

// ---------------------------------------------------------------------------
// Score resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    User,
    Ai,
}

impl Side {
    pub fn label(&self) -> &'static str {
        match self {
            Side::User => "User",
            Side::Ai => "AI",
        }
    }
}

/// Who gets the extra point when the raw scores are exactly equal too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiePolicy {
    #[default]
    FavorAi,
    FavorUser,
}

impl TiePolicy {
    fn side(&self) -> Side {
        match self {
            TiePolicy::FavorAi => Side::Ai,
            TiePolicy::FavorUser => Side::User,
        }
    }
}

/// Final integer scores of a match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub user: i64,
    pub ai: i64,
    pub user_normalized: f64,
    pub ai_normalized: f64,
    /// The side that received the tie-break point, if the rounded scores
    /// were level.
    pub tie_broken_for: Option<Side>,
}

impl MatchScore {
    pub fn winner(&self) -> Side {
        if self.user > self.ai {
            Side::User
        } else {
            Side::Ai
        }
    }
}

/// Normalize, round half to even, then break a level score.
///
/// A level rounded score goes to the side with the higher raw score. Exactly
/// equal raw scores go to the side `policy` names.
pub fn resolve_scores(
    user_raw: f64,
    ai_raw: f64,
    scaling_factor: f64,
    policy: TiePolicy,
) -> Result<MatchScore, EngineError> {
    if !scaling_factor.is_finite() || scaling_factor <= 0.0 {
        return Err(EngineError::InvalidScalingFactor(scaling_factor));
    }
    let user_normalized = user_raw / scaling_factor;
    let ai_normalized = ai_raw / scaling_factor;
    let mut user = user_normalized.round_ties_even() as i64;
    let mut ai = ai_normalized.round_ties_even() as i64;

    let mut tie_broken_for = None;
    if user == ai {
        let side = if user_raw > ai_raw {
            Side::User
        } else if ai_raw > user_raw {
            Side::Ai
        } else {
            policy.side()
        };
        match side {
            Side::User => user += 1,
            Side::Ai => ai += 1,
        }
        tie_broken_for = Some(side);
    }

    Ok(MatchScore {
        user,
        ai,
        user_normalized,
        ai_normalized,
        tie_broken_for,
    })
}

// ---------------------------------------------------------------------------
// Results table
// ---------------------------------------------------------------------------

/// One player's line in the post-game breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsRow {
    pub side: Side,
    pub name: String,
    pub score: f64,
    /// One value per table metric; 0.0 where the player lacks the metric.
    pub contributions: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsTable {
    pub metrics: MetricSet,
    pub rows: Vec<ResultsRow>,
}

/// User rows first, then AI rows, each side in roster order.
pub fn results_table(user: &TeamScore, ai: &TeamScore, metrics: &MetricSet) -> ResultsTable {
    let side_rows = |team: &TeamScore, side: Side| -> Vec<ResultsRow> {
        team.players
            .iter()
            .map(|p| ResultsRow {
                side,
                name: p.name.clone(),
                score: p.score,
                contributions: metrics
                    .iter()
                    .map(|m| p.contribution(m).unwrap_or(0.0))
                    .collect(),
            })
            .collect()
    };
    let mut rows = side_rows(user, Side::User);
    rows.extend(side_rows(ai, Side::Ai));
    ResultsTable {
        metrics: metrics.clone(),
        rows,
    }
}

/// Write the table as CSV: `name,team,score` then one column per metric.
pub fn write_results_table<W: Write>(wtr: W, table: &ResultsTable) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(wtr);
    let mut header = vec!["name".to_string(), "team".to_string(), "score".to_string()];
    header.extend(table.metrics.iter().map(str::to_string));
    wtr.write_record(&header)?;
    for row in &table.rows {
        let mut record = vec![
            row.name.clone(),
            row.side.label().to_string(),
            row.score.to_string(),
        ];
        record.extend(row.contributions.iter().map(|c| c.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Everything a finished match reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score: MatchScore,
    pub user: TeamScore,
    pub ai: TeamScore,
    pub table: ResultsTable,
}

impl MatchResult {
    pub fn winner(&self) -> Side {
        self.score.winner()
    }
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Players(#[from] PlayerDataError),

    #[error(transparent)]
    Loadings(#[from] LoadingsError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Score both rosters with `loadings` and resolve the match.
///
/// `metrics` selects the columns of the breakdown table; team scores use
/// every loading metric.
pub fn simulate_game(
    user: &[Player],
    ai: &[Player],
    loadings: &Loadings,
    metrics: &MetricSet,
    scaling_factor: f64,
    policy: TiePolicy,
) -> Result<MatchResult, EngineError> {
    let user_score = score_team(user, loadings, metrics);
    let ai_score = score_team(ai, loadings, metrics);
    let score = resolve_scores(user_score.total, ai_score.total, scaling_factor, policy)?;
    info!(
        "Match resolved: User {} - AI {} (raw {:.3} vs {:.3})",
        score.user, score.ai, user_score.total, ai_score.total
    );
    let table = results_table(&user_score, &ai_score, metrics);
    Ok(MatchResult {
        score,
        user: user_score,
        ai: ai_score,
        table,
    })
}

/// Reload two roster snapshots and a loadings file, then simulate.
pub fn simulate_game_from_files(
    user_csv: &Path,
    ai_csv: &Path,
    loadings_csv: &Path,
    metrics: &MetricSet,
    scaling_factor: f64,
    policy: TiePolicy,
) -> Result<MatchResult, SimulationError> {
    let loadings = load_loadings(loadings_csv)?;
    let user = load_players(user_csv)?;
    let ai = load_players(ai_csv)?;
    Ok(simulate_game(
        user.players(),
        ai.players(),
        &loadings,
        metrics,
        scaling_factor,
        policy,
    )?)
}
