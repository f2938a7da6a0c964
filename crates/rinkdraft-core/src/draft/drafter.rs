// Greedy AI team assembly around a seed player.
//
// The drafter walks a shuffled queue of positions. For each open slot it
// picks the affordable candidate closest to the seed in raw metric space,
// holding back a cap reserve until enough players are on the roster.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::roster::{Roster, RosterQuota, DEFAULT_SALARY_CAP};
use crate::analysis::metrics::MetricSet;
use crate::analysis::recommend::euclidean_distance;
use crate::error::EngineError;
use crate::players::position::Position;
use crate::players::record::{Player, PlayerTable};

/// Cap held back while the roster is short.
pub const DEFAULT_RESERVE: u64 = 1_000_000;

/// The reserve applies while the roster has fewer players than this.
pub const DEFAULT_RESERVE_UNTIL_PICKS: usize = 4;

// ---------------------------------------------------------------------------
// Phases and outcome
// ---------------------------------------------------------------------------

/// Where a draft is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftPhase {
    SeedSelected,
    PickingPosition { remaining: VecDeque<Position> },
    Complete,
    Failed,
}

/// Terminal status of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Complete,
    Failed,
}

/// A position slot that could not be filled within budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub position: Position,
    pub remaining_cap: u64,
    pub reserve: u64,
}

impl Shortfall {
    pub fn as_error(&self) -> EngineError {
        EngineError::CapExceeded {
            position: self.position,
            remaining_cap: self.remaining_cap,
            reserve: self.reserve,
        }
    }
}

/// Result of one draft.
///
/// A failed draft never carries a partial roster: `roster` is empty and
/// `remaining_cap` is the untouched salary cap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftOutcome {
    pub status: DraftStatus,
    pub roster: Vec<Player>,
    pub remaining_cap: u64,
    /// Order in which positions were filled.
    pub fill_order: Vec<Position>,
    pub shortfalls: Vec<Shortfall>,
    #[serde(skip)]
    failure: Option<EngineError>,
}

impl DraftOutcome {
    pub fn is_complete(&self) -> bool {
        self.status == DraftStatus::Complete
    }

    /// Why the draft failed, if it did.
    pub fn failure(&self) -> Option<&EngineError> {
        self.failure.as_ref()
    }

    /// The roster on success, `CompositionUnsatisfied` otherwise.
    pub fn into_result(self) -> Result<Vec<Player>, EngineError> {
        match self.failure {
            None => Ok(self.roster),
            Some(err) => Err(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Drafter
// ---------------------------------------------------------------------------

/// Drafting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiDrafter {
    /// Metrics compared between the seed and each candidate.
    pub metrics: MetricSet,
    pub quota: RosterQuota,
    pub salary_cap: u64,
    pub reserve: u64,
    pub reserve_until_picks: usize,
}

impl Default for AiDrafter {
    fn default() -> Self {
        AiDrafter {
            metrics: MetricSet::similarity(),
            quota: RosterQuota::primary(),
            salary_cap: DEFAULT_SALARY_CAP,
            reserve: DEFAULT_RESERVE,
            reserve_until_picks: DEFAULT_RESERVE_UNTIL_PICKS,
        }
    }
}

impl AiDrafter {
    pub fn new(metrics: MetricSet) -> Self {
        AiDrafter {
            metrics,
            ..AiDrafter::default()
        }
    }

    /// Build a team around `seed` from `pool`.
    ///
    /// The seed counts as the first pick and is never drafted again even if
    /// `pool` contains them. Position fill order comes from `rng`.
    ///
    /// Errors are reserved for bad input (a seed or candidate missing a
    /// metric); an unfillable roster is a `Failed` outcome.
    pub fn draft<R: Rng + ?Sized>(
        &self,
        seed: &Player,
        pool: &PlayerTable,
        rng: &mut R,
    ) -> Result<DraftOutcome, EngineError> {
        let anchor = seed.stat_vector(&self.metrics)?;
        let mut candidates: Vec<&Player> = pool.iter().filter(|p| p.name != seed.name).collect();
        let mut roster = Roster::new(self.quota, self.salary_cap);
        let mut fill_order = Vec::new();
        let mut shortfalls = Vec::new();

        let mut phase = DraftPhase::SeedSelected;
        let terminal = loop {
            match phase {
                DraftPhase::SeedSelected => {
                    if let Err(e) = roster.add(seed.clone()) {
                        warn!("AI seed {} rejected: {}", seed.name, e);
                        phase = DraftPhase::Failed;
                        continue;
                    }
                    info!(
                        "AI selected initial player: {} ({}) - ${}",
                        seed.name,
                        seed.position.display_str(),
                        seed.salary
                    );
                    let mut positions = self.quota.positions();
                    positions.shuffle(rng);
                    phase = DraftPhase::PickingPosition {
                        remaining: positions.into(),
                    };
                }
                DraftPhase::PickingPosition { mut remaining } => {
                    let Some(position) = remaining.pop_front() else {
                        phase = if roster.is_complete() {
                            DraftPhase::Complete
                        } else {
                            DraftPhase::Failed
                        };
                        continue;
                    };
                    fill_order.push(position);
                    if let Some(shortfall) =
                        self.fill_position(position, &anchor, &mut candidates, &mut roster)?
                    {
                        warn!(
                            "No suitable {} candidate under ${} with ${} reserved",
                            position.long_name(),
                            shortfall.remaining_cap,
                            shortfall.reserve
                        );
                        shortfalls.push(shortfall);
                    }
                    phase = DraftPhase::PickingPosition { remaining };
                }
                done => break done,
            }
        };

        if terminal == DraftPhase::Complete {
            return Ok(DraftOutcome {
                status: DraftStatus::Complete,
                remaining_cap: roster.remaining_cap(),
                roster: roster.into_players(),
                fill_order,
                shortfalls,
                failure: None,
            });
        }

        let failure = self
            .quota
            .check(roster.players())
            .err()
            .unwrap_or_else(|| self.unsatisfied(roster.players()));
        warn!("AI draft failed: {}", failure);
        Ok(DraftOutcome {
            status: DraftStatus::Failed,
            roster: Vec::new(),
            remaining_cap: self.salary_cap,
            fill_order,
            shortfalls,
            failure: Some(failure),
        })
    }

    /// Fill every open slot at `position`, stopping at the first slot no
    /// candidate can afford.
    fn fill_position(
        &self,
        position: Position,
        anchor: &[f64],
        candidates: &mut Vec<&Player>,
        roster: &mut Roster,
    ) -> Result<Option<Shortfall>, EngineError> {
        while roster.has_open_slot(position) {
            let reserve = if roster.len() < self.reserve_until_picks {
                self.reserve
            } else {
                0
            };
            let remaining_cap = roster.remaining_cap();
            let budget = remaining_cap.saturating_sub(reserve);

            let Some(idx) = self.closest_affordable(position, anchor, candidates, budget)? else {
                return Ok(Some(Shortfall {
                    position,
                    remaining_cap,
                    reserve,
                }));
            };
            let pick = candidates.remove(idx);
            if let Err(e) = roster.add(pick.clone()) {
                warn!("AI pick {} rejected: {}", pick.name, e);
                return Ok(Some(Shortfall {
                    position,
                    remaining_cap,
                    reserve,
                }));
            }
            info!(
                "AI added {} ({}) - ${}",
                pick.name,
                position.display_str(),
                pick.salary
            );
        }
        Ok(None)
    }

    /// Index of the nearest candidate at `position` with salary within
    /// `budget`. Equal distances go to the earlier candidate.
    fn closest_affordable(
        &self,
        position: Position,
        anchor: &[f64],
        candidates: &[&Player],
        budget: u64,
    ) -> Result<Option<usize>, EngineError> {
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in candidates.iter().enumerate() {
            if c.position != position || c.salary > budget {
                continue;
            }
            let distance = euclidean_distance(anchor, &c.stat_vector(&self.metrics)?);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((i, distance));
            }
        }
        if let Some((i, d)) = best {
            debug!("Closest {} is {} at {:.3}", position.long_name(), candidates[i].name, d);
        }
        Ok(best.map(|(i, _)| i))
    }

    fn unsatisfied(&self, players: &[Player]) -> EngineError {
        let (forwards, defense, goalies) = super::roster::position_counts(players);
        EngineError::CompositionUnsatisfied {
            forwards,
            defense,
            goalies,
            required_forwards: self.quota.forwards,
            required_defense: self.quota.defense,
            required_goalies: self.quota.goalies,
        }
    }
}

/// Draft with default parameters over `metrics`.
pub fn generate_ai_team<R: Rng + ?Sized>(
    seed: &Player,
    pool: &PlayerTable,
    metrics: &MetricSet,
    rng: &mut R,
) -> Result<DraftOutcome, EngineError> {
    AiDrafter::new(metrics.clone()).draft(seed, pool, rng)
}
