// Team-builder session state.
//
// A session is a value: every user action produces a new `SessionState` or
// an error, leaving the previous state untouched.

use serde::Serialize;
use thiserror::Error;

use super::drafter::DraftOutcome;
use super::roster::{Roster, RosterError, RosterQuota, DEFAULT_SALARY_CAP};
use crate::players::record::Player;

/// Two-step selection: pick a candidate, then confirm or cancel.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub enum PendingSelection {
    #[default]
    Idle,
    Pending(Player),
    Committed(String),
    Cancelled(String),
}

impl PendingSelection {
    pub fn candidate(&self) -> Option<&Player> {
        match self {
            PendingSelection::Pending(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, PendingSelection::Pending(_))
    }
}

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    Select(Player),
    Confirm,
    Cancel,
    Remove(String),
    SetRecommendations(Vec<String>),
    SetAiTeam(DraftOutcome),
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{0}")]
    Roster(#[from] RosterError),

    #[error("{name} is awaiting confirmation; confirm or cancel first")]
    SelectionPending { name: String },

    #[error("no selection is awaiting confirmation")]
    NothingPending,
}

/// Everything one user session tracks between actions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    user_roster: Roster,
    pending: PendingSelection,
    ai_roster: Vec<Player>,
    ai_remaining_cap: u64,
    first_selected: Option<Player>,
    recommendations: Vec<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::new(RosterQuota::primary(), DEFAULT_SALARY_CAP)
    }
}

impl SessionState {
    pub fn new(quota: RosterQuota, salary_cap: u64) -> Self {
        SessionState {
            user_roster: Roster::new(quota, salary_cap),
            pending: PendingSelection::Idle,
            ai_roster: Vec::new(),
            ai_remaining_cap: salary_cap,
            first_selected: None,
            recommendations: Vec::new(),
        }
    }

    pub fn user_roster(&self) -> &Roster {
        &self.user_roster
    }

    pub fn pending(&self) -> &PendingSelection {
        &self.pending
    }

    pub fn ai_roster(&self) -> &[Player] {
        &self.ai_roster
    }

    pub fn ai_remaining_cap(&self) -> u64 {
        self.ai_remaining_cap
    }

    /// The first player the user committed; seeds the AI draft.
    pub fn first_selected(&self) -> Option<&Player> {
        self.first_selected.as_ref()
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    /// Apply one action, returning the next state.
    pub fn apply(&self, action: SessionAction) -> Result<SessionState, SessionError> {
        let mut next = self.clone();
        match action {
            SessionAction::Select(player) => {
                if let PendingSelection::Pending(current) = &self.pending {
                    return Err(SessionError::SelectionPending {
                        name: current.name.clone(),
                    });
                }
                self.user_roster.can_add(&player)?;
                next.pending = PendingSelection::Pending(player);
            }
            SessionAction::Confirm => {
                let PendingSelection::Pending(player) = &self.pending else {
                    return Err(SessionError::NothingPending);
                };
                next.user_roster.add(player.clone())?;
                if next.first_selected.is_none() {
                    next.first_selected = Some(player.clone());
                }
                next.pending = PendingSelection::Committed(player.name.clone());
            }
            SessionAction::Cancel => {
                let PendingSelection::Pending(player) = &self.pending else {
                    return Err(SessionError::NothingPending);
                };
                next.pending = PendingSelection::Cancelled(player.name.clone());
            }
            SessionAction::Remove(name) => {
                next.user_roster.remove(&name)?;
            }
            SessionAction::SetRecommendations(names) => {
                next.recommendations = names;
            }
            SessionAction::SetAiTeam(outcome) => {
                next.ai_remaining_cap = outcome.remaining_cap;
                next.ai_roster = outcome.roster;
            }
            SessionAction::Reset => {
                next = SessionState::new(self.user_roster.quota(), self.user_roster.salary_cap());
            }
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::metrics::MetricSet;
    use crate::draft::drafter::AiDrafter;
    use crate::players::position::Position;
    use crate::players::record::PlayerTable;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn player(name: &str, position: Position, salary: u64) -> Player {
        Player::new(name, "TST", position, salary).with_stat("goals", 10.0)
    }

    fn select_and_confirm(state: &SessionState, p: Player) -> SessionState {
        state
            .apply(SessionAction::Select(p))
            .unwrap()
            .apply(SessionAction::Confirm)
            .unwrap()
    }

    #[test]
    fn select_then_confirm_commits() {
        let s0 = SessionState::default();
        let s1 = s0
            .apply(SessionAction::Select(player("A", Position::Forward, 5_000_000)))
            .unwrap();
        assert!(s1.pending().is_pending());
        assert!(s1.user_roster().is_empty());

        let s2 = s1.apply(SessionAction::Confirm).unwrap();
        assert_eq!(s2.pending(), &PendingSelection::Committed("A".into()));
        assert_eq!(s2.user_roster().remaining_cap(), 25_000_000);
        assert_eq!(s2.first_selected().map(|p| p.name.as_str()), Some("A"));

        // Earlier states are untouched.
        assert!(s0.user_roster().is_empty());
        assert_eq!(s1.user_roster().len(), 0);
    }

    #[test]
    fn cancel_discards_candidate() {
        let s = SessionState::default()
            .apply(SessionAction::Select(player("A", Position::Forward, 1)))
            .unwrap()
            .apply(SessionAction::Cancel)
            .unwrap();
        assert_eq!(s.pending(), &PendingSelection::Cancelled("A".into()));
        assert!(s.user_roster().is_empty());
        assert!(s.first_selected().is_none());
        // Back to selectable.
        assert!(s
            .apply(SessionAction::Select(player("B", Position::Forward, 1)))
            .is_ok());
    }

    #[test]
    fn confirm_or_cancel_without_pending_fails() {
        let s = SessionState::default();
        assert_eq!(
            s.apply(SessionAction::Confirm).unwrap_err(),
            SessionError::NothingPending
        );
        assert_eq!(
            s.apply(SessionAction::Cancel).unwrap_err(),
            SessionError::NothingPending
        );
    }

    #[test]
    fn second_select_while_pending_fails() {
        let s = SessionState::default()
            .apply(SessionAction::Select(player("A", Position::Forward, 1)))
            .unwrap();
        assert_eq!(
            s.apply(SessionAction::Select(player("B", Position::Forward, 1)))
                .unwrap_err(),
            SessionError::SelectionPending { name: "A".into() }
        );
    }

    #[test]
    fn select_validates_like_the_roster() {
        let s = select_and_confirm(
            &SessionState::default(),
            player("A", Position::Forward, 28_000_000),
        );
        assert!(matches!(
            s.apply(SessionAction::Select(player("A", Position::Forward, 1))),
            Err(SessionError::Roster(RosterError::Duplicate { .. }))
        ));
        assert!(matches!(
            s.apply(SessionAction::Select(player("B", Position::Defense, 3_000_000))),
            Err(SessionError::Roster(RosterError::CapExceeded { .. }))
        ));
        let s = select_and_confirm(&s, player("D1", Position::Defense, 1));
        let s = select_and_confirm(&s, player("D2", Position::Defense, 1));
        assert!(matches!(
            s.apply(SessionAction::Select(player("D3", Position::Defense, 1))),
            Err(SessionError::Roster(RosterError::PositionFull { .. }))
        ));
    }

    #[test]
    fn remove_keeps_first_selected() {
        let s = select_and_confirm(&SessionState::default(), player("A", Position::Forward, 4));
        let s = select_and_confirm(&s, player("B", Position::Forward, 4));
        let s = s.apply(SessionAction::Remove("A".into())).unwrap();
        assert_eq!(s.user_roster().len(), 1);
        assert_eq!(s.user_roster().remaining_cap(), DEFAULT_SALARY_CAP - 4);
        assert_eq!(s.first_selected().map(|p| p.name.as_str()), Some("A"));
        assert!(matches!(
            s.apply(SessionAction::Remove("A".into())),
            Err(SessionError::Roster(RosterError::NotOnRoster { .. }))
        ));
    }

    #[test]
    fn ai_team_and_recommendations_are_stored() {
        let s = select_and_confirm(
            &SessionState::default(),
            player("Seed", Position::Forward, 1_000_000),
        );
        let pool = PlayerTable::from_players(vec![
            player("F1", Position::Forward, 1_000_000),
            player("F2", Position::Forward, 1_000_000),
            player("D1", Position::Defense, 1_000_000),
            player("D2", Position::Defense, 1_000_000),
        ]);
        let seed = s.first_selected().cloned().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let outcome = AiDrafter::new(MetricSet::new(["goals"]))
            .draft(&seed, &pool, &mut rng)
            .unwrap();

        let s = s
            .apply(SessionAction::SetAiTeam(outcome))
            .unwrap()
            .apply(SessionAction::SetRecommendations(vec!["F1".into(), "F2".into()]))
            .unwrap();
        assert_eq!(s.ai_roster().len(), 5);
        assert_eq!(s.ai_remaining_cap(), 25_000_000);
        assert_eq!(s.recommendations(), ["F1".to_string(), "F2".to_string()]);

        let reset = s.apply(SessionAction::Reset).unwrap();
        assert_eq!(reset, SessionState::default());
    }
}
