//! Buzz window arbitration.

use std::collections::HashSet;

use indexmap::IndexSet;

use crate::state::game::ContestantId;

/// A buzz that reached arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuzzEvent {
    /// Who buzzed.
    pub contestant: ContestantId,
    /// Engine clock at arrival.
    pub received_at_ms: u64,
}

/// Why a buzz did not win.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuzzRejection {
    /// No window is open.
    WindowClosed,
    /// The contestant may not buzz on this window.
    NotEligible,
    /// The contestant already buzzed on this window.
    Duplicate,
    /// Someone else already won the window.
    AlreadyDecided,
}

/// Result of submitting a buzz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuzzOutcome {
    /// The buzz won the window.
    Winner,
    /// The buzz lost.
    Rejected(BuzzRejection),
}

#[derive(Debug, Clone)]
struct Window {
    eligible: IndexSet<ContestantId>,
    buzzed: HashSet<ContestantId>,
    winner: Option<ContestantId>,
}

/// Decides which contestant wins each buzz window of a question.
///
/// Buzzes from eligible contestants are logged in arrival order for the whole question,
/// including the ones that lost, so that a rewind can hand eligibility back to everyone
/// who buzzed after the rewinding contestant.
#[derive(Debug, Clone, Default)]
pub struct BuzzArbiter {
    window: Option<Window>,
    log: Vec<BuzzEvent>,
}

impl BuzzArbiter {
    /// Create an arbiter with no window and an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a window for `eligible`, replacing any previous one.
    pub fn open_window(&mut self, eligible: IndexSet<ContestantId>) {
        self.window = Some(Window {
            eligible,
            buzzed: HashSet::new(),
            winner: None,
        });
    }

    /// Whether a window is open and still undecided.
    pub fn is_open(&self) -> bool {
        self.window
            .as_ref()
            .is_some_and(|window| window.winner.is_none())
    }

    /// Winner of the current window.
    pub fn winner(&self) -> Option<ContestantId> {
        self.window.as_ref().and_then(|window| window.winner)
    }

    /// Submit a buzz. The first eligible buzz wins and decides the window for good.
    pub fn submit_buzz(&mut self, contestant: ContestantId, received_at_ms: u64) -> BuzzOutcome {
        let Some(window) = self.window.as_mut() else {
            return BuzzOutcome::Rejected(BuzzRejection::WindowClosed);
        };
        if !window.eligible.contains(&contestant) {
            return BuzzOutcome::Rejected(BuzzRejection::NotEligible);
        }
        if !window.buzzed.insert(contestant) {
            return BuzzOutcome::Rejected(BuzzRejection::Duplicate);
        }

        self.log.push(BuzzEvent {
            contestant,
            received_at_ms,
        });

        if window.winner.is_some() {
            return BuzzOutcome::Rejected(BuzzRejection::AlreadyDecided);
        }
        window.winner = Some(contestant);
        BuzzOutcome::Winner
    }

    /// Close the window, returning its winner if any.
    pub fn close_window(&mut self) -> Option<ContestantId> {
        self.window.take().and_then(|window| window.winner)
    }

    /// Override arbitration, making `contestant` the winner of the current window.
    ///
    /// Opens a decided window when none is open. Returns the winner it displaced.
    pub fn force_winner(&mut self, contestant: ContestantId) -> Option<ContestantId> {
        let window = self.window.get_or_insert_with(|| Window {
            eligible: IndexSet::new(),
            buzzed: HashSet::new(),
            winner: None,
        });
        window.eligible = IndexSet::from([contestant]);
        window.winner.replace(contestant)
    }

    /// Buzzes logged for this question, in arrival order.
    pub fn log(&self) -> &[BuzzEvent] {
        &self.log
    }

    /// Contestants whose buzz was logged after `contestant`'s latest one, in arrival order.
    ///
    /// The log is cut right after `contestant`'s buzz so the same buzzes cannot be
    /// replayed twice.
    pub fn replay_after(&mut self, contestant: ContestantId) -> Vec<ContestantId> {
        let Some(position) = self
            .log
            .iter()
            .rposition(|event| event.contestant == contestant)
        else {
            return Vec::new();
        };

        let mut replayed = IndexSet::new();
        for event in &self.log[position + 1..] {
            if event.contestant != contestant {
                replayed.insert(event.contestant);
            }
        }
        self.log.truncate(position + 1);
        replayed.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn ids(count: usize) -> Vec<ContestantId> {
        (0..count).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn first_eligible_buzz_wins() {
        let c = ids(3);
        let mut arbiter = BuzzArbiter::new();
        arbiter.open_window(c.iter().copied().collect());

        assert_eq!(arbiter.submit_buzz(c[1], 10), BuzzOutcome::Winner);
        assert_eq!(
            arbiter.submit_buzz(c[0], 11),
            BuzzOutcome::Rejected(BuzzRejection::AlreadyDecided)
        );
        assert_eq!(
            arbiter.submit_buzz(c[1], 12),
            BuzzOutcome::Rejected(BuzzRejection::Duplicate)
        );
        assert_eq!(arbiter.winner(), Some(c[1]));
        assert!(!arbiter.is_open());
        assert_eq!(arbiter.log().len(), 2);
    }

    #[test]
    fn ineligible_and_closed_buzzes_are_rejected() {
        let c = ids(2);
        let mut arbiter = BuzzArbiter::new();
        assert_eq!(
            arbiter.submit_buzz(c[0], 0),
            BuzzOutcome::Rejected(BuzzRejection::WindowClosed)
        );

        arbiter.open_window(IndexSet::from([c[0]]));
        assert_eq!(
            arbiter.submit_buzz(c[1], 1),
            BuzzOutcome::Rejected(BuzzRejection::NotEligible)
        );
        assert_eq!(arbiter.close_window(), None);
        assert!(arbiter.log().is_empty());
    }

    #[test]
    fn force_winner_overrides_arbitration() {
        let c = ids(2);
        let mut arbiter = BuzzArbiter::new();
        arbiter.open_window(c.iter().copied().collect());
        arbiter.submit_buzz(c[0], 5);

        assert_eq!(arbiter.force_winner(c[1]), Some(c[0]));
        assert_eq!(arbiter.close_window(), Some(c[1]));
    }

    #[test]
    fn replay_returns_later_buzzers_in_order() {
        let c = ids(4);
        let mut arbiter = BuzzArbiter::new();
        arbiter.open_window(c.iter().copied().collect());
        arbiter.submit_buzz(c[3], 0);
        arbiter.submit_buzz(c[0], 1);
        arbiter.submit_buzz(c[1], 2);
        arbiter.submit_buzz(c[2], 3);

        assert_eq!(arbiter.replay_after(c[0]), vec![c[1], c[2]]);
        assert!(arbiter.replay_after(c[0]).is_empty());
        assert_eq!(arbiter.log().len(), 2);
    }
}
