//! Per-contestant power-up state.

use std::collections::HashMap;

use crate::{
    engine::EngineError,
    state::game::{Contestant, ContestantId, PowerUpKind},
};

/// Lifecycle of one power-up during a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerUpState {
    /// Not usable right now.
    #[default]
    Idle,
    /// Usable right now.
    Enabled,
    /// Consumed.
    Used,
    /// Consumed, then handed back by an undo.
    Reverted,
}

/// Tracks which power-ups are enabled and owns the `used` flags of contestants.
#[derive(Debug, Clone)]
pub struct PowerUpController {
    buzzing_allowed: bool,
    states: HashMap<(ContestantId, PowerUpKind), PowerUpState>,
}

impl PowerUpController {
    /// Create a controller for a question. Nothing can be enabled when `buzzing_allowed`
    /// is false (daily doubles and the finale).
    pub fn new<'a>(
        buzzing_allowed: bool,
        contestants: impl IntoIterator<Item = (&'a ContestantId, &'a Contestant)>,
    ) -> Self {
        let states = contestants
            .into_iter()
            .flat_map(|(id, contestant)| {
                contestant
                    .power_ups
                    .iter()
                    .filter(|(_, slot)| slot.used)
                    .map(|(kind, _)| ((*id, *kind), PowerUpState::Used))
            })
            .collect();

        Self {
            buzzing_allowed,
            states,
        }
    }

    /// Current state of `kind` for `contestant`.
    pub fn state(&self, contestant: ContestantId, kind: PowerUpKind) -> PowerUpState {
        self.states
            .get(&(contestant, kind))
            .copied()
            .unwrap_or_default()
    }

    /// Whether `kind` is currently enabled for `contestant`.
    pub fn is_enabled(&self, contestant: ContestantId, kind: PowerUpKind) -> bool {
        self.state(contestant, kind) == PowerUpState::Enabled
    }

    /// Enable `kind`. Returns `Ok(false)` when it was already enabled.
    pub fn enable(
        &mut self,
        id: ContestantId,
        contestant: &mut Contestant,
        kind: PowerUpKind,
    ) -> Result<bool, EngineError> {
        let unavailable = EngineError::PowerUpUnavailable {
            contestant: id,
            power_up: kind,
        };
        if !self.buzzing_allowed {
            return Err(unavailable);
        }
        let Some(slot) = contestant.power_ups.get_mut(&kind) else {
            return Err(unavailable);
        };
        if slot.used {
            return Err(unavailable);
        }

        let state = self.states.entry((id, kind)).or_default();
        if *state == PowerUpState::Enabled {
            return Ok(false);
        }
        *state = PowerUpState::Enabled;
        slot.available = true;
        Ok(true)
    }

    /// Disable `kind` if it is enabled. Returns whether anything changed.
    pub fn disable(
        &mut self,
        id: ContestantId,
        contestant: &mut Contestant,
        kind: PowerUpKind,
    ) -> bool {
        let Some(state) = self.states.get_mut(&(id, kind)) else {
            return false;
        };
        if *state != PowerUpState::Enabled {
            return false;
        }
        *state = PowerUpState::Idle;
        if let Some(slot) = contestant.power_ups.get_mut(&kind) {
            slot.available = false;
        }
        true
    }

    /// Consume an enabled power-up.
    pub fn use_power_up(
        &mut self,
        id: ContestantId,
        contestant: &mut Contestant,
        kind: PowerUpKind,
    ) -> Result<(), EngineError> {
        match self.state(id, kind) {
            PowerUpState::Enabled => {}
            PowerUpState::Used => {
                return Err(EngineError::StaleEvent(format!(
                    "power-up {kind:?} already used by {id}"
                )));
            }
            PowerUpState::Idle | PowerUpState::Reverted => {
                return Err(EngineError::PowerUpUnavailable {
                    contestant: id,
                    power_up: kind,
                });
            }
        }

        self.states.insert((id, kind), PowerUpState::Used);
        if let Some(slot) = contestant.power_ups.get_mut(&kind) {
            slot.used = true;
            slot.available = false;
        }
        Ok(())
    }

    /// Hand a consumed power-up back. Returns whether anything changed.
    pub fn revert(&mut self, id: ContestantId, contestant: &mut Contestant, kind: PowerUpKind) -> bool {
        let Some(state) = self.states.get_mut(&(id, kind)) else {
            return false;
        };
        if *state != PowerUpState::Used {
            return false;
        }
        *state = PowerUpState::Reverted;
        if let Some(slot) = contestant.power_ups.get_mut(&kind) {
            slot.used = false;
        }
        true
    }

    /// Every enabled power-up, grouped by contestant.
    pub fn enabled(&self) -> Vec<(ContestantId, PowerUpKind)> {
        let mut enabled: Vec<_> = self
            .states
            .iter()
            .filter(|(_, state)| **state == PowerUpState::Enabled)
            .map(|(key, _)| *key)
            .collect();
        enabled.sort_by_key(|(id, kind)| (*id, PowerUpKind::ALL.iter().position(|k| k == kind)));
        enabled
    }
}
