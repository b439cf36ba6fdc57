//! Per-session trigger activation state.
//!
//! "Fired once" bookkeeping is owned by the play session that runs the
//! project, not by the project itself and not by any process-wide state, so
//! concurrent play sessions never interfere. The runtime collaborator is
//! handed one of these per session.

use std::collections::BTreeSet;

use crate::model::{TriggerActivation, TriggerRegion};

#[derive(Debug, Default, Clone)]
pub struct TriggerRuntimeState {
    fired: BTreeSet<(String, String)>,
}

impl TriggerRuntimeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `trigger` on `map_id` should fire now. One-shot triggers are
    /// recorded on their first firing and suppressed afterwards.
    pub fn should_fire(&mut self, map_id: &str, trigger: &TriggerRegion) -> bool {
        match trigger.activation {
            TriggerActivation::Always => true,
            TriggerActivation::Once => self
                .fired
                .insert((map_id.to_string(), trigger.id.clone())),
        }
    }

    /// Forget all one-shot activations (session restart).
    pub fn reset(&mut self) {
        self.fired.clear();
    }

    pub fn fired_count(&self) -> usize {
        self.fired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;

    fn trigger(id: &str, activation: TriggerActivation) -> TriggerRegion {
        TriggerRegion {
            id: id.to_string(),
            bounds: Rect {
                x: 0,
                y: 0,
                width: 2,
                height: 2,
            },
            on_enter: vec!["event:enter".to_string()],
            on_exit: vec![],
            activation,
        }
    }

    #[test]
    fn once_triggers_fire_a_single_time() {
        let mut state = TriggerRuntimeState::new();
        let t = trigger("door", TriggerActivation::Once);

        assert!(state.should_fire("start", &t));
        assert!(!state.should_fire("start", &t));

        // Same trigger id on another map is independent state.
        assert!(state.should_fire("cave", &t));
    }

    #[test]
    fn always_triggers_keep_firing() {
        let mut state = TriggerRuntimeState::new();
        let t = trigger("pressure-plate", TriggerActivation::Always);

        assert!(state.should_fire("start", &t));
        assert!(state.should_fire("start", &t));
        assert_eq!(state.fired_count(), 0);
    }

    #[test]
    fn reset_re_arms_once_triggers() {
        let mut state = TriggerRuntimeState::new();
        let t = trigger("door", TriggerActivation::Once);

        assert!(state.should_fire("start", &t));
        state.reset();
        assert!(state.should_fire("start", &t));
    }
}
