//! Enablement tracker (§4.3): one [`TransitionState`] per transition,
//! refreshed at the start of every step.

pub mod state;

pub use state::TransitionState;

use crate::adapter::ModelAdapter;
use crate::behavior::{self, stochastic};
use crate::model::{Net, TransIdx, TransitionKind};
use rand::Rng;

/// Owns the per-transition [`TransitionState`] vector and refreshes it
/// each step.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    states: Vec<TransitionState>,
}

impl Scheduler {
    /// A scheduler sized for `transition_count` transitions, all disabled.
    pub fn new(transition_count: usize) -> Self {
        Self {
            states: vec![TransitionState::new(); transition_count],
        }
    }

    /// Grow the state vector to cover a newly created transition.
    pub fn push_transition(&mut self) {
        self.states.push(TransitionState::new());
    }

    /// Drop the state at `idx`, shifting nothing — callers never reuse a
    /// freed `TransIdx` slot, so a hole is left as a fresh default state.
    pub fn clear_transition(&mut self, idx: TransIdx) {
        if let Some(state) = self.states.get_mut(idx.0) {
            *state = TransitionState::new();
        }
    }

    /// Read-only access to a transition's scheduling state.
    pub fn state(&self, idx: TransIdx) -> &TransitionState {
        &self.states[idx.0]
    }

    /// Mutable access, used by the executor after a successful stochastic
    /// firing to resample.
    pub fn state_mut(&mut self, idx: TransIdx) -> &mut TransitionState {
        &mut self.states[idx.0]
    }

    /// Recompute structural enablement for every transition, sampling a
    /// fresh stochastic delay on any disabled→enabled transition.
    pub fn update(&mut self, net: &Net, adapter: &ModelAdapter, now: f64, rng: &mut impl Rng) {
        for (idx, transition) in net.transitions() {
            let enabled = behavior::structurally_enabled(net, adapter, idx);
            let state = &mut self.states[idx.0];
            if enabled {
                let newly_enabled = state.mark_enabled(now);
                if newly_enabled && transition.kind() == TransitionKind::Stochastic {
                    stochastic::schedule_on_enable(net, state, idx, now, rng);
                }
            } else {
                state.mark_disabled();
            }
        }
    }

    /// All transitions currently structurally enabled, split by discrete
    /// vs. continuous kind.
    pub fn enabled_discrete(&self, net: &Net) -> Vec<TransIdx> {
        net.discrete_transitions()
            .filter(|&idx| self.states[idx.0].is_enabled())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArcDirection, ArcKind, Place, Transition};

    fn sample_net() -> Net {
        let mut net = Net::new();
        net.add_place(Place::new("p1", "P1", 1)).unwrap();
        net.add_place(Place::new("p2", "P2", 0)).unwrap();
        net.add_transition(Transition::immediate("t1", "T1", 0))
            .unwrap();
        net.add_arc("a1", "p1", "t1", ArcDirection::Input, 1, ArcKind::Normal, None)
            .unwrap();
        net.add_arc("a2", "p2", "t1", ArcDirection::Output, 1, ArcKind::Normal, None)
            .unwrap();
        net
    }

    #[test]
    fn marks_enablement_time_once() {
        let net = sample_net();
        let adapter = ModelAdapter::new();
        let mut scheduler = Scheduler::new(net.transition_count());
        let mut rng = rand::thread_rng();
        scheduler.update(&net, &adapter, 1.0, &mut rng);
        let t = net.transition_idx("t1").unwrap();
        assert_eq!(scheduler.state(t).enablement_time, Some(1.0));
        scheduler.update(&net, &adapter, 2.0, &mut rng);
        assert_eq!(scheduler.state(t).enablement_time, Some(1.0));
    }

    #[test]
    fn disablement_clears_state() {
        let mut net = sample_net();
        let adapter = ModelAdapter::new();
        let mut scheduler = Scheduler::new(net.transition_count());
        let mut rng = rand::thread_rng();
        scheduler.update(&net, &adapter, 0.0, &mut rng);
        net.place_mut(net.place_idx("p1").unwrap()).tokens = 0;
        scheduler.update(&net, &adapter, 1.0, &mut rng);
        let t = net.transition_idx("t1").unwrap();
        assert_eq!(scheduler.state(t).enablement_time, None);
    }

    #[test]
    fn enabled_discrete_lists_only_enabled() {
        let net = sample_net();
        let adapter = ModelAdapter::new();
        let mut scheduler = Scheduler::new(net.transition_count());
        let mut rng = rand::thread_rng();
        scheduler.update(&net, &adapter, 0.0, &mut rng);
        assert_eq!(scheduler.enabled_discrete(&net).len(), 1);
    }
}
