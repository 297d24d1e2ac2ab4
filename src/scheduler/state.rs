//! Per-transition mutable scheduling state, owned by the [`super::Scheduler`].

/// Enablement/scheduling bookkeeping for one transition.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransitionState {
    /// Time at which the transition became structurally enabled, or `None`
    /// while disabled.
    pub enablement_time: Option<f64>,
    /// For stochastic transitions, the sampled absolute time of next
    /// firing. For timed transitions this is unused — the window is
    /// derived from `enablement_time` plus the transition's `α`/`β`.
    pub scheduled_time: Option<f64>,
}

impl TransitionState {
    /// A fresh, disabled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this transition is currently structurally enabled.
    pub fn is_enabled(&self) -> bool {
        self.enablement_time.is_some()
    }

    /// Record a fresh enablement at `now`, if not already enabled.
    pub fn mark_enabled(&mut self, now: f64) -> bool {
        if self.enablement_time.is_none() {
            self.enablement_time = Some(now);
            true
        } else {
            false
        }
    }

    /// Clear enablement and any sampled schedule. Guarantees a stochastic
    /// transition's `scheduled_time` never survives a disablement.
    pub fn mark_disabled(&mut self) {
        self.enablement_time = None;
        self.scheduled_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_enabled_is_idempotent() {
        let mut state = TransitionState::new();
        assert!(state.mark_enabled(1.0));
        assert!(!state.mark_enabled(2.0));
        assert_eq!(state.enablement_time, Some(1.0));
    }

    #[test]
    fn mark_disabled_clears_schedule() {
        let mut state = TransitionState::new();
        state.mark_enabled(1.0);
        state.scheduled_time = Some(5.0);
        state.mark_disabled();
        assert_eq!(state.enablement_time, None);
        assert_eq!(state.scheduled_time, None);
    }
}
