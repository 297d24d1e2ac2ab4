//! Stochastic transitions: exponentially-distributed firing delay, with an
//! optional per-firing token cap.

use crate::adapter::ModelAdapter;
use crate::model::{Net, TransIdx, TransitionParams};
use crate::scheduler::state::TransitionState;
use rand::Rng;
use rand_distr::{Distribution, Exp};

use super::{fire_with_cap, FireOutcome};

/// `now ≥ scheduled_time`. `scheduled_time` is populated by
/// [`schedule_on_enable`] the moment the transition becomes structurally
/// enabled, and cleared on disablement by [`TransitionState::mark_disabled`].
pub fn can_fire(state: &TransitionState, now: f64) -> (bool, String) {
    match state.scheduled_time {
        Some(scheduled) if now >= scheduled => (true, String::new()),
        Some(scheduled) => (false, format!("scheduled at {scheduled}, not yet due")),
        None => (false, "no firing scheduled".to_string()),
    }
}

/// Sample `δ ~ Exp(λ)` and set `scheduled_time = t0 + δ`. Call whenever the
/// scheduler observes a disabled→enabled transition.
pub fn schedule_on_enable(
    net: &Net,
    state: &mut TransitionState,
    t: TransIdx,
    t0: f64,
    rng: &mut impl Rng,
) {
    let rate = match &net.transition(t).params {
        TransitionParams::Stochastic(p) => p.rate,
        _ => return,
    };
    state.scheduled_time = Some(t0 + sample_delay(rate, rng));
}

fn sample_delay(rate: f64, rng: &mut impl Rng) -> f64 {
    Exp::new(rate).map(|d| d.sample(rng)).unwrap_or(0.0)
}

/// Fire once, capping tokens produced per output arc to `max_burst` when
/// set, then resample the next firing time — the process continues while
/// the transition remains enabled.
pub fn fire(
    net: &mut Net,
    adapter: &ModelAdapter,
    state: &mut TransitionState,
    t: TransIdx,
    now: f64,
    rng: &mut impl Rng,
) -> FireOutcome {
    let params = match &net.transition(t).params {
        TransitionParams::Stochastic(p) => *p,
        _ => {
            return FireOutcome {
                fired: false,
                details: "not a stochastic transition".to_string(),
            }
        }
    };
    let outcome = fire_with_cap(net, adapter, t, params.max_burst);
    if outcome.fired {
        state.scheduled_time = Some(now + sample_delay(params.rate, rng));
    }
    outcome
}
