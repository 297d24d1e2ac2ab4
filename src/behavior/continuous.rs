//! Continuous transitions: contribute RK4-integrated flow instead of
//! firing discretely.

use crate::adapter::ModelAdapter;
use crate::model::{ArcKind, Net, TransIdx, TransitionParams};
use crate::rate_expr::RateExpr;

/// Evaluate `rate_expr` at `now` resolving place aliases through `lookup`,
/// clamped to `[min_rate, max_rate]`. A parse or evaluation failure
/// degrades to `0.0` (absorbed by [`RateExpr::evaluate`]) before clamping.
/// The integrator uses this directly, substituting a perturbed marking for
/// each RK4 stage instead of the net's current tokens.
pub fn rate_with_lookup(
    net: &Net,
    t: TransIdx,
    now: f64,
    lookup: &dyn Fn(&str) -> Option<f64>,
) -> f64 {
    let params = match &net.transition(t).params {
        TransitionParams::Continuous(p) => p,
        _ => return 0.0,
    };
    let expr = RateExpr::new(&params.rate_expr);
    expr.evaluate(now, lookup).clamp(params.min_rate, params.max_rate)
}

/// [`rate_with_lookup`] resolved against the net's current marking.
pub fn rate(net: &Net, _adapter: &ModelAdapter, t: TransIdx, now: f64) -> f64 {
    let lookup = |name: &str| {
        name.strip_prefix('P')
            .and_then(|place_id| net.place_idx(place_id))
            .map(|idx| net.place(idx).tokens as f64)
    };
    rate_with_lookup(net, t, now, &lookup)
}

/// Generic `can_fire` used by the common dispatcher: true whenever
/// structurally enabled (checked by the caller) and the rate evaluates
/// without degrading — used for bookkeeping, not for the integrator's own
/// admission into the continuous set `C` (see [`enabled_for_step`]).
pub fn can_fire(net: &Net, adapter: &ModelAdapter, t: TransIdx, now: f64) -> (bool, String) {
    let r = rate(net, adapter, t, now);
    if r.is_finite() {
        (true, String::new())
    } else {
        (false, "rate evaluation produced a non-finite value".to_string())
    }
}

/// The integrator's own admission check: approximates "enough tokens to
/// sustain this step's flow" by requiring each normal input place hold at
/// least `weight · min_rate · dt` tokens, alongside the ordinary
/// inhibitor/test predicates. Evaluated once, before any discrete firing
/// in the step, so a discrete commit cannot mid-step enable a continuous
/// flow.
pub fn enabled_for_step(net: &Net, adapter: &ModelAdapter, t: TransIdx, dt: f64) -> bool {
    let params = match &net.transition(t).params {
        TransitionParams::Continuous(p) => p,
        _ => return false,
    };
    adapter.input_arcs(net, t).into_iter().all(|idx| {
        let arc = net.arc(idx);
        let tokens = net.place(arc.place).tokens as f64;
        match arc.kind {
            ArcKind::Normal => tokens >= arc.weight as f64 * params.min_rate * dt,
            ArcKind::Inhibitor => (tokens as u64) < arc.weight,
            ArcKind::Test => tokens >= arc.weight as f64,
        }
    })
}
