//! The behavior contract: four firing semantics dispatched from a tagged
//! union (the transition's [`TransitionKind`]) rather than through trait
//! objects — cheaper to call and trivial to snapshot.

pub mod continuous;
pub mod immediate;
pub mod stochastic;
pub mod timed;

use crate::adapter::ModelAdapter;
use crate::model::{ArcKind, Net, TransIdx, TransitionKind};
use crate::scheduler::state::TransitionState;
use rand::Rng;

/// Outcome of a discrete `fire()` call.
#[derive(Debug, Clone, PartialEq)]
pub struct FireOutcome {
    pub fired: bool,
    pub details: String,
}

/// Structural enablement (§4.3): normal/inhibitor/test arc predicates over
/// current token counts, with the source/sink locality exceptions.
pub fn structurally_enabled(net: &Net, adapter: &ModelAdapter, t: TransIdx) -> bool {
    let transition = net.transition(t);
    if transition.is_source {
        return !adapter.output_arcs(net, t).is_empty();
    }
    adapter.input_arcs(net, t).into_iter().all(|idx| {
        let arc = net.arc(idx);
        let tokens = net.place(arc.place).tokens;
        match arc.kind {
            ArcKind::Normal => tokens >= arc.weight,
            ArcKind::Inhibitor => tokens < arc.weight,
            ArcKind::Test => tokens >= arc.weight,
        }
    })
}

/// `can_fire(now)`: structural predicate plus the kind-specific temporal
/// predicate.
pub fn can_fire(
    net: &Net,
    adapter: &ModelAdapter,
    state: &TransitionState,
    t: TransIdx,
    now: f64,
) -> (bool, String) {
    if !structurally_enabled(net, adapter, t) {
        return (false, "structurally disabled".to_string());
    }
    match net.transition(t).kind() {
        TransitionKind::Immediate => immediate::can_fire(net, adapter, t, now),
        TransitionKind::Timed => timed::can_fire(net, state, t, now),
        TransitionKind::Stochastic => stochastic::can_fire(state, now),
        TransitionKind::Continuous => continuous::can_fire(net, adapter, t, now),
    }
}

/// `fire()`: discrete atomic update for the three discrete kinds.
/// Continuous transitions never fire discretely; calling this on one is a
/// no-op that reports `fired: false`.
pub fn fire(
    net: &mut Net,
    adapter: &ModelAdapter,
    state: &mut TransitionState,
    t: TransIdx,
    now: f64,
    rng: &mut impl Rng,
) -> FireOutcome {
    match net.transition(t).kind() {
        TransitionKind::Immediate => immediate::fire(net, adapter, t),
        TransitionKind::Timed => timed::fire(net, adapter, t),
        TransitionKind::Stochastic => stochastic::fire(net, adapter, state, t, now, rng),
        TransitionKind::Continuous => FireOutcome {
            fired: false,
            details: "continuous transitions integrate, they do not fire".to_string(),
        },
    }
}

/// Consume every normal input arc's weight, produce every output arc's
/// weight, with no per-arc cap. Shared by immediate and timed firing.
pub(super) fn fire_once(net: &mut Net, adapter: &ModelAdapter, t: TransIdx) -> FireOutcome {
    fire_with_cap(net, adapter, t, None)
}

/// As [`fire_once`], but when `cap` is set (stochastic `max_burst`), clamps
/// the tokens moved on *every* normal arc — input and output alike — to
/// `cap`. Capping both sides of the firing by the same amount keeps
/// consumption and production in lockstep: a weight-5 input arc facing a
/// weight-5 output arc under `max_burst = 3` consumes 3 and produces 3,
/// rather than consuming the full weight while producing only the capped
/// amount.
pub(super) fn fire_with_cap(
    net: &mut Net,
    adapter: &ModelAdapter,
    t: TransIdx,
    cap: Option<u64>,
) -> FireOutcome {
    let transition = net.transition(t);
    let capped = |weight: u64| cap.map(|c| weight.min(c)).unwrap_or(weight);
    if !transition.is_source {
        for idx in adapter.input_arcs(net, t) {
            let arc = net.arc(idx);
            if arc.kind == ArcKind::Normal && net.place(arc.place).tokens < capped(arc.weight) {
                return FireOutcome {
                    fired: false,
                    details: format!("insufficient tokens on input arc {}", arc.id),
                };
            }
        }
        for idx in adapter.input_arcs(net, t) {
            let arc = net.arc(idx);
            if arc.kind == ArcKind::Normal {
                let place = arc.place;
                let weight = capped(arc.weight);
                net.place_mut(place).tokens -= weight;
            }
        }
    }
    if !net.transition(t).is_sink {
        for idx in adapter.output_arcs(net, t) {
            let arc = net.arc(idx);
            let place = arc.place;
            let weight = capped(arc.weight);
            net.place_mut(place).tokens += weight;
        }
    }
    FireOutcome {
        fired: true,
        details: String::new(),
    }
}
