//! Immediate transitions: fire at most once per step once enabled, no
//! temporal delay.

use crate::adapter::ModelAdapter;
use crate::model::{Net, TransIdx};

use super::FireOutcome;

/// Temporal predicate is trivially true; competition is resolved entirely
/// by priority/firing_policy at the selection stage (§4.5).
pub fn can_fire(_net: &Net, _adapter: &ModelAdapter, _t: TransIdx, _now: f64) -> (bool, String) {
    (true, String::new())
}

/// Consume every normal input, produce every output, once.
pub fn fire(net: &mut Net, adapter: &ModelAdapter, t: TransIdx) -> FireOutcome {
    super::fire_once(net, adapter, t)
}
