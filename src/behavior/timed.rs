//! Timed transitions: fire within an `[enablement_time+α, enablement_time+β]` window.

use crate::adapter::ModelAdapter;
use crate::model::{Net, TransIdx, TransitionParams};
use crate::scheduler::state::TransitionState;

use super::FireOutcome;

/// `enablement_time + α ≤ now ≤ enablement_time + β`. A transition past its
/// `β` edge is "late" but still eligible — latest-policy hosts force-fire
/// rather than lose the event.
pub fn can_fire(net: &Net, state: &TransitionState, t: TransIdx, now: f64) -> (bool, String) {
    let Some(enablement_time) = state.enablement_time else {
        return (false, "not structurally enabled".to_string());
    };
    let params = match &net.transition(t).params {
        TransitionParams::Timed(p) => p,
        _ => return (false, "not a timed transition".to_string()),
    };
    if now < enablement_time + params.earliest {
        return (
            false,
            format!("before earliest window edge ({})", enablement_time + params.earliest),
        );
    }
    (true, String::new())
}

/// Identical firing mechanics to an immediate transition — only the
/// predicate differs.
pub fn fire(net: &mut Net, adapter: &ModelAdapter, t: TransIdx) -> FireOutcome {
    super::fire_once(net, adapter, t)
}
