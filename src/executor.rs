//! Atomic step executor (§4.6): validate → snapshot → commit → rollback.

use crate::adapter::ModelAdapter;
use crate::behavior;
use crate::model::{Net, TransIdx};
use crate::scheduler::Scheduler;
use rand::Rng;
use tracing::{error, warn};

/// Result of one atomic commit attempt over a selected, ordered set.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub success: bool,
    pub fired: Vec<TransIdx>,
    pub message: String,
}

/// Run the three-phase commit over `ordered` (already conflict-selected
/// and firing_policy-ordered by the controller). On any validation or
/// commit failure the marking is restored wholesale and `fired` is empty.
pub fn execute(
    net: &mut Net,
    adapter: &ModelAdapter,
    scheduler: &mut Scheduler,
    ordered: &[TransIdx],
    now: f64,
    rng: &mut impl Rng,
) -> StepOutcome {
    if ordered.is_empty() {
        return StepOutcome {
            success: true,
            fired: Vec::new(),
            message: String::new(),
        };
    }

    for &t in ordered {
        let (ok, reason) = behavior::can_fire(net, adapter, scheduler.state(t), t, now);
        if !ok {
            let id = net.transition(t).id.clone();
            warn!(transition = %id, %reason, "validation failed before atomic commit");
            return StepOutcome {
                success: false,
                fired: Vec::new(),
                message: format!("validation failed: {id}"),
            };
        }
    }

    let snapshot = net.snapshot_tokens();
    let mut fired = Vec::new();
    for &t in ordered {
        let outcome = behavior::fire(net, adapter, scheduler.state_mut(t), t, now, rng);
        if !outcome.fired {
            net.restore_tokens(&snapshot);
            let id = net.transition(t).id.clone();
            error!(transition = %id, reason = %outcome.details, "atomic commit rolled back");
            return StepOutcome {
                success: false,
                fired: Vec::new(),
                message: format!("atomic commit rolled back: {}", outcome.details),
            };
        }
        fired.push(t);
    }

    StepOutcome {
        success: true,
        fired,
        message: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArcDirection, ArcKind, Place, Transition};

    fn race_net() -> Net {
        let mut net = Net::new();
        net.add_place(Place::new("p1", "P1", 1)).unwrap();
        net.add_place(Place::new("p2", "P2", 0)).unwrap();
        net.add_transition(Transition::immediate("t1", "T1", 5))
            .unwrap();
        net.add_arc("a1", "p1", "t1", ArcDirection::Input, 1, ArcKind::Normal, None)
            .unwrap();
        net.add_arc("a2", "p2", "t1", ArcDirection::Output, 1, ArcKind::Normal, None)
            .unwrap();
        net
    }

    #[test]
    fn commits_successfully() {
        let mut net = race_net();
        let adapter = ModelAdapter::new();
        let mut scheduler = Scheduler::new(net.transition_count());
        let mut rng = rand::thread_rng();
        scheduler.update(&net, &adapter, 0.0, &mut rng);
        let t = net.transition_idx("t1").unwrap();
        let outcome = execute(&mut net, &adapter, &mut scheduler, &[t], 0.0, &mut rng);
        assert!(outcome.success);
        assert_eq!(outcome.fired, vec![t]);
        assert_eq!(net.place(net.place_idx("p1").unwrap()).tokens, 0);
        assert_eq!(net.place(net.place_idx("p2").unwrap()).tokens, 1);
    }

    #[test]
    fn rolls_back_on_validation_failure() {
        let mut net = race_net();
        net.place_mut(net.place_idx("p1").unwrap()).tokens = 0;
        let adapter = ModelAdapter::new();
        let mut scheduler = Scheduler::new(net.transition_count());
        let mut rng = rand::thread_rng();
        let t = net.transition_idx("t1").unwrap();
        let outcome = execute(&mut net, &adapter, &mut scheduler, &[t], 0.0, &mut rng);
        assert!(!outcome.success);
        assert!(outcome.fired.is_empty());
        assert_eq!(net.place(net.place_idx("p1").unwrap()).tokens, 0);
    }

    #[test]
    fn rolls_back_mid_commit_when_an_earlier_firing_starves_a_later_one() {
        // p1 starts with 3 tokens. t1 (weight 1) and t2 (weight 3) both
        // validate against that pre-commit marking, but committing t1 first
        // drains p1 to 2, so t2's own `fire` call fails once its turn comes —
        // a genuine mid-commit failure, not a validation-phase rejection.
        let mut net = Net::new();
        net.add_place(Place::new("p1", "P1", 3)).unwrap();
        net.add_place(Place::new("p2", "P2", 0)).unwrap();
        net.add_transition(Transition::immediate("t1", "T1", 0))
            .unwrap();
        net.add_transition(Transition::immediate("t2", "T2", 0))
            .unwrap();
        net.add_arc("a1", "p1", "t1", ArcDirection::Input, 1, ArcKind::Normal, None)
            .unwrap();
        net.add_arc("a2", "p2", "t1", ArcDirection::Output, 1, ArcKind::Normal, None)
            .unwrap();
        net.add_arc("a3", "p1", "t2", ArcDirection::Input, 3, ArcKind::Normal, None)
            .unwrap();
        net.add_arc("a4", "p2", "t2", ArcDirection::Output, 1, ArcKind::Normal, None)
            .unwrap();
        let adapter = ModelAdapter::new();
        let mut scheduler = Scheduler::new(net.transition_count());
        let mut rng = rand::thread_rng();
        let t1 = net.transition_idx("t1").unwrap();
        let t2 = net.transition_idx("t2").unwrap();
        let before = net.marking();

        let outcome = execute(&mut net, &adapter, &mut scheduler, &[t1, t2], 0.0, &mut rng);

        assert!(!outcome.success);
        assert!(outcome.message.starts_with("atomic commit rolled back"));
        assert!(outcome.fired.is_empty());
        assert_eq!(net.marking(), before);
    }

    #[test]
    fn empty_selection_is_a_trivial_success() {
        let mut net = race_net();
        let adapter = ModelAdapter::new();
        let mut scheduler = Scheduler::new(net.transition_count());
        let mut rng = rand::thread_rng();
        let outcome = execute(&mut net, &adapter, &mut scheduler, &[], 0.0, &mut rng);
        assert!(outcome.success);
        assert!(outcome.fired.is_empty());
    }
}
