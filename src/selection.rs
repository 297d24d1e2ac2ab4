//! Strategies for choosing among the maximal independent sets the conflict
//! detector enumerates (§4.5), and for ordering transitions within the
//! chosen set before the executor commits them.

use crate::model::{FiringPolicy, Net, TransIdx};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Strategy used to pick one maximal independent set among those the
/// conflict detector enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Maximize cardinality; ties by summed priority, then lexicographic id.
    Largest,
    /// Maximize summed priority; ties by cardinality, then lexicographic id.
    Priority,
    /// Uniform random choice among the enumerated sets.
    Random,
    /// Deterministic: the first set in enumeration (lexicographic) order.
    First,
}

fn lex_key(net: &Net, set: &[TransIdx]) -> Vec<&str> {
    let mut ids: Vec<&str> = set.iter().map(|&t| net.transition(t).id.as_str()).collect();
    ids.sort_unstable();
    ids
}

fn priority_sum(net: &Net, set: &[TransIdx]) -> i64 {
    set.iter().map(|&t| net.transition(t).priority as i64).sum()
}

/// Pick the index of the set to fire this step, given the enumerated
/// maximal independent sets (already capped and produced in deterministic
/// order by the conflict detector).
pub fn select_set_index(
    sets: &[Vec<TransIdx>],
    policy: ConflictPolicy,
    net: &Net,
    rng: &mut impl Rng,
) -> Option<usize> {
    if sets.is_empty() {
        return None;
    }
    let idx = match policy {
        ConflictPolicy::First => 0,
        ConflictPolicy::Random => rng.gen_range(0..sets.len()),
        ConflictPolicy::Largest => sets
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.len()
                    .cmp(&b.len())
                    .then_with(|| priority_sum(net, a).cmp(&priority_sum(net, b)))
                    .then_with(|| lex_key(net, b).cmp(&lex_key(net, a)))
            })
            .map(|(i, _)| i)
            .unwrap_or(0),
        ConflictPolicy::Priority => sets
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                priority_sum(net, a)
                    .cmp(&priority_sum(net, b))
                    .then_with(|| a.len().cmp(&b.len()))
                    .then_with(|| lex_key(net, b).cmp(&lex_key(net, a)))
            })
            .map(|(i, _)| i)
            .unwrap_or(0),
    };
    Some(idx)
}

fn policy_rank(kind: crate::model::TransitionKind) -> u8 {
    use crate::model::TransitionKind::*;
    match kind {
        Immediate => 0,
        Timed => 1,
        Stochastic => 2,
        Continuous => 3,
    }
}

/// Order transitions within a chosen set for commit, honoring each
/// transition's `firing_policy` as a sort key. Ties always fall back to
/// lexicographic id for determinism.
pub fn order_within_set(
    set: &[TransIdx],
    net: &Net,
    enablement_time: impl Fn(TransIdx) -> f64,
) -> Vec<TransIdx> {
    let mut ordered: Vec<TransIdx> = set.to_vec();
    ordered.sort_by(|&a, &b| {
        let ta = net.transition(a);
        let tb = net.transition(b);
        let by_policy = match (ta.firing_policy, tb.firing_policy) {
            (FiringPolicy::PreemptivePriority, _) | (_, FiringPolicy::PreemptivePriority) => {
                policy_rank(ta.kind()).cmp(&policy_rank(tb.kind()))
            }
            (FiringPolicy::Priority, _) | (_, FiringPolicy::Priority) => {
                tb.priority.cmp(&ta.priority)
            }
            (FiringPolicy::Age, _) | (_, FiringPolicy::Age) => enablement_time(a)
                .partial_cmp(&enablement_time(b))
                .unwrap_or(std::cmp::Ordering::Equal),
            _ => std::cmp::Ordering::Equal,
        };
        by_policy.then_with(|| ta.id.cmp(&tb.id))
    });
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Transition;
    use rand::SeedableRng;

    fn net_with(ids_priorities: &[(&str, i32)]) -> Net {
        let mut net = Net::new();
        for (id, priority) in ids_priorities {
            net.add_transition(Transition::immediate(*id, *id, *priority))
                .unwrap();
        }
        net
    }

    #[test]
    fn largest_prefers_cardinality() {
        let net = net_with(&[("a", 0), ("b", 0), ("c", 0)]);
        let sets = vec![
            vec![net.transition_idx("a").unwrap()],
            vec![net.transition_idx("b").unwrap(), net.transition_idx("c").unwrap()],
        ];
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let idx = select_set_index(&sets, ConflictPolicy::Largest, &net, &mut rng).unwrap();
        assert_eq!(idx, 1);
    }

    #[test]
    fn priority_prefers_summed_priority() {
        let net = net_with(&[("a", 10), ("b", 1), ("c", 1)]);
        let sets = vec![
            vec![net.transition_idx("a").unwrap()],
            vec![net.transition_idx("b").unwrap(), net.transition_idx("c").unwrap()],
        ];
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let idx = select_set_index(&sets, ConflictPolicy::Priority, &net, &mut rng).unwrap();
        assert_eq!(idx, 0);
    }

    #[test]
    fn first_is_deterministic() {
        let net = net_with(&[("a", 0), ("b", 0)]);
        let sets = vec![
            vec![net.transition_idx("b").unwrap()],
            vec![net.transition_idx("a").unwrap()],
        ];
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let idx = select_set_index(&sets, ConflictPolicy::First, &net, &mut rng).unwrap();
        assert_eq!(idx, 0);
    }

    #[test]
    fn empty_sets_select_none() {
        let net = Net::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        assert!(select_set_index(&[], ConflictPolicy::First, &net, &mut rng).is_none());
    }

    #[test]
    fn priority_policy_orders_descending() {
        let net = net_with(&[("low", 1), ("high", 10)]);
        let mut net = net;
        net.transition_mut(net.transition_idx("low").unwrap()).firing_policy = FiringPolicy::Priority;
        net.transition_mut(net.transition_idx("high").unwrap()).firing_policy = FiringPolicy::Priority;
        let set = vec![net.transition_idx("low").unwrap(), net.transition_idx("high").unwrap()];
        let ordered = order_within_set(&set, &net, |_| 0.0);
        assert_eq!(net.transition(ordered[0]).id, "high");
    }
}
