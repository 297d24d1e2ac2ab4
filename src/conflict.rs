//! Conflict detection (§4.4): builds a conflict graph over input-place
//! overlap and enumerates up to five maximal independent (non-conflicting)
//! sets.

use crate::adapter::ModelAdapter;
use crate::model::{ArcKind, Net, PlaceIdx, TransIdx};
use std::collections::{HashMap, HashSet};

/// Hard cap on enumerated maximal independent sets (§4.4): unbounded
/// Bron–Kerbosch is avoided since users benefit from 2–3x concurrency, not
/// an exhaustive search.
pub const MAX_CONFLICT_SETS: usize = 5;

/// The input places that make a transition's preset count toward
/// conflicts: normal and test arcs both "read mandatory tokens"; inhibitor
/// arcs check absence and never conflict.
fn qualifying_input_places(net: &Net, adapter: &ModelAdapter, t: TransIdx) -> HashSet<PlaceIdx> {
    adapter
        .input_arcs(net, t)
        .into_iter()
        .filter_map(|idx| {
            let arc = net.arc(idx);
            matches!(arc.kind, ArcKind::Normal | ArcKind::Test).then_some(arc.place)
        })
        .collect()
}

/// Undirected adjacency: `t1` conflicts with `t2` iff their qualifying
/// input places overlap. Convergent outputs and shared regulatory places
/// never count.
fn build_graph(
    net: &Net,
    adapter: &ModelAdapter,
    enabled: &[TransIdx],
) -> HashMap<TransIdx, HashSet<TransIdx>> {
    let locality: Vec<(TransIdx, HashSet<PlaceIdx>)> = enabled
        .iter()
        .map(|&t| (t, qualifying_input_places(net, adapter, t)))
        .collect();
    let mut graph: HashMap<TransIdx, HashSet<TransIdx>> =
        enabled.iter().map(|&t| (t, HashSet::new())).collect();
    for i in 0..locality.len() {
        for j in (i + 1)..locality.len() {
            let (t1, set1) = &locality[i];
            let (t2, set2) = &locality[j];
            if !set1.is_disjoint(set2) {
                graph.entry(*t1).or_default().insert(*t2);
                graph.entry(*t2).or_default().insert(*t1);
            }
        }
    }
    graph
}

fn sorted_by_id(net: &Net, mut ts: Vec<TransIdx>) -> Vec<TransIdx> {
    ts.sort_by(|&a, &b| net.transition(a).id.cmp(&net.transition(b).id));
    ts
}

/// Recursive maximal-independent-set enumeration (Bron–Kerbosch over the
/// complement graph), capped at [`MAX_CONFLICT_SETS`] and iterated in
/// lexicographic id order so the cap discards extras deterministically.
fn enumerate(
    net: &Net,
    graph: &HashMap<TransIdx, HashSet<TransIdx>>,
    r: &mut Vec<TransIdx>,
    p: Vec<TransIdx>,
    x: Vec<TransIdx>,
    results: &mut Vec<Vec<TransIdx>>,
) {
    if results.len() >= MAX_CONFLICT_SETS {
        return;
    }
    if p.is_empty() && x.is_empty() {
        if !r.is_empty() {
            results.push(sorted_by_id(net, r.clone()));
        }
        return;
    }
    let mut p = sorted_by_id(net, p);
    let mut x = x;
    while let Some(v) = p.first().copied() {
        if results.len() >= MAX_CONFLICT_SETS {
            return;
        }
        let neighbors = graph.get(&v).cloned().unwrap_or_default();
        r.push(v);
        let new_p: Vec<TransIdx> = p
            .iter()
            .copied()
            .filter(|u| *u != v && !neighbors.contains(u))
            .collect();
        let new_x: Vec<TransIdx> = x
            .iter()
            .copied()
            .filter(|u| !neighbors.contains(u))
            .collect();
        enumerate(net, graph, r, new_p, new_x, results);
        r.pop();
        p.retain(|&u| u != v);
        x.push(v);
    }
}

/// Enumerate up to [`MAX_CONFLICT_SETS`] maximal independent sets of
/// non-conflicting transitions among `enabled`.
pub fn maximal_independent_sets(
    net: &Net,
    adapter: &ModelAdapter,
    enabled: &[TransIdx],
) -> Vec<Vec<TransIdx>> {
    if enabled.is_empty() {
        return Vec::new();
    }
    let graph = build_graph(net, adapter, enabled);
    let mut results = Vec::new();
    enumerate(
        net,
        &graph,
        &mut Vec::new(),
        enabled.to_vec(),
        Vec::new(),
        &mut results,
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArcDirection, Place, Transition};

    fn net_with_shared_input() -> (Net, TransIdx, TransIdx, TransIdx) {
        let mut net = Net::new();
        net.add_place(Place::new("p1", "P1", 10)).unwrap();
        net.add_place(Place::new("p2", "P2", 10)).unwrap();
        net.add_place(Place::new("out", "Out", 0)).unwrap();
        let t1 = net
            .add_transition(Transition::immediate("t1", "T1", 0))
            .unwrap();
        let t2 = net
            .add_transition(Transition::immediate("t2", "T2", 0))
            .unwrap();
        let t3 = net
            .add_transition(Transition::immediate("t3", "T3", 0))
            .unwrap();
        // t1 and t2 both consume p1 (conflict); t3 consumes only p2 (independent)
        net.add_arc("a1", "p1", "t1", ArcDirection::Input, 1, ArcKind::Normal, None)
            .unwrap();
        net.add_arc("a2", "p1", "t2", ArcDirection::Input, 1, ArcKind::Normal, None)
            .unwrap();
        net.add_arc("a3", "p2", "t3", ArcDirection::Input, 1, ArcKind::Normal, None)
            .unwrap();
        net.add_arc("a4", "out", "t1", ArcDirection::Output, 1, ArcKind::Normal, None)
            .unwrap();
        net.add_arc("a5", "out", "t2", ArcDirection::Output, 1, ArcKind::Normal, None)
            .unwrap();
        net.add_arc("a6", "out", "t3", ArcDirection::Output, 1, ArcKind::Normal, None)
            .unwrap();
        (net, t1, t2, t3)
    }

    #[test]
    fn shared_normal_input_conflicts() {
        let (net, t1, t2, _t3) = net_with_shared_input();
        let adapter = ModelAdapter::new();
        let graph = build_graph(&net, &adapter, &[t1, t2]);
        assert!(graph[&t1].contains(&t2));
    }

    #[test]
    fn independent_transition_is_compatible_with_both() {
        let (net, t1, t2, t3) = net_with_shared_input();
        let adapter = ModelAdapter::new();
        let sets = maximal_independent_sets(&net, &adapter, &[t1, t2, t3]);
        assert!(sets.iter().any(|s| s.contains(&t1) && s.contains(&t3) && !s.contains(&t2)));
        assert!(sets.iter().any(|s| s.contains(&t2) && s.contains(&t3) && !s.contains(&t1)));
        assert!(sets.iter().all(|s| !(s.contains(&t1) && s.contains(&t2))));
    }

    #[test]
    fn convergent_outputs_never_conflict() {
        let (net, t1, t2, t3) = net_with_shared_input();
        let adapter = ModelAdapter::new();
        // t1, t2, t3 all share the `out` output place but that never creates a conflict
        let graph = build_graph(&net, &adapter, &[t1, t2, t3]);
        assert!(!graph[&t1].contains(&t3));
        assert!(!graph[&t2].contains(&t3));
    }

    #[test]
    fn empty_input_yields_no_sets() {
        let net = Net::new();
        let adapter = ModelAdapter::new();
        assert!(maximal_independent_sets(&net, &adapter, &[]).is_empty());
    }
}
