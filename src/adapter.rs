//! Read-mostly view of the net tailored for behaviors: cached locality
//! lookups plus read-only access to the controller's logical time.

use crate::model::{ArcIdx, Net, Place, PlaceIdx, TransIdx, TransitionParams};
use crate::rate_expr::RateExpr;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

/// Caches keyed by transition id, invalidated wholesale on any structural
/// change to the net. Behaviors must re-request through the adapter after
/// an invalidation rather than retain raw locality lists across one.
#[derive(Default)]
pub struct ModelAdapter {
    input_arcs: RefCell<HashMap<TransIdx, Vec<ArcIdx>>>,
    output_arcs: RefCell<HashMap<TransIdx, Vec<ArcIdx>>>,
    regulatory: RefCell<HashMap<TransIdx, Vec<PlaceIdx>>>,
    logical_time: Cell<f64>,
}

impl ModelAdapter {
    /// A fresh adapter with empty caches and `logical_time` at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every cached locality list. Called by the controller whenever
    /// a place, transition, or arc is created, deleted, or transformed.
    pub fn invalidate(&self) {
        self.input_arcs.borrow_mut().clear();
        self.output_arcs.borrow_mut().clear();
        self.regulatory.borrow_mut().clear();
    }

    /// Update the read-only logical-time view. Called once per step by the
    /// controller before behaviors are consulted.
    pub fn set_time(&self, time: f64) {
        self.logical_time.set(time);
    }

    /// The controller's logical time as of the last [`ModelAdapter::set_time`] call.
    pub fn time(&self) -> f64 {
        self.logical_time.get()
    }

    /// A place by id, or `None` if no such place exists.
    pub fn get_place<'a>(&self, net: &'a Net, id: &str) -> Option<&'a Place> {
        net.place_idx(id).map(|idx| net.place(idx))
    }

    /// Indices of `t`'s input arcs (`•t`), cached.
    pub fn input_arcs(&self, net: &Net, t: TransIdx) -> Vec<ArcIdx> {
        if let Some(cached) = self.input_arcs.borrow().get(&t) {
            return cached.clone();
        }
        let arcs = indexed_arcs(net, t, true);
        self.input_arcs.borrow_mut().insert(t, arcs.clone());
        arcs
    }

    /// Indices of `t`'s output arcs (`t•`), cached.
    pub fn output_arcs(&self, net: &Net, t: TransIdx) -> Vec<ArcIdx> {
        if let Some(cached) = self.output_arcs.borrow().get(&t) {
            return cached.clone();
        }
        let arcs = indexed_arcs(net, t, false);
        self.output_arcs.borrow_mut().insert(t, arcs.clone());
        arcs
    }

    /// Places appearing in `t`'s `rate_expr` with no corresponding arc —
    /// the regulatory set `Σ(t)` (continuous transitions only; empty
    /// otherwise).
    pub fn regulatory_places(&self, net: &Net, t: TransIdx) -> Vec<PlaceIdx> {
        if let Some(cached) = self.regulatory.borrow().get(&t) {
            return cached.clone();
        }
        let transition = net.transition(t);
        let vars: Vec<String> = match &transition.params {
            TransitionParams::Continuous(params) => {
                RateExpr::new(&params.rate_expr).regulatory_vars().to_vec()
            }
            _ => Vec::new(),
        };
        let already: HashSet<PlaceIdx> = net
            .input_arcs(t)
            .map(|a| a.place)
            .chain(net.output_arcs(t).map(|a| a.place))
            .collect();
        let mut result = Vec::new();
        for var in vars {
            if let Some(place_id) = var.strip_prefix('P') {
                if let Some(idx) = net.place_idx(place_id) {
                    if !already.contains(&idx) {
                        result.push(idx);
                    }
                }
            }
        }
        self.regulatory.borrow_mut().insert(t, result.clone());
        result
    }
}

fn indexed_arcs(net: &Net, t: TransIdx, input: bool) -> Vec<ArcIdx> {
    net.arcs()
        .enumerate()
        .filter(|(_, a)| a.transition == t && (a.is_input() == input))
        .map(|(i, _)| ArcIdx(i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArcDirection, ArcKind, Place as ModelPlace, Transition};

    fn sample() -> (Net, TransIdx) {
        let mut net = Net::new();
        net.add_place(ModelPlace::new("p1", "P1", 5)).unwrap();
        net.add_place(ModelPlace::new("p2", "P2", 0)).unwrap();
        let t = net
            .add_transition(Transition::immediate("t1", "T1", 0))
            .unwrap();
        net.add_arc("a1", "p1", "t1", ArcDirection::Input, 1, ArcKind::Normal, None)
            .unwrap();
        net.add_arc("a2", "p2", "t1", ArcDirection::Output, 1, ArcKind::Normal, None)
            .unwrap();
        (net, t)
    }

    #[test]
    fn caches_input_and_output_arcs() {
        let (net, t) = sample();
        let adapter = ModelAdapter::new();
        assert_eq!(adapter.input_arcs(&net, t).len(), 1);
        assert_eq!(adapter.output_arcs(&net, t).len(), 1);
        // second call hits the cache and returns the same result
        assert_eq!(adapter.input_arcs(&net, t).len(), 1);
    }

    #[test]
    fn invalidate_clears_all_caches() {
        let (net, t) = sample();
        let adapter = ModelAdapter::new();
        adapter.input_arcs(&net, t);
        adapter.output_arcs(&net, t);
        adapter.invalidate();
        assert!(adapter.input_arcs.borrow().is_empty());
        assert!(adapter.output_arcs.borrow().is_empty());
    }

    #[test]
    fn regulatory_places_skips_places_already_on_an_arc() {
        let mut net = Net::new();
        net.add_place(ModelPlace::new("p1", "P1", 1)).unwrap();
        net.add_place(ModelPlace::new("preg", "Preg", 2)).unwrap();
        let t = net
            .add_transition(Transition {
                id: "t1".into(),
                label: "T1".into(),
                priority: 0,
                firing_policy: crate::model::FiringPolicy::Priority,
                is_source: false,
                is_sink: false,
                params: TransitionParams::Continuous(crate::model::ContinuousParams {
                    rate_expr: "Pp1 * Ppreg".to_string(),
                    min_rate: 0.0,
                    max_rate: 10.0,
                }),
            })
            .unwrap();
        net.add_arc("a1", "p1", "t1", ArcDirection::Input, 1, ArcKind::Normal, None)
            .unwrap();
        let adapter = ModelAdapter::new();
        let regulatory = adapter.regulatory_places(&net, t);
        assert_eq!(regulatory, vec![net.place_idx("preg").unwrap()]);
    }

    #[test]
    fn time_round_trips() {
        let adapter = ModelAdapter::new();
        adapter.set_time(3.5);
        assert_eq!(adapter.time(), 3.5);
    }
}
