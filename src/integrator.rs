//! Continuous integrator (§4.7): classic RK4 over the snapshot of
//! continuous transitions enabled before any discrete firing in the step.

use crate::adapter::ModelAdapter;
use crate::behavior::continuous;
use crate::model::{Net, PlaceIdx, TransIdx};
use std::collections::{HashMap, HashSet};

/// Stateful integrator: holds an exact (unrounded) floating marking per
/// continuous-affected place so fractional flow survives repeated
/// per-step rounding of the integer token count the rest of the kernel
/// sees. A discrete firing that changes the same place between integrate
/// calls is folded in exactly (integers add losslessly) the next time
/// that place participates in a continuous step.
#[derive(Debug, Clone, Default)]
pub struct Integrator {
    exact: HashMap<PlaceIdx, f64>,
}

impl Integrator {
    /// A fresh integrator with no tracked places.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all tracked fractional state (used by `Controller::reset`).
    pub fn reset(&mut self) {
        self.exact.clear();
    }

    /// The continuous transitions enabled *before* any discrete firing
    /// this step — a snapshot so a discrete commit cannot mid-step enable
    /// a continuous flow.
    pub fn select_enabled(net: &Net, adapter: &ModelAdapter, dt: f64) -> Vec<TransIdx> {
        net.continuous_transitions()
            .filter(|&t| continuous::enabled_for_step(net, adapter, t, dt))
            .collect()
    }

    /// Absorb any change to `p` made outside the integrator (a discrete
    /// firing) since the last time this place was integrated, then return
    /// the current exact value.
    fn sync(&mut self, net: &Net, p: PlaceIdx) -> f64 {
        let actual = net.place(p).tokens as f64;
        let entry = self.exact.entry(p).or_insert(actual);
        let drift = actual - entry.round();
        if drift.abs() >= 0.5 {
            *entry += drift;
        }
        *entry
    }

    /// Advance every place in `c`'s union of localities by `dt` using
    /// classic RK4, clamping to non-negative, irrespective of whether the
    /// discrete atomic step this tick succeeded.
    pub fn integrate(&mut self, net: &mut Net, adapter: &ModelAdapter, c: &[TransIdx], now: f64, dt: f64) {
        if c.is_empty() {
            return;
        }
        let mut place_set: HashSet<PlaceIdx> = HashSet::new();
        for &t in c {
            for idx in adapter.input_arcs(net, t) {
                place_set.insert(net.arc(idx).place);
            }
            for idx in adapter.output_arcs(net, t) {
                place_set.insert(net.arc(idx).place);
            }
        }
        let places: Vec<PlaceIdx> = place_set.into_iter().collect();
        let base: HashMap<PlaceIdx, f64> =
            places.iter().map(|&p| (p, self.sync(net, p))).collect();

        let flow = |marking: &HashMap<PlaceIdx, f64>, time: f64| -> HashMap<PlaceIdx, f64> {
            let mut delta: HashMap<PlaceIdx, f64> = places.iter().map(|&p| (p, 0.0)).collect();
            for &t in c {
                let lookup = |name: &str| {
                    name.strip_prefix('P')
                        .and_then(|id| net.place_idx(id))
                        .map(|idx| {
                            marking
                                .get(&idx)
                                .copied()
                                .unwrap_or_else(|| net.place(idx).tokens as f64)
                        })
                };
                let rate = continuous::rate_with_lookup(net, t, time, &lookup);
                for idx in adapter.input_arcs(net, t) {
                    let arc = net.arc(idx);
                    *delta.entry(arc.place).or_insert(0.0) -= arc.weight as f64 * rate;
                }
                for idx in adapter.output_arcs(net, t) {
                    let arc = net.arc(idx);
                    *delta.entry(arc.place).or_insert(0.0) += arc.weight as f64 * rate;
                }
            }
            delta
        };

        let perturb = |scale: f64, k: &HashMap<PlaceIdx, f64>| -> HashMap<PlaceIdx, f64> {
            places
                .iter()
                .map(|&p| (p, base[&p] + scale * k[&p]))
                .collect()
        };

        let k1 = flow(&base, now);
        let k2 = flow(&perturb(dt / 2.0, &k1), now + dt / 2.0);
        let k3 = flow(&perturb(dt / 2.0, &k2), now + dt / 2.0);
        let k4 = flow(&perturb(dt, &k3), now + dt);

        for &p in &places {
            let delta = dt / 6.0 * (k1[&p] + 2.0 * k2[&p] + 2.0 * k3[&p] + k4[&p]);
            let new_exact = (base[&p] + delta).max(0.0);
            self.exact.insert(p, new_exact);
            net.place_mut(p).tokens = new_exact.round() as u64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArcDirection, ArcKind, ContinuousParams, Place, Transition, TransitionParams};

    fn constant_rate_net(rate: f64) -> (Net, TransIdx) {
        let mut net = Net::new();
        net.add_place(Place::new("p", "P", 1000)).unwrap();
        net.add_place(Place::new("q", "Q", 0)).unwrap();
        let t = net
            .add_transition(Transition {
                id: "t1".into(),
                label: "T1".into(),
                priority: 0,
                firing_policy: crate::model::FiringPolicy::Priority,
                is_source: false,
                is_sink: false,
                params: TransitionParams::Continuous(ContinuousParams {
                    rate_expr: rate.to_string(),
                    min_rate: 0.0,
                    max_rate: 1000.0,
                }),
            })
            .unwrap();
        net.add_arc("a1", "p", "t1", ArcDirection::Input, 1, ArcKind::Normal, None)
            .unwrap();
        net.add_arc("a2", "q", "t1", ArcDirection::Output, 1, ArcKind::Normal, None)
            .unwrap();
        (net, t)
    }

    #[test]
    fn constant_rate_is_exact_after_n_steps() {
        let (mut net, t) = constant_rate_net(2.0);
        let adapter = ModelAdapter::new();
        let mut integrator = Integrator::new();
        let dt = 0.1;
        let mut time = 0.0;
        for _ in 0..50 {
            integrator.integrate(&mut net, &adapter, &[t], time, dt);
            time += dt;
        }
        let q = net.place(net.place_idx("q").unwrap()).tokens as f64;
        let expected = 2.0 * 50.0 * dt;
        assert!((q - expected).abs() < 1e-6);
    }

    #[test]
    fn never_drives_a_place_negative() {
        let (mut net, t) = constant_rate_net(1000.0);
        let adapter = ModelAdapter::new();
        let mut integrator = Integrator::new();
        integrator.integrate(&mut net, &adapter, &[t], 0.0, 10.0);
        assert!(net.place(net.place_idx("p").unwrap()).tokens >= 0);
    }

    #[test]
    fn reset_clears_tracked_state() {
        let (mut net, t) = constant_rate_net(2.0);
        let adapter = ModelAdapter::new();
        let mut integrator = Integrator::new();
        integrator.integrate(&mut net, &adapter, &[t], 0.0, 0.1);
        integrator.reset();
        assert!(integrator.exact.is_empty());
    }
}
