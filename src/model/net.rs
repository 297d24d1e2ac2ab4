//! The net: arenas of places/transitions keyed by stable string id, plus
//! the arcs that reference them by index (object identity over id lookups,
//! per the kernel's design notes).

use super::arc::{Arc, ArcDirection, ArcKind};
use super::place::Place;
use super::transition::{Transition, TransitionKind};
use crate::error::{KernelError, KernelResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Arena index of a [`Place`]. Stable for the lifetime of the `Net`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaceIdx(pub usize);

/// Arena index of a [`Transition`]. Stable for the lifetime of the `Net`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransIdx(pub usize);

/// Arena index of an [`Arc`]. Stable for the lifetime of the `Net`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArcIdx(pub usize);

/// A non-fatal issue discovered while validating a net (§7 "Semantic"
/// errors): logged once at load time, does not block construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// Id of the transition the warning concerns.
    pub transition_id: String,
    /// Human-readable explanation.
    pub message: String,
}

/// The Petri net: places, transitions, and the arcs between them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Net {
    places: Vec<Place>,
    transitions: Vec<Transition>,
    arcs: Vec<Arc>,
    #[serde(skip)]
    place_ids: HashMap<String, PlaceIdx>,
    #[serde(skip)]
    transition_ids: HashMap<String, TransIdx>,
    /// Arena slots of deleted places. Left in place (never reused) so every
    /// index handed out before a deletion stays valid; tombstoned slots just
    /// drop out of [`Net::places`] and [`Net::place_idx`].
    #[serde(skip)]
    removed_places: HashSet<usize>,
    /// As `removed_places`, for transitions.
    #[serde(skip)]
    removed_transitions: HashSet<usize>,
}

impl Net {
    /// An empty net.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the id→index lookup tables. Must be called after
    /// deserializing a `Net` whose arenas were populated without going
    /// through [`Net::add_place`]/[`Net::add_transition`].
    pub fn reindex(&mut self) {
        self.place_ids = self
            .places
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), PlaceIdx(i)))
            .collect();
        self.transition_ids = self
            .transitions
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), TransIdx(i)))
            .collect();
    }

    /// Add a place, rejecting duplicate ids.
    pub fn add_place(&mut self, place: Place) -> KernelResult<PlaceIdx> {
        if self.place_ids.contains_key(&place.id) {
            return Err(KernelError::DuplicateId { id: place.id });
        }
        let idx = PlaceIdx(self.places.len());
        self.place_ids.insert(place.id.clone(), idx);
        self.places.push(place);
        Ok(idx)
    }

    /// Add a transition, rejecting duplicate ids.
    pub fn add_transition(&mut self, transition: Transition) -> KernelResult<TransIdx> {
        if self.transition_ids.contains_key(&transition.id) {
            return Err(KernelError::DuplicateId { id: transition.id });
        }
        let idx = TransIdx(self.transitions.len());
        self.transition_ids.insert(transition.id.clone(), idx);
        self.transitions.push(transition);
        Ok(idx)
    }

    /// Add an arc by place/transition id, resolving endpoints and
    /// validating structural invariants (weight, inhibitor/test direction).
    pub fn add_arc(
        &mut self,
        id: impl Into<String>,
        place_id: &str,
        transition_id: &str,
        direction: ArcDirection,
        weight: u64,
        kind: ArcKind,
        geometry: Option<super::arc::Geometry>,
    ) -> KernelResult<ArcIdx> {
        let id = id.into();
        let place = self
            .place_ids
            .get(place_id)
            .copied()
            .ok_or_else(|| KernelError::UnresolvedPlace {
                arc_id: id.clone(),
                place_id: place_id.to_string(),
            })?;
        let transition =
            self.transition_ids
                .get(transition_id)
                .copied()
                .ok_or_else(|| KernelError::UnresolvedTransition {
                    arc_id: id.clone(),
                    transition_id: transition_id.to_string(),
                })?;
        if weight < 1 {
            return Err(KernelError::InvalidParameter {
                object_id: id,
                reason: "arc weight must be >= 1".to_string(),
            });
        }
        if matches!(kind, ArcKind::Inhibitor | ArcKind::Test) && direction != ArcDirection::Input {
            return Err(KernelError::InvalidArcEndpoint {
                arc_id: id,
                reason: "inhibitor/test arcs must be input (place -> transition) arcs"
                    .to_string(),
            });
        }
        let idx = ArcIdx(self.arcs.len());
        self.arcs.push(Arc {
            id,
            place,
            transition,
            direction,
            weight,
            kind,
            geometry,
        });
        Ok(idx)
    }

    /// Validate semantic invariants that do not block construction but
    /// indicate a transition will never fire (§7 "Semantic" errors).
    pub fn validate_semantics(&self) -> Vec<LoadWarning> {
        let mut warnings = Vec::new();
        for (idx, t) in self.transitions() {
            let preset_empty = self.input_arcs(idx).next().is_none();
            let postset_empty = self.output_arcs(idx).next().is_none();
            let valid = if t.is_source {
                !postset_empty
            } else if t.is_sink {
                !preset_empty
            } else {
                !preset_empty && !postset_empty
            };
            if !valid {
                warnings.push(LoadWarning {
                    transition_id: t.id.clone(),
                    message: format!(
                        "transition {} has an empty locality under its source/sink flags and will never fire",
                        t.id
                    ),
                });
            }
        }
        warnings
    }

    /// Look up a place's index by id.
    pub fn place_idx(&self, id: &str) -> Option<PlaceIdx> {
        self.place_ids.get(id).copied()
    }

    /// Look up a transition's index by id.
    pub fn transition_idx(&self, id: &str) -> Option<TransIdx> {
        self.transition_ids.get(id).copied()
    }

    /// Immutable place access.
    pub fn place(&self, idx: PlaceIdx) -> &Place {
        &self.places[idx.0]
    }

    /// Mutable place access.
    pub fn place_mut(&mut self, idx: PlaceIdx) -> &mut Place {
        &mut self.places[idx.0]
    }

    /// Immutable transition access.
    pub fn transition(&self, idx: TransIdx) -> &Transition {
        &self.transitions[idx.0]
    }

    /// Mutable transition access.
    pub fn transition_mut(&mut self, idx: TransIdx) -> &mut Transition {
        &mut self.transitions[idx.0]
    }

    /// Immutable arc access.
    pub fn arc(&self, idx: ArcIdx) -> &Arc {
        &self.arcs[idx.0]
    }

    /// All places, in insertion order, excluding deleted ones.
    pub fn places(&self) -> impl Iterator<Item = (PlaceIdx, &Place)> {
        self.places
            .iter()
            .enumerate()
            .filter(move |(i, _)| !self.removed_places.contains(i))
            .map(|(i, p)| (PlaceIdx(i), p))
    }

    /// All transitions, in insertion order, excluding deleted ones.
    pub fn transitions(&self) -> impl Iterator<Item = (TransIdx, &Transition)> {
        self.transitions
            .iter()
            .enumerate()
            .filter(move |(i, _)| !self.removed_transitions.contains(i))
            .map(|(i, t)| (TransIdx(i), t))
    }

    /// Cascade-delete a place: every arc incident to it is removed first,
    /// then the place itself (§3 "Lifecycle"). The place's `PlaceIdx` is
    /// tombstoned rather than reused. Returns the ids of the arcs removed
    /// along with it. Errs if `id` does not name a live place.
    pub fn remove_place(&mut self, id: &str) -> KernelResult<Vec<String>> {
        let idx = self
            .place_ids
            .remove(id)
            .ok_or_else(|| KernelError::UnknownId {
                kind: "place",
                id: id.to_string(),
            })?;
        let removed_arcs: Vec<String> = self
            .arcs
            .iter()
            .filter(|a| a.place == idx)
            .map(|a| a.id.clone())
            .collect();
        self.arcs.retain(|a| a.place != idx);
        self.removed_places.insert(idx.0);
        Ok(removed_arcs)
    }

    /// Cascade-delete a transition: every arc incident to it is removed
    /// first, then the transition itself (§3 "Lifecycle"). The transition's
    /// `TransIdx` is tombstoned rather than reused. Returns the ids of the
    /// arcs removed along with it. Errs if `id` does not name a live
    /// transition.
    pub fn remove_transition(&mut self, id: &str) -> KernelResult<Vec<String>> {
        let idx = self
            .transition_ids
            .remove(id)
            .ok_or_else(|| KernelError::UnknownId {
                kind: "transition",
                id: id.to_string(),
            })?;
        let removed_arcs: Vec<String> = self
            .arcs
            .iter()
            .filter(|a| a.transition == idx)
            .map(|a| a.id.clone())
            .collect();
        self.arcs.retain(|a| a.transition != idx);
        self.removed_transitions.insert(idx.0);
        Ok(removed_arcs)
    }

    /// Remove a single arc by id without touching its endpoints.
    pub fn remove_arc(&mut self, id: &str) -> KernelResult<()> {
        let before = self.arcs.len();
        self.arcs.retain(|a| a.id != id);
        if self.arcs.len() == before {
            return Err(KernelError::UnknownId {
                kind: "arc",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// All arcs, in insertion order.
    pub fn arcs(&self) -> impl Iterator<Item = &Arc> {
        self.arcs.iter()
    }

    /// Input arcs (preset `•t`) of a transition.
    pub fn input_arcs(&self, t: TransIdx) -> impl Iterator<Item = &Arc> {
        self.arcs
            .iter()
            .filter(move |a| a.transition == t && a.is_input())
    }

    /// Output arcs (postset `t•`) of a transition.
    pub fn output_arcs(&self, t: TransIdx) -> impl Iterator<Item = &Arc> {
        self.arcs
            .iter()
            .filter(move |a| a.transition == t && a.is_output())
    }

    /// Restore every place's tokens to its `initial_marking`.
    pub fn reset(&mut self) {
        for p in &mut self.places {
            p.reset();
        }
    }

    /// Number of places.
    pub fn place_count(&self) -> usize {
        self.places.len()
    }

    /// Number of transitions.
    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// A snapshot of every place's token count, indexed parallel to the
    /// place arena. Used internally by the executor for fast rollback.
    pub fn snapshot_tokens(&self) -> Vec<u64> {
        self.places.iter().map(|p| p.tokens).collect()
    }

    /// Restore token counts from a snapshot taken via [`Net::snapshot_tokens`].
    pub fn restore_tokens(&mut self, snapshot: &[u64]) {
        debug_assert_eq!(snapshot.len(), self.places.len());
        for (p, &tokens) in self.places.iter_mut().zip(snapshot) {
            p.tokens = tokens;
        }
    }

    /// A host-facing marking snapshot keyed by place id. Deleted places are
    /// absent.
    pub fn marking(&self) -> HashMap<String, u64> {
        self.places().map(|(_, p)| (p.id.clone(), p.tokens)).collect()
    }

    /// Discrete transitions (everything but `continuous`), by index.
    pub fn discrete_transitions(&self) -> impl Iterator<Item = TransIdx> + '_ {
        self.transitions()
            .filter(|(_, t)| t.kind() != TransitionKind::Continuous)
            .map(|(idx, _)| idx)
    }

    /// Continuous transitions, by index.
    pub fn continuous_transitions(&self) -> impl Iterator<Item = TransIdx> + '_ {
        self.transitions()
            .filter(|(_, t)| t.kind() == TransitionKind::Continuous)
            .map(|(idx, _)| idx)
    }
}
