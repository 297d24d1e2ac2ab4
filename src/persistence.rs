//! Model persistence (§6): the serialized document schema, independent of
//! the in-memory arena representation, and the load/save conversions
//! between them. Geometry fields (`x`, `y`, `width`, `height`,
//! `horizontal`, arc curvature) are rendering-only and round-trip opaquely
//! — the kernel neither interprets nor needs them.

use crate::error::{KernelError, KernelResult};
use crate::model::{
    ArcDirection, ArcKind, ContinuousParams, FiringPolicy, Geometry, Net, Place, StochasticParams,
    TimedParams, Transition, TransitionParams,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaceRecord {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub tokens: u64,
    pub initial_marking: u64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionRecord {
    pub id: String,
    pub label: String,
    pub kind: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_firing_policy_str")]
    pub firing_policy: String,
    #[serde(default)]
    pub is_source: bool,
    #[serde(default)]
    pub is_sink: bool,
    pub earliest: Option<f64>,
    pub latest: Option<f64>,
    pub rate: Option<f64>,
    pub rate_function: Option<String>,
    pub max_burst: Option<u64>,
    pub min_rate: Option<f64>,
    pub max_rate: Option<f64>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub horizontal: bool,
}

fn default_firing_policy_str() -> String {
    "priority".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArcRecord {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub weight: u64,
    pub kind: String,
    #[serde(default)]
    pub is_curved: bool,
    #[serde(default)]
    pub control_offset_x: f64,
    #[serde(default)]
    pub control_offset_y: f64,
}

/// The serialized model: places, transitions, and arcs by id, mirroring
/// §6's external persistence schema exactly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelDocument {
    #[serde(default)]
    pub places: Vec<PlaceRecord>,
    #[serde(default)]
    pub transitions: Vec<TransitionRecord>,
    #[serde(default)]
    pub arcs: Vec<ArcRecord>,
}

impl ModelDocument {
    /// Parse a document from a JSON string.
    pub fn from_json(content: &str) -> KernelResult<Self> {
        serde_json::from_str(content).map_err(KernelError::from)
    }

    /// Load a document from a JSON file.
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> KernelResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Serialize this document as pretty-printed JSON.
    pub fn to_json(&self) -> KernelResult<String> {
        serde_json::to_string_pretty(self).map_err(KernelError::from)
    }

    /// Build the in-memory [`Net`], resolving arc endpoints by id. A
    /// missing endpoint is a fatal load error naming the arc and the
    /// unresolved id, matching the structural-error category in §7.
    pub fn into_model(self) -> KernelResult<Net> {
        let mut net = Net::new();

        for p in self.places {
            let place = Place {
                id: p.id,
                label: p.label,
                tokens: p.tokens,
                initial_marking: p.initial_marking,
                metadata: p.metadata,
            };
            net.add_place(place)?;
        }

        for t in self.transitions {
            let firing_policy = parse_firing_policy(&t.firing_policy)?;
            let params = build_params(&t)?;
            net.add_transition(Transition {
                id: t.id,
                label: t.label,
                priority: t.priority,
                firing_policy,
                is_source: t.is_source,
                is_sink: t.is_sink,
                params,
            })?;
        }

        for a in self.arcs {
            let kind = parse_arc_kind(&a.kind)?;
            let is_input = net
                .transition_idx(&a.target_id)
                .is_some();
            let direction = if is_input {
                ArcDirection::Input
            } else {
                ArcDirection::Output
            };
            let (place_id, transition_id) = if is_input {
                (a.source_id.as_str(), a.target_id.as_str())
            } else {
                (a.target_id.as_str(), a.source_id.as_str())
            };
            let geometry = if a.is_curved || a.control_offset_x != 0.0 || a.control_offset_y != 0.0
            {
                Some(Geometry {
                    is_curved: a.is_curved,
                    control_offset_x: a.control_offset_x,
                    control_offset_y: a.control_offset_y,
                })
            } else {
                None
            };
            net.add_arc(a.id, place_id, transition_id, direction, a.weight, kind, geometry)?;
        }

        Ok(net)
    }

    /// Serialize a [`Net`] back into a [`ModelDocument`]. Geometry not
    /// tracked by the kernel (place/transition position, size) is written
    /// as zero rather than invented.
    pub fn from_model(net: &Net) -> Self {
        let places = net
            .places()
            .map(|(_, p)| PlaceRecord {
                id: p.id.clone(),
                label: p.label.clone(),
                x: 0.0,
                y: 0.0,
                tokens: p.tokens,
                initial_marking: p.initial_marking,
                metadata: p.metadata.clone(),
            })
            .collect();

        let transitions = net
            .transitions()
            .map(|(_, t)| {
                let mut record = TransitionRecord {
                    id: t.id.clone(),
                    label: t.label.clone(),
                    kind: kind_str(&t.params).to_string(),
                    priority: t.priority,
                    firing_policy: firing_policy_str(t.firing_policy).to_string(),
                    is_source: t.is_source,
                    is_sink: t.is_sink,
                    earliest: None,
                    latest: None,
                    rate: None,
                    rate_function: None,
                    max_burst: None,
                    min_rate: None,
                    max_rate: None,
                    x: 0.0,
                    y: 0.0,
                    width: 0.0,
                    height: 0.0,
                    horizontal: false,
                };
                match &t.params {
                    TransitionParams::Immediate => {}
                    TransitionParams::Timed(p) => {
                        record.earliest = Some(p.earliest);
                        record.latest = Some(p.latest);
                    }
                    TransitionParams::Stochastic(p) => {
                        record.rate = Some(p.rate);
                        record.max_burst = p.max_burst;
                    }
                    TransitionParams::Continuous(p) => {
                        record.rate_function = Some(p.rate_expr.clone());
                        record.min_rate = Some(p.min_rate);
                        record.max_rate = Some(p.max_rate);
                    }
                }
                record
            })
            .collect();

        let arcs = net
            .arcs()
            .map(|a| {
                let (source_id, target_id) = match a.direction {
                    ArcDirection::Input => {
                        (net.place(a.place).id.clone(), net.transition(a.transition).id.clone())
                    }
                    ArcDirection::Output => {
                        (net.transition(a.transition).id.clone(), net.place(a.place).id.clone())
                    }
                };
                ArcRecord {
                    id: a.id.clone(),
                    source_id,
                    target_id,
                    weight: a.weight,
                    kind: arc_kind_str(a.kind).to_string(),
                    is_curved: a.geometry.map(|g| g.is_curved).unwrap_or(false),
                    control_offset_x: a.geometry.map(|g| g.control_offset_x).unwrap_or(0.0),
                    control_offset_y: a.geometry.map(|g| g.control_offset_y).unwrap_or(0.0),
                }
            })
            .collect();

        ModelDocument {
            places,
            transitions,
            arcs,
        }
    }
}

fn build_params(t: &TransitionRecord) -> KernelResult<TransitionParams> {
    match t.kind.as_str() {
        "immediate" => Ok(TransitionParams::Immediate),
        "timed" => Ok(TransitionParams::Timed(TimedParams {
            earliest: t.earliest.unwrap_or(0.0),
            latest: t.latest.unwrap_or(f64::INFINITY),
        })),
        "stochastic" => Ok(TransitionParams::Stochastic(StochasticParams {
            rate: t.rate.ok_or_else(|| KernelError::InvalidParameter {
                object_id: t.id.clone(),
                reason: "stochastic transition missing rate".to_string(),
            })?,
            max_burst: t.max_burst,
        })),
        "continuous" => Ok(TransitionParams::Continuous(ContinuousParams {
            rate_expr: t.rate_function.clone().unwrap_or_default(),
            min_rate: t.min_rate.unwrap_or(0.0),
            max_rate: t.max_rate.unwrap_or(f64::INFINITY),
        })),
        other => Err(KernelError::InvalidParameter {
            object_id: t.id.clone(),
            reason: format!("unknown transition kind: {other}"),
        }),
    }
}

fn kind_str(params: &TransitionParams) -> &'static str {
    match params {
        TransitionParams::Immediate => "immediate",
        TransitionParams::Timed(_) => "timed",
        TransitionParams::Stochastic(_) => "stochastic",
        TransitionParams::Continuous(_) => "continuous",
    }
}

fn parse_firing_policy(s: &str) -> KernelResult<FiringPolicy> {
    Ok(match s {
        "earliest" => FiringPolicy::Earliest,
        "latest" => FiringPolicy::Latest,
        "priority" => FiringPolicy::Priority,
        "race" => FiringPolicy::Race,
        "age" => FiringPolicy::Age,
        "random" => FiringPolicy::Random,
        "preemptive-priority" => FiringPolicy::PreemptivePriority,
        other => {
            return Err(KernelError::InvalidParameter {
                object_id: String::new(),
                reason: format!("unknown firing policy: {other}"),
            })
        }
    })
}

fn firing_policy_str(policy: FiringPolicy) -> &'static str {
    match policy {
        FiringPolicy::Earliest => "earliest",
        FiringPolicy::Latest => "latest",
        FiringPolicy::Priority => "priority",
        FiringPolicy::Race => "race",
        FiringPolicy::Age => "age",
        FiringPolicy::Random => "random",
        FiringPolicy::PreemptivePriority => "preemptive-priority",
    }
}

fn parse_arc_kind(s: &str) -> KernelResult<ArcKind> {
    Ok(match s {
        "normal" => ArcKind::Normal,
        "inhibitor" => ArcKind::Inhibitor,
        "test" => ArcKind::Test,
        other => {
            return Err(KernelError::InvalidParameter {
                object_id: String::new(),
                reason: format!("unknown arc kind: {other}"),
            })
        }
    })
}

fn arc_kind_str(kind: ArcKind) -> &'static str {
    match kind {
        ArcKind::Normal => "normal",
        ArcKind::Inhibitor => "inhibitor",
        ArcKind::Test => "test",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "places": [
                {"id": "p1", "label": "P1", "x": 0, "y": 0, "tokens": 1, "initial_marking": 1},
                {"id": "p2", "label": "P2", "x": 0, "y": 0, "tokens": 0, "initial_marking": 0}
            ],
            "transitions": [
                {"id": "t1", "label": "T1", "kind": "immediate", "priority": 5, "firing_policy": "priority", "x": 0, "y": 0, "width": 0, "height": 0}
            ],
            "arcs": [
                {"id": "a1", "source_id": "p1", "target_id": "t1", "weight": 1, "kind": "normal"},
                {"id": "a2", "source_id": "t1", "target_id": "p2", "weight": 1, "kind": "normal"}
            ]
        }"#
    }

    #[test]
    fn loads_a_document_into_a_net() {
        let doc = ModelDocument::from_json(sample_json()).unwrap();
        let net = doc.into_model().unwrap();
        assert_eq!(net.place_count(), 2);
        assert_eq!(net.transition_count(), 1);
    }

    #[test]
    fn missing_endpoint_is_a_load_error() {
        let mut doc = ModelDocument::from_json(sample_json()).unwrap();
        doc.arcs[0].source_id = "ghost".to_string();
        let err = doc.into_model().unwrap_err();
        assert!(matches!(err, KernelError::UnresolvedPlace { .. }));
    }

    #[test]
    fn round_trips_through_a_net() {
        let doc = ModelDocument::from_json(sample_json()).unwrap();
        let net = doc.into_model().unwrap();
        let doc2 = ModelDocument::from_model(&net);
        assert_eq!(doc2.places.len(), 2);
        assert_eq!(doc2.arcs.len(), 2);
        assert_eq!(doc2.arcs[0].source_id, "p1");
        assert_eq!(doc2.arcs[0].target_id, "t1");
    }

    #[test]
    fn numeric_looking_ids_are_preserved_as_strings() {
        let json = r#"{
            "places": [{"id": "1", "label": "P", "tokens": 0, "initial_marking": 0}],
            "transitions": [],
            "arcs": []
        }"#;
        let doc = ModelDocument::from_json(json).unwrap();
        assert_eq!(doc.places[0].id, "1");
    }
}
