//! Arc entity connecting exactly one place and one transition.

use super::net::{PlaceIdx, TransIdx};
use serde::{Deserialize, Serialize};

/// Arc predicate kind. Only meaningful on input (place → transition) arcs;
/// output arcs are always produced unconditionally and are modeled as
/// `Normal` for uniformity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcKind {
    /// Consumes/produces `weight` tokens; predicate `tokens ≥ weight` on input.
    Normal,
    /// Disables the transition when `tokens ≥ weight`; never consumes.
    Inhibitor,
    /// Requires `tokens ≥ weight` but consumes nothing (catalyst/regulator).
    Test,
}

/// Which way an arc flows relative to its transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArcDirection {
    /// Place → transition (an input arc).
    Input,
    /// Transition → place (an output arc).
    Output,
}

/// Rendering-only geometry, invisible to the kernel beyond round-tripping
/// through persistence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Curved (vs. straight) rendering.
    pub is_curved: bool,
    /// Control-point X offset for curved rendering.
    pub control_offset_x: f64,
    /// Control-point Y offset for curved rendering.
    pub control_offset_y: f64,
}

/// An arc: a direct, typed reference between one place and one transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    /// Stable, unique identifier.
    pub id: String,
    /// Referenced place, by arena index.
    pub place: PlaceIdx,
    /// Referenced transition, by arena index.
    pub transition: TransIdx,
    /// Flow direction relative to the transition.
    pub direction: ArcDirection,
    /// Stoichiometric weight (`>= 1`).
    pub weight: u64,
    /// Predicate kind.
    pub kind: ArcKind,
    /// Optional rendering geometry.
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

impl Arc {
    /// `true` for input (place → transition) arcs.
    pub fn is_input(&self) -> bool {
        matches!(self.direction, ArcDirection::Input)
    }

    /// `true` for output (transition → place) arcs.
    pub fn is_output(&self) -> bool {
        matches!(self.direction, ArcDirection::Output)
    }
}
