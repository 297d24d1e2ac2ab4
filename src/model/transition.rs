//! Transition entity and its four kind-specific parameter blocks.

use serde::{Deserialize, Serialize};

/// Firing semantics a transition can implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Fires as soon as enabled; no temporal delay.
    Immediate,
    /// Fires within an `[earliest, latest]` window after enablement.
    Timed,
    /// Fires after an exponentially-distributed delay.
    Stochastic,
    /// Contributes continuous flow via RK4 integration, never "fires" discretely.
    Continuous,
}

/// Tie-breaking / ordering hint applied within a chosen concurrent set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FiringPolicy {
    /// Prefer the earliest edge of a timed window; self-schedule precisely.
    Earliest,
    /// Prefer the latest edge of a timed window; force-fire at expiry.
    Latest,
    /// Order by descending `priority`.
    Priority,
    /// First transition whose temporal predicate becomes true wins.
    Race,
    /// Order by ascending `enablement_time` (oldest first).
    Age,
    /// Uniform random order.
    Random,
    /// Immediate transitions preempt timed, which preempt stochastic.
    PreemptivePriority,
}

/// Parameters for a `timed` transition: `earliest α ≥ 0`, `latest β ≥ α`
/// (`β = f64::INFINITY` models an unbounded upper window edge).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedParams {
    /// α — earliest offset from enablement at which the transition may fire.
    pub earliest: f64,
    /// β — latest offset from enablement by which the transition must fire.
    pub latest: f64,
}

/// Parameters for a `stochastic` transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticParams {
    /// λ, the exponential rate parameter (`> 0`).
    pub rate: f64,
    /// Upper bound on tokens produced by a single firing event.
    #[serde(default)]
    pub max_burst: Option<u64>,
}

/// Parameters for a `continuous` transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousParams {
    /// Rate expression, evaluated against the current marking and time.
    pub rate_expr: String,
    /// Lower clamp on the evaluated rate.
    pub min_rate: f64,
    /// Upper clamp on the evaluated rate.
    pub max_rate: f64,
}

/// Kind-specific parameter block, discriminated by [`TransitionKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionParams {
    /// No parameters.
    Immediate,
    /// See [`TimedParams`].
    Timed(TimedParams),
    /// See [`StochasticParams`].
    Stochastic(StochasticParams),
    /// See [`ContinuousParams`].
    Continuous(ContinuousParams),
}

impl TransitionParams {
    /// The [`TransitionKind`] this parameter block implements.
    pub fn kind(&self) -> TransitionKind {
        match self {
            TransitionParams::Immediate => TransitionKind::Immediate,
            TransitionParams::Timed(_) => TransitionKind::Timed,
            TransitionParams::Stochastic(_) => TransitionKind::Stochastic,
            TransitionParams::Continuous(_) => TransitionKind::Continuous,
        }
    }
}

/// A transition: the active node of the net, implementing one of four
/// firing semantics over its preset/postset/regulatory locality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Stable, unique, immutable identifier.
    pub id: String,
    /// Free-text label.
    pub label: String,
    /// Tie-breaking priority; higher wins under the `priority` policies.
    #[serde(default)]
    pub priority: i32,
    /// Within-set ordering hint.
    #[serde(default = "default_firing_policy")]
    pub firing_policy: FiringPolicy,
    /// May fire without consuming input tokens.
    #[serde(default)]
    pub is_source: bool,
    /// May fire without producing output tokens.
    #[serde(default)]
    pub is_sink: bool,
    /// Kind-specific parameters.
    pub params: TransitionParams,
}

fn default_firing_policy() -> FiringPolicy {
    FiringPolicy::Priority
}

impl Transition {
    /// Convenience constructor for an immediate transition.
    pub fn immediate(id: impl Into<String>, label: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            priority,
            firing_policy: FiringPolicy::Priority,
            is_source: false,
            is_sink: false,
            params: TransitionParams::Immediate,
        }
    }

    /// The transition's firing semantics.
    pub fn kind(&self) -> TransitionKind {
        self.params.kind()
    }

    /// Whether this transition participates in the discrete executor
    /// (everything except `continuous`).
    pub fn is_discrete(&self) -> bool {
        self.kind() != TransitionKind::Continuous
    }
}
