//! Kernel error taxonomy.
//!
//! Mirrors the failure categories from the error-handling design: structural
//! errors are fatal at construction time; everything a running simulation
//! can hit (rate-evaluation failures, commit rollbacks, observer panics) is
//! degraded in place and never propagated across a `step()` boundary.

use thiserror::Error;

/// Result alias for kernel construction-time operations.
///
/// Per-step operations never return `Result` — see [`KernelError`] docs —
/// this alias is used only by `Net`/`ModelDocument` construction and loading.
pub type KernelResult<T> = Result<T, KernelError>;

/// Errors the kernel can raise.
///
/// Only construction-time variants (model loading, net building) ever reach
/// a caller as an `Err`. Runtime failures (rate evaluation, commit rollback,
/// observer panics) are represented here too so they can be logged and
/// classified, but the kernel itself never returns them from `step()`; it
/// stores the most recent one on the controller for host inspection instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    /// An arc referenced a place id that does not exist in the net.
    #[error("arc {arc_id} references unresolved place id {place_id}")]
    UnresolvedPlace {
        /// Arc identifier.
        arc_id: String,
        /// Place id that could not be resolved.
        place_id: String,
    },

    /// An arc referenced a transition id that does not exist in the net.
    #[error("arc {arc_id} references unresolved transition id {transition_id}")]
    UnresolvedTransition {
        /// Arc identifier.
        arc_id: String,
        /// Transition id that could not be resolved.
        transition_id: String,
    },

    /// An arc tried to connect two places or two transitions directly.
    #[error("arc {arc_id} has an invalid endpoint kind: {reason}")]
    InvalidArcEndpoint {
        /// Arc identifier.
        arc_id: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// Arc weight, or a kind-specific parameter, failed validation.
    #[error("invalid parameter on {object_id}: {reason}")]
    InvalidParameter {
        /// Id of the place/transition/arc that failed validation.
        object_id: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// A place, transition, or arc id was reused.
    #[error("duplicate id: {id}")]
    DuplicateId {
        /// The id that was already present.
        id: String,
    },

    /// A lifecycle operation (remove/transform) referenced an id that does
    /// not exist in the net, or no longer does.
    #[error("no such {kind} id: {id}")]
    UnknownId {
        /// `"place"`, `"transition"`, or `"arc"`.
        kind: &'static str,
        /// The id that could not be resolved.
        id: String,
    },

    /// Rate expression failed to parse at load time or on mutation.
    ///
    /// Not fatal: the owning behavior degrades to a constant-zero rate and
    /// the kernel continues; this variant exists so the degradation can be
    /// logged once with full context.
    #[error("rate expression on {transition_id} failed to parse: {reason}")]
    RateExpressionInvalid {
        /// Transition whose `rate_expr` failed to parse.
        transition_id: String,
        /// Parser error text.
        reason: String,
    },

    /// Rate evaluation produced NaN/Inf or otherwise failed mid-step.
    ///
    /// Not fatal: treated as `rate = 0.0` for the step that hit it.
    #[error("rate evaluation on {transition_id} failed: {reason}")]
    RateEvaluationFailed {
        /// Transition whose rate evaluation failed.
        transition_id: String,
        /// Explanation (e.g. "division by zero", "produced NaN").
        reason: String,
    },

    /// An atomic step failed validation or commit and was rolled back.
    ///
    /// Not fatal: the marking is restored to its pre-step snapshot and
    /// `step()` reports no discrete firing.
    #[error("atomic commit rolled back: {reason}")]
    CommitRolledBack {
        /// Explanation of what failed during validate/commit.
        reason: String,
    },

    /// A structural observer callback panicked or returned an error.
    ///
    /// Not fatal: isolated to the offending observer, others still run.
    #[error("observer callback failed: {reason}")]
    ObserverFailed {
        /// Explanation captured from the panic/error.
        reason: String,
    },

    /// Failed to read or parse a model document from disk.
    #[error("failed to load model: {0}")]
    Load(String),

    /// Failed to read or parse a configuration source.
    #[error("failed to load configuration: {0}")]
    Config(String),
}

impl From<std::io::Error> for KernelError {
    fn from(err: std::io::Error) -> Self {
        KernelError::Load(err.to_string())
    }
}

impl From<serde_json::Error> for KernelError {
    fn from(err: serde_json::Error) -> Self {
        KernelError::Load(format!("JSON parse error: {err}"))
    }
}

/// Severity classification, used for log-level selection and host diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Cannot continue; raised only at construction time.
    Critical,
    /// A step-level failure was handled (rolled back / degraded) but should
    /// be surfaced to an operator.
    Error,
    /// Expected, self-healing condition (e.g. a late timed transition).
    Warning,
    /// Informational.
    Info,
}

impl KernelError {
    /// Classify this error for logging/diagnostics.
    pub fn severity(&self) -> Severity {
        match self {
            KernelError::UnresolvedPlace { .. }
            | KernelError::UnresolvedTransition { .. }
            | KernelError::InvalidArcEndpoint { .. }
            | KernelError::InvalidParameter { .. }
            | KernelError::DuplicateId { .. }
            | KernelError::UnknownId { .. }
            | KernelError::Load(_) => Severity::Critical,
            KernelError::CommitRolledBack { .. } | KernelError::ObserverFailed { .. } => {
                Severity::Error
            }
            KernelError::RateExpressionInvalid { .. } | KernelError::RateEvaluationFailed { .. } => {
                Severity::Warning
            }
            KernelError::Config(_) => Severity::Error,
        }
    }

    /// Whether a running simulation may continue past this error.
    ///
    /// Construction-time errors (`UnresolvedPlace`, `InvalidParameter`, ...)
    /// are never recoverable; they abort loading before a `Controller`
    /// exists. Everything that can occur mid-run degrades gracefully.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KernelError::RateExpressionInvalid { .. }
                | KernelError::RateEvaluationFailed { .. }
                | KernelError::CommitRolledBack { .. }
                | KernelError::ObserverFailed { .. }
        )
    }
}
