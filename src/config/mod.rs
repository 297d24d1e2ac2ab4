//! Simulation configuration.
//!
//! Host-tunable knobs the kernel itself leaves open: default step size,
//! run limits, the idle window that terminates a `run()`, and the default
//! conflict-resolution strategy. Loaded from a TOML file and overridable by
//! `KERNEL_*` environment variables, the way a host embeds this kernel.

use crate::error::{KernelError, KernelResult};
use crate::selection::ConflictPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Loads and validates [`SimulationConfig`] from a file or the environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> KernelResult<SimulationConfig> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn load_from_str(content: &str) -> KernelResult<SimulationConfig> {
        let config: SimulationConfig =
            toml::from_str(content).map_err(|e| KernelError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the default configuration, then apply `KERNEL_*` overrides.
    pub fn load_from_env() -> KernelResult<SimulationConfig> {
        let mut config = SimulationConfig::default();

        if let Ok(val) = std::env::var("KERNEL_DEFAULT_DT") {
            config.default_dt = val
                .parse()
                .map_err(|_| KernelError::Config(format!("invalid KERNEL_DEFAULT_DT: {val}")))?;
        }
        if let Ok(val) = std::env::var("KERNEL_IDLE_WINDOW_STEPS") {
            config.idle_window_steps = val.parse().map_err(|_| {
                KernelError::Config(format!("invalid KERNEL_IDLE_WINDOW_STEPS: {val}"))
            })?;
        }
        if let Ok(val) = std::env::var("KERNEL_CONFLICT_POLICY") {
            config.default_conflict_policy = parse_policy(&val)?;
        }
        if let Ok(val) = std::env::var("KERNEL_RNG_SEED") {
            config.rng_seed = Some(
                val.parse()
                    .map_err(|_| KernelError::Config(format!("invalid KERNEL_RNG_SEED: {val}")))?,
            );
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_policy(val: &str) -> KernelResult<ConflictPolicy> {
    match val {
        "largest" => Ok(ConflictPolicy::Largest),
        "priority" => Ok(ConflictPolicy::Priority),
        "random" => Ok(ConflictPolicy::Random),
        "first" => Ok(ConflictPolicy::First),
        other => Err(KernelError::Config(format!(
            "unknown conflict policy: {other}"
        ))),
    }
}

/// Upper bound on enumerated maximal independent sets (§4.4). Not
/// configurable — the specification fixes this at 5 — exposed read-only so
/// hosts can size their own data structures accordingly.
pub const MAX_CONFLICT_SETS: usize = 5;

/// Simulation-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Step size used by `run()` when the caller does not override it.
    pub default_dt: f64,
    /// Default cap on `run()` iterations (`None` = unbounded).
    pub max_steps: Option<u64>,
    /// Consecutive no-op steps (`step()` returning `false`) after which
    /// `run()` treats the simulation as terminal.
    pub idle_window_steps: u32,
    /// Strategy used to pick among enumerated maximal independent sets.
    pub default_conflict_policy: ConflictPolicy,
    /// Seed for the stochastic-transition RNG. `None` draws fresh entropy.
    pub rng_seed: Option<u64>,
}

impl SimulationConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> KernelResult<()> {
        if !(self.default_dt.is_finite() && self.default_dt > 0.0) {
            return Err(KernelError::Config(format!(
                "default_dt must be a positive finite number, got {}",
                self.default_dt
            )));
        }
        if self.idle_window_steps == 0 {
            return Err(KernelError::Config(
                "idle_window_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_dt: 0.1,
            max_steps: None,
            idle_window_steps: 16,
            default_conflict_policy: ConflictPolicy::Priority,
            rng_seed: None,
        }
    }
}
