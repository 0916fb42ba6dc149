// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Engine configuration
//!
//! [`CsgConfig`] carries the classification tolerance, the BSP build step cap,
//! parallelism switches and the background optimizer settings. Every field has
//! a default, so a TOML file only needs to name the values it changes:
//!
//! ```
//! use bsp_csg::CsgConfig;
//!
//! let config = CsgConfig::from_toml_str("epsilon = 0.0001\n[optimizer]\nenabled = false\n").unwrap();
//! assert_eq!(config.epsilon, 0.0001);
//! assert!(!config.optimizer.enabled);
//! assert_eq!(config.max_build_steps, 10_000);
//! ```

use crate::error::{CsgError, CsgResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default plane classification tolerance.
pub const DEFAULT_EPSILON: f64 = 1e-3;

/// Default cap on BSP build work items.
pub const DEFAULT_MAX_BUILD_STEPS: usize = 10_000;

/// What to do when BSP construction reaches `max_build_steps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildLimitPolicy {
    /// Log a warning and keep the partially built tree.
    #[default]
    Truncate,
    /// Abort the operation with [`CsgError::BuildLimitExceeded`].
    Fail,
}

/// Settings for the background mesh optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Whether compiled results schedule optimizer passes when drawn.
    pub enabled: bool,
    /// Seed of the heuristic picker.
    pub seed: u64,
    /// Passes a heuristic sits out after it found nothing to do.
    pub cooldown: u32,
    /// Vertices closer than this are merged before the first pass.
    pub weld_tolerance: f64,
    /// Distance under which a vertex counts as lying on an edge.
    pub edge_epsilon: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed: 12_345_678,
            cooldown: 1000,
            weld_tolerance: 1e-6,
            edge_epsilon: 1e-6,
        }
    }
}

/// Configuration for boolean operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsgConfig {
    /// Tolerance for point-on-plane classification.
    pub epsilon: f64,
    /// Maximum number of work items processed while building one BSP tree.
    pub max_build_steps: usize,
    /// Behavior when `max_build_steps` is reached.
    pub build_limit: BuildLimitPolicy,
    /// Fan work out to the rayon pool.
    pub parallel: bool,
    /// Number of sibling nodes clipped concurrently by `clip_to`.
    pub clip_batch: usize,
    /// Background optimizer settings.
    pub optimizer: OptimizerConfig,
}

impl Default for CsgConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            max_build_steps: DEFAULT_MAX_BUILD_STEPS,
            build_limit: BuildLimitPolicy::default(),
            parallel: true,
            clip_batch: 3,
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl CsgConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> CsgResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> CsgResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CsgError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> CsgResult<()> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(CsgError::InvalidConfig(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        if self.max_build_steps == 0 {
            return Err(CsgError::InvalidConfig(
                "max_build_steps must be at least 1".into(),
            ));
        }
        if !self.optimizer.weld_tolerance.is_finite() || self.optimizer.weld_tolerance < 0.0 {
            return Err(CsgError::InvalidConfig(format!(
                "optimizer.weld_tolerance must be non-negative, got {}",
                self.optimizer.weld_tolerance
            )));
        }
        if !self.optimizer.edge_epsilon.is_finite() || self.optimizer.edge_epsilon <= 0.0 {
            return Err(CsgError::InvalidConfig(format!(
                "optimizer.edge_epsilon must be positive, got {}",
                self.optimizer.edge_epsilon
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon.abs();
        self
    }

    #[must_use]
    pub fn with_max_build_steps(mut self, steps: usize) -> Self {
        self.max_build_steps = steps.max(1);
        self
    }

    #[must_use]
    pub fn with_build_limit(mut self, policy: BuildLimitPolicy) -> Self {
        self.build_limit = policy;
        self
    }

    /// Enable or disable rayon fan-out. Results are identical either way.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn with_clip_batch(mut self, batch: usize) -> Self {
        self.clip_batch = batch.max(1);
        self
    }

    #[must_use]
    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CsgConfig::default();
        assert_eq!(config.epsilon, 1e-3);
        assert_eq!(config.max_build_steps, 10_000);
        assert_eq!(config.build_limit, BuildLimitPolicy::Truncate);
        assert_eq!(config.clip_batch, 3);
        assert!(config.parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = CsgConfig::default()
            .with_epsilon(-1e-4)
            .with_max_build_steps(0)
            .with_clip_batch(0)
            .with_parallel(false)
            .with_build_limit(BuildLimitPolicy::Fail);

        assert_eq!(config.epsilon, 1e-4);
        assert_eq!(config.max_build_steps, 1);
        assert_eq!(config.clip_batch, 1);
        assert!(!config.parallel);
        assert_eq!(config.build_limit, BuildLimitPolicy::Fail);
    }

    #[test]
    fn test_toml_partial_override() {
        let config = CsgConfig::from_toml_str(
            "build_limit = \"fail\"\nmax_build_steps = 50\n[optimizer]\nseed = 7\n",
        )
        .unwrap();
        assert_eq!(config.build_limit, BuildLimitPolicy::Fail);
        assert_eq!(config.max_build_steps, 50);
        assert_eq!(config.optimizer.seed, 7);
        assert_eq!(config.optimizer.cooldown, 1000);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(matches!(
            CsgConfig::from_toml_str("epsilon = 0.0"),
            Err(CsgError::InvalidConfig(_))
        ));
        assert!(matches!(
            CsgConfig::from_toml_str("max_build_steps = 0"),
            Err(CsgError::InvalidConfig(_))
        ));
        assert!(matches!(
            CsgConfig::from_toml_str("epsilon = \"x\""),
            Err(CsgError::Config(_))
        ));
    }
}
