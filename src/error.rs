// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for the CSG engine

use thiserror::Error;

/// Errors that can occur while building solids or running boolean operations.
#[derive(Debug, Error)]
pub enum CsgError {
    /// A polygon was constructed from too few vertices.
    #[error("degenerate polygon: {vertices} vertices, at least 3 required")]
    DegeneratePolygon { vertices: usize },

    /// BSP construction hit the configured step cap under `BuildLimitPolicy::Fail`.
    #[error("BSP build exceeded {limit} steps with {pending} work items pending")]
    BuildLimitExceeded { limit: usize, pending: usize },

    /// A concurrent subtask of a boolean operation panicked.
    #[error("{operation} failed in a worker task: {message}")]
    TaskFailed {
        operation: &'static str,
        message: String,
    },

    /// Configuration values out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration text could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The optimizer worker thread could not be started.
    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

/// Result type for CSG operations.
pub type CsgResult<T> = Result<T, CsgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CsgError::DegeneratePolygon { vertices: 2 };
        assert_eq!(
            err.to_string(),
            "degenerate polygon: 2 vertices, at least 3 required"
        );

        let err = CsgError::TaskFailed {
            operation: "union",
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "union failed in a worker task: boom");
    }
}
