//! # Noise Composer Error Types
//!
//! Errors are narrow: evaluation itself never fails, a graph with missing
//! operands simply contributes zero where the operand is absent.

use thiserror::Error;

/// Errors that can occur while wiring or configuring a noise graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NoiseError {
    /// An operand slot outside `[0, arity)` was addressed.
    #[error("invalid operand index {index} for node of arity {arity}")]
    InvalidIndex {
        /// The rejected slot index.
        index: usize,
        /// Number of slots the node has.
        arity: usize,
    },

    /// A rescaler sampling step that is not a positive finite number.
    #[error("invalid sampling step {0}: must be finite and greater than zero")]
    InvalidStep(f64),

    /// A rescaler grid with more samples per axis than a sweep will take.
    #[error("rescaler grid of range {range} and step {step} is too dense")]
    GridTooDense {
        /// Grid extent.
        range: f64,
        /// Sample stride.
        step: f64,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for noise graph operations.
pub type NoiseResult<T> = Result<T, NoiseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_index_message() {
        let err = NoiseError::InvalidIndex { index: 3, arity: 2 };
        assert_eq!(
            err.to_string(),
            "invalid operand index 3 for node of arity 2"
        );
    }
}
