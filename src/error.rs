//! Simulation error types.
//!
//! Configuration mistakes (non-positive radii, cooldowns, durations) and
//! malformed checkpoint records are rejected at construction time through
//! these types instead of being silently tolerated. Numeric degeneracies at
//! runtime (zero-length normals and the like) are handled locally with
//! defined fallbacks and never surface here.

use std::fmt;

/// Top-level error enum for the drift-arena simulation core.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// A body was constructed with a radius that is not strictly positive
    /// (or not finite).
    InvalidRadius {
        /// The rejected value.
        value: f32,
    },

    /// An ability was configured with a non-positive cooldown.
    InvalidCooldown {
        /// The rejected value.
        value: f32,
    },

    /// An ability was configured with a negative active duration.
    InvalidDuration {
        /// The rejected value.
        value: f32,
    },

    /// A tuning value is outside its safe operating range.
    InvalidTuning {
        /// Name of the field (for logging).
        name: &'static str,
        /// The rejected value.
        value: f32,
    },

    /// A tuning document could not be parsed.
    MalformedTuning {
        /// Human-readable description of what was wrong.
        reason: &'static str,
    },

    /// A checkpoint record failed validation on restore.
    MalformedCheckpoint {
        /// Human-readable description of what was wrong.
        reason: &'static str,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::InvalidRadius { value } => {
                write!(f, "body radius must be strictly positive, got {}", value)
            }
            SimError::InvalidCooldown { value } => {
                write!(f, "ability cooldown must be strictly positive, got {}", value)
            }
            SimError::InvalidDuration { value } => {
                write!(f, "ability duration must be non-negative, got {}", value)
            }
            SimError::InvalidTuning { name, value } => {
                write!(f, "tuning value '{}' out of range: {}", name, value)
            }
            SimError::MalformedTuning { reason } => {
                write!(f, "malformed tuning document: {}", reason)
            }
            SimError::MalformedCheckpoint { reason } => {
                write!(f, "malformed checkpoint record: {}", reason)
            }
        }
    }
}

impl std::error::Error for SimError {}
