//! Error types for world construction and stepping.

use thiserror::Error;

use super::handle::{BodyHandle, JointHandle, ShapeHandle};

/// Errors reported synchronously by [`World`](super::World) operations.
///
/// A construction call that fails never creates the entity.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    /// Body definition could not be turned into a body (non-finite mass,
    /// bad shape geometry, and so on).
    #[error("invalid body: {reason}")]
    InvalidBody {
        /// What was wrong with the definition.
        reason: String,
    },

    /// Joint definition is unusable.
    #[error("invalid joint: {reason}")]
    InvalidJoint {
        /// What was wrong with the definition.
        reason: String,
    },

    /// A body left the finite range after integration.
    #[error("numerical instability: body {body} has a non-finite state")]
    NumericalInstability {
        /// The offending body.
        body: BodyHandle,
    },

    /// Handle does not name a live body.
    #[error("unknown body: {0}")]
    UnknownBody(BodyHandle),

    /// Handle does not name a live shape.
    #[error("unknown shape: {0}")]
    UnknownShape(ShapeHandle),

    /// Handle does not name a live joint.
    #[error("unknown joint: {0}")]
    UnknownJoint(JointHandle),
}

impl PhysicsError {
    pub(crate) fn invalid_body(reason: impl Into<String>) -> Self {
        Self::InvalidBody {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_joint(reason: impl Into<String>) -> Self {
        Self::InvalidJoint {
            reason: reason.into(),
        }
    }
}

/// Result alias for physics operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PhysicsError::invalid_body("mass is NaN");
        assert_eq!(err.to_string(), "invalid body: mass is NaN");

        let err = PhysicsError::UnknownBody(BodyHandle::from_raw(7));
        assert_eq!(err.to_string(), "unknown body: Body(7)");
    }
}
