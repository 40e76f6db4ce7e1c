#![forbid(unsafe_code)]

//! Error taxonomy for surface and controller operations.
//!
//! Two families matter to callers:
//! - **Precondition violations** ([`ReorderError::is_precondition_violation`]):
//!   the call was made in the wrong state. Nothing was mutated.
//! - **Invariant breaches** ([`ReorderError::is_invariant_breach`]): collaborator
//!   state was not what the controller maintains. The surface is left in a
//!   consistent ordering, never half-moved.

use thiserror::Error;

use crate::block::BlockId;
use crate::geometry::{Point, Size};

pub type Result<T> = std::result::Result<T, ReorderError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderError {
    #[error("a drag session is already active on block {active}")]
    SessionActive { active: BlockId },

    #[error("no drag session is active")]
    NoActiveSession,

    #[error("signal targets block {got} but the active session drags block {expected}")]
    BlockMismatch { expected: BlockId, got: BlockId },

    #[error("block {block} is not a member of the surface")]
    UnknownBlock { block: BlockId },

    #[error("no block under pointer at {point}")]
    NoBlockAtPoint { point: Point },

    #[error("placeholder is absent from the surface")]
    PlaceholderMissing,

    #[error("surface already holds a placeholder")]
    PlaceholderPresent,

    #[error("factory would reuse label {next}; surface already holds block {highest}")]
    StaleFactory { next: BlockId, highest: BlockId },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ReorderError {
    /// The call was made in a state that does not admit it.
    #[must_use]
    pub const fn is_precondition_violation(&self) -> bool {
        matches!(
            self,
            Self::SessionActive { .. }
                | Self::NoActiveSession
                | Self::BlockMismatch { .. }
                | Self::NoBlockAtPoint { .. }
                | Self::StaleFactory { .. }
        )
    }

    /// Surface state disagrees with what the controller maintains.
    #[must_use]
    pub const fn is_invariant_breach(&self) -> bool {
        matches!(
            self,
            Self::UnknownBlock { .. } | Self::PlaceholderMissing | Self::PlaceholderPresent
        )
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("lift shadow blur must be > 0 (got {blur})")]
    InvalidShadowBlur { blur: u16 },

    #[error("stack gap must be >= 0 (got {gap})")]
    NegativeGap { gap: i32 },

    #[error("block size must be positive on both axes (got {size})")]
    InvalidBlockSize { size: Size },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_is_disjoint() {
        let all = [
            ReorderError::SessionActive {
                active: BlockId::new(1),
            },
            ReorderError::NoActiveSession,
            ReorderError::BlockMismatch {
                expected: BlockId::new(1),
                got: BlockId::new(2),
            },
            ReorderError::UnknownBlock {
                block: BlockId::new(9),
            },
            ReorderError::NoBlockAtPoint {
                point: Point::new(0, 0),
            },
            ReorderError::PlaceholderMissing,
            ReorderError::PlaceholderPresent,
            ReorderError::StaleFactory {
                next: BlockId::new(0),
                highest: BlockId::new(2),
            },
            ReorderError::Config(ConfigError::NegativeGap { gap: -1 }),
        ];
        for error in &all {
            assert!(!(error.is_precondition_violation() && error.is_invariant_breach()));
        }
    }

    #[test]
    fn messages_name_the_blocks() {
        let error = ReorderError::BlockMismatch {
            expected: BlockId::new(1),
            got: BlockId::new(2),
        };
        assert_eq!(
            error.to_string(),
            "signal targets block 2 but the active session drags block 1"
        );
        let config: ReorderError = ConfigError::InvalidShadowBlur { blur: 0 }.into();
        assert_eq!(config.to_string(), "lift shadow blur must be > 0 (got 0)");
    }
}
