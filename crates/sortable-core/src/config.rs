#![forbid(unsafe_code)]

//! Controller configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default elevation shadow blur (layout pixels) applied to a lifted block.
pub const DEFAULT_LIFT_SHADOW_BLUR: u16 = 20;

/// What the placeholder does when the dragged block sits below every other
/// block in the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailPolicy {
    /// Move the placeholder to the end of the flow.
    #[default]
    Append,
    /// Keep the placeholder at its prior slot for that sample.
    Hold,
}

/// Drag controller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderConfig {
    /// Placeholder behavior past the last block.
    pub tail_policy: TailPolicy,
    /// Shadow blur radius of the drag emphasis.
    pub lift_shadow_blur: u16,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            tail_policy: TailPolicy::Append,
            lift_shadow_blur: DEFAULT_LIFT_SHADOW_BLUR,
        }
    }
}

impl ReorderConfig {
    /// Set the tail policy.
    #[must_use]
    pub const fn with_tail_policy(mut self, tail_policy: TailPolicy) -> Self {
        self.tail_policy = tail_policy;
        self
    }

    /// Set the lift shadow blur radius.
    #[must_use]
    pub const fn with_lift_shadow_blur(mut self, blur: u16) -> Self {
        self.lift_shadow_blur = blur;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lift_shadow_blur == 0 {
            return Err(ConfigError::InvalidShadowBlur {
                blur: self.lift_shadow_blur,
            });
        }
        Ok(())
    }
}
