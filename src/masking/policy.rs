//! Masking policy per configuration scope.
//!
//! # State Machine
//! ```text
//! Unset ──merge(parent)──▶ parent's resolved value
//! On / Off ──merge(_)────▶ unchanged
//! root Unset ──resolve──▶ Off
//! ```
//!
//! Merging happens once when the scope tree is compiled; requests only read
//! the resolved `MaskingPolicy`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Value of the `removeip` directive at one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Toggle {
    #[default]
    Unset,
    On,
    Off,
}

impl Toggle {
    /// Parse a directive argument. Anything but `"on"` means off.
    pub fn from_directive(value: &str) -> Self {
        if value == "on" {
            Toggle::On
        } else {
            Toggle::Off
        }
    }

    /// Compose this (child) value with the parent's merged value.
    pub fn merge(self, parent: Toggle) -> Toggle {
        match self {
            Toggle::Unset => parent,
            explicit => explicit,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Toggle::Unset)
    }
}

impl<'de> Deserialize<'de> for Toggle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Toggle::from_directive(&value))
    }
}

impl Serialize for Toggle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Toggle::On => serializer.serialize_str("on"),
            Toggle::Off | Toggle::Unset => serializer.serialize_str("off"),
        }
    }
}

/// Resolved masking decision for one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaskingPolicy {
    enabled: bool,
}

impl MaskingPolicy {
    pub const DISABLED: MaskingPolicy = MaskingPolicy { enabled: false };

    /// Resolve a fully merged toggle. Unset at this point means nothing was
    /// configured anywhere up the chain, which is off.
    pub fn from_merged(toggle: Toggle) -> Self {
        Self {
            enabled: matches!(toggle, Toggle::On),
        }
    }

    /// Merge a chain of scopes ordered root first.
    pub fn resolve(chain: &[Toggle]) -> Self {
        let merged = chain
            .iter()
            .fold(Toggle::Unset, |parent, child| child.merge(parent));
        Self::from_merged(merged)
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }
}
