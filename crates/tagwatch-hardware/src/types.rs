//! Common types shared across hardware device implementations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Indicator LEDs on the appliance.
///
/// The panel has one red and one green LED; `Off` means neither is lit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedColor {
    /// Both LEDs off.
    Off,

    /// Red LED (access denied).
    Red,

    /// Green LED (access granted).
    Green,
}

impl LedColor {
    /// Lowercase name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Red => "red",
            Self::Green => "green",
        }
    }
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
