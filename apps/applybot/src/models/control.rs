use serde::{Deserialize, Serialize};

/// Flags written by the control surface. Missing keys read as `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlState {
    pub stop: bool,
    pub pause: bool,
    /// Search without the location filter.
    pub alternate_mode: bool,
}
