// Shared Type Definitions
//
// The small vocabulary used across the detection engine.

use serde::{Deserialize, Serialize};

/// Platform audio routing mode at a point in time.
///
/// `Communication` means the device is routing audio for live two-way call
/// communication. `Other` doubles as the fallback when the underlying query
/// is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioMode {
    Normal,
    Communication,
    Other,
}

/// Which kind of call a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallChannel {
    Cellular,
    Voip,
}
