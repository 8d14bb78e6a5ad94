// Inbound client commands and static host identity

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientAction {
    Start,
    Stop,
}

/// `{action, part?, timer?}` text frame from a streaming client.
/// Anything that fails to parse is ignored, so all fields are lenient.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientCommand {
    pub action: ClientAction,
    #[serde(default)]
    pub part: Option<String>,
    /// Requested cadence in seconds; clamped server-side.
    #[serde(default)]
    pub timer: Option<u64>,
}

/// Static system identity; fetched once at startup and exposed via GET /api/info.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostInfo {
    pub os_family: String,
    pub os_version: String,
    pub host_name: String,
    pub processor_name: String,
}
