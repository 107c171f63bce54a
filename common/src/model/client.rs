use serde::{Deserialize, Serialize};

/// Read-only catalog entry for one client site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEntry {
    pub id: String,
    pub name: String,
    /// Whether the current month should be served from a live record
    /// subscription instead of precomputed rollups.
    #[serde(default)]
    pub live_dashboard: bool,
    /// Whether the client supplied its own gravimetric composition study.
    #[serde(default)]
    pub has_custom_composition: bool,
}
