//! Rollup document shapes.
//!
//! The server-side aggregation process maintains one rollup per (client, day)
//! and per (client, month). Those documents are stored *path-flattened*: a
//! mapping from dotted key paths to numbers, e.g.
//!
//! ```text
//! totalKg                                          -> 181.5
//! byWasteType.Orgânico.totalKg                     -> 120.0
//! byWasteType.Orgânico.byWasteSubType.Pré.totalKg  -> 80.0
//! byArea.Cozinha.byWasteType.Orgânico.totalKg      -> 120.0
//! byDestination.Compostagem.totalKg                -> 120.0
//! ```
//!
//! The key sets under `byWasteType`, `byArea` and `byDestination` are
//! data-driven (whatever types, areas and destinations the client's contract
//! names), so the nested form models them as maps rather than fixed structs.
//! A missing branch always means zero contribution, never an error.
//!
//! This crate treats rollups as read-only; nothing in the pipeline ever
//! writes one back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A path-flattened rollup document as read from the remote store.
///
/// `id` encodes the period: `YYYY-MM-DD` for daily documents, `YYYY-MM` for
/// monthly ones. `fields` holds the dotted-path mapping verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupDocument {
    pub id: String,
    pub client_id: String,
    pub fields: Map<String, Value>,
}

impl RollupDocument {
    /// Whether the document carries the nested breakdown structure.
    ///
    /// Older documents predate the per-type/area/destination breakdowns and
    /// only hold `totalKg`; those must be re-derived from raw records.
    pub fn has_breakdowns(&self) -> bool {
        self.fields.keys().any(|k| {
            k.starts_with("byWasteType.")
                || k.starts_with("byArea.")
                || k.starts_with("byDestination.")
        })
    }
}

/// The unflattened (nested) form of a rollup document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NestedRollup {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    pub total_kg: f64,
    pub by_waste_type: BTreeMap<String, WasteTypeNode>,
    pub by_area: BTreeMap<String, AreaNode>,
    pub by_destination: BTreeMap<String, DestinationNode>,
}

/// Totals for one waste type, with optional sub-type detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WasteTypeNode {
    pub total_kg: f64,
    pub by_waste_sub_type: BTreeMap<String, SubTypeNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubTypeNode {
    pub total_kg: f64,
}

/// Totals for one area, broken down again by waste type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AreaNode {
    pub total_kg: f64,
    pub by_waste_type: BTreeMap<String, WasteTypeNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DestinationNode {
    pub total_kg: f64,
}

impl NestedRollup {
    /// Whether this document carries any breakdown branch. Mirrors
    /// [`RollupDocument::has_breakdowns`] on the nested form.
    pub fn has_breakdowns(&self) -> bool {
        !self.by_waste_type.is_empty()
            || !self.by_area.is_empty()
            || !self.by_destination.is_empty()
    }

    /// Weight recorded under a destination, zero when absent.
    pub fn destination_kg(&self, destination: &str) -> f64 {
        self.by_destination
            .get(destination)
            .map(|d| d.total_kg)
            .unwrap_or(0.0)
    }

    /// Weight recorded under a waste type, zero when absent.
    pub fn waste_type_kg(&self, waste_type: &str) -> f64 {
        self.by_waste_type
            .get(waste_type)
            .map(|t| t.total_kg)
            .unwrap_or(0.0)
    }
}
