//! Emission-factor configuration, versioned by reference year.
//!
//! One configuration document exists per reference year. Compositions are
//! gravimetric percentage breakdowns of recycled mass by material; they are
//! expected to sum to 100 but the calculator never relies on that. Avoided
//! factors are kg CO₂-equivalent avoided per kg of recycled material; direct
//! factors are kg CO₂-equivalent emitted per kg sent down a disposal pathway.
//!
//! The configuration is read-only to the pipeline. A missing document for the
//! requested year degrades the carbon calculator to an explicit
//! "insufficient data" result, never an error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Direct-emission factors keyed by disposal pathway (kg CO₂e per kg).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DirectFactors {
    /// Non-organic reject mass sent to landfill.
    pub landfill_reject: f64,
    /// Organic mass that was neither composted nor biomethanized.
    pub landfill_organic: f64,
    pub composting: f64,
    pub biomethanization: f64,
}

/// The full emissions configuration for one reference year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmissionsConfig {
    pub reference_year: i32,
    /// National default gravimetric composition: material → percent.
    pub national_composition: BTreeMap<String, f64>,
    /// Per-client override compositions: client id → (material → percent).
    pub client_compositions: BTreeMap<String, BTreeMap<String, f64>>,
    /// Avoided-emission factors: material → kg CO₂e per kg recycled.
    pub avoided_factors: BTreeMap<String, f64>,
    pub direct_factors: DirectFactors,
}

impl EmissionsConfig {
    /// The composition applicable to `client_id`: the client's own study when
    /// one exists, otherwise the national default. The boolean is true when
    /// an override was used.
    pub fn composition_for(&self, client_id: &str) -> (&BTreeMap<String, f64>, bool) {
        match self.client_compositions.get(client_id) {
            Some(own) => (own, true),
            None => (&self.national_composition, false),
        }
    }
}
