//! Emissions-configuration source.
//!
//! One configuration document exists per reference year; the carbon
//! calculator loads it once for the year it is asked about. Absence is not
//! an error: it degrades the calculator to an explicit insufficient-data
//! result, so the trait returns `Option` on the happy path.

use common::error::CoreError;
use common::model::emissions::EmissionsConfig;
use std::collections::HashMap;

#[allow(async_fn_in_trait)]
pub trait ConfigSource {
    async fn emissions_for_year(&self, year: i32)
        -> Result<Option<EmissionsConfig>, CoreError>;
}

/// Deserialize one year's configuration document.
pub fn parse_emissions_config(json: &str) -> Result<EmissionsConfig, CoreError> {
    Ok(serde_json::from_str(json)?)
}

/// A source backed by preloaded documents. Enough for tests and for
/// embedders that fetch the configuration set once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
    by_year: HashMap<i32, EmissionsConfig>,
}

impl StaticConfigSource {
    pub fn new(configs: Vec<EmissionsConfig>) -> Self {
        StaticConfigSource {
            by_year: configs.into_iter().map(|c| (c.reference_year, c)).collect(),
        }
    }
}

impl ConfigSource for StaticConfigSource {
    async fn emissions_for_year(
        &self,
        year: i32,
    ) -> Result<Option<EmissionsConfig>, CoreError> {
        Ok(self.by_year.get(&year).cloned())
    }
}
