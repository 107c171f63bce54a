use serde::{Deserialize, Serialize};

/// Which composition table produced the avoided-emissions figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Methodology {
    /// National default gravimetric composition.
    NationalAverage,
    /// At least one client's own composition study was applied.
    OwnStudy,
    /// No emissions configuration was available for the reference year.
    InsufficientData,
}

/// Sign of the net figure: non-positive nets are a net benefit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImpactClassification {
    Avoided,
    Emitted,
}

/// Aggregate carbon figures for a set of daily rollups, in kg CO₂e.
///
/// `total_avoided` is reported as a positive magnitude; it enters
/// `net_impact` negated, so `net_impact = direct − avoided`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactSummary {
    pub net_impact: f64,
    pub total_avoided: f64,
    pub total_direct: f64,
    pub methodology: Methodology,
    pub classification: ImpactClassification,
}

impl ImpactSummary {
    /// The degraded result used when no emissions configuration exists for
    /// the requested year. All figures are zero; the methodology makes the
    /// state explicit so the presentation layer can say so.
    pub fn insufficient_data() -> Self {
        ImpactSummary {
            net_impact: 0.0,
            total_avoided: 0.0,
            total_direct: 0.0,
            methodology: Methodology::InsufficientData,
            classification: ImpactClassification::Avoided,
        }
    }
}

/// One point of the cumulative net-impact time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyImpactPoint {
    /// Day key, `YYYY-MM-DD`.
    pub date: String,
    /// Running sum of net impact up to and including this day, kg CO₂e.
    pub net_impact: f64,
}
