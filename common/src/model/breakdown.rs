use serde::{Deserialize, Serialize};

/// A generic (label, kilograms) pair used across breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: f64,
}

/// One waste type with its total and per-sub-type detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeBreakdown {
    pub name: String,
    pub value: f64,
    pub subtypes: Vec<NamedValue>,
}

/// One area with its total and per-waste-type detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaBreakdown {
    pub name: String,
    pub value: f64,
    pub types: Vec<NamedValue>,
}

/// Either side of the recovery/disposal split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationBucket {
    pub value: f64,
    /// Share of the combined total, in percent.
    pub percent: f64,
}

/// Full destination breakdown: every named destination plus the
/// recovery/disposal classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationBreakdown {
    pub destinations: Vec<NamedValue>,
    pub recovery: DestinationBucket,
    pub disposal: DestinationBucket,
}

/// One month's total, for the month-over-month series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    /// Month key, `YYYY-MM`.
    pub month: String,
    pub value: f64,
}
