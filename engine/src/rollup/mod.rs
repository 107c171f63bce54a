//! Rollup unflattening and aggregation.
//!
//! [`unflatten`] turns the dot-path documents the server maintains back into
//! nested trees; [`aggregate`] folds many nested documents into the
//! chart-ready breakdowns. [`synthesize_from_records`] builds an equivalent
//! nested document straight from raw measurements, which is how the resolver
//! serves live months and legacy rollups that predate the breakdown schema.

pub mod aggregate;
pub mod unflatten;

pub use aggregate::{
    aggregate_by_area, aggregate_by_destination, aggregate_by_type, aggregate_monthly,
    is_disposal, round2,
};
pub use unflatten::{flatten, nested_from_document, unflatten};

use crate::period::day_key_of_ms;
use common::model::record::MeasurementRecord;
use common::model::rollup::{AreaNode, NestedRollup, SubTypeNode, WasteTypeNode};
use std::collections::BTreeMap;

/// Fold raw measurements into the nested rollup shape.
///
/// Raw records carry no destination (destinations are assigned by the
/// server-side aggregation from the client's contract), so the
/// `by_destination` branch stays empty and contributes zero downstream.
pub fn synthesize_from_records(
    client_id: &str,
    period_id: &str,
    records: &[MeasurementRecord],
) -> NestedRollup {
    let mut rollup = NestedRollup {
        id: period_id.to_string(),
        client_id: client_id.to_string(),
        ..NestedRollup::default()
    };

    for record in records {
        let kg = record.weight_kg;
        rollup.total_kg += kg;

        let type_node = rollup
            .by_waste_type
            .entry(record.waste_type.clone())
            .or_insert_with(WasteTypeNode::default);
        type_node.total_kg += kg;
        if let Some(sub) = &record.waste_sub_type {
            type_node
                .by_waste_sub_type
                .entry(sub.clone())
                .or_insert_with(SubTypeNode::default)
                .total_kg += kg;
        }

        let area_node = rollup
            .by_area
            .entry(record.area.clone())
            .or_insert_with(AreaNode::default);
        area_node.total_kg += kg;
        area_node
            .by_waste_type
            .entry(record.waste_type.clone())
            .or_insert_with(WasteTypeNode::default)
            .total_kg += kg;
    }

    rollup
}

/// Fold raw measurements into one nested document per calendar day,
/// chronological, ids keyed `YYYY-MM-DD`. Day-axis consumers (the cumulative
/// carbon series) need per-day ids, which a single month-keyed document
/// cannot provide.
pub fn synthesize_daily_from_records(
    client_id: &str,
    records: &[MeasurementRecord],
) -> Vec<NestedRollup> {
    let mut by_day: BTreeMap<String, Vec<MeasurementRecord>> = BTreeMap::new();
    for record in records {
        by_day
            .entry(day_key_of_ms(record.created_at_ms))
            .or_default()
            .push(record.clone());
    }
    by_day
        .into_iter()
        .map(|(day, day_records)| synthesize_from_records(client_id, &day, &day_records))
        .collect()
}
