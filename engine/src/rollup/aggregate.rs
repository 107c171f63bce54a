//! Folds nested rollup documents into chart-ready breakdowns.
//!
//! All sums run on the raw values; rounding to two decimal places happens
//! once, at the point of emission, so splitting a document set into parts
//! and merging the partial aggregates agrees with aggregating the whole set
//! within rounding. Missing branches contribute zero.

use common::model::breakdown::{
    AreaBreakdown, DestinationBreakdown, DestinationBucket, MonthlyPoint, NamedValue,
    TypeBreakdown,
};
use common::model::rollup::NestedRollup;
use std::collections::BTreeMap;

/// Destinations counted as disposal; every other destination is recovery.
pub const DISPOSAL_DESTINATIONS: [&str; 2] = ["Aterro Sanitário", "Incineração"];

pub fn is_disposal(destination: &str) -> bool {
    DISPOSAL_DESTINATIONS.contains(&destination)
}

/// Round to two decimal places. Applied only when a value is emitted.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Total per waste type with sub-type detail, largest first.
///
/// `translate` maps stored type names to display labels; two names
/// translating to the same label are summed together. Pass the identity
/// closure when no translation applies.
pub fn aggregate_by_type<F>(docs: &[NestedRollup], translate: F) -> Vec<TypeBreakdown>
where
    F: Fn(&str) -> String,
{
    let mut totals: BTreeMap<String, (f64, BTreeMap<String, f64>)> = BTreeMap::new();
    for doc in docs {
        for (name, node) in &doc.by_waste_type {
            let entry = totals.entry(translate(name)).or_default();
            entry.0 += node.total_kg;
            for (sub, sub_node) in &node.by_waste_sub_type {
                *entry.1.entry(sub.clone()).or_default() += sub_node.total_kg;
            }
        }
    }

    let mut rows: Vec<TypeBreakdown> = totals
        .into_iter()
        .map(|(name, (value, subs))| TypeBreakdown {
            name,
            value: round2(value),
            subtypes: subs
                .into_iter()
                .map(|(name, value)| NamedValue {
                    name,
                    value: round2(value),
                })
                .collect(),
        })
        .collect();
    sort_desc(&mut rows, |r| r.value);
    rows
}

/// Total per area with per-type detail, largest first.
pub fn aggregate_by_area(docs: &[NestedRollup]) -> Vec<AreaBreakdown> {
    let mut totals: BTreeMap<String, (f64, BTreeMap<String, f64>)> = BTreeMap::new();
    for doc in docs {
        for (area, node) in &doc.by_area {
            let entry = totals.entry(area.clone()).or_default();
            entry.0 += node.total_kg;
            for (ty, ty_node) in &node.by_waste_type {
                *entry.1.entry(ty.clone()).or_default() += ty_node.total_kg;
            }
        }
    }

    let mut rows: Vec<AreaBreakdown> = totals
        .into_iter()
        .map(|(name, (value, types))| AreaBreakdown {
            name,
            value: round2(value),
            types: types
                .into_iter()
                .map(|(name, value)| NamedValue {
                    name,
                    value: round2(value),
                })
                .collect(),
        })
        .collect();
    sort_desc(&mut rows, |r| r.value);
    rows
}

/// Per-destination totals plus the recovery/disposal split with each
/// bucket's percentage share of the combined total.
pub fn aggregate_by_destination(docs: &[NestedRollup]) -> DestinationBreakdown {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for doc in docs {
        for (dest, node) in &doc.by_destination {
            *totals.entry(dest.clone()).or_default() += node.total_kg;
        }
    }

    let mut recovery = 0.0;
    let mut disposal = 0.0;
    for (dest, kg) in &totals {
        if is_disposal(dest) {
            disposal += kg;
        } else {
            recovery += kg;
        }
    }
    let combined = recovery + disposal;
    let percent_of = |part: f64| {
        if combined > 0.0 {
            round2(part / combined * 100.0)
        } else {
            0.0
        }
    };

    let mut destinations: Vec<NamedValue> = totals
        .into_iter()
        .map(|(name, value)| NamedValue {
            name,
            value: round2(value),
        })
        .collect();
    sort_desc(&mut destinations, |r| r.value);

    DestinationBreakdown {
        destinations,
        recovery: DestinationBucket {
            value: round2(recovery),
            percent: percent_of(recovery),
        },
        disposal: DestinationBucket {
            value: round2(disposal),
            percent: percent_of(disposal),
        },
    }
}

/// Total weight per month, chronological. The month is taken from the
/// document id (`YYYY-MM` or `YYYY-MM-DD`).
pub fn aggregate_monthly(docs: &[NestedRollup]) -> Vec<MonthlyPoint> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for doc in docs {
        // get() guards against ids where byte 7 is not a char boundary.
        let month = doc.id.get(..7).unwrap_or(&doc.id);
        *totals.entry(month.to_string()).or_default() += doc.total_kg;
    }
    totals
        .into_iter()
        .map(|(month, value)| MonthlyPoint {
            month,
            value: round2(value),
        })
        .collect()
}

fn sort_desc<T, F: Fn(&T) -> f64>(rows: &mut [T], key: F) {
    rows.sort_by(|a, b| {
        key(b)
            .partial_cmp(&key(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollup::unflatten::nested_from_document;
    use common::model::rollup::RollupDocument;
    use serde_json::{json, Map, Value};

    fn doc(id: &str, entries: &[(&str, f64)]) -> NestedRollup {
        let mut fields = Map::new();
        let mut total = 0.0;
        for (path, kg) in entries {
            fields.insert(path.to_string(), json!(kg));
            if path.starts_with("byWasteType.") && path.matches('.').count() == 2 {
                total += kg;
            }
        }
        fields.insert("totalKg".to_string(), Value::from(total));
        nested_from_document(&RollupDocument {
            id: id.to_string(),
            client_id: "c1".to_string(),
            fields,
        })
        .unwrap()
    }

    #[test]
    fn type_totals_sum_across_documents() {
        let docs = [
            doc(
                "2025-03-01",
                &[
                    ("byWasteType.Orgânico.totalKg", 10.0),
                    ("byWasteType.Orgânico.byWasteSubType.Sobras.totalKg", 4.0),
                    ("byWasteType.Rejeito.totalKg", 2.0),
                ],
            ),
            doc(
                "2025-03-02",
                &[
                    ("byWasteType.Orgânico.totalKg", 5.5),
                    ("byWasteType.Orgânico.byWasteSubType.Sobras.totalKg", 1.5),
                ],
            ),
        ];
        let rows = aggregate_by_type(&docs, |s| s.to_string());
        assert_eq!(rows[0].name, "Orgânico");
        assert_eq!(rows[0].value, 15.5);
        assert_eq!(rows[0].subtypes[0].name, "Sobras");
        assert_eq!(rows[0].subtypes[0].value, 5.5);
        assert_eq!(rows[1].name, "Rejeito");
        assert_eq!(rows[1].value, 2.0);
    }

    #[test]
    fn translation_merges_collapsed_names() {
        let docs = [doc(
            "2025-03-01",
            &[
                ("byWasteType.Orgânico.totalKg", 3.0),
                ("byWasteType.Organico.totalKg", 2.0),
            ],
        )];
        let rows = aggregate_by_type(&docs, |s| {
            if s == "Organico" { "Orgânico".to_string() } else { s.to_string() }
        });
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 5.0);
    }

    #[test]
    fn area_totals_keep_type_detail() {
        let docs = [
            doc(
                "2025-03-01",
                &[
                    ("byArea.Cozinha.totalKg", 12.0),
                    ("byArea.Cozinha.byWasteType.Orgânico.totalKg", 12.0),
                ],
            ),
            doc(
                "2025-03-02",
                &[
                    ("byArea.Cozinha.totalKg", 3.0),
                    ("byArea.Cozinha.byWasteType.Rejeito.totalKg", 3.0),
                    ("byArea.Recepção.totalKg", 1.0),
                ],
            ),
        ];
        let rows = aggregate_by_area(&docs);
        assert_eq!(rows[0].name, "Cozinha");
        assert_eq!(rows[0].value, 15.0);
        assert_eq!(rows[0].types.len(), 2);
        assert_eq!(rows[1].name, "Recepção");
    }

    #[test]
    fn destination_classification_matches_fixed_membership() {
        let docs = [doc(
            "2025-03-01",
            &[
                ("byDestination.Reciclagem.totalKg", 100.0),
                ("byDestination.Aterro Sanitário.totalKg", 50.0),
                ("byDestination.Incineração.totalKg", 25.0),
            ],
        )];
        let breakdown = aggregate_by_destination(&docs);
        assert_eq!(breakdown.recovery.value, 100.0);
        assert_eq!(breakdown.disposal.value, 75.0);
        assert_eq!(breakdown.disposal.percent, 42.86);
        assert_eq!(breakdown.recovery.percent, 57.14);
    }

    #[test]
    fn empty_destination_set_has_zero_percentages() {
        let breakdown = aggregate_by_destination(&[]);
        assert_eq!(breakdown.recovery.percent, 0.0);
        assert_eq!(breakdown.disposal.percent, 0.0);
        assert!(breakdown.destinations.is_empty());
    }

    #[test]
    fn aggregation_is_additive_across_partitions() {
        let docs: Vec<NestedRollup> = (0..10)
            .map(|i| {
                doc(
                    &format!("2025-03-{:02}", i + 1),
                    &[
                        ("byWasteType.Orgânico.totalKg", 0.1 + i as f64 * 1.7),
                        ("byWasteType.Rejeito.totalKg", 0.3 + i as f64 * 0.9),
                    ],
                )
            })
            .collect();

        let whole = aggregate_by_type(&docs, |s| s.to_string());
        let left = aggregate_by_type(&docs[..3], |s| s.to_string());
        let right = aggregate_by_type(&docs[3..], |s| s.to_string());

        for row in &whole {
            let partial: f64 = [&left, &right]
                .iter()
                .flat_map(|rows| rows.iter())
                .filter(|r| r.name == row.name)
                .map(|r| r.value)
                .sum();
            assert!(
                (row.value - partial).abs() <= 0.011,
                "{}: {} vs {}",
                row.name,
                row.value,
                partial
            );
        }
    }

    #[test]
    fn malformed_document_ids_group_without_panicking() {
        // Byte 7 of this id falls inside a multi-byte character.
        let docs = [
            doc("2025-0é", &[("byWasteType.Rejeito.totalKg", 1.0)]),
            doc("x", &[("byWasteType.Rejeito.totalKg", 2.0)]),
        ];
        let points = aggregate_monthly(&docs);
        assert_eq!(points.len(), 2);
        assert_eq!((points[0].month.as_str(), points[0].value), ("2025-0é", 1.0));
        assert_eq!((points[1].month.as_str(), points[1].value), ("x", 2.0));
    }

    #[test]
    fn monthly_series_groups_daily_ids_chronologically() {
        let docs = [
            doc("2025-04-02", &[("byWasteType.Rejeito.totalKg", 2.0)]),
            doc("2025-03-30", &[("byWasteType.Rejeito.totalKg", 1.0)]),
            doc("2025-03-05", &[("byWasteType.Rejeito.totalKg", 4.0)]),
        ];
        let points = aggregate_monthly(&docs);
        assert_eq!(points.len(), 2);
        assert_eq!((points[0].month.as_str(), points[0].value), ("2025-03", 5.0));
        assert_eq!((points[1].month.as_str(), points[1].value), ("2025-04", 2.0));
    }
}
