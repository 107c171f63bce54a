//! Carbon-impact estimation over nested daily rollups.
//!
//! Avoided emissions come from recycled mass: the weight sent to
//! `Reciclagem` is distributed across materials using the client's own
//! gravimetric composition when one exists (methodology "own study"),
//! otherwise the national default ("national average"), and each material
//! fraction is multiplied by its avoided-emission factor. Direct emissions
//! follow the disposal pathways: reject to landfill, organic to landfill
//! (what was neither composted nor biomethanized), composting, and
//! biomethanization.
//!
//! `net = direct − avoided`; a non-positive net is classified "avoided", a
//! positive one "emitted". A missing emissions configuration degrades to an
//! explicit insufficient-data result instead of erroring.

use crate::rollup::round2;
use common::model::client::ClientEntry;
use common::model::emissions::EmissionsConfig;
use common::model::impact::{
    DailyImpactPoint, ImpactClassification, ImpactSummary, Methodology,
};
use common::model::rollup::NestedRollup;
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// Destination receiving recycled mass.
pub const DEST_RECYCLING: &str = "Reciclagem";
/// Destination receiving composted organic mass.
pub const DEST_COMPOSTING: &str = "Compostagem";
/// Destination receiving biomethanized organic mass.
pub const DEST_BIOMETHANIZATION: &str = "Biometanização";
/// Waste type counted as organic mass.
pub const TYPE_ORGANIC: &str = "Orgânico";
/// Waste type counted as landfill reject.
pub const TYPE_REJECT: &str = "Rejeito";

struct RawImpact {
    avoided: f64,
    direct: f64,
    own_study_used: bool,
}

/// Unrounded figures for one set of nested documents. Shared by
/// [`impact`] and [`evolution`] so both report identical physics.
fn raw_impact(
    docs: &[&NestedRollup],
    clients_by_id: &HashMap<String, ClientEntry>,
    config: &EmissionsConfig,
) -> RawImpact {
    let mut avoided = 0.0;
    let mut direct = 0.0;
    let mut own_study_used = false;

    for doc in docs {
        // Avoided: recycled mass spread over the applicable composition.
        let recycled = doc.destination_kg(DEST_RECYCLING);
        if recycled > 0.0 {
            let has_own_study = clients_by_id
                .get(&doc.client_id)
                .map(|c| c.has_custom_composition)
                .unwrap_or(false);
            let (composition, overridden) = if has_own_study {
                config.composition_for(&doc.client_id)
            } else {
                (&config.national_composition, false)
            };
            own_study_used |= overridden;
            for (material, percent) in composition {
                let factor = config.avoided_factors.get(material).copied().unwrap_or(0.0);
                avoided += recycled * percent / 100.0 * factor;
            }
        }

        // Direct: one term per disposal pathway.
        let factors = &config.direct_factors;
        let reject = doc.waste_type_kg(TYPE_REJECT);
        let organic = doc.waste_type_kg(TYPE_ORGANIC);
        let composted = doc.destination_kg(DEST_COMPOSTING);
        let biomethanized = doc.destination_kg(DEST_BIOMETHANIZATION);
        // Organic that escaped both recovery pathways goes to landfill;
        // clamped because rollups may attribute composted mass to other
        // waste types.
        let landfill_organic = (organic - composted - biomethanized).max(0.0);

        direct += reject * factors.landfill_reject
            + landfill_organic * factors.landfill_organic
            + composted * factors.composting
            + biomethanized * factors.biomethanization;
    }

    RawImpact {
        avoided,
        direct,
        own_study_used,
    }
}

/// Aggregate carbon figures for a set of nested daily documents.
pub fn impact(
    docs: &[NestedRollup],
    clients_by_id: &HashMap<String, ClientEntry>,
    config: Option<&EmissionsConfig>,
) -> ImpactSummary {
    let Some(config) = config else {
        debug!("no emissions configuration available, reporting insufficient data");
        return ImpactSummary::insufficient_data();
    };

    let refs: Vec<&NestedRollup> = docs.iter().collect();
    let raw = raw_impact(&refs, clients_by_id, config);
    let net = raw.direct - raw.avoided;

    ImpactSummary {
        net_impact: round2(net),
        total_avoided: round2(raw.avoided),
        total_direct: round2(raw.direct),
        methodology: if raw.own_study_used {
            Methodology::OwnStudy
        } else {
            Methodology::NationalAverage
        },
        classification: if net > 0.0 {
            ImpactClassification::Emitted
        } else {
            ImpactClassification::Avoided
        },
    }
}

/// The cumulative net-impact time series: one point per calendar day,
/// chronological, each carrying the running sum of net impact up to and
/// including that day. Without an emissions configuration the series is
/// empty for the same reason [`impact`] reports insufficient data.
pub fn evolution(
    docs: &[NestedRollup],
    clients_by_id: &HashMap<String, ClientEntry>,
    config: Option<&EmissionsConfig>,
) -> Vec<DailyImpactPoint> {
    let Some(config) = config else {
        return Vec::new();
    };

    // Daily document ids are day keys (`YYYY-MM-DD`); monthly ids cannot be
    // placed on a day axis and are skipped.
    let mut by_day: BTreeMap<String, Vec<&NestedRollup>> = BTreeMap::new();
    for doc in docs {
        if doc.id.len() != 10 {
            debug!("evolution: skipping non-daily rollup id {}", doc.id);
            continue;
        }
        by_day.entry(doc.id.clone()).or_default().push(doc);
    }

    let mut running = 0.0;
    by_day
        .into_iter()
        .map(|(date, day_docs)| {
            let raw = raw_impact(&day_docs, clients_by_id, config);
            running += raw.direct - raw.avoided;
            DailyImpactPoint {
                date,
                net_impact: round2(running),
            }
        })
        .collect()
}
