use crate::model::{FactCluster, UnitMixing, UnitUsage};

use super::context::ParameterContext;
use super::units::canonical_unit_key;

/// Flags clusters whose normalized members were reported in more than one
/// unit notation. Independent of the conflict verdict.
pub fn annotate_unit_mixing(clusters: &mut [FactCluster]) -> usize {
    let mut flagged = 0usize;
    for cluster in clusters.iter_mut() {
        cluster.unit_mixing = detect_unit_mixing(cluster);
        if cluster.unit_mixing.is_some() {
            flagged += 1;
        }
    }
    flagged
}

pub fn detect_unit_mixing(cluster: &FactCluster) -> Option<UnitMixing> {
    if cluster.context == ParameterContext::Uncategorized || cluster.observations.len() < 2 {
        return None;
    }

    let mut keys = Vec::<String>::new();
    let mut units = Vec::<UnitUsage>::new();
    let mut recommended_unit = None::<String>;

    for fact in &cluster.observations {
        if fact.normalization_failed {
            continue;
        }
        let Some(unit_normalized) = fact.unit_normalized.as_ref() else {
            continue;
        };
        // Unitless mentions carry no notation to compare.
        let Some(unit_raw) = fact
            .unit_raw
            .as_deref()
            .map(str::trim)
            .filter(|unit| !unit.is_empty())
        else {
            continue;
        };

        if recommended_unit.is_none() {
            recommended_unit = Some(unit_normalized.clone());
        }

        let key = canonical_unit_key(unit_raw);
        match keys.iter().position(|existing| *existing == key) {
            Some(index) => units[index].occurrences += 1,
            None => {
                keys.push(key);
                units.push(UnitUsage {
                    unit_raw: unit_raw.to_string(),
                    occurrences: 1,
                    example_evidence: fact.evidence.clone(),
                    example_page: fact.page,
                });
            }
        }
    }

    if units.len() < 2 {
        return None;
    }

    recommended_unit.map(|recommended_unit| UnitMixing {
        units,
        recommended_unit,
    })
}
