use std::collections::BTreeMap;

use crate::model::{CanonicalFact, FactCluster, FactType};

use super::signature::{build_signature, normalize_name};

/// Groups facts by signature. Members keep their input order; clusters are
/// returned sorted by signature so the output does not depend on which
/// signature happened to appear first.
pub fn cluster_facts(facts: Vec<CanonicalFact>, stoplist: &[String]) -> Vec<FactCluster> {
    let mut clusters = BTreeMap::<String, FactCluster>::new();

    for fact in facts {
        let signature = build_signature(fact.context, &fact.name, stoplist);
        let cluster = clusters
            .entry(signature.clone())
            .or_insert_with(|| FactCluster {
                signature,
                context: fact.context,
                name: normalize_name(&fact.name, stoplist),
                fact_type: FactType::Categorical,
                observations: Vec::new(),
                occurrence_count: 0,
                has_conflict: false,
                conflict_description: None,
                unit_mixing: None,
            });

        if fact.fact_type == FactType::Quantity {
            cluster.fact_type = FactType::Quantity;
        }
        cluster.observations.push(fact);
        cluster.occurrence_count = cluster.observations.len();
    }

    clusters.into_values().collect()
}
