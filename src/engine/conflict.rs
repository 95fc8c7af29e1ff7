use crate::model::{CanonicalFact, FactCluster, FactType};

use super::values::normalize_categorical;

pub const DEFAULT_CONFLICT_TOLERANCE: f64 = 0.02;

/// Denominator floor so that comparisons against zero stay finite.
pub const RELATIVE_DIFFERENCE_EPSILON: f64 = 1e-9;

pub fn relative_difference(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs()).max(RELATIVE_DIFFERENCE_EPSILON);
    (a - b).abs() / scale
}

/// Sets `has_conflict` and `conflict_description` on every cluster and
/// returns how many clusters conflict. Runs once all observations are known.
pub fn annotate_conflicts(clusters: &mut [FactCluster], tolerance: f64) -> usize {
    let mut conflicting = 0usize;
    for cluster in clusters.iter_mut() {
        let description = describe_conflict(&cluster.observations, tolerance);
        cluster.has_conflict = description.is_some();
        cluster.conflict_description = description;
        if cluster.has_conflict {
            conflicting += 1;
        }
    }
    conflicting
}

pub fn describe_conflict(observations: &[CanonicalFact], tolerance: f64) -> Option<String> {
    let parts = [
        numeric_conflict(observations, tolerance),
        categorical_conflict(observations),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<String>>();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

/// Pairwise comparison so the verdict does not depend on member order.
fn numeric_conflict(observations: &[CanonicalFact], tolerance: f64) -> Option<String> {
    let members = observations
        .iter()
        .filter(|fact| fact.fact_type == FactType::Quantity && !fact.normalization_failed)
        .filter_map(|fact| fact.value_normalized.map(|value| (fact, value)))
        .collect::<Vec<(&CanonicalFact, f64)>>();

    if members.len() < 2 {
        return None;
    }

    let mut flagged = vec![false; members.len()];
    let mut max_difference = 0.0_f64;
    for left in 0..members.len() {
        for right in (left + 1)..members.len() {
            let difference = relative_difference(members[left].1, members[right].1);
            if difference > tolerance {
                flagged[left] = true;
                flagged[right] = true;
                max_difference = max_difference.max(difference);
            }
        }
    }

    if !flagged.iter().any(|value| *value) {
        return None;
    }

    let cited = members
        .iter()
        .zip(flagged.iter())
        .filter(|(_, flagged)| **flagged)
        .map(|((fact, _), _)| cite(fact))
        .collect::<Vec<String>>();

    Some(format!(
        "conflicting values {}; max relative difference {:.2}% exceeds tolerance {:.2}%",
        cited.join(", "),
        max_difference * 100.0,
        tolerance * 100.0
    ))
}

fn categorical_conflict(observations: &[CanonicalFact]) -> Option<String> {
    let mut distinct = Vec::<(String, &CanonicalFact)>::new();
    for fact in observations
        .iter()
        .filter(|fact| fact.fact_type == FactType::Categorical)
    {
        let key = normalize_categorical(&fact.value_raw);
        if !distinct.iter().any(|(existing, _)| *existing == key) {
            distinct.push((key, fact));
        }
    }

    if distinct.len() < 2 {
        return None;
    }

    let cited = distinct
        .iter()
        .map(|(_, fact)| cite(fact))
        .collect::<Vec<String>>();
    Some(format!("conflicting categorical values {}", cited.join(", ")))
}

fn cite(fact: &CanonicalFact) -> String {
    let value = fact.value_raw.trim();
    match fact
        .unit_raw
        .as_deref()
        .map(str::trim)
        .filter(|unit| !unit.is_empty())
    {
        Some(unit) => format!("{value} {unit} (p.{})", fact.page),
        None => format!("{value} (p.{})", fact.page),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::ParameterContext;

    fn quantity(value: f64, page: u32) -> CanonicalFact {
        CanonicalFact {
            name: "workforce".to_string(),
            fact_type: FactType::Quantity,
            value_raw: format!("{value}"),
            value_num: Some(value),
            unit_raw: None,
            evidence: String::new(),
            page,
            context: ParameterContext::Workforce,
            value_normalized: Some(value),
            unit_normalized: Some("count".to_string()),
            normalization_failed: false,
            issues: Vec::new(),
        }
    }

    fn categorical(value: &str, page: u32) -> CanonicalFact {
        CanonicalFact {
            fact_type: FactType::Categorical,
            value_raw: value.to_string(),
            value_num: None,
            value_normalized: None,
            unit_normalized: None,
            ..quantity(0.0, page)
        }
    }

    #[test]
    fn relative_difference_uses_larger_magnitude() {
        assert_eq!(relative_difference(500.0, 650.0), 150.0 / 650.0);
        assert_eq!(relative_difference(0.0, 0.0), 0.0);
        assert!(relative_difference(0.0, 1.0) > 0.99);
    }

    #[test]
    fn tolerance_boundary_is_exclusive() {
        let at_threshold = vec![quantity(98.0, 1), quantity(100.0, 2)];
        assert_eq!(relative_difference(98.0, 100.0), 0.02);
        assert!(describe_conflict(&at_threshold, 0.02).is_none());

        let above = vec![quantity(97.99, 1), quantity(100.0, 2)];
        assert!(describe_conflict(&above, 0.02).is_some());
    }

    #[test]
    fn single_value_never_conflicts() {
        assert!(describe_conflict(&[quantity(5.0, 1)], 0.0).is_none());
    }

    #[test]
    fn failed_normalizations_are_ignored() {
        let mut failed = quantity(9_000.0, 7);
        failed.value_normalized = None;
        failed.unit_normalized = None;
        failed.normalization_failed = true;

        let observations = vec![quantity(500.0, 2), failed];
        assert!(describe_conflict(&observations, 0.02).is_none());
    }

    #[test]
    fn verdict_is_independent_of_member_order() {
        // Anchoring on the first value would miss 100 vs 103 when 101.5 comes first.
        let ordered = vec![quantity(101.5, 1), quantity(100.0, 2), quantity(103.0, 3)];
        let description = describe_conflict(&ordered, 0.02).expect("100 vs 103 conflicts");
        assert!(description.contains("100 (p.2)"));
        assert!(description.contains("103 (p.3)"));
        assert!(!description.contains("101.5"));
    }

    #[test]
    fn description_cites_values_and_pages() {
        let observations = vec![quantity(500.0, 2), quantity(650.0, 80)];
        let description = describe_conflict(&observations, 0.02).expect("conflict");
        assert_eq!(
            description,
            "conflicting values 500 (p.2), 650 (p.80); max relative difference 23.08% exceeds tolerance 2.00%"
        );
    }

    #[test]
    fn categorical_values_conflict_on_distinct_text() {
        let same = vec![categorical("Open pit", 1), categorical("open  pit", 4)];
        assert!(describe_conflict(&same, 0.02).is_none());

        let different = vec![categorical("Open pit", 1), categorical("Underground", 4)];
        assert_eq!(
            describe_conflict(&different, 0.02).as_deref(),
            Some("conflicting categorical values Open pit (p.1), Underground (p.4)")
        );
    }

    #[test]
    fn annotate_sets_cluster_fields() {
        let mut clusters = vec![FactCluster {
            signature: "workforce::workforce".to_string(),
            context: ParameterContext::Workforce,
            name: "workforce".to_string(),
            fact_type: FactType::Quantity,
            observations: vec![quantity(500.0, 2), quantity(650.0, 80)],
            occurrence_count: 2,
            has_conflict: false,
            conflict_description: None,
            unit_mixing: None,
        }];

        assert_eq!(annotate_conflicts(&mut clusters, 0.5), 0);
        assert!(!clusters[0].has_conflict);
        assert_eq!(annotate_conflicts(&mut clusters, 0.02), 1);
        assert!(clusters[0].has_conflict);
    }
}
