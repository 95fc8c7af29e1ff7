use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::model::{
    AnalysisReport, AnalysisSummary, CanonicalFact, ContextClusterCount, DocumentChunk,
    FactCluster, FactIssue, FactObservation, FactType, GapReport,
};

use super::cluster::cluster_facts;
use super::conflict::annotate_conflicts;
use super::context::{ContextClassifier, ParameterContext};
use super::gaps::GapAnalyzer;
use super::unit_mixing::annotate_unit_mixing;
use super::units::UnitIndex;
use super::values::parse_magnitude;

/// Compiled configuration for one run. Holds no per-run state, so a single
/// value can serve concurrent runs.
#[derive(Debug, Clone)]
pub struct Engine {
    tolerance: f64,
    units: UnitIndex,
    classifier: ContextClassifier,
    gaps: GapAnalyzer,
    stoplist: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactStageCounts {
    pub normalization_failures: usize,
    pub malformed_values: usize,
    pub uncategorized_facts: usize,
    pub conflicting_clusters: usize,
    pub unit_mixing_clusters: usize,
}

impl Engine {
    pub(super) fn new(
        tolerance: f64,
        units: UnitIndex,
        classifier: ContextClassifier,
        gaps: GapAnalyzer,
        stoplist: Vec<String>,
    ) -> Self {
        Self {
            tolerance,
            units,
            classifier,
            gaps,
            stoplist,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Classify, parse and normalize one observation. Pure; safe to call
    /// from any number of threads.
    pub fn canonicalize(&self, observation: &FactObservation) -> CanonicalFact {
        let context = self
            .classifier
            .classify(&observation.name, &observation.evidence);
        let mut issues = Vec::new();

        let (fact_type, value_num) = match observation.fact_type {
            FactType::Categorical => (FactType::Categorical, observation.value_num),
            FactType::Quantity => {
                let parsed = observation
                    .value_num
                    .filter(|value| value.is_finite())
                    .or_else(|| parse_magnitude(&observation.value_raw));
                match parsed {
                    Some(value) => (FactType::Quantity, Some(value)),
                    None => {
                        debug!(
                            name = %observation.name,
                            value_raw = %observation.value_raw,
                            page = observation.page,
                            "quantity value is not numeric; treating as categorical"
                        );
                        issues.push(FactIssue::MalformedValue {
                            value_raw: observation.value_raw.clone(),
                        });
                        (FactType::Categorical, None)
                    }
                }
            }
        };

        let mut value_normalized = None;
        let mut unit_normalized = None;
        let mut normalization_failed = false;

        if let (FactType::Quantity, Some(value)) = (fact_type, value_num) {
            let family = self.classifier.unit_family(context);
            match self
                .units
                .normalize(value, observation.unit_raw.as_deref(), family)
            {
                Ok(normalized) => {
                    value_normalized = Some(normalized.value);
                    unit_normalized = Some(normalized.unit);
                }
                Err(reason) => {
                    debug!(
                        name = %observation.name,
                        context = %context,
                        page = observation.page,
                        reason = %reason,
                        "unit unresolved"
                    );
                    normalization_failed = true;
                    issues.push(FactIssue::UnitUnresolved { detail: reason });
                }
            }
        }

        CanonicalFact {
            name: observation.name.clone(),
            fact_type,
            value_raw: observation.value_raw.clone(),
            value_num,
            unit_raw: observation.unit_raw.clone(),
            evidence: observation.evidence.clone(),
            page: observation.page,
            context,
            value_normalized,
            unit_normalized,
            normalization_failed,
            issues,
        }
    }

    /// Parallel map over observations, then a single-threaded reduction
    /// that clusters and annotates with the full set in view.
    pub fn analyze_facts(&self, facts: &[FactObservation]) -> (Vec<FactCluster>, FactStageCounts) {
        let canonical = facts
            .par_iter()
            .map(|observation| self.canonicalize(observation))
            .collect::<Vec<CanonicalFact>>();

        let mut counts = FactStageCounts {
            normalization_failures: canonical
                .iter()
                .filter(|fact| fact.normalization_failed)
                .count(),
            malformed_values: canonical
                .iter()
                .filter(|fact| {
                    fact.issues
                        .iter()
                        .any(|issue| matches!(issue, FactIssue::MalformedValue { .. }))
                })
                .count(),
            uncategorized_facts: canonical
                .iter()
                .filter(|fact| fact.context == ParameterContext::Uncategorized)
                .count(),
            ..FactStageCounts::default()
        };

        info!(
            facts = canonical.len(),
            normalization_failures = counts.normalization_failures,
            malformed_values = counts.malformed_values,
            uncategorized = counts.uncategorized_facts,
            "canonicalized facts"
        );

        let mut clusters = cluster_facts(canonical, &self.stoplist);
        counts.conflicting_clusters = annotate_conflicts(&mut clusters, self.tolerance);
        counts.unit_mixing_clusters = annotate_unit_mixing(&mut clusters);

        info!(
            clusters = clusters.len(),
            conflicts = counts.conflicting_clusters,
            unit_mixing = counts.unit_mixing_clusters,
            tolerance = self.tolerance,
            "clustered facts"
        );

        (clusters, counts)
    }

    pub fn analyze_gaps(&self, chunks: &[DocumentChunk]) -> GapReport {
        self.gaps.analyze(chunks)
    }

    /// Full run. The gap scan does not depend on the fact pipeline and runs
    /// alongside it.
    pub fn run(&self, facts: &[FactObservation], chunks: &[DocumentChunk]) -> AnalysisReport {
        let ((clusters, counts), gap_report) = rayon::join(
            || self.analyze_facts(facts),
            || self.analyze_gaps(chunks),
        );

        let summary = summarize(facts.len(), chunks.len(), self.tolerance, &clusters, &counts);

        AnalysisReport {
            summary,
            clusters,
            gap_report,
        }
    }
}

fn summarize(
    fact_count: usize,
    chunk_count: usize,
    tolerance: f64,
    clusters: &[FactCluster],
    counts: &FactStageCounts,
) -> AnalysisSummary {
    let mut per_context = BTreeMap::<ParameterContext, (usize, usize)>::new();
    for cluster in clusters {
        let entry = per_context.entry(cluster.context).or_default();
        entry.0 += 1;
        entry.1 += cluster.occurrence_count;
    }

    AnalysisSummary {
        fact_count,
        chunk_count,
        cluster_count: clusters.len(),
        conflicting_clusters: counts.conflicting_clusters,
        unit_mixing_clusters: counts.unit_mixing_clusters,
        normalization_failures: counts.normalization_failures,
        malformed_values: counts.malformed_values,
        uncategorized_facts: counts.uncategorized_facts,
        conflict_tolerance: tolerance,
        contexts: per_context
            .into_iter()
            .map(|(context, (clusters, observations))| ContextClusterCount {
                context,
                clusters,
                observations,
            })
            .collect(),
    }
}
