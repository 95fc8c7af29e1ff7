use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::context::ParameterContext;
use crate::engine::error::UnitUnresolved;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactType {
    #[default]
    Quantity,
    Categorical,
}

/// One candidate fact as produced by the upstream extraction stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactObservation {
    pub name: String,
    #[serde(default)]
    pub fact_type: FactType,
    pub value_raw: String,
    #[serde(default)]
    pub value_num: Option<f64>,
    #[serde(default)]
    pub unit_raw: Option<String>,
    #[serde(default)]
    pub evidence: String,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum FactIssue {
    UnitUnresolved { detail: UnitUnresolved },
    MalformedValue { value_raw: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFact {
    pub name: String,
    /// Effective type; a quantity with no parseable number becomes categorical.
    pub fact_type: FactType,
    pub value_raw: String,
    pub value_num: Option<f64>,
    pub unit_raw: Option<String>,
    pub evidence: String,
    pub page: u32,
    pub context: ParameterContext,
    pub value_normalized: Option<f64>,
    pub unit_normalized: Option<String>,
    pub normalization_failed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<FactIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitUsage {
    pub unit_raw: String,
    pub occurrences: usize,
    pub example_evidence: String,
    pub example_page: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitMixing {
    pub units: Vec<UnitUsage>,
    pub recommended_unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCluster {
    pub signature: String,
    pub context: ParameterContext,
    pub name: String,
    pub fact_type: FactType,
    pub observations: Vec<CanonicalFact>,
    pub occurrence_count: usize,
    pub has_conflict: bool,
    pub conflict_description: Option<String>,
    pub unit_mixing: Option<UnitMixing>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistSection {
    ProjectDescription,
    PhysicalBaseline,
    BiologicalBaseline,
    SocialBaseline,
    ImpactAssessment,
    MitigationManagement,
}

impl ChecklistSection {
    pub const ALL: [ChecklistSection; 6] = [
        Self::ProjectDescription,
        Self::PhysicalBaseline,
        Self::BiologicalBaseline,
        Self::SocialBaseline,
        Self::ImpactAssessment,
        Self::MitigationManagement,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::ProjectDescription => "Project Description",
            Self::PhysicalBaseline => "Physical Baseline",
            Self::BiologicalBaseline => "Biological Baseline",
            Self::SocialBaseline => "Social Baseline",
            Self::ImpactAssessment => "Impact Assessment",
            Self::MitigationManagement => "Mitigation & Management",
        }
    }
}

impl fmt::Display for ChecklistSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    Complete,
    Partial,
    Deficient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapCheckResult {
    pub id: String,
    pub label: String,
    pub found: bool,
    pub snippet: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionCoverage {
    pub section: ChecklistSection,
    pub title: String,
    pub expected_count: usize,
    pub found_count: usize,
    /// Absent when the section has no expected items.
    pub coverage: Option<f64>,
    pub status: Option<CoverageStatus>,
    pub items: Vec<GapCheckResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapReport {
    pub sections: Vec<SectionCoverage>,
    pub sections_evaluated: usize,
    pub expected_total: usize,
    pub found_total: usize,
    pub overall_coverage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextClusterCount {
    pub context: ParameterContext,
    pub clusters: usize,
    pub observations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub fact_count: usize,
    pub chunk_count: usize,
    pub cluster_count: usize,
    pub conflicting_clusters: usize,
    pub unit_mixing_clusters: usize,
    pub normalization_failures: usize,
    pub malformed_values: usize,
    pub uncategorized_facts: usize,
    pub conflict_tolerance: f64,
    pub contexts: Vec<ContextClusterCount>,
}

/// Deterministic engine output; carries no wall-clock data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: AnalysisSummary,
    pub clusters: Vec<FactCluster>,
    pub gap_report: GapReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputFileEntry {
    pub path: String,
    pub sha256: String,
    pub record_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzePaths {
    pub cache_root: String,
    pub report_path: String,
    pub manifest_path: String,
    pub db_path: Option<String>,
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeCounts {
    pub fact_count: usize,
    pub chunk_count: usize,
    pub cluster_count: usize,
    pub conflicting_clusters: usize,
    pub unit_mixing_clusters: usize,
    pub normalization_failures: usize,
    pub gap_items_expected: usize,
    pub gap_items_found: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub workers: Option<usize>,
    pub config_sha256: String,
    pub report_sha256: String,
    pub inputs: Vec<InputFileEntry>,
    pub paths: AnalyzePaths,
    pub counts: AnalyzeCounts,
    pub warnings: Vec<String>,
}
