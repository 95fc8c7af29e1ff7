use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::{
    ChecklistSection, CoverageStatus, DocumentChunk, GapCheckResult, GapReport, SectionCoverage,
};

use super::error::{ConfigError, ConfigResult};

/// Characters of context kept on each side of a match.
pub const SNIPPET_CONTEXT_CHARS: usize = 120;

/// Expected-content entry. Patterns are case-insensitive regular expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub section: ChecklistSection,
    pub label: String,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checklist {
    pub items: Vec<ChecklistItem>,
}

impl Default for Checklist {
    fn default() -> Self {
        Self::builtin()
    }
}

fn item(id: &str, section: ChecklistSection, label: &str, patterns: &[&str]) -> ChecklistItem {
    ChecklistItem {
        id: id.to_string(),
        section,
        label: label.to_string(),
        patterns: patterns.iter().map(|pattern| pattern.to_string()).collect(),
    }
}

impl Checklist {
    pub fn builtin() -> Self {
        use ChecklistSection::*;

        let items = vec![
            item(
                "pd-location",
                ProjectDescription,
                "Project location",
                &[r"project location", r"site location", r"located (?:in|at|approximately)"],
            ),
            item(
                "pd-components",
                ProjectDescription,
                "Project components",
                &[r"project components", r"project facilities", r"main components"],
            ),
            item(
                "pd-schedule",
                ProjectDescription,
                "Construction schedule",
                &[r"construction (?:schedule|phase|period)", r"implementation schedule"],
            ),
            item(
                "pd-workforce",
                ProjectDescription,
                "Workforce requirements",
                &[r"workforce", r"labou?r requirements?", r"employment opportunities"],
            ),
            item(
                "pd-alternatives",
                ProjectDescription,
                "Analysis of alternatives",
                &[
                    r"analysis of alternatives",
                    r"alternatives? (?:considered|analysis)",
                    r"no[- ]project alternative",
                ],
            ),
            item(
                "pd-resources",
                ProjectDescription,
                "Water and energy requirements",
                &[
                    r"water (?:demand|requirements?|consumption)",
                    r"(?:power|energy|electricity) (?:demand|requirements?)",
                ],
            ),
            item(
                "pb-climate",
                PhysicalBaseline,
                "Climate and meteorology",
                &[r"climate", r"meteorolog", r"rainfall"],
            ),
            item(
                "pb-air-quality",
                PhysicalBaseline,
                "Ambient air quality",
                &[r"air quality", r"\bpm ?10\b", r"\bpm ?2\.5"],
            ),
            item(
                "pb-noise",
                PhysicalBaseline,
                "Noise baseline",
                &[r"noise (?:levels?|monitoring|baseline)", r"ambient noise"],
            ),
            item(
                "pb-surface-water",
                PhysicalBaseline,
                "Surface water quality",
                &[r"surface water", r"water quality"],
            ),
            item(
                "pb-groundwater",
                PhysicalBaseline,
                "Groundwater",
                &[r"groundwater", r"aquifer", r"hydrogeolog"],
            ),
            item(
                "pb-geology",
                PhysicalBaseline,
                "Geology and soils",
                &[r"geolog", r"\bsoils?\b"],
            ),
            item(
                "pb-topography",
                PhysicalBaseline,
                "Topography",
                &[r"topograph", r"landform", r"elevation"],
            ),
            item(
                "bb-habitat",
                BiologicalBaseline,
                "Habitat mapping",
                &[
                    r"habitat (?:map|type|assessment)",
                    r"vegetation (?:types?|map)",
                    r"land cover",
                ],
            ),
            item(
                "bb-flora",
                BiologicalBaseline,
                "Flora survey",
                &[r"\bflora\b", r"plant species", r"botanical"],
            ),
            item(
                "bb-fauna",
                BiologicalBaseline,
                "Fauna survey",
                &[r"\bfauna\b", r"mammals?", r"avifauna", r"\bbirds?\b"],
            ),
            item(
                "bb-protected-areas",
                BiologicalBaseline,
                "Protected areas",
                &[
                    r"protected areas?",
                    r"key biodiversity areas?",
                    r"national park",
                    r"ramsar",
                ],
            ),
            item(
                "bb-threatened-species",
                BiologicalBaseline,
                "Threatened species",
                &[r"iucn red list", r"threatened species", r"endangered"],
            ),
            item(
                "bb-critical-habitat",
                BiologicalBaseline,
                "Critical habitat assessment",
                &[r"critical habitat", r"natural habitat"],
            ),
            item(
                "sb-demographics",
                SocialBaseline,
                "Demographics",
                &[r"demograph", r"population", r"census"],
            ),
            item(
                "sb-livelihoods",
                SocialBaseline,
                "Livelihoods and economy",
                &[r"livelihood", r"income sources?", r"economic activit"],
            ),
            item(
                "sb-land-use",
                SocialBaseline,
                "Land use and tenure",
                &[r"land (?:use|tenure|ownership)"],
            ),
            item(
                "sb-indigenous",
                SocialBaseline,
                "Indigenous peoples",
                &[
                    r"indigenous peoples?",
                    r"ethnic minorit",
                    r"\bfpic\b",
                    r"free,? prior and informed consent",
                ],
            ),
            item(
                "sb-heritage",
                SocialBaseline,
                "Cultural heritage",
                &[r"cultural heritage", r"archaeolog", r"sacred sites?"],
            ),
            item(
                "sb-health",
                SocialBaseline,
                "Community health",
                &[r"community health", r"health (?:facilities|services|status)"],
            ),
            item(
                "sb-engagement",
                SocialBaseline,
                "Stakeholder engagement",
                &[
                    r"stakeholder (?:engagement|consultation)",
                    r"public consultation",
                    r"\bsep\b",
                ],
            ),
            item(
                "ia-methodology",
                ImpactAssessment,
                "Impact assessment methodology",
                &[
                    r"impact assessment methodology",
                    r"significance criteria",
                    r"magnitude and sensitivity",
                ],
            ),
            item(
                "ia-air-noise",
                ImpactAssessment,
                "Air and noise impacts",
                &[r"(?:air quality|dust|noise) impacts?"],
            ),
            item(
                "ia-water",
                ImpactAssessment,
                "Water resource impacts",
                &[
                    r"(?:water|hydrological|groundwater) impacts?",
                    r"impacts? on (?:water|groundwater|surface water)",
                ],
            ),
            item(
                "ia-biodiversity",
                ImpactAssessment,
                "Biodiversity impacts",
                &[
                    r"(?:biodiversity|ecological|habitat) impacts?",
                    r"impacts? on (?:biodiversity|habitats?|flora|fauna)",
                ],
            ),
            item(
                "ia-social",
                ImpactAssessment,
                "Social impacts",
                &[
                    r"social impacts?",
                    r"socio-?economic impacts?",
                    r"resettlement impacts?",
                ],
            ),
            item(
                "ia-cumulative",
                ImpactAssessment,
                "Cumulative impacts",
                &[r"cumulative impacts?"],
            ),
            item(
                "ia-climate",
                ImpactAssessment,
                "Climate change and GHG",
                &[r"greenhouse gas", r"\bghg\b", r"climate change"],
            ),
            item(
                "mm-esmp",
                MitigationManagement,
                "ESMP Reference",
                &[
                    r"environmental and social management plan",
                    r"\besmp\b",
                    r"environmental management plan",
                ],
            ),
            item(
                "mm-mitigation",
                MitigationManagement,
                "Mitigation measures",
                &[r"mitigation (?:measures?|hierarchy)"],
            ),
            item(
                "mm-monitoring",
                MitigationManagement,
                "Monitoring plan",
                &[r"monitoring (?:plan|programme|program|framework)"],
            ),
            item(
                "mm-grievance",
                MitigationManagement,
                "Grievance mechanism",
                &[r"grievance"],
            ),
            item(
                "mm-resettlement",
                MitigationManagement,
                "Resettlement action plan",
                &[
                    r"resettlement action plan",
                    r"\brap\b",
                    r"livelihood restoration plan",
                ],
            ),
            item(
                "mm-closure",
                MitigationManagement,
                "Closure and rehabilitation",
                &[r"closure plan", r"rehabilitation", r"decommissioning"],
            ),
            item(
                "mm-emergency",
                MitigationManagement,
                "Emergency response",
                &[r"emergency (?:response|preparedness)"],
            ),
        ];

        Self { items }
    }

    pub fn compile(&self) -> ConfigResult<GapAnalyzer> {
        let mut seen = HashSet::<&str>::new();
        let mut items = Vec::with_capacity(self.items.len());

        for item in &self.items {
            if !seen.insert(item.id.as_str()) {
                return Err(ConfigError::DuplicateChecklistItem(item.id.clone()));
            }

            let alternatives = item
                .patterns
                .iter()
                .map(|pattern| pattern.trim())
                .filter(|pattern| !pattern.is_empty())
                .map(|pattern| format!("(?:{pattern})"))
                .collect::<Vec<String>>();

            let matcher = if alternatives.is_empty() {
                None
            } else {
                let regex = RegexBuilder::new(&alternatives.join("|"))
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| ConfigError::InvalidPattern {
                        owner: format!("checklist item {}", item.id),
                        source,
                    })?;
                Some(regex)
            };

            items.push(CompiledItem {
                id: item.id.clone(),
                section: item.section,
                label: item.label.clone(),
                matcher,
            });
        }

        Ok(GapAnalyzer { items })
    }
}

#[derive(Debug, Clone)]
struct CompiledItem {
    id: String,
    section: ChecklistSection,
    label: String,
    matcher: Option<Regex>,
}

/// Stateless scan of document chunks against a compiled checklist.
#[derive(Debug, Clone)]
pub struct GapAnalyzer {
    items: Vec<CompiledItem>,
}

impl GapAnalyzer {
    pub fn analyze(&self, chunks: &[DocumentChunk]) -> GapReport {
        let mut sections = Vec::with_capacity(ChecklistSection::ALL.len());

        for section in ChecklistSection::ALL {
            let items = self
                .items
                .iter()
                .filter(|item| item.section == section)
                .map(|item| check_item(item, chunks))
                .collect::<Vec<GapCheckResult>>();

            let expected_count = items.len();
            let found_count = items.iter().filter(|item| item.found).count();

            sections.push(SectionCoverage {
                section,
                title: section.title().to_string(),
                expected_count,
                found_count,
                coverage: coverage_ratio(found_count, expected_count),
                status: classify_coverage(found_count, expected_count),
                items,
            });
        }

        let evaluated = sections
            .iter()
            .filter(|section| section.expected_count > 0)
            .collect::<Vec<&SectionCoverage>>();
        let expected_total = evaluated
            .iter()
            .map(|section| section.expected_count)
            .sum::<usize>();
        let found_total = evaluated
            .iter()
            .map(|section| section.found_count)
            .sum::<usize>();
        let sections_evaluated = evaluated.len();

        info!(
            chunks = chunks.len(),
            expected_total,
            found_total,
            sections_evaluated,
            "gap analysis complete"
        );

        GapReport {
            sections,
            sections_evaluated,
            expected_total,
            found_total,
            overall_coverage: coverage_ratio(found_total, expected_total),
        }
    }
}

fn check_item(item: &CompiledItem, chunks: &[DocumentChunk]) -> GapCheckResult {
    let hit = item.matcher.as_ref().and_then(|matcher| {
        chunks.iter().find_map(|chunk| {
            matcher
                .find(&chunk.text)
                .map(|found| (bounded_snippet(&chunk.text, found.start(), found.end()), chunk.page))
        })
    });

    GapCheckResult {
        id: item.id.clone(),
        label: item.label.clone(),
        found: hit.is_some(),
        page: hit.as_ref().map(|(_, page)| *page),
        snippet: hit.map(|(snippet, _)| snippet),
    }
}

pub fn coverage_ratio(found: usize, expected: usize) -> Option<f64> {
    if expected == 0 {
        None
    } else {
        Some(found.min(expected) as f64 / expected as f64)
    }
}

pub fn classify_coverage(found: usize, expected: usize) -> Option<CoverageStatus> {
    if expected == 0 {
        None
    } else if found >= expected {
        Some(CoverageStatus::Complete)
    } else if found * 2 >= expected {
        Some(CoverageStatus::Partial)
    } else {
        Some(CoverageStatus::Deficient)
    }
}

/// Match plus up to [`SNIPPET_CONTEXT_CHARS`] characters either side,
/// cut on char boundaries, whitespace condensed. The match itself is also
/// capped at [`SNIPPET_CONTEXT_CHARS`] characters, so the result never
/// exceeds three windows whatever the pattern.
pub fn bounded_snippet(text: &str, start: usize, end: usize) -> String {
    let end = text[start..]
        .char_indices()
        .nth(SNIPPET_CONTEXT_CHARS)
        .map(|(index, _)| start + index)
        .map_or(end, |cap| end.min(cap));
    let window_start = text[..start]
        .char_indices()
        .rev()
        .take(SNIPPET_CONTEXT_CHARS)
        .last()
        .map(|(index, _)| index)
        .unwrap_or(start);
    let window_end = text[end..]
        .char_indices()
        .nth(SNIPPET_CONTEXT_CHARS)
        .map(|(index, _)| end + index)
        .unwrap_or(text.len());

    text[window_start..window_end]
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}
