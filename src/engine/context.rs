use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use super::units::UnitTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterContext {
    StudyArea,
    ConcessionArea,
    DisturbanceArea,
    BufferZone,
    Population,
    AffectedHouseholds,
    Workforce,
    WaterConsumption,
    PowerCapacity,
    EmissionsGhg,
    NoiseLevel,
    AirQualityPm,
    Rainfall,
    Temperature,
    ProductionCapacity,
    ProjectCost,
    ProjectDuration,
    Uncategorized,
}

impl ParameterContext {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StudyArea => "study_area",
            Self::ConcessionArea => "concession_area",
            Self::DisturbanceArea => "disturbance_area",
            Self::BufferZone => "buffer_zone",
            Self::Population => "population",
            Self::AffectedHouseholds => "affected_households",
            Self::Workforce => "workforce",
            Self::WaterConsumption => "water_consumption",
            Self::PowerCapacity => "power_capacity",
            Self::EmissionsGhg => "emissions_ghg",
            Self::NoiseLevel => "noise_level",
            Self::AirQualityPm => "air_quality_pm",
            Self::Rainfall => "rainfall",
            Self::Temperature => "temperature",
            Self::ProductionCapacity => "production_capacity",
            Self::ProjectCost => "project_cost",
            Self::ProjectDuration => "project_duration",
            Self::Uncategorized => "uncategorized",
        }
    }
}

impl fmt::Display for ParameterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the priority-ordered classification table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRule {
    pub context: ParameterContext,
    #[serde(default)]
    pub unit_family: Option<String>,
    pub patterns: Vec<String>,
}

fn rule(context: ParameterContext, unit_family: &str, patterns: &[&str]) -> ContextRule {
    ContextRule {
        context,
        unit_family: Some(unit_family.to_string()),
        patterns: patterns.iter().map(|pattern| pattern.to_string()).collect(),
    }
}

/// Built-in rules in evaluation order. Earlier rules win.
///
/// Rules naming what is measured come before rules naming where it is
/// measured, so "population within the study area" stays a population count.
/// Generic wording ("output", "budget", "duration") is tried last.
pub fn builtin_context_rules() -> Vec<ContextRule> {
    use ParameterContext::*;

    vec![
        // Household counts before generic population counts.
        rule(
            AffectedHouseholds,
            "count",
            &[
                "affected household",
                "households affected",
                "displaced household",
                "resettled household",
                "project affected",
                "paps",
            ],
        ),
        rule(
            Workforce,
            "count",
            &[
                "workforce",
                "work force",
                "labour force",
                "labor force",
                "employees",
                "workers",
                "employment",
                "personnel",
                "jobs",
            ],
        ),
        // Residents of an area are counted here, not as area.
        rule(
            Population,
            "count",
            &["population", "inhabitants", "residents", "census"],
        ),
        // "Noise emissions" is a sound level; must precede emissions_ghg.
        rule(
            NoiseLevel,
            "sound_level",
            &["noise", "sound level", "laeq", "decibel"],
        ),
        // Particulate readings mention "dust emissions"; must precede emissions_ghg.
        rule(
            AirQualityPm,
            "concentration",
            &[
                "pm10",
                "pm 10",
                "pm2.5",
                "pm 2.5",
                "particulate",
                "dust",
                "tsp",
            ],
        ),
        // Bare "emissions" is the catch-all once noise and particulates are ruled out.
        rule(
            EmissionsGhg,
            "emissions",
            &[
                "ghg",
                "greenhouse gas",
                "co2",
                "carbon dioxide",
                "carbon emission",
                "emissions",
            ],
        ),
        // Water wording is specific; precedes the area rules ("water use in the project area").
        rule(
            WaterConsumption,
            "volume_rate",
            &[
                "water consumption",
                "water demand",
                "water use",
                "water usage",
                "water requirement",
                "water supply",
                "abstraction",
            ],
        ),
        // Power wording is explicit; must precede production_capacity ("capacity", "output").
        rule(
            PowerCapacity,
            "power",
            &[
                "installed capacity",
                "generation capacity",
                "generating capacity",
                "power capacity",
                "power output",
                "power demand",
                "power requirement",
                "electricity demand",
                "nameplate",
            ],
        ),
        // Climate readings are often qualified by the area they cover.
        rule(Rainfall, "length", &["rainfall", "precipitation", "rain"]),
        rule(Temperature, "temperature", &["temperature"]),
        // Footprints are usually described as a share of a larger area, so the
        // disturbance rule runs before every other area rule.
        rule(
            DisturbanceArea,
            "area",
            &[
                "disturbance",
                "disturbed area",
                "footprint",
                "land take",
                "cleared area",
                "land clearing",
            ],
        ),
        // Concession text often mentions the study area it sits in.
        rule(
            ConcessionArea,
            "area",
            &[
                "concession",
                "licence area",
                "license area",
                "lease area",
                "permit area",
                "mining lease",
                "tenement",
            ],
        ),
        // Buffer widths are lengths; must precede study_area ("buffer around the project area").
        rule(BufferZone, "length", &["buffer"]),
        // Most general area rule.
        rule(
            StudyArea,
            "area",
            &[
                "study area",
                "project area",
                "area of influence",
                "aoi",
                "survey area",
                "site area",
            ],
        ),
        // Generic wording from here on; any subject rule above wins.
        rule(
            ProductionCapacity,
            "mass_rate",
            &[
                "production",
                "throughput",
                "processing capacity",
                "plant capacity",
                "output",
            ],
        ),
        rule(
            ProjectCost,
            "currency",
            &[
                "capex",
                "capital cost",
                "project cost",
                "investment",
                "budget",
            ],
        ),
        rule(
            ProjectDuration,
            "duration",
            &[
                "construction period",
                "project life",
                "life of mine",
                "operational life",
                "design life",
                "lifespan",
                "duration",
            ],
        ),
    ]
}

#[derive(Debug, Clone)]
struct CompiledContextRule {
    context: ParameterContext,
    unit_family: Option<String>,
    matcher: Option<Regex>,
}

/// Priority-ordered phrase matcher. Patterns match case-insensitively and
/// must start on a word boundary.
#[derive(Debug, Clone)]
pub struct ContextClassifier {
    rules: Vec<CompiledContextRule>,
}

impl ContextClassifier {
    pub fn compile(rules: &[ContextRule], units: &UnitTable) -> ConfigResult<Self> {
        let mut compiled = Vec::with_capacity(rules.len());

        for rule in rules {
            if let Some(family) = rule.unit_family.as_deref() {
                if units.family(family).is_none() {
                    return Err(ConfigError::UnknownUnitFamily {
                        context: rule.context.to_string(),
                        family: family.to_string(),
                    });
                }
            }

            let alternatives = rule
                .patterns
                .iter()
                .map(|pattern| pattern.trim())
                .filter(|pattern| !pattern.is_empty())
                .map(regex::escape)
                .collect::<Vec<String>>();

            let matcher = if alternatives.is_empty() {
                None
            } else {
                let source = format!(r"\b(?:{})", alternatives.join("|"));
                let regex = RegexBuilder::new(&source)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| ConfigError::InvalidPattern {
                        owner: format!("context {}", rule.context),
                        source,
                    })?;
                Some(regex)
            };

            compiled.push(CompiledContextRule {
                context: rule.context,
                unit_family: rule.unit_family.clone(),
                matcher,
            });
        }

        Ok(Self { rules: compiled })
    }

    /// The fact name is tried against every rule before the evidence is.
    pub fn classify(&self, name: &str, evidence: &str) -> ParameterContext {
        self.first_match(name)
            .or_else(|| self.first_match(evidence))
            .unwrap_or(ParameterContext::Uncategorized)
    }

    pub fn unit_family(&self, context: ParameterContext) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.context == context)
            .and_then(|rule| rule.unit_family.as_deref())
    }

    fn first_match(&self, text: &str) -> Option<ParameterContext> {
        if text.trim().is_empty() {
            return None;
        }

        self.rules
            .iter()
            .find(|rule| {
                rule.matcher
                    .as_ref()
                    .map(|matcher| matcher.is_match(text))
                    .unwrap_or(false)
            })
            .map(|rule| rule.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ContextClassifier {
        ContextClassifier::compile(&builtin_context_rules(), &UnitTable::builtin())
            .expect("builtin rules compile")
    }

    #[test]
    fn builtin_rules_cover_every_context_once() {
        let rules = builtin_context_rules();
        assert_eq!(rules.len(), 17);

        let mut contexts = rules.iter().map(|rule| rule.context).collect::<Vec<_>>();
        contexts.sort();
        contexts.dedup();
        assert_eq!(contexts.len(), 17);
        assert!(!contexts.contains(&ParameterContext::Uncategorized));
    }

    #[test]
    fn specific_area_contexts_win_over_study_area() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify("Disturbance footprint within the study area", ""),
            ParameterContext::DisturbanceArea
        );
        assert_eq!(
            classifier.classify("Concession area", ""),
            ParameterContext::ConcessionArea
        );
        assert_eq!(
            classifier.classify("Study Area", ""),
            ParameterContext::StudyArea
        );
    }

    #[test]
    fn name_match_takes_precedence_over_evidence() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify("workforce", "peak noise during construction"),
            ParameterContext::Workforce
        );
        assert_eq!(
            classifier.classify("peak figure", "the construction workforce will peak at 650"),
            ParameterContext::Workforce
        );
    }

    #[test]
    fn measured_subject_wins_over_location_qualifier() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify("Population within the study area", ""),
            ParameterContext::Population
        );
        assert_eq!(
            classifier.classify("Affected households in the concession", ""),
            ParameterContext::AffectedHouseholds
        );
        assert_eq!(
            classifier.classify("Workers housed inside the project area", ""),
            ParameterContext::Workforce
        );
        assert_eq!(
            classifier.classify("Noise level at the buffer boundary", ""),
            ParameterContext::NoiseLevel
        );
        assert_eq!(
            classifier.classify("PM10 across the study area", ""),
            ParameterContext::AirQualityPm
        );
        assert_eq!(
            classifier.classify("Water use in the project area", ""),
            ParameterContext::WaterConsumption
        );
    }

    #[test]
    fn noise_emissions_are_a_sound_level() {
        assert_eq!(
            classifier().classify("Noise emissions", ""),
            ParameterContext::NoiseLevel
        );
        assert_eq!(
            classifier().classify("Annual emissions", ""),
            ParameterContext::EmissionsGhg
        );
    }

    #[test]
    fn particulates_are_not_classified_as_greenhouse_gas() {
        assert_eq!(
            classifier().classify("Dust emissions", ""),
            ParameterContext::AirQualityPm
        );
    }

    #[test]
    fn patterns_require_a_word_start() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify("Drainage length", ""),
            ParameterContext::Uncategorized
        );
        assert_eq!(
            classifier.classify("Annual rainfall", ""),
            ParameterContext::Rainfall
        );
    }

    #[test]
    fn unmatched_fact_is_uncategorized() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify("Number of culverts", "twelve culverts"),
            ParameterContext::Uncategorized
        );
        assert_eq!(classifier.unit_family(ParameterContext::Uncategorized), None);
        assert_eq!(
            classifier.unit_family(ParameterContext::StudyArea),
            Some("area")
        );
    }

    #[test]
    fn compile_rejects_unknown_unit_family() {
        let rules = vec![ContextRule {
            context: ParameterContext::Rainfall,
            unit_family: Some("rainfall_depth".to_string()),
            patterns: vec!["rain".to_string()],
        }];

        assert!(matches!(
            ContextClassifier::compile(&rules, &UnitTable::builtin()),
            Err(ConfigError::UnknownUnitFamily { .. })
        ));
    }
}
