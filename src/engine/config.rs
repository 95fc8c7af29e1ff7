use serde::{Deserialize, Serialize};
use tracing::warn;

use super::conflict::DEFAULT_CONFLICT_TOLERANCE;
use super::context::{ContextClassifier, ContextRule, builtin_context_rules};
use super::error::{ConfigError, ConfigResult};
use super::gaps::Checklist;
use super::pipeline::Engine;
use super::signature::default_stoplist;
use super::units::UnitTable;

/// Everything a run needs besides its inputs. Tables are plain data so they
/// can be dumped, edited and passed back in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub conflict_tolerance: f64,
    pub unit_conversion_table: UnitTable,
    pub context_patterns: Vec<ContextRule>,
    pub checklist: Checklist,
    pub name_stoplist: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            conflict_tolerance: DEFAULT_CONFLICT_TOLERANCE,
            unit_conversion_table: UnitTable::builtin(),
            context_patterns: builtin_context_rules(),
            checklist: Checklist::builtin(),
            name_stoplist: default_stoplist(),
        }
    }
}

/// Override file layout. Absent fields keep the built-in value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfigOverrides {
    pub conflict_tolerance: Option<f64>,
    pub unit_conversion_table: Option<UnitTable>,
    pub context_patterns: Option<Vec<ContextRule>>,
    pub checklist: Option<Checklist>,
    pub name_stoplist: Option<Vec<String>>,
}

impl EngineConfig {
    pub fn with_overrides(overrides: EngineConfigOverrides) -> Self {
        let defaults = Self::default();
        Self {
            conflict_tolerance: overrides
                .conflict_tolerance
                .unwrap_or(defaults.conflict_tolerance),
            unit_conversion_table: overrides
                .unit_conversion_table
                .unwrap_or(defaults.unit_conversion_table),
            context_patterns: overrides
                .context_patterns
                .unwrap_or(defaults.context_patterns),
            checklist: overrides.checklist.unwrap_or(defaults.checklist),
            name_stoplist: overrides.name_stoplist.unwrap_or(defaults.name_stoplist),
        }
    }

    pub fn compile(&self) -> ConfigResult<Engine> {
        let tolerance = self.conflict_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(tolerance));
        }

        for (unit, families) in self.unit_conversion_table.overlapping_units() {
            warn!(
                unit = %unit,
                families = %families.join(","),
                "unit alias appears in several families; unhinted lookups will be ambiguous"
            );
        }

        let units = self.unit_conversion_table.compile()?;
        let classifier =
            ContextClassifier::compile(&self.context_patterns, &self.unit_conversion_table)?;
        let gaps = self.checklist.compile()?;
        let stoplist = self
            .name_stoplist
            .iter()
            .map(|word| word.trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect::<Vec<String>>();

        Ok(Engine::new(tolerance, units, classifier, gaps, stoplist))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_compile() {
        let config = EngineConfig::default();
        assert_eq!(config.conflict_tolerance, 0.02);
        assert_eq!(config.context_patterns.len(), 17);
        config.compile().expect("default config compiles");
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let overrides: EngineConfigOverrides =
            serde_json::from_str(r#"{ "conflict_tolerance": 0.1 }"#).expect("parses");
        let config = EngineConfig::with_overrides(overrides);

        assert_eq!(config.conflict_tolerance, 0.1);
        assert_eq!(config.unit_conversion_table, UnitTable::builtin());
        assert_eq!(config.checklist, Checklist::builtin());
    }

    #[test]
    fn unknown_override_fields_are_rejected() {
        let parsed =
            serde_json::from_str::<EngineConfigOverrides>(r#"{ "conflict_tolerence": 0.1 }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn dumped_config_round_trips_as_overrides() {
        let dumped = serde_json::to_string(&EngineConfig::default()).expect("serializes");
        let overrides: EngineConfigOverrides = serde_json::from_str(&dumped).expect("parses");
        assert_eq!(EngineConfig::with_overrides(overrides), EngineConfig::default());
    }

    #[test]
    fn invalid_tolerance_is_rejected() {
        for tolerance in [-0.01, f64::NAN, f64::INFINITY] {
            let config = EngineConfig {
                conflict_tolerance: tolerance,
                ..EngineConfig::default()
            };
            assert!(matches!(
                config.compile(),
                Err(ConfigError::InvalidTolerance(_))
            ));
        }
    }
}
