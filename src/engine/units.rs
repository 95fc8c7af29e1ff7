use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult, UnitUnresolved};

/// A group of units sharing one canonical base unit. Every alias maps to a
/// multiplicative factor into `base_unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitFamily {
    pub name: String,
    pub base_unit: String,
    /// Facts in this family may omit the unit entirely (head counts).
    #[serde(default)]
    pub unitless: bool,
    pub factors: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitTable {
    pub families: Vec<UnitFamily>,
}

impl Default for UnitTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedValue {
    pub value: f64,
    pub unit: String,
}

impl UnitTable {
    pub fn builtin() -> Self {
        let families = vec![
            family(
                "area",
                "sq_m",
                false,
                &[
                    ("sq_m", 1.0),
                    ("m2", 1.0),
                    ("sq m", 1.0),
                    ("sqm", 1.0),
                    ("square metre", 1.0),
                    ("square metres", 1.0),
                    ("square meter", 1.0),
                    ("square meters", 1.0),
                    ("ha", 10_000.0),
                    ("hectare", 10_000.0),
                    ("hectares", 10_000.0),
                    ("km2", 1_000_000.0),
                    ("sq km", 1_000_000.0),
                    ("square kilometres", 1_000_000.0),
                    ("square kilometers", 1_000_000.0),
                    ("acre", 4_046.856_422_4),
                    ("acres", 4_046.856_422_4),
                    ("ac", 4_046.856_422_4),
                    ("ft2", 0.092_903_04),
                    ("sq ft", 0.092_903_04),
                    ("square feet", 0.092_903_04),
                ],
            ),
            family(
                "volume",
                "cu_m",
                false,
                &[
                    ("cu_m", 1.0),
                    ("m3", 1.0),
                    ("cubic metres", 1.0),
                    ("cubic meters", 1.0),
                    ("kl", 1.0),
                    ("l", 0.001),
                    ("litre", 0.001),
                    ("litres", 0.001),
                    ("liter", 0.001),
                    ("liters", 0.001),
                    ("ml", 0.000_001),
                    ("megalitres", 1_000.0),
                    ("megaliters", 1_000.0),
                    ("gal", 0.003_785_411_784),
                ],
            ),
            family(
                "volume_rate",
                "cu_m_per_day",
                false,
                &[
                    ("cu_m_per_day", 1.0),
                    ("m3/day", 1.0),
                    ("m3/d", 1.0),
                    ("m3 per day", 1.0),
                    ("cubic metres per day", 1.0),
                    ("l/day", 0.001),
                    ("l/d", 0.001),
                    ("litres per day", 0.001),
                    ("l/s", 86.4),
                    ("m3/h", 24.0),
                    ("m3/hr", 24.0),
                    ("m3/s", 86_400.0),
                    ("m3/yr", 1.0 / 365.0),
                    ("m3/year", 1.0 / 365.0),
                    ("m3/annum", 1.0 / 365.0),
                    ("megalitres per day", 1_000.0),
                    ("mld", 1_000.0),
                ],
            ),
            family(
                "mass",
                "t",
                false,
                &[
                    ("t", 1.0),
                    ("tonne", 1.0),
                    ("tonnes", 1.0),
                    ("ton", 1.0),
                    ("tons", 1.0),
                    ("metric tons", 1.0),
                    ("kg", 0.001),
                    ("kilograms", 0.001),
                    ("g", 0.000_001),
                    ("kt", 1_000.0),
                    ("kilotonnes", 1_000.0),
                ],
            ),
            family(
                "mass_rate",
                "t_per_year",
                false,
                &[
                    ("t_per_year", 1.0),
                    ("tpa", 1.0),
                    ("t/yr", 1.0),
                    ("t/year", 1.0),
                    ("t/a", 1.0),
                    ("tonnes per annum", 1.0),
                    ("tonnes per year", 1.0),
                    ("ktpa", 1_000.0),
                    ("kt/yr", 1_000.0),
                    ("mtpa", 1_000_000.0),
                    ("tpd", 365.0),
                    ("t/d", 365.0),
                    ("t/day", 365.0),
                    ("tph", 8_760.0),
                    ("t/h", 8_760.0),
                ],
            ),
            family(
                "emissions",
                "t_co2e",
                false,
                &[
                    ("t_co2e", 1.0),
                    ("tco2e", 1.0),
                    ("t co2e", 1.0),
                    ("tco2-eq", 1.0),
                    ("t co2-eq", 1.0),
                    ("tonnes co2e", 1.0),
                    ("tco2e/yr", 1.0),
                    ("tco2e/year", 1.0),
                    ("tco2e per annum", 1.0),
                    ("kgco2e", 0.001),
                    ("kg co2e", 0.001),
                    ("ktco2e", 1_000.0),
                    ("kt co2e", 1_000.0),
                    ("mtco2e", 1_000_000.0),
                    ("mt co2e", 1_000_000.0),
                ],
            ),
            family(
                "length",
                "m",
                false,
                &[
                    ("m", 1.0),
                    ("metre", 1.0),
                    ("metres", 1.0),
                    ("meter", 1.0),
                    ("meters", 1.0),
                    ("km", 1_000.0),
                    ("kilometres", 1_000.0),
                    ("kilometers", 1_000.0),
                    ("cm", 0.01),
                    ("mm", 0.001),
                    ("millimetres", 0.001),
                    ("ft", 0.3048),
                    ("feet", 0.3048),
                    ("mi", 1_609.344),
                    ("miles", 1_609.344),
                ],
            ),
            family(
                "power",
                "mw",
                false,
                &[
                    ("mw", 1.0),
                    ("mwe", 1.0),
                    ("mwp", 1.0),
                    ("mwac", 1.0),
                    ("megawatts", 1.0),
                    ("w", 0.000_001),
                    ("kw", 0.001),
                    ("gw", 1_000.0),
                ],
            ),
            family(
                "concentration",
                "ug_per_m3",
                false,
                &[
                    ("ug_per_m3", 1.0),
                    ("ug/m3", 1.0),
                    ("micrograms per cubic metre", 1.0),
                    ("mg/m3", 1_000.0),
                    ("ng/m3", 0.001),
                ],
            ),
            family(
                "sound_level",
                "dba",
                false,
                &[
                    ("dba", 1.0),
                    ("db(a)", 1.0),
                    ("db", 1.0),
                    ("decibels", 1.0),
                ],
            ),
            family(
                "temperature",
                "deg_c",
                false,
                &[
                    ("deg_c", 1.0),
                    ("°c", 1.0),
                    ("deg c", 1.0),
                    ("degc", 1.0),
                    ("degrees celsius", 1.0),
                    ("celsius", 1.0),
                ],
            ),
            family(
                "count",
                "count",
                true,
                &[
                    ("count", 1.0),
                    ("people", 1.0),
                    ("persons", 1.0),
                    ("person", 1.0),
                    ("individuals", 1.0),
                    ("workers", 1.0),
                    ("employees", 1.0),
                    ("staff", 1.0),
                    ("jobs", 1.0),
                    ("households", 1.0),
                    ("hh", 1.0),
                    ("families", 1.0),
                    ("nos", 1.0),
                    ("no", 1.0),
                    ("number", 1.0),
                ],
            ),
            family(
                "currency",
                "usd",
                false,
                &[
                    ("usd", 1.0),
                    ("us$", 1.0),
                    ("$", 1.0),
                    ("usd million", 1_000_000.0),
                    ("million usd", 1_000_000.0),
                    ("us$ million", 1_000_000.0),
                    ("musd", 1_000_000.0),
                    ("usd billion", 1_000_000_000.0),
                    ("billion usd", 1_000_000_000.0),
                ],
            ),
            family(
                "duration",
                "years",
                false,
                &[
                    ("years", 1.0),
                    ("year", 1.0),
                    ("yrs", 1.0),
                    ("yr", 1.0),
                    ("y", 1.0),
                    ("months", 1.0 / 12.0),
                    ("month", 1.0 / 12.0),
                    ("weeks", 7.0 / 365.25),
                    ("week", 7.0 / 365.25),
                    ("days", 1.0 / 365.25),
                    ("day", 1.0 / 365.25),
                ],
            ),
        ];

        Self { families }
    }

    pub fn family(&self, name: &str) -> Option<&UnitFamily> {
        self.families.iter().find(|family| family.name == name)
    }

    /// Aliases that resolve into more than one family, keyed by canonical alias.
    pub fn overlapping_units(&self) -> Vec<(String, Vec<String>)> {
        let mut owners = BTreeMap::<String, Vec<String>>::new();
        for family in &self.families {
            for alias in family.factors.keys() {
                let families = owners.entry(canonical_unit_key(alias)).or_default();
                if !families.contains(&family.name) {
                    families.push(family.name.clone());
                }
            }
        }

        owners
            .into_iter()
            .filter(|(_, families)| families.len() > 1)
            .collect()
    }

    pub fn compile(&self) -> ConfigResult<UnitIndex> {
        let mut aliases = HashMap::<String, Vec<(usize, f64)>>::new();

        for (family_index, family) in self.families.iter().enumerate() {
            for (alias, factor) in &family.factors {
                if !factor.is_finite() || *factor <= 0.0 {
                    return Err(ConfigError::InvalidFactor {
                        family: family.name.clone(),
                        unit: alias.clone(),
                        factor: *factor,
                    });
                }

                let entries = aliases.entry(canonical_unit_key(alias)).or_default();
                if !entries.iter().any(|(index, _)| *index == family_index) {
                    entries.push((family_index, *factor));
                }
            }
        }

        Ok(UnitIndex {
            families: self.families.clone(),
            aliases,
        })
    }
}

fn family(name: &str, base_unit: &str, unitless: bool, factors: &[(&str, f64)]) -> UnitFamily {
    UnitFamily {
        name: name.to_string(),
        base_unit: base_unit.to_string(),
        unitless,
        factors: factors
            .iter()
            .map(|(alias, factor)| (alias.to_string(), *factor))
            .collect(),
    }
}

/// Lookup form of a raw unit string: lower-cased, superscripts flattened,
/// micro signs mapped to `u`, whitespace collapsed, trailing dots dropped.
pub fn canonical_unit_key(raw: &str) -> String {
    let mapped = raw
        .chars()
        .filter_map(|character| match character {
            '²' => Some('2'),
            '³' => Some('3'),
            'µ' | 'μ' => Some('u'),
            '^' => None,
            other => Some(other),
        })
        .flat_map(char::to_lowercase)
        .collect::<String>();

    let collapsed = mapped.split_whitespace().collect::<Vec<&str>>().join(" ");
    collapsed.trim_end_matches('.').trim_end().to_string()
}

/// Compiled alias lookup over a [`UnitTable`].
#[derive(Debug, Clone)]
pub struct UnitIndex {
    families: Vec<UnitFamily>,
    aliases: HashMap<String, Vec<(usize, f64)>>,
}

impl UnitIndex {
    pub fn normalize(
        &self,
        value: f64,
        unit_raw: Option<&str>,
        family_hint: Option<&str>,
    ) -> Result<NormalizedValue, UnitUnresolved> {
        let hint = family_hint.and_then(|name| {
            self.families
                .iter()
                .position(|family| family.name == name)
        });

        let key = unit_raw
            .map(canonical_unit_key)
            .filter(|key| !key.is_empty());

        let Some(key) = key else {
            return match hint.map(|index| &self.families[index]) {
                Some(family) if family.unitless => Ok(NormalizedValue {
                    value,
                    unit: family.base_unit.clone(),
                }),
                _ => Err(UnitUnresolved::Missing),
            };
        };

        let raw_display = unit_raw.unwrap_or_default().trim().to_string();
        let Some(matches) = self.aliases.get(&key) else {
            return Err(UnitUnresolved::Unrecognized { unit: raw_display });
        };

        let chosen = match hint {
            Some(hint_index) => match matches.iter().find(|(index, _)| *index == hint_index) {
                Some(entry) => *entry,
                None if matches.len() == 1 => {
                    return Err(UnitUnresolved::FamilyMismatch {
                        unit: raw_display,
                        expected: self.families[hint_index].name.clone(),
                        found: self.families[matches[0].0].name.clone(),
                    });
                }
                None => return Err(self.ambiguous(raw_display, matches)),
            },
            None if matches.len() == 1 => matches[0],
            None => return Err(self.ambiguous(raw_display, matches)),
        };

        let (family_index, factor) = chosen;
        Ok(NormalizedValue {
            value: value * factor,
            unit: self.families[family_index].base_unit.clone(),
        })
    }

    fn ambiguous(&self, unit: String, matches: &[(usize, f64)]) -> UnitUnresolved {
        let mut families = matches
            .iter()
            .map(|(index, _)| self.families[*index].name.clone())
            .collect::<Vec<String>>();
        families.sort();
        UnitUnresolved::Ambiguous { unit, families }
    }
}
