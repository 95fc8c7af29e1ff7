use std::sync::OnceLock;

use regex::Regex;

fn number_regex() -> Option<&'static Regex> {
    static NUMBER: OnceLock<Option<Regex>> = OnceLock::new();
    NUMBER
        .get_or_init(|| {
            Regex::new(r"[-+]?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?|[-+]?\.\d+").ok()
        })
        .as_ref()
}

const APPROXIMATORS: &[&str] = &[
    "approximately",
    "approx.",
    "approx",
    "about",
    "around",
    "ca.",
    "c.",
    "~",
    "≈",
];

/// First number in a raw value string. Thousands separators and leading
/// approximators are accepted ("~1,200.5 ha" -> 1200.5).
pub fn parse_magnitude(value_raw: &str) -> Option<f64> {
    let mut text = value_raw.trim();
    loop {
        let lowered = text.to_lowercase();
        let Some(prefix) = APPROXIMATORS
            .iter()
            .find(|prefix| lowered.starts_with(*prefix))
        else {
            break;
        };
        text = text[prefix.len()..].trim_start();
    }

    let found = number_regex()?.find(text)?;
    let digits = found.as_str().replace(',', "");
    digits.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Comparison form of a categorical value.
pub fn normalize_categorical(value_raw: &str) -> String {
    value_raw
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}
