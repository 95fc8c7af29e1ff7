use super::context::ParameterContext;

pub const DEFAULT_NAME_STOPLIST: &[&str] = &[
    "total",
    "annual",
    "overall",
    "approximate",
    "approximately",
    "approx",
    "estimated",
    "the",
];

/// Lower-cases, collapses whitespace and drops stoplist words. A name made
/// only of stoplist words keeps them rather than collapsing to nothing.
pub fn normalize_name(name: &str, stoplist: &[String]) -> String {
    let tokens = name
        .split_whitespace()
        .map(|token| {
            token
                .trim_matches(|character: char| matches!(character, ':' | ',' | ';'))
                .to_lowercase()
        })
        .filter(|token| !token.is_empty())
        .collect::<Vec<String>>();

    let kept = tokens
        .iter()
        .filter(|token| {
            let bare = token.trim_end_matches('.');
            !stoplist.iter().any(|word| word == bare)
        })
        .map(String::as_str)
        .collect::<Vec<&str>>();

    if kept.is_empty() {
        tokens.join(" ")
    } else {
        kept.join(" ")
    }
}

/// Clustering key: `<context>::<normalized name>`. Exact match only.
pub fn build_signature(context: ParameterContext, name: &str, stoplist: &[String]) -> String {
    format!("{}::{}", context.as_str(), normalize_name(name, stoplist))
}

pub fn default_stoplist() -> Vec<String> {
    DEFAULT_NAME_STOPLIST
        .iter()
        .map(|word| word.to_string())
        .collect()
}
