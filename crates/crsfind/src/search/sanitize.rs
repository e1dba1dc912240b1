use once_cell::sync::Lazy;
use regex::Regex;

/// A bare run, a double-quoted group or a single-quoted group.
static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^\s"']+|"([^"]*)"|'([^']*)'"#).expect("valid regex"));

/// Split `raw` into tokens.
///
/// A token is a run of non-whitespace, non-quote characters, or the content of
/// a matched pair of double or single quotes. A quote with no closing partner
/// separates runs and is otherwise dropped.
pub fn tokenize(raw: &str) -> Vec<&str> {
    TOKEN
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(0)))
        .map(|m| m.as_str())
        .collect()
}

/// Rewrite `raw` as a sequence of quoted phrases.
///
/// Every token becomes `"token"` so the index query parser reads it as a
/// literal phrase: boolean operators, wildcards, field selectors and ranges
/// lose their meaning. Double quotes and backslashes cannot appear inside a
/// phrase and are dropped from token content.
///
/// ```rust
/// use crsfind::search::sanitize;
///
/// assert_eq!(sanitize(r#"foo "bar baz" 'qux'"#), r#""foo" "bar baz" "qux""#);
/// assert_eq!(sanitize("   "), "");
/// ```
pub fn sanitize(raw: &str) -> String {
    tokenize(raw)
        .into_iter()
        .map(|token| token.replace(['"', '\\'], ""))
        .filter(|token| !token.trim().is_empty())
        .map(|token| format!("\"{token}\""))
        .collect::<Vec<_>>()
        .join(" ")
}
