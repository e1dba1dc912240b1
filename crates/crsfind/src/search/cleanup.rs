//! Normalization for text that resembles a WKT definition but did not parse.
//!
//! Such text would otherwise flood the index with structural keywords and
//! bracket noise; only the names and numbers carry search value.

use once_cell::sync::Lazy;
use regex::Regex;

/// Keywords that open a top-level definition.
const DEFINITION_MARKERS: [&str; 6] = ["PROJCS", "GEOGCS", "GEOCCS", "COMPD_CS", "VERT_CS", "LOCAL_CS"];

/// Structural keywords and punctuation replaced by a single space.
/// Longer keywords come first so `VERT_DATUM` is removed whole.
static STRUCTURAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:COMPD_CS|LOCAL_CS|VERT_DATUM|VERT_CS|PROJCS|GEOGCS|GEOCCS|PROJECTION|PARAMETER|AUTHORITY|SPHEROID|TOWGS84|PRIMEM|DATUM|UNIT|AXIS)\b|[\[\](),\r\n]+",
    )
    .expect("valid regex")
});

/// Whether `terms` starts like a WKT definition, ignoring case and leading whitespace.
pub fn looks_like_definition(terms: &str) -> bool {
    let trimmed = terms.trim_start();
    DEFINITION_MARKERS.iter().any(|marker| {
        trimmed
            .get(..marker.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(marker))
    })
}

/// Replace WKT keywords, brackets, commas and line breaks with spaces.
pub fn strip_definition_markers(terms: &str) -> String {
    STRUCTURAL.replace_all(terms, " ").into_owned()
}
