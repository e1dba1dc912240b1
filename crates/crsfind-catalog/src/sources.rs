//! Readers for the on-disk catalog layouts.
use std::path::Path;

use ahash::AHashSet as HashSet;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use tracing::{debug, warn};

use crate::{CODE_COL, DataError, NAME_COL, Result, WKT_COL};

/// First quoted string after the leading keyword, e.g. `PROJCS["<name>", ...`.
static DEFINITION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*[A-Za-z_]+\s*[\[(]\s*"([^"]*)""#).expect("valid regex"));

/// Extract the display name from a WKT definition without fully parsing it.
pub fn definition_name(wkt: &str) -> Option<&str> {
    DEFINITION_NAME
        .captures(wkt)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Parse a `<code>=<wkt>` properties document into a catalog frame.
///
/// Blank lines and lines starting with `#` or `!` are skipped. Entries with a
/// non-numeric code, no name, or a code already seen are dropped with a warning.
pub fn parse_properties(text: &str) -> Result<DataFrame> {
    let mut codes: Vec<u32> = Vec::new();
    let mut names: Vec<&str> = Vec::new();
    let mut wkts: Vec<&str> = Vec::new();
    let mut seen = HashSet::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some((code, wkt)) = line.split_once('=') else {
            warn!(line = line_no + 1, "Skipping catalog line without '='");
            continue;
        };
        let Ok(code) = code.trim().parse::<u32>() else {
            warn!(line = line_no + 1, code = code.trim(), "Skipping non-numeric catalog code");
            continue;
        };
        let wkt = wkt.trim();
        let Some(name) = definition_name(wkt) else {
            warn!(line = line_no + 1, code, "Skipping catalog entry without a name");
            continue;
        };
        if !seen.insert(code) {
            warn!(line = line_no + 1, code, "Skipping duplicate catalog code");
            continue;
        }
        codes.push(code);
        names.push(name);
        wkts.push(wkt);
    }
    debug!(entries = codes.len(), "Parsed properties catalog");

    Ok(df!(
        CODE_COL => codes,
        NAME_COL => names,
        WKT_COL => wkts,
    )?)
}

/// Lazily read a CSV catalog with a header row.
pub fn csv_catalog(path: impl AsRef<Path>) -> Result<LazyFrame> {
    let lf = LazyCsvReader::new(path).with_has_header(true).finish()?;
    let schema = lf.clone().collect_schema()?;
    for column in [CODE_COL, NAME_COL, WKT_COL] {
        if schema.get(column).is_none() {
            return Err(DataError::MissingColumn(column));
        }
    }
    Ok(lf
        .select([
            col(CODE_COL).cast(DataType::UInt32),
            col(NAME_COL).cast(DataType::String),
            col(WKT_COL).cast(DataType::String),
        ])
        .drop_nulls(None))
}
