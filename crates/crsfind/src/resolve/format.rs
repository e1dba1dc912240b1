//! Output records for resolved codes.

use serde::Serialize;

use super::LookupOutcome;
use crate::crs::Crs;

/// One resolved catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub code: String,
    pub name: String,
    pub url: String,
}

/// Build the record for `code`, linking to `<base_url>/epsg/<code>.json`.
pub fn format(code: &str, crs: &Crs, base_url: &str) -> SearchResult {
    SearchResult {
        code: code.to_string(),
        name: crs.name().to_string(),
        url: format!("{}/epsg/{code}.json", base_url.trim_end_matches('/')),
    }
}

/// JSON-friendly rendering of a [`LookupOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResponse {
    pub exact: bool,
    pub total_hits: usize,
    pub codes: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    pub fn from_outcome(outcome: &LookupOutcome, base_url: &str) -> Self {
        match outcome {
            LookupOutcome::Exact { code, crs } => Self {
                exact: true,
                total_hits: 1,
                codes: vec![format(code, crs, base_url)],
                error: None,
            },
            LookupOutcome::Ranked {
                total_hits,
                results,
            } => Self {
                exact: false,
                total_hits: *total_hits,
                codes: results.clone(),
                error: None,
            },
            LookupOutcome::Error(message) => Self {
                exact: false,
                total_hits: 0,
                codes: Vec::new(),
                error: Some(message.clone()),
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
