//! Mode dispatch from user input to a [`LookupOutcome`].
//!
//! Every request runs exactly one pass. `WKT` parses a definition and falls
//! back to keyword search on the extracted terms when no catalog code matches;
//! `KEYWORDS` searches the sanitized input; `AUTO` tries, in order, a
//! definition parse, a direct catalog reference, and a keyword search on the
//! input with WKT markers stripped when it looks like a broken definition.
//! Input problems become [`LookupOutcome::Error`]; adapter failures are
//! returned as [`ResolveError`].

mod format;

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

pub use error::ResolveError;
use error::Result;
pub use format::{SearchResponse, SearchResult, format};
use rayon::prelude::*;
use tracing::{debug, error, instrument};

use crate::catalog::CrsCatalog;
use crate::crs::Crs;
use crate::crs::terms::extract_terms;
use crate::index::FullTextSearch;
use crate::search::{looks_like_definition, sanitize, strip_definition_markers};

/// Maximum number of ranked results per request.
pub const PAGE_SIZE: usize = 20;

/// Prefix of the message returned for definitions that do not parse.
pub const INVALID_SYNTAX: &str = "Invalid syntax: ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SearchMode {
    Wkt,
    Keywords,
    #[default]
    Auto,
}

impl FromStr for SearchMode {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wkt" => Ok(Self::Wkt),
            "keywords" => Ok(Self::Keywords),
            "auto" => Ok(Self::Auto),
            _ => Err(ResolveError::UnknownSearchMode(s.to_string())),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Wkt => "wkt",
            Self::Keywords => "keywords",
            Self::Auto => "auto",
        })
    }
}

/// The terminal state of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Exact { code: String, crs: Crs },
    Ranked {
        total_hits: usize,
        results: Vec<SearchResult>,
    },
    /// User-facing input error, e.g. a definition that does not parse.
    Error(String),
}

impl LookupOutcome {
    /// No input, no hits.
    pub fn empty() -> Self {
        Self::Ranked {
            total_hits: 0,
            results: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Ranked { total_hits: 0, results } if results.is_empty())
    }
}

/// Result of one AUTO stage.
enum Step {
    Done(LookupOutcome),
    Continue,
}

/// The resolution engine over a catalog and a text index.
#[derive(Debug, Clone)]
pub struct Resolver<C, I> {
    catalog: C,
    index: I,
}

impl<C: CrsCatalog, I: FullTextSearch> Resolver<C, I> {
    pub fn new(catalog: C, index: I) -> Self {
        Self { catalog, index }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    /// Resolve `terms` under `mode`, linking results below `base_url`.
    #[instrument(name = "Resolve", skip_all, fields(mode = %mode, terms_len = terms.len()))]
    pub fn resolve(&self, terms: &str, mode: SearchMode, base_url: &str) -> Result<LookupOutcome> {
        let terms = terms.trim();
        if terms.is_empty() {
            debug!("Empty terms");
            return Ok(LookupOutcome::empty());
        }
        let outcome = match mode {
            SearchMode::Wkt => self.resolve_definition(terms, base_url),
            SearchMode::Keywords => self.search(terms, base_url),
            SearchMode::Auto => self.resolve_auto(terms, base_url),
        };
        if let Err(e) = &outcome {
            error!(error = %e, "Search failure");
        }
        outcome
    }

    /// Resolve many requests in parallel. Each entry is independent.
    pub fn resolve_bulk<S: AsRef<str> + Sync>(
        &self,
        requests: &[(S, SearchMode)],
        base_url: &str,
    ) -> Vec<Result<LookupOutcome>> {
        requests
            .par_iter()
            .map(|(terms, mode)| self.resolve(terms.as_ref(), *mode, base_url))
            .collect()
    }

    fn resolve_definition(&self, terms: &str, base_url: &str) -> Result<LookupOutcome> {
        match self.catalog.parse_definition(terms) {
            Ok(crs) => self.exact_or_ranked(crs, base_url),
            Err(e) => {
                debug!(error = %e, "Definition does not parse");
                Ok(LookupOutcome::Error(format!("{INVALID_SYNTAX}{}", e.message())))
            }
        }
    }

    fn exact_or_ranked(&self, crs: Crs, base_url: &str) -> Result<LookupOutcome> {
        match self.catalog.lookup_code(&crs)? {
            Some(code) => {
                debug!(%code, "Exact catalog match");
                Ok(LookupOutcome::Exact { code, crs })
            }
            None => {
                debug!("No exact match, searching extracted terms");
                self.search(&extract_terms(&crs), base_url)
            }
        }
    }

    fn resolve_auto(&self, terms: &str, base_url: &str) -> Result<LookupOutcome> {
        if let Step::Done(outcome) = self.definition_step(terms, base_url)? {
            return Ok(outcome);
        }
        if let Step::Done(outcome) = self.reference_step(terms)? {
            return Ok(outcome);
        }
        let cleaned = Self::cleanup_step(terms);
        self.search(&cleaned, base_url)
    }

    fn definition_step(&self, terms: &str, base_url: &str) -> Result<Step> {
        match self.catalog.parse_definition(terms) {
            Ok(crs) => {
                debug!(stage = "definition", "Input parsed as a definition");
                self.exact_or_ranked(crs, base_url).map(Step::Done)
            }
            Err(e) => {
                debug!(error = %e, "Not a definition");
                Ok(Step::Continue)
            }
        }
    }

    fn reference_step(&self, terms: &str) -> Result<Step> {
        Ok(match self.catalog.resolve_reference(terms)? {
            Some((code, crs)) => {
                debug!(stage = "reference", %code, "Input resolved as a catalog reference");
                Step::Done(LookupOutcome::Exact { code, crs })
            }
            None => Step::Continue,
        })
    }

    fn cleanup_step(terms: &str) -> Cow<'_, str> {
        if looks_like_definition(terms) {
            debug!(stage = "cleanup", "Stripping definition markers");
            Cow::Owned(strip_definition_markers(terms))
        } else {
            Cow::Borrowed(terms)
        }
    }

    fn search(&self, terms: &str, base_url: &str) -> Result<LookupOutcome> {
        let sanitized = sanitize(terms);
        if sanitized.is_empty() {
            return Ok(LookupOutcome::empty());
        }
        let hits = self.index.query(&sanitized, PAGE_SIZE)?;
        debug!(stage = "search", total_hits = hits.total_hits, "Ranked search complete");

        let results = hits
            .hits
            .iter()
            .map(|(code, _score)| {
                self.catalog
                    .decode(code)
                    .map(|crs| format(code, &crs, base_url))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(LookupOutcome::Ranked {
            total_hits: hits.total_hits,
            results,
        })
    }
}

mod error {
    use thiserror::Error;

    use crate::catalog::CatalogError;
    use crate::index::IndexError;

    #[derive(Error, Debug)]
    pub enum ResolveError {
        #[error("Catalog failure: {0}")]
        Catalog(#[from] CatalogError),
        #[error("Index failure: {0}")]
        Index(#[from] IndexError),
        #[error("Unknown search mode '{0}', expected wkt, keywords or auto")]
        UnknownSearchMode(String),
    }

    pub type Result<T> = std::result::Result<T, ResolveError>;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::catalog::EpsgCatalog;
    use crate::data::{DataSource, load_catalog};
    use crate::index::{IndexError, SearchHits};

    /// Records every query and answers with fixed hits.
    #[derive(Default)]
    struct RecordingIndex {
        queries: Mutex<Vec<String>>,
        hits: SearchHits,
    }

    impl RecordingIndex {
        fn answering(codes: &[&str], total_hits: usize) -> Self {
            Self {
                queries: Mutex::default(),
                hits: SearchHits {
                    total_hits,
                    hits: codes.iter().map(|c| ((*c).to_string(), 1.0)).collect(),
                },
            }
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl FullTextSearch for RecordingIndex {
        fn query(&self, sanitized_terms: &str, page_size: usize) -> std::result::Result<SearchHits, IndexError> {
            assert_eq!(page_size, PAGE_SIZE);
            self.queries.lock().unwrap().push(sanitized_terms.to_string());
            Ok(self.hits.clone())
        }
    }

    struct FailingIndex;

    impl FullTextSearch for FailingIndex {
        fn query(&self, _: &str, _: usize) -> std::result::Result<SearchHits, IndexError> {
            Err(anyhow::anyhow!("index offline").into())
        }
    }

    fn catalog() -> EpsgCatalog {
        EpsgCatalog::from_frame(&load_catalog(&DataSource::Embedded).unwrap()).unwrap()
    }

    fn resolver(index: RecordingIndex) -> Resolver<EpsgCatalog, RecordingIndex> {
        Resolver::new(catalog(), index)
    }

    const WGS84: &str = r#"GEOGCS["WGS 84", DATUM["WGS_1984", SPHEROID["WGS 84", 6378137, 298.257223563]], PRIMEM["Greenwich", 0], UNIT["degree", 0.0174532925199433]]"#;
    const CUSTOM_TM: &str = r#"PROJCS["Custom TM", GEOGCS["WGS 84", DATUM["WGS_1984", SPHEROID["WGS 84", 6378137, 298.257223563]], PRIMEM["Greenwich", 0], UNIT["degree", 0.0174532925199433]], PROJECTION["Transverse_Mercator"], PARAMETER["central_meridian", 7.5], PARAMETER["scale_factor", 0.9999], PARAMETER["false_easting", 300000], UNIT["metre", 1]]"#;

    #[test]
    fn test_search_mode_from_str() {
        assert_eq!("WKT".parse::<SearchMode>().unwrap(), SearchMode::Wkt);
        assert_eq!("keywords".parse::<SearchMode>().unwrap(), SearchMode::Keywords);
        assert_eq!(" Auto ".parse::<SearchMode>().unwrap(), SearchMode::Auto);
        assert!(matches!(
            "fuzzy".parse::<SearchMode>(),
            Err(ResolveError::UnknownSearchMode(m)) if m == "fuzzy"
        ));
        assert_eq!(SearchMode::default(), SearchMode::Auto);
    }

    #[test]
    fn test_wkt_exact_match() {
        let resolver = resolver(RecordingIndex::default());
        let outcome = resolver.resolve(WGS84, SearchMode::Wkt, "").unwrap();
        let LookupOutcome::Exact { code, crs } = outcome else {
            panic!("expected exact outcome, got {outcome:?}");
        };
        assert_eq!(code, "4326");
        assert_eq!(crs.name(), "WGS 84");
        assert!(resolver.index().queries().is_empty());
    }

    #[test]
    fn test_wkt_syntax_error_skips_index() {
        let resolver = resolver(RecordingIndex::default());
        let outcome = resolver.resolve("PROJCS[bogus syntax", SearchMode::Wkt, "").unwrap();
        let LookupOutcome::Error(message) = outcome else {
            panic!("expected error outcome, got {outcome:?}");
        };
        assert!(message.starts_with(INVALID_SYNTAX));
        assert!(message.contains("offset"));
        assert!(resolver.index().queries().is_empty());
    }

    #[test]
    fn test_wkt_without_code_searches_extracted_terms() {
        let resolver = resolver(RecordingIndex::answering(&["32632", "32631"], 7));
        let outcome = resolver.resolve(CUSTOM_TM, SearchMode::Wkt, "http://h/").unwrap();

        let crs = crate::crs::parse_wkt(CUSTOM_TM).unwrap();
        assert_eq!(resolver.index().queries(), vec![sanitize(&extract_terms(&crs))]);
        let LookupOutcome::Ranked { total_hits, results } = outcome else {
            panic!("expected ranked outcome, got {outcome:?}");
        };
        assert_eq!(total_hits, 7);
        let codes: Vec<&str> = results.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["32632", "32631"]);
        assert_eq!(results[0].name, "WGS 84 / UTM zone 32N");
        assert_eq!(results[0].url, "http://h/epsg/32632.json");
    }

    #[test]
    fn test_keywords_are_sanitized() {
        let resolver = resolver(RecordingIndex::default());
        resolver
            .resolve("WGS AND 84 name:* 'UTM zone'", SearchMode::Keywords, "")
            .unwrap();
        assert_eq!(
            resolver.index().queries(),
            vec![r#""WGS" "AND" "84" "name:*" "UTM zone""#.to_string()]
        );
    }

    #[test]
    fn test_empty_terms_short_circuit() {
        let resolver = resolver(RecordingIndex::default());
        for mode in [SearchMode::Keywords, SearchMode::Wkt, SearchMode::Auto] {
            let outcome = resolver.resolve("  \n ", mode, "").unwrap();
            assert!(outcome.is_empty(), "{mode}");
        }
        let outcome = resolver.resolve("\"\" ''", SearchMode::Keywords, "").unwrap();
        assert!(outcome.is_empty());
        assert!(resolver.index().queries().is_empty());
    }

    #[test]
    fn test_auto_definition_stage() {
        let resolver = resolver(RecordingIndex::default());
        let outcome = resolver.resolve(WGS84, SearchMode::Auto, "").unwrap();
        assert!(matches!(outcome, LookupOutcome::Exact { ref code, .. } if code == "4326"));
    }

    #[test]
    fn test_auto_reference_stage() {
        let resolver = resolver(RecordingIndex::default());
        let outcome = resolver.resolve("EPSG:32633", SearchMode::Auto, "").unwrap();
        let LookupOutcome::Exact { code, crs } = outcome else {
            panic!("expected exact outcome, got {outcome:?}");
        };
        assert_eq!(code, "32633");
        assert_eq!(crs.name(), "WGS 84 / UTM zone 33N");
        assert!(resolver.index().queries().is_empty());
    }

    #[test]
    fn test_auto_strips_markers_from_broken_definition() {
        let resolver = resolver(RecordingIndex::default());
        let broken = "PROJCS[\"Broken UTM\",\nGEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563]],\
                      PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]],\
                      PROJECTION[\"Transverse_Mercator\"],PARAMETER[\"central_meridian\",15],AXIS[\"E\",EAST],\
                      AUTHORITY[\"EPSG\",\"32633\"";
        let outcome = resolver.resolve(broken, SearchMode::Auto, "").unwrap();
        assert!(outcome.is_empty());

        let queries = resolver.index().queries();
        assert_eq!(queries.len(), 1);
        for marker in [
            "PROJCS", "GEOGCS", "DATUM", "SPHEROID", "PRIMEM", "UNIT", "PROJECTION", "PARAMETER",
            "AXIS", "AUTHORITY", "[", "]",
        ] {
            assert!(!queries[0].contains(marker), "{marker} left in {}", queries[0]);
        }
        assert!(queries[0].contains("\"Broken UTM\""));
        assert!(queries[0].contains("\"Transverse_Mercator\""));
    }

    #[test]
    fn test_auto_plain_keywords() {
        let resolver = resolver(RecordingIndex::answering(&["4326"], 1));
        let outcome = resolver.resolve("WGS 84", SearchMode::Auto, "").unwrap();
        assert_eq!(resolver.index().queries(), vec![r#""WGS" "84""#.to_string()]);
        let LookupOutcome::Ranked { total_hits, results } = outcome else {
            panic!("expected ranked outcome, got {outcome:?}");
        };
        assert_eq!(total_hits, 1);
        assert!(results[0].name.contains("WGS 84"));
    }

    #[test]
    fn test_index_failure_is_a_fault() {
        let resolver = Resolver::new(catalog(), FailingIndex);
        let err = resolver.resolve("WGS 84", SearchMode::Keywords, "").unwrap_err();
        assert!(matches!(err, ResolveError::Index(_)));
    }

    #[test]
    fn test_undecodable_hit_is_a_fault() {
        let resolver = resolver(RecordingIndex::answering(&["4326", "999999"], 2));
        let err = resolver.resolve("WGS 84", SearchMode::Keywords, "").unwrap_err();
        assert!(matches!(err, ResolveError::Catalog(_)));
    }

    #[test]
    fn test_resolve_bulk_keeps_order() {
        let resolver = resolver(RecordingIndex::default());
        let requests = [
            ("EPSG:4326", SearchMode::Auto),
            ("PROJCS[bogus syntax", SearchMode::Wkt),
            ("", SearchMode::Keywords),
            (WGS84, SearchMode::Wkt),
        ];
        let outcomes = resolver.resolve_bulk(&requests, "");
        assert_eq!(outcomes.len(), 4);
        assert!(matches!(&outcomes[0], Ok(LookupOutcome::Exact { code, .. }) if code == "4326"));
        assert!(matches!(&outcomes[1], Ok(LookupOutcome::Error(_))));
        assert!(matches!(&outcomes[2], Ok(o) if o.is_empty()));
        assert!(matches!(&outcomes[3], Ok(LookupOutcome::Exact { code, .. }) if code == "4326"));
    }
}
