//! The EPSG catalog: definition parsing, exact-code lookup and decoding.

use ahash::AHashMap as HashMap;
pub use error::CatalogError;
use error::Result;
use itertools::izip;
use once_cell::sync::Lazy;
use polars::prelude::DataFrame;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::crs::{Crs, ParseError, normalize_name, parse_wkt};
use crate::data::{CODE_COL, WKT_COL};

/// Adapter over a catalog of coordinate reference systems.
pub trait CrsCatalog: Send + Sync {
    /// Parse `text` as a structured definition.
    fn parse_definition(&self, text: &str) -> std::result::Result<Crs, ParseError>;

    /// The catalog code describing the same system as `crs`, if any.
    fn lookup_code(&self, crs: &Crs) -> Result<Option<String>>;

    /// Resolve a direct reference such as `EPSG:4326` to its code and system.
    fn resolve_reference(&self, text: &str) -> Result<Option<(String, Crs)>>;

    /// The system stored under `code`.
    fn decode(&self, code: &str) -> Result<Crs>;
}

/// `EPSG:4326`, `4326`, OGC URNs with or without a version, and the GML and
/// OGC definition URLs.
static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)^
        (?:
            (?:urn:ogc:def:crs:)?epsg:(?:[0-9.]*:)?
          | https?://www\.opengis\.net/gml/srs/epsg\.xml\#
          | https?://www\.opengis\.net/def/crs/epsg/[0-9.]+/
        )?
        ([0-9]+)$",
    )
    .expect("valid regex")
});

/// Parse the numeric code out of a catalog reference.
pub fn reference_code(text: &str) -> Option<u32> {
    REFERENCE
        .captures(text.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// In-memory catalog with every definition parsed once at load time.
#[derive(Debug, Clone)]
pub struct EpsgCatalog {
    /// Ascending by code.
    entries: Vec<(u32, Crs)>,
    by_code: HashMap<u32, usize>,
}

impl EpsgCatalog {
    /// Build from a catalog frame sorted by code. Entries whose definition
    /// does not parse are skipped.
    #[instrument(name = "Build Catalog", skip_all, fields(rows = catalog.height()))]
    pub fn from_frame(catalog: &DataFrame) -> Result<Self> {
        let codes = catalog.column(CODE_COL)?.u32()?;
        let wkts = catalog.column(WKT_COL)?.str()?;

        let mut entries = Vec::with_capacity(catalog.height());
        let mut skipped = 0usize;
        for (code, wkt) in izip!(codes, wkts) {
            let (Some(code), Some(wkt)) = (code, wkt) else {
                skipped += 1;
                continue;
            };
            match parse_wkt(wkt) {
                Ok(crs) => entries.push((code, crs)),
                Err(e) => {
                    warn!(code, error = %e, "Skipping catalog entry that does not parse");
                    skipped += 1;
                }
            }
        }
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        entries.sort_by_key(|(code, _)| *code);
        entries.dedup_by_key(|(code, _)| *code);

        let by_code = entries
            .iter()
            .enumerate()
            .map(|(i, (code, _))| (*code, i))
            .collect();
        info!(entries = entries.len(), skipped, "Catalog ready");
        Ok(Self { entries, by_code })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Codes in ascending order.
    pub fn codes(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|(code, _)| *code)
    }

    fn get(&self, code: u32) -> Option<&Crs> {
        self.by_code.get(&code).map(|&i| &self.entries[i].1)
    }

    /// The declared EPSG authority, when it names an entry describing the same system.
    fn authority_match(&self, crs: &Crs) -> Option<u32> {
        let code = crs.epsg_code()?.trim().parse::<u32>().ok()?;
        self.get(code)
            .filter(|candidate| candidate.same_definition(crs))
            .map(|_| code)
    }

    /// First equal entry in ascending code order; among several, prefer a
    /// matching datum name, then a matching system name.
    fn scan_match(&self, crs: &Crs) -> Option<u32> {
        let datum = crs.geodetic_datum_name().map(normalize_name);
        let name = normalize_name(crs.name());
        self.entries
            .iter()
            .filter(|(_, candidate)| candidate.same_definition(crs))
            .min_by_key(|(_, candidate)| {
                let datum_differs = candidate.geodetic_datum_name().map(normalize_name) != datum;
                let name_differs = normalize_name(candidate.name()) != name;
                (datum_differs, name_differs)
            })
            .map(|(code, _)| *code)
    }
}

impl CrsCatalog for EpsgCatalog {
    fn parse_definition(&self, text: &str) -> std::result::Result<Crs, ParseError> {
        parse_wkt(text)
    }

    #[instrument(name = "Lookup Code", skip_all, level = "debug", fields(name = crs.name()))]
    fn lookup_code(&self, crs: &Crs) -> Result<Option<String>> {
        if let Some(code) = self.authority_match(crs) {
            debug!(code, "Declared authority confirmed");
            return Ok(Some(code.to_string()));
        }
        let found = self.scan_match(crs);
        debug!(code = ?found, "Catalog scan complete");
        Ok(found.map(|code| code.to_string()))
    }

    fn resolve_reference(&self, text: &str) -> Result<Option<(String, Crs)>> {
        Ok(reference_code(text)
            .and_then(|code| self.get(code).map(|crs| (code.to_string(), crs.clone()))))
    }

    fn decode(&self, code: &str) -> Result<Crs> {
        code.trim()
            .parse::<u32>()
            .ok()
            .and_then(|c| self.get(c))
            .cloned()
            .ok_or_else(|| CatalogError::UnknownCode(code.to_string()))
    }
}

mod error {
    use thiserror::Error;

    use crate::data::DataError;

    #[derive(Error, Debug)]
    pub enum CatalogError {
        #[error("Unknown catalog code: {0}")]
        UnknownCode(String),
        #[error("Catalog contains no usable definitions")]
        Empty,
        #[error("Catalog data error: {0}")]
        Data(#[from] DataError),
        #[error("DataFrame error: {0}")]
        DataFrame(#[from] polars::prelude::PolarsError),
    }

    pub type Result<T> = std::result::Result<T, CatalogError>;
}

#[cfg(test)]
mod tests {
    use polars::prelude::*;

    use super::*;
    use crate::data::{DataSource, NAME_COL, load_catalog};

    fn embedded() -> EpsgCatalog {
        EpsgCatalog::from_frame(&load_catalog(&DataSource::Embedded).unwrap()).unwrap()
    }

    #[test]
    fn test_reference_forms() {
        for text in [
            "EPSG:4326",
            "epsg:4326",
            "4326",
            " 4326 ",
            "urn:ogc:def:crs:EPSG::4326",
            "urn:ogc:def:crs:EPSG:6.6:4326",
            "http://www.opengis.net/gml/srs/epsg.xml#4326",
            "http://www.opengis.net/def/crs/EPSG/0/4326",
        ] {
            assert_eq!(reference_code(text), Some(4326), "{text}");
        }
        for text in ["WGS 84", "EPSG", "EPSG:", "EPSG:43x6", "CRS:84", "99999999999999"] {
            assert_eq!(reference_code(text), None, "{text}");
        }
    }

    #[test]
    fn test_resolve_reference() {
        let catalog = embedded();
        let (code, crs) = catalog.resolve_reference("EPSG:32633").unwrap().unwrap();
        assert_eq!(code, "32633");
        assert_eq!(crs.name(), "WGS 84 / UTM zone 33N");
        assert!(catalog.resolve_reference("EPSG:1").unwrap().is_none());
        assert!(catalog.resolve_reference("WGS 84").unwrap().is_none());
    }

    #[test]
    fn test_decode() {
        let catalog = embedded();
        assert_eq!(catalog.decode("4326").unwrap().name(), "WGS 84");
        assert!(matches!(
            catalog.decode("1"),
            Err(CatalogError::UnknownCode(code)) if code == "1"
        ));
        assert!(matches!(catalog.decode("abc"), Err(CatalogError::UnknownCode(_))));
    }

    #[test]
    fn test_lookup_without_authority() {
        let catalog = embedded();
        let esri = catalog
            .parse_definition(r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#)
            .unwrap();
        assert_eq!(catalog.lookup_code(&esri).unwrap().as_deref(), Some("4326"));
    }

    #[test]
    fn test_lookup_prefers_matching_datum_among_equals() {
        let catalog = embedded();
        let nad83 = catalog
            .parse_definition(r#"GEOGCS["NAD83", DATUM["North American Datum 1983", SPHEROID["GRS 1980", 6378137.0, 298.257222101]], PRIMEM["Greenwich", 0.0], UNIT["degree", 0.017453292519943295]]"#)
            .unwrap();
        assert_eq!(catalog.lookup_code(&nad83).unwrap().as_deref(), Some("4269"));
    }

    #[test]
    fn test_declared_authority_must_agree() {
        let catalog = embedded();
        // Declares 4326 but uses the GRS 1980 ellipsoid.
        let mislabelled = catalog
            .parse_definition(r#"GEOGCS["ETRS89", DATUM["European Terrestrial Reference System 1989", SPHEROID["GRS 1980", 6378137.0, 298.257222101]], PRIMEM["Greenwich", 0.0], UNIT["degree", 0.017453292519943295], AUTHORITY["EPSG","4326"]]"#)
            .unwrap();
        assert_eq!(
            catalog.lookup_code(&mislabelled).unwrap().as_deref(),
            Some("4258")
        );
    }

    #[test]
    fn test_lookup_not_found() {
        let catalog = embedded();
        let custom = catalog
            .parse_definition(r#"GEOGCS["Mars", DATUM["Mars 2000", SPHEROID["Mars", 3396190.0, 169.894447223612]], PRIMEM["Reference", 0.0], UNIT["degree", 0.017453292519943295]]"#)
            .unwrap();
        assert_eq!(catalog.lookup_code(&custom).unwrap(), None);
    }

    #[test]
    fn test_every_embedded_entry_round_trips() {
        let catalog = embedded();
        for code in catalog.codes().collect::<Vec<_>>() {
            let crs = catalog.decode(&code.to_string()).unwrap();
            assert_eq!(
                catalog.lookup_code(&crs).unwrap(),
                Some(code.to_string()),
                "{crs}"
            );
        }
    }

    #[test]
    fn test_unparsable_entries_skipped() {
        let frame = df!(
            CODE_COL => [1u32, 2],
            NAME_COL => ["broken", "ok"],
            WKT_COL => [
                "GEOGCS[\"broken\"",
                "GEOGCS[\"ok\", DATUM[\"d\", SPHEROID[\"s\", 6378137, 298.257223563]]]",
            ],
        )
        .unwrap();
        let catalog = EpsgCatalog::from_frame(&frame).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.decode("1").is_err());
        assert_eq!(catalog.decode("2").unwrap().name(), "ok");
    }

    #[test]
    fn test_no_usable_entries_is_error() {
        let frame = df!(
            CODE_COL => [1u32],
            NAME_COL => ["broken"],
            WKT_COL => ["not wkt"],
        )
        .unwrap();
        assert!(matches!(
            EpsgCatalog::from_frame(&frame),
            Err(CatalogError::Empty)
        ));
    }
}
