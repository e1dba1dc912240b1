//! crsfind - Coordinate Reference System Resolution
//!
//! crsfind maps what users have at hand, a `.prj` file, a WKT string, an
//! `EPSG:` reference or a few keywords, to entries of the EPSG catalog.
//!
//! # Quick Start
//!
//! ```rust
//! use crsfind::{CrsFinder, LookupOutcome, SearchMode};
//!
//! let finder = CrsFinder::builder().base_url("http://localhost:8080").build()?;
//!
//! // A definition with an exact catalog match
//! let wkt = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
//! if let LookupOutcome::Exact { code, crs } = finder.resolve(wkt, SearchMode::Wkt)? {
//!     println!("{code}: {}", crs.name());
//! }
//!
//! // Keywords, ranked by relevance
//! if let LookupOutcome::Ranked { total_hits, results } = finder.resolve("UTM 33N", SearchMode::Auto)? {
//!     println!("{total_hits} hits, best: {:?}", results.first());
//! }
//! # Ok::<(), crsfind::error::CrsFindError>(())
//! ```
//!
//! # Search modes
//!
//! - **WKT**: parse the input as a definition and look up its code, falling
//!   back to a keyword search on the definition's names and parameters.
//! - **KEYWORDS**: full-text search over catalog names and definitions.
//! - **AUTO**: definition first, then a direct reference such as
//!   `EPSG:4326` or `urn:ogc:def:crs:EPSG::4326`, then keywords.
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

pub mod catalog;
mod config;
mod core;
pub mod crs;
pub mod error;
pub mod index;
pub mod resolve;
pub mod search;

pub use core::{CrsFinder, CrsFinderBuilder, PRJ_MAX_BYTES};

pub use catalog::{CrsCatalog, EpsgCatalog};
pub use config::{FinderConfig, FinderConfigBuilder};
pub use crs::{Crs, parse_wkt};
pub use crsfind_catalog as data;
pub use crsfind_catalog::DataSource;
pub use index::{CatalogIndex, FullTextSearch, IndexLocation, SearchHits};
pub use resolve::{
    LookupOutcome, PAGE_SIZE, Resolver, SearchMode, SearchResponse, SearchResult,
};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for crsfind.
///
/// `RUST_LOG` takes precedence over `level`. Safe to call more than once;
/// only the first call installs the subscriber.
///
/// ```rust
/// use crsfind::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), crsfind::error::CrsFindError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::CrsFindError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("tantivy=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_env() {
        let _ = init_logging(tracing::Level::WARN);
    }

    #[test]
    fn test_finder_creation() {
        setup_test_env();
        assert!(CrsFinder::new_embedded().is_ok());
    }

    #[test]
    fn test_init_logging_twice() {
        setup_test_env();
        assert!(init_logging(LevelFilter::DEBUG).is_ok());
    }
}
