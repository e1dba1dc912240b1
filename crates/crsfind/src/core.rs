//! The [`CrsFinder`] facade.
//!
//! A finder loads the catalog and opens its text index once, then answers any
//! number of concurrent requests through the [`Resolver`].
//!
//! ```rust
//! use crsfind::{CrsFinder, LookupOutcome, SearchMode};
//!
//! let finder = CrsFinder::new_embedded()?;
//! let outcome = finder.resolve("EPSG:4326", SearchMode::Auto)?;
//! assert!(matches!(outcome, LookupOutcome::Exact { ref code, .. } if code == "4326"));
//! # Ok::<(), crsfind::error::CrsFindError>(())
//! ```

use std::{io::Read, path::Path};

use tracing::{info, instrument};

use crate::{
    catalog::EpsgCatalog,
    config::FinderConfig,
    data::{DataSource, load_catalog},
    error::{CrsFindError, Result},
    index::{CatalogIndex, IndexLocation},
    resolve::{LookupOutcome, Resolver, SearchMode, SearchResponse},
};

/// Largest `.prj` file accepted by [`CrsFinder::resolve_prj_file`].
pub const PRJ_MAX_BYTES: u64 = 64 * 1024;

/// Resolves definitions and keywords against one catalog.
#[derive(Debug, Clone)]
pub struct CrsFinder {
    resolver: Resolver<EpsgCatalog, CatalogIndex>,
    base_url: String,
}

impl CrsFinder {
    /// Open a finder for `config`, building or reusing its index.
    #[instrument(name = "Initialize CrsFinder", level = "info", skip_all, fields(source = config.data_source.name()))]
    pub fn new(config: FinderConfig) -> Result<Self> {
        let t_init = std::time::Instant::now();
        let frame = load_catalog(&config.data_source)?;
        let catalog = EpsgCatalog::from_frame(&frame)?;
        let index = CatalogIndex::new(
            &frame,
            &config.index_location,
            config.data_source.name(),
            config.rebuild_index,
            config.writer_memory_bytes,
        )?;
        info!(
            entries = catalog.len(),
            indexed = index.num_docs(),
            elapsed_seconds = ?t_init.elapsed(),
            "CrsFinder ready"
        );
        Ok(Self {
            resolver: Resolver::new(catalog, index),
            base_url: config.base_url,
        })
    }

    /// Finder over the embedded catalog with an in-memory index.
    pub fn new_embedded() -> Result<Self> {
        Self::new(FinderConfig::default())
    }

    pub fn builder() -> CrsFinderBuilder {
        CrsFinderBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn resolver(&self) -> &Resolver<EpsgCatalog, CatalogIndex> {
        &self.resolver
    }

    pub fn resolve(&self, terms: &str, mode: SearchMode) -> Result<LookupOutcome> {
        Ok(self.resolver.resolve(terms, mode, &self.base_url)?)
    }

    /// Like [`resolve`](Self::resolve) with the mode given by name.
    pub fn resolve_with_mode_name(&self, terms: &str, mode: &str) -> Result<LookupOutcome> {
        self.resolve(terms, mode.parse::<SearchMode>()?)
    }

    /// Resolve and render the outcome for a JSON transport.
    pub fn respond(&self, terms: &str, mode: SearchMode) -> Result<SearchResponse> {
        let outcome = self.resolve(terms, mode)?;
        Ok(SearchResponse::from_outcome(&outcome, &self.base_url))
    }

    /// Resolve a batch of requests in parallel, one result per request.
    pub fn resolve_bulk<S: AsRef<str> + Sync>(
        &self,
        requests: &[(S, SearchMode)],
    ) -> Vec<Result<LookupOutcome>> {
        self.resolver
            .resolve_bulk(requests, &self.base_url)
            .into_iter()
            .map(|outcome| outcome.map_err(CrsFindError::from))
            .collect()
    }

    /// Resolve the contents of a `.prj` file.
    #[instrument(name = "Resolve prj file", level = "debug", skip(self))]
    pub fn resolve_prj_file(&self, path: &Path, mode: SearchMode) -> Result<LookupOutcome> {
        let file = std::fs::File::open(path)?;
        let size = file.metadata()?.len();
        if size > PRJ_MAX_BYTES {
            return Err(CrsFindError::DefinitionTooLarge {
                size,
                limit: PRJ_MAX_BYTES,
            });
        }
        let mut contents = String::new();
        file.take(PRJ_MAX_BYTES).read_to_string(&mut contents)?;
        self.resolve(&contents, mode)
    }
}

/// Builder for [`CrsFinder`].
#[derive(Debug, Clone)]
pub struct CrsFinderBuilder {
    config: FinderConfig,
}

impl CrsFinderBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: FinderConfig::default(),
        }
    }

    /// Start from an existing configuration.
    #[must_use]
    pub fn config(mut self, config: FinderConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the data source.
    #[must_use]
    pub fn data_source(mut self, source: DataSource) -> Self {
        self.config.data_source = source;
        self
    }

    /// Set the prefix for result URLs.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Set where the index lives.
    #[must_use]
    pub fn index_location(mut self, location: IndexLocation) -> Self {
        self.config.index_location = location;
        self
    }

    /// Force rebuilding of indexes.
    #[must_use]
    pub fn force_rebuild(mut self, rebuild: bool) -> Self {
        self.config.rebuild_index = rebuild;
        self
    }

    /// Build the `CrsFinder`.
    pub fn build(self) -> Result<CrsFinder> {
        CrsFinder::new(self.config)
    }
}

impl Default for CrsFinderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prj_file_resolution() {
        let finder = CrsFinder::builder()
            .base_url("http://localhost")
            .build()
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wgs84.prj");
        std::fs::write(
            &path,
            r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#,
        )
        .unwrap();

        let outcome = finder.resolve_prj_file(&path, SearchMode::Auto).unwrap();
        assert!(matches!(outcome, LookupOutcome::Exact { ref code, .. } if code == "4326"));
    }

    #[test]
    fn test_oversized_prj_rejected() {
        let finder = CrsFinder::new_embedded().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.prj");
        std::fs::write(&path, "x".repeat(PRJ_MAX_BYTES as usize + 1)).unwrap();

        let err = finder.resolve_prj_file(&path, SearchMode::Wkt).unwrap_err();
        assert!(matches!(
            err,
            CrsFindError::DefinitionTooLarge { size, limit } if size == PRJ_MAX_BYTES + 1 && limit == PRJ_MAX_BYTES
        ));
    }

    #[test]
    fn test_mode_by_name() {
        let finder = CrsFinder::new_embedded().unwrap();
        assert!(finder.resolve_with_mode_name("4326", "AUTO").is_ok());
        assert!(matches!(
            finder.resolve_with_mode_name("4326", "exact"),
            Err(CrsFindError::ResolveError(_))
        ));
    }

    #[test]
    fn test_respond_renders_urls() {
        let finder = CrsFinder::builder()
            .base_url("http://localhost:8080/")
            .build()
            .unwrap();
        let response = finder.respond("EPSG:27700", SearchMode::Auto).unwrap();
        assert!(response.exact);
        assert_eq!(response.codes[0].name, "OSGB 1936 / British National Grid");
        assert_eq!(response.codes[0].url, "http://localhost:8080/epsg/27700.json");
    }
}
