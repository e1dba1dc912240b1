use crate::{data::DataSource, index::IndexLocation};

/// How a [`CrsFinder`](crate::CrsFinder) opens its catalog and index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinderConfig {
    /// Prefix of the record URLs, e.g. `http://localhost:8080`.
    pub base_url: String,
    pub data_source: DataSource,
    pub index_location: IndexLocation,
    /// Rebuild a persisted index even when it is up to date.
    pub rebuild_index: bool,
    /// Memory budget for the index writer.
    pub writer_memory_bytes: usize,
}

impl FinderConfig {
    pub const DEFAULT_WRITER_MEMORY_BYTES: usize = 50_000_000;

    pub fn builder() -> FinderConfigBuilder {
        FinderConfigBuilder::new()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            data_source: DataSource::default(),
            index_location: IndexLocation::default(),
            rebuild_index: false,
            writer_memory_bytes: Self::DEFAULT_WRITER_MEMORY_BYTES,
        }
    }
}

/// Builder for [`FinderConfig`] with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct FinderConfigBuilder {
    config: FinderConfig,
}

impl FinderConfigBuilder {
    /// Create a new builder with the embedded catalog and an in-memory index
    pub fn new() -> Self {
        Self {
            config: FinderConfig::default(),
        }
    }

    /// Persist the index under the data directory
    pub fn persistent() -> Self {
        Self::new().index_location(IndexLocation::DataDir)
    }

    /// Set the prefix used for result URLs
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Set the catalog source
    pub fn data_source(mut self, source: DataSource) -> Self {
        self.config.data_source = source;
        self
    }

    /// Set where the index lives
    pub fn index_location(mut self, location: IndexLocation) -> Self {
        self.config.index_location = location;
        self
    }

    /// Force rebuilding of a persisted index
    pub fn rebuild_index(mut self, rebuild: bool) -> Self {
        self.config.rebuild_index = rebuild;
        self
    }

    /// Set the index writer memory budget, at least 15 MB
    pub fn writer_memory_bytes(mut self, bytes: usize) -> Self {
        self.config.writer_memory_bytes = bytes.max(15_000_000);
        self
    }

    /// Build the final configuration
    pub fn build(self) -> FinderConfig {
        self.config
    }
}
