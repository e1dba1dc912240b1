//! Full-text search over the catalog definitions.
//!
//! The engine talks to the index through the [`FullTextSearch`] trait; the
//! production implementation is [`CatalogIndex`], a Tantivy index holding the
//! name and WKT text of every catalog entry.

use std::path::{Path, PathBuf};

pub use error::IndexError;
use error::Result;
use itertools::izip;
use polars::prelude::DataFrame;
use tantivy::{
    Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument,
    collector::{Count, TopDocs},
    query::{QueryParser, QueryParserError},
    schema::{
        FAST, Field, INDEXED, IndexRecordOption, STORED, Schema, SchemaBuilder, TextFieldIndexing,
        TextOptions, Value,
    },
};
use tracing::{debug, info, instrument, warn};

use crate::data::{CODE_COL, NAME_COL, WKT_COL};

/// Ranked hits for one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    /// Number of matching documents, which may exceed `hits.len()`.
    pub total_hits: usize,
    /// `(code, score)` pairs in descending score order.
    pub hits: Vec<(String, f32)>,
}

/// A full-text index answering sanitized phrase queries.
pub trait FullTextSearch: Send + Sync {
    /// Run `sanitized_terms` and return at most `page_size` hits.
    fn query(&self, sanitized_terms: &str, page_size: usize) -> Result<SearchHits>;
}

/// Where the catalog index lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IndexLocation {
    /// Built in RAM at startup.
    #[default]
    InMemory,
    /// `<data dir>/tantivy_indexes/<source name>`, reused across runs.
    DataDir,
    /// An explicit directory, reused across runs.
    Directory(PathBuf),
}

impl IndexLocation {
    fn path(&self, source_name: &str) -> Option<PathBuf> {
        match self {
            Self::InMemory => None,
            Self::DataDir => Some(
                crate::data::get_data_dir()
                    .join("tantivy_indexes")
                    .join(source_name),
            ),
            Self::Directory(path) => Some(path.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CatalogFields {
    code: Field,
    name: Field,
    wkt: Field,
}

impl CatalogFields {
    fn from_schema(schema: &Schema) -> Result<Self> {
        Ok(Self {
            code: schema.get_field(CODE_COL)?,
            name: schema.get_field(NAME_COL)?,
            wkt: schema.get_field(WKT_COL)?,
        })
    }
}

/// Tantivy index over the catalog's names and definitions.
#[derive(Clone)]
pub struct CatalogIndex {
    index: Index,
    reader: IndexReader,
    fields: CatalogFields,
}

impl std::fmt::Debug for CatalogIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogIndex")
            .field("num_docs", &self.num_docs())
            .finish_non_exhaustive()
    }
}

impl CatalogIndex {
    const NAME_BOOST: f32 = 3.0;
    const WKT_BOOST: f32 = 1.0;

    pub fn schema() -> Schema {
        let mut schema_builder = SchemaBuilder::new();

        let text_indexing = TextFieldIndexing::default()
            .set_tokenizer("default")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);
        let text_options = TextOptions::default().set_indexing_options(text_indexing);

        schema_builder.add_u64_field(CODE_COL, STORED | INDEXED | FAST);
        schema_builder.add_text_field(NAME_COL, text_options.clone().set_stored());
        schema_builder.add_text_field(WKT_COL, text_options);
        schema_builder.build()
    }

    /// Create or load the index for `catalog`.
    ///
    /// A persisted index is reused when its document count matches the
    /// catalog; otherwise, or when `overwrite` is set, it is rebuilt.
    #[instrument(name = "Create Index", skip(catalog), fields(rows = catalog.height()))]
    pub fn new(
        catalog: &DataFrame,
        location: &IndexLocation,
        source_name: &str,
        overwrite: bool,
        writer_memory_bytes: usize,
    ) -> Result<Self> {
        let Some(index_path) = location.path(source_name) else {
            info!("Creating in-memory FTS index");
            let index = Index::create_in_ram(Self::schema());
            return Self::populate(index, catalog, writer_memory_bytes);
        };

        info!(path = ?index_path, "Using FTS index path.");
        if overwrite && index_path.exists() {
            info!(path = ?index_path, "Overwriting existing index directory.");
            std::fs::remove_dir_all(&index_path)?;
        }
        std::fs::create_dir_all(&index_path)?;

        if index_path.join("meta.json").exists() {
            match Self::open_existing(&index_path) {
                Ok(existing) if existing.num_docs() == catalog.height() as u64 => {
                    info!(path = ?index_path, num_docs = existing.num_docs(), "Index is up-to-date. Loaded existing index.");
                    return Ok(existing);
                }
                Ok(existing) => {
                    info!(
                        path = ?index_path,
                        actual_doc_count = existing.num_docs(),
                        expected_doc_count = catalog.height(),
                        "Index out of date (doc count mismatch). Re-indexing."
                    );
                    drop(existing);
                    Self::safely_recreate_dir(&index_path)?;
                }
                Err(e) => {
                    warn!(path = ?index_path, error = ?e, "Failed to open existing index, will re-index.");
                    Self::safely_recreate_dir(&index_path)?;
                }
            }
        }

        info!(path = ?index_path, "Creating new FTS index");
        let index = Index::create_in_dir(&index_path, Self::schema())?;
        Self::populate(index, catalog, writer_memory_bytes)
    }

    fn open_existing(path: &Path) -> Result<Self> {
        let index = Index::open_in_dir(path)?;
        Self::from_index(index)
    }

    fn from_index(index: Index) -> Result<Self> {
        let fields = CatalogFields::from_schema(&index.schema())?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(Self {
            index,
            reader,
            fields,
        })
    }

    fn safely_recreate_dir(path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_dir_all(path)?;
        }
        std::fs::create_dir_all(path)?;
        Ok(())
    }

    fn populate(index: Index, catalog: &DataFrame, writer_memory_bytes: usize) -> Result<Self> {
        let fields = CatalogFields::from_schema(&index.schema())?;
        if catalog.is_empty() {
            warn!("No data to index. Index will be empty.");
        } else {
            info!(num_rows = catalog.height(), "Populating index");
            let mut index_writer: IndexWriter = index.writer(writer_memory_bytes)?;
            Self::index_data(&mut index_writer, catalog, fields)?;
            index_writer.commit()?;
            info!("Index creation complete");
        }
        Self::from_index(index)
    }

    fn index_data(writer: &mut IndexWriter, df: &DataFrame, fields: CatalogFields) -> Result<()> {
        let code_series = df.column(CODE_COL)?.u32()?;
        let name_series = df.column(NAME_COL)?.str()?;
        let wkt_series = df.column(WKT_COL)?.str()?;

        for (code, name, wkt) in izip!(code_series, name_series, wkt_series) {
            if let (Some(code), Some(name), Some(wkt)) = (code, name, wkt) {
                let mut doc = TantivyDocument::default();
                doc.add_u64(fields.code, u64::from(code));
                doc.add_text(fields.name, name);
                doc.add_text(fields.wkt, wkt);
                writer.add_document(doc)?;
            }
        }
        Ok(())
    }

    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

impl FullTextSearch for CatalogIndex {
    #[instrument(name = "Search Text Index", skip(self), level = "debug")]
    fn query(&self, sanitized_terms: &str, page_size: usize) -> Result<SearchHits> {
        if page_size == 0 {
            return Err(anyhow::anyhow!("Search limit must be greater than zero.").into());
        }
        if sanitized_terms.trim().is_empty() {
            return Ok(SearchHits::default());
        }

        let mut parser =
            QueryParser::for_index(&self.index, vec![self.fields.name, self.fields.wkt]);
        parser.set_field_boost(self.fields.name, Self::NAME_BOOST);
        parser.set_field_boost(self.fields.wkt, Self::WKT_BOOST);
        let query = match parser.parse_query(sanitized_terms) {
            Ok(query) => query,
            // Phrases of pure punctuation tokenize to nothing.
            Err(QueryParserError::AllButQueryForbidden) => {
                debug!("Query has no searchable terms");
                return Ok(SearchHits::default());
            }
            Err(e) => return Err(e.into()),
        };

        let searcher = self.reader.searcher();
        let t_search = std::time::Instant::now();
        let (top_docs, total_hits) =
            searcher.search(&*query, &(TopDocs::with_limit(page_size), Count))?;
        debug!(
            num_results = top_docs.len(),
            total_hits,
            search_execution_seconds = t_search.elapsed().as_secs_f32(),
            "Tantivy search execution complete"
        );

        let hits = top_docs
            .into_iter()
            .map(|(score, doc_address)| {
                let doc = searcher.doc::<TantivyDocument>(doc_address)?;
                let code = doc
                    .get_first(self.fields.code)
                    .and_then(|v| v.as_u64())
                    .ok_or_else(|| anyhow::anyhow!("Failed to get code from document: {doc:?}"))?;
                Ok((code.to_string(), score))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SearchHits { total_hits, hits })
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum IndexError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Tantivy error: {0}")]
        Tantivy(#[from] tantivy::TantivyError),
        #[error("Query parse error: {0}")]
        QueryParser(#[from] tantivy::query::QueryParserError),
        #[error("DataFrame error: {0}")]
        DataFrame(#[from] polars::prelude::PolarsError),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }
    pub type Result<T> = std::result::Result<T, IndexError>;
}
