use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrsFindError {
    #[error("Resolve error: {0}")]
    ResolveError(#[from] crate::resolve::ResolveError),
    #[error("Catalog error: {0}")]
    CatalogError(#[from] crate::catalog::CatalogError),
    #[error("Index error: {0}")]
    IndexError(#[from] crate::index::IndexError),
    #[error("Data processing error: {0}")]
    DataProcessing(#[from] crsfind_catalog::DataError),
    #[error("DataFrame error: {0}")]
    DataFrame(#[from] polars::prelude::PolarsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Definition is {size} bytes, the limit is {limit}")]
    DefinitionTooLarge { size: u64, limit: u64 },
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CrsFindError>;
