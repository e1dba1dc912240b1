//! Catalog data for the `crsfind` coordinate reference system resolver.
//!
//! The catalog is a table of EPSG definitions, one row per code, with the
//! columns `code` (`u32`), `name` and `wkt`. It ships embedded in the binary
//! and can be replaced by a properties file (`<code>=<wkt>` per line, the
//! layout used by the `epsg.properties` WKT catalogs) or a CSV file with the
//! same three columns.
use std::path::PathBuf;

use once_cell::sync::Lazy;
use polars::prelude::*;
use tracing::{info, instrument};

pub mod embedded;
pub mod sources;

pub use error::{DataError, Result};

pub const DATA_DIR_DEFAULT: &str = "./crsfind_data";

/// Column names shared by every catalog frame.
pub const CODE_COL: &str = "code";
pub const NAME_COL: &str = "name";
pub const WKT_COL: &str = "wkt";

/// Where the catalog definitions come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DataSource {
    /// The EPSG subset compiled into the library.
    #[default]
    Embedded,
    /// A properties file with one `<code>=<wkt>` entry per line.
    Properties(PathBuf),
    /// A CSV file with a header and `code`, `name`, `wkt` columns.
    Csv(PathBuf),
}

impl DataSource {
    /// Short identifier used for index directory naming.
    pub fn name(&self) -> &str {
        match self {
            Self::Embedded => "embedded",
            Self::Properties(_) => "properties",
            Self::Csv(_) => "csv",
        }
    }
}

/// Directory used for persisted indexes.
///
/// `CRSFIND_DATA_DIR` wins, then the platform data directory when the
/// `system-dirs` feature is enabled, then [`DATA_DIR_DEFAULT`].
pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    if let Ok(dir) = std::env::var("CRSFIND_DATA_DIR") {
        return PathBuf::from(dir);
    }
    system_data_dir().unwrap_or_else(|| PathBuf::from(DATA_DIR_DEFAULT))
});

#[cfg(feature = "system-dirs")]
fn system_data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "crsfind", "crsfind").map(|d| d.data_dir().to_path_buf())
}

#[cfg(not(feature = "system-dirs"))]
fn system_data_dir() -> Option<PathBuf> {
    None
}

pub fn get_data_dir() -> &'static std::path::Path {
    DATA_DIR.as_path()
}

/// Load the catalog frame for `source`, sorted by ascending code.
#[instrument(name = "Load Catalog", level = "info")]
pub fn load_catalog(source: &DataSource) -> Result<DataFrame> {
    let t_load = std::time::Instant::now();
    let lf = match source {
        DataSource::Embedded => embedded::load_embedded_catalog()?,
        DataSource::Properties(path) => {
            let text = std::fs::read_to_string(path)?;
            sources::parse_properties(&text)?.lazy()
        }
        DataSource::Csv(path) => sources::csv_catalog(path)?,
    };
    let df = lf
        .sort([CODE_COL], SortMultipleOptions::default())
        .collect()?;
    if df.height() == 0 {
        return Err(DataError::EmptyCatalog);
    }
    info!(
        rows = df.height(),
        elapsed_seconds = ?t_load.elapsed(),
        "Catalog loaded"
    );
    Ok(df)
}

mod error {
    use polars::prelude::PolarsError;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum DataError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Polars error: {0}")]
        Polars(#[from] PolarsError),
        #[error("Catalog contains no entries")]
        EmptyCatalog,
        #[error("Catalog is missing required column '{0}'")]
        MissingColumn(&'static str),
    }

    pub type Result<T> = std::result::Result<T, DataError>;
}
