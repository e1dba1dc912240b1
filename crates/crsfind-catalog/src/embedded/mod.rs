use polars::prelude::*;

use crate::{Result, sources::parse_properties};

/// EPSG subset compiled into the library.
const EMBEDDED_PROPERTIES: &str = include_str!("../../data/epsg.properties");

/// Load the embedded EPSG catalog.
///
/// The bundled subset covers the common geographic systems (WGS 84, NAD83,
/// ETRS89, ...), their UTM projections, a few national grids, two vertical
/// systems and the compound systems built from them.
pub fn load_embedded_catalog() -> Result<LazyFrame> {
    tracing::info!("Loading embedded EPSG catalog");
    Ok(parse_properties(EMBEDDED_PROPERTIES)?.lazy())
}
