//! Basic resolution in the three search modes
//!
//! This example demonstrates:
//! - Creating a finder over the embedded catalog
//! - Exact matches for WKT definitions and EPSG references
//! - Ranked keyword search

use crsfind::{CrsFinder, LookupOutcome, SearchMode};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    crsfind::init_logging(tracing::Level::WARN)?;
    let finder = CrsFinder::builder()
        .base_url("http://localhost:8080")
        .build()?;

    let esri_wgs84 = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

    println!("WKT definition:");
    print_outcome(&finder.resolve(esri_wgs84, SearchMode::Wkt)?);

    println!("\nReference 'urn:ogc:def:crs:EPSG::27700':");
    print_outcome(&finder.resolve("urn:ogc:def:crs:EPSG::27700", SearchMode::Auto)?);

    println!("\nKeywords 'UTM zone 33':");
    print_outcome(&finder.resolve("UTM zone 33", SearchMode::Keywords)?);

    println!("\nBroken definition:");
    print_outcome(&finder.resolve("PROJCS[bogus syntax", SearchMode::Wkt)?);

    Ok(())
}

fn print_outcome(outcome: &LookupOutcome) {
    match outcome {
        LookupOutcome::Exact { code, crs } => println!("  exact: EPSG:{code} {}", crs.name()),
        LookupOutcome::Ranked {
            total_hits,
            results,
        } => {
            println!("  {total_hits} hits");
            for (i, result) in results.iter().take(5).enumerate() {
                println!("  {}. EPSG:{} {} <{}>", i + 1, result.code, result.name, result.url);
            }
        }
        LookupOutcome::Error(message) => println!("  error: {message}"),
    }
}
