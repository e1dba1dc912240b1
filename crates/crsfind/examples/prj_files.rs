//! Resolving `.prj` files
//!
//! Usage: `cargo run --example prj_files -- path/to/file.prj [more.prj ...]`
//!
//! Each file is resolved in AUTO mode and printed as the JSON response a web
//! front end would return. Without arguments a sample file is written to a
//! temporary directory first.

use std::path::PathBuf;

use crsfind::{CrsFinder, SearchMode, SearchResponse};

const SAMPLE_PRJ: &str = r#"PROJCS["RD_New",GEOGCS["GCS_Amersfoort",DATUM["D_Amersfoort",SPHEROID["Bessel_1841",6377397.155,299.1528128]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Double_Stereographic"],PARAMETER["False_Easting",155000.0],PARAMETER["False_Northing",463000.0],PARAMETER["Central_Meridian",5.38763888888889],PARAMETER["Scale_Factor",0.9999079],PARAMETER["Latitude_Of_Origin",52.15616055555555],UNIT["Meter",1.0]]"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    crsfind::init_logging(tracing::Level::INFO)?;
    let finder = CrsFinder::builder().base_url("http://localhost:8080").build()?;

    let mut paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    let _sample_dir = if paths.is_empty() {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("rd_new.prj");
        std::fs::write(&path, SAMPLE_PRJ)?;
        paths.push(path);
        Some(dir)
    } else {
        None
    };

    for path in &paths {
        let outcome = finder.resolve_prj_file(path, SearchMode::Auto)?;
        let response = SearchResponse::from_outcome(&outcome, finder.base_url());
        println!("{}: {}", path.display(), response.to_json()?);
    }
    Ok(())
}
