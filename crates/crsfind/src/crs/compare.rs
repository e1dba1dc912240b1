//! Metadata-insensitive comparison of coordinate reference systems.
//!
//! Names, aliases and authorities are ignored. What remains is the numeric
//! definition: ellipsoid, prime meridian, datum shift, units, projection
//! method and parameters, and axis directions.

use itertools::Itertools;

use super::{CoordinateSystem, Crs, Datum, LeafCrs, Parameter, PrimeMeridian, ProjectedCrs};

const RELATIVE_TOLERANCE: f64 = 1e-10;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() <= RELATIVE_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

fn approx_all(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| approx(*x, *y))
}

/// Case-folded alphanumerics only: `"False_Easting"` becomes `"falseeasting"`.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub(super) fn same_crs(a: &Crs, b: &Crs) -> bool {
    match (a, b) {
        (Crs::Leaf(a), Crs::Leaf(b)) => same_leaf(a, b),
        (Crs::Projected(a), Crs::Projected(b)) => same_projected(a, b),
        (Crs::Compound(a), Crs::Compound(b)) => {
            a.components.len() == b.components.len()
                && a.components
                    .iter()
                    .zip(&b.components)
                    .all(|(x, y)| same_crs(x, y))
        }
        _ => false,
    }
}

fn same_leaf(a: &LeafCrs, b: &LeafCrs) -> bool {
    a.kind == b.kind
        && same_datum(&a.datum, &b.datum)
        && same_prime_meridian(a.prime_meridian.as_ref(), b.prime_meridian.as_ref())
        && same_coordinate_system(&a.coordinate_system, &b.coordinate_system)
}

fn same_datum(a: &Datum, b: &Datum) -> bool {
    let same_ellipsoid = match (&a.ellipsoid, &b.ellipsoid) {
        (Some(x), Some(y)) => {
            approx(x.semi_major_axis, y.semi_major_axis)
                && approx(x.inverse_flattening, y.inverse_flattening)
        }
        (None, None) => normalize_name(&a.name) == normalize_name(&b.name),
        _ => false,
    };
    // An absent shift and an all-zero shift describe the same datum.
    let shift = |d: &Datum| {
        d.to_wgs84
            .clone()
            .filter(|s| s.iter().any(|v| *v != 0.0))
            .unwrap_or_default()
    };
    same_ellipsoid && approx_all(&shift(a), &shift(b))
}

fn same_prime_meridian(a: Option<&PrimeMeridian>, b: Option<&PrimeMeridian>) -> bool {
    let longitude = |pm: Option<&PrimeMeridian>| pm.map_or(0.0, |p| p.longitude);
    approx(longitude(a), longitude(b))
}

fn same_coordinate_system(a: &CoordinateSystem, b: &CoordinateSystem) -> bool {
    a.kind == b.kind
        && approx(a.unit.factor, b.unit.factor)
        && a.axes.len() == b.axes.len()
        && a.axes
            .iter()
            .zip(&b.axes)
            .all(|(x, y)| x.direction == y.direction)
}

fn same_projected(a: &ProjectedCrs, b: &ProjectedCrs) -> bool {
    same_leaf(&a.base, &b.base)
        && normalize_name(&a.conversion.method) == normalize_name(&b.conversion.method)
        && same_parameters(&a.conversion.parameters, &b.conversion.parameters)
        && same_coordinate_system(&a.coordinate_system, &b.coordinate_system)
}

/// Parameters are compared as a set keyed by normalized name.
fn same_parameters(a: &[Parameter], b: &[Parameter]) -> bool {
    let keyed = |params: &[Parameter]| {
        params
            .iter()
            .map(|p| (normalize_name(&p.name), p.value))
            .sorted_by(|x, y| x.0.cmp(&y.0))
            .collect::<Vec<_>>()
    };
    let (a, b) = (keyed(a), keyed(b));
    a.len() == b.len()
        && a.iter().zip(&b).all(|((na, va), (nb, vb))| {
            na == nb
                && match (va, vb) {
                    (Some(x), Some(y)) => approx(*x, *y),
                    (None, None) => true,
                    _ => false,
                }
        })
}

#[cfg(test)]
mod tests {
    use crate::crs::parse_wkt;

    const EPSG_4326: &str = r#"GEOGCS["WGS 84", DATUM["World Geodetic System 1984", SPHEROID["WGS 84", 6378137.0, 298.257223563, AUTHORITY["EPSG","7030"]], AUTHORITY["EPSG","6326"]], PRIMEM["Greenwich", 0.0, AUTHORITY["EPSG","8901"]], UNIT["degree", 0.017453292519943295], AXIS["Geodetic longitude", EAST], AXIS["Geodetic latitude", NORTH], AUTHORITY["EPSG","4326"]]"#;
    const ESRI_4326: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

    #[test]
    fn test_names_and_authorities_are_ignored() {
        let epsg = parse_wkt(EPSG_4326).unwrap();
        let esri = parse_wkt(ESRI_4326).unwrap();
        assert!(epsg.same_definition(&esri));
        assert!(esri.same_definition(&epsg));
    }

    #[test]
    fn test_ellipsoid_difference_detected() {
        let epsg = parse_wkt(EPSG_4326).unwrap();
        let grs80 = parse_wkt(&ESRI_4326.replace("298.257223563", "298.257222101")).unwrap();
        assert!(!epsg.same_definition(&grs80));
    }

    #[test]
    fn test_axis_order_matters() {
        let lat_lon = parse_wkt(&EPSG_4326.replace(
            r#"AXIS["Geodetic longitude", EAST], AXIS["Geodetic latitude", NORTH]"#,
            r#"AXIS["Lat", NORTH], AXIS["Lon", EAST]"#,
        ))
        .unwrap();
        assert!(!lat_lon.same_definition(&parse_wkt(EPSG_4326).unwrap()));
    }

    #[test]
    fn test_zero_shift_equals_missing_shift() {
        let with_zero = parse_wkt(&ESRI_4326.replace(
            "298.257223563]]",
            "298.257223563],TOWGS84[0,0,0,0,0,0,0]]",
        ))
        .unwrap();
        assert!(with_zero.same_definition(&parse_wkt(ESRI_4326).unwrap()));
    }

    #[test]
    fn test_parameter_names_normalized_and_unordered() {
        let base = r#"GEOGCS["g", DATUM["d", SPHEROID["s", 6378137, 298.257223563]], PRIMEM["Greenwich", 0], UNIT["degree", 0.0174532925199433]]"#;
        let a = parse_wkt(&format!(
            r#"PROJCS["a", {base}, PROJECTION["Transverse_Mercator"], PARAMETER["central_meridian", 15], PARAMETER["False_Easting", 500000], UNIT["m", 1]]"#
        ))
        .unwrap();
        let b = parse_wkt(&format!(
            r#"PROJCS["b", {base}, PROJECTION["transverse mercator"], PARAMETER["false_easting", 500000.0], PARAMETER["Central_Meridian", 15.0], UNIT["metre", 1.0]]"#
        ))
        .unwrap();
        let c = parse_wkt(&format!(
            r#"PROJCS["c", {base}, PROJECTION["Transverse_Mercator"], PARAMETER["central_meridian", 9], PARAMETER["false_easting", 500000], UNIT["m", 1]]"#
        ))
        .unwrap();
        assert!(a.same_definition(&b));
        assert!(!a.same_definition(&c));
    }
}
