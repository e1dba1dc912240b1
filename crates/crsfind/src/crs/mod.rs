//! In-memory representation of coordinate reference systems.
//!
//! A [`Crs`] is a closed tree: a leaf system (geographic, geocentric or
//! vertical), a projected system made of a geographic base and a
//! [`Conversion`], or a compound system with ordered children. Definitions are
//! produced by the WKT parser in [`wkt`] and compared to catalog entries with
//! [`Crs::same_definition`].

mod compare;
pub mod terms;
pub mod wkt;

use std::fmt;

pub use compare::normalize_name;
pub use wkt::{ParseError, parse_wkt};

/// An `AUTHORITY["EPSG","4326"]` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    pub name: String,
    pub code: String,
}

impl Authority {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }

    pub fn is_epsg(&self) -> bool {
        self.name.eq_ignore_ascii_case("EPSG")
    }
}

/// A unit of measure with its factor to the SI base unit (metre or radian).
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub name: String,
    pub factor: f64,
}

impl Unit {
    pub fn degree() -> Self {
        Self {
            name: "degree".into(),
            factor: std::f64::consts::PI / 180.0,
        }
    }

    pub fn metre() -> Self {
        Self {
            name: "m".into(),
            factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisDirection {
    North,
    South,
    East,
    West,
    Up,
    Down,
    GeocentricX,
    GeocentricY,
    GeocentricZ,
    Other,
}

impl AxisDirection {
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword.to_ascii_uppercase().as_str() {
            "NORTH" => Self::North,
            "SOUTH" => Self::South,
            "EAST" => Self::East,
            "WEST" => Self::West,
            "UP" => Self::Up,
            "DOWN" => Self::Down,
            "GEOCENTRIC_X" => Self::GeocentricX,
            "GEOCENTRIC_Y" => Self::GeocentricY,
            "GEOCENTRIC_Z" => Self::GeocentricZ,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub name: String,
    pub direction: AxisDirection,
}

impl Axis {
    pub fn new(name: impl Into<String>, direction: AxisDirection) -> Self {
        Self {
            name: name.into(),
            direction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsKind {
    Ellipsoidal,
    Cartesian,
    Vertical,
}

impl fmt::Display for CsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ellipsoidal => "Ellipsoidal CS",
            Self::Cartesian => "Cartesian CS",
            Self::Vertical => "Vertical CS",
        })
    }
}

/// Axes plus unit of a single system.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateSystem {
    pub kind: CsKind,
    pub axes: Vec<Axis>,
    pub unit: Unit,
}

impl CoordinateSystem {
    /// Display name, e.g. `Ellipsoidal CS: Geodetic longitude (degree), Geodetic latitude (degree)`.
    pub fn name(&self) -> String {
        let axes = self
            .axes
            .iter()
            .map(|a| format!("{} ({})", a.name, self.unit.name))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}: {axes}", self.kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ellipsoid {
    pub name: String,
    pub semi_major_axis: f64,
    pub inverse_flattening: f64,
    pub authority: Option<Authority>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimeMeridian {
    pub name: String,
    pub longitude: f64,
    pub authority: Option<Authority>,
}

impl Default for PrimeMeridian {
    fn default() -> Self {
        Self {
            name: "Greenwich".into(),
            longitude: 0.0,
            authority: None,
        }
    }
}

/// Geodetic or vertical datum. Vertical datums carry no ellipsoid.
#[derive(Debug, Clone, PartialEq)]
pub struct Datum {
    pub name: String,
    pub ellipsoid: Option<Ellipsoid>,
    pub to_wgs84: Option<Vec<f64>>,
    pub authority: Option<Authority>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Geographic,
    Geocentric,
    Vertical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeafCrs {
    pub name: String,
    pub kind: LeafKind,
    pub datum: Datum,
    pub prime_meridian: Option<PrimeMeridian>,
    pub coordinate_system: CoordinateSystem,
    pub authority: Option<Authority>,
}

/// A projection parameter. `value` is absent for `PARAMETER["name"]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Option<f64>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// The operation turning base coordinates into projected ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub name: String,
    pub method: String,
    pub method_authority: Option<Authority>,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedCrs {
    pub name: String,
    pub base: LeafCrs,
    pub conversion: Conversion,
    pub coordinate_system: CoordinateSystem,
    pub authority: Option<Authority>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompoundCrs {
    pub name: String,
    pub components: Vec<Crs>,
    pub authority: Option<Authority>,
}

impl CompoundCrs {
    pub fn coordinate_system_name(&self) -> String {
        let parts = self
            .components
            .iter()
            .map(Crs::coordinate_system_name)
            .collect::<Vec<_>>()
            .join(" + ");
        format!("Compound CS: {parts}")
    }
}

/// A parsed coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub enum Crs {
    Leaf(LeafCrs),
    Projected(ProjectedCrs),
    Compound(CompoundCrs),
}

impl Crs {
    pub fn name(&self) -> &str {
        match self {
            Self::Leaf(leaf) => &leaf.name,
            Self::Projected(projected) => &projected.name,
            Self::Compound(compound) => &compound.name,
        }
    }

    pub fn authority(&self) -> Option<&Authority> {
        match self {
            Self::Leaf(leaf) => leaf.authority.as_ref(),
            Self::Projected(projected) => projected.authority.as_ref(),
            Self::Compound(compound) => compound.authority.as_ref(),
        }
    }

    /// The EPSG code declared on the root object, if any.
    pub fn epsg_code(&self) -> Option<&str> {
        self.authority()
            .filter(|a| a.is_epsg())
            .map(|a| a.code.as_str())
    }

    /// Display name of the coordinate system. Compound systems join the
    /// names of their components.
    pub fn coordinate_system_name(&self) -> String {
        match self {
            Self::Leaf(leaf) => leaf.coordinate_system.name(),
            Self::Projected(projected) => projected.coordinate_system.name(),
            Self::Compound(compound) => compound.coordinate_system_name(),
        }
    }

    /// Whether both describe the same system, ignoring names and authorities.
    pub fn same_definition(&self, other: &Self) -> bool {
        compare::same_crs(self, other)
    }

    /// Datum name of the first geodetic component, used to rank equal candidates.
    pub fn geodetic_datum_name(&self) -> Option<&str> {
        match self {
            Self::Leaf(leaf) => Some(leaf.datum.name.as_str()),
            Self::Projected(projected) => Some(projected.base.datum.name.as_str()),
            Self::Compound(compound) => compound
                .components
                .iter()
                .find_map(Self::geodetic_datum_name),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.authority() {
            Some(a) => write!(f, "{} ({}:{})", self.name(), a.name, a.code),
            None => f.write_str(self.name()),
        }
    }
}
