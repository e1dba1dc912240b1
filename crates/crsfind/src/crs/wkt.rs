//! Parser for WKT 1 coordinate reference system definitions, as found in
//! `.prj` files and the EPSG properties catalogs.
//!
//! Parsing runs in two passes: [`nom`] turns the text into a generic keyword
//! tree, then the tree is checked and converted into a [`Crs`].

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map},
    multi::separated_list0,
    number::complete::double,
    sequence::{delimited, preceded, tuple},
};
use thiserror::Error;

use super::{
    Authority, Axis, AxisDirection, CompoundCrs, Conversion, CoordinateSystem, Crs, CsKind, Datum,
    Ellipsoid, LeafCrs, LeafKind, Parameter, PrimeMeridian, ProjectedCrs, Unit,
};

/// A definition that could not be turned into a [`Crs`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    message: String,
    offset: Option<usize>,
}

impl ParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset: None,
        }
    }

    fn syntax(offset: usize, rest: &str) -> Self {
        let message = if rest.is_empty() {
            format!("unexpected end of input at offset {offset}")
        } else {
            let near: String = rest.chars().take(20).collect();
            format!("unexpected input at offset {offset} near '{near}'")
        };
        Self {
            message,
            offset: Some(offset),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Byte offset of a syntax error; `None` for structural errors.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }
}

type Result<T> = std::result::Result<T, ParseError>;

#[derive(Debug, Clone, PartialEq)]
enum WktValue<'a> {
    Text(&'a str),
    Number(f64),
    Keyword(&'a str),
    Node(WktNode<'a>),
}

#[derive(Debug, Clone, PartialEq)]
struct WktNode<'a> {
    keyword: &'a str,
    args: Vec<WktValue<'a>>,
}

// =============================================================================
// SYNTAX
// =============================================================================

fn keyword(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_while(|c: char| c != '"'), char('"'))(input)
}

fn separator(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char(','), multispace0)(input)
}

fn value(input: &str) -> IResult<&str, WktValue<'_>> {
    alt((
        map(quoted, WktValue::Text),
        map(node, WktValue::Node),
        map(double, WktValue::Number),
        map(keyword, WktValue::Keyword),
    ))(input)
}

fn node(input: &str) -> IResult<&str, WktNode<'_>> {
    map(
        tuple((
            keyword,
            preceded(multispace0, alt((char('['), char('(')))),
            delimited(multispace0, separated_list0(separator, value), multispace0),
            alt((char(']'), char(')'))),
        )),
        |(keyword, _, args, _)| WktNode { keyword, args },
    )(input)
}

/// Deepest bracket nesting accepted. Real definitions stay below ten.
const MAX_DEPTH: usize = 64;

/// Reject nesting past [`MAX_DEPTH`] before the recursive parser sees it.
fn check_depth(text: &str) -> Result<()> {
    let mut depth = 0usize;
    let mut in_text = false;
    for (offset, c) in text.char_indices() {
        match c {
            '"' => in_text = !in_text,
            '[' | '(' if !in_text => {
                depth += 1;
                if depth > MAX_DEPTH {
                    return Err(ParseError {
                        message: format!("nesting deeper than {MAX_DEPTH} levels at offset {offset}"),
                        offset: Some(offset),
                    });
                }
            }
            ']' | ')' if !in_text => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn parse_tree(text: &str) -> Result<WktNode<'_>> {
    check_depth(text)?;
    match all_consuming(delimited(multispace0, node, multispace0))(text) {
        Ok((_, tree)) => Ok(tree),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            Err(ParseError::syntax(text.len() - e.input.len(), e.input))
        }
        Err(nom::Err::Incomplete(_)) => Err(ParseError::new("unexpected end of input")),
    }
}

// =============================================================================
// STRUCTURE
// =============================================================================

impl<'a> WktNode<'a> {
    fn is(&self, keyword: &str) -> bool {
        self.keyword.eq_ignore_ascii_case(keyword)
    }

    fn nodes(&self) -> impl Iterator<Item = &WktNode<'a>> {
        self.args.iter().filter_map(|arg| match arg {
            WktValue::Node(node) => Some(node),
            _ => None,
        })
    }

    fn children<'s>(&'s self, keyword: &'s str) -> impl Iterator<Item = &'s WktNode<'a>> {
        self.nodes().filter(move |n| n.is(keyword))
    }

    fn child(&self, keyword: &str) -> Option<&WktNode<'a>> {
        self.nodes().find(|n| n.is(keyword))
    }

    fn require(&self, keyword: &str) -> Result<&WktNode<'a>> {
        self.child(keyword).ok_or_else(|| {
            ParseError::new(format!(
                "{} is missing its {keyword} element",
                self.keyword.to_ascii_uppercase()
            ))
        })
    }

    fn name(&self) -> Result<String> {
        match self.args.first() {
            Some(WktValue::Text(name)) => Ok((*name).to_string()),
            _ => Err(ParseError::new(format!(
                "{} is missing its quoted name",
                self.keyword.to_ascii_uppercase()
            ))),
        }
    }

    fn number(&self, index: usize) -> Result<f64> {
        self.optional_number(index).ok_or_else(|| {
            ParseError::new(format!(
                "{} is missing numeric argument {index}",
                self.keyword.to_ascii_uppercase()
            ))
        })
    }

    fn optional_number(&self, index: usize) -> Option<f64> {
        match self.args.get(index) {
            Some(WktValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    fn authority(&self) -> Option<Authority> {
        let node = self.child("AUTHORITY")?;
        let text = |index: usize| match node.args.get(index)? {
            WktValue::Text(s) | WktValue::Keyword(s) => Some((*s).to_string()),
            WktValue::Number(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            _ => None,
        };
        Some(Authority::new(text(0)?, text(1)?))
    }

    fn unit(&self, default: Unit) -> Result<Unit> {
        match self.child("UNIT") {
            Some(unit) => Ok(Unit {
                name: unit.name()?,
                factor: unit.number(1)?,
            }),
            None => Ok(default),
        }
    }

    fn axes(&self, default: impl FnOnce() -> Vec<Axis>) -> Result<Vec<Axis>> {
        let axes = self
            .children("AXIS")
            .map(|axis| {
                let direction = match axis.args.get(1) {
                    Some(WktValue::Keyword(k)) => AxisDirection::from_keyword(k),
                    _ => AxisDirection::Other,
                };
                Ok(Axis::new(axis.name()?, direction))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(if axes.is_empty() { default() } else { axes })
    }
}

fn is_crs_keyword(node: &WktNode<'_>) -> bool {
    ["GEOGCS", "GEOCCS", "VERT_CS", "PROJCS", "COMPD_CS"]
        .iter()
        .any(|k| node.is(k))
}

fn build_crs(node: &WktNode<'_>) -> Result<Crs> {
    match node.keyword.to_ascii_uppercase().as_str() {
        "GEOGCS" => Ok(Crs::Leaf(build_geodetic(node, LeafKind::Geographic)?)),
        "GEOCCS" => Ok(Crs::Leaf(build_geodetic(node, LeafKind::Geocentric)?)),
        "VERT_CS" => Ok(Crs::Leaf(build_vertical(node)?)),
        "PROJCS" => Ok(Crs::Projected(build_projected(node)?)),
        "COMPD_CS" => Ok(Crs::Compound(build_compound(node)?)),
        other => Err(ParseError::new(format!(
            "unsupported coordinate reference system '{other}'"
        ))),
    }
}

fn build_datum(node: &WktNode<'_>) -> Result<Datum> {
    let spheroid = node.require("SPHEROID")?;
    let ellipsoid = Ellipsoid {
        name: spheroid.name()?,
        semi_major_axis: spheroid.number(1)?,
        inverse_flattening: spheroid.number(2)?,
        authority: spheroid.authority(),
    };
    let to_wgs84 = node.child("TOWGS84").map(|shift| {
        shift
            .args
            .iter()
            .filter_map(|arg| match arg {
                WktValue::Number(n) => Some(*n),
                _ => None,
            })
            .collect()
    });
    Ok(Datum {
        name: node.name()?,
        ellipsoid: Some(ellipsoid),
        to_wgs84,
        authority: node.authority(),
    })
}

fn build_geodetic(node: &WktNode<'_>, kind: LeafKind) -> Result<LeafCrs> {
    let datum = build_datum(node.require("DATUM")?)?;
    let prime_meridian = match node.child("PRIMEM") {
        Some(pm) => PrimeMeridian {
            name: pm.name()?,
            longitude: pm.number(1)?,
            authority: pm.authority(),
        },
        None => PrimeMeridian::default(),
    };
    let coordinate_system = if kind == LeafKind::Geocentric {
        CoordinateSystem {
            kind: CsKind::Cartesian,
            axes: node.axes(|| {
                vec![
                    Axis::new("Geocentric X", AxisDirection::GeocentricX),
                    Axis::new("Geocentric Y", AxisDirection::GeocentricY),
                    Axis::new("Geocentric Z", AxisDirection::GeocentricZ),
                ]
            })?,
            unit: node.unit(Unit::metre())?,
        }
    } else {
        CoordinateSystem {
            kind: CsKind::Ellipsoidal,
            axes: node.axes(|| {
                vec![
                    Axis::new("Geodetic longitude", AxisDirection::East),
                    Axis::new("Geodetic latitude", AxisDirection::North),
                ]
            })?,
            unit: node.unit(Unit::degree())?,
        }
    };
    Ok(LeafCrs {
        name: node.name()?,
        kind,
        datum,
        prime_meridian: Some(prime_meridian),
        coordinate_system,
        authority: node.authority(),
    })
}

fn build_vertical(node: &WktNode<'_>) -> Result<LeafCrs> {
    let datum = node.require("VERT_DATUM")?;
    Ok(LeafCrs {
        name: node.name()?,
        kind: LeafKind::Vertical,
        datum: Datum {
            name: datum.name()?,
            ellipsoid: None,
            to_wgs84: None,
            authority: datum.authority(),
        },
        prime_meridian: None,
        coordinate_system: CoordinateSystem {
            kind: CsKind::Vertical,
            axes: node.axes(|| vec![Axis::new("Gravity-related height", AxisDirection::Up)])?,
            unit: node.unit(Unit::metre())?,
        },
        authority: node.authority(),
    })
}

fn build_projected(node: &WktNode<'_>) -> Result<ProjectedCrs> {
    let base = build_geodetic(node.require("GEOGCS")?, LeafKind::Geographic)?;
    let projection = node.require("PROJECTION")?;
    let method = projection.name()?;
    let parameters = node
        .children("PARAMETER")
        .map(|p| Ok(Parameter::new(p.name()?, p.optional_number(1))))
        .collect::<Result<Vec<_>>>()?;
    Ok(ProjectedCrs {
        name: node.name()?,
        base,
        conversion: Conversion {
            name: method.clone(),
            method,
            method_authority: projection.authority(),
            parameters,
        },
        coordinate_system: CoordinateSystem {
            kind: CsKind::Cartesian,
            axes: node.axes(|| {
                vec![
                    Axis::new("Easting", AxisDirection::East),
                    Axis::new("Northing", AxisDirection::North),
                ]
            })?,
            unit: node.unit(Unit::metre())?,
        },
        authority: node.authority(),
    })
}

fn build_compound(node: &WktNode<'_>) -> Result<CompoundCrs> {
    let components = node
        .nodes()
        .filter(|n| is_crs_keyword(n))
        .map(build_crs)
        .collect::<Result<Vec<_>>>()?;
    if components.len() < 2 {
        return Err(ParseError::new(format!(
            "COMPD_CS requires two component systems, found {}",
            components.len()
        )));
    }
    Ok(CompoundCrs {
        name: node.name()?,
        components,
        authority: node.authority(),
    })
}

/// Parse a WKT 1 definition into a [`Crs`].
///
/// ```rust
/// use crsfind::crs::{Crs, parse_wkt};
///
/// let crs = parse_wkt(r#"GEOGCS["WGS 84", DATUM["WGS_1984", SPHEROID["WGS 84", 6378137, 298.257223563]],
///     PRIMEM["Greenwich", 0], UNIT["degree", 0.0174532925199433]]"#)?;
/// assert!(matches!(crs, Crs::Leaf(_)));
/// assert_eq!(crs.name(), "WGS 84");
/// # Ok::<(), crsfind::crs::ParseError>(())
/// ```
pub fn parse_wkt(text: &str) -> Result<Crs> {
    let tree = parse_tree(text)?;
    build_crs(&tree)
}
