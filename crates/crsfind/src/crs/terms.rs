//! Flattening of a [`Crs`] into search keywords.
//!
//! Used when a definition parses but has no exact catalog match: the names of
//! every object in the tree, the projection method and the parameter names and
//! values become the keywords for the full-text index.

use super::{CompoundCrs, Conversion, Crs, LeafCrs, ProjectedCrs};

#[derive(Debug, Clone, Copy)]
enum Node<'a> {
    Leaf(&'a LeafCrs),
    Projected(&'a ProjectedCrs),
    Compound(&'a CompoundCrs),
    Conversion(&'a Conversion),
}

impl<'a> From<&'a Crs> for Node<'a> {
    fn from(crs: &'a Crs) -> Self {
        match crs {
            Crs::Leaf(leaf) => Node::Leaf(leaf),
            Crs::Projected(projected) => Node::Projected(projected),
            Crs::Compound(compound) => Node::Compound(compound),
        }
    }
}

/// Depth-first, pre-order walk appending one entry per visited name or value.
fn collect(node: Node<'_>, out: &mut Vec<String>) {
    match node {
        Node::Leaf(leaf) => {
            out.push(leaf.name.clone());
            out.push(leaf.coordinate_system.name());
        }
        Node::Projected(projected) => {
            out.push(projected.name.clone());
            out.push(projected.coordinate_system.name());
            collect(Node::Leaf(&projected.base), out);
            collect(Node::Conversion(&projected.conversion), out);
        }
        Node::Compound(compound) => {
            out.push(compound.name.clone());
            out.push(compound.coordinate_system_name());
            for child in &compound.components {
                collect(child.into(), out);
            }
        }
        Node::Conversion(conversion) => {
            out.push(conversion.name.clone());
            out.push(conversion.method.clone());
            for parameter in &conversion.parameters {
                out.push(parameter.name.clone());
                if let Some(value) = parameter.value {
                    out.push(value.to_string());
                }
            }
        }
    }
}

/// The ordered list of terms extracted from `crs`.
pub fn term_list(crs: &Crs) -> Vec<String> {
    let mut out = Vec::new();
    collect(crs.into(), &mut out);
    out
}

/// Space-joined keywords for `crs`, deterministic for a given input.
pub fn extract_terms(crs: &Crs) -> String {
    term_list(crs).join(" ")
}
