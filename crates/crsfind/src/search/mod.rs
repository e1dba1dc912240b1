//! Text preparation for full-text queries.
//!
//! User text never reaches the index query parser verbatim: [`sanitize`]
//! rewrites it into quoted phrases, and [`cleanup`] normalizes strings that
//! look like WKT but failed to parse.

pub mod cleanup;
pub mod sanitize;

pub use cleanup::{looks_like_definition, strip_definition_markers};
pub use sanitize::{sanitize, tokenize};
