//! Schema types and parsing.
//!
//! This module defines the schema type tree (primitives, complex types and
//! named-type references), the named-type registry, and JSON parsing.

mod parser;
mod types;

pub use parser::{parse_schema, parse_schema_with_options, SchemaParser};
pub use types::*;
