//! Textual encoder.
//!
//! Builds a `serde_json::Value` tree following the schema, then writes it
//! compactly. Record fields come out in schema order (the `preserve_order`
//! feature keeps object insertion order).

use serde_json::{Map, Value as Json};

use crate::codec::CodecOptions;
use crate::error::EncodeError;
use crate::schema::{NameRegistry, RecordSchema, Schema, SchemaNode};
use crate::union::candidates;
use crate::value::Value;

/// How union values are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnionForm {
    /// `{"<branch type name>": value}`, bare `null` for the null branch.
    Tagged,
    /// The value of the first branch, unwrapped. Used for field defaults.
    FirstBranch,
}

/// Encode a value against a schema as JSON text.
///
/// # Example
/// ```
/// use avrolite::{encode_textual, Schema, Value};
///
/// let schema = Schema::parse(r#"["null", "string"]"#).unwrap();
/// assert_eq!(encode_textual(&schema, &Value::from("x")).unwrap(), r#"{"string":"x"}"#);
/// assert_eq!(encode_textual(&schema, &Value::Null).unwrap(), "null");
/// ```
pub fn encode_textual(schema: &Schema, value: &Value) -> Result<String, EncodeError> {
    encode_textual_with_options(schema, value, &CodecOptions::default())
}

/// Encode a value as JSON text, nesting at most `options.max_depth` deep.
pub fn encode_textual_with_options(
    schema: &Schema,
    value: &Value,
    options: &CodecOptions,
) -> Result<String, EncodeError> {
    let json = encode_json_with_options(schema, value, options)?;
    Ok(json.to_string())
}

/// Encode a value against a schema as a JSON value tree.
pub fn encode_json(schema: &Schema, value: &Value) -> Result<Json, EncodeError> {
    encode_json_with_options(schema, value, &CodecOptions::default())
}

/// Encode a value as a JSON value tree, nesting at most `options.max_depth`
/// deep.
pub fn encode_json_with_options(
    schema: &Schema,
    value: &Value,
    options: &CodecOptions,
) -> Result<Json, EncodeError> {
    let writer = JsonWriter {
        names: schema.names(),
        form: UnionForm::Tagged,
        max_depth: options.max_depth,
    };
    writer.value_to_json(schema.root(), value, 0)
}

/// Write a field default the way schema JSON carries it.
pub(crate) fn default_to_json(
    schema: &SchemaNode,
    value: &Value,
    names: &NameRegistry,
) -> Result<Json, EncodeError> {
    // Defaults come from schema text, which the JSON parser already bounds
    let writer = JsonWriter {
        names,
        form: UnionForm::FirstBranch,
        max_depth: usize::MAX,
    };
    writer.value_to_json(schema, value, 0)
}

/// Bytes travel as a string of code points 0-255, one per byte.
pub(crate) fn bytes_to_json(bytes: &[u8]) -> Json {
    Json::String(bytes.iter().map(|&b| char::from(b)).collect())
}

pub(crate) fn double_to_json(value: f64) -> Json {
    if value.is_nan() {
        Json::String("NaN".to_string())
    } else if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        Json::String(text.to_string())
    } else {
        Json::from(value)
    }
}

fn float_to_json(value: f32) -> Json {
    if !value.is_finite() {
        return double_to_json(value as f64);
    }
    // Shortest f32 text, so 0.1f32 prints as 0.1 rather than its f64 widening.
    // Display output of a finite f32 always parses as f64.
    value
        .to_string()
        .parse::<f64>()
        .map_or_else(|_| double_to_json(value as f64), Json::from)
}

fn mismatch(schema: &SchemaNode, value: &Value) -> EncodeError {
    EncodeError::TypeMismatch {
        expected: schema.type_name().into_owned(),
        found: value.kind(),
    }
}

/// Schema-directed value to JSON conversion.
///
/// Depth counts records, arrays and maps, the same way the binary codec
/// does; union wrappers and named references do not add a level.
#[derive(Clone, Copy)]
struct JsonWriter<'a> {
    names: &'a NameRegistry,
    form: UnionForm,
    max_depth: usize,
}

impl JsonWriter<'_> {
    fn value_to_json(
        &self,
        schema: &SchemaNode,
        value: &Value,
        depth: usize,
    ) -> Result<Json, EncodeError> {
        if depth > self.max_depth {
            return Err(EncodeError::DepthExceeded(self.max_depth));
        }

        match (schema, value) {
            (SchemaNode::Null, Value::Null) => Ok(Json::Null),
            (SchemaNode::Boolean, Value::Bool(b)) => Ok(Json::Bool(*b)),
            (SchemaNode::Int, Value::Long(l)) => {
                let v = i32::try_from(*l).map_err(|_| EncodeError::OutOfRange {
                    expected: "int",
                    value: *l,
                })?;
                Ok(Json::from(v))
            }
            (SchemaNode::Long, Value::Long(l)) => Ok(Json::from(*l)),
            (SchemaNode::Float, Value::Float(f)) => Ok(float_to_json(*f)),
            (SchemaNode::Double, Value::Double(d)) => Ok(double_to_json(*d)),
            (SchemaNode::Bytes, Value::Bytes(b)) => Ok(bytes_to_json(b)),
            (SchemaNode::String, Value::String(s)) => Ok(Json::String(s.clone())),
            (SchemaNode::String, Value::Bytes(b)) => {
                Ok(Json::String(std::str::from_utf8(b)?.to_string()))
            }
            (SchemaNode::Fixed(fixed), Value::Bytes(b)) => {
                if b.len() != fixed.size {
                    return Err(EncodeError::SizeMismatch {
                        expected: fixed.size,
                        found: b.len(),
                    });
                }
                Ok(bytes_to_json(b))
            }
            (SchemaNode::Enum(e), Value::String(symbol)) => {
                if e.symbol_index(symbol).is_none() {
                    return Err(EncodeError::UnknownSymbol {
                        name: e.fullname(),
                        symbol: symbol.clone(),
                    });
                }
                Ok(Json::String(symbol.clone()))
            }
            (SchemaNode::Array(items_schema), Value::Array(items)) => items
                .iter()
                .map(|item| self.value_to_json(items_schema, item, depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array),
            (SchemaNode::Map(values_schema), Value::Map(entries)) => {
                let mut obj = Map::with_capacity(entries.len());
                for (key, item) in entries {
                    obj.insert(key.clone(), self.value_to_json(values_schema, item, depth + 1)?);
                }
                Ok(Json::Object(obj))
            }
            (SchemaNode::Union(branches), _) => match self.form {
                UnionForm::Tagged => self.union_to_json(branches, value, depth),
                UnionForm::FirstBranch => {
                    let first = branches
                        .first()
                        .ok_or_else(|| EncodeError::NoMatchingBranch(value.kind().to_string()))?;
                    self.value_to_json(first, value, depth)
                }
            },
            (SchemaNode::Record(record), Value::Record(_)) => {
                self.record_to_json(record, value, depth)
            }
            (SchemaNode::Named(name), _) => {
                let resolved = self
                    .names
                    .resolve(schema)
                    .ok_or_else(|| EncodeError::UnresolvedName(name.clone()))?;
                self.value_to_json(resolved, value, depth)
            }
            _ => Err(mismatch(schema, value)),
        }
    }

    /// Wrap the value under the first candidate branch that encodes it.
    fn union_to_json(
        &self,
        branches: &[SchemaNode],
        value: &Value,
        depth: usize,
    ) -> Result<Json, EncodeError> {
        let mut first_error = None;
        for (index, branch) in candidates(branches, value, self.names) {
            if matches!(branch, SchemaNode::Null) {
                return Ok(Json::Null);
            }
            match self.value_to_json(branch, value, depth) {
                Ok(inner) => {
                    let mut wrapper = Map::with_capacity(1);
                    wrapper.insert(branches[index].type_name().into_owned(), inner);
                    return Ok(Json::Object(wrapper));
                }
                Err(err @ EncodeError::DepthExceeded(_)) => return Err(err),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        Err(first_error.unwrap_or_else(|| EncodeError::NoMatchingBranch(value.kind().to_string())))
    }

    fn record_to_json(
        &self,
        record: &RecordSchema,
        value: &Value,
        depth: usize,
    ) -> Result<Json, EncodeError> {
        let mut obj = Map::with_capacity(record.fields.len());
        for field in &record.fields {
            let field_value = value
                .field(&field.name)
                .or(field.default.as_ref())
                .ok_or_else(|| EncodeError::MissingField {
                    record: record.fullname(),
                    field: field.name.clone(),
                })?;
            obj.insert(
                field.name.clone(),
                self.value_to_json(&field.schema, field_value, depth + 1)?,
            );
        }
        Ok(Json::Object(obj))
    }
}
