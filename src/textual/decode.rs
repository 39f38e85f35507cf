//! Textual decoder.
//!
//! JSON text is parsed with the parser's own recursion limit switched off;
//! nesting is bounded by `CodecOptions::max_depth` instead. A bracket scan
//! rejects text nested too deep before the parser recurses into it.

use std::collections::BTreeMap;

use serde_json::{Map, Value as Json};

use crate::codec::CodecOptions;
use crate::error::DecodeError;
use crate::schema::{NameRegistry, RecordSchema, Schema, SchemaNode};
use crate::union::branch_by_name;
use crate::value::Value;

use super::encode::UnionForm;

/// Decode JSON text against a schema.
///
/// # Example
/// ```
/// use avrolite::{decode_textual, Schema, Value};
///
/// let schema = Schema::parse(r#"["null", "string"]"#).unwrap();
/// assert_eq!(decode_textual(&schema, r#"{"string":"x"}"#).unwrap(), Value::from("x"));
/// assert_eq!(decode_textual(&schema, "null").unwrap(), Value::Null);
/// ```
pub fn decode_textual(schema: &Schema, text: &str) -> Result<Value, DecodeError> {
    decode_textual_with_options(schema, text, &CodecOptions::default())
}

/// Decode JSON text, accepting values nested at most `options.max_depth`
/// deep.
pub fn decode_textual_with_options(
    schema: &Schema,
    text: &str,
    options: &CodecOptions,
) -> Result<Value, DecodeError> {
    // Each level is at most a container plus one union wrapper
    let json_limit = options.max_depth.saturating_add(1).saturating_mul(2);
    if json_nesting(text) > json_limit {
        return Err(DecodeError::DepthExceeded(options.max_depth));
    }

    let mut deserializer = serde_json::Deserializer::from_str(text);
    deserializer.disable_recursion_limit();
    let mut stream = deserializer.into_iter::<Json>();
    let json = match stream.next() {
        Some(Ok(json)) => json,
        Some(Err(e)) => return Err(DecodeError::Malformed(format!("Invalid JSON: {}", e))),
        None => return Err(DecodeError::Malformed("Invalid JSON: empty input".to_string())),
    };
    if stream.next().is_some() {
        return Err(DecodeError::Malformed(
            "Invalid JSON: trailing characters after value".to_string(),
        ));
    }
    decode_json_with_options(schema, &json, options)
}

/// Decode an already parsed JSON value against a schema.
pub fn decode_json(schema: &Schema, json: &Json) -> Result<Value, DecodeError> {
    decode_json_with_options(schema, json, &CodecOptions::default())
}

/// Decode an already parsed JSON value, accepting values nested at most
/// `options.max_depth` deep.
pub fn decode_json_with_options(
    schema: &Schema,
    json: &Json,
    options: &CodecOptions,
) -> Result<Value, DecodeError> {
    let reader = JsonReader {
        names: schema.names(),
        form: UnionForm::Tagged,
        max_depth: options.max_depth,
    };
    reader.value_from_json(json, schema.root(), 0)
}

/// Convert a field default from schema JSON into a value of the field type.
///
/// Union defaults follow the first branch and carry no wrapper.
pub(crate) fn value_from_default(
    raw: &Json,
    schema: &SchemaNode,
    names: &NameRegistry,
) -> Result<Value, DecodeError> {
    // Schema text is parsed with the JSON parser's default recursion limit
    let reader = JsonReader {
        names,
        form: UnionForm::FirstBranch,
        max_depth: usize::MAX,
    };
    reader.value_from_json(raw, schema, 0)
}

/// Deepest bracket nesting in JSON text, ignoring brackets inside strings.
fn json_nesting(text: &str) -> usize {
    let (mut depth, mut deepest) = (0usize, 0usize);
    let (mut in_string, mut escaped) = (false, false);
    for byte in text.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn mismatch(schema: &SchemaNode, json: &Json) -> DecodeError {
    DecodeError::TypeMismatch {
        expected: schema.type_name().into_owned(),
        found: json_kind(json),
    }
}

fn bytes_from_json(text: &str) -> Result<Vec<u8>, DecodeError> {
    text.chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| {
                DecodeError::Malformed(format!(
                    "Code point U+{:04X} out of byte range",
                    u32::from(c)
                ))
            })
        })
        .collect()
}

fn double_from_json(schema: &SchemaNode, json: &Json) -> Result<f64, DecodeError> {
    match json {
        Json::Number(n) => n.as_f64().ok_or_else(|| mismatch(schema, json)),
        Json::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            _ => Err(mismatch(schema, json)),
        },
        _ => Err(mismatch(schema, json)),
    }
}

/// Schema-directed JSON to value conversion.
///
/// Depth counts records, arrays and maps, the same way the binary codec
/// does.
#[derive(Clone, Copy)]
struct JsonReader<'a> {
    names: &'a NameRegistry,
    form: UnionForm,
    max_depth: usize,
}

impl JsonReader<'_> {
    fn value_from_json(
        &self,
        json: &Json,
        schema: &SchemaNode,
        depth: usize,
    ) -> Result<Value, DecodeError> {
        if depth > self.max_depth {
            return Err(DecodeError::DepthExceeded(self.max_depth));
        }

        match (schema, json) {
            (SchemaNode::Null, Json::Null) => Ok(Value::Null),
            (SchemaNode::Boolean, Json::Bool(b)) => Ok(Value::Bool(*b)),
            (SchemaNode::Int, Json::Number(n)) => {
                let v = n.as_i64().ok_or_else(|| mismatch(schema, json))?;
                i32::try_from(v).map_err(|_| {
                    DecodeError::Malformed(format!("Integer overflow: {} does not fit in i32", v))
                })?;
                Ok(Value::Long(v))
            }
            (SchemaNode::Long, Json::Number(n)) => {
                n.as_i64().map(Value::Long).ok_or_else(|| mismatch(schema, json))
            }
            (SchemaNode::Float, _) => {
                double_from_json(schema, json).map(|d| Value::Float(d as f32))
            }
            (SchemaNode::Double, _) => double_from_json(schema, json).map(Value::Double),
            (SchemaNode::Bytes, Json::String(s)) => bytes_from_json(s).map(Value::Bytes),
            (SchemaNode::String, Json::String(s)) => Ok(Value::String(s.clone())),
            (SchemaNode::Fixed(fixed), Json::String(s)) => {
                let bytes = bytes_from_json(s)?;
                if bytes.len() != fixed.size {
                    return Err(DecodeError::Malformed(format!(
                        "Fixed '{}' expects {} bytes, found {}",
                        fixed.fullname(),
                        fixed.size,
                        bytes.len()
                    )));
                }
                Ok(Value::Bytes(bytes))
            }
            (SchemaNode::Enum(e), Json::String(symbol)) => {
                if e.symbol_index(symbol).is_none() {
                    return Err(DecodeError::Malformed(format!(
                        "Unknown symbol '{}' for enum '{}'",
                        symbol,
                        e.fullname()
                    )));
                }
                Ok(Value::String(symbol.clone()))
            }
            (SchemaNode::Array(items_schema), Json::Array(items)) => items
                .iter()
                .map(|item| self.value_from_json(item, items_schema, depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (SchemaNode::Map(values_schema), Json::Object(obj)) => {
                let mut entries = BTreeMap::new();
                for (key, item) in obj {
                    entries.insert(
                        key.clone(),
                        self.value_from_json(item, values_schema, depth + 1)?,
                    );
                }
                Ok(Value::Map(entries))
            }
            (SchemaNode::Union(branches), _) => match self.form {
                UnionForm::Tagged => self.union_from_json(json, schema, branches, depth),
                UnionForm::FirstBranch => {
                    let first = branches.first().ok_or_else(|| mismatch(schema, json))?;
                    self.value_from_json(json, first, depth)
                }
            },
            (SchemaNode::Record(record), Json::Object(obj)) => {
                self.record_from_json(obj, record, depth)
            }
            (SchemaNode::Named(name), _) => {
                let resolved = self.names.resolve(schema).ok_or_else(|| {
                    DecodeError::Malformed(format!("Unresolved named type '{}'", name))
                })?;
                self.value_from_json(json, resolved, depth)
            }
            _ => Err(mismatch(schema, json)),
        }
    }

    fn union_from_json(
        &self,
        json: &Json,
        schema: &SchemaNode,
        branches: &[SchemaNode],
        depth: usize,
    ) -> Result<Value, DecodeError> {
        match json {
            Json::Null if branches.iter().any(|b| matches!(b, SchemaNode::Null)) => Ok(Value::Null),
            Json::Object(wrapper) if wrapper.len() == 1 => {
                let Some((tag, inner)) = wrapper.iter().next() else {
                    return Err(mismatch(schema, json));
                };
                let (_, branch) = branch_by_name(branches, tag, self.names)
                    .ok_or_else(|| DecodeError::UnknownUnionTag(tag.clone()))?;
                self.value_from_json(inner, branch, depth)
            }
            _ => Err(mismatch(schema, json)),
        }
    }

    /// Fields are looked up by name; absent fields take their defaults and
    /// unknown keys are ignored.
    fn record_from_json(
        &self,
        obj: &Map<String, Json>,
        record: &RecordSchema,
        depth: usize,
    ) -> Result<Value, DecodeError> {
        let mut fields = BTreeMap::new();
        for field in &record.fields {
            let value = match (obj.get(&field.name), &field.default) {
                (Some(raw), _) => self.value_from_json(raw, &field.schema, depth + 1)?,
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(DecodeError::Malformed(format!(
                        "Record '{}' is missing field '{}'",
                        record.fullname(),
                        field.name
                    )))
                }
            };
            fields.insert(field.name.clone(), value);
        }
        Ok(Value::Record(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(schema: &SchemaNode, json: Json) -> Result<Value, DecodeError> {
        let names = NameRegistry::new();
        let reader = JsonReader {
            names: &names,
            form: UnionForm::Tagged,
            max_depth: 256,
        };
        reader.value_from_json(&json, schema, 0)
    }

    #[test]
    fn test_bytes_code_points() {
        assert_eq!(
            decode(&SchemaNode::Bytes, json!("\u{0}A\u{ff}")).unwrap(),
            Value::Bytes(vec![0x00, 0x41, 0xFF])
        );
        assert!(matches!(
            decode(&SchemaNode::Bytes, json!("\u{100}")),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_int_range_and_kind() {
        assert_eq!(decode(&SchemaNode::Int, json!(7)).unwrap(), Value::Long(7));
        assert!(matches!(
            decode(&SchemaNode::Int, json!(1_i64 << 40)),
            Err(DecodeError::Malformed(_))
        ));
        assert_eq!(
            decode(&SchemaNode::Long, json!(1.5)).unwrap_err(),
            DecodeError::TypeMismatch {
                expected: "long".to_string(),
                found: "number"
            }
        );
    }

    #[test]
    fn test_non_finite_strings() {
        let v = decode(&SchemaNode::Double, json!("NaN")).unwrap();
        assert!(v.as_double().is_some_and(f64::is_nan));
        assert_eq!(
            decode(&SchemaNode::Double, json!("-Infinity")).unwrap(),
            Value::Double(f64::NEG_INFINITY)
        );
        assert!(decode(&SchemaNode::Double, json!("nan")).is_err());
    }

    #[test]
    fn test_union_tags() {
        let schema = SchemaNode::Union(vec![SchemaNode::Null, SchemaNode::String]);
        assert_eq!(decode(&schema, Json::Null).unwrap(), Value::Null);
        assert_eq!(decode(&schema, json!({"string": "x"})).unwrap(), Value::from("x"));
        assert_eq!(
            decode(&schema, json!({"long": 1})).unwrap_err(),
            DecodeError::UnknownUnionTag("long".to_string())
        );
        assert!(matches!(
            decode(&schema, json!("x")),
            Err(DecodeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_null_without_null_branch() {
        let schema = SchemaNode::Union(vec![SchemaNode::Long, SchemaNode::String]);
        assert!(matches!(
            decode(&schema, Json::Null),
            Err(DecodeError::TypeMismatch { found: "null", .. })
        ));
    }

    #[test]
    fn test_json_nesting_skips_strings() {
        assert_eq!(json_nesting("1"), 0);
        assert_eq!(json_nesting(r#"{"a": [[1], {}]}"#), 3);
        assert_eq!(json_nesting(r#"["[[[", "\"[{"]"#), 1);
    }

    #[test]
    fn test_union_wrapper_does_not_add_depth() {
        let names = NameRegistry::new();
        let schema = SchemaNode::Array(Box::new(SchemaNode::Union(vec![
            SchemaNode::Null,
            SchemaNode::Long,
        ])));
        let reader = JsonReader {
            names: &names,
            form: UnionForm::Tagged,
            max_depth: 1,
        };
        assert_eq!(
            reader.value_from_json(&json!([{"long": 1}]), &schema, 0).unwrap(),
            Value::Array(vec![Value::Long(1)])
        );
        let reader = JsonReader { max_depth: 0, ..reader };
        assert_eq!(
            reader.value_from_json(&json!([{"long": 1}]), &schema, 0),
            Err(DecodeError::DepthExceeded(0))
        );
    }

    #[test]
    fn test_default_uses_first_branch() {
        let schema = SchemaNode::Union(vec![SchemaNode::Null, SchemaNode::Long]);
        let names = NameRegistry::new();
        assert_eq!(value_from_default(&Json::Null, &schema, &names).unwrap(), Value::Null);
        assert!(value_from_default(&json!(3), &schema, &names).is_err());
    }
}
