//! JSON schema parser.
//!
//! Parses Avro-style schema JSON into a [`Schema`] and registers named types
//! as they are encountered, so later references (including a record's
//! references to itself) resolve to the same definition.

use std::collections::HashSet;

use serde_json::{Map, Value as Json};
use tracing::{debug, warn};

use crate::error::SchemaError;
use crate::schema::types::fullname;
use crate::schema::{
    EnumSchema, FieldSchema, FixedSchema, NameRegistry, RecordSchema, Schema, SchemaNode,
};

/// Parse a schema from JSON text.
///
/// # Example
/// ```
/// use avrolite::schema::{parse_schema, SchemaNode};
///
/// let schema = parse_schema(r#""string""#).unwrap();
/// assert_eq!(schema.root(), &SchemaNode::String);
/// ```
pub fn parse_schema(json: &str) -> Result<Schema, SchemaError> {
    parse_schema_with_options(json, false)
}

/// Parse a schema from JSON text with strict name validation on or off.
///
/// In strict mode names must follow Avro naming rules (start with a letter
/// or underscore, continue with letters, digits or underscores, dotted for
/// full names). In permissive mode (default) violations only log a warning.
///
/// # Example
/// ```
/// use avrolite::schema::parse_schema_with_options;
///
/// let schema = r#"{"type": "enum", "name": "E", "symbols": ["ok-1"]}"#;
/// assert!(parse_schema_with_options(schema, false).is_ok());
/// assert!(parse_schema_with_options(schema, true).is_err());
/// ```
pub fn parse_schema_with_options(json: &str, strict: bool) -> Result<Schema, SchemaError> {
    let value: Json = serde_json::from_str(json)
        .map_err(|e| SchemaError::Malformed(format!("Invalid JSON: {}", e)))?;

    SchemaParser::new().with_strict(strict).parse_document(&value)
}

/// Schema parser with named type resolution context.
#[derive(Debug, Default)]
pub struct SchemaParser {
    /// Registry of named types by their fully qualified name
    names: NameRegistry,
    /// Current namespace for resolving unqualified names
    current_namespace: Option<String>,
    /// Whether to enforce strict name validation
    strict_names: bool,
}

impl SchemaParser {
    /// Create a new SchemaParser with default settings (permissive mode).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to use strict name validation.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }

    /// Parse a whole schema document, consuming the parser.
    pub fn parse_document(mut self, value: &Json) -> Result<Schema, SchemaError> {
        let root = self.parse(value)?;
        debug!(named_types = self.names.len(), "parsed schema");
        Ok(Schema {
            root,
            names: self.names,
        })
    }

    /// Parse a JSON value into a schema node, registering any named types.
    pub fn parse(&mut self, value: &Json) -> Result<SchemaNode, SchemaError> {
        match value {
            Json::String(s) => self.parse_string_schema(s),
            Json::Object(obj) => self.parse_object_schema(obj),
            Json::Array(arr) => self.parse_union_schema(arr),
            other => Err(SchemaError::Malformed(format!(
                "Expected string, object, or array, found: {}",
                other
            ))),
        }
    }

    /// Parse a primitive type or named type reference from a string.
    fn parse_string_schema(&self, s: &str) -> Result<SchemaNode, SchemaError> {
        if let Some(primitive) = primitive(s) {
            return Ok(primitive);
        }
        self.lookup_name(s)
            .map(SchemaNode::Named)
            .ok_or_else(|| SchemaError::UnknownType(s.to_string()))
    }

    /// Parse a complex type from a JSON object.
    fn parse_object_schema(&mut self, obj: &Map<String, Json>) -> Result<SchemaNode, SchemaError> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| SchemaError::Malformed("Missing 'type' field".to_string()))?;

        let type_str = match type_value {
            Json::String(s) => s.as_str(),
            // {"type": {...}} and {"type": [...]} wrap a full schema
            nested => return self.parse(nested),
        };

        // Logical type annotations are ignored; the base type carries the data
        match type_str {
            "record" | "error" => self.parse_record_schema(obj),
            "enum" => self.parse_enum_schema(obj),
            "array" => self.parse_array_schema(obj),
            "map" => self.parse_map_schema(obj),
            "fixed" => self.parse_fixed_schema(obj),
            other => self.parse_string_schema(other),
        }
    }

    /// Parse a union schema from a JSON array.
    fn parse_union_schema(&mut self, arr: &[Json]) -> Result<SchemaNode, SchemaError> {
        if arr.is_empty() {
            return Err(SchemaError::InvalidUnion(
                "Union schema cannot be empty".to_string(),
            ));
        }

        let branches = arr
            .iter()
            .map(|v| self.parse(v))
            .collect::<Result<Vec<_>, _>>()?;

        validate_union(&branches)?;

        Ok(SchemaNode::Union(branches))
    }

    /// Parse a record schema.
    fn parse_record_schema(&mut self, obj: &Map<String, Json>) -> Result<SchemaNode, SchemaError> {
        let (name, namespace) = self.named_header(obj, "Record")?;
        let full = fullname(&name, namespace.as_deref());
        self.ensure_unregistered(&full)?;

        // Register a placeholder before parsing fields so the record can
        // refer to itself
        self.names
            .insert(full.clone(), SchemaNode::Named(full.clone()));

        let prev_namespace = std::mem::replace(&mut self.current_namespace, namespace.clone());
        let fields = self.parse_fields(obj, &full);
        self.current_namespace = prev_namespace;
        let (fields, raw_defaults) = fields?;

        let mut record = RecordSchema {
            name,
            namespace,
            fields,
            doc: doc(obj),
        };
        self.names
            .insert(full.clone(), SchemaNode::Record(record.clone()));

        // Defaults convert once the record itself is resolvable
        let mut changed = false;
        for (field, raw) in record.fields.iter_mut().zip(raw_defaults) {
            if let Some(raw) = raw {
                field.default = Some(self.convert_default(&field.name, &raw, &field.schema)?);
                changed = true;
            }
        }
        if changed {
            self.names.insert(full, SchemaNode::Record(record.clone()));
        }

        Ok(SchemaNode::Record(record))
    }

    /// Parse the field list of a record, returning fields and their raw defaults.
    #[allow(clippy::type_complexity)]
    fn parse_fields(
        &mut self,
        obj: &Map<String, Json>,
        record: &str,
    ) -> Result<(Vec<FieldSchema>, Vec<Option<Json>>), SchemaError> {
        let fields_value = obj
            .get("fields")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                SchemaError::Malformed(format!("Record '{}' missing 'fields' array", record))
            })?;

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(fields_value.len());
        let mut defaults = Vec::with_capacity(fields_value.len());

        for value in fields_value {
            let field_obj = value
                .as_object()
                .ok_or_else(|| SchemaError::Malformed("Field must be an object".to_string()))?;

            let name = field_obj
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| SchemaError::Malformed("Field missing 'name'".to_string()))?
                .to_string();
            self.validate_name(&name, "Field")?;

            if !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicateName(format!(
                    "field '{}' in record '{}'",
                    name, record
                )));
            }

            let type_value = field_obj.get("type").ok_or_else(|| {
                SchemaError::Malformed(format!("Field '{}' missing 'type'", name))
            })?;
            let schema = self.parse(type_value)?;

            defaults.push(field_obj.get("default").cloned());
            fields.push(FieldSchema {
                name,
                schema,
                default: None,
                doc: doc(field_obj),
            });
        }

        Ok((fields, defaults))
    }

    /// Parse an enum schema.
    fn parse_enum_schema(&mut self, obj: &Map<String, Json>) -> Result<SchemaNode, SchemaError> {
        let (name, namespace) = self.named_header(obj, "Enum")?;
        let full = fullname(&name, namespace.as_deref());
        self.ensure_unregistered(&full)?;

        let symbol_values = obj
            .get("symbols")
            .and_then(|v| v.as_array())
            .ok_or_else(|| SchemaError::Malformed(format!("Enum '{}' missing 'symbols'", full)))?;

        if symbol_values.is_empty() {
            return Err(SchemaError::Malformed(format!(
                "Enum '{}' must have at least one symbol",
                full
            )));
        }

        let mut symbols = Vec::with_capacity(symbol_values.len());
        for value in symbol_values {
            let symbol = value.as_str().ok_or_else(|| {
                SchemaError::Malformed(format!("Enum '{}' symbol must be a string", full))
            })?;
            self.validate_name(symbol, "Enum symbol")?;
            if symbols.iter().any(|s| s == symbol) {
                return Err(SchemaError::DuplicateName(format!(
                    "symbol '{}' in enum '{}'",
                    symbol, full
                )));
            }
            symbols.push(symbol.to_string());
        }

        let schema = SchemaNode::Enum(EnumSchema {
            name,
            namespace,
            symbols,
            doc: doc(obj),
        });
        self.names.insert(full, schema.clone());

        Ok(schema)
    }

    /// Parse an array schema.
    fn parse_array_schema(&mut self, obj: &Map<String, Json>) -> Result<SchemaNode, SchemaError> {
        let items = obj
            .get("items")
            .ok_or_else(|| SchemaError::Malformed("Array missing 'items' field".to_string()))?;

        let item_schema = self.parse(items)?;
        Ok(SchemaNode::Array(Box::new(item_schema)))
    }

    /// Parse a map schema.
    fn parse_map_schema(&mut self, obj: &Map<String, Json>) -> Result<SchemaNode, SchemaError> {
        let values = obj
            .get("values")
            .ok_or_else(|| SchemaError::Malformed("Map missing 'values' field".to_string()))?;

        let value_schema = self.parse(values)?;
        Ok(SchemaNode::Map(Box::new(value_schema)))
    }

    /// Parse a fixed schema.
    fn parse_fixed_schema(&mut self, obj: &Map<String, Json>) -> Result<SchemaNode, SchemaError> {
        let (name, namespace) = self.named_header(obj, "Fixed")?;
        let full = fullname(&name, namespace.as_deref());
        self.ensure_unregistered(&full)?;

        let size = obj
            .get("size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| SchemaError::Malformed(format!("Fixed '{}' missing 'size'", full)))?;
        let size = usize::try_from(size)
            .map_err(|_| SchemaError::Malformed(format!("Fixed '{}' size too large", full)))?;

        let schema = SchemaNode::Fixed(FixedSchema {
            name,
            namespace,
            size,
            doc: doc(obj),
        });
        self.names.insert(full, schema.clone());

        Ok(schema)
    }

    /// Read `name` and `namespace` of a named type, splitting dotted names.
    ///
    /// Returns the short name and the effective namespace.
    fn named_header(
        &self,
        obj: &Map<String, Json>,
        context: &str,
    ) -> Result<(String, Option<String>), SchemaError> {
        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::Malformed(format!("{} missing 'name' field", context)))?;
        self.validate_name(name, context)?;

        if let Some((ns, short)) = name.rsplit_once('.') {
            return Ok((short.to_string(), Some(ns.to_string())));
        }

        let namespace = match obj.get("namespace") {
            Some(Json::String(ns)) if ns.is_empty() => None,
            Some(Json::String(ns)) => {
                self.validate_name(ns, "Namespace")?;
                Some(ns.clone())
            }
            Some(Json::Null) | None => self.current_namespace.clone(),
            Some(other) => {
                return Err(SchemaError::Malformed(format!(
                    "{} namespace must be a string, found: {}",
                    context, other
                )))
            }
        };

        Ok((name.to_string(), namespace))
    }

    fn ensure_unregistered(&self, fullname: &str) -> Result<(), SchemaError> {
        if primitive(fullname).is_some() || self.names.contains(fullname) {
            return Err(SchemaError::DuplicateName(format!(
                "type '{}' is already defined",
                fullname
            )));
        }
        Ok(())
    }

    /// Resolve a type name against the current namespace, then the null
    /// namespace.
    fn lookup_name(&self, name: &str) -> Option<String> {
        if !name.contains('.') {
            if let Some(ns) = &self.current_namespace {
                let qualified = format!("{}.{}", ns, name);
                if self.names.contains(&qualified) {
                    return Some(qualified);
                }
            }
        }
        self.names.contains(name).then(|| name.to_string())
    }

    /// Convert a field default from schema JSON to a value of the field type.
    fn convert_default(
        &self,
        field: &str,
        raw: &Json,
        schema: &SchemaNode,
    ) -> Result<crate::Value, SchemaError> {
        crate::textual::decode::value_from_default(raw, schema, &self.names).map_err(|e| {
            SchemaError::InvalidDefault {
                field: field.to_string(),
                message: e.to_string(),
            }
        })
    }

    /// Validate that a name follows Avro naming rules.
    ///
    /// Each dot-separated part must start with [A-Za-z_] and contain only
    /// [A-Za-z0-9_].
    fn validate_name(&self, name: &str, context: &str) -> Result<(), SchemaError> {
        let problem = if name.is_empty() {
            Some(format!("{} name cannot be empty", context))
        } else {
            name.split('.').find_map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    None => Some(format!("{} name '{}' has an empty component", context, name)),
                    Some(c) if !c.is_ascii_alphabetic() && c != '_' => Some(format!(
                        "{} name '{}' must start with a letter or underscore",
                        context, name
                    )),
                    Some(_) => chars
                        .find(|c| !c.is_ascii_alphanumeric() && *c != '_')
                        .map(|c| {
                            format!(
                                "{} name '{}' contains invalid character '{}'",
                                context, name, c
                            )
                        }),
                }
            })
        };

        match problem {
            Some(msg) if self.strict_names => Err(SchemaError::InvalidName(msg)),
            Some(msg) => {
                warn!("{}", msg);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Get all registered named types.
    pub fn names(&self) -> &NameRegistry {
        &self.names
    }
}

fn primitive(name: &str) -> Option<SchemaNode> {
    match name {
        "null" => Some(SchemaNode::Null),
        "boolean" => Some(SchemaNode::Boolean),
        "int" => Some(SchemaNode::Int),
        "long" => Some(SchemaNode::Long),
        "float" => Some(SchemaNode::Float),
        "double" => Some(SchemaNode::Double),
        "bytes" => Some(SchemaNode::Bytes),
        "string" => Some(SchemaNode::String),
        _ => None,
    }
}

fn doc(obj: &Map<String, Json>) -> Option<String> {
    obj.get("doc").and_then(|v| v.as_str()).map(String::from)
}

/// Validate union rules: no nested unions, no two branches of the same kind.
///
/// Named branches are distinguished by full name, so two different records
/// may share a union.
pub(crate) fn validate_union(branches: &[SchemaNode]) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for (i, branch) in branches.iter().enumerate() {
        if matches!(branch, SchemaNode::Union(_)) {
            return Err(SchemaError::InvalidUnion(format!(
                "Union contains nested union at position {}",
                i
            )));
        }
        let key = branch_key(branch);
        if !seen.insert(key.clone()) {
            return Err(SchemaError::InvalidUnion(format!(
                "Union contains duplicate type '{}' at position {}",
                key, i
            )));
        }
    }

    if let Some(pos) = branches.iter().position(|b| matches!(b, SchemaNode::Null)) {
        if pos != 0 {
            warn!(position = pos, "union null branch is not first");
        }
    }

    Ok(())
}

fn branch_key(schema: &SchemaNode) -> String {
    match schema {
        SchemaNode::Record(_) | SchemaNode::Enum(_) | SchemaNode::Fixed(_) | SchemaNode::Named(_) => {
            format!("named:{}", schema.type_name())
        }
        other => other.type_name().into_owned(),
    }
}

impl Schema {
    /// Build a schema from a hand-constructed node tree.
    ///
    /// Named types are registered at their first inline definition; later
    /// occurrences must be `Named` references. Unions, field names and
    /// defaults are checked as the parser would check them.
    pub fn from_node(root: SchemaNode) -> Result<Self, SchemaError> {
        let mut names = NameRegistry::new();
        let mut references = Vec::new();
        register_tree(&root, &mut names, &mut references)?;

        if let Some(missing) = references.iter().find(|r| !names.contains(r)) {
            return Err(SchemaError::UnknownType(missing.clone()));
        }

        let schema = Schema { root, names };
        check_defaults(&schema.root, &schema)?;
        Ok(schema)
    }
}

fn register_tree(
    node: &SchemaNode,
    names: &mut NameRegistry,
    references: &mut Vec<String>,
) -> Result<(), SchemaError> {
    match node {
        SchemaNode::Record(record) => {
            let full = record.fullname();
            if names.contains(&full) {
                return Err(SchemaError::DuplicateName(format!(
                    "type '{}' is already defined",
                    full
                )));
            }
            names.insert(full, node.clone());
            let mut seen = HashSet::new();
            for field in &record.fields {
                if !seen.insert(field.name.as_str()) {
                    return Err(SchemaError::DuplicateName(format!(
                        "field '{}' in record '{}'",
                        field.name,
                        record.fullname()
                    )));
                }
                register_tree(&field.schema, names, references)?;
            }
        }
        SchemaNode::Enum(e) => {
            let full = e.fullname();
            if names.contains(&full) {
                return Err(SchemaError::DuplicateName(format!(
                    "type '{}' is already defined",
                    full
                )));
            }
            let mut seen = HashSet::new();
            if let Some(dup) = e.symbols.iter().find(|s| !seen.insert(s.as_str())) {
                return Err(SchemaError::DuplicateName(format!(
                    "symbol '{}' in enum '{}'",
                    dup, full
                )));
            }
            names.insert(full, node.clone());
        }
        SchemaNode::Fixed(f) => {
            let full = f.fullname();
            if names.contains(&full) {
                return Err(SchemaError::DuplicateName(format!(
                    "type '{}' is already defined",
                    full
                )));
            }
            names.insert(full, node.clone());
        }
        SchemaNode::Array(inner) | SchemaNode::Map(inner) => {
            register_tree(inner, names, references)?;
        }
        SchemaNode::Union(branches) => {
            validate_union(branches)?;
            for branch in branches {
                register_tree(branch, names, references)?;
            }
        }
        SchemaNode::Named(name) => references.push(name.clone()),
        _ => {}
    }
    Ok(())
}

fn check_defaults(node: &SchemaNode, schema: &Schema) -> Result<(), SchemaError> {
    match node {
        SchemaNode::Record(record) => {
            for field in &record.fields {
                if let Some(default) = &field.default {
                    crate::textual::encode::default_to_json(&field.schema, default, &schema.names)
                        .map_err(|e| SchemaError::InvalidDefault {
                            field: field.name.clone(),
                            message: e.to_string(),
                        })?;
                }
                check_defaults(&field.schema, schema)?;
            }
        }
        SchemaNode::Array(inner) | SchemaNode::Map(inner) => check_defaults(inner, schema)?,
        SchemaNode::Union(branches) => {
            for branch in branches {
                check_defaults(branch, schema)?;
            }
        }
        _ => {}
    }
    Ok(())
}
