//! Schema node types and the parsed schema model.
//!
//! Named types (records, enums, fixed) are written inline at their first
//! occurrence and referenced by [`SchemaNode::Named`] afterwards. The
//! [`NameRegistry`] maps each full name to its definition, which is what
//! lets a record refer to itself without expanding forever.

use std::borrow::Cow;
use std::collections::HashMap;

use serde_json::{json, Map, Value as Json};

use crate::value::Value;

/// A node of the schema type tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    // Primitive types
    /// Null type - no value.
    Null,
    /// Boolean type.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE 754 floating-point.
    Float,
    /// 64-bit IEEE 754 floating-point.
    Double,
    /// Sequence of bytes.
    Bytes,
    /// Unicode string.
    String,

    // Complex types
    /// Fixed-size byte array.
    Fixed(FixedSchema),
    /// Enumeration type.
    Enum(EnumSchema),
    /// Array of items with a single schema.
    Array(Box<SchemaNode>),
    /// Map with string keys and values of a single schema.
    Map(Box<SchemaNode>),
    /// Union of distinct branch schemas.
    Union(Vec<SchemaNode>),
    /// Record type with named fields.
    Record(RecordSchema),

    /// Reference to a named type already registered under this full name.
    Named(String),
}

/// Schema for a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// The short name of the record.
    pub name: String,
    /// Optional namespace for the record.
    pub namespace: Option<String>,
    /// The fields of the record, in declaration order.
    pub fields: Vec<FieldSchema>,
    /// Optional documentation.
    pub doc: Option<String>,
}

impl RecordSchema {
    /// Create a new RecordSchema with the given name and fields.
    pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            fields,
            doc: None,
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the documentation.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        fullname(&self.name, self.namespace.as_deref())
    }

    /// Find a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Schema for a field within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// The name of the field.
    pub name: String,
    /// The schema of the field's value.
    pub schema: SchemaNode,
    /// Value used when an encoded record omits the field.
    pub default: Option<Value>,
    /// Optional documentation.
    pub doc: Option<String>,
}

impl FieldSchema {
    /// Create a new FieldSchema with the given name and schema.
    pub fn new(name: impl Into<String>, schema: SchemaNode) -> Self {
        Self {
            name: name.into(),
            schema,
            default: None,
            doc: None,
        }
    }

    /// Set the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Set the documentation.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// Schema for an enumeration type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// The short name of the enum.
    pub name: String,
    /// Optional namespace for the enum.
    pub namespace: Option<String>,
    /// The symbols of the enum, in index order.
    pub symbols: Vec<String>,
    /// Optional documentation.
    pub doc: Option<String>,
}

impl EnumSchema {
    /// Create a new EnumSchema with the given name and symbols.
    pub fn new(name: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            symbols,
            doc: None,
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        fullname(&self.name, self.namespace.as_deref())
    }

    /// Get the index of a symbol.
    pub fn symbol_index(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

/// Schema for a fixed-size byte array.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    /// The short name of the fixed type.
    pub name: String,
    /// Optional namespace for the fixed type.
    pub namespace: Option<String>,
    /// The size in bytes.
    pub size: usize,
    /// Optional documentation.
    pub doc: Option<String>,
}

impl FixedSchema {
    /// Create a new FixedSchema with the given name and size.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            size,
            doc: None,
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        fullname(&self.name, self.namespace.as_deref())
    }
}

pub(crate) fn fullname(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}

impl SchemaNode {
    /// Check if this schema is a primitive type.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            SchemaNode::Null
                | SchemaNode::Boolean
                | SchemaNode::Int
                | SchemaNode::Long
                | SchemaNode::Float
                | SchemaNode::Double
                | SchemaNode::Bytes
                | SchemaNode::String
        )
    }

    /// Check if this schema is a named type or a reference to one.
    pub fn is_named(&self) -> bool {
        matches!(
            self,
            SchemaNode::Record(_) | SchemaNode::Enum(_) | SchemaNode::Fixed(_) | SchemaNode::Named(_)
        )
    }

    /// Get the fully qualified name of a named type, if applicable.
    pub fn fullname(&self) -> Option<String> {
        match self {
            SchemaNode::Record(r) => Some(r.fullname()),
            SchemaNode::Enum(e) => Some(e.fullname()),
            SchemaNode::Fixed(f) => Some(f.fullname()),
            SchemaNode::Named(n) => Some(n.clone()),
            _ => None,
        }
    }

    /// Canonical type name: the primitive or complex keyword, or the full
    /// name for named types. Union wrappers in the textual form use it.
    pub fn type_name(&self) -> Cow<'_, str> {
        match self {
            SchemaNode::Null => Cow::Borrowed("null"),
            SchemaNode::Boolean => Cow::Borrowed("boolean"),
            SchemaNode::Int => Cow::Borrowed("int"),
            SchemaNode::Long => Cow::Borrowed("long"),
            SchemaNode::Float => Cow::Borrowed("float"),
            SchemaNode::Double => Cow::Borrowed("double"),
            SchemaNode::Bytes => Cow::Borrowed("bytes"),
            SchemaNode::String => Cow::Borrowed("string"),
            SchemaNode::Array(_) => Cow::Borrowed("array"),
            SchemaNode::Map(_) => Cow::Borrowed("map"),
            SchemaNode::Union(_) => Cow::Borrowed("union"),
            SchemaNode::Named(n) => Cow::Borrowed(n.as_str()),
            SchemaNode::Record(r) => Cow::Owned(r.fullname()),
            SchemaNode::Enum(e) => Cow::Owned(e.fullname()),
            SchemaNode::Fixed(f) => Cow::Owned(f.fullname()),
        }
    }

    /// Check if this schema is a union with a null branch.
    pub fn is_nullable(&self) -> bool {
        match self {
            SchemaNode::Union(branches) => branches.iter().any(|b| matches!(b, SchemaNode::Null)),
            _ => false,
        }
    }
}

/// Registry of named type definitions, keyed by full name.
///
/// Scoped to one [`Schema`] and read-only once parsing has finished.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameRegistry {
    types: HashMap<String, SchemaNode>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, fullname: String, schema: SchemaNode) {
        self.types.insert(fullname, schema);
    }

    /// Check if a named type exists in the registry.
    pub fn contains(&self, fullname: &str) -> bool {
        self.types.contains_key(fullname)
    }

    /// Get a named type definition.
    pub fn get(&self, fullname: &str) -> Option<&SchemaNode> {
        self.types.get(fullname)
    }

    /// Number of registered named types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Follow a `Named` reference to its definition. Non-reference nodes
    /// resolve to themselves. Returns `None` for unknown names and for
    /// records whose definition is still being parsed.
    pub fn resolve<'a>(&'a self, node: &'a SchemaNode) -> Option<&'a SchemaNode> {
        match node {
            SchemaNode::Named(name) => match self.types.get(name) {
                Some(SchemaNode::Named(_)) | None => None,
                Some(def) => Some(def),
            },
            other => Some(other),
        }
    }
}

/// A parsed, immutable schema: the root node plus its named-type registry.
///
/// Safe to share across threads; encoding and decoding only read it.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub(crate) root: SchemaNode,
    pub(crate) names: NameRegistry,
}

impl Schema {
    /// Parse schema JSON text.
    pub fn parse(text: &str) -> Result<Self, crate::error::SchemaError> {
        super::parser::parse_schema(text)
    }

    /// The root type.
    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// The named types defined anywhere in this schema.
    pub fn names(&self) -> &NameRegistry {
        &self.names
    }

    /// Follow a `Named` reference to its definition.
    pub fn resolve<'a>(&'a self, node: &'a SchemaNode) -> Option<&'a SchemaNode> {
        self.names.resolve(node)
    }

    /// Serialize the schema to canonical JSON text.
    ///
    /// The output parses back to an equal schema.
    ///
    /// # Example
    /// ```
    /// use avrolite::Schema;
    ///
    /// let schema = Schema::parse(r#"{"type": "array", "items": "long"}"#).unwrap();
    /// assert_eq!(schema.to_json(), r#"{"type":"array","items":"long"}"#);
    /// ```
    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }

    /// Serialize the schema to a JSON value.
    pub fn to_json_value(&self) -> Json {
        node_to_json(&self.root, &self.names, None)
    }
}

/// Write `type`, `name` and `namespace` of a named type.
///
/// A type in the null namespace nested inside a namespaced one gets an
/// explicit `"namespace": ""`; otherwise it would inherit the enclosing
/// namespace when parsed back.
fn named_header(
    obj: &mut Map<String, Json>,
    kind: &str,
    name: &str,
    ns: Option<&str>,
    enclosing: Option<&str>,
) {
    obj.insert("type".to_string(), json!(kind));
    obj.insert("name".to_string(), json!(name));
    match (ns, enclosing) {
        (Some(ns), _) => {
            obj.insert("namespace".to_string(), json!(ns));
        }
        (None, Some(_)) => {
            obj.insert("namespace".to_string(), json!(""));
        }
        (None, None) => {}
    }
}

fn non_empty(ns: &Option<String>) -> Option<&str> {
    ns.as_deref().filter(|ns| !ns.is_empty())
}

/// Serialize a node as it appears inside a type whose namespace is
/// `enclosing`.
///
/// References are written as full names. A dotted full name resolves
/// exactly; a name in the null namespace is written bare.
fn node_to_json(node: &SchemaNode, names: &NameRegistry, enclosing: Option<&str>) -> Json {
    match node {
        SchemaNode::Array(items) => json!({
            "type": "array",
            "items": node_to_json(items, names, enclosing)
        }),
        SchemaNode::Map(values) => json!({
            "type": "map",
            "values": node_to_json(values, names, enclosing)
        }),
        SchemaNode::Union(branches) => Json::Array(
            branches
                .iter()
                .map(|b| node_to_json(b, names, enclosing))
                .collect(),
        ),
        SchemaNode::Record(r) => {
            let ns = non_empty(&r.namespace);
            let mut obj = Map::new();
            named_header(&mut obj, "record", &r.name, ns, enclosing);
            if let Some(doc) = &r.doc {
                obj.insert("doc".to_string(), json!(doc));
            }
            let fields = r
                .fields
                .iter()
                .map(|f| {
                    let mut field = Map::new();
                    field.insert("name".to_string(), json!(&f.name));
                    field.insert("type".to_string(), node_to_json(&f.schema, names, ns));
                    if let Some(default) = &f.default {
                        // Defaults are checked against the field type on construction
                        if let Ok(json) =
                            crate::textual::encode::default_to_json(&f.schema, default, names)
                        {
                            field.insert("default".to_string(), json);
                        }
                    }
                    if let Some(doc) = &f.doc {
                        field.insert("doc".to_string(), json!(doc));
                    }
                    Json::Object(field)
                })
                .collect();
            obj.insert("fields".to_string(), Json::Array(fields));
            Json::Object(obj)
        }
        SchemaNode::Enum(e) => {
            let mut obj = Map::new();
            named_header(&mut obj, "enum", &e.name, non_empty(&e.namespace), enclosing);
            if let Some(doc) = &e.doc {
                obj.insert("doc".to_string(), json!(doc));
            }
            obj.insert("symbols".to_string(), json!(&e.symbols));
            Json::Object(obj)
        }
        SchemaNode::Fixed(f) => {
            let mut obj = Map::new();
            named_header(&mut obj, "fixed", &f.name, non_empty(&f.namespace), enclosing);
            if let Some(doc) = &f.doc {
                obj.insert("doc".to_string(), json!(doc));
            }
            obj.insert("size".to_string(), json!(f.size));
            Json::Object(obj)
        }
        // Primitives and references serialize as plain strings
        other => json!(other.type_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fullname_with_and_without_namespace() {
        let r = RecordSchema::new("User", vec![]).with_namespace("com.example");
        assert_eq!(r.fullname(), "com.example.User");
        assert_eq!(EnumSchema::new("Color", vec![]).fullname(), "Color");
    }

    #[test]
    fn test_type_name() {
        assert_eq!(SchemaNode::Long.type_name(), "long");
        assert_eq!(SchemaNode::Map(Box::new(SchemaNode::Int)).type_name(), "map");
        let fixed = FixedSchema::new("Md5", 16).with_namespace("h");
        assert_eq!(SchemaNode::Fixed(fixed).type_name(), "h.Md5");
    }

    #[test]
    fn test_null_namespace_inside_namespaced_record() {
        let kind = EnumSchema::new("Kind", vec!["A".into()]);
        let outer = RecordSchema::new("Outer", vec![FieldSchema::new("k", SchemaNode::Enum(kind))])
            .with_namespace("a");
        let json = node_to_json(&SchemaNode::Record(outer), &NameRegistry::new(), None);
        assert_eq!(json["namespace"], json!("a"));
        assert_eq!(json["fields"][0]["type"]["namespace"], json!(""));
    }

    #[test]
    fn test_registry_placeholder_does_not_resolve() {
        let mut names = NameRegistry::new();
        names.insert("Node".to_string(), SchemaNode::Named("Node".to_string()));
        let reference = SchemaNode::Named("Node".to_string());
        assert!(names.resolve(&reference).is_none());
        assert_eq!(names.resolve(&SchemaNode::Int), Some(&SchemaNode::Int));
    }
}
