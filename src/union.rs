//! Union branch resolution shared by the binary and textual encoders.
//!
//! A value encodes under the first branch, in declaration order, that can
//! encode it. [`candidates`] narrows the branches with a shallow check on
//! the value's kind; the encoders then try each candidate in turn and keep
//! the first that succeeds. The shallow check uses the same rules as the
//! encoders, with one addition: a record value whose keys name fields the
//! record lacks is not a candidate.
//!
//! UTF-8 bytes encode under a `string` node, as they do outside a union, but
//! only after every branch of the value's own kind, so bytes keep their
//! kind through a round trip whenever the union has a bytes or fixed branch.

use crate::schema::{NameRegistry, SchemaNode};
use crate::value::Value;

/// Branches that may encode the value, in trial order.
///
/// Yields the zero-based branch index and the resolved branch schema.
pub fn candidates<'a>(
    branches: &'a [SchemaNode],
    value: &'a Value,
    names: &'a NameRegistry,
) -> impl Iterator<Item = (usize, &'a SchemaNode)> + 'a {
    let resolved = move |(index, branch): (usize, &'a SchemaNode)| {
        names.resolve(branch).map(|schema| (index, schema))
    };
    let exact = branches
        .iter()
        .enumerate()
        .filter_map(resolved)
        .filter(move |(_, schema)| accepts(schema, value));
    let coerced = branches
        .iter()
        .enumerate()
        .filter_map(resolved)
        .filter(move |(_, schema)| accepts_as_string(schema, value));
    exact.chain(coerced)
}

/// Find a branch by its canonical type name, as used in textual wrappers.
pub fn branch_by_name<'a>(
    branches: &'a [SchemaNode],
    tag: &str,
    names: &'a NameRegistry,
) -> Option<(usize, &'a SchemaNode)> {
    branches
        .iter()
        .enumerate()
        .find(|(_, branch)| branch.type_name() == tag)
        .and_then(|(index, branch)| names.resolve(branch).map(|resolved| (index, resolved)))
}

fn accepts(schema: &SchemaNode, value: &Value) -> bool {
    match (schema, value) {
        (SchemaNode::Null, Value::Null) => true,
        (SchemaNode::Boolean, Value::Bool(_)) => true,
        (SchemaNode::Int, Value::Long(l)) => i32::try_from(*l).is_ok(),
        (SchemaNode::Long, Value::Long(_)) => true,
        (SchemaNode::Float, Value::Float(_)) => true,
        (SchemaNode::Double, Value::Double(_)) => true,
        (SchemaNode::Bytes, Value::Bytes(_)) => true,
        (SchemaNode::String, Value::String(_)) => true,
        (SchemaNode::Fixed(f), Value::Bytes(b)) => b.len() == f.size,
        (SchemaNode::Enum(e), Value::String(s)) => e.symbol_index(s).is_some(),
        (SchemaNode::Array(_), Value::Array(_)) => true,
        (SchemaNode::Map(_), Value::Map(_)) => true,
        (SchemaNode::Record(r), Value::Record(fields)) => {
            fields.keys().all(|k| r.field(k).is_some())
                && r
                    .fields
                    .iter()
                    .all(|f| f.default.is_some() || fields.contains_key(&f.name))
        }
        _ => false,
    }
}

fn accepts_as_string(schema: &SchemaNode, value: &Value) -> bool {
    match (schema, value) {
        (SchemaNode::String, Value::Bytes(b)) => std::str::from_utf8(b).is_ok(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumSchema, FieldSchema, RecordSchema};

    fn names() -> NameRegistry {
        NameRegistry::new()
    }

    fn first(branches: &[SchemaNode], value: &Value, names: &NameRegistry) -> Option<usize> {
        candidates(branches, value, names).next().map(|(index, _)| index)
    }

    #[test]
    fn test_null_selects_null_branch() {
        let branches = vec![SchemaNode::Null, SchemaNode::String];
        let names = names();
        assert_eq!(first(&branches, &Value::Null, &names), Some(0));
        assert_eq!(first(&branches, &Value::from("x"), &names), Some(1));
    }

    #[test]
    fn test_long_prefers_int_when_in_range() {
        let branches = vec![SchemaNode::Int, SchemaNode::Long];
        let names = names();
        assert_eq!(first(&branches, &Value::Long(5), &names), Some(0));
        assert_eq!(first(&branches, &Value::Long(i64::MAX), &names), Some(1));
    }

    #[test]
    fn test_enum_matches_known_symbol_only() {
        let branches = vec![
            SchemaNode::Enum(EnumSchema::new("Color", vec!["RED".into()])),
            SchemaNode::String,
        ];
        let names = names();
        assert_eq!(first(&branches, &Value::from("RED"), &names), Some(0));
        assert_eq!(first(&branches, &Value::from("BLUE"), &names), Some(1));
    }

    #[test]
    fn test_record_matches_by_shape() {
        let a = RecordSchema::new("A", vec![FieldSchema::new("x", SchemaNode::Long)]);
        let b = RecordSchema::new("B", vec![FieldSchema::new("y", SchemaNode::Long)]);
        let branches = vec![SchemaNode::Record(a), SchemaNode::Record(b)];
        let names = names();
        let v = Value::record([("y", Value::Long(1))]);
        assert_eq!(first(&branches, &v, &names), Some(1));
        let none = Value::record([("z", Value::Long(1))]);
        assert_eq!(first(&branches, &none, &names), None);
    }

    #[test]
    fn test_record_candidates_keep_declaration_order() {
        let a = RecordSchema::new("A", vec![FieldSchema::new("x", SchemaNode::Long)]);
        let b = RecordSchema::new("B", vec![FieldSchema::new("x", SchemaNode::String)]);
        let branches = vec![SchemaNode::Record(a), SchemaNode::Record(b)];
        let names = names();
        let v = Value::record([("x", Value::from("s"))]);
        let indexes: Vec<usize> = candidates(&branches, &v, &names).map(|(i, _)| i).collect();
        assert_eq!(indexes, vec![0, 1]);
    }

    #[test]
    fn test_utf8_bytes_are_a_string_candidate() {
        let branches = vec![SchemaNode::Null, SchemaNode::String];
        let names = names();
        assert_eq!(first(&branches, &Value::Bytes(b"ok".to_vec()), &names), Some(1));
        assert_eq!(first(&branches, &Value::Bytes(vec![0xFF]), &names), None);

        // A bytes branch wins even when declared after the string branch
        let branches = vec![SchemaNode::String, SchemaNode::Bytes];
        let indexes: Vec<usize> = candidates(&branches, &Value::Bytes(b"ok".to_vec()), &names)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(indexes, vec![1, 0]);
    }

    #[test]
    fn test_branch_by_name() {
        let branches = vec![SchemaNode::Null, SchemaNode::Long, SchemaNode::String];
        let names = names();
        assert_eq!(branch_by_name(&branches, "string", &names).map(|b| b.0), Some(2));
        assert!(branch_by_name(&branches, "int", &names).is_none());
    }
}
