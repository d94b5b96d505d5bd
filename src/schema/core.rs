use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A typed record definition usable as a payload slot type.
///
/// Usually derived with `#[derive(Schema)]`; implement it by hand when the JSON Schema
/// needs keywords the derive does not emit.
pub trait Schema: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name used in logs and validation errors.
    fn schema_name() -> &'static str;

    /// JSON Schema document describing the record.
    fn json_schema() -> Value;
}

/// Typed instance produced by a successful bind, stored behind `dyn Any`.
pub type AnyPayload = Arc<dyn Any + Send + Sync>;

type Instantiate = fn(Value) -> Result<AnyPayload, serde_json::Error>;

struct SchemaInner {
    type_id: TypeId,
    name: &'static str,
    document: Value,
    instantiate: Instantiate,
}

/// Cheaply clonable, type-erased handle to a [`Schema`] type.
///
/// Two handles compare equal when they were created from the same Rust type.
#[derive(Clone)]
pub struct SchemaRef {
    inner: Arc<SchemaInner>,
}

fn instantiate_as<T: Schema>(doc: Value) -> Result<AnyPayload, serde_json::Error> {
    let value: T = serde_json::from_value(doc)?;
    Ok(Arc::new(value))
}

impl SchemaRef {
    pub fn of<T: Schema>() -> Self {
        Self {
            inner: Arc::new(SchemaInner {
                type_id: TypeId::of::<T>(),
                name: T::schema_name(),
                document: T::json_schema(),
                instantiate: instantiate_as::<T>,
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.inner.type_id
    }

    /// The JSON Schema document.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.inner.document
    }

    /// Whether `T` is the type behind this handle.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.inner.type_id == TypeId::of::<T>()
    }

    /// Schema of a declared top-level field.
    #[must_use]
    pub fn field_schema(&self, field: &str) -> Option<&Value> {
        self.inner
            .document
            .get("properties")
            .and_then(|p| p.get(field))
    }

    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.field_schema(field).is_some()
    }

    /// Whether a field is declared with a collection type. Unknown fields are not.
    #[must_use]
    pub fn is_collection_field(&self, field: &str) -> bool {
        self.field_schema(field).is_some_and(is_collection)
    }

    /// Deserialize an already validated document into the concrete type.
    pub fn instantiate(&self, doc: Value) -> Result<AnyPayload, serde_json::Error> {
        (self.inner.instantiate)(doc)
    }
}

impl PartialEq for SchemaRef {
    fn eq(&self, other: &Self) -> bool {
        self.inner.type_id == other.inner.type_id
    }
}

impl Eq for SchemaRef {}

impl fmt::Debug for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SchemaRef").field(&self.inner.name).finish()
    }
}

/// Strip a nullable wrapper: `anyOf`/`oneOf` with exactly one non-null branch.
///
/// `Option<Vec<T>>` derives to `{"anyOf": [{"type": "array", ...}, {"type": "null"}]}`; the
/// array branch is what the collection test and coercion need to look at.
#[must_use]
pub fn unwrap_nullable(schema: &Value) -> &Value {
    for key in ["anyOf", "oneOf"] {
        if let Some(branches) = schema.get(key).and_then(Value::as_array) {
            let mut non_null = branches.iter().filter(|b| !is_null_schema(b));
            if let (Some(only), None) = (non_null.next(), non_null.next()) {
                return unwrap_nullable(only);
            }
        }
    }
    schema
}

fn is_null_schema(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("null")
}

/// The declared JSON type, ignoring `"null"` in a type list.
#[must_use]
pub fn primary_type(schema: &Value) -> Option<&str> {
    match unwrap_nullable(schema).get("type")? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

/// Collection test used by the normalizer.
///
/// Arrays and free-form maps are collections; strings, scalars, nested records and
/// untyped (`{}`) fields are not. Nullable wrappers are looked through.
#[must_use]
pub fn is_collection(schema: &Value) -> bool {
    let inner = unwrap_nullable(schema);
    match primary_type(inner) {
        Some("array") => true,
        Some("object") => inner.get("properties").is_none(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_collection_basic_types() {
        assert!(is_collection(&json!({"type": "array", "items": {"type": "string"}})));
        assert!(is_collection(&json!({"type": "object", "additionalProperties": {}})));
        assert!(!is_collection(&json!({"type": "string"})));
        assert!(!is_collection(&json!({"type": "integer"})));
        assert!(!is_collection(&json!({})));
        assert!(!is_collection(
            &json!({"type": "object", "properties": {"a": {"type": "string"}}})
        ));
    }

    #[test]
    fn test_is_collection_looks_through_nullable() {
        let opt_list = json!({"anyOf": [{"type": "array"}, {"type": "null"}]});
        assert!(is_collection(&opt_list));
        assert!(is_collection(&json!({"type": ["array", "null"]})));
        let opt_str = json!({"anyOf": [{"type": "string"}, {"type": "null"}]});
        assert!(!is_collection(&opt_str));
    }

    #[test]
    fn test_union_of_two_real_types_is_left_alone() {
        let union = json!({"anyOf": [{"type": "array"}, {"type": "string"}]});
        assert_eq!(unwrap_nullable(&union), &union);
        assert_eq!(primary_type(&union), None);
    }
}
