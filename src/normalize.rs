//! Multi-valued form/query maps and the single-value collapse rule.
//!
//! URL and form encodings allow a key to repeat, so both arrive as key to list-of-values.
//! Before a map is validated against a schema, [`normalize`] collapses every one-element
//! list whose field is not collection-typed into its bare value:
//!
//! ```rust
//! use brrtbind::normalize::{normalize, MultiMap};
//! use brrtbind::{Schema, SchemaRef};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Schema)]
//! struct Filter {
//!     user_id: i64,
//!     tag: Vec<String>,
//! }
//!
//! let query = MultiMap::from_urlencoded("?user_id=5&tag=a");
//! let doc = normalize(&query, &SchemaRef::of::<Filter>());
//! assert_eq!(doc["user_id"], "5");
//! assert_eq!(doc["tag"], serde_json::json!(["a"]));
//! ```

use crate::schema::SchemaRef;
use serde_json::{Map, Value};
use url::form_urlencoded;

/// Ordered key to one-or-more string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiMap {
    entries: Vec<(String, Vec<String>)>,
}

impl MultiMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `application/x-www-form-urlencoded` text. A leading `?` is ignored and pairs
    /// with a blank value are dropped.
    #[must_use]
    pub fn from_urlencoded(input: &str) -> Self {
        let input = input.strip_prefix('?').unwrap_or(input);
        form_urlencoded::parse(input.as_bytes())
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Add a value, keeping the key's first-seen position.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// First value of a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value of a key, in arrival order.
    ///
    /// # Returns
    ///
    /// `None` if the key never appeared, otherwise a non-empty slice
    ///
    /// # Example
    ///
    /// ```rust
    /// use brrtbind::normalize::MultiMap;
    ///
    /// let query = MultiMap::from_urlencoded("tag=a&page=2&tag=b");
    /// assert_eq!(query.get_all("tag"), Some(&["a".to_string(), "b".to_string()][..]));
    /// assert_eq!(query.get_all("missing"), None);
    /// ```
    #[must_use]
    pub fn get_all(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get_all(key).is_some()
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MultiMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = MultiMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for MultiMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.append(k, v);
        }
    }
}

/// Reconcile a multimap against a schema.
///
/// A key with exactly one value collapses to that value when the schema declares the key
/// with a non-collection type. Keys the schema does not declare, keys with several values
/// and collection-typed keys keep their list.
#[must_use]
pub fn normalize(map: &MultiMap, schema: &SchemaRef) -> Map<String, Value> {
    map.iter()
        .map(|(key, values)| {
            let value = match values {
                [single] if schema.has_field(key) && !schema.is_collection_field(key) => {
                    Value::String(single.clone())
                }
                _ => Value::Array(values.iter().cloned().map(Value::String).collect()),
            };
            (key.to_string(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Serialize, Deserialize)]
    struct Shape {
        name: String,
        tags: Vec<String>,
        maybe_tags: Option<Vec<String>>,
        labels: std::collections::HashMap<String, String>,
    }

    impl Schema for Shape {
        fn schema_name() -> &'static str {
            "Shape"
        }
        fn json_schema() -> Value {
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "maybe_tags": {"anyOf": [{"type": "array", "items": {"type": "string"}}, {"type": "null"}]},
                    "labels": {"type": "object", "additionalProperties": {"type": "string"}}
                }
            })
        }
    }

    #[test]
    fn test_from_urlencoded_groups_repeats() {
        let map = MultiMap::from_urlencoded("?a=1&b=x%20y&a=2&empty=");
        assert_eq!(map.get_all("a"), Some(&["1".to_string(), "2".to_string()][..]));
        assert_eq!(map.get("b"), Some("x y"));
        assert!(!map.contains_key("empty"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_string_field_collapses() {
        let map: MultiMap = [("name", "bob")].into_iter().collect();
        let out = normalize(&map, &SchemaRef::of::<Shape>());
        assert_eq!(out["name"], json!("bob"));
    }

    #[test]
    fn test_collection_fields_keep_list() {
        let map: MultiMap = [("tags", "a"), ("maybe_tags", "b"), ("labels", "c")]
            .into_iter()
            .collect();
        let out = normalize(&map, &SchemaRef::of::<Shape>());
        assert_eq!(out["tags"], json!(["a"]));
        assert_eq!(out["maybe_tags"], json!(["b"]));
        assert_eq!(out["labels"], json!(["c"]));
    }

    #[test]
    fn test_unknown_key_passes_through() {
        let map: MultiMap = [("zzz", "1")].into_iter().collect();
        let out = normalize(&map, &SchemaRef::of::<Shape>());
        assert_eq!(out["zzz"], json!(["1"]));
    }

    proptest! {
        #[test]
        fn prop_repeated_scalar_key_is_never_collapsed(values in prop::collection::vec("[a-z]{1,8}", 2..6)) {
            let map: MultiMap = values.iter().map(|v| ("name", v.clone())).collect();
            let out = normalize(&map, &SchemaRef::of::<Shape>());
            let expected: Vec<Value> = values.into_iter().map(Value::String).collect();
            prop_assert_eq!(&out["name"], &Value::Array(expected));
        }

        #[test]
        fn prop_single_scalar_value_collapses(value in "[ -~]{1,16}") {
            let map: MultiMap = [("name", value.clone())].into_iter().collect();
            let out = normalize(&map, &SchemaRef::of::<Shape>());
            prop_assert_eq!(&out["name"], &Value::String(value));
        }
    }
}
