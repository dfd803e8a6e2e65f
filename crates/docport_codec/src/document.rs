//! Ordered, schemaless documents.

use crate::value::Value;

/// An ordered mapping from field name to [`Value`].
///
/// Insertion order is preserved and is part of equality, so a document
/// that goes through either wire format comes back field for field.
/// Field names are unique: inserting an existing name replaces the value
/// in place without moving it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty document with room for `capacity` fields.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Builder form of [`Document::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks up a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Looks up a string field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Returns true if the field is present (even when null).
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    /// Sets a field, returning the previous value if there was one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((key, value));
                None
            }
        }
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(idx).1)
    }

    /// Iterates over fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over field names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_kept() {
        let doc = Document::new().with("z", 1).with("a", 2).with("m", 3);
        let keys: Vec<_> = doc.keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut doc = Document::new().with("a", 1).with("b", 2);
        let prev = doc.insert("a", "one");
        assert_eq!(prev, Some(Value::Int32(1)));
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.keys().next(), Some("a"));
        assert_eq!(doc.get_str("a"), Some("one"));
    }

    #[test]
    fn remove_and_lookup() {
        let mut doc = Document::new().with("a", 1).with("b", Value::Null);
        assert!(doc.contains_key("b"));
        assert_eq!(doc.get("missing"), None);
        assert_eq!(doc.remove("a"), Some(Value::Int32(1)));
        assert_eq!(doc.remove("a"), None);
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn order_matters_for_equality() {
        let a = Document::new().with("x", 1).with("y", 2);
        let b = Document::new().with("y", 2).with("x", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn collect_deduplicates_keys() {
        let doc: Document = vec![
            ("k".to_string(), Value::Int32(1)),
            ("k".to_string(), Value::Int32(2)),
        ]
        .into_iter()
        .collect();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.get("k"), Some(&Value::Int32(2)));
    }
}
