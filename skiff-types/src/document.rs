/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Open-content values.

use std::collections::HashMap;

/// Document type
///
/// Documents represent protocol-agnostic open content that is accessed like
/// JSON data. Operation parameters and parsed results are carried as
/// documents; the serialization format is an implementation detail of the
/// protocol in use.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// Object of named values
    Object(HashMap<String, Document>),
    /// Array of values
    Array(Vec<Document>),
    /// Number
    Number(Number),
    /// String
    String(String),
    /// Boolean
    Bool(bool),
    /// Null
    Null,
}

/// A number type that implements Javascript / JSON semantics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Unsigned 64-bit integer value
    PosInt(u64),
    /// Signed 64-bit integer value
    NegInt(i64),
    /// 64-bit floating-point value
    Float(f64),
}

impl Document {
    /// Returns the inner object if this document is an object.
    pub fn as_object(&self) -> Option<&HashMap<String, Document>> {
        match self {
            Document::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the inner object mutably if this document is an object.
    pub fn as_object_mut(&mut self) -> Option<&mut HashMap<String, Document>> {
        match self {
            Document::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the inner array if this document is an array.
    pub fn as_array(&self) -> Option<&Vec<Document>> {
        match self {
            Document::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Returns the inner string if this document is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Document::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the inner boolean if this document is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Document::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// True for `Document::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Document::Null)
    }

    /// Looks up a member of an object document.
    ///
    /// Returns `None` when the document is not an object or the key is
    /// absent.
    pub fn get(&self, key: &str) -> Option<&Document> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Follows a dot-separated path (`"Widget.Status"`) through nested
    /// objects.
    pub fn get_path(&self, path: &str) -> Option<&Document> {
        let mut current = self;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current)
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::Null
    }
}

impl From<bool> for Document {
    fn from(value: bool) -> Self {
        Document::Bool(value)
    }
}

impl From<String> for Document {
    fn from(value: String) -> Self {
        Document::String(value)
    }
}

impl From<&str> for Document {
    fn from(value: &str) -> Self {
        Document::String(value.to_string())
    }
}

impl From<Vec<Document>> for Document {
    fn from(values: Vec<Document>) -> Self {
        Document::Array(values)
    }
}

impl From<HashMap<String, Document>> for Document {
    fn from(values: HashMap<String, Document>) -> Self {
        Document::Object(values)
    }
}

impl From<u64> for Document {
    fn from(value: u64) -> Self {
        Document::Number(Number::PosInt(value))
    }
}

impl From<i64> for Document {
    fn from(value: i64) -> Self {
        Document::Number(Number::NegInt(value))
    }
}

impl From<i32> for Document {
    fn from(value: i32) -> Self {
        Document::Number(Number::NegInt(value as i64))
    }
}

impl From<f64> for Document {
    fn from(value: f64) -> Self {
        Document::Number(Number::Float(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> Document {
        let mut status = HashMap::new();
        status.insert("Status".to_string(), Document::from("Ready"));
        let mut root = HashMap::new();
        root.insert("Widget".to_string(), Document::Object(status));
        Document::Object(root)
    }

    #[test]
    fn path_lookup_follows_nested_objects() {
        let doc = widget();
        assert_eq!(
            doc.get_path("Widget.Status").and_then(Document::as_str),
            Some("Ready")
        );
        assert_eq!(doc.get_path("Widget.Missing"), None);
        assert_eq!(doc.get_path("Missing"), None);
    }

    #[test]
    fn get_on_non_object_is_none() {
        assert_eq!(Document::from("scalar").get("anything"), None);
    }
}
