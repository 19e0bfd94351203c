/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Shape schemas.
//!
//! A shape is a named data schema describing the structure of an operation's
//! input or output. Shapes reference each other by name through [`ShapeRef`];
//! resolution happens against the owning service description.

use indexmap::IndexMap;
use serde::Deserialize;

/// A reference to a named shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShapeRef {
    /// Name of the referenced shape.
    pub shape: String,
}

/// A data schema.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    /// A structure with named members.
    Structure {
        /// Members that must be present.
        #[serde(default)]
        required: Vec<String>,
        /// Member name to shape reference.
        #[serde(default)]
        members: IndexMap<String, ShapeRef>,
    },
    /// A homogeneous list.
    List {
        /// Shape of each element.
        member: ShapeRef,
    },
    /// A map with string-like keys.
    Map {
        /// Shape of the keys.
        key: ShapeRef,
        /// Shape of the values.
        value: ShapeRef,
    },
    /// A string.
    String,
    /// A 32-bit integer.
    Integer,
    /// A 64-bit integer.
    Long,
    /// A single-precision float.
    Float,
    /// A double-precision float.
    Double,
    /// A boolean.
    Boolean,
    /// A point in time.
    Timestamp,
    /// Opaque binary content.
    Blob,
}

impl Shape {
    /// A short name for the shape's type, used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Shape::Structure { .. } => "structure",
            Shape::List { .. } => "list",
            Shape::Map { .. } => "map",
            Shape::String => "string",
            Shape::Integer => "integer",
            Shape::Long => "long",
            Shape::Float => "float",
            Shape::Double => "double",
            Shape::Boolean => "boolean",
            Shape::Timestamp => "timestamp",
            Shape::Blob => "blob",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_tagged_shapes() {
        let shape: Shape = serde_json::from_value(serde_json::json!({
            "type": "structure",
            "required": ["Name"],
            "members": {
                "Name": { "shape": "WidgetName" },
                "Count": { "shape": "Integer" }
            }
        }))
        .unwrap();
        match shape {
            Shape::Structure { required, members } => {
                assert_eq!(required, vec!["Name"]);
                assert_eq!(
                    members.keys().collect::<Vec<_>>(),
                    vec!["Name", "Count"]
                );
            }
            other => panic!("expected structure, got {:?}", other),
        }
    }
}
