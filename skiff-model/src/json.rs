/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Conversions between [`Document`] and `serde_json::Value`.
//!
//! Model and config files cross the file boundary as JSON; the runtime works
//! in documents. These conversions are lossless in both directions except
//! that JSON numbers outside the `u64`/`i64`/`f64` ranges collapse to `f64`.

use serde_json::Value;
use skiff_types::{Document, Number};
use std::collections::HashMap;

/// Converts a JSON value into a document.
pub fn to_document(value: Value) -> Document {
    match value {
        Value::Null => Document::Null,
        Value::Bool(b) => Document::Bool(b),
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                Document::Number(Number::PosInt(v))
            } else if let Some(v) = n.as_i64() {
                Document::Number(Number::NegInt(v))
            } else {
                Document::Number(Number::Float(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        Value::String(s) => Document::String(s),
        Value::Array(values) => Document::Array(values.into_iter().map(to_document).collect()),
        Value::Object(map) => Document::Object(
            map.into_iter()
                .map(|(k, v)| (k, to_document(v)))
                .collect::<HashMap<_, _>>(),
        ),
    }
}

/// Converts a document into a JSON value.
pub fn to_value(document: &Document) -> Value {
    match document {
        Document::Null => Value::Null,
        Document::Bool(b) => Value::Bool(*b),
        Document::Number(Number::PosInt(v)) => Value::from(*v),
        Document::Number(Number::NegInt(v)) => Value::from(*v),
        Document::Number(Number::Float(v)) => {
            serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number)
        }
        Document::String(s) => Value::String(s.clone()),
        Document::Array(values) => Value::Array(values.iter().map(to_value).collect()),
        Document::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), to_value(v)))
                .collect(),
        ),
    }
}
