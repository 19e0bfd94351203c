/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Parameter validation against input shapes.

use crate::error::ParamValidationError;
use skiff_model::{ServiceModel, Shape};
use skiff_types::{Document, Number};

/// Validates `params` against `shape`, resolving member shapes through
/// `service`. The first violation wins and names the offending field path.
pub fn validate_params(
    service: &ServiceModel,
    shape: &Shape,
    params: &Document,
) -> Result<(), ParamValidationError> {
    walk(service, "", shape, params)
}

fn walk(
    service: &ServiceModel,
    path: &str,
    shape: &Shape,
    value: &Document,
) -> Result<(), ParamValidationError> {
    match shape {
        Shape::Structure { required, members } => {
            let Some(object) = value.as_object() else {
                return Err(type_error(path, shape, value));
            };
            for name in required {
                match object.get(name) {
                    None | Some(Document::Null) => {
                        return Err(ParamValidationError::new(
                            join(path, name),
                            "missing required parameter",
                        ));
                    }
                    Some(_) => {}
                }
            }
            for (name, member_value) in object {
                let Some(member_ref) = members.get(name) else {
                    return Err(ParamValidationError::new(
                        join(path, name),
                        "unknown parameter",
                    ));
                };
                let member_shape = resolve(service, path, name, &member_ref.shape)?;
                walk(service, &join(path, name), member_shape, member_value)?;
            }
            Ok(())
        }
        Shape::List { member } => {
            let Some(items) = value.as_array() else {
                return Err(type_error(path, shape, value));
            };
            let member_shape = resolve(service, path, "member", &member.shape)?;
            for (index, item) in items.iter().enumerate() {
                walk(service, &format!("{path}[{index}]"), member_shape, item)?;
            }
            Ok(())
        }
        Shape::Map { value: value_ref, .. } => {
            let Some(object) = value.as_object() else {
                return Err(type_error(path, shape, value));
            };
            let value_shape = resolve(service, path, "value", &value_ref.shape)?;
            for (key, entry) in object {
                walk(service, &join(path, key), value_shape, entry)?;
            }
            Ok(())
        }
        Shape::String => match value {
            Document::String(_) => Ok(()),
            _ => Err(type_error(path, shape, value)),
        },
        Shape::Integer | Shape::Long => match value {
            Document::Number(Number::PosInt(_)) | Document::Number(Number::NegInt(_)) => Ok(()),
            _ => Err(type_error(path, shape, value)),
        },
        Shape::Float | Shape::Double => match value {
            Document::Number(_) => Ok(()),
            _ => Err(type_error(path, shape, value)),
        },
        Shape::Boolean => match value {
            Document::Bool(_) => Ok(()),
            _ => Err(type_error(path, shape, value)),
        },
        // Timestamps arrive as ISO-8601 strings or epoch numbers; blobs as
        // base64 strings. Content checks belong to the protocol.
        Shape::Timestamp => match value {
            Document::String(_) | Document::Number(_) => Ok(()),
            _ => Err(type_error(path, shape, value)),
        },
        Shape::Blob => match value {
            Document::String(_) => Ok(()),
            _ => Err(type_error(path, shape, value)),
        },
    }
}

fn resolve<'a>(
    service: &'a ServiceModel,
    path: &str,
    member: &str,
    shape_name: &str,
) -> Result<&'a Shape, ParamValidationError> {
    service.shape(shape_name).ok_or_else(|| {
        ParamValidationError::new(
            join(path, member),
            format!("references undefined shape `{shape_name}`"),
        )
    })
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}

fn type_error(path: &str, shape: &Shape, value: &Document) -> ParamValidationError {
    let actual = match value {
        Document::Object(_) => "object",
        Document::Array(_) => "array",
        Document::Number(_) => "number",
        Document::String(_) => "string",
        Document::Bool(_) => "boolean",
        Document::Null => "null",
    };
    let path = if path.is_empty() { "(root)" } else { path };
    ParamValidationError::new(path, format!("expected {}, got {actual}", shape.type_name()))
}
