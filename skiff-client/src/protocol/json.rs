/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The reference JSON protocol.
//!
//! Requests carry the operation as an `x-skiff-target` header and the
//! parameters as a JSON object body; responses are JSON objects. Error
//! responses carry their code under `__type` (optionally namespaced with
//! `#`), `code`, or `Code`.

use super::{ParseError, SerializeError, SerializeRequest, ParseResponse};
use crate::protocol::validate::validate_params;
use crate::request::{Request, Response};
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::Method;
use skiff_model::json::{to_document, to_value};
use skiff_model::OperationModel;
use skiff_types::{Document, ErrorMetadata};

const CONTENT_TYPE_VALUE: &str = "application/x-skiff-json-1.1";

fn target_header() -> HeaderName {
    HeaderName::from_static("x-skiff-target")
}

/// Serializer and parser for the `json` protocol.
#[derive(Debug)]
pub struct JsonProtocol {
    target_prefix: String,
}

impl JsonProtocol {
    /// Creates the protocol for a service; `target_prefix` scopes the
    /// target header (conventionally the endpoint prefix).
    pub fn new(target_prefix: impl Into<String>) -> Self {
        Self {
            target_prefix: target_prefix.into(),
        }
    }
}

impl SerializeRequest for JsonProtocol {
    fn serialize(
        &self,
        params: &Document,
        operation: &OperationModel<'_>,
    ) -> Result<Request, SerializeError> {
        match operation.input_shape() {
            Some(shape) => validate_params(operation.service(), shape, params)?,
            None => {
                let has_params = params
                    .as_object()
                    .map_or(!params.is_null(), |object| !object.is_empty());
                if has_params {
                    return Err(crate::error::ParamValidationError::new(
                        "(root)",
                        "operation accepts no parameters",
                    )
                    .into());
                }
            }
        }

        let method = Method::from_bytes(operation.http_method().as_bytes())
            .map_err(|err| SerializeError::Construction(err.into()))?;
        let mut request = Request::new(method, operation.request_uri());
        request.set_header(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_VALUE));
        let target = format!("{}.{}", self.target_prefix, operation.name());
        request.set_header(
            target_header(),
            HeaderValue::from_str(&target)
                .map_err(|err| SerializeError::Construction(err.into()))?,
        );

        let body = match params {
            Document::Null => b"{}".to_vec(),
            other => serde_json::to_vec(&to_value(other))
                .map_err(|err| SerializeError::Construction(err.into()))?,
        };
        request.set_body(body);
        Ok(request)
    }
}

impl ParseResponse for JsonProtocol {
    fn parse(
        &self,
        response: &Response,
        _operation: &OperationModel<'_>,
    ) -> Result<Document, ParseError> {
        if response.body().is_empty() {
            return Ok(Document::Object(Default::default()));
        }
        let value: serde_json::Value = serde_json::from_slice(response.body())
            .map_err(|err| ParseError::new("response body is not valid JSON").with_source(err))?;
        Ok(to_document(value))
    }

    fn parse_error(&self, response: &Response) -> ErrorMetadata {
        let Ok(value) = serde_json::from_slice::<serde_json::Value>(response.body()) else {
            return ErrorMetadata::default();
        };
        let mut builder = ErrorMetadata::builder();
        if let Some(code) = error_code(&value) {
            builder = builder.code(code);
        }
        if let Some(message) = value
            .get("message")
            .or_else(|| value.get("Message"))
            .and_then(|v| v.as_str())
        {
            builder = builder.message(message);
        }
        builder.build()
    }
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    let code = value
        .get("__type")
        .or_else(|| value.get("code"))
        .or_else(|| value.get("Code"))
        .and_then(|v| v.as_str())?;
    // `__type` may be namespaced: `com.example.widgets#WidgetNotFound`.
    Some(code.rsplit('#').next().unwrap_or(code))
}
