/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Protocol contracts.
//!
//! A protocol is two halves: turning caller parameters into a request
//! envelope per the operation's input shape, and turning a raw response into
//! a document per the output shape (or into error metadata for status
//! ≥ 300). The runtime is protocol-agnostic; [`json::JsonProtocol`] is the
//! reference implementation and other protocols plug in through the traits.

use crate::error::{BoxError, ParamValidationError};
use crate::request::{Request, Response};
use skiff_model::{OperationModel, ServiceModel};
use skiff_types::{Document, ErrorMetadata};
use std::fmt;
use std::sync::Arc;

pub mod json;
mod validate;

pub use validate::validate_params;

/// Serializes caller parameters into a request envelope.
pub trait SerializeRequest: Send + Sync + fmt::Debug {
    /// Builds the envelope for one operation call.
    ///
    /// Parameters that do not conform to the operation's input shape fail
    /// with [`SerializeError::Validation`] naming the offending field path;
    /// data is never silently dropped.
    fn serialize(
        &self,
        params: &Document,
        operation: &OperationModel<'_>,
    ) -> Result<Request, SerializeError>;
}

/// Parses raw responses.
pub trait ParseResponse: Send + Sync + fmt::Debug {
    /// Parses a success response per the operation's output shape.
    fn parse(
        &self,
        response: &Response,
        operation: &OperationModel<'_>,
    ) -> Result<Document, ParseError>;

    /// Extracts structured error metadata from an error response
    /// (status ≥ 300). Infallible: unparseable bodies yield empty metadata,
    /// never a panic or a silent drop of the status.
    fn parse_error(&self, response: &Response) -> ErrorMetadata;
}

/// Why serialization failed.
#[derive(Debug)]
pub enum SerializeError {
    /// The parameters failed the input shape.
    Validation(ParamValidationError),
    /// The envelope could not be constructed (e.g. a model value is not
    /// representable in the protocol).
    Construction(BoxError),
}

impl From<ParamValidationError> for SerializeError {
    fn from(err: ParamValidationError) -> Self {
        SerializeError::Validation(err)
    }
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializeError::Validation(err) => err.fmt(f),
            SerializeError::Construction(err) => write!(f, "failed to build request: {err}"),
        }
    }
}

impl std::error::Error for SerializeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SerializeError::Validation(err) => Some(err),
            SerializeError::Construction(err) => Some(err.as_ref() as _),
        }
    }
}

/// A success response body that does not conform to the protocol.
#[derive(Debug)]
pub struct ParseError {
    message: String,
    source: Option<BoxError>,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse response: {}", self.message)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|err| err.as_ref() as _)
    }
}

/// Builds the serializer/parser pair for a service's declared protocol.
///
/// Returns `None` for protocols the runtime does not implement; the client
/// creator turns that into a configuration error naming the protocol.
pub(crate) fn resolve(
    model: &ServiceModel,
) -> Option<(Arc<dyn SerializeRequest>, Arc<dyn ParseResponse>)> {
    match model.protocol() {
        "json" => {
            let protocol = Arc::new(json::JsonProtocol::new(model.endpoint_prefix()));
            Some((protocol.clone(), protocol))
        }
        _ => None,
    }
}
