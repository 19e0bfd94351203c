/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The error taxonomy surfaced by client calls.

use crate::hooks::HookError;
use crate::transport::TransportError;
use crate::waiter::WaiterError;
use skiff_types::ErrorMetadata;
use std::fmt;

/// A boxed error that is `Send` and `Sync`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Any failure a client call can surface.
///
/// Validation and capability errors never reach the transport or retry
/// layer. Transport and service errors are offered to the registered retry
/// handler; once it gives up, the last error is surfaced unchanged.
#[derive(Debug)]
pub enum Error {
    /// Caller-supplied parameters failed the operation's input shape.
    /// Never sent over the wire, never retried.
    ParamValidation(ParamValidationError),

    /// The service returned an error response (status ≥ 300).
    Service(ServiceError),

    /// The network exchange could not be completed.
    Transport(TransportError),

    /// Pagination or waiter functionality was invoked on an operation or
    /// service that does not support it.
    Capability(CapabilityError),

    /// A model, waiter, or retry configuration is unusable.
    Configuration(ConfigurationError),

    /// A waiter finished in a failure state or exhausted its budget.
    Waiter(WaiterError),

    /// A registered extension hook failed.
    Hook(HookError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ParamValidation(err) => err.fmt(f),
            Error::Service(err) => err.fmt(f),
            Error::Transport(err) => err.fmt(f),
            Error::Capability(err) => err.fmt(f),
            Error::Configuration(err) => err.fmt(f),
            Error::Waiter(err) => err.fmt(f),
            Error::Hook(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ParamValidation(err) => Some(err),
            Error::Service(err) => Some(err),
            Error::Transport(err) => Some(err),
            Error::Capability(err) => Some(err),
            Error::Configuration(err) => Some(err),
            Error::Waiter(err) => Some(err),
            Error::Hook(err) => Some(err),
        }
    }
}

macro_rules! from_variant {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for Error {
            fn from(err: $ty) -> Self {
                Error::$variant(err)
            }
        }
    };
}

from_variant!(ParamValidation, ParamValidationError);
from_variant!(Service, ServiceError);
from_variant!(Transport, TransportError);
from_variant!(Capability, CapabilityError);
from_variant!(Configuration, ConfigurationError);
from_variant!(Waiter, WaiterError);
from_variant!(Hook, HookError);

/// Parameters that do not conform to an operation's input shape.
#[derive(Debug)]
pub struct ParamValidationError {
    path: String,
    message: String,
}

impl ParamValidationError {
    /// Creates a validation error at the given field path.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Path of the offending field, e.g. `Widgets[2].Name`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// What was wrong with the value.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParamValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parameter validation failed at `{}`: {}",
            self.path, self.message
        )
    }
}

impl std::error::Error for ParamValidationError {}

/// An error response returned by the service.
#[derive(Debug, Clone)]
pub struct ServiceError {
    metadata: ErrorMetadata,
    status: u16,
    operation_name: String,
}

impl ServiceError {
    /// Creates a service error from parsed error metadata.
    pub fn new(metadata: ErrorMetadata, status: u16, operation_name: impl Into<String>) -> Self {
        Self {
            metadata,
            status,
            operation_name: operation_name.into(),
        }
    }

    /// The service-declared error code, verbatim.
    pub fn code(&self) -> Option<&str> {
        self.metadata.code()
    }

    /// The service-declared error message, verbatim. Display-only; never a
    /// control-flow discriminant.
    pub fn message(&self) -> Option<&str> {
        self.metadata.message()
    }

    /// HTTP status of the error response.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The operation that failed.
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    /// The full parsed error metadata.
    pub fn metadata(&self) -> &ErrorMetadata {
        &self.metadata
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "service error on {} (http status {}): {} - {}",
            self.operation_name,
            self.status,
            self.metadata.code().unwrap_or("Unknown"),
            self.metadata.message().unwrap_or("no message"),
        )
    }
}

impl std::error::Error for ServiceError {}

/// Pagination/waiter functionality invoked where it is not supported.
#[derive(Debug)]
pub struct CapabilityError {
    operation: String,
    message: String,
}

impl CapabilityError {
    pub(crate) fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// The operation or waiter name the caller asked about.
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`: {}", self.operation, self.message)
    }
}

impl std::error::Error for CapabilityError {}

/// A model or auxiliary config document that cannot be used.
#[derive(Debug)]
pub struct ConfigurationError {
    message: String,
    source: Option<BoxError>,
}

impl ConfigurationError {
    /// Creates a configuration error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigurationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|err| err.as_ref() as _)
    }
}
