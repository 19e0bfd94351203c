/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Generic service error metadata.

use std::collections::HashMap;
use std::fmt;

/// Metadata parsed from a service error response.
///
/// Services declare their own rich error shapes, but every error response
/// carries at least a code and a message. The runtime classifies by `code`
/// only; `message` is display text and is never inspected for control flow.
#[derive(Debug, Eq, PartialEq, Default, Clone)]
pub struct ErrorMetadata {
    code: Option<String>,
    message: Option<String>,
    extras: Option<HashMap<&'static str, String>>,
}

/// Builder for [`ErrorMetadata`].
#[derive(Debug, Default)]
pub struct Builder {
    inner: ErrorMetadata,
}

impl Builder {
    /// Sets the error code.
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.inner.code = Some(code.into());
        self
    }

    /// Sets the error message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.inner.message = Some(message.into());
        self
    }

    /// Sets a custom field on the error metadata (e.g. a request id).
    pub fn custom(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.inner
            .extras
            .get_or_insert_with(HashMap::new)
            .insert(key, value.into());
        self
    }

    /// Creates the error metadata.
    pub fn build(self) -> ErrorMetadata {
        self.inner
    }
}

impl ErrorMetadata {
    /// Returns a builder for `ErrorMetadata`.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Returns the error code, if one was present in the response.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Returns the error message, if one was present in the response.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns additional information about the error, if present.
    pub fn extra(&self, key: &'static str) -> Option<&str> {
        self.extras
            .as_ref()
            .and_then(|extras| extras.get(key).map(|v| v.as_str()))
    }
}

impl fmt::Display for ErrorMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fmt = f.debug_struct("Error");
        if let Some(code) = &self.code {
            fmt.field("code", code);
        }
        if let Some(message) = &self.message {
            fmt.field("message", message);
        }
        if let Some(extras) = &self.extras {
            for (k, v) in extras {
                fmt.field(k, v);
            }
        }
        fmt.finish()
    }
}

impl std::error::Error for ErrorMetadata {}

#[cfg(test)]
mod tests {
    use super::ErrorMetadata;

    #[test]
    fn builder_round_trips_fields() {
        let err = ErrorMetadata::builder()
            .code("ThrottlingException")
            .message("slow down")
            .custom("request_id", "abc-123")
            .build();
        assert_eq!(err.code(), Some("ThrottlingException"));
        assert_eq!(err.message(), Some("slow down"));
        assert_eq!(err.extra("request_id"), Some("abc-123"));
        assert_eq!(err.extra("missing"), None);
    }
}
