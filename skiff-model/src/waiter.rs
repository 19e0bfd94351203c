/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Waiter configuration.
//!
//! A waiter polls an operation until an acceptor matches. The on-disk form
//! is loosely typed (matcher and state are strings); [`WaiterIndex::waiter`]
//! converts one entry into the validated [`WaiterConfig`] the runtime
//! consumes, failing on unknown matchers or states rather than at poll time.

use crate::json::to_document;
use indexmap::IndexMap;
use serde::Deserialize;
use skiff_types::Document;
use std::fmt;
use std::time::Duration;

/// The per-service waiter document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WaiterIndex {
    /// Document format version.
    #[serde(default)]
    pub version: u32,
    /// Waiter entries keyed by declared waiter name.
    #[serde(default)]
    pub waiters: IndexMap<String, WaiterDescription>,
}

/// The raw, deserialized form of one waiter.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaiterDescription {
    /// Operation the waiter polls.
    pub operation: String,
    /// Seconds between polls.
    pub delay: u64,
    /// Attempt budget.
    pub max_attempts: u32,
    /// Ordered match rules.
    pub acceptors: Vec<AcceptorDescription>,
}

/// The raw form of one acceptor rule.
#[derive(Debug, Clone, Deserialize)]
pub struct AcceptorDescription {
    /// Target state: `success`, `failure`, or `retry`.
    pub state: String,
    /// Matcher kind: `status`, `error`, or `path`.
    pub matcher: String,
    /// Path argument for `path` matchers.
    #[serde(default)]
    pub argument: Option<String>,
    /// Expected value.
    #[serde(default)]
    pub expected: serde_json::Value,
}

/// A validated waiter configuration.
#[derive(Debug, Clone)]
pub struct WaiterConfig {
    /// Declared waiter name.
    pub name: String,
    /// Operation the waiter polls.
    pub operation: String,
    /// Interval between polls.
    pub delay: Duration,
    /// Attempt budget.
    pub max_attempts: u32,
    /// Ordered match rules; the first that matches a poll outcome wins.
    pub acceptors: Vec<Acceptor>,
}

/// One validated match rule.
#[derive(Debug, Clone)]
pub struct Acceptor {
    /// What to compare the poll outcome against.
    pub matcher: Matcher,
    /// State to transition to when the matcher matches.
    pub state: WaiterState,
}

/// What an acceptor inspects.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// The HTTP status of the poll response (service errors included).
    Status(u16),
    /// The error code of a service error response.
    ErrorCode(String),
    /// A dot-separated path into the parsed output, compared for equality.
    Path {
        /// Path into the output document.
        path: String,
        /// Value the path must equal.
        expected: Document,
    },
}

/// Waiter state machine states. `Success` and `Failure` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaiterState {
    /// Condition reached; the wait succeeds.
    Success,
    /// Terminal failure; the wait fails naming this rule.
    Failure,
    /// Keep polling.
    Retry,
}

/// A waiter document entry that cannot be converted into a usable config.
#[derive(Debug)]
pub struct InvalidWaiterConfig {
    waiter_name: String,
    message: String,
}

impl InvalidWaiterConfig {
    fn new(waiter_name: &str, message: impl Into<String>) -> Self {
        Self {
            waiter_name: waiter_name.to_string(),
            message: message.into(),
        }
    }

    /// Name of the offending waiter.
    pub fn waiter_name(&self) -> &str {
        &self.waiter_name
    }
}

impl fmt::Display for InvalidWaiterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid waiter config for `{}`: {}",
            self.waiter_name, self.message
        )
    }
}

impl std::error::Error for InvalidWaiterConfig {}

impl WaiterIndex {
    /// Declared waiter names, in document order.
    pub fn waiter_names(&self) -> impl Iterator<Item = &str> {
        self.waiters.keys().map(String::as_str)
    }

    /// Validates and returns the waiter declared under `name`.
    ///
    /// Returns `Ok(None)` when no waiter is declared under that name, and an
    /// error when the entry references a matcher or state the runtime does
    /// not know.
    pub fn waiter(&self, name: &str) -> Result<Option<WaiterConfig>, InvalidWaiterConfig> {
        let Some((declared_name, description)) = self.waiters.get_key_value(name) else {
            return Ok(None);
        };
        let mut acceptors = Vec::with_capacity(description.acceptors.len());
        for acceptor in &description.acceptors {
            acceptors.push(convert_acceptor(declared_name, acceptor)?);
        }
        Ok(Some(WaiterConfig {
            name: declared_name.clone(),
            operation: description.operation.clone(),
            delay: Duration::from_secs(description.delay),
            max_attempts: description.max_attempts,
            acceptors,
        }))
    }
}

fn convert_acceptor(
    waiter_name: &str,
    description: &AcceptorDescription,
) -> Result<Acceptor, InvalidWaiterConfig> {
    let state = match description.state.as_str() {
        "success" => WaiterState::Success,
        "failure" => WaiterState::Failure,
        "retry" => WaiterState::Retry,
        other => {
            return Err(InvalidWaiterConfig::new(
                waiter_name,
                format!("unknown acceptor state `{other}`"),
            ))
        }
    };
    let matcher = match description.matcher.as_str() {
        "status" => {
            let status = description
                .expected
                .as_u64()
                .and_then(|v| u16::try_from(v).ok())
                .ok_or_else(|| {
                    InvalidWaiterConfig::new(
                        waiter_name,
                        "status matcher requires a numeric `expected`",
                    )
                })?;
            Matcher::Status(status)
        }
        "error" => {
            let code = description.expected.as_str().ok_or_else(|| {
                InvalidWaiterConfig::new(waiter_name, "error matcher requires a string `expected`")
            })?;
            Matcher::ErrorCode(code.to_string())
        }
        "path" => {
            let path = description.argument.clone().ok_or_else(|| {
                InvalidWaiterConfig::new(waiter_name, "path matcher requires an `argument`")
            })?;
            Matcher::Path {
                path,
                expected: to_document(description.expected.clone()),
            }
        }
        other => {
            return Err(InvalidWaiterConfig::new(
                waiter_name,
                format!("unknown matcher `{other}`"),
            ))
        }
    };
    Ok(Acceptor { matcher, state })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> WaiterIndex {
        serde_json::from_value(serde_json::json!({
            "version": 2,
            "waiters": {
                "WidgetReady": {
                    "operation": "DescribeWidgets",
                    "delay": 5,
                    "maxAttempts": 8,
                    "acceptors": [
                        { "state": "success", "matcher": "path",
                          "argument": "Widget.Status", "expected": "Ready" },
                        { "state": "failure", "matcher": "error",
                          "expected": "WidgetNotFound" },
                        { "state": "retry", "matcher": "status", "expected": 404 }
                    ]
                },
                "Broken": {
                    "operation": "DescribeWidgets",
                    "delay": 1,
                    "maxAttempts": 1,
                    "acceptors": [
                        { "state": "success", "matcher": "telepathy", "expected": 1 }
                    ]
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn converts_valid_waiter() {
        let config = index().waiter("WidgetReady").unwrap().unwrap();
        assert_eq!(config.operation, "DescribeWidgets");
        assert_eq!(config.delay, Duration::from_secs(5));
        assert_eq!(config.max_attempts, 8);
        assert_eq!(config.acceptors.len(), 3);
        assert!(matches!(
            config.acceptors[0].matcher,
            Matcher::Path { .. }
        ));
        assert_eq!(config.acceptors[2].state, WaiterState::Retry);
    }

    #[test]
    fn unknown_matcher_is_an_error() {
        let err = index().waiter("Broken").unwrap_err();
        assert!(err.to_string().contains("telepathy"));
        assert_eq!(err.waiter_name(), "Broken");
    }

    #[test]
    fn unknown_name_is_none() {
        assert!(index().waiter("NoSuchWaiter").unwrap().is_none());
    }
}
