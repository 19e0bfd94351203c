/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Retry rule definitions and their expansion.
//!
//! The rule set is one global document: named criterion `definitions`, a
//! `retry.__default__` section, and optional per-endpoint-prefix sections.
//! [`build_retry_config`] merges the service section over the default and
//! resolves `$ref` entries once per service; the result is immutable.

use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_GROWTH_FACTOR: f64 = 2.0;
const DEFAULT_SECTION: &str = "__default__";

/// The raw, deserialized retry rule document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryRuleSet {
    /// Named criteria shared across services, referenced via `$ref`.
    #[serde(default)]
    pub definitions: IndexMap<String, PolicyBody>,
    /// `__default__` plus per-endpoint-prefix sections.
    #[serde(default)]
    pub retry: IndexMap<String, RetrySection>,
}

/// One section of the `retry` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetrySection {
    /// Attempt ceiling override.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Delay formula override.
    #[serde(default)]
    pub delay: Option<DelayDescription>,
    /// Named policies; service sections extend or override the default's
    /// entries by name.
    #[serde(default)]
    pub policies: IndexMap<String, PolicyDescription>,
}

/// A policy entry: inline criterion or a reference into `definitions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PolicyDescription {
    /// `{"$ref": "throttling"}`
    Ref {
        /// Name of the referenced definition.
        #[serde(rename = "$ref")]
        reference: String,
    },
    /// `{"applies_when": {...}}`
    Inline(PolicyBody),
}

/// The body of a policy or definition.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyBody {
    /// The criterion under which the policy applies.
    pub applies_when: CriterionDescription,
}

/// Raw criterion form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CriterionDescription {
    /// Matches against the service response.
    #[serde(default)]
    pub response: Option<ResponseCriterion>,
    /// Matches transport-level failures. The list names failure classes for
    /// documentation; any non-empty list means "all transport errors".
    #[serde(default)]
    pub socket_errors: Option<Vec<String>>,
}

/// Response-based criterion fields. All present fields must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseCriterion {
    /// HTTP status code to match.
    #[serde(default)]
    pub http_status_code: Option<u16>,
    /// Service error code to match.
    #[serde(default)]
    pub service_error_code: Option<String>,
}

/// Raw delay formula.
#[derive(Debug, Clone, Deserialize)]
pub struct DelayDescription {
    /// Formula type; only `exponential` is defined.
    pub r#type: String,
    /// Base delay in seconds, or the string `"rand"` for a jittered base.
    pub base: serde_json::Value,
    /// Per-attempt growth factor.
    pub growth_factor: f64,
}

/// A resolved, immutable per-service retry table.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempt ceiling (first attempt included).
    pub max_attempts: u32,
    /// Exponential delay formula.
    pub delay: DelayConfig,
    /// Criteria under which a failed attempt is retried.
    pub policies: Vec<RetryPolicy>,
}

/// Exponential delay: `base * growth_factor^(attempt - 1)` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayConfig {
    /// Base delay.
    pub base: DelayBase,
    /// Growth factor.
    pub growth_factor: f64,
}

/// Base of the delay formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DelayBase {
    /// Uniform random base in `[0, 1)` seconds, drawn per retry.
    Rand,
    /// Fixed base in seconds.
    Fixed(f64),
}

/// One named, resolved policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Policy name, for logging.
    pub name: String,
    /// Resolved criterion.
    pub criterion: Criterion,
}

/// A resolved retry criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    /// Matches a service response; every present field must match.
    Response {
        /// HTTP status code to match.
        status_code: Option<u16>,
        /// Service error code to match.
        error_code: Option<String>,
    },
    /// Matches any transport-level failure.
    TransportError,
}

impl Criterion {
    /// Whether this criterion matches a classified attempt outcome.
    pub fn matches(
        &self,
        status_code: Option<u16>,
        error_code: Option<&str>,
        transport_error: bool,
    ) -> bool {
        match self {
            Criterion::TransportError => transport_error,
            Criterion::Response {
                status_code: want_status,
                error_code: want_code,
            } => {
                if transport_error {
                    return false;
                }
                if let Some(want) = want_status {
                    if status_code != Some(*want) {
                        return false;
                    }
                }
                if let Some(want) = want_code {
                    if error_code != Some(want.as_str()) {
                        return false;
                    }
                }
                want_status.is_some() || want_code.is_some()
            }
        }
    }
}

/// A rule set that cannot be expanded for a service.
#[derive(Debug)]
pub struct RetryConfigError {
    message: String,
}

impl RetryConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RetryConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid retry rule set: {}", self.message)
    }
}

impl std::error::Error for RetryConfigError {}

/// Expands the global rule set into the resolved table for one service.
pub fn build_retry_config(
    endpoint_prefix: &str,
    rules: &RetryRuleSet,
) -> Result<RetryConfig, RetryConfigError> {
    let default = rules.retry.get(DEFAULT_SECTION);
    let service = rules.retry.get(endpoint_prefix);

    let max_attempts = service
        .and_then(|s| s.max_attempts)
        .or_else(|| default.and_then(|s| s.max_attempts))
        .unwrap_or(DEFAULT_MAX_ATTEMPTS);

    let delay = match service
        .and_then(|s| s.delay.as_ref())
        .or_else(|| default.and_then(|s| s.delay.as_ref()))
    {
        Some(description) => convert_delay(description)?,
        None => DelayConfig {
            base: DelayBase::Rand,
            growth_factor: DEFAULT_GROWTH_FACTOR,
        },
    };

    // Service policies override same-named default policies.
    let mut merged: IndexMap<&str, &PolicyDescription> = IndexMap::new();
    if let Some(section) = default {
        for (name, policy) in &section.policies {
            merged.insert(name.as_str(), policy);
        }
    }
    if let Some(section) = service {
        for (name, policy) in &section.policies {
            merged.insert(name.as_str(), policy);
        }
    }

    let mut policies = Vec::with_capacity(merged.len());
    for (name, description) in merged {
        let body = match description {
            PolicyDescription::Inline(body) => body,
            PolicyDescription::Ref { reference } => {
                rules.definitions.get(reference).ok_or_else(|| {
                    RetryConfigError::new(format!(
                        "policy `{name}` references unknown definition `{reference}`"
                    ))
                })?
            }
        };
        policies.push(RetryPolicy {
            name: name.to_string(),
            criterion: convert_criterion(name, &body.applies_when)?,
        });
    }

    Ok(RetryConfig {
        max_attempts,
        delay,
        policies,
    })
}

fn convert_delay(description: &DelayDescription) -> Result<DelayConfig, RetryConfigError> {
    if description.r#type != "exponential" {
        return Err(RetryConfigError::new(format!(
            "unknown delay type `{}`",
            description.r#type
        )));
    }
    let base = if description.base.as_str() == Some("rand") {
        DelayBase::Rand
    } else if let Some(value) = description.base.as_f64() {
        DelayBase::Fixed(value)
    } else {
        return Err(RetryConfigError::new(
            "delay base must be a number or \"rand\"",
        ));
    };
    Ok(DelayConfig {
        base,
        growth_factor: description.growth_factor,
    })
}

fn convert_criterion(
    name: &str,
    description: &CriterionDescription,
) -> Result<Criterion, RetryConfigError> {
    match (&description.response, &description.socket_errors) {
        (Some(response), None) => Ok(Criterion::Response {
            status_code: response.http_status_code,
            error_code: response.service_error_code.clone(),
        }),
        (None, Some(_)) => Ok(Criterion::TransportError),
        _ => Err(RetryConfigError::new(format!(
            "policy `{name}` must specify exactly one of `response` or `socket_errors`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RetryRuleSet {
        serde_json::from_value(serde_json::json!({
            "definitions": {
                "throttling": {
                    "applies_when": {
                        "response": { "service_error_code": "Throttling", "http_status_code": 400 }
                    }
                }
            },
            "retry": {
                "__default__": {
                    "max_attempts": 5,
                    "delay": { "type": "exponential", "base": "rand", "growth_factor": 2 },
                    "policies": {
                        "general_socket_errors": {
                            "applies_when": { "socket_errors": ["GENERAL_CONNECTION_ERROR"] }
                        },
                        "service_unavailable": {
                            "applies_when": { "response": { "http_status_code": 503 } }
                        },
                        "throttling": { "$ref": "throttling" }
                    }
                },
                "widgets": {
                    "max_attempts": 3,
                    "policies": {
                        "still_provisioning": {
                            "applies_when": {
                                "response": { "service_error_code": "WidgetProvisioning" }
                            }
                        }
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn service_section_merges_over_default() {
        let config = build_retry_config("widgets", &rules()).unwrap();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.delay.base, DelayBase::Rand);
        let names: Vec<&str> = config.policies.iter().map(|p| p.name.as_str()).collect();
        assert!(names.contains(&"service_unavailable"));
        assert!(names.contains(&"still_provisioning"));
        assert!(names.contains(&"throttling"));
    }

    #[test]
    fn unknown_service_gets_defaults() {
        let config = build_retry_config("elsewhere", &rules()).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.policies.len(), 3);
    }

    #[test]
    fn ref_resolution_failure_is_an_error() {
        let rules: RetryRuleSet = serde_json::from_value(serde_json::json!({
            "retry": {
                "__default__": {
                    "policies": { "nope": { "$ref": "missing" } }
                }
            }
        }))
        .unwrap();
        let err = build_retry_config("widgets", &rules).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn criterion_matching() {
        let throttling = Criterion::Response {
            status_code: Some(400),
            error_code: Some("Throttling".to_string()),
        };
        assert!(throttling.matches(Some(400), Some("Throttling"), false));
        assert!(!throttling.matches(Some(400), Some("ValidationError"), false));
        assert!(!throttling.matches(Some(503), Some("Throttling"), false));

        let unavailable = Criterion::Response {
            status_code: Some(503),
            error_code: None,
        };
        assert!(unavailable.matches(Some(503), None, false));
        assert!(!unavailable.matches(None, None, true));

        assert!(Criterion::TransportError.matches(None, None, true));
        assert!(!Criterion::TransportError.matches(Some(503), None, false));
    }
}
