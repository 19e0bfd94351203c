/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Endpoint resolution and the transport-facing attempt loop.
//!
//! Resolution turns `(endpoint_prefix, region, scheme)` into a concrete base
//! URI plus property overrides; [`Endpoint`] then owns the per-attempt
//! lifecycle: attach the base URI, run the signing stages, send, and consult
//! the retry handlers before giving up.

use crate::error::{BoxError, Error};
use crate::hooks::{HookPayload, HookRouter};
use crate::protocol::ParseResponse;
use crate::request::{Request, Response};
use crate::transport::Transport;
use http::Uri;
use skiff_types::retry::RetryDecision;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Resolves a service endpoint for a region.
pub trait ResolveEndpoint: Send + Sync + fmt::Debug {
    /// Produces the base URI and property overrides for
    /// `(endpoint_prefix, region)` under the given URI scheme.
    fn resolve_endpoint(
        &self,
        endpoint_prefix: &str,
        region: &str,
        scheme: &str,
    ) -> Result<ResolvedEndpoint, EndpointError>;
}

/// The outcome of endpoint resolution.
///
/// The effective region may differ from the requested one: global services
/// pin every caller to a single signing region.
#[derive(Debug, Clone)]
pub struct ResolvedEndpoint {
    uri: Uri,
    region: String,
    properties: EndpointProperties,
}

impl ResolvedEndpoint {
    /// Creates a resolved endpoint with no property overrides.
    pub fn new(uri: Uri, region: impl Into<String>) -> Self {
        Self {
            uri,
            region: region.into(),
            properties: EndpointProperties::default(),
        }
    }

    /// Replaces the property overrides.
    pub fn with_properties(mut self, properties: EndpointProperties) -> Self {
        self.properties = properties;
        self
    }

    /// The base URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The effective signing region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Property overrides attached by the resolver.
    pub fn properties(&self) -> &EndpointProperties {
        &self.properties
    }
}

/// Per-endpoint overrides a resolver may attach.
#[derive(Debug, Clone, Default)]
pub struct EndpointProperties {
    /// Overrides the model's signature version for this endpoint.
    pub signature_version: Option<String>,
    /// Region to sign with when it differs from the endpoint's own.
    pub credential_scope: Option<String>,
}

/// Endpoint resolution failure.
#[derive(Debug)]
pub struct EndpointError {
    message: String,
    source: Option<BoxError>,
}

impl EndpointError {
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

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "endpoint resolution failed: {}", self.message)
    }
}

impl std::error::Error for EndpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|err| err as _)
    }
}

/// Resolver returning one fixed URI for every service and region.
#[derive(Debug, Clone)]
pub struct StaticEndpointResolver {
    uri: Uri,
}

impl StaticEndpointResolver {
    /// Creates a resolver pinned to `uri`.
    pub fn new(uri: Uri) -> Self {
        Self { uri }
    }
}

impl ResolveEndpoint for StaticEndpointResolver {
    fn resolve_endpoint(
        &self,
        _endpoint_prefix: &str,
        region: &str,
        _scheme: &str,
    ) -> Result<ResolvedEndpoint, EndpointError> {
        Ok(ResolvedEndpoint::new(self.uri.clone(), region))
    }
}

/// A per-service override in a [`RuleEndpointResolver`].
#[derive(Debug, Clone, Default)]
pub struct EndpointRule {
    /// Hostname template; `{service}`, `{region}` and `{dns_suffix}` are
    /// substituted. Absent means the resolver's default template.
    pub hostname: Option<String>,
    /// Pins every region to this one (global services).
    pub region: Option<String>,
    /// Signature version override for this service's endpoints.
    pub signature_version: Option<String>,
    /// Signing region when it differs from the endpoint region.
    pub credential_scope: Option<String>,
}

const DEFAULT_HOSTNAME_TEMPLATE: &str = "{service}.{region}.{dns_suffix}";

/// Template-table resolver: a default `{service}.{region}.{dns_suffix}`
/// rule with optional per-service overrides.
#[derive(Debug, Clone)]
pub struct RuleEndpointResolver {
    dns_suffix: String,
    rules: HashMap<String, EndpointRule>,
}

impl RuleEndpointResolver {
    /// Creates a resolver over the given DNS suffix.
    pub fn new(dns_suffix: impl Into<String>) -> Self {
        Self {
            dns_suffix: dns_suffix.into(),
            rules: HashMap::new(),
        }
    }

    /// Adds an override rule for one endpoint prefix.
    pub fn with_rule(mut self, endpoint_prefix: impl Into<String>, rule: EndpointRule) -> Self {
        self.rules.insert(endpoint_prefix.into(), rule);
        self
    }
}

impl ResolveEndpoint for RuleEndpointResolver {
    fn resolve_endpoint(
        &self,
        endpoint_prefix: &str,
        region: &str,
        scheme: &str,
    ) -> Result<ResolvedEndpoint, EndpointError> {
        let rule = self.rules.get(endpoint_prefix);
        let effective_region = rule
            .and_then(|rule| rule.region.as_deref())
            .unwrap_or(region);
        let template = rule
            .and_then(|rule| rule.hostname.as_deref())
            .unwrap_or(DEFAULT_HOSTNAME_TEMPLATE);
        let hostname = template
            .replace("{service}", endpoint_prefix)
            .replace("{region}", effective_region)
            .replace("{dns_suffix}", &self.dns_suffix);
        let uri: Uri = format!("{scheme}://{hostname}").parse().map_err(|err| {
            EndpointError::new(format!("constructed URI for `{hostname}` is invalid"))
                .with_source(Box::new(err) as BoxError)
        })?;
        let mut resolved = ResolvedEndpoint::new(uri, effective_region);
        if let Some(rule) = rule {
            resolved = resolved.with_properties(EndpointProperties {
                signature_version: rule.signature_version.clone(),
                credential_scope: rule.credential_scope.clone(),
            });
        }
        Ok(resolved)
    }
}

/// A resolved endpoint bound to a transport: the thing dispatch sends
/// through.
#[derive(Debug, Clone)]
pub struct Endpoint {
    uri: Uri,
    transport: Arc<dyn Transport>,
}

impl Endpoint {
    /// Binds a base URI to a transport.
    pub fn new(uri: Uri, transport: Arc<dyn Transport>) -> Self {
        Self { uri, transport }
    }

    /// The base URI attempts are sent to.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Runs the attempt loop for one serialized envelope.
    ///
    /// Every attempt starts from a fresh clone of `envelope`, runs the
    /// signing stages, and goes to the transport. After a failed attempt
    /// (status >= 300 or a transport error) the `NeedsRetry` handlers are
    /// consulted; a `RetryAfter` decision sleeps and loops, anything else
    /// makes the attempt final. The final response is returned as-is even
    /// when its status indicates an error; the caller turns it into a
    /// service error after `AfterCall`. Only a final transport failure is
    /// an `Err` here.
    pub(crate) fn make_request(
        &self,
        service: &str,
        operation: &str,
        envelope: &Request,
        hooks: &HookRouter,
        parser: &dyn ParseResponse,
    ) -> Result<Response, Error> {
        let mut attempt: u32 = 1;
        loop {
            let mut request = envelope.clone();
            request.set_endpoint(self.uri.clone());
            hooks.emit(
                service,
                operation,
                &mut HookPayload::BeforeSign {
                    request: &mut request,
                },
            )?;
            hooks.emit(
                service,
                operation,
                &mut HookPayload::RequestCreated {
                    operation,
                    request: &mut request,
                },
            )?;
            hooks.emit(
                service,
                operation,
                &mut HookPayload::AfterSign { request: &request },
            )?;

            let outcome = self.transport.send(&request);

            let (status, error_code, transport_error) = match &outcome {
                Ok(response) if response.status().as_u16() < 300 => {
                    return Ok(response.clone());
                }
                Ok(response) => {
                    let code = parser.parse_error(response).code().map(str::to_owned);
                    (Some(response.status()), code, false)
                }
                Err(err) => {
                    debug!(operation, attempt, error = %err, "transport error");
                    (None, None, true)
                }
            };

            let mut decision: Option<RetryDecision> = None;
            hooks.emit(
                service,
                operation,
                &mut HookPayload::NeedsRetry {
                    attempt,
                    status,
                    error_code: error_code.as_deref(),
                    transport_error,
                    decision: &mut decision,
                },
            )?;

            match decision {
                Some(RetryDecision::RetryAfter(delay)) => {
                    debug!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after failed attempt"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Some(RetryDecision::GiveUp) | None => {
                    return outcome.map_err(Error::Transport);
                }
            }
        }
    }
}
