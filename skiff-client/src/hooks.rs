/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Lifecycle hooks.
//!
//! Every stage of a call is an extension point. Handlers are registered
//! against a [`HookScope`] — a lifecycle stage plus optional service and
//! operation qualifiers — and dispatched synchronously, most general scope
//! first, registration order within equal specificity. Scope segments are
//! structured fields rather than concatenated strings, so matching is never
//! ambiguous.
//!
//! Registration is idempotent by handler id: registering the same id against
//! the same scope twice installs the handler once. Dispatch walks a snapshot
//! of the registry; handlers cannot unregister themselves mid-dispatch.

use crate::error::BoxError;
use crate::request::Request;
use http::StatusCode;
use skiff_types::retry::RetryDecision;
use skiff_types::Document;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// The lifecycle stages a handler can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Raw caller parameters, before serialization. Handlers may inject or
    /// rewrite parameters.
    BeforeParameterBuild,
    /// The serialized request envelope, before endpoint/signing.
    BeforeCall,
    /// Immediately before the signing handler runs.
    BeforeSign,
    /// The per-attempt request, fully built. The signer's subscription
    /// mutates the envelope here to add authentication.
    RequestCreated,
    /// Immediately after the signing handler ran.
    AfterSign,
    /// The raw response and parsed-so-far state, after transport.
    AfterCall,
    /// Fired by the attempt loop after each failed attempt; the registered
    /// retry handler writes its decision into the payload.
    NeedsRetry,
}

/// Where a handler listens: a stage, optionally narrowed to a service and
/// further to one operation. An operation qualifier requires a service
/// qualifier, which the constructors enforce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookScope {
    kind: HookKind,
    service: Option<String>,
    operation: Option<String>,
}

impl HookScope {
    /// A scope matching the stage for every service.
    pub fn global(kind: HookKind) -> Self {
        Self {
            kind,
            service: None,
            operation: None,
        }
    }

    /// A scope matching the stage for one service.
    pub fn service(kind: HookKind, service: impl Into<String>) -> Self {
        Self {
            kind,
            service: Some(service.into()),
            operation: None,
        }
    }

    /// A scope matching the stage for one operation of one service.
    pub fn operation(
        kind: HookKind,
        service: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            service: Some(service.into()),
            operation: Some(operation.into()),
        }
    }

    /// The stage this scope attaches to.
    pub fn kind(&self) -> HookKind {
        self.kind
    }

    fn specificity(&self) -> u8 {
        self.service.is_some() as u8 + self.operation.is_some() as u8
    }

    fn matches(&self, kind: HookKind, service: &str, operation: &str) -> bool {
        self.kind == kind
            && self.service.as_deref().map_or(true, |s| s == service)
            && self.operation.as_deref().map_or(true, |o| o == operation)
    }
}

impl fmt::Display for HookScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(service) = &self.service {
            write!(f, ".{service}")?;
        }
        if let Some(operation) = &self.operation {
            write!(f, ".{operation}")?;
        }
        Ok(())
    }
}

/// The mutable payload handed to handlers at each stage.
#[derive(Debug)]
pub enum HookPayload<'a> {
    /// See [`HookKind::BeforeParameterBuild`].
    BeforeParameterBuild {
        /// Caller parameters; may be rewritten in place.
        params: &'a mut Document,
    },
    /// See [`HookKind::BeforeCall`].
    BeforeCall {
        /// The serialized envelope.
        request: &'a mut Request,
    },
    /// See [`HookKind::BeforeSign`].
    BeforeSign {
        /// The per-attempt request.
        request: &'a mut Request,
    },
    /// See [`HookKind::RequestCreated`].
    RequestCreated {
        /// Declared name of the operation being dispatched.
        operation: &'a str,
        /// The per-attempt request; signing mutates it here.
        request: &'a mut Request,
    },
    /// See [`HookKind::AfterSign`].
    AfterSign {
        /// The signed request.
        request: &'a Request,
    },
    /// See [`HookKind::AfterCall`].
    AfterCall {
        /// HTTP status of the final response.
        status: StatusCode,
        /// Parsed output, present for success responses.
        parsed: Option<&'a Document>,
    },
    /// See [`HookKind::NeedsRetry`].
    NeedsRetry {
        /// 1-based attempt counter.
        attempt: u32,
        /// HTTP status of the failed attempt, absent for transport errors.
        status: Option<StatusCode>,
        /// Service error code of the failed attempt, when one was parsed.
        error_code: Option<&'a str>,
        /// True when the attempt failed at the transport layer.
        transport_error: bool,
        /// The handler's authoritative answer; `None` means give up.
        decision: &'a mut Option<RetryDecision>,
    },
}

impl HookPayload<'_> {
    /// The stage this payload belongs to.
    pub fn kind(&self) -> HookKind {
        match self {
            HookPayload::BeforeParameterBuild { .. } => HookKind::BeforeParameterBuild,
            HookPayload::BeforeCall { .. } => HookKind::BeforeCall,
            HookPayload::BeforeSign { .. } => HookKind::BeforeSign,
            HookPayload::RequestCreated { .. } => HookKind::RequestCreated,
            HookPayload::AfterSign { .. } => HookKind::AfterSign,
            HookPayload::AfterCall { .. } => HookKind::AfterCall,
            HookPayload::NeedsRetry { .. } => HookKind::NeedsRetry,
        }
    }
}

/// A lifecycle handler.
pub trait Hook: Send + Sync {
    /// Invoked for each matching emitted event.
    fn run(&self, payload: &mut HookPayload<'_>) -> Result<(), BoxError>;
}

impl<F> Hook for F
where
    F: Fn(&mut HookPayload<'_>) -> Result<(), BoxError> + Send + Sync,
{
    fn run(&self, payload: &mut HookPayload<'_>) -> Result<(), BoxError> {
        (self)(payload)
    }
}

#[derive(Clone)]
struct HookEntry {
    scope: HookScope,
    id: String,
    hook: Arc<dyn Hook>,
}

/// The per-client hook registry.
///
/// Cloning produces an independent router whose handler list is snapshotted
/// at clone time: later registrations on either copy are invisible to the
/// other. The handlers themselves are shared (`Arc`).
#[derive(Clone, Default)]
pub struct HookRouter {
    entries: Vec<HookEntry>,
}

impl HookRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `hook` under `id` at `scope`.
    ///
    /// Idempotent: if a handler with the same id is already registered at
    /// the same scope, nothing changes and `false` is returned.
    pub fn register(&mut self, scope: HookScope, id: impl Into<String>, hook: Arc<dyn Hook>) -> bool {
        let id = id.into();
        if self
            .entries
            .iter()
            .any(|entry| entry.scope == scope && entry.id == id)
        {
            trace!(scope = %scope, id = %id, "handler already registered, skipping");
            return false;
        }
        trace!(scope = %scope, id = %id, "registering handler");
        self.entries.push(HookEntry { scope, id, hook });
        true
    }

    /// Removes the handler registered under `id` at `scope`, if any.
    pub fn unregister(&mut self, scope: &HookScope, id: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !(entry.scope == *scope && entry.id == id));
        before != self.entries.len()
    }

    /// Dispatches `payload` to every handler whose scope matches the
    /// concrete `(kind, service, operation)` event, most general scope
    /// first. Handlers run synchronously; the first handler error aborts
    /// dispatch.
    pub fn emit(
        &self,
        service: &str,
        operation: &str,
        payload: &mut HookPayload<'_>,
    ) -> Result<(), HookError> {
        let kind = payload.kind();
        let mut matching: Vec<&HookEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.scope.matches(kind, service, operation))
            .collect();
        // Stable sort: registration order is preserved within equal
        // specificity.
        matching.sort_by_key(|entry| entry.scope.specificity());
        for entry in matching {
            trace!(scope = %entry.scope, id = %entry.id, "running handler");
            entry.hook.run(payload).map_err(|source| HookError {
                scope: entry.scope.clone(),
                handler_id: entry.id.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Number of registered handlers. For diagnostics and tests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for HookRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|entry| format!("{} ({})", entry.scope, entry.id)),
            )
            .finish()
    }
}

/// A handler failure, attributed to the scope and id it was registered
/// under.
#[derive(Debug)]
pub struct HookError {
    scope: HookScope,
    handler_id: String,
    source: BoxError,
}

impl HookError {
    /// The id of the failing handler.
    pub fn handler_id(&self) -> &str {
        &self.handler_id
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hook `{}` at {} failed: {}",
            self.handler_id, self.scope, self.source
        )
    }
}

impl std::error::Error for HookError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref() as _)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn counting_hook(counter: Arc<AtomicUsize>) -> Arc<dyn Hook> {
        Arc::new(move |_: &mut HookPayload<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn emit_before_call(router: &HookRouter, service: &str, operation: &str) {
        let mut request = Request::new(http::Method::POST, "/");
        let mut payload = HookPayload::BeforeCall {
            request: &mut request,
        };
        router.emit(service, operation, &mut payload).unwrap();
    }

    #[test]
    fn duplicate_handler_id_registers_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut router = HookRouter::new();
        let scope = HookScope::service(HookKind::BeforeCall, "widgets");
        assert!(router.register(scope.clone(), "h", counting_hook(counter.clone())));
        assert!(!router.register(scope, "h", counting_hook(counter.clone())));
        emit_before_call(&router, "widgets", "DescribeWidgets");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn general_scopes_run_before_specific_ones() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let recorder = |label: &'static str, order: Arc<Mutex<Vec<&'static str>>>| -> Arc<dyn Hook> {
            Arc::new(move |_: &mut HookPayload<'_>| {
                order.lock().unwrap().push(label);
                Ok(())
            })
        };
        let mut router = HookRouter::new();
        router.register(
            HookScope::operation(HookKind::BeforeCall, "widgets", "DescribeWidgets"),
            "op",
            recorder("operation", order.clone()),
        );
        router.register(
            HookScope::global(HookKind::BeforeCall),
            "global",
            recorder("global", order.clone()),
        );
        router.register(
            HookScope::service(HookKind::BeforeCall, "widgets"),
            "svc",
            recorder("service", order.clone()),
        );
        emit_before_call(&router, "widgets", "DescribeWidgets");
        assert_eq!(
            *order.lock().unwrap(),
            vec!["global", "service", "operation"]
        );
    }

    #[test]
    fn non_matching_scopes_are_skipped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut router = HookRouter::new();
        router.register(
            HookScope::service(HookKind::BeforeCall, "gadgets"),
            "other-service",
            counting_hook(counter.clone()),
        );
        router.register(
            HookScope::operation(HookKind::BeforeCall, "widgets", "DeleteWidget"),
            "other-operation",
            counting_hook(counter.clone()),
        );
        router.register(
            HookScope::global(HookKind::AfterCall),
            "other-kind",
            counting_hook(counter.clone()),
        );
        emit_before_call(&router, "widgets", "DescribeWidgets");
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cloned_router_is_independent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut original = HookRouter::new();
        original.register(
            HookScope::global(HookKind::BeforeCall),
            "shared",
            counting_hook(counter.clone()),
        );
        let mut cloned = original.clone();
        cloned.register(
            HookScope::global(HookKind::BeforeCall),
            "clone-only",
            counting_hook(counter.clone()),
        );
        emit_before_call(&original, "widgets", "DescribeWidgets");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        emit_before_call(&cloned, "widgets", "DescribeWidgets");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unregister_removes_only_the_named_handler() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut router = HookRouter::new();
        let scope = HookScope::global(HookKind::BeforeCall);
        router.register(scope.clone(), "keep", counting_hook(counter.clone()));
        router.register(scope.clone(), "drop", counting_hook(counter.clone()));
        assert!(router.unregister(&scope, "drop"));
        assert!(!router.unregister(&scope, "drop"));
        emit_before_call(&router, "widgets", "DescribeWidgets");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_failure_names_the_handler() {
        let mut router = HookRouter::new();
        router.register(
            HookScope::global(HookKind::BeforeCall),
            "bad",
            Arc::new(|_: &mut HookPayload<'_>| Err("boom".into())),
        );
        let mut request = Request::new(http::Method::POST, "/");
        let mut payload = HookPayload::BeforeCall {
            request: &mut request,
        };
        let err = router.emit("widgets", "DescribeWidgets", &mut payload).unwrap_err();
        assert_eq!(err.handler_id(), "bad");
        assert!(err.to_string().contains("boom"));
    }
}
