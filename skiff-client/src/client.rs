/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Client construction and dispatch.
//!
//! [`ClientCreator`] turns a service name and region into a [`Client`] by
//! loading the declarative model, wiring the retry table, resolving the
//! endpoint, and binding the protocol and signer. The client itself is a
//! thin dispatcher: everything it does is driven by the model and the hook
//! router.

use crate::endpoint::{Endpoint, ResolveEndpoint, ResolvedEndpoint};
use crate::error::{BoxError, CapabilityError, ConfigurationError, Error, ServiceError};
use crate::hooks::{Hook, HookKind, HookPayload, HookRouter, HookScope};
use crate::paginate::Paginator;
use crate::protocol::{self, ParseResponse, SerializeError, SerializeRequest};
use crate::retry::register_retry_handler;
use crate::sign::{ProvideCredentials, RequestSigner, SignatureVersion};
use crate::transport::{Transport, TransportError};
use crate::waiter::Waiter;
use http::{StatusCode, Uri};
use indexmap::IndexMap;
use skiff_model::paginate::PaginatorIndex;
use skiff_model::retry::build_retry_config;
use skiff_model::waiter::WaiterIndex;
use skiff_model::{xform_name, LoadModel, ServiceModel};
use skiff_types::Document;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Handler id the signing hook is registered under.
const SIGNING_HANDLER_ID: &str = "request-signer";

/// Per-client overrides supplied at creation time.
#[derive(Debug, Default)]
pub struct ClientConfig {
    /// Fixed endpoint URI; set, it bypasses the endpoint resolver.
    pub endpoint_url: Option<Uri>,
    /// URI scheme handed to the resolver; `https` when unset.
    pub scheme: Option<String>,
    /// Signature version override; wins over every other source.
    pub signature_version: Option<SignatureVersion>,
    /// Credentials for signing. Absent means anonymous calls.
    pub credentials: Option<Arc<dyn ProvideCredentials>>,
    /// `section -> key -> value` configuration from the environment, e.g. a
    /// per-service `signature_version` entry.
    pub scoped_config: HashMap<String, HashMap<String, String>>,
    /// Transport override for this client only.
    pub transport: Option<Arc<dyn Transport>>,
}

impl ClientConfig {
    /// An empty config: resolver-driven endpoint, anonymous calls.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Builds [`Client`] instances from declarative models.
#[derive(Debug)]
pub struct ClientCreator {
    loader: Arc<dyn LoadModel>,
    endpoint_resolver: Arc<dyn ResolveEndpoint>,
    transport: Arc<dyn Transport>,
    hooks: HookRouter,
}

impl ClientCreator {
    /// Creates a client factory over a model loader, an endpoint resolver,
    /// and a default transport.
    pub fn new(
        loader: Arc<dyn LoadModel>,
        endpoint_resolver: Arc<dyn ResolveEndpoint>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            loader,
            endpoint_resolver,
            transport,
            hooks: HookRouter::new(),
        }
    }

    /// The creator-level hook router. Handlers registered here are copied
    /// into every client created afterwards.
    pub fn hooks_mut(&mut self) -> &mut HookRouter {
        &mut self.hooks
    }

    /// Creates a client for `service_name` in `region`.
    pub fn create_client(
        &mut self,
        service_name: &str,
        region: &str,
        config: ClientConfig,
    ) -> Result<Client, Error> {
        let description = self.loader.load_service(service_name).map_err(|err| {
            ConfigurationError::new(format!("cannot load service model for `{service_name}`"))
                .with_source(err)
        })?;
        let model = ServiceModel::new(service_name, description);
        let prefix = model.endpoint_prefix().to_string();

        self.register_retries(&prefix)?;

        let scheme = config.scheme.as_deref().unwrap_or("https");
        let resolved = match &config.endpoint_url {
            Some(uri) => ResolvedEndpoint::new(uri.clone(), region),
            None => self
                .endpoint_resolver
                .resolve_endpoint(&prefix, region, scheme)
                .map_err(|err| {
                    ConfigurationError::new(format!(
                        "cannot resolve an endpoint for `{prefix}` in `{region}`"
                    ))
                    .with_source(err)
                })?,
        };

        let signature_version =
            resolve_signature_version(&config, &resolved, &model, service_name)?;
        let signing_region = resolved
            .properties()
            .credential_scope
            .as_deref()
            .unwrap_or_else(|| resolved.region());

        let Some((serializer, parser)) = protocol::resolve(&model) else {
            return Err(ConfigurationError::new(format!(
                "unsupported protocol `{}` for service `{service_name}`",
                model.protocol()
            ))
            .into());
        };

        let signer = Arc::new(RequestSigner::new(
            signing_region,
            model.signing_name(),
            signature_version,
            config.credentials.clone(),
        ));

        let transport = config.transport.unwrap_or_else(|| self.transport.clone());
        let endpoint = Arc::new(Endpoint::new(resolved.uri().clone(), transport));

        let mut hooks = self.hooks.clone();
        register_signing_hook(&mut hooks, &prefix, signer.clone());

        let operations: IndexMap<String, String> = model
            .operation_names()
            .map(|name| (xform_name(name), name.to_string()))
            .collect();

        info!(
            service = service_name,
            region = resolved.region(),
            endpoint = %resolved.uri(),
            "created client"
        );

        Ok(Client {
            model,
            serializer,
            parser,
            signer,
            endpoint,
            loader: self.loader.clone(),
            hooks,
            operations,
            cache: Mutex::new(ClientCache::default()),
        })
    }

    fn register_retries(&mut self, endpoint_prefix: &str) -> Result<(), Error> {
        let rules = self
            .loader
            .load_retry_rules()
            .map_err(|err| ConfigurationError::new("cannot load retry rules").with_source(err))?;
        if let Some(rules) = rules {
            let config = build_retry_config(endpoint_prefix, &rules).map_err(|err| {
                ConfigurationError::new(format!(
                    "retry rules are unusable for `{endpoint_prefix}`"
                ))
                .with_source(err)
            })?;
            register_retry_handler(&mut self.hooks, endpoint_prefix, config);
        }
        Ok(())
    }
}

fn resolve_signature_version(
    config: &ClientConfig,
    resolved: &ResolvedEndpoint,
    model: &ServiceModel,
    service_name: &str,
) -> Result<SignatureVersion, Error> {
    if let Some(version) = config.signature_version {
        return Ok(version);
    }
    let raw = resolved
        .properties()
        .signature_version
        .as_deref()
        .or_else(|| {
            config
                .scoped_config
                .get(service_name)
                .and_then(|section| section.get("signature_version"))
                .map(String::as_str)
        })
        .unwrap_or_else(|| model.signature_version());
    raw.parse().map_err(|err| {
        ConfigurationError::new(format!(
            "service `{service_name}` resolved to an unusable signature version"
        ))
        .with_source(Box::new(err) as BoxError)
        .into()
    })
}

#[derive(Debug)]
struct SigningHook {
    signer: Arc<RequestSigner>,
}

impl Hook for SigningHook {
    fn run(&self, payload: &mut HookPayload<'_>) -> Result<(), BoxError> {
        if let HookPayload::RequestCreated { operation, request } = payload {
            self.signer.sign(operation, request)?;
        }
        Ok(())
    }
}

fn register_signing_hook(hooks: &mut HookRouter, endpoint_prefix: &str, signer: Arc<RequestSigner>) {
    hooks.register(
        HookScope::service(HookKind::RequestCreated, endpoint_prefix),
        SIGNING_HANDLER_ID,
        Arc::new(SigningHook { signer }),
    );
}

/// Lazily loaded auxiliary documents. `Some` of an empty index means the
/// loader reported the document absent, which is a valid state.
#[derive(Debug, Default)]
struct ClientCache {
    paginators: Option<Arc<PaginatorIndex>>,
    waiters: Option<Arc<WaiterIndex>>,
}

/// Replacement collaborators for [`Client::clone_client`].
#[derive(Debug, Default)]
pub struct ClientOverrides {
    /// Replaces the endpoint (base URI + transport).
    pub endpoint: Option<Arc<Endpoint>>,
    /// Replaces the request serializer.
    pub serializer: Option<Arc<dyn SerializeRequest>>,
    /// Replaces the response parser.
    pub parser: Option<Arc<dyn ParseResponse>>,
    /// Replaces the signer; the clone's signing hook is rebound to it.
    pub signer: Option<Arc<RequestSigner>>,
}

/// A model-driven service client.
pub struct Client {
    model: ServiceModel,
    serializer: Arc<dyn SerializeRequest>,
    parser: Arc<dyn ParseResponse>,
    signer: Arc<RequestSigner>,
    endpoint: Arc<Endpoint>,
    loader: Arc<dyn LoadModel>,
    hooks: HookRouter,
    /// Snake-case name to declared name.
    operations: IndexMap<String, String>,
    cache: Mutex<ClientCache>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("service", &self.model.service_name())
            .field("endpoint", self.endpoint.uri())
            .field("operations", &self.operations.len())
            .finish()
    }
}

impl Client {
    /// The service model this client dispatches against.
    pub fn model(&self) -> &ServiceModel {
        &self.model
    }

    /// This client's hook router.
    pub fn hooks_mut(&mut self) -> &mut HookRouter {
        &mut self.hooks
    }

    /// Snake-case names of the operations this client can call.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    /// Maps a caller-supplied operation name (either spelling) to the
    /// declared name.
    fn resolve_operation(&self, name: &str) -> Result<&str, Error> {
        self.operations
            .get(&xform_name(name))
            .map(String::as_str)
            .ok_or_else(|| {
                CapabilityError::new(name, "not an operation of this service").into()
            })
    }

    /// Calls an operation and returns its parsed output.
    pub fn call(&self, operation: &str, params: Document) -> Result<Document, Error> {
        self.call_raw(operation, params).map(|(_, parsed)| parsed)
    }

    /// Calls an operation and returns the final HTTP status alongside the
    /// parsed output. Error responses (status >= 300) surface as
    /// [`Error::Service`] with the service's code and message verbatim.
    pub fn call_raw(
        &self,
        operation: &str,
        params: Document,
    ) -> Result<(StatusCode, Document), Error> {
        let declared = self.resolve_operation(operation)?.to_string();
        let op = self
            .model
            .operation(&declared)
            .ok_or_else(|| CapabilityError::new(&declared, "not an operation of this service"))?;
        let prefix = self.model.endpoint_prefix();

        let mut params = params;
        self.hooks.emit(
            prefix,
            &declared,
            &mut HookPayload::BeforeParameterBuild {
                params: &mut params,
            },
        )?;

        let mut envelope = self.serializer.serialize(&params, &op).map_err(|err| match err {
            SerializeError::Validation(err) => Error::ParamValidation(err),
            SerializeError::Construction(source) => Error::Configuration(
                ConfigurationError::new(format!("cannot build a request for `{declared}`"))
                    .with_source(source),
            ),
        })?;

        self.hooks.emit(
            prefix,
            &declared,
            &mut HookPayload::BeforeCall {
                request: &mut envelope,
            },
        )?;

        debug!(operation = %declared, "dispatching");
        let response =
            self.endpoint
                .make_request(prefix, &declared, &envelope, &self.hooks, self.parser.as_ref())?;

        let status = response.status();
        if status.as_u16() < 300 {
            let parsed = self
                .parser
                .parse(&response, &op)
                .map_err(|err| Error::Transport(TransportError::malformed(err)))?;
            self.hooks.emit(
                prefix,
                &declared,
                &mut HookPayload::AfterCall {
                    status,
                    parsed: Some(&parsed),
                },
            )?;
            Ok((status, parsed))
        } else {
            let metadata = self.parser.parse_error(&response);
            self.hooks.emit(
                prefix,
                &declared,
                &mut HookPayload::AfterCall {
                    status,
                    parsed: None,
                },
            )?;
            Err(ServiceError::new(metadata, status.as_u16(), declared).into())
        }
    }

    /// Whether an operation has pagination configured.
    pub fn can_paginate(&self, operation: &str) -> Result<bool, Error> {
        let declared = self.resolve_operation(operation)?.to_string();
        Ok(self.paginator_index()?.config(&declared).is_some())
    }

    /// Returns a paginator for an operation.
    ///
    /// Fails with [`Error::Capability`] when the operation has no pagination
    /// configured.
    pub fn get_paginator(&self, operation: &str) -> Result<Paginator<'_>, Error> {
        let declared = self.resolve_operation(operation)?.to_string();
        let config = self
            .paginator_index()?
            .config(&declared)
            .cloned()
            .ok_or_else(|| CapabilityError::new(&declared, "operation cannot be paginated"))?;
        Ok(Paginator::new(self, declared, config))
    }

    /// Returns the waiter declared under `name` (either spelling).
    pub fn get_waiter(&self, name: &str) -> Result<Waiter<'_>, Error> {
        let index = self.waiter_index()?;
        let wanted = xform_name(name);
        let declared = index
            .waiter_names()
            .find(|candidate| xform_name(candidate) == wanted)
            .map(str::to_string)
            .ok_or_else(|| CapabilityError::new(name, "no such waiter for this service"))?;
        let config = index
            .waiter(&declared)
            .map_err(|err| {
                ConfigurationError::new(format!("waiter `{declared}` is unusable"))
                    .with_source(err)
            })?
            .ok_or_else(|| CapabilityError::new(name, "no such waiter for this service"))?;
        Ok(Waiter::new(self, config))
    }

    /// Snake-case names of the waiters this service declares.
    pub fn waiter_names(&self) -> Result<Vec<String>, Error> {
        Ok(self
            .waiter_index()?
            .waiter_names()
            .map(xform_name)
            .collect())
    }

    /// Creates a sibling client sharing this one's immutable collaborators.
    ///
    /// The hook router is deep-copied: registrations on either client after
    /// the clone are invisible to the other. The auxiliary-document cache
    /// starts empty. A signer override rebinds the clone's signing hook.
    pub fn clone_client(&self, overrides: ClientOverrides) -> Client {
        let mut hooks = self.hooks.clone();
        let signer = match overrides.signer {
            Some(signer) => {
                let prefix = self.model.endpoint_prefix();
                let scope = HookScope::service(HookKind::RequestCreated, prefix);
                hooks.unregister(&scope, SIGNING_HANDLER_ID);
                register_signing_hook(&mut hooks, prefix, signer.clone());
                signer
            }
            None => self.signer.clone(),
        };
        Client {
            model: self.model.clone(),
            serializer: overrides.serializer.unwrap_or_else(|| self.serializer.clone()),
            parser: overrides.parser.unwrap_or_else(|| self.parser.clone()),
            signer,
            endpoint: overrides.endpoint.unwrap_or_else(|| self.endpoint.clone()),
            loader: self.loader.clone(),
            hooks,
            operations: self.operations.clone(),
            cache: Mutex::new(ClientCache::default()),
        }
    }

    fn paginator_index(&self) -> Result<Arc<PaginatorIndex>, Error> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(index) = &cache.paginators {
            return Ok(index.clone());
        }
        let index = match self.loader.load_paginators(self.model.service_name()) {
            Ok(Some(index)) => Arc::new(index),
            Ok(None) => Arc::new(PaginatorIndex::default()),
            Err(err) => {
                return Err(ConfigurationError::new(format!(
                    "cannot load paginators for `{}`",
                    self.model.service_name()
                ))
                .with_source(err)
                .into())
            }
        };
        cache.paginators = Some(index.clone());
        Ok(index)
    }

    fn waiter_index(&self) -> Result<Arc<WaiterIndex>, Error> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(index) = &cache.waiters {
            return Ok(index.clone());
        }
        let index = match self.loader.load_waiters(self.model.service_name()) {
            Ok(Some(index)) => Arc::new(index),
            Ok(None) => Arc::new(WaiterIndex::default()),
            Err(err) => {
                return Err(ConfigurationError::new(format!(
                    "cannot load waiters for `{}`",
                    self.model.service_name()
                ))
                .with_source(err)
                .into())
            }
        };
        cache.waiters = Some(index.clone());
        Ok(index)
    }
}
