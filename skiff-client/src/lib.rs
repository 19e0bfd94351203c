/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! A model-driven RPC client runtime.
//!
//! Clients are not generated: a [`client::ClientCreator`] loads a declarative
//! service description at runtime and produces a [`client::Client`] whose
//! operations, pagination, waiters, and retry behavior all come from the
//! model. Dispatch is synchronous and fully hook-driven; signing and retries
//! are ordinary handlers on the [`hooks::HookRouter`], replaceable per
//! client.
//!
//! ```no_run
//! use skiff_client::client::{ClientConfig, ClientCreator};
//! use skiff_client::endpoint::RuleEndpointResolver;
//! use skiff_client::test_util::StaticTransport;
//! use skiff_model::json::to_document;
//! use skiff_model::loader::FsLoader;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut creator = ClientCreator::new(
//!     Arc::new(FsLoader::new("models")),
//!     Arc::new(RuleEndpointResolver::new("example.com")),
//!     Arc::new(StaticTransport::new()),
//! );
//! let client = creator.create_client("widgets", "us-east-1", ClientConfig::new())?;
//! let out = client.call(
//!     "describe_widgets",
//!     to_document(serde_json::json!({ "MaxRecords": 10 })),
//! )?;
//! # let _ = out;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod endpoint;
pub mod error;
pub mod hooks;
pub mod paginate;
pub mod protocol;
pub mod request;
pub mod retry;
pub mod sign;
#[cfg(feature = "test-util")]
pub mod test_util;
pub mod transport;
pub mod waiter;

pub use client::{Client, ClientConfig, ClientCreator, ClientOverrides};
pub use error::{BoxError, Error};
pub use hooks::{Hook, HookKind, HookPayload, HookRouter, HookScope};
pub use request::{Request, Response};
pub use transport::{Transport, TransportError};
