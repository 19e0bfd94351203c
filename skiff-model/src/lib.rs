/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Declarative service descriptions.
//!
//! A service is described by a JSON document listing its operations, the
//! shapes of their inputs and outputs, and metadata (protocol, signing name,
//! endpoint prefix). Auxiliary documents describe pagination, waiters, and
//! the retry rule set. This crate loads those documents and exposes them as
//! immutable, shareable models; it contains no I/O beyond the
//! [`loader::LoadModel`] boundary and no wire logic.

#![warn(missing_docs)]

pub mod json;
pub mod loader;
pub mod paginate;
pub mod retry;
pub mod service;
pub mod shape;
pub mod waiter;

mod xform;

pub use loader::{LoadError, LoadModel};
pub use service::{OperationModel, ServiceDescription, ServiceModel};
pub use shape::{Shape, ShapeRef};
pub use xform::xform_name;
