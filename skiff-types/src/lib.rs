/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Protocol-agnostic types shared across the skiff client runtime.
//!
//! This crate deliberately has no dependencies. It defines the open-content
//! [`Document`] value that operation parameters and results are expressed in,
//! generic service error metadata, and the retry vocabulary.

#![warn(missing_docs)]

pub mod document;
pub mod error;
pub mod retry;

pub use document::{Document, Number};
pub use error::ErrorMetadata;
