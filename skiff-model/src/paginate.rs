/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Pagination configuration.

use indexmap::IndexMap;
use serde::Deserialize;

/// The per-service pagination document: operation name to page config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginatorIndex {
    /// Pagination entries keyed by operation name.
    #[serde(default)]
    pub pagination: IndexMap<String, PageConfig>,
}

/// How one operation pages: which output field carries the continuation
/// token, which input field it is threaded back through, and where the
/// page's items live.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageConfig {
    /// Input parameter the continuation token is sent under.
    pub input_token: String,
    /// Output field the next continuation token appears under.
    pub output_token: String,
    /// Output field holding the page's items list.
    #[serde(default)]
    pub result_key: Option<String>,
    /// Input parameter that caps the page size, when the service has one.
    #[serde(default)]
    pub limit_key: Option<String>,
}

impl PaginatorIndex {
    /// Page config for an operation, by declared operation name.
    pub fn config(&self, operation_name: &str) -> Option<&PageConfig> {
        self.pagination.get(operation_name)
    }
}
