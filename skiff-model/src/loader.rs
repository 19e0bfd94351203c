/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The model loading boundary.
//!
//! Auxiliary documents (paginators, waiters) are optional: a service without
//! them is a valid state, reported as `Ok(None)` and never an error. Only
//! the service description itself is mandatory.

use crate::paginate::PaginatorIndex;
use crate::retry::RetryRuleSet;
use crate::service::ServiceDescription;
use crate::waiter::WaiterIndex;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Loads declarative service descriptions and their auxiliary documents.
pub trait LoadModel: Send + Sync + fmt::Debug {
    /// Loads the service description for `service_name`.
    fn load_service(&self, service_name: &str) -> Result<ServiceDescription, LoadError>;

    /// Loads the pagination document, if the service has one.
    fn load_paginators(&self, service_name: &str) -> Result<Option<PaginatorIndex>, LoadError>;

    /// Loads the waiter document, if the service has one.
    fn load_waiters(&self, service_name: &str) -> Result<Option<WaiterIndex>, LoadError>;

    /// Loads the global retry rule set, if one is present.
    fn load_retry_rules(&self) -> Result<Option<RetryRuleSet>, LoadError>;
}

/// A model document that could not be loaded.
#[derive(Debug)]
pub struct LoadError {
    kind: LoadErrorKind,
    path: String,
}

#[derive(Debug)]
enum LoadErrorKind {
    /// The document does not exist.
    NotFound,
    /// The document exists but could not be read.
    Io(std::io::Error),
    /// The document exists but is not valid JSON for its schema.
    Parse(serde_json::Error),
}

impl LoadError {
    fn not_found(path: impl Into<String>) -> Self {
        Self {
            kind: LoadErrorKind::NotFound,
            path: path.into(),
        }
    }

    fn io(path: impl Into<String>, err: std::io::Error) -> Self {
        Self {
            kind: LoadErrorKind::Io(err),
            path: path.into(),
        }
    }

    fn parse(path: impl Into<String>, err: serde_json::Error) -> Self {
        Self {
            kind: LoadErrorKind::Parse(err),
            path: path.into(),
        }
    }

    /// True when the document simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, LoadErrorKind::NotFound)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LoadErrorKind::NotFound => write!(f, "model document not found: {}", self.path),
            LoadErrorKind::Io(_) => write!(f, "failed to read model document {}", self.path),
            LoadErrorKind::Parse(_) => write!(f, "failed to parse model document {}", self.path),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            LoadErrorKind::NotFound => None,
            LoadErrorKind::Io(err) => Some(err),
            LoadErrorKind::Parse(err) => Some(err),
        }
    }
}

/// Loads model documents from a directory tree:
/// `<root>/<service>/service.json`, `<root>/<service>/paginators.json`,
/// `<root>/<service>/waiters.json`, and `<root>/_retry.json`.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    /// Creates a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read<T: DeserializeOwned>(&self, path: &Path) -> Result<T, LoadError> {
        let display_path = path.display().to_string();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadError::not_found(display_path))
            }
            Err(err) => return Err(LoadError::io(display_path, err)),
        };
        trace!(path = %display_path, "loaded model document");
        serde_json::from_str(&contents).map_err(|err| LoadError::parse(display_path, err))
    }

    fn read_optional<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, LoadError> {
        match self.read(path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl LoadModel for FsLoader {
    fn load_service(&self, service_name: &str) -> Result<ServiceDescription, LoadError> {
        self.read(&self.root.join(service_name).join("service.json"))
    }

    fn load_paginators(&self, service_name: &str) -> Result<Option<PaginatorIndex>, LoadError> {
        self.read_optional(&self.root.join(service_name).join("paginators.json"))
    }

    fn load_waiters(&self, service_name: &str) -> Result<Option<WaiterIndex>, LoadError> {
        self.read_optional(&self.root.join(service_name).join("waiters.json"))
    }

    fn load_retry_rules(&self) -> Result<Option<RetryRuleSet>, LoadError> {
        self.read_optional(&self.root.join("_retry.json"))
    }
}

/// Serves model documents from in-memory JSON values.
#[derive(Debug, Default)]
pub struct StaticLoader {
    services: HashMap<String, serde_json::Value>,
    paginators: HashMap<String, serde_json::Value>,
    waiters: HashMap<String, serde_json::Value>,
    retry_rules: Option<serde_json::Value>,
}

impl StaticLoader {
    /// Creates an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service description document.
    pub fn with_service(mut self, name: impl Into<String>, document: serde_json::Value) -> Self {
        self.services.insert(name.into(), document);
        self
    }

    /// Adds a pagination document for a service.
    pub fn with_paginators(mut self, name: impl Into<String>, document: serde_json::Value) -> Self {
        self.paginators.insert(name.into(), document);
        self
    }

    /// Adds a waiter document for a service.
    pub fn with_waiters(mut self, name: impl Into<String>, document: serde_json::Value) -> Self {
        self.waiters.insert(name.into(), document);
        self
    }

    /// Sets the global retry rule set.
    pub fn with_retry_rules(mut self, document: serde_json::Value) -> Self {
        self.retry_rules = Some(document);
        self
    }
}

fn from_value<T: DeserializeOwned>(name: &str, value: &serde_json::Value) -> Result<T, LoadError> {
    serde_json::from_value(value.clone()).map_err(|err| LoadError::parse(name.to_string(), err))
}

impl LoadModel for StaticLoader {
    fn load_service(&self, service_name: &str) -> Result<ServiceDescription, LoadError> {
        match self.services.get(service_name) {
            Some(value) => from_value(service_name, value),
            None => Err(LoadError::not_found(service_name.to_string())),
        }
    }

    fn load_paginators(&self, service_name: &str) -> Result<Option<PaginatorIndex>, LoadError> {
        self.paginators
            .get(service_name)
            .map(|value| from_value(service_name, value))
            .transpose()
    }

    fn load_waiters(&self, service_name: &str) -> Result<Option<WaiterIndex>, LoadError> {
        self.waiters
            .get(service_name)
            .map(|value| from_value(service_name, value))
            .transpose()
    }

    fn load_retry_rules(&self) -> Result<Option<RetryRuleSet>, LoadError> {
        self.retry_rules
            .as_ref()
            .map(|value| from_value("_retry", value))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_loader_reports_missing_service() {
        let loader = StaticLoader::new();
        let err = loader.load_service("widgets").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn absent_auxiliary_documents_are_none() {
        let loader = StaticLoader::new().with_service(
            "widgets",
            serde_json::json!({
                "metadata": {
                    "endpointPrefix": "widgets",
                    "apiVersion": "2016-11-15",
                    "protocol": "json",
                    "signatureVersion": "v4"
                }
            }),
        );
        assert!(loader.load_service("widgets").is_ok());
        assert!(loader.load_paginators("widgets").unwrap().is_none());
        assert!(loader.load_waiters("widgets").unwrap().is_none());
        assert!(loader.load_retry_rules().unwrap().is_none());
    }
}
