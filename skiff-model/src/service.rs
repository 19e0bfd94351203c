/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Service and operation models.

use crate::shape::{Shape, ShapeRef};
use indexmap::IndexMap;
use serde::Deserialize;
use std::sync::Arc;

/// The raw, deserialized form of a service description document.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDescription {
    /// Service-level metadata.
    pub metadata: Metadata,
    /// Operations, in declaration order.
    #[serde(default)]
    pub operations: IndexMap<String, OperationDescription>,
    /// Named shapes referenced by the operations.
    #[serde(default)]
    pub shapes: IndexMap<String, Shape>,
}

/// Service-level metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Prefix used for endpoint resolution and for scoping events.
    pub endpoint_prefix: String,
    /// Name the service signs requests under; defaults to the endpoint
    /// prefix when absent.
    #[serde(default)]
    pub signing_name: Option<String>,
    /// API version date string.
    pub api_version: String,
    /// Protocol identifier (e.g. `json`).
    pub protocol: String,
    /// Default signature version for the service.
    pub signature_version: String,
}

/// One operation within a service description.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationDescription {
    /// HTTP binding, if declared.
    #[serde(default)]
    pub http: Option<HttpBinding>,
    /// Reference to the input shape.
    #[serde(default)]
    pub input: Option<ShapeRef>,
    /// Reference to the output shape.
    #[serde(default)]
    pub output: Option<ShapeRef>,
}

/// HTTP binding of an operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpBinding {
    /// HTTP method.
    pub method: String,
    /// Request URI template.
    pub request_uri: String,
}

/// Read-only view over a loaded service description.
///
/// Built once at client-construction time and shared (`Arc`) by every client
/// instance created from it; never mutated after construction.
#[derive(Debug, Clone)]
pub struct ServiceModel {
    service_name: String,
    description: Arc<ServiceDescription>,
}

impl ServiceModel {
    /// Wraps a loaded description under the name it was loaded as.
    pub fn new(service_name: impl Into<String>, description: ServiceDescription) -> Self {
        Self {
            service_name: service_name.into(),
            description: Arc::new(description),
        }
    }

    /// The name this service was loaded under.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Prefix used for endpoint resolution and event scoping.
    pub fn endpoint_prefix(&self) -> &str {
        &self.description.metadata.endpoint_prefix
    }

    /// Name the service signs requests under.
    pub fn signing_name(&self) -> &str {
        self.description
            .metadata
            .signing_name
            .as_deref()
            .unwrap_or_else(|| self.endpoint_prefix())
    }

    /// API version date string.
    pub fn api_version(&self) -> &str {
        &self.description.metadata.api_version
    }

    /// Protocol identifier.
    pub fn protocol(&self) -> &str {
        &self.description.metadata.protocol
    }

    /// The service's declared default signature version.
    pub fn signature_version(&self) -> &str {
        &self.description.metadata.signature_version
    }

    /// Operation names, in declaration order.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.description.operations.keys().map(String::as_str)
    }

    /// Looks up an operation by its declared name.
    pub fn operation(&self, name: &str) -> Option<OperationModel<'_>> {
        self.description
            .operations
            .get_key_value(name)
            .map(|(name, description)| OperationModel {
                name,
                description,
                model: self,
            })
    }

    /// Resolves a shape by name.
    pub fn shape(&self, name: &str) -> Option<&Shape> {
        self.description.shapes.get(name)
    }
}

/// One operation of a [`ServiceModel`].
#[derive(Debug, Clone, Copy)]
pub struct OperationModel<'a> {
    name: &'a str,
    description: &'a OperationDescription,
    model: &'a ServiceModel,
}

impl<'a> OperationModel<'a> {
    /// The operation's declared name (e.g. `DescribeWidgets`).
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// The owning service model.
    pub fn service(&self) -> &'a ServiceModel {
        self.model
    }

    /// HTTP method for this operation; `POST` when no binding is declared.
    pub fn http_method(&self) -> &'a str {
        self.description
            .http
            .as_ref()
            .map(|http| http.method.as_str())
            .unwrap_or("POST")
    }

    /// Request URI for this operation; `/` when no binding is declared.
    pub fn request_uri(&self) -> &'a str {
        self.description
            .http
            .as_ref()
            .map(|http| http.request_uri.as_str())
            .unwrap_or("/")
    }

    /// Resolved input shape, if the operation declares one.
    pub fn input_shape(&self) -> Option<&'a Shape> {
        self.description
            .input
            .as_ref()
            .and_then(|shape_ref| self.model.shape(&shape_ref.shape))
    }

    /// Resolved output shape, if the operation declares one.
    pub fn output_shape(&self) -> Option<&'a Shape> {
        self.description
            .output
            .as_ref()
            .and_then(|shape_ref| self.model.shape(&shape_ref.shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ServiceModel {
        let description: ServiceDescription = serde_json::from_value(serde_json::json!({
            "metadata": {
                "endpointPrefix": "widgets",
                "apiVersion": "2016-11-15",
                "protocol": "json",
                "signatureVersion": "v4"
            },
            "operations": {
                "DescribeWidgets": {
                    "input": { "shape": "DescribeWidgetsInput" },
                    "output": { "shape": "DescribeWidgetsOutput" }
                },
                "DeleteWidget": {}
            },
            "shapes": {
                "DescribeWidgetsInput": { "type": "structure", "members": {} },
                "DescribeWidgetsOutput": { "type": "structure", "members": {} }
            }
        }))
        .unwrap();
        ServiceModel::new("widgets", description)
    }

    #[test]
    fn operation_order_is_preserved() {
        let model = model();
        assert_eq!(
            model.operation_names().collect::<Vec<_>>(),
            vec!["DescribeWidgets", "DeleteWidget"]
        );
    }

    #[test]
    fn signing_name_falls_back_to_endpoint_prefix() {
        let model = model();
        assert_eq!(model.signing_name(), "widgets");
    }

    #[test]
    fn operation_resolves_shapes() {
        let model = model();
        let op = model.operation("DescribeWidgets").unwrap();
        assert!(op.input_shape().is_some());
        assert_eq!(op.http_method(), "POST");
        assert_eq!(op.request_uri(), "/");
        assert!(model.operation("NoSuchOperation").is_none());
    }
}
