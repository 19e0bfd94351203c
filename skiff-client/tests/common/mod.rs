#![allow(dead_code)]
/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! A small widgets service fixture shared by the integration tests.

use skiff_client::client::{ClientConfig, ClientCreator};
use skiff_client::endpoint::RuleEndpointResolver;
use skiff_client::test_util::StaticTransport;
use skiff_model::loader::StaticLoader;
use std::sync::Arc;

pub fn service_document() -> serde_json::Value {
    serde_json::json!({
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
            "GetWidget": {
                "input": { "shape": "GetWidgetInput" },
                "output": { "shape": "GetWidgetOutput" }
            }
        },
        "shapes": {
            "DescribeWidgetsInput": {
                "type": "structure",
                "members": {
                    "NextToken": { "shape": "String" },
                    "MaxRecords": { "shape": "Integer" }
                }
            },
            "DescribeWidgetsOutput": { "type": "structure", "members": {} },
            "GetWidgetInput": {
                "type": "structure",
                "required": ["Name"],
                "members": { "Name": { "shape": "String" } }
            },
            "GetWidgetOutput": { "type": "structure", "members": {} },
            "String": { "type": "string" },
            "Integer": { "type": "integer" }
        }
    })
}

pub fn paginators_document() -> serde_json::Value {
    serde_json::json!({
        "pagination": {
            "DescribeWidgets": {
                "input_token": "NextToken",
                "output_token": "NextToken",
                "result_key": "Widgets",
                "limit_key": "MaxRecords"
            }
        }
    })
}

pub fn waiters_document() -> serde_json::Value {
    serde_json::json!({
        "version": 2,
        "waiters": {
            "WidgetReady": {
                "operation": "GetWidget",
                "delay": 0,
                "maxAttempts": 3,
                "acceptors": [
                    { "state": "success", "matcher": "path",
                      "argument": "Widget.Status", "expected": "Ready" },
                    { "state": "failure", "matcher": "path",
                      "argument": "Widget.Status", "expected": "Failed" },
                    { "state": "retry", "matcher": "error",
                      "expected": "WidgetNotFound" }
                ]
            }
        }
    })
}

pub fn retry_document() -> serde_json::Value {
    serde_json::json!({
        "definitions": {
            "throttling": {
                "applies_when": {
                    "response": { "http_status_code": 400, "service_error_code": "Throttling" }
                }
            }
        },
        "retry": {
            "__default__": {
                "max_attempts": 5,
                "delay": { "type": "exponential", "base": 0.0, "growth_factor": 2 },
                "policies": {
                    "general_socket_errors": {
                        "applies_when": { "socket_errors": ["GENERAL_CONNECTION_ERROR"] }
                    },
                    "service_unavailable": {
                        "applies_when": { "response": { "http_status_code": 503 } }
                    },
                    "throttling": { "$ref": "throttling" }
                }
            }
        }
    })
}

pub fn loader() -> StaticLoader {
    StaticLoader::new()
        .with_service("widgets", service_document())
        .with_paginators("widgets", paginators_document())
        .with_waiters("widgets", waiters_document())
        .with_retry_rules(retry_document())
}

pub fn creator(transport: Arc<StaticTransport>) -> ClientCreator {
    ClientCreator::new(
        Arc::new(loader()),
        Arc::new(RuleEndpointResolver::new("example.test")),
        transport,
    )
}

pub fn config() -> ClientConfig {
    ClientConfig::new()
}
