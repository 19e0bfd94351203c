/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

mod common;

use http::StatusCode;
use skiff_client::error::Error;
use skiff_client::hooks::{Hook, HookKind, HookPayload, HookScope};
use skiff_client::test_util::StaticTransport;
use skiff_client::ClientOverrides;
use skiff_model::json::to_document;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn counting_hook(counter: Arc<AtomicUsize>) -> Arc<dyn Hook> {
    Arc::new(move |_: &mut HookPayload<'_>| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

#[test]
fn dispatch_returns_parsed_output() {
    let transport = Arc::new(StaticTransport::new());
    transport.enqueue_json(
        StatusCode::OK,
        serde_json::json!({ "Widgets": [{ "Name": "w-1" }] }),
    );
    let client = common::creator(transport.clone())
        .create_client("widgets", "us-east-1", common::config())
        .unwrap();

    let out = client
        .call("describe_widgets", to_document(serde_json::json!({ "MaxRecords": 1 })))
        .unwrap();
    assert!(out.get("Widgets").is_some());

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(
        request.headers()["x-skiff-target"].to_str().unwrap(),
        "widgets.DescribeWidgets"
    );
    assert_eq!(
        request.url(),
        "https://widgets.us-east-1.example.test/"
    );
    let body: serde_json::Value = serde_json::from_slice(request.body()).unwrap();
    assert_eq!(body, serde_json::json!({ "MaxRecords": 1 }));
}

#[test]
fn declared_operation_spelling_is_accepted() {
    let transport = Arc::new(StaticTransport::new());
    transport.enqueue_json(StatusCode::OK, serde_json::json!({}));
    let client = common::creator(transport)
        .create_client("widgets", "us-east-1", common::config())
        .unwrap();
    assert!(client
        .call("DescribeWidgets", to_document(serde_json::json!({})))
        .is_ok());
}

#[test]
fn error_response_surfaces_code_and_message_verbatim() {
    let transport = Arc::new(StaticTransport::new());
    transport.enqueue_json(
        StatusCode::NOT_FOUND,
        serde_json::json!({
            "__type": "com.example.widgets#WidgetNotFound",
            "message": "no widget named w-9"
        }),
    );
    let client = common::creator(transport)
        .create_client("widgets", "us-east-1", common::config())
        .unwrap();

    let err = client
        .call("get_widget", to_document(serde_json::json!({ "Name": "w-9" })))
        .unwrap_err();
    match err {
        Error::Service(err) => {
            assert_eq!(err.code(), Some("WidgetNotFound"));
            assert_eq!(err.message(), Some("no widget named w-9"));
            assert_eq!(err.status(), 404);
            assert_eq!(err.operation_name(), "GetWidget");
        }
        other => panic!("expected a service error, got {other:?}"),
    }
}

#[test]
fn invalid_params_never_reach_the_transport() {
    let transport = Arc::new(StaticTransport::new());
    let client = common::creator(transport.clone())
        .create_client("widgets", "us-east-1", common::config())
        .unwrap();

    let err = client
        .call("get_widget", to_document(serde_json::json!({ "Nope": 1 })))
        .unwrap_err();
    assert!(matches!(err, Error::ParamValidation(_)));
    assert_eq!(transport.request_count(), 0);
}

#[test]
fn unknown_operation_is_a_capability_error() {
    let transport = Arc::new(StaticTransport::new());
    let client = common::creator(transport)
        .create_client("widgets", "us-east-1", common::config())
        .unwrap();
    let err = client
        .call("launch_rocket", to_document(serde_json::json!({})))
        .unwrap_err();
    assert!(matches!(err, Error::Capability(_)));
}

#[test]
fn hooks_run_most_general_scope_first() {
    let transport = Arc::new(StaticTransport::new());
    transport.enqueue_json(StatusCode::OK, serde_json::json!({}));
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = |label: &'static str, order: Arc<Mutex<Vec<&'static str>>>| -> Arc<dyn Hook> {
        Arc::new(move |_: &mut HookPayload<'_>| {
            order.lock().unwrap().push(label);
            Ok(())
        })
    };

    let mut creator = common::creator(transport);
    creator.hooks_mut().register(
        HookScope::operation(HookKind::BeforeCall, "widgets", "DescribeWidgets"),
        "op",
        recorder("operation", order.clone()),
    );
    creator.hooks_mut().register(
        HookScope::global(HookKind::BeforeCall),
        "global",
        recorder("global", order.clone()),
    );
    creator.hooks_mut().register(
        HookScope::service(HookKind::BeforeCall, "widgets"),
        "svc",
        recorder("service", order.clone()),
    );

    let client = creator
        .create_client("widgets", "us-east-1", common::config())
        .unwrap();
    client
        .call("describe_widgets", to_document(serde_json::json!({})))
        .unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["global", "service", "operation"]);
}

#[test]
fn duplicate_handler_registration_fires_once() {
    let transport = Arc::new(StaticTransport::new());
    transport.enqueue_json(StatusCode::OK, serde_json::json!({}));
    let counter = Arc::new(AtomicUsize::new(0));

    let mut creator = common::creator(transport);
    let scope = HookScope::service(HookKind::BeforeParameterBuild, "widgets");
    assert!(creator
        .hooks_mut()
        .register(scope.clone(), "audit", counting_hook(counter.clone())));
    assert!(!creator
        .hooks_mut()
        .register(scope, "audit", counting_hook(counter.clone())));

    let client = creator
        .create_client("widgets", "us-east-1", common::config())
        .unwrap();
    client
        .call("describe_widgets", to_document(serde_json::json!({})))
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn cloned_client_hooks_are_isolated() {
    let transport = Arc::new(StaticTransport::new());
    transport.enqueue_json(StatusCode::OK, serde_json::json!({}));
    transport.enqueue_json(StatusCode::OK, serde_json::json!({}));
    let counter = Arc::new(AtomicUsize::new(0));

    let client = common::creator(transport)
        .create_client("widgets", "us-east-1", common::config())
        .unwrap();
    let mut clone = client.clone_client(ClientOverrides::default());
    clone.hooks_mut().register(
        HookScope::global(HookKind::BeforeCall),
        "clone-only",
        counting_hook(counter.clone()),
    );

    client
        .call("describe_widgets", to_document(serde_json::json!({})))
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    clone
        .call("describe_widgets", to_document(serde_json::json!({})))
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn before_parameter_build_can_rewrite_params() {
    let transport = Arc::new(StaticTransport::new());
    transport.enqueue_json(StatusCode::OK, serde_json::json!({}));

    let mut creator = common::creator(transport.clone());
    creator.hooks_mut().register(
        HookScope::service(HookKind::BeforeParameterBuild, "widgets"),
        "inject-limit",
        Arc::new(|payload: &mut HookPayload<'_>| {
            if let HookPayload::BeforeParameterBuild { params } = payload {
                if let Some(object) = params.as_object_mut() {
                    object.insert("MaxRecords".to_string(), 25i64.into());
                }
            }
            Ok(())
        }),
    );

    let client = creator
        .create_client("widgets", "us-east-1", common::config())
        .unwrap();
    client
        .call("describe_widgets", to_document(serde_json::json!({})))
        .unwrap();
    let body: serde_json::Value =
        serde_json::from_slice(transport.requests()[0].body()).unwrap();
    assert_eq!(body, serde_json::json!({ "MaxRecords": 25 }));
}

#[test]
fn endpoint_url_override_bypasses_the_resolver() {
    let transport = Arc::new(StaticTransport::new());
    transport.enqueue_json(StatusCode::OK, serde_json::json!({}));
    let config = skiff_client::ClientConfig {
        endpoint_url: Some(http::Uri::from_static("http://localhost:4000")),
        ..skiff_client::ClientConfig::default()
    };
    let client = common::creator(transport.clone())
        .create_client("widgets", "us-east-1", config)
        .unwrap();
    client
        .call("describe_widgets", to_document(serde_json::json!({})))
        .unwrap();
    assert_eq!(transport.requests()[0].url(), "http://localhost:4000/");
}

#[test]
fn signed_requests_carry_an_authorization_header() {
    let transport = Arc::new(StaticTransport::new());
    transport.enqueue_json(StatusCode::OK, serde_json::json!({}));
    let config = skiff_client::ClientConfig {
        credentials: Some(Arc::new(skiff_client::sign::Credentials::new(
            "AKIDEXAMPLE",
            "secret",
            None,
        ))),
        ..skiff_client::ClientConfig::default()
    };
    let client = common::creator(transport.clone())
        .create_client("widgets", "us-east-1", config)
        .unwrap();
    client
        .call("describe_widgets", to_document(serde_json::json!({})))
        .unwrap();
    let request = &transport.requests()[0];
    let authorization = request.headers()["authorization"].to_str().unwrap();
    assert!(authorization.starts_with("SKIFF4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
    assert!(request.headers().contains_key("x-skiff-date"));
}

#[test]
fn signing_stages_bracket_the_signer() {
    let transport = Arc::new(StaticTransport::new());
    transport.enqueue_json(StatusCode::OK, serde_json::json!({}));
    let observed: Arc<Mutex<Vec<(&'static str, bool)>>> = Arc::new(Mutex::new(Vec::new()));

    let mut creator = common::creator(transport);
    let before = observed.clone();
    creator.hooks_mut().register(
        HookScope::service(HookKind::BeforeSign, "widgets"),
        "observe-unsigned",
        Arc::new(move |payload: &mut HookPayload<'_>| {
            if let HookPayload::BeforeSign { request } = payload {
                before
                    .lock()
                    .unwrap()
                    .push(("before", request.headers().contains_key("authorization")));
            }
            Ok(())
        }),
    );
    let after = observed.clone();
    creator.hooks_mut().register(
        HookScope::service(HookKind::AfterSign, "widgets"),
        "observe-signed",
        Arc::new(move |payload: &mut HookPayload<'_>| {
            if let HookPayload::AfterSign { request } = payload {
                after
                    .lock()
                    .unwrap()
                    .push(("after", request.headers().contains_key("authorization")));
            }
            Ok(())
        }),
    );

    let config = skiff_client::ClientConfig {
        credentials: Some(Arc::new(skiff_client::sign::Credentials::new(
            "AKIDEXAMPLE",
            "secret",
            None,
        ))),
        ..skiff_client::ClientConfig::default()
    };
    let client = creator
        .create_client("widgets", "us-east-1", config)
        .unwrap();
    client
        .call("describe_widgets", to_document(serde_json::json!({})))
        .unwrap();
    assert_eq!(
        *observed.lock().unwrap(),
        vec![("before", false), ("after", true)]
    );
}

#[test]
fn anonymous_clients_send_unsigned_requests() {
    let transport = Arc::new(StaticTransport::new());
    transport.enqueue_json(StatusCode::OK, serde_json::json!({}));
    let client = common::creator(transport.clone())
        .create_client("widgets", "us-east-1", common::config())
        .unwrap();
    client
        .call("describe_widgets", to_document(serde_json::json!({})))
        .unwrap();
    assert!(!transport.requests()[0].headers().contains_key("authorization"));
}
