/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Test doubles for exercising clients without a network.

use crate::request::{Request, Response};
use crate::transport::{Transport, TransportError};
use http::StatusCode;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A transport that replays a script of canned outcomes and records every
/// request it is handed.
///
/// Outcomes are consumed in order; sending past the end of the script fails
/// the call rather than hanging it.
#[derive(Debug, Default)]
pub struct StaticTransport {
    script: Mutex<VecDeque<Result<Response, TransportError>>>,
    requests: Mutex<Vec<Request>>,
}

impl StaticTransport {
    /// An empty transport; every send fails until outcomes are enqueued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues the next outcome.
    pub fn enqueue(&self, outcome: Result<Response, TransportError>) {
        self.script
            .lock()
            .expect("script lock")
            .push_back(outcome);
    }

    /// Enqueues a success response.
    pub fn enqueue_response(&self, response: Response) {
        self.enqueue(Ok(response));
    }

    /// Enqueues a JSON response with the given status.
    pub fn enqueue_json(&self, status: StatusCode, body: serde_json::Value) {
        self.enqueue(Ok(json_response(status, body)));
    }

    /// Enqueues a transport failure.
    pub fn enqueue_error(&self, error: TransportError) {
        self.enqueue(Err(error));
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

impl Transport for StaticTransport {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::other("transport script exhausted")))
    }
}

/// A response with a JSON body.
pub fn json_response(status: StatusCode, body: serde_json::Value) -> Response {
    Response::new(status, body.to_string())
}
