/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Request and response envelopes.
//!
//! The serializer produces a [`Request`] (method, path, headers, body); the
//! endpoint attaches the resolved base URI before transport. Hooks receive
//! the envelope mutably, which is how signing attaches authentication.

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode, Uri};

/// A protocol-level request envelope.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    endpoint: Option<Uri>,
}

impl Request {
    /// Creates an envelope with an empty body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            endpoint: None,
        }
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the endpoint.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request headers, mutably.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets a header, replacing any previous value.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// The resolved base endpoint, once attached.
    pub fn endpoint(&self) -> Option<&Uri> {
        self.endpoint.as_ref()
    }

    /// Attaches the resolved base endpoint.
    pub fn set_endpoint(&mut self, endpoint: Uri) {
        self.endpoint = Some(endpoint);
    }

    /// The full request URL: base endpoint joined with the path.
    ///
    /// Falls back to the bare path when no endpoint is attached (test
    /// transports never need one).
    pub fn url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!(
                "{}{}",
                endpoint.to_string().trim_end_matches('/'),
                self.path
            ),
            None => self.path.clone(),
        }
    }
}

/// A raw transport response: status code, headers, body.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Creates a response.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Response headers, mutably.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Response body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_endpoint_and_path() {
        let mut request = Request::new(Method::POST, "/widgets");
        assert_eq!(request.url(), "/widgets");
        request.set_endpoint(Uri::from_static("https://widgets.us-east-1.example.com"));
        assert_eq!(request.url(), "https://widgets.us-east-1.example.com/widgets");
    }
}
