/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The transport boundary.
//!
//! Dispatch depends on exactly one external collaborator for I/O: something
//! that can exchange a [`Request`] for a [`Response`]. Every failure at this
//! layer is a [`TransportError`], which is always a candidate for retry
//! evaluation and never silently swallowed.

use crate::error::BoxError;
use crate::request::{Request, Response};
use std::fmt;

/// Sends a request and returns the raw response.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Performs one network exchange.
    fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

/// A failure to complete the network exchange.
#[derive(Debug)]
pub struct TransportError {
    kind: TransportErrorKind,
    source: Option<BoxError>,
}

/// Classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The peer never completed a connection.
    Connect,
    /// The exchange did not complete in time.
    Timeout,
    /// An I/O failure mid-exchange.
    Io,
    /// A response arrived but was not usable (truncated, unparseable
    /// framing, or an unparseable success body).
    MalformedResponse,
    /// Anything else.
    Other,
}

impl TransportError {
    fn new(kind: TransportErrorKind, source: Option<BoxError>) -> Self {
        Self { kind, source }
    }

    /// A connection-level failure.
    pub fn connect(source: impl Into<BoxError>) -> Self {
        Self::new(TransportErrorKind::Connect, Some(source.into()))
    }

    /// A timeout.
    pub fn timeout(source: impl Into<BoxError>) -> Self {
        Self::new(TransportErrorKind::Timeout, Some(source.into()))
    }

    /// An I/O failure mid-exchange.
    pub fn io(source: impl Into<BoxError>) -> Self {
        Self::new(TransportErrorKind::Io, Some(source.into()))
    }

    /// A malformed response.
    pub fn malformed(source: impl Into<BoxError>) -> Self {
        Self::new(TransportErrorKind::MalformedResponse, Some(source.into()))
    }

    /// An otherwise-unclassified failure.
    pub fn other(message: impl Into<BoxError>) -> Self {
        Self::new(TransportErrorKind::Other, Some(message.into()))
    }

    /// The failure classification.
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TransportErrorKind::Connect => write!(f, "transport error: connection failed"),
            TransportErrorKind::Timeout => write!(f, "transport error: timed out"),
            TransportErrorKind::Io => write!(f, "transport error: i/o failure"),
            TransportErrorKind::MalformedResponse => {
                write!(f, "transport error: malformed response")
            }
            TransportErrorKind::Other => write!(f, "transport error"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|err| err.as_ref() as _)
    }
}
