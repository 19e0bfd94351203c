/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Types that describe whether and when a failed call should be retried.

use std::time::Duration;

/// The single, authoritative answer of a retry handler.
///
/// Dispatch applies no retry logic of its own: whatever handler is
/// registered for `needs-retry` returns one of these, and the attempt loop
/// obeys it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-attempt the call after sleeping for the given duration.
    RetryAfter(Duration),

    /// Stop; surface the last failure to the caller unchanged.
    GiveUp,
}

impl RetryDecision {
    /// Returns the delay when the decision is to retry.
    pub fn delay(&self) -> Option<Duration> {
        match self {
            RetryDecision::RetryAfter(delay) => Some(*delay),
            RetryDecision::GiveUp => None,
        }
    }
}
