/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The retry handler.
//!
//! A resolved [`RetryConfig`] is expanded into a [`RetryHandler`] listening
//! on `NeedsRetry` for one service. The handler's answer is authoritative:
//! the attempt loop applies whatever decision it writes and adds no logic of
//! its own. A failed attempt is retried when any policy criterion matches
//! and the attempt budget is not exhausted.

use crate::hooks::{Hook, HookKind, HookPayload, HookRouter, HookScope};
use skiff_model::retry::{DelayBase, RetryConfig};
use skiff_types::retry::RetryDecision;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Evaluates one service's retry table against failed attempts.
#[derive(Debug)]
pub struct RetryHandler {
    config: RetryConfig,
}

impl RetryHandler {
    /// Wraps a resolved retry table.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    fn decide(
        &self,
        attempt: u32,
        status: Option<u16>,
        error_code: Option<&str>,
        transport_error: bool,
    ) -> RetryDecision {
        if attempt >= self.config.max_attempts {
            debug!(
                attempt,
                max_attempts = self.config.max_attempts,
                "attempt budget exhausted"
            );
            return RetryDecision::GiveUp;
        }
        let matched = self
            .config
            .policies
            .iter()
            .find(|policy| policy.criterion.matches(status, error_code, transport_error));
        match matched {
            Some(policy) => {
                let delay = self.delay_for(attempt);
                debug!(policy = %policy.name, attempt, delay_ms = delay.as_millis() as u64, "retrying");
                RetryDecision::RetryAfter(delay)
            }
            None => RetryDecision::GiveUp,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let base = match self.config.delay.base {
            DelayBase::Fixed(base) => base,
            DelayBase::Rand => fastrand::f64(),
        };
        let exponent = attempt.saturating_sub(1) as i32;
        let seconds = base * self.config.delay.growth_factor.powi(exponent);
        Duration::from_secs_f64(seconds.max(0.0))
    }
}

impl Hook for RetryHandler {
    fn run(&self, payload: &mut HookPayload<'_>) -> Result<(), crate::error::BoxError> {
        if let HookPayload::NeedsRetry {
            attempt,
            status,
            error_code,
            transport_error,
            decision,
        } = payload
        {
            **decision = Some(self.decide(
                *attempt,
                status.map(|s| s.as_u16()),
                *error_code,
                *transport_error,
            ));
        }
        Ok(())
    }
}

/// Registers the retry handler for a service under its stable id,
/// `retry-config-<endpoint_prefix>`. Re-registration is a no-op.
pub fn register_retry_handler(
    hooks: &mut HookRouter,
    endpoint_prefix: &str,
    config: RetryConfig,
) -> bool {
    hooks.register(
        HookScope::service(HookKind::NeedsRetry, endpoint_prefix),
        format!("retry-config-{endpoint_prefix}"),
        Arc::new(RetryHandler::new(config)),
    )
}
