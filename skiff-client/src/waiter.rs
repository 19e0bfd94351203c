/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Waiters: poll an operation until a declared condition holds.
//!
//! Each poll outcome is run through the waiter's acceptors in order; the
//! first matching acceptor decides whether the wait succeeds, fails, or
//! polls again. Service errors that no acceptor claims propagate to the
//! caller unchanged. A waiter always terminates: the attempt budget and the
//! optional wall-clock deadline are both hard stops.

use crate::client::Client;
use crate::error::Error;
use skiff_model::waiter::{Matcher, WaiterConfig, WaiterState};
use skiff_types::Document;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// A configured waiter bound to a client.
#[derive(Debug)]
pub struct Waiter<'a> {
    client: &'a Client,
    config: WaiterConfig,
    max_wait: Option<Duration>,
}

impl<'a> Waiter<'a> {
    pub(crate) fn new(client: &'a Client, config: WaiterConfig) -> Self {
        Self {
            client,
            config,
            max_wait: None,
        }
    }

    /// The declared waiter name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Caps the total wall-clock time spent waiting, on top of the
    /// configured attempt budget.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Polls the bound operation until an acceptor resolves the wait.
    pub fn wait(&self, params: Document) -> Result<(), Error> {
        let deadline = self.max_wait.map(|max| Instant::now() + max);
        for attempt in 1..=self.config.max_attempts {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(WaiterError::deadline_exceeded(&self.config.name).into());
                }
            }
            debug!(
                waiter = %self.config.name,
                operation = %self.config.operation,
                attempt,
                "polling"
            );
            let outcome = self.client.call_raw(&self.config.operation, params.clone());
            match self.accept(&outcome) {
                Some(WaiterState::Success) => return Ok(()),
                Some(WaiterState::Failure) => {
                    return Err(WaiterError::failure_state(&self.config.name).into())
                }
                Some(WaiterState::Retry) => {}
                // Errors no acceptor claimed are the caller's problem, not a
                // retry signal.
                None => {
                    if let Err(err) = outcome {
                        return Err(err);
                    }
                }
            }
            if attempt < self.config.max_attempts {
                std::thread::sleep(self.config.delay);
            }
        }
        Err(WaiterError::max_attempts_exceeded(&self.config.name, self.config.max_attempts).into())
    }

    /// Runs the acceptors against one poll outcome; the first match wins.
    fn accept(
        &self,
        outcome: &Result<(http::StatusCode, Document), Error>,
    ) -> Option<WaiterState> {
        for acceptor in &self.config.acceptors {
            let matched = match (&acceptor.matcher, outcome) {
                (Matcher::Status(want), Ok((status, _))) => status.as_u16() == *want,
                (Matcher::Status(want), Err(Error::Service(err))) => err.status() == *want,
                (Matcher::ErrorCode(want), Err(Error::Service(err))) => {
                    err.code() == Some(want.as_str())
                }
                (Matcher::Path { path, expected }, Ok((_, parsed))) => {
                    parsed.get_path(path) == Some(expected)
                }
                _ => false,
            };
            if matched {
                debug!(waiter = %self.config.name, state = ?acceptor.state, "acceptor matched");
                return Some(acceptor.state);
            }
        }
        None
    }
}

/// Why a wait did not reach its success state.
#[derive(Debug)]
pub enum WaiterError {
    /// An acceptor transitioned the waiter to its failure state.
    FailureState {
        /// The waiter that failed.
        waiter_name: String,
    },
    /// The attempt budget ran out while still polling.
    MaxAttemptsExceeded {
        /// The waiter that gave up.
        waiter_name: String,
        /// The configured budget.
        max_attempts: u32,
    },
    /// The caller-supplied wall-clock budget ran out.
    DeadlineExceeded {
        /// The waiter that gave up.
        waiter_name: String,
    },
}

impl WaiterError {
    fn failure_state(waiter_name: &str) -> Self {
        WaiterError::FailureState {
            waiter_name: waiter_name.to_string(),
        }
    }

    fn max_attempts_exceeded(waiter_name: &str, max_attempts: u32) -> Self {
        WaiterError::MaxAttemptsExceeded {
            waiter_name: waiter_name.to_string(),
            max_attempts,
        }
    }

    fn deadline_exceeded(waiter_name: &str) -> Self {
        WaiterError::DeadlineExceeded {
            waiter_name: waiter_name.to_string(),
        }
    }
}

impl fmt::Display for WaiterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaiterError::FailureState { waiter_name } => {
                write!(f, "waiter `{waiter_name}` reached a failure state")
            }
            WaiterError::MaxAttemptsExceeded {
                waiter_name,
                max_attempts,
            } => write!(
                f,
                "waiter `{waiter_name}` gave up after {max_attempts} attempts"
            ),
            WaiterError::DeadlineExceeded { waiter_name } => {
                write!(f, "waiter `{waiter_name}` exceeded its wall-clock budget")
            }
        }
    }
}

impl std::error::Error for WaiterError {}
