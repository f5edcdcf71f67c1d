//! Write Request Handling
//!
//! Every write runs through the same steps:
//!
//! ```text
//! Received -> Decoded -> (Validated | Rejected) -> [KeystrokeInjected] -> Responded -> Completed
//! ```
//!
//! The platform takes the deferral on receipt and wraps it in a
//! [`DeferralGuard`]; the handler completes it exactly once, only after the
//! response branch has run, whichever way validation went.

use crate::domain::gatt::{BleError, Deferral, DeferralGuard, WriteOption, WriteRequest};
use crate::domain::keypad::{DigitString, KeystrokeInjector};
use std::future::Future;
use tracing::{debug, warn};

/// What happened to a single write request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Valid digits, handed to the keystroke injector
    Accepted { digits: usize, responded: bool },
    /// Anything else, dropped silently
    Rejected { bytes: usize, responded: bool },
    /// The request object could not be fetched or read
    RequestUnavailable,
}

pub struct WriteHandler<K> {
    injector: K,
}

impl<K: KeystrokeInjector> WriteHandler<K> {
    pub fn new(injector: K) -> Self {
        Self { injector }
    }

    /// Run one write request to completion.
    ///
    /// `request` is the pending fetch of the request object.
    pub async fn handle<D, R, F>(&self, guard: DeferralGuard<D>, request: F) -> WriteOutcome
    where
        D: Deferral,
        R: WriteRequest,
        F: Future<Output = Result<R, BleError>>,
    {
        let outcome = match request.await {
            Ok(request) => self.process(&request),
            Err(e) => {
                warn!("Failed to fetch write request: {}", e);
                WriteOutcome::RequestUnavailable
            }
        };

        if let Err(e) = guard.complete() {
            warn!("Failed to complete write deferral: {}", e);
        }

        debug!("Write request completed: {:?}", outcome);
        outcome
    }

    fn process<R: WriteRequest>(&self, request: &R) -> WriteOutcome {
        let (payload, option) = match request.value().and_then(|v| Ok((v, request.option()?))) {
            Ok(parts) => parts,
            Err(e) => {
                warn!("Failed to read write request: {}", e);
                return WriteOutcome::RequestUnavailable;
            }
        };

        let digits = DigitString::decode(&payload);
        match &digits {
            Some(digits) => {
                if let Err(e) = self.injector.inject(&digits.keystrokes()) {
                    warn!("Keystroke injection failed: {}", e);
                }
            }
            None => debug!("Dropping non-numeric payload ({} bytes)", payload.len()),
        }

        let responded = match option {
            WriteOption::WithResponse => match request.respond() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to respond to write request: {}", e);
                    false
                }
            },
            WriteOption::WithoutResponse => false,
        };

        match digits {
            Some(digits) => WriteOutcome::Accepted {
                digits: digits.as_str().len(),
                responded,
            },
            None => WriteOutcome::Rejected {
                bytes: payload.len(),
                responded,
            },
        }
    }
}
