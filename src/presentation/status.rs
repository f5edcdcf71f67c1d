//! Status Board
//!
//! Folds the worker's [`AppEvent`] stream into what either surface shows: the
//! status line, write counters and the latest message.

use crate::domain::models::{AppEvent, ServiceState, StatusMessage, PRODUCT_NAME};
use crate::domain::write_handler::WriteOutcome;

#[derive(Debug)]
pub struct StatusBoard {
    state: ServiceState,
    accepted: u64,
    rejected: u64,
    unavailable: u64,
    last_message: Option<StatusMessage>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            state: ServiceState::Starting,
            accepted: 0,
            rejected: 0,
            unavailable: 0,
            last_message: None,
        }
    }

    /// Record one event. Returns true if the status line changed.
    pub fn apply(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::ServiceState(state) => {
                let changed = state != self.state;
                self.state = state;
                changed
            }
            AppEvent::WriteHandled(outcome) => {
                match outcome {
                    WriteOutcome::Accepted { .. } => self.accepted += 1,
                    WriteOutcome::Rejected { .. } => self.rejected += 1,
                    WriteOutcome::RequestUnavailable => self.unavailable += 1,
                }
                false
            }
            AppEvent::LogMessage(message) => {
                self.last_message = Some(message);
                false
            }
        }
    }

    /// The product name, followed by the reason when the service is not up
    pub fn status_line(&self) -> String {
        match &self.state {
            ServiceState::Starting => format!("{} (Starting...)", PRODUCT_NAME),
            ServiceState::Advertising => PRODUCT_NAME.to_string(),
            ServiceState::Unavailable(status) => status.clone(),
            ServiceState::Stopped => format!("{} (Stopped)", PRODUCT_NAME),
        }
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn unavailable(&self) -> u64 {
        self.unavailable
    }

    pub fn last_message(&self) -> Option<&StatusMessage> {
        self.last_message.as_ref()
    }
}
