//! Notification dispatch contract.
//!
//! The core is agnostic to transport; it only depends on this interface.
//! Email, in-app, and websocket delivery all live behind implementations
//! supplied by the surrounding system.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::FundingError;
use crate::types::ApplicationId;

/// Who a notification goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    /// The application's borrowers.
    Borrowers,
    /// The assigned business development contact (escalation).
    AssignedBd,
}

/// A fully-formed notification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub audience: Audience,
    pub title: String,
    pub message: String,
    pub application_id: ApplicationId,
}

/// Failure reported by a dispatcher implementation.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct DispatchError {
    pub reason: String,
}

impl DispatchError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<DispatchError> for FundingError {
    fn from(e: DispatchError) -> Self {
        FundingError::DispatchFailure { context: e.reason }
    }
}

/// Consumed interface: delivery of a notification to its audience.
///
/// Implementations may block on network I/O; the sweep calls this without
/// holding any store lock.
pub trait NotificationDispatcher: Send + Sync {
    fn send(&self, request: &NotificationRequest) -> Result<(), DispatchError>;
}
