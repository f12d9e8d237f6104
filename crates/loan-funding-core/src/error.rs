use thiserror::Error;

use crate::types::{ApplicationId, InstallmentId};

#[derive(Debug, Error)]
pub enum FundingError {
    #[error("Invalid loan terms: {reason}")]
    InvalidLoanTerms { reason: String },

    #[error("Missing required field: {field}")]
    MissingRequiredField { field: String },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid calculation state: {context}")]
    InvalidCalculationState { context: String },

    #[error("Schedule regeneration conflict for application {application_id}; retry with the current version")]
    ScheduleRegenerationConflict { application_id: ApplicationId },

    #[error("Installment {installment_id} not found")]
    InstallmentNotFound { installment_id: InstallmentId },

    #[error("Notification dispatch failed: {context}")]
    DispatchFailure { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for FundingError {
    fn from(e: serde_json::Error) -> Self {
        FundingError::SerializationError(e.to_string())
    }
}
