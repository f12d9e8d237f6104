//! Funding calculation and its audit trail.

pub mod calculation;
pub mod history;

use chrono::{DateTime, Utc};

pub use calculation::{compute_funding, FundingCalculationInput, FundingCalculationResult};
pub use history::{FundingCalculationHistoryRecord, FundingHistoryStore, InMemoryFundingHistory};

use crate::types::{ApplicationId, ComputationOutput, LoanTerms};
use crate::FundingResult;

/// Run the fee calculation and append the outcome to the audit trail.
///
/// The engine itself never persists; this is the orchestration seam the
/// request-handling layer calls. Fails without appending if the calculation
/// fails.
pub fn compute_and_record(
    store: &dyn FundingHistoryStore,
    application_id: ApplicationId,
    loan: &LoanTerms,
    input: &FundingCalculationInput,
    created_by: &str,
    now: DateTime<Utc>,
) -> FundingResult<(
    ComputationOutput<FundingCalculationResult>,
    FundingCalculationHistoryRecord,
)> {
    let output = compute_funding(loan, input)?;
    let record = store.append(application_id, input, &output.result, created_by, now)?;
    Ok((output, record))
}

/// Human-readable note describing a calculation, for the caller to attach to
/// the application's activity feed.
pub fn summary_note(loan: &LoanTerms, result: &FundingCalculationResult) -> String {
    format!(
        "Funding calculated on loan of {}: total fees {}, funds available {}",
        loan.loan_amount, result.total_fees, result.funds_available
    )
}
