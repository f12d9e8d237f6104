//! Repayment schedule generation, persistence, and payment recording.

pub mod dates;
pub mod generator;
pub mod payments;
pub mod store;

use chrono::NaiveDate;

pub use generator::{
    generate_schedule, EscalationFlag, InstallmentStatus, RepaymentInstallment,
};
pub use payments::apply_payment;
pub use store::{InMemoryInstallmentStore, InstallmentStore, ScheduleSnapshot};

use crate::types::{ApplicationId, ComputationOutput, LoanTerms};
use crate::FundingResult;

/// Generate a fresh schedule for the loan terms and transactionally replace
/// the application's existing one.
///
/// Installments already `Paid` are preserved; everything else is swapped out
/// atomically. A concurrent regeneration surfaces as
/// [`crate::FundingError::ScheduleRegenerationConflict`] and the caller
/// should retry against the new version.
pub fn regenerate_schedule(
    store: &dyn InstallmentStore,
    application_id: ApplicationId,
    loan: &LoanTerms,
    today: NaiveDate,
) -> FundingResult<ComputationOutput<Vec<RepaymentInstallment>>> {
    let expected_version = store.schedule_version(application_id)?;
    let mut output = generate_schedule(application_id, loan, today)?;
    output.result = store.replace_schedule(application_id, expected_version, output.result)?;
    Ok(output)
}
