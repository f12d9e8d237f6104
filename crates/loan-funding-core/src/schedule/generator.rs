//! Amortized repayment schedule generation.
//!
//! Produces the ordered installment sequence for a loan's terms using the
//! standard annuity formula, with the rounding residue absorbed by the final
//! installment so the schedule sums to the exact total to the cent. Only
//! monthly repayment has a defined amortization algorithm; other frequencies
//! are rejected until specified.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::FundingError;
use crate::rounding::{pct, round_currency, MONTHS_PER_YEAR};
use crate::schedule::dates::add_months_clamped;
use crate::types::{
    validate_loan_terms, with_metadata, ApplicationId, ComputationOutput, InstallmentId, LoanTerms,
    Money, RepaymentFrequency,
};
use crate::FundingResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Persisted state of an installment.
///
/// `Missed` is display-only: it is derived from "past due and unpaid" by
/// [`RepaymentInstallment::effective_status`] and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    Scheduled,
    Paid,
    Partial,
    Missed,
}

/// The four escalation latches carried by an installment, one per milestone.
///
/// Each is a one-way boolean: once set it permanently suppresses re-firing of
/// the corresponding notification for that installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationFlag {
    ReminderSent,
    Overdue3DaySent,
    Overdue7DaySent,
    Overdue10DaySent,
}

/// One scheduled repayment of a loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentInstallment {
    /// Assigned by the store; zero until the schedule is persisted.
    pub installment_id: InstallmentId,
    pub application_id: ApplicationId,
    /// 1..=loan_term, unique per application.
    pub sequence_no: u32,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<NaiveDate>,
    /// Cumulative amount received against this installment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<Money>,
    pub reminder_sent: bool,
    pub overdue_3_day_sent: bool,
    pub overdue_7_day_sent: bool,
    pub overdue_10_day_sent: bool,
}

impl RepaymentInstallment {
    /// Status for display, deriving `Missed` for past-due unpaid installments.
    pub fn effective_status(&self, today: NaiveDate) -> InstallmentStatus {
        if self.status == InstallmentStatus::Scheduled && self.due_date < today {
            InstallmentStatus::Missed
        } else {
            self.status
        }
    }

    /// Whether the installment is still in play for the lifecycle tracker.
    pub fn is_terminal(&self) -> bool {
        self.status == InstallmentStatus::Paid
    }

    pub fn flag(&self, flag: EscalationFlag) -> bool {
        match flag {
            EscalationFlag::ReminderSent => self.reminder_sent,
            EscalationFlag::Overdue3DaySent => self.overdue_3_day_sent,
            EscalationFlag::Overdue7DaySent => self.overdue_7_day_sent,
            EscalationFlag::Overdue10DaySent => self.overdue_10_day_sent,
        }
    }

    pub fn set_flag(&mut self, flag: EscalationFlag) {
        match flag {
            EscalationFlag::ReminderSent => self.reminder_sent = true,
            EscalationFlag::Overdue3DaySent => self.overdue_3_day_sent = true,
            EscalationFlag::Overdue7DaySent => self.overdue_7_day_sent = true,
            EscalationFlag::Overdue10DaySent => self.overdue_10_day_sent = true,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Generate the amortized repayment schedule for a loan.
///
/// Deterministic given the terms and the injected `today` (which anchors the
/// schedule when no settlement date has been estimated). Installments come
/// back without ids; the store assigns them on insert.
pub fn generate_schedule(
    application_id: ApplicationId,
    loan: &LoanTerms,
    today: NaiveDate,
) -> FundingResult<ComputationOutput<Vec<RepaymentInstallment>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_loan_terms(loan)?;

    if loan.repayment_frequency != RepaymentFrequency::Monthly {
        return Err(FundingError::InvalidLoanTerms {
            reason: format!(
                "{} repayment has no defined amortization algorithm",
                loan.repayment_frequency
            ),
        });
    }

    let principal = loan.loan_amount;
    let term = loan.loan_term;

    let monthly_rate = match loan.interest_rate {
        Some(rate) => pct(rate) / MONTHS_PER_YEAR,
        None => {
            warnings.push(
                "No interest rate on loan terms; generating a zero-interest schedule".to_string(),
            );
            Decimal::ZERO
        }
    };

    let payment = monthly_payment(principal, monthly_rate, term)?;
    let rounded_payment = round_currency(payment);

    // The schedule must sum to principal + total interest to the cent, so the
    // final installment absorbs the rounding residue.
    let exact_total = round_currency(payment * Decimal::from(term));
    let final_amount = exact_total - rounded_payment * Decimal::from(term - 1);
    if final_amount < Decimal::ZERO {
        return Err(FundingError::InvalidCalculationState {
            context: format!("Final installment absorbed a negative residue: {final_amount}"),
        });
    }

    let settlement = loan.settlement_date(today);
    let mut installments: Vec<RepaymentInstallment> = Vec::with_capacity(term as usize);

    for seq in 1..=term {
        let amount = if seq == term { final_amount } else { rounded_payment };
        installments.push(RepaymentInstallment {
            installment_id: 0,
            application_id,
            sequence_no: seq,
            amount,
            due_date: add_months_clamped(settlement, seq),
            status: InstallmentStatus::Scheduled,
            paid_date: None,
            payment_amount: None,
            reminder_sent: false,
            overdue_3_day_sent: false,
            overdue_7_day_sent: false,
            overdue_10_day_sent: false,
        });
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly Amortized Repayment Schedule — annuity payment, residue on final installment",
        &serde_json::json!({
            "application_id": application_id,
            "principal": principal.to_string(),
            "term_months": term,
            "monthly_rate": monthly_rate.to_string(),
            "settlement_date": settlement.to_string(),
        }),
        warnings,
        elapsed,
        installments,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Level payment for the annuity: P * r * (1+r)^n / ((1+r)^n - 1), or simple
/// division when the rate is zero.
fn monthly_payment(principal: Money, monthly_rate: Decimal, term: u32) -> FundingResult<Money> {
    if monthly_rate.is_zero() {
        return Ok(principal / Decimal::from(term));
    }

    let factor = (Decimal::ONE + monthly_rate).powd(Decimal::from(term));
    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        return Err(FundingError::InvalidCalculationState {
            context: "Annuity denominator is zero".into(),
        });
    }

    Ok(principal * monthly_rate * factor / denominator)
}
