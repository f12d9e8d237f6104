//! Payment application against a scheduled installment.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::FundingError;
use crate::schedule::generator::{InstallmentStatus, RepaymentInstallment};
use crate::types::Money;
use crate::FundingResult;

/// Apply a received payment to an installment.
///
/// Payments accumulate: the installment becomes `Paid` once the cumulative
/// amount covers the scheduled amount, `Partial` otherwise. Escalation flags
/// are never cleared; they remain historical fact.
pub fn apply_payment(
    installment: &mut RepaymentInstallment,
    paid_amount: Money,
    paid_date: NaiveDate,
) -> FundingResult<()> {
    if paid_amount <= Decimal::ZERO {
        return Err(FundingError::InvalidInput {
            field: "paid_amount".into(),
            reason: "Payment amount must be positive".into(),
        });
    }
    if installment.status == InstallmentStatus::Paid {
        return Err(FundingError::InvalidInput {
            field: "installment_id".into(),
            reason: format!("Installment {} is already paid", installment.installment_id),
        });
    }

    let total = installment.payment_amount.unwrap_or(Decimal::ZERO) + paid_amount;
    installment.payment_amount = Some(total);
    installment.paid_date = Some(paid_date);
    installment.status = if total >= installment.amount {
        InstallmentStatus::Paid
    } else {
        InstallmentStatus::Partial
    };
    Ok(())
}
