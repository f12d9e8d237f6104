use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FundingError;
use crate::FundingResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as percentages of the principal (1.5 = 1.5%).
pub type Rate = Decimal;

/// Identifier of a loan application (the owning aggregate).
pub type ApplicationId = u64;

/// Identifier of a single repayment installment, assigned by the store.
pub type InstallmentId = u64;

/// Identifier of a funding calculation history record, assigned by the store.
pub type RecordId = u64;

/// How often repayments fall due.
///
/// Only `Monthly` currently has an amortization algorithm; the other
/// frequencies are carried so loan terms round-trip, and are rejected by the
/// schedule generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepaymentFrequency {
    Weekly,
    Fortnightly,
    Monthly,
    Quarterly,
    Annually,
}

impl std::fmt::Display for RepaymentFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RepaymentFrequency::Weekly => "weekly",
            RepaymentFrequency::Fortnightly => "fortnightly",
            RepaymentFrequency::Monthly => "monthly",
            RepaymentFrequency::Quarterly => "quarterly",
            RepaymentFrequency::Annually => "annually",
        };
        f.write_str(label)
    }
}

/// Commercial terms of a loan, owned by the application aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Principal amount, must be positive.
    pub loan_amount: Money,
    /// Term in months, at least 1.
    pub loan_term: u32,
    /// Annual interest rate as a percentage (0–100), if agreed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<Rate>,
    pub repayment_frequency: RepaymentFrequency,
    /// Expected settlement date; falls back to the injected "today".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_settlement_date: Option<NaiveDate>,
}

impl LoanTerms {
    /// The settlement date the schedule anchors to.
    pub fn settlement_date(&self, today: NaiveDate) -> NaiveDate {
        self.estimated_settlement_date.unwrap_or(today)
    }
}

/// Shared validation of loan terms, applied before any computation.
pub fn validate_loan_terms(loan: &LoanTerms) -> FundingResult<()> {
    if loan.loan_amount <= Decimal::ZERO {
        return Err(FundingError::InvalidLoanTerms {
            reason: "Loan amount must be positive".into(),
        });
    }
    if loan.loan_term == 0 {
        return Err(FundingError::InvalidLoanTerms {
            reason: "Loan term must be at least 1 month".into(),
        });
    }
    if let Some(rate) = loan.interest_rate {
        if rate < Decimal::ZERO || rate > dec!(100) {
            return Err(FundingError::InvalidInput {
                field: "interest_rate".into(),
                reason: "Interest rate must be between 0 and 100 percent".into(),
            });
        }
    }
    Ok(())
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn monthly_loan() -> LoanTerms {
        LoanTerms {
            loan_amount: dec!(500_000),
            loan_term: 12,
            interest_rate: Some(dec!(9.5)),
            repayment_frequency: RepaymentFrequency::Monthly,
            estimated_settlement_date: None,
        }
    }

    #[test]
    fn test_validate_accepts_sound_terms() {
        assert!(validate_loan_terms(&monthly_loan()).is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_principal() {
        let mut loan = monthly_loan();
        loan.loan_amount = Decimal::ZERO;
        assert!(matches!(
            validate_loan_terms(&loan),
            Err(FundingError::InvalidLoanTerms { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_term() {
        let mut loan = monthly_loan();
        loan.loan_term = 0;
        assert!(matches!(
            validate_loan_terms(&loan),
            Err(FundingError::InvalidLoanTerms { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_rate_above_100() {
        let mut loan = monthly_loan();
        loan.interest_rate = Some(dec!(120));
        assert!(matches!(
            validate_loan_terms(&loan),
            Err(FundingError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_settlement_date_falls_back_to_today() {
        let loan = monthly_loan();
        let today = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(loan.settlement_date(today), today);
    }
}
