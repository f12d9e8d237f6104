//! Funding fee calculation engine.
//!
//! Derives the full fee breakdown and "funds available" figure for a loan
//! from its manually entered funding parameters. Pure computation: no I/O,
//! no persistence, deterministic for a given `(LoanTerms, input)` pair.
//! All math uses `rust_decimal::Decimal`; every component is rounded half-up
//! to 2 places as it is derived.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::FundingError;
use crate::rounding::{pct, round_currency, MONTHS_PER_YEAR};
use crate::types::{validate_loan_terms, with_metadata, ComputationOutput, LoanTerms, Money, Rate};
use crate::FundingResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// GST uplift applied to the pre-GST legal fee (10%).
const GST_MULTIPLIER: Decimal = dec!(1.10);

const DEFAULT_CAPPED_INTEREST_MONTHS: u32 = 9;

// ---------------------------------------------------------------------------
// Input / Output Types
// ---------------------------------------------------------------------------

/// Manually entered funding parameters for one calculation.
///
/// A transient request value object: never mutated after construction, and
/// snapshotted verbatim into the audit trail next to its result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingCalculationInput {
    /// Establishment fee as a percentage of the principal.
    pub establishment_fee_rate: Rate,
    /// Monthly line fee as a percentage of the principal.
    pub monthly_line_fee_rate: Rate,
    /// Brokerage fee as a percentage of the principal.
    pub brokerage_fee_rate: Rate,
    /// Months of interest pre-funded into the loan. Defaults to 9.
    #[serde(default = "default_capped_interest_months")]
    pub capped_interest_months: u32,
    pub application_fee: Money,
    pub due_diligence_fee: Money,
    /// Legal fee before the 10% GST uplift.
    pub legal_fee_before_gst: Money,
    pub valuation_fee: Money,
    pub monthly_account_fee: Money,
    /// Optional working fee, defaults to zero.
    #[serde(default)]
    pub working_fee: Money,
}

fn default_capped_interest_months() -> u32 {
    DEFAULT_CAPPED_INTEREST_MONTHS
}

/// Full fee breakdown derived from a `FundingCalculationInput`.
///
/// Pure derivation with no identity of its own; it is only ever produced and
/// stored together with the input that generated it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingCalculationResult {
    pub establishment_fee: Money,
    /// Interest pre-funded for the capped period.
    pub capped_interest: Money,
    /// Monthly line fee rate applied across the full term.
    pub line_fee: Money,
    pub brokerage_fee: Money,
    /// Legal fee inclusive of GST.
    pub legal_fee: Money,
    pub application_fee: Money,
    pub due_diligence_fee: Money,
    pub valuation_fee: Money,
    pub monthly_account_fee: Money,
    pub working_fee: Money,
    /// Sum of the ten fee components above.
    pub total_fees: Money,
    /// Net amount disbursed to the borrower: principal minus total fees.
    pub funds_available: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute the fee breakdown and funds available for a loan.
///
/// Fails fast with a typed error and no partial result: missing interest rate
/// when capped interest is required, invalid loan terms, or negative inputs
/// are all rejected before any component is derived.
pub fn compute_funding(
    loan: &LoanTerms,
    input: &FundingCalculationInput,
) -> FundingResult<ComputationOutput<FundingCalculationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_loan_terms(loan)?;
    validate_funding_input(input)?;

    let principal = loan.loan_amount;

    let establishment_fee = round_currency(principal * pct(input.establishment_fee_rate));

    // Capped interest requires an agreed rate; absence is an error here, not
    // a silent zero.
    let interest_rate = loan
        .interest_rate
        .ok_or_else(|| FundingError::MissingRequiredField {
            field: "interest_rate".into(),
        })?;
    let capped_years = Decimal::from(input.capped_interest_months) / MONTHS_PER_YEAR;
    let capped_interest = round_currency(principal * pct(interest_rate) * capped_years);

    let line_fee = round_currency(
        principal * pct(input.monthly_line_fee_rate) * Decimal::from(loan.loan_term),
    );

    let brokerage_fee = round_currency(principal * pct(input.brokerage_fee_rate));

    let legal_fee = round_currency(input.legal_fee_before_gst * GST_MULTIPLIER);

    // Pass-through fees, normalised to currency precision.
    let application_fee = round_currency(input.application_fee);
    let due_diligence_fee = round_currency(input.due_diligence_fee);
    let valuation_fee = round_currency(input.valuation_fee);
    let monthly_account_fee = round_currency(input.monthly_account_fee);
    let working_fee = round_currency(input.working_fee);

    let components: [(&str, Money); 10] = [
        ("establishment_fee", establishment_fee),
        ("capped_interest", capped_interest),
        ("line_fee", line_fee),
        ("brokerage_fee", brokerage_fee),
        ("legal_fee", legal_fee),
        ("application_fee", application_fee),
        ("due_diligence_fee", due_diligence_fee),
        ("valuation_fee", valuation_fee),
        ("monthly_account_fee", monthly_account_fee),
        ("working_fee", working_fee),
    ];

    // Validated inputs cannot produce a negative fee; treat one as a defect
    // rather than clamping it away.
    for (name, fee) in &components {
        if *fee < Decimal::ZERO {
            return Err(FundingError::InvalidCalculationState {
                context: format!("Computed {name} is negative: {fee}"),
            });
        }
    }

    let total_fees = round_currency(components.iter().map(|(_, fee)| *fee).sum::<Decimal>());
    let funds_available = principal - total_fees;

    if funds_available < Decimal::ZERO {
        warnings.push(format!(
            "Total fees {total_fees} exceed the loan amount {principal}; funds available is negative"
        ));
    }

    let result = FundingCalculationResult {
        establishment_fee,
        capped_interest,
        line_fee,
        brokerage_fee,
        legal_fee,
        application_fee,
        due_diligence_fee,
        valuation_fee,
        monthly_account_fee,
        working_fee,
        total_fees,
        funds_available,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Funding Fee Breakdown — per-component half-up rounding, funds available net of fees",
        &serde_json::json!({
            "loan_amount": principal.to_string(),
            "loan_term": loan.loan_term,
            "interest_rate": interest_rate.to_string(),
            "capped_interest_months": input.capped_interest_months,
            "gst_multiplier": GST_MULTIPLIER.to_string(),
        }),
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_funding_input(input: &FundingCalculationInput) -> FundingResult<()> {
    let rates: [(&str, Rate); 3] = [
        ("establishment_fee_rate", input.establishment_fee_rate),
        ("monthly_line_fee_rate", input.monthly_line_fee_rate),
        ("brokerage_fee_rate", input.brokerage_fee_rate),
    ];
    for (field, rate) in rates {
        if rate < Decimal::ZERO {
            return Err(FundingError::InvalidInput {
                field: field.into(),
                reason: "Fee rate must not be negative".into(),
            });
        }
    }

    if input.capped_interest_months == 0 {
        return Err(FundingError::InvalidInput {
            field: "capped_interest_months".into(),
            reason: "Capped interest period must be at least 1 month".into(),
        });
    }

    let fees: [(&str, Money); 6] = [
        ("application_fee", input.application_fee),
        ("due_diligence_fee", input.due_diligence_fee),
        ("legal_fee_before_gst", input.legal_fee_before_gst),
        ("valuation_fee", input.valuation_fee),
        ("monthly_account_fee", input.monthly_account_fee),
        ("working_fee", input.working_fee),
    ];
    for (field, fee) in fees {
        if fee < Decimal::ZERO {
            return Err(FundingError::InvalidInput {
                field: field.into(),
                reason: "Fee amount must not be negative".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
