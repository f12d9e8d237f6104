use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use loan_funding_core::funding::{compute_funding, summary_note, FundingCalculationInput};
use loan_funding_core::{LoanTerms, RepaymentFrequency};

use crate::input;

/// Combined file input: the loan terms plus the funding parameters.
#[derive(Deserialize)]
struct ComputeFundingFile {
    loan: LoanTerms,
    funding: FundingCalculationInput,
}

/// Arguments for the funding fee calculation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct FundingArgs {
    /// Path to JSON input file with "loan" and "funding" objects (overrides
    /// individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub loan_amount: Option<Decimal>,

    /// Loan term in months
    #[arg(long)]
    pub loan_term: Option<u32>,

    /// Annual interest rate as a percentage
    #[arg(long)]
    pub interest_rate: Option<Decimal>,

    /// Establishment fee rate (% of principal)
    #[arg(long)]
    pub establishment_fee_rate: Option<Decimal>,

    /// Monthly line fee rate (% of principal)
    #[arg(long)]
    pub monthly_line_fee_rate: Option<Decimal>,

    /// Brokerage fee rate (% of principal)
    #[arg(long)]
    pub brokerage_fee_rate: Option<Decimal>,

    /// Months of interest capped into the loan
    #[arg(long, default_value_t = 9)]
    pub capped_interest_months: u32,

    /// Application fee
    #[arg(long)]
    pub application_fee: Option<Decimal>,

    /// Due diligence fee
    #[arg(long)]
    pub due_diligence_fee: Option<Decimal>,

    /// Legal fee before GST
    #[arg(long)]
    pub legal_fee_before_gst: Option<Decimal>,

    /// Valuation fee
    #[arg(long)]
    pub valuation_fee: Option<Decimal>,

    /// Monthly account fee
    #[arg(long)]
    pub monthly_account_fee: Option<Decimal>,

    /// Working fee
    #[arg(long, default_value = "0")]
    pub working_fee: Decimal,
}

pub fn run_compute_funding(args: FundingArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (loan, funding) = if let Some(ref path) = args.input {
        let file: ComputeFundingFile = input::file::read_json(path)?;
        (file.loan, file.funding)
    } else if let Some(data) = input::stdin::read_stdin()? {
        let file: ComputeFundingFile = serde_json::from_value(data)?;
        (file.loan, file.funding)
    } else {
        let loan = LoanTerms {
            loan_amount: args.loan_amount
                .ok_or("--loan-amount is required (or provide --input)")?,
            loan_term: args.loan_term
                .ok_or("--loan-term is required (or provide --input)")?,
            interest_rate: args.interest_rate,
            repayment_frequency: RepaymentFrequency::Monthly,
            estimated_settlement_date: None,
        };
        let funding = FundingCalculationInput {
            establishment_fee_rate: args.establishment_fee_rate
                .ok_or("--establishment-fee-rate is required (or provide --input)")?,
            monthly_line_fee_rate: args.monthly_line_fee_rate
                .ok_or("--monthly-line-fee-rate is required (or provide --input)")?,
            brokerage_fee_rate: args.brokerage_fee_rate
                .ok_or("--brokerage-fee-rate is required (or provide --input)")?,
            capped_interest_months: args.capped_interest_months,
            application_fee: args.application_fee
                .ok_or("--application-fee is required (or provide --input)")?,
            due_diligence_fee: args.due_diligence_fee
                .ok_or("--due-diligence-fee is required (or provide --input)")?,
            legal_fee_before_gst: args.legal_fee_before_gst
                .ok_or("--legal-fee-before-gst is required (or provide --input)")?,
            valuation_fee: args.valuation_fee
                .ok_or("--valuation-fee is required (or provide --input)")?,
            monthly_account_fee: args.monthly_account_fee
                .ok_or("--monthly-account-fee is required (or provide --input)")?,
            working_fee: args.working_fee,
        };
        (loan, funding)
    };

    let output = compute_funding(&loan, &funding)?;
    let note = summary_note(&loan, &output.result);

    let mut value = serde_json::to_value(&output)?;
    if let Some(map) = value.as_object_mut() {
        map.insert("note".to_string(), Value::String(note));
    }
    Ok(value)
}
