use chrono::{Local, NaiveDate};
use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use loan_funding_core::schedule::{generate_schedule, regenerate_schedule, InstallmentStore};
use loan_funding_core::{ApplicationId, InstallmentId, LoanTerms, RepaymentFrequency};

use crate::input;
use crate::state;

/// File input for schedule generation.
#[derive(Deserialize)]
struct ScheduleFile {
    application_id: ApplicationId,
    loan: LoanTerms,
}

/// Arguments for schedule generation
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON input file with "application_id" and "loan" (overrides
    /// individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Application the schedule belongs to
    #[arg(long)]
    pub application_id: Option<ApplicationId>,

    /// Loan principal
    #[arg(long)]
    pub loan_amount: Option<Decimal>,

    /// Loan term in months
    #[arg(long)]
    pub loan_term: Option<u32>,

    /// Annual interest rate as a percentage
    #[arg(long)]
    pub interest_rate: Option<Decimal>,

    /// Estimated settlement date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub settlement_date: Option<NaiveDate>,

    /// Reference date for generation; defaults to the current date
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Schedule state file to write the installments into. When the file
    /// already holds a schedule for the application it is replaced
    /// transactionally, preserving paid installments.
    #[arg(long)]
    pub state: Option<String>,
}

/// Arguments for listing an application's installments
#[derive(Args)]
pub struct InstallmentsArgs {
    /// Schedule state file to read
    #[arg(long)]
    pub state: String,

    /// Application whose installments to list
    #[arg(long)]
    pub application_id: ApplicationId,

    /// Reference date for the derived status; defaults to the current date
    #[arg(long)]
    pub today: Option<NaiveDate>,
}

/// Arguments for recording a payment
#[derive(Args)]
pub struct RecordPaymentArgs {
    /// Schedule state file holding the installment
    #[arg(long)]
    pub state: String,

    /// Installment to pay
    #[arg(long)]
    pub installment_id: InstallmentId,

    /// Amount received
    #[arg(long)]
    pub amount: Decimal,

    /// Date the payment was received; defaults to the current date
    #[arg(long)]
    pub paid_date: Option<NaiveDate>,
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (application_id, loan) = if let Some(ref path) = args.input {
        let file: ScheduleFile = input::file::read_json(path)?;
        (file.application_id, file.loan)
    } else if let Some(data) = input::stdin::read_stdin()? {
        let file: ScheduleFile = serde_json::from_value(data)?;
        (file.application_id, file.loan)
    } else {
        let loan = LoanTerms {
            loan_amount: args.loan_amount
                .ok_or("--loan-amount is required (or provide --input)")?,
            loan_term: args.loan_term
                .ok_or("--loan-term is required (or provide --input)")?,
            interest_rate: args.interest_rate,
            repayment_frequency: RepaymentFrequency::Monthly,
            estimated_settlement_date: args.settlement_date,
        };
        let application_id = args.application_id
            .ok_or("--application-id is required (or provide --input)")?;
        (application_id, loan)
    };

    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let output = match args.state {
        Some(ref path) => {
            let store = state::load_or_default(path)?;
            let output = regenerate_schedule(&store, application_id, &loan, today)?;
            state::save(&store, path)?;
            output
        }
        None => generate_schedule(application_id, &loan, today)?,
    };

    Ok(serde_json::to_value(&output)?)
}

pub fn run_installments(args: InstallmentsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let store = state::load(&args.state)?;
    let installments = store.for_application(args.application_id)?;

    // Past-due unpaid installments display as "missed" without that ever
    // being a persisted state.
    let rows: Vec<Value> = installments
        .iter()
        .map(|installment| {
            let mut row = serde_json::to_value(installment)?;
            if let Some(map) = row.as_object_mut() {
                map.insert(
                    "effective_status".to_string(),
                    serde_json::to_value(installment.effective_status(today))?,
                );
            }
            Ok(row)
        })
        .collect::<Result<_, serde_json::Error>>()?;

    Ok(Value::Array(rows))
}

pub fn run_record_payment(args: RecordPaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let paid_date = args.paid_date.unwrap_or_else(|| Local::now().date_naive());

    let store = state::load(&args.state)?;
    let installment = store.record_payment(args.installment_id, args.amount, paid_date)?;
    state::save(&store, &args.state)?;

    Ok(serde_json::to_value(&installment)?)
}
