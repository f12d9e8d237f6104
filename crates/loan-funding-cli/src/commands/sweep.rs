use chrono::{Local, NaiveDate};
use clap::Args;
use serde_json::Value;
use tracing::info;

use loan_funding_core::escalation::{
    run_escalation_sweep, DispatchError, NotificationDispatcher, NotificationRequest,
};

use crate::state;

/// Arguments for the escalation sweep
#[derive(Args)]
pub struct SweepArgs {
    /// Schedule state file holding the installments to sweep
    #[arg(long)]
    pub state: String,

    /// Reference date for the sweep; defaults to the current date
    #[arg(long)]
    pub today: Option<NaiveDate>,
}

/// Dispatcher used by the CLI sweep. Delivery transport is handled by the
/// surrounding platform; here every notification is emitted as a structured
/// log line.
struct LogDispatcher;

impl NotificationDispatcher for LogDispatcher {
    fn send(&self, request: &NotificationRequest) -> Result<(), DispatchError> {
        info!(
            audience = ?request.audience,
            application_id = request.application_id,
            title = %request.title,
            message = %request.message,
            "notification dispatched"
        );
        Ok(())
    }
}

pub fn run_sweep(args: SweepArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let store = state::load(&args.state)?;
    let report = run_escalation_sweep(&store, &LogDispatcher, today)?;
    state::save(&store, &args.state)?;

    Ok(serde_json::to_value(&report)?)
}
