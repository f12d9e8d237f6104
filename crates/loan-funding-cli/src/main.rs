mod commands;
mod input;
mod output;
mod state;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::funding::FundingArgs;
use commands::schedule::{InstallmentsArgs, RecordPaymentArgs, ScheduleArgs};
use commands::sweep::SweepArgs;

/// Loan funding calculations and repayment lifecycle operations
#[derive(Parser)]
#[command(
    name = "lfe",
    version,
    about = "Loan funding calculations and repayment lifecycle operations",
    long_about = "A CLI for the loan funding engine: compute fee breakdowns and funds \
                  available with decimal precision, generate amortized repayment \
                  schedules, record payments, and run the daily escalation sweep."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the fee breakdown and funds available for a loan
    ComputeFunding(FundingArgs),
    /// Generate (or regenerate) the amortized repayment schedule
    Schedule(ScheduleArgs),
    /// List an application's installments with their derived status
    Installments(InstallmentsArgs),
    /// Record a payment against a scheduled installment
    RecordPayment(RecordPaymentArgs),
    /// Run the escalation sweep over a schedule state file
    Sweep(SweepArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::ComputeFunding(args) => commands::funding::run_compute_funding(args),
        Commands::Schedule(args) => commands::schedule::run_schedule(args),
        Commands::Installments(args) => commands::schedule::run_installments(args),
        Commands::RecordPayment(args) => commands::schedule::run_record_payment(args),
        Commands::Sweep(args) => commands::sweep::run_sweep(args),
        Commands::Version => {
            println!("lfe {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
