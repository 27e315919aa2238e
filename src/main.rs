use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{Parser, ValueEnum};
use ledger_rollup::{
    balance_sheet_file_name, balance_sheet_markdown, due_reports, income_statement_file_name,
    income_statement_markdown, load_csv_files, load_csv_glob, parse_iso_date,
    previous_period_window, write_balance_sheet_csv, write_income_statement_csv, Granularity,
    LedgerRollup, LedgerRollupError, NormalizedBatch, RollupConfig, RollupOptions, RollupReport,
};
use log::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PeriodArg {
    Monthly,
    Quarterly,
    Annual,
}

impl From<PeriodArg> for Granularity {
    fn from(value: PeriodArg) -> Self {
        match value {
            PeriodArg::Monthly => Granularity::Monthly,
            PeriodArg::Quarterly => Granularity::Quarterly,
            PeriodArg::Annual => Granularity::Annual,
        }
    }
}

fn parse_cli_date(value: &str) -> Result<NaiveDate, String> {
    parse_iso_date(value).map_err(|e| e.to_string())
}

/// Roll transaction exports up into income statements and a balance sheet.
#[derive(Debug, Parser)]
#[command(name = "ledger-rollup", version)]
struct Cli {
    /// JSON configuration with rules, account mapping and opening balances.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    #[arg(long, value_enum, default_value_t = PeriodArg::Monthly)]
    period: PeriodArg,

    /// First date included in the statements (YYYY-MM-DD).
    #[arg(long, value_parser = parse_cli_date)]
    start: Option<NaiveDate>,

    /// Last date included in the statements (YYYY-MM-DD).
    #[arg(long, value_parser = parse_cli_date)]
    end: Option<NaiveDate>,

    /// Balance sheet date. Defaults to --end, then today.
    #[arg(long, value_parser = parse_cli_date)]
    as_of: Option<NaiveDate>,

    #[arg(long, default_value = "output")]
    outdir: PathBuf,

    /// Produce whichever monthly/quarterly/annual reports closed the day before
    /// --run-date, ignoring --period/--start/--end/--as-of.
    #[arg(long)]
    scheduled: bool,

    /// Date the scheduled run pretends to execute on. Defaults to today.
    #[arg(long, value_parser = parse_cli_date, requires = "scheduled")]
    run_date: Option<NaiveDate>,

    /// Exit non-zero when Assets and Liabilities + Equity disagree.
    #[arg(long)]
    strict: bool,

    /// Transaction files to read instead of the configured csv_glob.
    inputs: Vec<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(LedgerRollupError::NoTransactions(details)) => {
            info!("Nothing to report: {}", details);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(1)
        }
    }
}

fn load_batch(cli: &Cli, config: &RollupConfig) -> ledger_rollup::Result<NormalizedBatch> {
    if !cli.inputs.is_empty() {
        return load_csv_files(cli.inputs.as_slice());
    }

    match config.datasource.csv_glob.as_deref() {
        Some(pattern) => load_csv_glob(pattern),
        None => Err(LedgerRollupError::ValidationError {
            section: "datasource".to_string(),
            details: "no input files given and no csv_glob configured".to_string(),
        }),
    }
}

fn run(cli: &Cli) -> ledger_rollup::Result<ExitCode> {
    let config = RollupConfig::load(&cli.config)?;
    let batch = load_batch(cli, &config)?;
    fs::create_dir_all(&cli.outdir)?;

    let rollup = LedgerRollup::new(&config);
    let today = Local::now().date_naive();

    let jobs = if cli.scheduled {
        let run_date = cli.run_date.unwrap_or(today);
        let mut jobs = Vec::new();
        for granularity in due_reports(run_date) {
            let (start, end) = previous_period_window(run_date, granularity)?;
            jobs.push(RollupOptions::new(granularity, end).with_range(Some(start), Some(end)));
        }
        if jobs.is_empty() {
            info!("No reports due on {}", run_date);
        }
        jobs
    } else {
        let as_of = cli.as_of.or(cli.end).unwrap_or(today);
        vec![RollupOptions::new(cli.period.into(), as_of).with_range(cli.start, cli.end)]
    };

    let mut balanced = true;
    for options in &jobs {
        let report = rollup.run(batch.clone(), options)?;
        write_outputs(&cli.outdir, options, &report)?;
        balanced &= report.verification.balanced;
    }

    if cli.strict && !balanced {
        error!("Balance sheet does not balance and --strict was given");
        return Ok(ExitCode::from(2));
    }

    Ok(ExitCode::SUCCESS)
}

fn window_label(options: &RollupOptions) -> String {
    let bound = |date: Option<NaiveDate>, open: &str| {
        date.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| open.to_string())
    };
    format!(
        "{} {} to {}",
        options.granularity,
        bound(options.start, "start"),
        bound(options.end, "end")
    )
}

fn write_outputs(
    outdir: &Path,
    options: &RollupOptions,
    report: &RollupReport,
) -> ledger_rollup::Result<()> {
    let label = window_label(options);

    let income_path = outdir.join(income_statement_file_name(
        options.granularity,
        options.start,
        options.end,
    ));
    write_income_statement_csv(File::create(&income_path)?, &report.income_statement)?;

    let balance_path = outdir.join(balance_sheet_file_name(&report.balance_sheet));
    write_balance_sheet_csv(File::create(&balance_path)?, &report.balance_sheet)?;

    println!(
        "{}",
        income_statement_markdown(&report.company, &label, &report.income_statement)
    );
    println!(
        "{}",
        balance_sheet_markdown(&report.company, &report.balance_sheet)
    );

    info!(
        "Generated {} and {} ({} transactions, {} rows rejected)",
        income_path.display(),
        balance_path.display(),
        report.transactions_used,
        report.rows_rejected
    );

    Ok(())
}
