//! Bill Splitter CLI
//!
//! Reads a scanned receipt (the OCR service's JSON payload) and a CSV of
//! commands, then prints what each person owes as CSV.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- receipt.json commands.csv > split.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity
//! - `SPLITTER_*`: Override configuration keys, e.g. `SPLITTER_CURRENCY_SYMBOL`

use bill_splitter::command::advance_to_assigning;
use bill_splitter::{
    load_configuration, process_commands, write_csv, RawReceipt, Result, ScanStatus, Session,
    SplitError,
};
use log::info;
use std::env;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        return Err(SplitError::MissingArgument);
    }

    let mut session = Session::new(load_configuration(None)?);

    let payload = fs::read_to_string(&args[1])?;
    let ticket = session.on_scan_start();
    let outcome = RawReceipt::from_json(&payload)
        .map_err(|e| format!("Could not read scan result: {}", e));
    session.on_scan_complete(ticket, outcome);
    if let ScanStatus::Failed(_) | ScanStatus::NoData = session.scan_status() {
        eprintln!("{}", session.scan_status().message());
    }

    let commands = BufReader::new(File::open(&args[2])?);
    process_commands(&mut session, commands)?;

    if session.result().is_none() {
        info!("Calculating split after last command");
        advance_to_assigning(&mut session)?;
        session.calculate()?;
    }

    let stdout = io::stdout();
    let handle = stdout.lock();
    if let Some(result) = session.result() {
        write_csv(result, &session.config().currency_symbol, handle)?;
    }

    Ok(())
}
