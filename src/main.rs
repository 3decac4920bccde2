//! # mzgroup
//!
//! Command-line front end for converting MassIVE manifest groups to MGF.
//!
//! ## Usage
//!
//! ```bash
//! # Convert one manifest group
//! PIPELINE_DIR=/pipeline TASK_ID=7 mzgroup convert group_run1.tsv
//!
//! # Split a large TSV into per-file manifests
//! mzgroup group all_psms.tsv filename --output-dir groups/
//! ```

use clap::Parser;
use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());

    match cli::dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
