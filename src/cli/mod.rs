use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod convert;
mod group;

/// mzgroup - Extract annotated spectra from MassIVE files into MGF
#[derive(Parser)]
#[command(name = "mzgroup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert the scans listed in one manifest group to MGF
    Convert {
        /// Tab-separated manifest (filename, scan, annotation, optional charge)
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Directory holding the failure log directory
        #[arg(long, env = "PIPELINE_DIR", value_name = "DIR")]
        pipeline_dir: Option<PathBuf>,

        /// Task id used to name the failure log directory
        #[arg(long, env = "TASK_ID")]
        task_id: Option<String>,

        /// Directory downloaded files are written to
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,

        /// Archive FTP host
        #[arg(long)]
        host: Option<String>,
    },

    /// Split a large TSV into one manifest per value of a column
    Group {
        /// Input TSV file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Column to group by
        #[arg(value_name = "COLUMN")]
        column: String,

        /// Directory for the group_<value>.tsv files
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Convert {
            manifest,
            config,
            pipeline_dir,
            task_id,
            download_dir,
            host,
        } => convert::run(manifest, config, pipeline_dir, task_id, download_dir, host),
        Commands::Group {
            input,
            column,
            output_dir,
        } => group::run(input, column, output_dir),
    }
}

/// Print the final one-line status
fn print_status(success: bool, message: &str) {
    #[cfg(feature = "colorized_output")]
    {
        use console::style;
        let tag = if success {
            style("OK").green().bold()
        } else {
            style("FAILED").red().bold()
        };
        println!("{tag} {message}");
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        let tag = if success { "OK" } else { "FAILED" };
        println!("{tag} {message}");
    }
}
