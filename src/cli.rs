use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "nse-history")]
#[command(about = "Download historical NSE equity and derivatives data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for cached chunk responses
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Concurrent chunk requests
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Fetch chunks one by one behind a progress bar
    #[arg(long, global = true, conflicts_with = "no_progress")]
    pub progress: bool,

    /// Fetch with the worker pool instead of the sequential progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,
}

impl Cli {
    /// Progress setting requested on the command line, if any.
    pub fn progress_override(&self) -> Option<bool> {
        match (self.progress, self.no_progress) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Equity price history for one symbol
    Stock {
        #[arg(short, long)]
        symbol: String,

        /// First trading date, YYYY-MM-DD
        #[arg(short, long)]
        from: NaiveDate,

        /// Last trading date, YYYY-MM-DD
        #[arg(short, long)]
        to: NaiveDate,

        #[arg(long, default_value = "EQ")]
        series: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// CSV path; defaults to SYMBOL-FROM-TO-SERIES.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Futures and options history for one contract
    Derivatives {
        #[arg(short, long)]
        symbol: String,

        #[arg(short, long)]
        from: NaiveDate,

        #[arg(short, long)]
        to: NaiveDate,

        /// Contract expiry, YYYY-MM-DD
        #[arg(long)]
        expiry: NaiveDate,

        /// OPTIDX, OPTSTK, FUTIDX or FUTSTK
        #[arg(long)]
        instrument: String,

        /// Required for options
        #[arg(long)]
        strike: Option<f64>,

        /// CE or PE, required for options
        #[arg(long)]
        option_type: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
