mod cli;

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Commands, OutputFormat};
use nse_history::config::Settings;
use nse_history::{DerivativesContract, NseHistory, Record};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    let client = NseHistory::from_settings(&settings)
        .context("Failed to set up NSE history client")?;

    match cli.command {
        Commands::Stock {
            ref symbol,
            from,
            to,
            ref series,
            format,
            ref output,
        } => match format {
            OutputFormat::Csv => {
                let path = client
                    .stock_csv(symbol, from, to, series, output.as_deref())
                    .await
                    .with_context(|| format!("Failed to export {symbol} history"))?;
                println!("{}", path.display());
            }
            OutputFormat::Json => {
                let records = client
                    .stock_raw(symbol, from, to, series)
                    .await
                    .with_context(|| format!("Failed to fetch {symbol} history"))?;
                print_json(&records)?;
            }
        },
        Commands::Derivatives {
            ref symbol,
            from,
            to,
            expiry,
            ref instrument,
            strike,
            ref option_type,
            format,
            ref output,
        } => {
            let contract =
                DerivativesContract::parse(expiry, instrument, strike, option_type.as_deref())?;
            match format {
                OutputFormat::Csv => {
                    let path = client
                        .derivatives_csv(symbol, from, to, &contract, output.as_deref())
                        .await
                        .with_context(|| format!("Failed to export {symbol} {instrument} history"))?;
                    println!("{}", path.display());
                }
                OutputFormat::Json => {
                    let records = client
                        .derivatives_raw(symbol, from, to, &contract)
                        .await
                        .with_context(|| format!("Failed to fetch {symbol} {instrument} history"))?;
                    print_json(&records)?;
                }
            }
        }
    }

    Ok(())
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::resolve(cli.config.as_deref()).context("Failed to load settings")?;

    if let Some(dir) = &cli.cache_dir {
        settings.cache_dir = Some(dir.clone());
    }
    if let Some(workers) = cli.workers {
        settings.workers = workers;
    }
    if let Some(show_progress) = cli.progress_override() {
        settings.show_progress = show_progress;
    }

    nse_history::config::validate_settings(&settings)?;
    log::debug!(
        "Using cache at {}",
        settings.resolved_cache_dir().display()
    );
    Ok(settings)
}

fn print_json(records: &[Record]) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, records)?;
    writeln!(out)?;
    Ok(())
}
