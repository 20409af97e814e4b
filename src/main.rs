mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::Cli;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use mailprobe_core::core::config::{find_config_file, load_config_file};
use mailprobe_core::{ConfigBuilder, ValidationEngine, ValidationOptions, ValidationResult};
use std::fs;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut builder = ConfigBuilder::new();
    if let Some(path) = find_config_file(cli.config.as_deref())? {
        let file = load_config_file(&path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        builder = builder.with_file(file, Some(path.display().to_string()));
    }
    let config = builder
        .smtp_timeout(cli.smtp_timeout)
        .smtp_sender_email(cli.sender.clone())
        .max_concurrency(cli.concurrency)
        .disposable_domains_path(cli.disposable_list.clone())
        .build()?;
    tracing::debug!("Effective configuration: {:?}", config);

    let addresses = read_addresses(&cli)?;
    if addresses.is_empty() {
        bail!("No email addresses given. Pass them as arguments or use --input.");
    }

    let engine = ValidationEngine::new(config)?;
    let options = ValidationOptions {
        check_smtp: cli.smtp,
    };

    let progress = (addresses.len() > 1).then(|| progress_bar(addresses.len() as u64));
    let mut results: Vec<ValidationResult> = Vec::with_capacity(addresses.len());
    let mut stream = Box::pin(engine.validate_stream(addresses, options));
    while let Some(result) = stream.next().await {
        results.push(result?);
        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }
    if let Some(bar) = progress {
        bar.finish_with_message("done");
    }

    let json = if results.len() == 1 {
        serde_json::to_string_pretty(&results[0])?
    } else {
        serde_json::to_string_pretty(&results)?
    };

    match &cli.output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write results to {}", path.display()))?;
            tracing::info!("Wrote {} results to {}", results.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,syntax=debug,dns_task=debug,disposable=debug,smtp_task=debug,scoring=debug,engine=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn read_addresses(cli: &Cli) -> Result<Vec<String>> {
    let mut addresses = cli.addresses.clone();
    if let Some(path) = &cli.input {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?;
        addresses.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string),
        );
    }
    Ok(addresses)
}

fn progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .unwrap_or_else(|e| {
            eprintln!("Failed to create progress bar template: {}", e);
            ProgressStyle::default_bar()
        })
        .progress_chars("=>-");
    bar.set_style(style);
    bar.set_message("Validating");
    bar
}
