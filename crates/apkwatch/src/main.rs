mod batch;
mod cli;
mod logging;
mod report;
mod settings;

use std::process::ExitCode;

use apkwatch_core::{Fetcher, ResponseCache};
use apkwatch_platform::{AppPaths, AppPathsError};
use clap::Parser;
use log::{info, warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::batch::{BatchRequest, run_checks};
use crate::cli::{CheckArgs, Cli, Commands};
use crate::logging::LogOptions;
use crate::report::{AppSummary, CheckReport};
use crate::settings::Settings;

/// Conventional exit status after SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Paths(#[from] AppPathsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("apkwatch: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let paths = AppPaths::new()?;
    let (settings, settings_error) = Settings::load_or_default(&paths);
    logging::init_logging(
        &paths,
        LogOptions {
            debug_enabled: settings.debug_logging,
            verbose: cli.verbose,
            max_log_size: settings.max_log_size_bytes,
        },
    );
    if let Some(error) = settings_error {
        warn!("{error}; using default settings");
        eprintln!("apkwatch: {error}; using default settings");
    }

    match cli.command {
        Commands::List { json } => list(json),
        Commands::Check(args) => check(&args, &paths, &settings).await,
        Commands::Config { init } => config(init, &paths, &settings),
        Commands::ClearCache => {
            let cache = ResponseCache::new(paths.http_cache_dir(), settings.cache_ttl());
            let removed = cache.clear()?;
            info!("Removed {removed} cached responses");
            println!("Removed {removed} cached responses");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn list(json: bool) -> Result<ExitCode, CliError> {
    let summaries: Vec<AppSummary> = apkwatch_apps::registry::all()
        .iter()
        .map(AppSummary::from)
        .collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            println!("{}", report::list_line(summary));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn config(init: bool, paths: &AppPaths, settings: &Settings) -> Result<ExitCode, CliError> {
    let settings_file = paths.settings_file();
    if init {
        if settings_file.exists() {
            eprintln!("Settings file already exists: {}", settings_file.display());
        } else {
            Settings::default().save(paths)?;
            eprintln!("Wrote {}", settings_file.display());
        }
    }
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(ExitCode::SUCCESS)
}

async fn check(
    args: &CheckArgs,
    paths: &AppPaths,
    settings: &Settings,
) -> Result<ExitCode, CliError> {
    let mut device = settings.device_profile();
    if !args.abis.is_empty() {
        device.abis.clone_from(&args.abis);
    }
    if let Some(sdk) = args.sdk {
        device.sdk_level = sdk;
    }
    if args.prefer_32bit {
        device.prefer_32bit = true;
    }

    let apps = if args.apps.is_empty() {
        settings.enabled_apps()
    } else {
        args.apps.clone()
    };

    let cache = ResponseCache::new(paths.http_cache_dir(), settings.cache_ttl());
    let fetcher = Fetcher::with_timeout(cache, Some(settings.http_timeout()))?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding checks");
            interrupt.cancel();
        }
    });

    let request = BatchRequest {
        fetcher: &fetcher,
        endpoints: &settings.endpoints,
        device: &device,
        cache: args.cache_behaviour(),
        max_concurrent: settings.max_concurrent_checks,
        check_timeout: settings.check_timeout(),
        cancel: &cancel,
    };
    info!(
        "Checking {} apps for {:?} at API {}",
        apps.len(),
        device.abis,
        device.sdk_level
    );
    let outcomes = run_checks(&apps, &request).await;

    let reports: Vec<CheckReport<'_>> = outcomes
        .iter()
        .map(|outcome| CheckReport::new(outcome, args.installed_version(outcome.app)))
        .collect();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}", report.to_line());
        }
    }

    if cancel.is_cancelled() {
        Ok(ExitCode::from(EXIT_INTERRUPTED))
    } else if reports.iter().any(CheckReport::is_failure) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
