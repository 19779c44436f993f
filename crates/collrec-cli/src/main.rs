//! `collrec` — run collection-directory recovery against a data root.
//!
//! Prints a JSON report of the recovered catalog and the scan (valid,
//! incomplete, unrecognized directories). With `--purge`, removes the
//! incomplete directories afterwards, exactly like the engine's lazy
//! cleanup job.
//!
//! Logs go to stderr and honour `RUST_LOG` (default `info`).

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use collrec_core::{
    CleanupReport, RecoveryConfig, ScanReport, purge_incomplete, recover,
};
use collrec_error::CollrecError;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let exit_code = run_cli(std::env::args_os());
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct CliOptions {
    config_path: Option<PathBuf>,
    data_root: Option<PathBuf>,
    workers: Option<usize>,
    create: bool,
    purge: bool,
    pretty: bool,
    log_json: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Parsed {
    Help,
    Run(CliOptions),
}

#[derive(Debug, Serialize)]
struct CollectionSummary {
    name: String,
    cid: String,
    path: PathBuf,
}

#[derive(Debug, Serialize)]
struct CliReport<'a> {
    data_root: &'a Path,
    collections: Vec<CollectionSummary>,
    scan: &'a ScanReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    cleanup: Option<CleanupReport>,
}

fn run_cli<I>(os_args: I) -> i32
where
    I: IntoIterator<Item = OsString>,
{
    let raw: Vec<OsString> = os_args.into_iter().collect();
    let tail = if raw.len() > 1 { &raw[1..] } else { &[] };

    let options = match parse_args(tail) {
        Ok(Parsed::Help) => {
            print_help();
            return 0;
        }
        Ok(Parsed::Run(options)) => options,
        Err(message) => {
            eprintln!("error: {message}");
            return 2;
        }
    };

    init_logging(options.log_json);

    let config = match build_config(&options) {
        Ok(config) => config,
        Err(err) => return report_error(&err),
    };
    let recovered = match recover(&config) {
        Ok(recovered) => recovered,
        Err(err) => return report_error(&err),
    };

    let cleanup = options
        .purge
        .then(|| purge_incomplete(&recovered.report));
    let cleanup_failed = cleanup.as_ref().is_some_and(|c| !c.is_complete());
    if let Some(cleanup) = &cleanup {
        if cleanup_failed {
            warn!(
                target: "collrec.cli",
                failed = cleanup.failed.len(),
                "purge left directories behind"
            );
        } else {
            info!(
                target: "collrec.cli",
                removed = cleanup.removed.len(),
                already_gone = cleanup.already_gone.len(),
                "purge finished"
            );
        }
    }

    let collections = recovered
        .catalog
        .list()
        .into_iter()
        .filter_map(|name| recovered.catalog.lookup(&name))
        .map(|handle| CollectionSummary {
            name: handle.name().to_owned(),
            cid: handle.id().to_string(),
            path: handle.path().to_path_buf(),
        })
        .collect();

    let report = CliReport {
        data_root: &config.data_root,
        collections,
        scan: &recovered.report,
        cleanup,
    };
    let json = if options.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    match json {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("error: failed to serialize report: {err}");
            return 1;
        }
    }

    i32::from(cleanup_failed)
}

fn parse_args(tail: &[OsString]) -> Result<Parsed, String> {
    if tail.iter().any(|a| a == "-h" || a == "--help") {
        return Ok(Parsed::Help);
    }

    let mut options = CliOptions::default();
    let mut i = 0;
    while i < tail.len() {
        let flag = tail[i].to_string_lossy();
        match flag.as_ref() {
            "--data-root" => {
                i += 1;
                let value = tail
                    .get(i)
                    .ok_or("--data-root requires a directory argument")?;
                options.data_root = Some(PathBuf::from(value));
            }
            "--config" => {
                i += 1;
                let value = tail.get(i).ok_or("--config requires a file argument")?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--workers" => {
                i += 1;
                let value = tail.get(i).ok_or("--workers requires a number")?;
                let workers = value
                    .to_str()
                    .and_then(|text| text.parse::<usize>().ok())
                    .ok_or_else(|| {
                        format!("--workers expects a number, got `{}`", value.to_string_lossy())
                    })?;
                options.workers = Some(workers);
            }
            "--create" => options.create = true,
            "--purge" => options.purge = true,
            "--pretty" => options.pretty = true,
            "--log-json" => options.log_json = true,
            other => return Err(format!("unknown option `{other}`")),
        }
        i += 1;
    }

    if options.data_root.is_none() && options.config_path.is_none() {
        return Err("one of --data-root or --config is required".to_owned());
    }
    Ok(Parsed::Run(options))
}

/// Config file first, then command-line overrides.
fn build_config(options: &CliOptions) -> collrec_error::Result<RecoveryConfig> {
    let mut config = match (&options.config_path, &options.data_root) {
        (Some(path), _) => RecoveryConfig::load(path)?,
        (None, Some(root)) => RecoveryConfig::new(root),
        (None, None) => {
            return Err(CollrecError::config(
                "one of --data-root or --config is required",
            ));
        }
    };
    if options.config_path.is_some() {
        if let Some(root) = &options.data_root {
            config.data_root.clone_from(root);
        }
    }
    if let Some(workers) = options.workers {
        config.worker_threads = workers;
    }
    if options.create {
        config.create_data_root = true;
    }
    config.validate()?;
    Ok(config)
}

fn report_error(err: &CollrecError) -> i32 {
    eprintln!("error: {err}");
    if let Some(hint) = err.suggestion() {
        eprintln!("hint: {hint}");
    }
    err.exit_code()
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    // try_init: a second call (tests) keeps the first subscriber.
    let _ = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
}

fn print_help() {
    println!(
        "\
collrec — recover the collection catalog from a data root

USAGE:
    collrec --data-root DIR [OPTIONS]
    collrec --config FILE [OPTIONS]

OPTIONS:
    --data-root DIR   Data directory holding collection-<id> subdirectories
    --config FILE     TOML recovery configuration (data_root, worker_threads, ...)
    --workers N       Classification threads (overrides config)
    --create          Create the data root if it does not exist
    --purge           Remove incomplete directories after recovery
    --pretty          Pretty-print the JSON report
    --log-json        Emit logs as JSON on stderr
    -h, --help        Show this help

EXIT CODES:
    0 success, 1 cleanup left directories behind, 2 usage error,
    10 I/O failure on the data root, 12 duplicate collections"
    );
}
