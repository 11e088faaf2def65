use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dirsizer::cli::{Cli, Config};
use dirsizer::fs::LocalDir;
use dirsizer::{CancelToken, DirSizer, SizeFailure, Totals};

const SPINNER_FRAMES: [char; 4] = ['|', '/', '-', '\\'];
const SPINNER_INTERVAL: Duration = Duration::from_millis(120);

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = Config::from_cli(cli).context("invalid configuration")?;

    let token = match config.timeout {
        Some(timeout) => CancelToken::with_timeout(timeout),
        None => CancelToken::new(),
    };
    let interrupt = token.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, stopping...");
        interrupt.cancel();
    })
    .context("failed to set signal handler")?;

    let root = LocalDir::open(&config.root, config.local.clone())
        .with_context(|| format!("cannot open {}", config.root.display()))?;

    info!(
        root = %config.root.display(),
        workers = config.workers,
        metric = config.local.metric.as_str(),
        "sizing directory tree"
    );

    let sizer = DirSizer::new(config.workers);
    let result = if config.progress {
        size_with_spinner(&sizer, &token, root)
    } else {
        sizer.size(&token, root)
    };

    match result {
        Ok(totals) => {
            print_totals(&totals, config.raw_bytes);
            Ok(())
        }
        Err(SizeFailure { error, partial }) => {
            if !partial.is_empty() {
                eprintln!("partial result before failure: {partial}");
            }
            Err(error).context("size computation failed")
        }
    }
}

fn size_with_spinner(
    sizer: &DirSizer,
    token: &CancelToken,
    root: LocalDir,
) -> Result<Totals, SizeFailure> {
    let session = sizer.start(token, root);
    let mut stderr = std::io::stderr();
    let mut tick = 0_usize;

    let result = loop {
        if let Some(result) = session.wait_timeout(SPINNER_INTERVAL) {
            break result;
        }
        let frame = SPINNER_FRAMES[tick % SPINNER_FRAMES.len()];
        let _ = write!(stderr, "\r{frame} sizing...");
        let _ = stderr.flush();
        tick = tick.wrapping_add(1);
    };

    let _ = write!(stderr, "\r            \r");
    let _ = stderr.flush();
    result
}

fn print_totals(totals: &Totals, raw_bytes: bool) {
    if raw_bytes {
        println!("{}\t{}", totals.total_size, totals.file_count);
    } else {
        println!("{totals}");
    }
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("dirsizer=debug,warn")
    } else {
        EnvFilter::new("dirsizer=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(verbose)
        .init();
}
