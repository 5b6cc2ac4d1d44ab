use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use rimcap::prelude::*;

use crate::utils::{ProgressReporter, pretty_bytes};

pub mod info;
pub mod list;
pub mod simulate;

/// Exit code of a run.
pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_CANCELED: i32 = 2;

/// Tester options shared by `test` and `simulate`.
#[derive(Args, Debug, Clone)]
pub struct TesterArgs {
    /// TOML file with tester settings (flags override it)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write/verify unit, whole MiB (e.g. 16M)
    #[arg(long, value_parser = size_arg)]
    pub block_size: Option<u64>,

    /// Test file size, whole MiB, larger than the block size (e.g. 512M)
    #[arg(long, value_parser = size_arg)]
    pub file_size: Option<u64>,

    /// Name prefix of the test files
    #[arg(long)]
    pub prefix: Option<String>,

    /// Skip the durable flush around files and blocks
    #[arg(long)]
    pub no_sync: bool,

    /// Fixed pattern seed, to reproduce a run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Test at most this many bytes (e.g. 2G)
    #[arg(long, value_parser = size_arg)]
    pub limit: Option<u64>,
}

impl TesterArgs {
    pub fn to_config(&self) -> anyhow::Result<TesterConfig> {
        let mut config = match &self.config {
            Some(path) => TesterConfig::from_file(path)?,
            None => TesterConfig::default(),
        };
        if let Some(v) = self.block_size {
            config = config.with_block_size(v);
        }
        if let Some(v) = self.file_size {
            config = config.with_file_size(v);
        }
        if let Some(v) = &self.prefix {
            config = config.with_prefix(v.clone());
        }
        if self.no_sync {
            config = config.with_sync(false);
        }
        if let Some(v) = self.seed {
            config = config.with_seed(v);
        }
        if let Some(v) = self.limit {
            config = config.with_max_bytes(v);
        }
        config.validate()?;
        Ok(config)
    }
}

fn size_arg(s: &str) -> Result<u64, String> {
    parse_size(s).map_err(|e| e.to_string())
}

/// Prints label and space figures of the volume.
pub fn print_volume<V: Volume>(tester: &VolumeTester<V>) {
    crate::log_info!("Volume:    {}", tester.label().bold());
    crate::log_info!("Total:     {}", pretty_bytes(tester.bytes_total()));
    crate::log_info!("Used:      {}", pretty_bytes(tester.bytes_used()));
    crate::log_info!("Available: {}", pretty_bytes(tester.bytes_available()));
}

/// Runs the test with progress bars and Ctrl-C cancellation.
pub fn run<V: Volume>(tester: &mut VolumeTester<V>) -> anyhow::Result<TestOutcome> {
    let token = tester.cancel_token();
    ctrlc::set_handler(move || {
        if token.is_canceled() {
            // Second interrupt.
            std::process::exit(130);
        }
        token.cancel();
    })?;

    let mut reporter = ProgressReporter::new();
    Ok(tester.start(&mut reporter))
}

/// Prints the verdict of a run and returns the process exit code.
pub fn report(outcome: &TestOutcome) -> i32 {
    if let Some(seed) = outcome.seed {
        crate::log_verbose!("Pattern seed: {seed}");
    }
    crate::log_verbose!(
        "IO: {} writes ({}), {} reads ({}), {} syncs in {:.1?}",
        outcome.io.writes,
        pretty_bytes(outcome.io.write_bytes),
        outcome.io.reads,
        pretty_bytes(outcome.io.read_bytes),
        outcome.io.syncs,
        outcome.elapsed
    );

    if outcome.succeeded() {
        crate::log_normal!(
            "{} {} verified, the volume holds its advertised capacity",
            "✓".green(),
            pretty_bytes(outcome.bytes_verified)
        );
        return EXIT_OK;
    }

    if outcome.canceled() {
        crate::log_normal!(
            "{} Canceled after {} written, {} verified ({})",
            "!".yellow(),
            pretty_bytes(outcome.bytes_written),
            pretty_bytes(outcome.bytes_verified),
            outcome.errors
        );
        return EXIT_CANCELED;
    }

    crate::log_normal!("{} Test failed: {}", "✗".red(), outcome.errors);
    if outcome.errors.contains(ErrorFlags::FULL) {
        crate::log_normal!("No free space to test.");
    } else if outcome.errors.contains(ErrorFlags::CONFLICT) {
        crate::log_normal!("Leftover test files must be removed first.");
    } else if outcome.failure.is_some() {
        crate::log_normal!(
            "Usable capacity is about {} of {} tested",
            pretty_bytes(outcome.usable_bytes()).bold(),
            pretty_bytes(outcome.bytes_total)
        );
    }
    EXIT_FAILED
}
