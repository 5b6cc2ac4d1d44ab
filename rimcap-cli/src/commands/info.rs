use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use rimcap::prelude::*;

use crate::commands::print_volume;

#[derive(Args, Debug)]
pub struct InfoCmd {
    /// Mountpoint of the volume
    pub mountpoint: PathBuf,

    /// Accept any directory, not only a mountpoint
    #[arg(long)]
    pub directory: bool,

    /// Test file prefix used to detect leftovers
    #[arg(long)]
    pub prefix: Option<String>,
}

pub fn execute(cmd: InfoCmd) -> anyhow::Result<i32> {
    let mut config = TesterConfig::default();
    if let Some(prefix) = cmd.prefix {
        config = config.with_prefix(prefix);
    }
    let volume = if cmd.directory {
        StdVolume::directory(&cmd.mountpoint)
    } else {
        StdVolume::new(&cmd.mountpoint)
    };
    let tester = VolumeTester::new(volume, config)?;

    if !tester.is_valid() {
        crate::log_normal!(
            "{} {} is not a valid volume",
            "✗".red(),
            cmd.mountpoint.display()
        );
        return Ok(super::EXIT_FAILED);
    }

    crate::log_normal!("{} {} is valid", "✓".green(), tester.mountpoint().display());
    print_volume(&tester);

    let files = tester.root_files();
    crate::log_info!("Root ({} entries):", files.len());
    for name in &files {
        crate::log_info!("  {name}");
    }

    let conflicts = tester.conflict_files();
    if conflicts.is_empty() {
        crate::log_info!("No leftover test files.");
    } else {
        crate::log_normal!("{} Leftover test files:", "!".yellow());
        for name in &conflicts {
            crate::log_normal!("  {name}");
        }
    }
    Ok(super::EXIT_OK)
}
