use clap::Args;

use rimcap::prelude::*;
use rimcap::volume::mountpoints;

use crate::utils::pretty_bytes;

#[derive(Args, Debug)]
pub struct ListCmd {
    /// Include pseudo filesystems
    #[arg(short, long)]
    pub all: bool,
}

pub fn execute(cmd: ListCmd) -> anyhow::Result<i32> {
    let mounts: Vec<_> = mountpoints()?
        .into_iter()
        .filter(|m| cmd.all || m.is_block_device())
        .collect();

    if mounts.is_empty() {
        crate::log_normal!("No mounted volumes found.");
        return Ok(super::EXIT_OK);
    }

    for m in mounts {
        let volume = StdVolume::new(&m.mountpoint);
        let space = volume.space().unwrap_or_default();
        let name = volume.name().unwrap_or_default();
        crate::log_normal!(
            "{:<30} {:<16} {:<8} {:>10} {:>10} free  {}",
            m.mountpoint.display(),
            m.device,
            m.fs_type,
            pretty_bytes(space.total),
            pretty_bytes(space.available),
            name
        );
    }
    Ok(super::EXIT_OK)
}
