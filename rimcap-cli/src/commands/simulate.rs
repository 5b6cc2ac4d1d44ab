use clap::{Args, ValueEnum};

use rimcap::prelude::*;
use rimio::prelude::{MemDisk, Overflow};

use crate::commands::{TesterArgs, print_volume, report, run, size_arg};
use crate::utils::pretty_bytes;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OverflowArg {
    /// Honest medium, writes past the real end fail
    Reject,
    /// Writes past the real end are silently dropped
    Discard,
    /// Addresses past the real end wrap onto the start
    Wrap,
}

impl From<OverflowArg> for Overflow {
    fn from(o: OverflowArg) -> Self {
        match o {
            OverflowArg::Reject => Overflow::Reject,
            OverflowArg::Discard => Overflow::Discard,
            OverflowArg::Wrap => Overflow::Wrap,
        }
    }
}

#[derive(Args, Debug)]
pub struct SimulateCmd {
    /// Capacity the fake medium claims (e.g. 256M)
    #[arg(long, value_parser = size_arg)]
    pub advertised: u64,

    /// Capacity it really stores
    #[arg(long, value_parser = size_arg)]
    pub physical: u64,

    /// Behavior past the real capacity
    #[arg(long, value_enum, default_value = "wrap")]
    pub overflow: OverflowArg,

    #[command(flatten)]
    pub tester: TesterArgs,
}

pub fn execute(cmd: SimulateCmd) -> anyhow::Result<i32> {
    let config = cmd.tester.to_config()?;
    let disk = MemDisk::new(cmd.advertised, cmd.physical, cmd.overflow.into());
    crate::log_info!(
        "Simulating a medium advertising {} with {} of real storage ({:?})",
        pretty_bytes(disk.advertised()),
        pretty_bytes(disk.physical()),
        cmd.overflow
    );

    let volume = MemVolume::new("/simulated", disk).with_label("SIMULATED");
    let mut tester = VolumeTester::new(volume, config)?;
    print_volume(&tester);

    let outcome = run(&mut tester)?;
    Ok(report(&outcome))
}
