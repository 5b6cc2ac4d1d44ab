// rimcap-cli/src/main.rs

mod commands;
mod utils;

use clap::{Parser, Subcommand};

use crate::commands::{info::InfoCmd, list::ListCmd, simulate::SimulateCmd, test::TestCmd};
use crate::utils::{LogLevel, set_log_level};

#[derive(Parser)]
#[command(name = "rimcap", version, about = "Verify the real capacity of flash media", long_about = None)]
struct Cli {
    /// Only print the verdict
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Print IO statistics and details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write and verify all free space of a volume
    Test(TestCmd),
    /// Show volume details and leftover test files
    Info(InfoCmd),
    /// List mounted volumes
    List(ListCmd),
    /// Run the test against a simulated counterfeit medium
    Simulate(SimulateCmd),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    set_log_level(if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    });

    let code = match cli.command {
        Commands::Test(cmd) => commands::test::execute(cmd)?,
        Commands::Info(cmd) => commands::info::execute(cmd)?,
        Commands::List(cmd) => commands::list::execute(cmd)?,
        Commands::Simulate(cmd) => commands::simulate::execute(cmd)?,
    };

    if code != commands::EXIT_OK {
        std::process::exit(code);
    }
    Ok(())
}
