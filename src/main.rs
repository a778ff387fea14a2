//! iCKB builder - Main CLI Entry Point

use anyhow::Result;
use clap::Parser;

use ickb_builder::commands::*;
use ickb_builder::logging;

#[derive(Parser, Debug)]
#[command(name = "ickb-builder", about = "iCKB devnet tool: deploy scripts, create dep groups, deposit CKB for iCKB")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Write a devnet script registry read off the genesis block
    InitConfig(InitConfigOpts),
    /// Split capacity into plain cells for another account
    Fund(FundOpts),
    /// Publish script binaries as code cells
    Deploy(DeployOpts),
    /// Bundle genesis system cells and deployed code into a dep group, then update the registry
    DepGroup(DepGroupOpts),
    /// Create NervosDAO deposits under iCKB, a receipt and an owner-lock cell
    DepositPhaseOne(DepositPhaseOneOpts),
    /// Redeem committed receipts for iCKB tokens
    DepositPhaseTwo(DepositPhaseTwoOpts),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_json);
    match cli.command {
        Commands::InitConfig(o) => run_init_config(o).await,
        Commands::Fund(o) => run_fund(o).await,
        Commands::Deploy(o) => run_deploy(o).await,
        Commands::DepGroup(o) => run_dep_group(o).await,
        Commands::DepositPhaseOne(o) => run_deposit_phase_one(o).await,
        Commands::DepositPhaseTwo(o) => run_deposit_phase_two(o).await,
    }
}
