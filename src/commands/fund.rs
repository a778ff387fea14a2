//! Fund command: split capacity into plain cells for another account

use anyhow::*;
use ckb_types::bytes::Bytes;

use crate::chain::TokioClock;
use crate::config::{DEPLOY_SCRIPTS, SECP256K1_BLAKE160};
use crate::deploy::build_funding;
use crate::types::*;

use super::{write_out_points, NodeOpts};

#[derive(clap::Parser, Debug)]
pub struct FundOpts {
    #[command(flatten)] pub node: NodeOpts,
    /// secp256k1-blake160 lock args (hex) of the account to fund
    #[arg(long)] pub to: String,
    #[arg(long, default_value_t = 100)] pub cells: usize,
    #[arg(long, default_value_t = 100_000)] pub capacity_ckb: u64,
    #[arg(long, default_value = "funding.json")] pub out: String,
}

pub async fn run_fund(o: FundOpts) -> Result<()> {
    let session = o.node.connect(DEPLOY_SCRIPTS)?;

    let args = hex::decode(o.to.trim_start_matches("0x")).context("Invalid --to lock args hex")?;
    ensure!(args.len() == 20, "--to must be 20 bytes of lock args, got {}", args.len());
    let target = session.registry.get(SECP256K1_BLAKE160)?.script(Bytes::from(args));
    let capacity = ckb_to_shannons(o.capacity_ckb).ok_or_else(|| anyhow!("--capacity-ckb too large"))?;

    let draft = build_funding(&target, o.cells, capacity)?;
    eprintln!("Funding {} cells of {} CKB", o.cells, o.capacity_ckb);

    let submitted = session.submitter(&TokioClock).submit(draft).await?;
    eprintln!("Funding tx committed: {:#x}", submitted.tx_hash);
    write_out_points(&submitted.out_points, &o.out)
}
