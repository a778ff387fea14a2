//! Deposit commands: phase one locks CKB in NervosDAO deposits and mints a
//! receipt, phase two redeems committed receipts for iCKB

use anyhow::*;

use crate::chain::TokioClock;
use crate::ckb_utils::ValueOracle;
use crate::config::DEPOSIT_SCRIPTS;
use crate::deposit::{default_deposit_amount, run_phase_one, run_phase_two, DepositHandoff, DepositRequest};
use crate::types::*;

use super::{write_out_points, NodeOpts};

#[derive(clap::Parser, Debug)]
pub struct DepositPhaseOneOpts {
    #[command(flatten)] pub node: NodeOpts,
    /// Unoccupied capacity per deposit in shannons; defaults to the soft cap at the tip
    #[arg(long)] pub amount: Option<u64>,
    #[arg(long, default_value_t = MAX_DEPOSIT_QUANTITY)] pub quantity: u32,
    #[arg(long)] pub skip_soft_cap_check: bool,
    #[arg(long, default_value = "deposit_handoff.json")] pub handoff: String,
}

pub async fn run_deposit_phase_one(o: DepositPhaseOneOpts) -> Result<()> {
    let session = o.node.connect(DEPOSIT_SCRIPTS)?;
    let oracle = ValueOracle::default();

    let amount = match o.amount {
        Some(amount) => amount,
        None => default_deposit_amount(&session.client, &oracle).await?,
    };
    let request = DepositRequest::new(amount, o.quantity)?;
    eprintln!(
        "Depositing {} x {:.8} CKB (+{} CKB occupied each)",
        request.quantity,
        request.amount as f64 / SHANNONS_PER_CKB as f64,
        DEPOSIT_OCCUPIED_CKB
    );

    let submitter = session.submitter(&TokioClock);
    let (submitted, handoff) = run_phase_one(&submitter, request, &oracle, !o.skip_soft_cap_check).await?;
    eprintln!("Phase one committed: {:#x}", submitted.tx_hash);

    handoff.save(&o.handoff)?;
    eprintln!("Wrote {}", o.handoff);
    Ok(())
}

#[derive(clap::Parser, Debug)]
pub struct DepositPhaseTwoOpts {
    #[command(flatten)] pub node: NodeOpts,
    /// Hand-off file written by phase one
    #[arg(long, default_value = "deposit_handoff.json")] pub handoff: String,
    #[arg(long, default_value = "ickb_tokens.json")] pub out: String,
}

pub async fn run_deposit_phase_two(o: DepositPhaseTwoOpts) -> Result<()> {
    let session = o.node.connect(DEPOSIT_SCRIPTS)?;
    let handoff = DepositHandoff::load(&o.handoff).with_context(|| format!("Reading {}", o.handoff))?;
    eprintln!("Redeeming {} receipt(s)", handoff.receipt_out_points.len());

    let submitter = session.submitter(&TokioClock);
    let submitted = run_phase_two(&submitter, &handoff, &ValueOracle::default()).await?;
    eprintln!("Phase two committed: {:#x}", submitted.tx_hash);
    write_out_points(&submitted.out_points, &o.out)
}
