//! Dep group command: bundle genesis system cells and deployed code, then
//! repoint the script registry at the new dep group

use anyhow::*;
use ckb_types::packed::OutPoint;

use crate::chain::{ChainRpc, TokioClock};
use crate::config::DEPLOY_SCRIPTS;
use crate::deploy::{build_dep_group, Binary, DeployedCode};
use crate::types::Role;

use super::NodeOpts;

#[derive(clap::Parser, Debug)]
pub struct DepGroupOpts {
    #[command(flatten)] pub node: NodeOpts,
    /// Output of the `deploy` command
    #[arg(long, default_value = "deployment.json")] pub deployment: String,
    /// Where to write the updated registry; defaults to --config
    #[arg(long)] pub out_config: Option<String>,
}

pub async fn run_dep_group(o: DepGroupOpts) -> Result<()> {
    let session = o.node.connect(DEPLOY_SCRIPTS)?;

    let deployed: Vec<DeployedCode> = serde_json::from_str(
        &std::fs::read_to_string(&o.deployment).with_context(|| format!("Reading {}", o.deployment))?,
    )?;
    ensure!(!deployed.is_empty(), "{} lists no deployed code", o.deployment);
    let code: Vec<OutPoint> = deployed.iter().map(|d| d.out_point.clone().into()).collect();

    let genesis = session.client.genesis_transaction_hashes().await?;
    let draft = build_dep_group(&genesis, &code, &session.registry)?;
    let submitted = session.submitter(&TokioClock).submit(draft).await?;
    let dep_group = submitted.out_points.first(Role::DepGroup)?;
    eprintln!("Dep group committed: {:#x}", submitted.tx_hash);

    let binaries = deployed
        .iter()
        .map(|d| Binary::read(&d.path).map(|b| (d.name.clone(), b.data)))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let registry = session.registry.with_dep_group(&binaries, &dep_group);

    let out = o.out_config.as_deref().unwrap_or(&o.node.config);
    registry.save(out)?;
    eprintln!("Registered scripts: {}", registry.names().collect::<Vec<_>>().join(", "));
    eprintln!("Wrote {}", out);
    Ok(())
}
