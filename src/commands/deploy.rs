//! Deploy command: publish script binaries as code cells

use anyhow::*;

use crate::chain::TokioClock;
use crate::config::DEPLOY_SCRIPTS;
use crate::deploy::{build_deploy_code, deployed_code, Binary};

use super::NodeOpts;

#[derive(clap::Parser, Debug)]
pub struct DeployOpts {
    #[command(flatten)] pub node: NodeOpts,
    /// Script binary to publish; repeat for several
    #[arg(long = "binary", required = true)] pub binaries: Vec<String>,
    #[arg(long, default_value = "deployment.json")] pub out: String,
}

pub async fn run_deploy(o: DeployOpts) -> Result<()> {
    let session = o.node.connect(DEPLOY_SCRIPTS)?;

    let binaries = o
        .binaries
        .iter()
        .map(|path| Binary::read(path).with_context(|| format!("Reading {}", path)))
        .collect::<Result<Vec<_>>>()?;
    for b in &binaries {
        eprintln!("Binary {}: {} bytes", b.name, b.data.len());
    }

    let draft = build_deploy_code(&binaries, &session.registry)?;
    let submitted = session.submitter(&TokioClock).submit(draft).await?;
    eprintln!("Code deployed in tx {:#x}", submitted.tx_hash);

    let deployed = deployed_code(&binaries, &submitted.out_points)?;
    std::fs::write(&o.out, serde_json::to_vec_pretty(&deployed)?)?;
    eprintln!("Wrote {}", o.out);
    Ok(())
}
