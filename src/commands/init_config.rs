//! Init config command: devnet script registry from the genesis block

use anyhow::*;

use crate::chain::{ChainRpc, RpcClient};
use crate::config::ScriptRegistry;

use super::DEFAULT_RPC_URL;

#[derive(clap::Parser, Debug)]
pub struct InitConfigOpts {
    #[arg(long, env = "CKB_RPC_URL", default_value = DEFAULT_RPC_URL)] pub rpc_url: String,
    #[arg(long, default_value = "ickb-config.json")] pub out: String,
}

pub async fn run_init_config(o: InitConfigOpts) -> Result<()> {
    let client = RpcClient::new(&o.rpc_url)?;
    let genesis = client.genesis_transaction_hashes().await.context("Fetching genesis block")?;
    let registry = ScriptRegistry::devnet(&genesis)?;

    registry.save(&o.out)?;
    eprintln!("Registered scripts: {}", registry.names().collect::<Vec<_>>().join(", "));
    eprintln!("Wrote {}", o.out);
    Ok(())
}
