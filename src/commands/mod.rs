//! Command handlers for each subcommand

pub mod dep_group;
pub mod deploy;
pub mod deposit;
pub mod fund;
pub mod init_config;

pub use dep_group::*;
pub use deploy::*;
pub use deposit::*;
pub use fund::*;
pub use init_config::*;

use std::time::Duration;

use anyhow::*;

use crate::chain::{Clock, PollPolicy, RpcClient};
use crate::ckb_utils::{parse_private_key, FeePolicy, RoleOutPoints, Secp256k1Signer};
use crate::config::{ScriptRegistry, SECP256K1_BLAKE160};
use crate::submit::{SubmitConfig, Submitter};
use crate::types::*;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8114/";

/// Node, key, registry and fee flags shared by every transaction-sending command.
#[derive(clap::Args, Debug)]
pub struct NodeOpts {
    #[arg(long, env = "CKB_RPC_URL", default_value = DEFAULT_RPC_URL)] pub rpc_url: String,
    /// Hex secp256k1 private key paying for and signing the transaction
    #[arg(long, env = "ICKB_PRIVATE_KEY", hide_env_values = true)] pub private_key: String,
    /// Script registry JSON written by `init-config`
    #[arg(long, default_value = "ickb-config.json")] pub config: String,
    /// Flat fee in shannons
    #[arg(long, default_value_t = DEFAULT_TX_FEE)] pub fee: u64,
    /// Fee rate in shannons per 1000 bytes; overrides --fee
    #[arg(long)] pub fee_rate: Option<u64>,
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)] pub poll_interval_ms: u64,
    #[arg(long, default_value_t = DEFAULT_POLL_ATTEMPTS)] pub poll_attempts: u32,
}

impl NodeOpts {
    pub fn submit_config(&self) -> SubmitConfig {
        let fee = match self.fee_rate {
            Some(rate) => FeePolicy::Rate(rate),
            None => FeePolicy::Fixed(self.fee),
        };
        let poll = PollPolicy { interval: Duration::from_millis(self.poll_interval_ms), attempts: self.poll_attempts };
        SubmitConfig { fee, poll }
    }

    /// Load the registry, validate it against `required` and connect.
    pub fn connect(&self, required: &[&str]) -> Result<Session> {
        let registry = ScriptRegistry::load(&self.config, required)
            .with_context(|| format!("Loading script registry {}", self.config))?;
        let secret = parse_private_key(&self.private_key)?;
        let signer = Secp256k1Signer::new(secret, registry.get(SECP256K1_BLAKE160)?);
        let client = RpcClient::new(&self.rpc_url)?;
        Ok(Session { client, signer, registry, config: self.submit_config() })
    }
}

pub struct Session {
    pub client: RpcClient,
    pub signer: Secp256k1Signer,
    pub registry: ScriptRegistry,
    pub config: SubmitConfig,
}

impl Session {
    pub fn submitter<'a>(&'a self, clock: &'a dyn Clock) -> Submitter<'a> {
        Submitter::new(&self.client, &self.client, &self.signer, &self.registry, clock, self.config)
    }
}

/// Print the role map and write it as JSON to `out`.
pub fn write_out_points(out_points: &RoleOutPoints, out: &str) -> Result<()> {
    for line in out_points.describe() {
        eprintln!("  {}", line);
    }
    std::fs::write(out, serde_json::to_vec_pretty(&out_points.to_json())?)?;
    eprintln!("Wrote {}", out);
    Ok(())
}
