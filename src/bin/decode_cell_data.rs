//! Cell data decoder
//!
//! Decodes iCKB cell data offline:
//! - receipt: packed `(deposit_amount, deposit_quantity)` and its iCKB value at a given rate
//! - token: little-endian u128 sUDT amount

use anyhow::*;

use ickb_builder::ckb_utils::{token_amount_from_bytes, Receipt, ValueOracle};
use ickb_builder::types::*;

/// CLI: `cargo run --bin decode_cell_data -- --kind receipt --data 0x...`
#[derive(clap::Parser, Debug)]
struct Opts {
    /// receipt | token
    #[arg(long)]
    kind: String,

    /// Cell data as hex
    #[arg(long)]
    data: String,

    /// Accumulated rate to value a receipt at; defaults to the genesis rate
    #[arg(long, default_value_t = GENESIS_ACCUMULATED_RATE)]
    ar: u64,
}

fn main() -> Result<()> {
    let opts = <Opts as clap::Parser>::parse();
    let data = hex::decode(opts.data.trim_start_matches("0x")).context("Invalid --data hex")?;

    match opts.kind.as_str() {
        "receipt" => {
            let receipt = Receipt::from_bytes(&data)?;
            let value = ValueOracle::default().receipt_value(receipt.deposit_amount, receipt.deposit_quantity, opts.ar)?;
            println!("deposit_amount:   {} shannons", receipt.deposit_amount);
            println!("deposit_quantity: {}", receipt.deposit_quantity);
            println!("ickb_value:       {} (ar {})", value, opts.ar);
        }
        "token" => {
            println!("ickb_amount: {}", token_amount_from_bytes(&data)?);
        }
        other => bail!("--kind must be receipt|token, got {other}"),
    }
    Ok(())
}
