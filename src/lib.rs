//! Transaction builders for the iCKB two-phase deposit protocol on CKB

pub mod chain;
pub mod ckb_utils;
pub mod commands;
pub mod config;
pub mod deploy;
pub mod deposit;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod submit;
pub mod types;

pub use error::{Error, Result};
