//! CKB cell, capacity and transaction helpers

pub mod capacity;
pub mod draft;
pub mod keys;
pub mod receipt;
pub mod scripts;
pub mod value;

pub use capacity::*;
pub use draft::*;
pub use keys::*;
pub use receipt::*;
pub use scripts::*;
pub use value::*;
