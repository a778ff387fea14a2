use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{field} overflow: {value} does not fit")]
    Overflow { field: &'static str, value: String },

    #[error("{what} is {value}, but the limit is {max}")]
    Limit { what: &'static str, value: u64, max: u64 },

    #[error("insufficient funds: required {required} shannons, collected {collected}")]
    InsufficientFunds { required: u64, collected: u64 },

    #[error("outputs and role tags are of different length: {outputs} outputs, {roles} roles")]
    Alignment { outputs: usize, roles: usize },

    #[error("witnesses already finalized ({0} present)")]
    AlreadyFinalized(usize),

    #[error("live cell not found at out point {0}")]
    LiveCellNotFound(String),

    #[error("unexpected transaction state: {0}")]
    UnexpectedState(String),

    #[error("transaction {tx_hash} not committed after {attempts} attempts")]
    Timeout { tx_hash: String, attempts: u32 },

    #[error("deposit converts to {value} iCKB, above the soft cap {soft_cap}")]
    DepositTooLarge { value: u128, soft_cap: u128 },

    #[error("{role} cell carries {capacity} shannons, occupied capacity is {occupied}")]
    UnderCapacity { role: String, capacity: u64, occupied: u64 },

    #[error("malformed {what} data: expected {expected} bytes, got {actual}")]
    MalformedCellData { what: &'static str, expected: usize, actual: usize },

    #[error("out point {0} is already spent by this transaction")]
    DuplicateInput(String),

    #[error("cell at {0} is not an iCKB receipt")]
    NotAReceipt(String),

    #[error("header {0} carries a zero accumulated rate")]
    InvalidAccumulatedRate(String),

    #[error("script {0} not found in registry")]
    MissingScript(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("node RPC error: {0}")]
    Rpc(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn overflow(field: &'static str, value: impl ToString) -> Self {
        Error::Overflow { field, value: value.to_string() }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Rpc(err.to_string())
    }
}
