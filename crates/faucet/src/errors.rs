use drip_authority::DerivationError;
use drip_types::{Address, TokenAmount, UnixTimestamp, MAX_RECIPIENTS};
use std::time::Duration;
use thiserror::Error;

/// Status code carried by events for successful operations.
pub const STATUS_OK: u64 = 0;
/// Status description carried by events for successful operations.
pub const STATUS_OK_DESCRIPTION: &str = "Ok";

/// Rejected `initialize` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("faucet must have at least one recipient")]
    NoRecipients,

    #[error("too many recipients: {count} > max {}", MAX_RECIPIENTS)]
    TooManyRecipients { count: usize },

    #[error("recipient {account} listed more than once")]
    DuplicateRecipient { account: Address },

    #[error("recipient {account} has zero weight")]
    ZeroWeight { account: Address },

    #[error("emission interval must be positive")]
    ZeroInterval,

    #[error("emission per tick must be positive")]
    ZeroEmission,

    #[error("max total supply must be positive when set")]
    ZeroSupplyCap,
}

#[derive(Debug, Error)]
pub enum FaucetError {
    #[error("invalid params: {0}")]
    InvalidParams(#[from] ParamsError),

    #[error("faucet {faucet} is already initialized")]
    AlreadyInitialized { faucet: Address },

    #[error("authority derivation failed: {0}")]
    Derivation(#[from] DerivationError),

    #[error("faucet {faucet} is not initialized")]
    NotInitialized { faucet: Address },

    #[error("authority mismatch: {reason}")]
    AuthorityMismatch { reason: String },

    #[error("recipient accounts do not match the set recorded for faucet {faucet}")]
    RecipientSetMismatch { faucet: Address },

    #[error("recipient {account} has no token account for mint {mint}")]
    RecipientAccountMissing { account: Address, mint: Address },

    #[error("clock went backwards: now={now}, last emission={last_emission_time}")]
    InvalidTimestamp {
        now: UnixTimestamp,
        last_emission_time: UnixTimestamp,
    },

    #[error("too soon: {elapsed_secs}s of {interval_secs}s elapsed, retry in {retry_after_secs}s")]
    TooSoon {
        elapsed_secs: u64,
        interval_secs: u64,
        retry_after_secs: u64,
    },

    #[error("supply cap reached: {emitted} of {cap} emitted")]
    SupplyCapReached {
        emitted: TokenAmount,
        cap: TokenAmount,
    },

    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("ledger error: {0}")]
    Ledger(#[source] anyhow::Error),
}

impl FaucetError {
    /// Stable numeric code; 0 is reserved for success.
    pub fn status_code(&self) -> u64 {
        match self {
            FaucetError::InvalidParams(_) => 1,
            FaucetError::AlreadyInitialized { .. } => 2,
            FaucetError::Derivation(_) => 3,
            FaucetError::NotInitialized { .. } => 4,
            FaucetError::AuthorityMismatch { .. } => 5,
            FaucetError::RecipientSetMismatch { .. } => 6,
            FaucetError::RecipientAccountMissing { .. } => 7,
            FaucetError::InvalidTimestamp { .. } => 8,
            FaucetError::TooSoon { .. } => 9,
            FaucetError::SupplyCapReached { .. } => 10,
            FaucetError::Storage(_) => 11,
            FaucetError::Ledger(_) => 12,
        }
    }

    /// Short, stable name of the failure.
    pub fn status_description(&self) -> &'static str {
        match self {
            FaucetError::InvalidParams(_) => "InvalidParams",
            FaucetError::AlreadyInitialized { .. } => "AlreadyInitialized",
            FaucetError::Derivation(DerivationError::DerivationExhausted) => "DerivationExhausted",
            FaucetError::Derivation(_) => "DerivationFailed",
            FaucetError::NotInitialized { .. } => "NotInitialized",
            FaucetError::AuthorityMismatch { .. } => "AuthorityMismatch",
            FaucetError::RecipientSetMismatch { .. } => "RecipientSetMismatch",
            FaucetError::RecipientAccountMissing { .. } => "RecipientAccountMissing",
            FaucetError::InvalidTimestamp { .. } => "InvalidTimestamp",
            FaucetError::TooSoon { .. } => "TooSoon",
            FaucetError::SupplyCapReached { .. } => "SupplyCapReached",
            FaucetError::Storage(_) => "StorageError",
            FaucetError::Ledger(_) => "LedgerError",
        }
    }

    /// Only the rate limit clears by itself; everything else is a caller or
    /// environment problem.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FaucetError::TooSoon { .. })
    }

    /// Remaining wait before a retry can succeed.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FaucetError::TooSoon {
                retry_after_secs, ..
            } => Some(Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }
}
