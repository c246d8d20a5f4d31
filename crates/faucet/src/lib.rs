//! Drip Faucet
//!
//! Scheduled, rate-limited token emission split across a fixed set of
//! recipients. A faucet is created once with [`Faucet::initialize`], which
//! binds it to a mint whose authority is derived from the faucet's own
//! seeds. After that anyone may call [`Faucet::drip`]; at most one call per
//! emission interval succeeds, minting `emission_per_tick` tokens split by
//! recipient weight.
//!
//! ## Modules
//! - `engine`: the `initialize`/`drip` state machine
//! - `split`: weighted split with the remainder to the last recipient
//! - `ledger`: token ledger seam plus in-memory and mock ledgers
//! - `events`: emitted events and the append-only event log
//! - `settings`: TOML settings with environment overrides
//! - `keeper`: polling loop that drips on a fixed period

pub mod engine;
pub mod errors;
pub mod events;
pub mod keeper;
pub mod ledger;
pub mod params;
pub mod settings;
pub mod split;

pub use engine::{EmissionReceipt, Faucet, RecipientAmount};
pub use errors::{FaucetError, ParamsError, STATUS_OK, STATUS_OK_DESCRIPTION};
pub use events::{DripEvent, EventLog, EventRecord, FaucetEvent, InitializeEvent};
pub use keeper::{DripKeeper, DripTarget, KeeperReport, KeeperTick};
pub use ledger::{InMemoryTokenLedger, MintCall, MintInfo, MockTokenLedger, TokenAccount, TokenLedger};
pub use params::InitializeParams;
pub use settings::{FaucetSettings, SettingsError, StorageBackend};
pub use split::split_emission;

pub use drip_types::{Address, ConfigurationRecord, FaucetAddressing, Recipient};
