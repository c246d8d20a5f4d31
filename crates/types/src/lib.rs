//! Drip shared types
//!
//! Addresses, units, clocks and the persistent faucet configuration record
//! shared by the derivation, storage and emission crates.

pub mod address;
pub mod clock;
pub mod record;
pub mod units;

pub use address::*;
pub use clock::*;
pub use record::*;
pub use units::*;
