//! Persistent faucet state.
//!
//! A [`ConfigurationRecord`] is the single object describing one faucet
//! instance. It is written once by `initialize` and afterwards only the
//! timing and supply counters move.

use crate::address::Address;
use crate::units::{ShareWeight, TokenAmount, UnixTimestamp};
use serde::{Deserialize, Serialize};

/// Maximum number of recipients a faucet can split emission across.
pub const MAX_RECIPIENTS: usize = 16;

/// A single emission recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Pre-existing token account credited by each drip
    pub account: Address,
    /// Relative share of every emission
    pub weight: ShareWeight,
}

impl Recipient {
    pub fn new(account: Address, weight: ShareWeight) -> Self {
        Self { account, weight }
    }

    /// Recipient with weight 1, for flat equal splits.
    pub fn equal(account: Address) -> Self {
        Self { account, weight: 1 }
    }
}

/// How a faucet instance is located.
///
/// - `Seeded`: one well-known faucet per seed; the record address is derived
///   from the seed, so re-initializing the same seed always hits the same record.
/// - `Keyed`: one faucet per arbitrary instance identity (e.g. a freshly
///   generated key); the record lives at that identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FaucetAddressing {
    Seeded {
        #[serde(with = "seed_text")]
        seed: Vec<u8>,
    },
    Keyed {
        instance: Address,
    },
}

impl FaucetAddressing {
    pub fn seeded(seed: impl AsRef<[u8]>) -> Self {
        Self::Seeded {
            seed: seed.as_ref().to_vec(),
        }
    }

    pub fn keyed(instance: Address) -> Self {
        Self::Keyed { instance }
    }
}

/// The single persistent object per faucet instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationRecord {
    /// Location of this record
    pub faucet: Address,
    /// Addressing mode the record was located with
    pub addressing: FaucetAddressing,
    /// Token type emitted by this faucet
    pub mint: Address,
    /// Derived authority allowed to mint `mint`
    pub mint_authority: Address,
    /// Bump used to derive `mint_authority`
    pub authority_bump: u8,
    /// Ordered recipients and their share weights
    pub recipients: Vec<Recipient>,
    /// Minimum number of seconds between two drips
    pub emission_interval_secs: u64,
    /// Tokens minted by one successful drip
    pub emission_per_tick: TokenAmount,
    /// Lifetime cap on tokens minted by this faucet
    pub max_total_supply: Option<TokenAmount>,
    /// Time of the last successful drip, 0 before the first one.
    /// `drip_count == 0` is what marks a faucet that never dripped.
    pub last_emission_time: UnixTimestamp,
    /// Running total of minted tokens
    pub total_supply_emitted: TokenAmount,
    /// Number of successful drips
    pub drip_count: u64,
    /// Time `initialize` ran
    pub initialized_at: UnixTimestamp,
    pub initialized: bool,
}

impl ConfigurationRecord {
    /// Sum of all share weights (the split denominator).
    pub fn total_weight(&self) -> u128 {
        self.recipients.iter().map(|r| r.weight as u128).sum()
    }

    pub fn recipient_accounts(&self) -> Vec<Address> {
        self.recipients.iter().map(|r| r.account).collect()
    }

    /// True when `accounts` lists exactly the recorded recipients in order.
    pub fn matches_recipients(&self, accounts: &[Address]) -> bool {
        self.recipients.len() == accounts.len()
            && self
                .recipients
                .iter()
                .zip(accounts)
                .all(|(r, a)| r.account == *a)
    }

    /// Tokens still mintable under the cap, `None` when uncapped.
    pub fn remaining_supply(&self) -> Option<TokenAmount> {
        self.max_total_supply
            .map(|cap| cap.saturating_sub(self.total_supply_emitted))
    }

    /// Earliest time the next drip can succeed.
    pub fn next_drip_at(&self) -> UnixTimestamp {
        if self.drip_count == 0 {
            return self.initialized_at;
        }
        self.last_emission_time
            .saturating_add(self.emission_interval_secs.min(i64::MAX as u64) as i64)
    }
}

/// Seeds are usually ASCII labels; keep them readable when they are, hex otherwise.
mod seed_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(seed: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(seed) {
            Ok(text) if !text.starts_with("0x") => serializer.serialize_str(text),
            _ => serializer.serialize_str(&format!("0x{}", hex::encode(seed))),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        match text.strip_prefix("0x") {
            Some(payload) => hex::decode(payload).map_err(serde::de::Error::custom),
            None => Ok(text.into_bytes()),
        }
    }
}
