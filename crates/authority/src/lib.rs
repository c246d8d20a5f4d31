//! Drip Authority Derivation
//!
//! Derives program-controlled identities from seeds, with no private key.
//!
//! `address = SHA-256(seed_0 || … || seed_n || program_id || "ProgramDerivedAddress")`
//!
//! A candidate is only accepted when it does NOT decode as an Ed25519 point:
//! an on-curve address could have a matching secret key, an off-curve one
//! cannot. [`find_derived_address`] appends a one-byte bump seed and walks it
//! down from 255 until the candidate lands off the curve.

use drip_types::{Address, FaucetAddressing};
use ed25519_dalek::VerifyingKey;
use sha2::{Digest, Sha256};
use tracing::trace;

pub mod seeds;

pub use seeds::{authority_seeds, config_seeds, AUTHORITY_SEED_PREFIX, CONFIG_SEED_PREFIX};

/// Maximum number of seeds, bump included.
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed in bytes.
pub const MAX_SEED_LEN: usize = 32;

/// Domain separator appended after the program id.
pub const DERIVATION_MARKER: &[u8] = b"ProgramDerivedAddress";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DerivationError {
    #[error("too many seeds: {count} > max {}", MAX_SEEDS)]
    TooManySeeds { count: usize },

    #[error("seed {index} is {len} bytes, max {}", MAX_SEED_LEN)]
    SeedTooLong { index: usize, len: usize },

    #[error("derived address lies on the ed25519 curve")]
    OnCurve,

    #[error("no bump in 0..=255 yields an off-curve address")]
    DerivationExhausted,

    #[error("derived address {derived} does not match expected {expected}")]
    Mismatch { expected: Address, derived: Address },
}

/// True when `bytes` decompresses to a valid Ed25519 point.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    VerifyingKey::from_bytes(bytes).is_ok()
}

/// Derive the address for an exact seed list (bump already included, if any).
pub fn create_derived_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<Address, DerivationError> {
    if seeds.len() > MAX_SEEDS {
        return Err(DerivationError::TooManySeeds { count: seeds.len() });
    }

    let mut hasher = Sha256::new();
    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(DerivationError::SeedTooLong {
                index,
                len: seed.len(),
            });
        }
        hasher.update(seed);
    }
    hasher.update(program_id.as_bytes());
    hasher.update(DERIVATION_MARKER);

    let digest: [u8; 32] = hasher.finalize().into();
    if is_on_curve(&digest) {
        return Err(DerivationError::OnCurve);
    }

    Ok(Address(digest))
}

/// Find the canonical `(address, bump)` for `seeds`: the highest bump whose
/// candidate lies off the curve.
pub fn find_derived_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), DerivationError> {
    if seeds.len() >= MAX_SEEDS {
        return Err(DerivationError::TooManySeeds {
            count: seeds.len() + 1,
        });
    }

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        with_bump.extend_from_slice(seeds);
        with_bump.push(&bump_seed);

        match create_derived_address(&with_bump, program_id) {
            Ok(address) => return Ok((address, bump)),
            Err(DerivationError::OnCurve) => {
                trace!(bump, "derived candidate on curve, trying next bump");
            }
            Err(other) => return Err(other),
        }
    }

    Err(DerivationError::DerivationExhausted)
}

/// Re-derive with a known bump and compare against `expected`.
pub fn verify_derived_address(
    seeds: &[&[u8]],
    bump: u8,
    program_id: &Address,
    expected: &Address,
) -> Result<(), DerivationError> {
    let bump_seed = [bump];
    let mut with_bump: Vec<&[u8]> = seeds.to_vec();
    with_bump.push(&bump_seed);

    let derived = create_derived_address(&with_bump, program_id)?;
    if derived != *expected {
        return Err(DerivationError::Mismatch {
            expected: *expected,
            derived,
        });
    }
    Ok(())
}

/// Canonical mint authority for a faucet.
pub fn derive_mint_authority(
    addressing: &FaucetAddressing,
    program_id: &Address,
) -> Result<(Address, u8), DerivationError> {
    let seeds = authority_seeds(addressing);
    let refs: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();
    find_derived_address(&refs, program_id)
}

/// Check that `authority` is what `bump` derives for this faucet.
pub fn verify_mint_authority(
    addressing: &FaucetAddressing,
    bump: u8,
    program_id: &Address,
    authority: &Address,
) -> Result<(), DerivationError> {
    let seeds = authority_seeds(addressing);
    let refs: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();
    verify_derived_address(&refs, bump, program_id, authority)
}

/// Location of a faucet's configuration record.
///
/// Seeded faucets live at a derived address; keyed faucets live at their
/// instance identity.
pub fn locate_record(
    addressing: &FaucetAddressing,
    program_id: &Address,
) -> Result<Address, DerivationError> {
    match addressing {
        FaucetAddressing::Keyed { instance } => Ok(*instance),
        FaucetAddressing::Seeded { .. } => {
            let seeds = config_seeds(addressing);
            let refs: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();
            find_derived_address(&refs, program_id).map(|(address, _)| address)
        }
    }
}
