//! Seed layouts for faucet record and mint authority derivation.

use drip_types::FaucetAddressing;

/// Prefix of the configuration record seeds for seeded faucets.
pub const CONFIG_SEED_PREFIX: &[u8] = b"faucet-config";

/// Prefix of the mint authority seeds for seeded faucets.
pub const AUTHORITY_SEED_PREFIX: &[u8] = b"mint-authority";

/// Seeds locating the configuration record.
///
/// Keyed faucets are not derived; their record sits at the instance identity,
/// so the list is just that identity.
pub fn config_seeds(addressing: &FaucetAddressing) -> Vec<Vec<u8>> {
    match addressing {
        FaucetAddressing::Seeded { seed } => vec![CONFIG_SEED_PREFIX.to_vec(), seed.clone()],
        FaucetAddressing::Keyed { instance } => vec![instance.as_bytes().to_vec()],
    }
}

/// Seeds deriving the mint authority (before the bump is appended).
pub fn authority_seeds(addressing: &FaucetAddressing) -> Vec<Vec<u8>> {
    match addressing {
        FaucetAddressing::Seeded { seed } => {
            vec![AUTHORITY_SEED_PREFIX.to_vec(), seed.clone()]
        }
        FaucetAddressing::Keyed { instance } => vec![instance.as_bytes().to_vec()],
    }
}
