use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing an address string.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("address is not valid base58: {0}")]
    InvalidBase58(#[from] bs58::decode::Error),
    #[error("address payload must be exactly {expected} bytes, got {actual}")]
    InvalidPayloadLength { expected: usize, actual: usize },
}

/// Number of raw bytes contained in an address.
pub const ADDRESS_BYTES: usize = 32;

/// Encode a 32-byte account identifier into its base58 text form.
pub fn encode_address(bytes: &[u8; ADDRESS_BYTES]) -> String {
    bs58::encode(bytes).into_string()
}

/// Attempt to decode a base58 address string into the raw bytes.
pub fn decode_address(address: &str) -> Result<[u8; ADDRESS_BYTES], AddressError> {
    let decoded = bs58::decode(address).into_vec()?;
    let actual = decoded.len();
    decoded
        .try_into()
        .map_err(|_| AddressError::InvalidPayloadLength {
            expected: ADDRESS_BYTES,
            actual,
        })
}

/// Identifier of anything the emission engine references: the program itself,
/// mints, derived authorities, configuration records and token accounts.
///
/// Serialised as a base58 string so persisted records and events stay readable.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; ADDRESS_BYTES]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    fn from(value: [u8; ADDRESS_BYTES]) -> Self {
        Address(value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        encode_address(&value.0)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        decode_address(&value).map(Address)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_address(s).map(Address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_address(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", encode_address(&self.0))
    }
}
