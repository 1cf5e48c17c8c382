//! Fixed-length byte containers for the fields whose length is part of the wire contract.
//!
//! None of these types interpret their contents; cryptographic validation of keys and signatures
//! happens outside of this crate.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const PUBLIC_KEY_BYTES_LEN: usize = 48;
pub const SIGNATURE_BYTES_LEN: usize = 96;
pub const GRAFFITI_BYTES_LEN: usize = 32;
pub const RANDAO_REVEAL_BYTES_LEN: usize = 32;

/// Returned when a byte slice does not have the length its container requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLength {
    pub expected: usize,
    pub got: usize,
}

impl fmt::Display for InvalidLength {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "expected {} bytes, got {}", self.expected, self.got)
    }
}

impl std::error::Error for InvalidLength {}

macro_rules! fixed_bytes {
    ($(#[$attr:meta])* $name: ident, $len: expr) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn empty() -> Self {
                Self([0; $len])
            }

            /// Returns `Err` if `bytes.len()` is not exactly `Self::LEN`.
            pub fn deserialize(bytes: &[u8]) -> Result<Self, InvalidLength> {
                if bytes.len() != $len {
                    return Err(InvalidLength {
                        expected: $len,
                        got: bytes.len(),
                    });
                }
                let mut array = [0; $len];
                array.copy_from_slice(bytes);
                Ok(Self(array))
            }

            pub fn serialize(&self) -> [u8; $len] {
                self.0
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            /// Hex-encodes the bytes with a `0x` prefix.
            pub fn as_hex_string(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = InvalidLength;

            fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
                Self::deserialize(bytes)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let stripped = s
                    .strip_prefix("0x")
                    .ok_or_else(|| format!("{} must be 0x-prefixed", stringify!($name)))?;
                let bytes = hex::decode(stripped)
                    .map_err(|e| format!("invalid hex for {}: {:?}", stringify!($name), e))?;
                Self::deserialize(&bytes).map_err(|e| format!("{}: {}", stringify!($name), e))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.as_hex_string())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.as_hex_string())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.as_hex_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_str(&s).map_err(D::Error::custom)
            }
        }
    };
}

fixed_bytes!(
    /// The serialized form of a BLS public key. Not checked to be a valid curve point.
    PublicKeyBytes,
    PUBLIC_KEY_BYTES_LEN
);
fixed_bytes!(
    /// The serialized form of a BLS signature. Not checked to be a valid curve point.
    SignatureBytes,
    SIGNATURE_BYTES_LEN
);
fixed_bytes!(
    /// Arbitrary bytes a proposer may include in a block.
    Graffiti,
    GRAFFITI_BYTES_LEN
);
fixed_bytes!(RandaoReveal, RANDAO_REVEAL_BYTES_LEN);
