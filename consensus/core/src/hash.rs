use std::fmt;
use std::hash::Hash as StdHash;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ConsensusError;

pub const HASH_SIZE: usize = 32;

pub const ZERO_HASH: Hash = Hash::zeroed_const();

/// A 32-byte block hash as reported by the consensus engine.
///
/// Serialized as a lowercase hex string, which is how the engine's RPC
/// interface and the inspector database both carry it.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Create a hash from a 32-byte array
    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns raw bytes
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Const constructor returning a zeroed Hash. Can be used in const contexts.
    pub const fn zeroed_const() -> Self {
        Self([0u8; HASH_SIZE])
    }

    /// Constructs a hash from four little-endian u64s (used in tests)
    pub const fn from_le_u64(parts: [u64; 4]) -> Self {
        let mut bytes = [0u8; HASH_SIZE];
        let mut i = 0;
        while i < 4 {
            let part = parts[i];
            let mut j = 0;
            while j < 8 {
                bytes[i * 8 + j] = ((part >> (8 * j)) & 0xFF) as u8;
                j += 1;
            }
            i += 1;
        }
        Self(bytes)
    }

    /// Creates a hash from a single u64 word
    pub const fn from_u64_word(word: u64) -> Self {
        Self::from_le_u64([word, 0, 0, 0])
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Hash {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; HASH_SIZE] = slice.try_into()?;
        Ok(Self(array))
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", hex::encode(self.0))
    }
}

impl FromStr for Hash {
    type Err = ConsensusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| ConsensusError::InvalidHash(s.to_string()))?;
        Hash::try_from(bytes.as_slice()).map_err(|_| ConsensusError::InvalidHash(s.to_string()))
    }
}

impl StdHash for Hash {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_str(&s).map_err(de::Error::custom)
    }
}
