use crate::Bytes96;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A placeholder for a BLS G2 signature (96 bytes, the size of a
/// `chia-bls::G2Element`).
///
/// Signature aggregation and verification are owned by an external
/// collaborator (an external CLVM-and-signature validator); this crate only
/// needs to carry the bytes around and concatenate them when bundles merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Signature(Bytes96);

impl Signature {
    pub fn new(bytes: Bytes96) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(self) -> [u8; 96] {
        self.0.to_bytes()
    }
}

impl From<Bytes96> for Signature {
    fn from(value: Bytes96) -> Self {
        Self(value)
    }
}
