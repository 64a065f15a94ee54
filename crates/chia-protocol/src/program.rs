use crate::bytes::Bytes;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A serialized CLVM program: a puzzle reveal or a solution.
///
/// This crate never executes CLVM — it treats a `Program` as an opaque byte
/// blob passed through to whatever external puzzle/solution executor the host
/// wires in (see the `PreValidator` trait in `chia-mempool`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Program(Bytes);

impl Default for Program {
    fn default() -> Self {
        Self(vec![0x80].into())
    }
}

impl Program {
    pub fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn into_inner(self) -> Bytes {
        self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0.into_inner()
    }
}

impl From<Vec<u8>> for Program {
    fn from(value: Vec<u8>) -> Self {
        Self(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_program_is_clvm_nil() {
        assert_eq!(Program::default().as_slice(), &[0x80]);
    }

    #[test]
    fn round_trips_through_bytes() {
        let p = Program::new(vec![1, 2, 3].into());
        assert_eq!(p.to_vec(), vec![1, 2, 3]);
    }
}
