//! A common wrapper around OpenSSL and sha2 implementations of sha256.
//!
//! Building with the `openssl` feature routes hashing through OpenSSL's EVP
//! interface; otherwise the pure-Rust `sha2` crate is used. Both backends are
//! exposed through the same `Sha256` type so callers never need to care which
//! one is active.

#[cfg(feature = "openssl")]
mod backend {
    use openssl::hash::{Hasher, MessageDigest};

    pub struct Sha256(Hasher);

    impl Sha256 {
        pub fn new() -> Self {
            Self(Hasher::new(MessageDigest::sha256()).expect("openssl sha256 hasher"))
        }

        pub fn update(&mut self, data: impl AsRef<[u8]>) {
            self.0.update(data.as_ref()).expect("openssl hasher update");
        }

        pub fn finalize(mut self) -> [u8; 32] {
            let digest = self.0.finish().expect("openssl hasher finish");
            digest.as_ref().try_into().expect("sha256 digest is 32 bytes")
        }
    }

    impl Default for Sha256 {
        fn default() -> Self {
            Self::new()
        }
    }
}

#[cfg(not(feature = "openssl"))]
mod backend {
    use sha2::{Digest, Sha256 as Sha256Impl};

    pub struct Sha256(Sha256Impl);

    impl Sha256 {
        pub fn new() -> Self {
            Self(Sha256Impl::new())
        }

        pub fn update(&mut self, data: impl AsRef<[u8]>) {
            self.0.update(data.as_ref());
        }

        pub fn finalize(self) -> [u8; 32] {
            self.0.finalize().into()
        }
    }

    impl Default for Sha256 {
        fn default() -> Self {
            Self::new()
        }
    }
}

pub use backend::Sha256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_matches_known_digest() {
        let mut hasher = Sha256::new();
        hasher.update(b"");
        let digest = hasher.finalize();
        assert_eq!(
            hex::encode(digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
    }

    #[test]
    fn incremental_updates_match_single_update() {
        let mut a = Sha256::new();
        a.update(b"hello ");
        a.update(b"world");

        let mut b = Sha256::new();
        b.update(b"hello world");

        assert_eq!(a.finalize(), b.finalize());
    }
}
