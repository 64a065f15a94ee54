//! Meta-crate re-exporting the mempool-core crates in this workspace.

#[cfg(feature = "mempool")]
pub use chia_mempool as mempool;

#[cfg(feature = "protocol")]
pub use chia_protocol as protocol;

#[cfg(feature = "sha2")]
pub use chia_sha2 as sha2;
