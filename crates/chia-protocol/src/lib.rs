mod block_record;
mod bytes;
mod coin;
mod coin_record;
mod coin_spend;
mod program;
mod signature;
mod spend_bundle;

pub use crate::block_record::*;
pub use crate::bytes::*;
pub use crate::coin::*;
pub use crate::coin_record::*;
pub use crate::coin_spend::*;
pub use crate::program::*;
pub use crate::signature::*;
pub use crate::spend_bundle::*;
