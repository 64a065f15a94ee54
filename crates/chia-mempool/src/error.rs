use thiserror::Error;

/// The mempool's fallible-function return type. Every public entry point on
/// [`crate::manager::MempoolManager`] returns either a value or an [`Err`].
pub type MempoolResult<T> = std::result::Result<T, Err>;

/// Stable error kinds surfaced by the mempool core. Other subsystems
/// pattern-match on these, so variants are never renamed once shipped -
/// mirrors the naming of `chia-consensus::validation_error::ValidationErr`,
/// trimmed to the kinds this crate's own validator can raise (no `NodePtr`
/// payloads: CLVM execution errors belong to the opaque pre-validator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Err {
    #[error("empty spend bundle, all-fast-forward spend bundle, or validation time budget exceeded")]
    InvalidSpendBundle,

    #[error("coin referenced by the bundle does not exist and is not ephemeral")]
    UnknownUnspent,

    #[error("coin has already been spent on-chain and cannot be fast-forwarded")]
    DoubleSpend,

    #[error("conflicts with an admitted item and does not satisfy the replacement rules")]
    MempoolConflict,

    #[error("declared puzzle hash does not match the coin record's puzzle hash")]
    WrongPuzzleHash,

    #[error("dedup-eligible spend has a non-canonical CLVM solution encoding")]
    InvalidCoinSolution,

    #[error("ASSERT_HEIGHT_ABSOLUTE condition is not yet satisfied")]
    AssertHeightAbsoluteFailed,

    #[error("ASSERT_HEIGHT_RELATIVE condition is not yet satisfied")]
    AssertHeightRelativeFailed,

    #[error("ASSERT_SECONDS_ABSOLUTE condition is violated")]
    AssertSecondsAbsoluteFailed,

    #[error("ASSERT_SECONDS_RELATIVE condition is violated")]
    AssertSecondsRelativeFailed,

    #[error("ASSERT_BEFORE_HEIGHT_ABSOLUTE condition is violated")]
    AssertBeforeHeightAbsoluteFailed,

    #[error("ASSERT_BEFORE_HEIGHT_RELATIVE condition is violated")]
    AssertBeforeHeightRelativeFailed,

    #[error("ASSERT_BEFORE_SECONDS_ABSOLUTE condition is violated")]
    AssertBeforeSecondsAbsoluteFailed,

    #[error("ASSERT_BEFORE_SECONDS_RELATIVE condition is violated")]
    AssertBeforeSecondsRelativeFailed,

    #[error("the height time-lock envelope is empty (before <= after)")]
    ImpossibleHeightAbsoluteConstraints,

    #[error("the seconds time-lock envelope is empty (before <= after)")]
    ImpossibleSecondsAbsoluteConstraints,

    #[error("bundle cost exceeds the per-transaction cost budget")]
    BlockCostExceedsMax,

    #[error("fee is negative or overflows")]
    InvalidBlockFeeAmount,

    #[error("fee rate is too low to displace lower-ranked items")]
    InvalidFeeLowFee,

    #[error("fee per cost is below the configured non-zero minimum")]
    InvalidFeeTooCloseToZero,

    #[error("capacity computation is internally inconsistent")]
    InvalidCostResult,

    #[error("add_spend_bundle called before the mempool has observed any peak")]
    MempoolNotInitialized,

    /// Not one of spec.md §7's named kinds: the source's
    /// `create_bundle_from_block_generator` raises the same
    /// `MEMPOOL_NOT_INITIALIZED` for "no peak yet" and "caller's header hash
    /// doesn't match our peak", but callers need to tell the two apart to
    /// decide whether to retry with a fresh tip or wait for one. We split
    /// them into a distinct kind.
    #[error("caller's header_hash does not match the mempool's current peak")]
    NewPeakHeaderHashMismatch,
}
