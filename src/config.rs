//! Process-wide configuration constants.
//!
//! Everything here is read-only after startup:
//! values are bundled into an immutable [`crate::context::IndexerContext`]
//! and threaded through the indexer by reference rather than read as
//! process-wide globals.

/// Floor height for 5-byte (self-mint) tickers.
pub const ENABLE_SELF_MINT_HEIGHT: u32 = 837_090;

/// Floor height for the swap-withdraw opcode and the fixed pair-parameter
/// commit-function wire format.
pub const ENABLE_SWAP_WITHDRAW_HEIGHT: u32 = 847_090;

/// Maximum decimal scale a token's `dec` field may declare.
pub const MAX_DECIMAL_WIDTH: u8 = 18;

/// Fixed LP-token decimal scale.
pub const LP_SCALE: u8 = 18;

/// Minimum `sqrt(amt0 * amt1)` required on the first `add-liq` into a pool;
/// the corresponding LP amount is permanently locked to the burn sink.
pub const MINIMUM_LIQUIDITY: u64 = 1000;

/// Fee-rate and slippage denominator (scale-3 fixed point: parts per 1000).
pub const RATE_DENOMINATOR: u64 = 1000;

/// Host chain network selector. Controls only the address/script codec;
/// the indexer's core ledger semantics never branch on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}

