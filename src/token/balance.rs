//! Per-holder balances and the transferable-inscription index.

use crate::decimal::FixedDecimal;
use crate::ids::{CreateIdxKey, Ticker};
use crate::script::PkScript;

#[derive(Clone, Debug)]
pub struct HolderBalance {
    pub available: FixedDecimal,
    pub available_safe: FixedDecimal,
    pub transferable: FixedDecimal,
}

impl HolderBalance {
    pub fn zero(scale: u8) -> Self {
        Self {
            available: FixedDecimal::zero(scale),
            available_safe: FixedDecimal::zero(scale),
            transferable: FixedDecimal::zero(scale),
        }
    }

    /// `available + transferable`.
    pub fn overall(&self) -> FixedDecimal {
        self.available
            .add(&self.transferable)
            .expect("available and transferable share the holder's ticker scale")
    }

    pub fn is_zero(&self) -> bool {
        self.overall().is_zero()
    }
}

/// A pending inscribe-transfer, valid from creation until its first
/// transfer-move consumes it.
#[derive(Clone, Debug)]
pub struct PendingTransfer {
    pub ticker: Ticker,
    pub amount: FixedDecimal,
    pub owner: PkScript,
    pub meta: TransferMeta,
}

/// Non-semantic bookkeeping carried alongside a pending transfer, used
/// only to render dump/history lines.
#[derive(Clone, Debug)]
pub struct TransferMeta {
    pub inscription_number: i64,
    pub height: u32,
    pub tx_idx: u32,
}

/// One audit-trail entry for a ticker's history (the ticker dump prints
/// `history:<n>` separately from `valid:<v>`).
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub create_idx_key: CreateIdxKey,
    pub kind: HistoryKind,
    pub valid: bool,
    pub pk_script: PkScript,
    pub amount: FixedDecimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryKind {
    Deploy,
    Mint,
    InscribeTransfer,
    Send,
}

