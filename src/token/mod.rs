//! Base fungible-token ledger (C4): deploy / mint /
//! inscribe-transfer / transfer, with available + transferable
//! sub-balances and the strict validity rules this module defines.

pub mod balance;
pub mod info;
pub mod ledger;

pub use balance::{HistoryEntry, HistoryKind, HolderBalance, PendingTransfer, TransferMeta};
pub use info::TokenInfo;
pub use ledger::{MintOutcome, MoveOutcome, TokenLedger, TransferOutcome};

