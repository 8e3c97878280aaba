//! Event model (C3): the canonical event record the dispatcher consumes,
//! and the JSON payload decoders for the deploy/mint/transfer/module/swap
//! wire operations.

pub mod payload;

pub use payload::{decode_payload, looks_like_json, Operation, PayloadError};

use crate::ids::{CreateIdxKey, InscriptionId};
use crate::script::PkScript;

/// One inscription-create or inscription-move event, as emitted by the
/// (external) blockchain node and inscription indexer.
#[derive(Clone, Debug)]
pub struct RawEvent {
    /// `0` denotes a creation; `> 0` is the move sequence number and is
    /// preserved as given.
    pub sequence: u64,
    pub txid: [u8; 32],
    pub idx: u32,
    pub vout: u32,
    pub offset: u64,
    pub satoshi: u64,
    pub pk_script: PkScript,
    pub inscr_number: i64,
    pub content: Vec<u8>,
    pub create_idx_key: CreateIdxKey,
    pub height: u32,
    pub tx_idx: u32,
    pub block_time: u64,
    /// The inscription's `parent` binary reference, when the producer
    /// supplies one. Only meaningful on a creation event; only consulted
    /// for self-mint tickers (`TokenLedger::mint`'s parent check).
    pub parent: Option<InscriptionId>,
}

impl RawEvent {
    pub fn is_transfer(&self) -> bool {
        self.sequence > 0
    }

    /// `block_time == 0` means "unconfirmed/mempool".
    pub fn is_confirmed(&self) -> bool {
        self.block_time > 0
    }
}

