//! Per-ticker deploy metadata.

use crate::decimal::FixedDecimal;
use crate::ids::{InscriptionId, Ticker};

#[derive(Clone, Debug)]
pub struct TokenInfo {
    pub ticker: Ticker,
    pub deploy_inscription_id: InscriptionId,
    pub decimal: u8,
    pub limit: FixedDecimal,
    pub max: FixedDecimal,
    pub total_minted: FixedDecimal,
    pub burned: FixedDecimal,
    pub self_mint: bool,
    pub deploy_height: u32,
    /// `0` until `total_minted == max`, then set once to the completing
    /// mint's height and never changed again.
    pub complete_height: u32,
    pub complete_block_time: u64,
}

impl TokenInfo {
    pub fn is_complete(&self) -> bool {
        self.complete_height != 0
    }

    pub fn remaining_mintable(&self) -> FixedDecimal {
        self.max
            .sub(&self.total_minted)
            .expect("max and total_minted share the deploy's decimal scale")
    }
}

