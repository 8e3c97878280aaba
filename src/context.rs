//! Immutable indexer configuration, threaded by reference rather than
//! read from process-wide globals.

use std::collections::HashSet;

use crate::config::{Network, ENABLE_SELF_MINT_HEIGHT, ENABLE_SWAP_WITHDRAW_HEIGHT};
use crate::ids::InscriptionId;

/// Built once at startup and passed by reference to every subsystem.
/// Nothing in this crate mutates a `IndexerContext` after construction,
/// and nothing reads configuration through any other path (no
/// process-wide statics).
#[derive(Debug, Clone)]
pub struct IndexerContext {
    pub network: Network,
    /// Optional ticker allow-list (`TICKS_ENABLED`); empty means "all
    /// tickers accepted". Tickers are stored lowercased.
    pub ticks_enabled: HashSet<String>,
    /// The inscription id a module-deploy's `source` field must name.
    pub module_swap_source_inscription_id: Option<InscriptionId>,
    pub enable_self_mint_height: u32,
    pub enable_swap_withdraw_height: u32,
    /// Disables history/index bookkeeping for replay-only configurations.
    pub enable_history: bool,
}

impl Default for IndexerContext {
    fn default() -> Self {
        Self {
            network: Network::default(),
            ticks_enabled: HashSet::new(),
            module_swap_source_inscription_id: None,
            enable_self_mint_height: ENABLE_SELF_MINT_HEIGHT,
            enable_swap_withdraw_height: ENABLE_SWAP_WITHDRAW_HEIGHT,
            enable_history: true,
        }
    }
}

impl IndexerContext {
    pub fn ticker_allowed(&self, ticker_lower: &str) -> bool {
        self.ticks_enabled.is_empty() || self.ticks_enabled.contains(ticker_lower)
    }

    pub fn self_mint_enabled_at(&self, height: u32) -> bool {
        height >= self.enable_self_mint_height
    }

    pub fn swap_withdraw_enabled_at(&self, height: u32) -> bool {
        height >= self.enable_swap_withdraw_height
    }
}

