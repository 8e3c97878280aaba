//! Per-module fixed configuration ([`Module`]), the per-(module, ticker,
//! holder) swap balance record ([`ModuleTokenBalance`]), per-pool reserves
//! ([`PoolBalance`]) and the per-tick conditional-approve running totals
//! ([`ConditionalApproveState`]).

use std::collections::BTreeSet;

use crate::decimal::FixedDecimal;
use crate::ids::{InscriptionId, ModuleId, Ticker};
use crate::script::PkScript;

/// Fixed configuration recorded at module-deploy time, immutable
/// thereafter — the module-ledger analogue of [`crate::token::TokenInfo`].
#[derive(Clone, Debug)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
    pub deployer: PkScript,
    pub sequencer: PkScript,
    pub gas_to: PkScript,
    pub fee_to: PkScript,
    /// Scale-3 fixed point, parts per 1000.
    pub fee_rate_swap: u64,
    pub gas_tick: Ticker,
    pub deploy_height: u32,
    /// Commits that have been accepted (their own move-move succeeded and
    /// re-verified clean). A commit is inserted here only through its own
    /// move, never as a side effect of being referenced as someone else's
    /// parent (`spec.md` §3.3's commit lifecycle).
    pub commit_id_map: BTreeSet<InscriptionId>,
    /// Parent ids consumed by an accepted commit; once an id lands here no
    /// other commit may name it as `parent` (prevents sibling replay of
    /// the same chain edge).
    pub commit_id_chain_map: BTreeSet<InscriptionId>,
    /// Commits seen (moved) but rejected; retained for audit, never
    /// retried.
    pub commit_invalid_map: BTreeSet<InscriptionId>,
}

/// Per-(module, ticker, holder) swap-ledger balance.
#[derive(Clone, Debug)]
pub struct ModuleTokenBalance {
    pub available: FixedDecimal,
    pub available_safe: FixedDecimal,
    pub swap_account: FixedDecimal,
    pub swap_account_safe: FixedDecimal,
    pub approveable: FixedDecimal,
    pub cond_approveable: FixedDecimal,
    pub withdrawable: FixedDecimal,
}

impl ModuleTokenBalance {
    pub fn zero(scale: u8) -> Self {
        Self {
            available: FixedDecimal::zero(scale),
            available_safe: FixedDecimal::zero(scale),
            swap_account: FixedDecimal::zero(scale),
            swap_account_safe: FixedDecimal::zero(scale),
            approveable: FixedDecimal::zero(scale),
            cond_approveable: FixedDecimal::zero(scale),
            withdrawable: FixedDecimal::zero(scale),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.available.is_zero()
            && self.swap_account.is_zero()
            && self.approveable.is_zero()
            && self.cond_approveable.is_zero()
            && self.withdrawable.is_zero()
    }
}

/// One inscribed approve / conditional-approve / withdraw, valid from
/// creation until consumed by its first move (cond-approve is instead
/// consumed by the C7 matcher; see [`crate::cond_approve`]).
#[derive(Clone, Debug)]
pub struct PendingModuleOp {
    pub kind: ModuleOpKind,
    pub module: ModuleId,
    pub ticker: Ticker,
    pub amount: FixedDecimal,
    pub owner: PkScript,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleOpKind {
    Approve,
    CondApprove,
    Withdraw,
}

/// Running per-tick conditional-approve totals. `wait_approve` is derived,
/// never stored.
#[derive(Clone, Debug)]
pub struct ConditionalApproveState {
    pub deposit: FixedDecimal,
    pub new_approve: FixedDecimal,
    pub approve: FixedDecimal,
    pub cancel_approve: FixedDecimal,
}

impl ConditionalApproveState {
    pub fn zero(scale: u8) -> Self {
        Self {
            deposit: FixedDecimal::zero(scale),
            new_approve: FixedDecimal::zero(scale),
            approve: FixedDecimal::zero(scale),
            cancel_approve: FixedDecimal::zero(scale),
        }
    }

    pub fn wait_approve(&self) -> FixedDecimal {
        self.new_approve
            .sub(&self.approve)
            .and_then(|v| v.sub(&self.cancel_approve))
            .expect("cond-approve totals share the tick's decimal scale")
    }
}

/// One pool's reserves, LP supply and last recorded root-k.
#[derive(Clone, Debug)]
pub struct PoolBalance {
    pub tick: [String; 2],
    pub reserves: [FixedDecimal; 2],
    pub lp_supply: FixedDecimal,
    pub last_root_k: FixedDecimal,
}

impl PoolBalance {
    pub fn new(tick0: String, tick1: String, scale0: u8, scale1: u8, lp_scale: u8) -> Self {
        Self {
            tick: [tick0, tick1],
            reserves: [FixedDecimal::zero(scale0), FixedDecimal::zero(scale1)],
            lp_supply: FixedDecimal::zero(lp_scale),
            last_root_k: FixedDecimal::zero(18),
        }
    }

    /// `rootK = sqrt(reserves[0] * reserves[1])`, scale 18 (per
    /// `FixedDecimal::sqrt`'s contract).
    pub fn root_k(&self) -> FixedDecimal {
        self.reserves[0].mul(&self.reserves[1]).sqrt()
    }
}
