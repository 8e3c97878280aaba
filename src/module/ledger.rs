//! [`ModuleLedger`]: per-module swap-account balances, approve / withdraw /
//! conditional-approve lifecycles, and deposits from the base token ledger
//! (C5). Pool reserves and LP balances live here too; the pure AMM math
//! lives in [`super::pool`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};

use crate::context::IndexerContext;
use crate::decimal::FixedDecimal;
use crate::error::{ModuleError, TokenError};
use crate::ids::{CreateIdxKey, InscriptionId, ModuleId, PoolPair, Ticker};
use crate::script::PkScript;
use crate::token::TokenLedger;

use super::state::{ConditionalApproveState, Module, ModuleOpKind, ModuleTokenBalance, PendingModuleOp, PoolBalance};

/// Single owned table keyed by `(module, ticker_lower, pkScript)`, same
/// pattern as `token::ledger::TokenLedger`'s balance table.
type BalanceKey = (ModuleId, String, PkScript);
type PoolKey = (ModuleId, PoolPair);
/// LP holdings keyed by `(module, pair, pkScript)` — a single owned table
/// standing in for the reference's two parallel `lp_by_pool_user` /
/// `lp_by_user_pool` indexes; both views are non-owning range queries over
/// this map (same "single owned table" Design Note the token ledger
/// already follows).
type LpKey = (ModuleId, PoolPair, PkScript);
type CondKey = (ModuleId, String);

#[derive(Clone, Debug)]
pub enum ModuleOpOutcome {
    Valid {
        kind: ModuleOpKind,
        ticker: Ticker,
        amount: FixedDecimal,
    },
    Invalid {
        kind: ModuleOpKind,
        ticker: Ticker,
        requested: FixedDecimal,
    },
}

#[derive(Debug, Default, Clone)]
pub struct ModuleLedger {
    modules: BTreeMap<ModuleId, Module>,
    balances: BTreeMap<BalanceKey, ModuleTokenBalance>,
    valid_ops: BTreeMap<CreateIdxKey, PendingModuleOp>,
    invalid_ops: BTreeMap<CreateIdxKey, PendingModuleOp>,
    pools: BTreeMap<PoolKey, PoolBalance>,
    lp_balances: BTreeMap<LpKey, FixedDecimal>,
    cond_state: BTreeMap<CondKey, ConditionalApproveState>,
}

impl ModuleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ModuleId) -> Option<&Module> {
        self.modules.get(id)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn balance(&self, module: &ModuleId, ticker_lower: &str, owner: &PkScript) -> Option<&ModuleTokenBalance> {
        self.balances.get(&(module.clone(), ticker_lower.to_string(), owner.clone()))
    }

    pub fn users_of<'a>(
        &'a self,
        module: &'a ModuleId,
        ticker_lower: &'a str,
    ) -> impl Iterator<Item = (&'a PkScript, &'a ModuleTokenBalance)> {
        self.balances
            .range((module.clone(), ticker_lower.to_string(), PkScript(Vec::new()))..)
            .take_while(move |((m, t, _), _)| m == module && t == ticker_lower)
            .map(|((_, _, pk), bal)| (pk, bal))
    }

    pub fn pool(&self, module: &ModuleId, pair: &PoolPair) -> Option<&PoolBalance> {
        self.pools.get(&(module.clone(), pair.clone()))
    }

    pub fn pools_of<'a>(&'a self, module: &'a ModuleId) -> impl Iterator<Item = (&'a PoolPair, &'a PoolBalance)> {
        self.pools
            .range((module.clone(), PoolPair::range_start())..)
            .take_while(move |((m, _), _)| m == module)
            .map(|((_, pair), pool)| (pair, pool))
    }

    pub fn lp_balance(&self, module: &ModuleId, pair: &PoolPair, holder: &PkScript) -> FixedDecimal {
        self.lp_balances
            .get(&(module.clone(), pair.clone(), holder.clone()))
            .cloned()
            .unwrap_or_else(|| FixedDecimal::zero(crate::config::LP_SCALE))
    }

    pub fn lp_holders_of<'a>(
        &'a self,
        module: &'a ModuleId,
        pair: &'a PoolPair,
    ) -> impl Iterator<Item = (&'a PkScript, &'a FixedDecimal)> {
        self.lp_balances
            .range((module.clone(), pair.clone(), PkScript(Vec::new()))..)
            .take_while(move |((m, p, _), _)| m == module && p == pair)
            .map(|((_, _, pk), amt)| (pk, amt))
    }

    pub fn cond_state(&self, module: &ModuleId, ticker_lower: &str) -> Option<&ConditionalApproveState> {
        self.cond_state.get(&(module.clone(), ticker_lower.to_string()))
    }

    fn balance_mut(&mut self, module: &ModuleId, ticker_lower: &str, owner: &PkScript, scale: u8) -> &mut ModuleTokenBalance {
        self.balances
            .entry((module.clone(), ticker_lower.to_string(), owner.clone()))
            .or_insert_with(|| ModuleTokenBalance::zero(scale))
    }

    pub(crate) fn cond_state_mut(&mut self, module: &ModuleId, ticker_lower: &str, scale: u8) -> &mut ConditionalApproveState {
        self.cond_state
            .entry((module.clone(), ticker_lower.to_string()))
            .or_insert_with(|| ConditionalApproveState::zero(scale))
    }

    pub(crate) fn pool_mut(&mut self, module: &ModuleId, pair: &PoolPair) -> Option<&mut PoolBalance> {
        self.pools.get_mut(&(module.clone(), pair.clone()))
    }

    pub(crate) fn lp_balance_mut(&mut self, module: &ModuleId, pair: &PoolPair, holder: &PkScript) -> &mut FixedDecimal {
        self.lp_balances
            .entry((module.clone(), pair.clone(), holder.clone()))
            .or_insert_with(|| FixedDecimal::zero(crate::config::LP_SCALE))
    }

    /// Module deploy. `source` and `gas_tick` are validated against `ctx`
    /// and `tokens` respectively; all other fields are recorded verbatim.
    pub fn deploy(
        &mut self,
        ctx: &IndexerContext,
        tokens: &TokenLedger,
        name: &str,
        source: &str,
        sequencer: PkScript,
        gas_to: PkScript,
        fee_to: PkScript,
        gas_tick_raw: &str,
        swap_fee_rate_raw: Option<&str>,
        module_id: ModuleId,
        deployer: PkScript,
        height: u32,
    ) -> Result<ModuleId, ModuleError> {
        let gas_tick = Ticker::parse(gas_tick_raw).map_err(ModuleError::Token)?;
        let lower = gas_tick.lower().to_string();
        tokens
            .get(&lower)
            .ok_or_else(|| ModuleError::UnknownGasTick(lower.clone()))?;

        match ctx.module_swap_source_inscription_id {
            Some(expected) if source.parse::<crate::ids::InscriptionId>().map(|id| id == expected).unwrap_or(false) => {}
            _ => return Err(ModuleError::BadSource),
        }

        let fee_rate_swap = match swap_fee_rate_raw {
            None => 0,
            Some(s) => s.parse::<u64>().map_err(|_| ModuleError::Token(TokenError::BadAmount(s.to_string())))?,
        };
        if fee_rate_swap >= crate::config::RATE_DENOMINATOR {
            return Err(ModuleError::Token(TokenError::BadAmount(swap_fee_rate_raw.unwrap_or("").to_string())));
        }

        let module = Module {
            id: module_id.clone(),
            name: name.to_string(),
            deployer,
            sequencer,
            gas_to,
            fee_to,
            fee_rate_swap,
            gas_tick,
            deploy_height: height,
            commit_id_map: BTreeSet::new(),
            commit_id_chain_map: BTreeSet::new(),
            commit_invalid_map: BTreeSet::new(),
        };

        info!("module deploy: id={} gas_tick={} fee_rate={}", module.id, module.gas_tick, module.fee_rate_swap);
        self.modules.insert(module_id.clone(), module);
        Ok(module_id)
    }

    /// Inscribe-approve / inscribe-cond-approve / inscribe-withdraw. Moves
    /// `amount` out of `available` into the kind-specific sub-balance when
    /// sufficient, else records an invalid (audited, never consumed)
    /// outcome — mirrors `token::ledger::TokenLedger::inscribe_transfer`.
    #[allow(clippy::too_many_arguments)]
    pub fn inscribe_op(
        &mut self,
        ctx: &IndexerContext,
        tokens: &TokenLedger,
        kind: ModuleOpKind,
        module_id: &ModuleId,
        raw_tick: &str,
        raw_amt: &str,
        owner: &PkScript,
        create_idx_key: CreateIdxKey,
        height: u32,
    ) -> Result<ModuleOpOutcome, ModuleError> {
        self.modules
            .get(module_id)
            .ok_or_else(|| ModuleError::UnknownModule(module_id.to_string()))?;

        if kind == ModuleOpKind::Withdraw && !ctx.swap_withdraw_enabled_at(height) {
            return Err(ModuleError::WithdrawNotEnabled(ctx.enable_swap_withdraw_height));
        }

        let ticker = Ticker::parse(raw_tick).map_err(ModuleError::Token)?;
        let lower = ticker.lower().to_string();
        let info = tokens
            .get(&lower)
            .ok_or_else(|| ModuleError::Token(TokenError::UnknownTicker(lower.clone())))?;
        if info.self_mint {
            return Err(ModuleError::SelfMintBypassesModule);
        }
        let scale = info.decimal;
        let max = info.max.clone();

        let amount = FixedDecimal::parse(raw_amt, scale).map_err(|e| ModuleError::Token(TokenError::Decimal(e)))?;
        if amount.sign() <= 0 || amount.cmp_value(&max) == Ordering::Greater {
            return Err(ModuleError::Token(TokenError::BadAmount(raw_amt.to_string())));
        }

        let bal = self.balance_mut(module_id, &lower, owner, scale);
        if bal.available.cmp_value(&amount) != Ordering::Less {
            bal.available = bal.available.sub(&amount).expect("available and amount share scale");
            bal.available_safe = bal
                .available_safe
                .sub(&amount)
                .unwrap_or_else(|_| bal.available_safe.clone());
            match kind {
                ModuleOpKind::Approve => {
                    bal.approveable = bal.approveable.add(&amount).expect("approveable and amount share scale");
                }
                ModuleOpKind::CondApprove => {
                    bal.cond_approveable = bal
                        .cond_approveable
                        .add(&amount)
                        .expect("cond_approveable and amount share scale");
                    let cond = self.cond_state_mut(module_id, &lower, scale);
                    cond.new_approve = cond.new_approve.add(&amount).expect("new_approve and amount share scale");
                }
                ModuleOpKind::Withdraw => {
                    bal.withdrawable = bal.withdrawable.add(&amount).expect("withdrawable and amount share scale");
                }
            }

            let pending = PendingModuleOp {
                kind,
                module: module_id.clone(),
                ticker: ticker.clone(),
                amount: amount.clone(),
                owner: owner.clone(),
            };
            self.valid_ops.insert(create_idx_key, pending);
            debug!("module inscribe-op valid: kind={:?} tick={} amount={}", kind, ticker, amount);
            Ok(ModuleOpOutcome::Valid { kind, ticker, amount })
        } else {
            let pending = PendingModuleOp {
                kind,
                module: module_id.clone(),
                ticker: ticker.clone(),
                amount: amount.clone(),
                owner: owner.clone(),
            };
            self.invalid_ops.insert(create_idx_key, pending);
            warn!("module inscribe-op invalid (insufficient available): kind={:?} tick={} amount={}", kind, ticker, amount);
            Ok(ModuleOpOutcome::Invalid {
                kind,
                ticker,
                requested: amount,
            })
        }
    }

    /// Move of an approve or withdraw inscription. Cond-approve is never
    /// resolved here — it is matched by [`crate::cond_approve`] against
    /// the transfer-move stream instead.
    pub fn process_op_move(
        &mut self,
        tokens: &TokenLedger,
        create_idx_key: CreateIdxKey,
        sender: &PkScript,
        receiver: &PkScript,
        confirmed: bool,
    ) -> Option<PendingModuleOp> {
        let pending = self.valid_ops.remove(&create_idx_key)?;
        if pending.kind == ModuleOpKind::CondApprove {
            self.valid_ops.insert(create_idx_key, pending.clone());
            return Some(pending);
        }

        let module_id = pending.module.clone();
        let lower = pending.ticker.lower().to_string();
        let scale = tokens.get(&lower).map(|t| t.decimal).unwrap_or(0);

        match pending.kind {
            ModuleOpKind::Approve => {
                let from = self.balance_mut(&module_id, &lower, sender, scale);
                from.approveable = from
                    .approveable
                    .sub(&pending.amount)
                    .expect("approveable and pending amount share scale");
                let to = self.balance_mut(&module_id, &lower, receiver, scale);
                to.swap_account = to
                    .swap_account
                    .add(&pending.amount)
                    .expect("swap_account and pending amount share scale");
                if confirmed {
                    to.swap_account_safe = to
                        .swap_account_safe
                        .add(&pending.amount)
                        .expect("swap_account_safe and pending amount share scale");
                }
                let cond = self.cond_state_mut(&module_id, &lower, scale);
                cond.approve = cond.approve.add(&pending.amount).expect("approve and pending amount share scale");
            }
            ModuleOpKind::Withdraw => {
                let from = self.balance_mut(&module_id, &lower, sender, scale);
                from.withdrawable = from
                    .withdrawable
                    .sub(&pending.amount)
                    .expect("withdrawable and pending amount share scale");
                let to = self.balance_mut(&module_id, &lower, receiver, scale);
                to.available = to
                    .available
                    .add(&pending.amount)
                    .expect("available and pending amount share scale");
                if confirmed {
                    to.available_safe = to
                        .available_safe
                        .add(&pending.amount)
                        .expect("available_safe and pending amount share scale");
                }
            }
            ModuleOpKind::CondApprove => unreachable!("handled above"),
        }

        Some(pending)
    }

    /// Live (un-exhausted) cond-approve at `create_idx_key`, if any.
    pub fn peek_cond_approve(&self, create_idx_key: CreateIdxKey) -> Option<PendingModuleOp> {
        self.valid_ops
            .get(&create_idx_key)
            .filter(|p| p.kind == ModuleOpKind::CondApprove)
            .cloned()
    }

    /// Decrement a live cond-approve's remaining balance by `consumed`,
    /// dropping it once exhausted. Returns `false` if `create_idx_key` does
    /// not name a live cond-approve (already exhausted, or never one).
    pub(crate) fn consume_cond_approve(&mut self, create_idx_key: CreateIdxKey, consumed: &FixedDecimal) -> bool {
        let Some(pending) = self.valid_ops.get_mut(&create_idx_key) else {
            return false;
        };
        if pending.kind != ModuleOpKind::CondApprove {
            return false;
        }
        pending.amount = pending
            .amount
            .sub(consumed)
            .expect("cond-approve running balance and consumed amount share scale");
        if pending.amount.is_zero() {
            self.valid_ops.remove(&create_idx_key);
        }
        true
    }

    /// Debit `cond_approveable` for `ticker`. Used only by the C7 matcher,
    /// which has already checked sufficiency via the pending record itself.
    pub(crate) fn debit_cond_approveable(&mut self, module: &ModuleId, ticker_lower: &str, scale: u8, owner: &PkScript, amount: &FixedDecimal) {
        let bal = self.balance_mut(module, ticker_lower, owner, scale);
        bal.cond_approveable = bal
            .cond_approveable
            .sub(amount)
            .expect("cond_approveable and amount share scale");
    }

    /// Deposit from a base-ledger transfer-move whose receiver pkScript
    /// decodes to this module: credits `swap_account` directly (no
    /// inscribe/move lifecycle of its own).
    pub fn deposit(&mut self, module_id: &ModuleId, ticker_lower: &str, scale: u8, owner: &PkScript, amount: &FixedDecimal, confirmed: bool) {
        let bal = self.balance_mut(module_id, ticker_lower, owner, scale);
        bal.swap_account = bal.swap_account.add(amount).expect("swap_account and deposit amount share scale");
        if confirmed {
            bal.swap_account_safe = bal
                .swap_account_safe
                .add(amount)
                .expect("swap_account_safe and deposit amount share scale");
        }
        let cond = self.cond_state_mut(module_id, ticker_lower, scale);
        cond.deposit = cond.deposit.add(amount).expect("deposit and amount share scale");
    }

    /// Deploy a new, empty pool. Rejects if the pair already exists.
    pub fn deploy_pool(&mut self, module_id: &ModuleId, pair: PoolPair, scale0: u8, scale1: u8) -> Result<(), ModuleError> {
        let key = (module_id.clone(), pair.clone());
        if self.pools.contains_key(&key) {
            return Err(ModuleError::DuplicatePool(pair.to_string()));
        }
        self.pools.insert(
            key,
            PoolBalance::new(pair.tick0.clone(), pair.tick1.clone(), scale0, scale1, crate::config::LP_SCALE),
        );
        info!("swap deploy-pool: module={} pair={}", module_id, pair);
        Ok(())
    }

    /// Debit `swap_account` for `ticker`, erroring if insufficient.
    pub(crate) fn debit_swap_account(
        &mut self,
        module_id: &ModuleId,
        ticker_lower: &str,
        scale: u8,
        owner: &PkScript,
        amount: &FixedDecimal,
    ) -> Result<(), ModuleError> {
        let bal = self.balance_mut(module_id, ticker_lower, owner, scale);
        if bal.swap_account.cmp_value(amount) == Ordering::Less {
            return Err(ModuleError::InsufficientBalance {
                need: amount.to_string(),
                have: bal.swap_account.to_string(),
            });
        }
        bal.swap_account = bal.swap_account.sub(amount).expect("swap_account and amount share scale");
        Ok(())
    }

    pub(crate) fn credit_swap_account(&mut self, module_id: &ModuleId, ticker_lower: &str, scale: u8, owner: &PkScript, amount: &FixedDecimal) {
        let bal = self.balance_mut(module_id, ticker_lower, owner, scale);
        bal.swap_account = bal.swap_account.add(amount).expect("swap_account and amount share scale");
    }

    pub(crate) fn credit_available(&mut self, module_id: &ModuleId, ticker_lower: &str, scale: u8, owner: &PkScript, amount: &FixedDecimal) {
        let bal = self.balance_mut(module_id, ticker_lower, owner, scale);
        bal.available = bal.available.add(amount).expect("available and amount share scale");
    }

    /// `true` iff `id` has already been accepted into `module`'s commit
    /// chain through its own move.
    pub(crate) fn commit_accepted(&self, module_id: &ModuleId, id: &InscriptionId) -> bool {
        self.modules.get(module_id).map(|m| m.commit_id_map.contains(id)).unwrap_or(false)
    }

    /// `true` iff `id` has already been consumed as some other accepted
    /// commit's parent (no sibling may reuse the edge).
    pub(crate) fn commit_chain_consumed(&self, module_id: &ModuleId, id: &InscriptionId) -> bool {
        self.modules.get(module_id).map(|m| m.commit_id_chain_map.contains(id)).unwrap_or(false)
    }

    /// Record `id` as accepted and, if present, consume `parent`'s chain
    /// edge. Only called after a commit's own move re-verified clean.
    pub(crate) fn mark_commit_accepted(&mut self, module_id: &ModuleId, id: InscriptionId, parent: Option<InscriptionId>) {
        if let Some(m) = self.modules.get_mut(module_id) {
            m.commit_id_map.insert(id);
            if let Some(p) = parent {
                m.commit_id_chain_map.insert(p);
            }
        }
    }

    /// Record `id` as seen-but-rejected, retained for audit and never
    /// retried.
    pub(crate) fn mark_commit_invalid(&mut self, module_id: &ModuleId, id: InscriptionId) {
        if let Some(m) = self.modules.get_mut(module_id) {
            m.commit_invalid_map.insert(id);
        }
    }

    /// Clear a preset invalid marker once `id` has verified clean — the
    /// commit engine presets every seen commit invalid before checking it,
    /// the same way `state.rs`'s doc comment describes.
    pub(crate) fn unmark_commit_invalid(&mut self, module_id: &ModuleId, id: &InscriptionId) {
        if let Some(m) = self.modules.get_mut(module_id) {
            m.commit_invalid_map.remove(id);
        }
    }

    /// A structural deep-copy restricted to exactly the balance, pool, LP
    /// and cond-approve entries a commit batch's functions touch. `user_keys`
    /// / `pool_pairs` / `lp_keys` are gathered by [`crate::commit`] from the
    /// batch's parsed functions before this is called. The returned
    /// `ModuleLedger` carries `module`'s own [`Module`] record (needed for
    /// `gas_to`/`fee_to`/`sequencer` lookups) but none of any other
    /// module's state. The commit engine's two-phase apply runs the batch
    /// once against this throwaway copy to verify it and, only if that
    /// succeeds, runs the same function list again against the live
    /// ledger — no merge-back step, so the copy is simply dropped after use.
    pub fn cherry_pick(
        &self,
        module_id: &ModuleId,
        user_keys: &BTreeSet<(String, PkScript)>,
        pool_pairs: &BTreeSet<PoolPair>,
        lp_keys: &BTreeSet<(PoolPair, PkScript)>,
    ) -> ModuleLedger {
        let mut out = ModuleLedger::new();
        if let Some(m) = self.modules.get(module_id) {
            out.modules.insert(module_id.clone(), m.clone());
        }
        for (tick, pk) in user_keys {
            let key = (module_id.clone(), tick.clone(), pk.clone());
            if let Some(bal) = self.balances.get(&key) {
                out.balances.insert(key, bal.clone());
            }
            let cond_key = (module_id.clone(), tick.clone());
            if let Some(cond) = self.cond_state.get(&cond_key) {
                out.cond_state.insert(cond_key, cond.clone());
            }
        }
        for pair in pool_pairs {
            let key = (module_id.clone(), pair.clone());
            if let Some(pool) = self.pools.get(&key) {
                out.pools.insert(key, pool.clone());
            }
        }
        for (pair, pk) in lp_keys {
            let key = (module_id.clone(), pair.clone(), pk.clone());
            if let Some(lp) = self.lp_balances.get(&key) {
                out.lp_balances.insert(key, lp.clone());
            }
        }
        out
    }
}
