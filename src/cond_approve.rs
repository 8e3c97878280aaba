//! C7: the conditional-approve matcher.
//!
//! A single host-chain transaction can carry both ordinary transfer-moves
//! and conditional-approve moves in any order. Within one transaction they
//! are matched against each other greedily and in arrival order: a
//! transfer looks for already-buffered approves addressed to its receiver,
//! an approve looks for already-buffered transfers addressed to it, and
//! whatever is left over after matching is buffered for the rest of the
//! transaction. Buffers are cleared whenever a new txid is observed.
//!
//! Matching mutates [`ModuleLedger`] balances directly: the approve
//! owner's `cond_approveable` is debited and the transfer sender's
//! `swap_account` is credited by the matched amount.

use crate::decimal::FixedDecimal;
use crate::ids::{CreateIdxKey, ModuleId};
use crate::module::ledger::ModuleLedger;
use crate::script::PkScript;
use crate::token::TokenLedger;

/// One matched unit of conditional-approve liquidity.
#[derive(Clone, Debug)]
pub struct CondApproveEvent {
    pub module: ModuleId,
    pub tick_lower: String,
    /// The transfer's sender, credited `swap_account`.
    pub from: PkScript,
    /// The approve's owner, debited `cond_approveable`.
    pub owner: PkScript,
    pub amount: FixedDecimal,
    /// `true` when `from == owner` (an approve owner matching their own
    /// transfer): recorded as a cancellation rather than a genuine approve.
    pub self_matched: bool,
}

#[derive(Clone, Debug)]
struct BufferedTransfer {
    tick_lower: String,
    scale: u8,
    from: PkScript,
    to: PkScript,
    remaining: FixedDecimal,
}

#[derive(Clone, Debug)]
struct BufferedApprove {
    module: ModuleId,
    tick_lower: String,
    scale: u8,
    owner: PkScript,
    create_idx_key: CreateIdxKey,
    remaining: FixedDecimal,
}

/// Per-transaction matcher state. One instance lives for the whole
/// indexing run; it resets its buffers whenever it sees a new txid.
#[derive(Debug, Default)]
pub struct CondApproveMatcher {
    txid: Option<[u8; 32]>,
    transfers: Vec<BufferedTransfer>,
    approves: Vec<BufferedApprove>,
}

impl CondApproveMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset_if_new_tx(&mut self, txid: [u8; 32]) {
        if self.txid != Some(txid) {
            self.txid = Some(txid);
            self.transfers.clear();
            self.approves.clear();
        }
    }

    /// Feed an ordinary BRC-20 transfer-move. Only called when the
    /// dispatcher has determined the ticker is not self-mint and the
    /// current height is below `ENABLE_SWAP_WITHDRAW_HEIGHT` (C7 is
    /// retired once direct swap withdrawals are enabled).
    #[allow(clippy::too_many_arguments)]
    pub fn on_transfer(
        &mut self,
        modules: &mut ModuleLedger,
        txid: [u8; 32],
        tick_lower: &str,
        scale: u8,
        from: PkScript,
        to: PkScript,
        amount: FixedDecimal,
    ) -> Vec<CondApproveEvent> {
        self.reset_if_new_tx(txid);

        let mut remaining = amount;
        let mut events = Vec::new();

        let mut i = 0;
        while i < self.approves.len() {
            if remaining.is_zero() {
                break;
            }
            if self.approves[i].tick_lower != tick_lower || self.approves[i].owner != to {
                i += 1;
                continue;
            }

            let consumed = fd_min(&remaining, &self.approves[i].remaining);
            let event = CondApproveEvent {
                module: self.approves[i].module.clone(),
                tick_lower: tick_lower.to_string(),
                from: from.clone(),
                owner: self.approves[i].owner.clone(),
                amount: consumed.clone(),
                self_matched: from == self.approves[i].owner,
            };
            apply_event(modules, &event);

            remaining = remaining.sub(&consumed).expect("remaining and consumed share scale");
            self.approves[i].remaining = self.approves[i]
                .remaining
                .sub(&consumed)
                .expect("buffered approve remaining and consumed share scale");
            modules.consume_cond_approve(self.approves[i].create_idx_key, &consumed);

            events.push(event);

            if self.approves[i].remaining.is_zero() {
                self.approves.remove(i);
            } else {
                i += 1;
            }
        }

        if !remaining.is_zero() {
            self.transfers.push(BufferedTransfer {
                tick_lower: tick_lower.to_string(),
                scale,
                from,
                to,
                remaining,
            });
        }

        events
    }

    /// Feed a conditional-approve move: `create_idx_key` must name a live
    /// cond-approve inscribe in `modules`. Returns an empty vector (no-op)
    /// if it does not (already exhausted, or not a cond-approve at all).
    pub fn on_cond_approve_move(
        &mut self,
        modules: &mut ModuleLedger,
        tokens: &TokenLedger,
        txid: [u8; 32],
        create_idx_key: CreateIdxKey,
    ) -> Vec<CondApproveEvent> {
        self.reset_if_new_tx(txid);

        let Some(pending) = modules.peek_cond_approve(create_idx_key) else {
            return Vec::new();
        };
        let tick_lower = pending.ticker.lower().to_string();
        let scale = tokens.get(&tick_lower).map(|t| t.decimal).unwrap_or(0);
        let mut remaining = pending.amount;
        let mut events = Vec::new();

        let mut i = 0;
        while i < self.transfers.len() {
            if remaining.is_zero() {
                break;
            }
            if self.transfers[i].tick_lower != tick_lower || self.transfers[i].to != pending.owner {
                i += 1;
                continue;
            }

            let consumed = fd_min(&remaining, &self.transfers[i].remaining);
            let event = CondApproveEvent {
                module: pending.module.clone(),
                tick_lower: tick_lower.clone(),
                from: self.transfers[i].from.clone(),
                owner: pending.owner.clone(),
                amount: consumed.clone(),
                self_matched: self.transfers[i].from == pending.owner,
            };
            apply_event(modules, &event);

            remaining = remaining.sub(&consumed).expect("remaining and consumed share scale");
            self.transfers[i].remaining = self.transfers[i]
                .remaining
                .sub(&consumed)
                .expect("buffered transfer remaining and consumed share scale");
            modules.consume_cond_approve(create_idx_key, &consumed);

            events.push(event);

            if self.transfers[i].remaining.is_zero() {
                self.transfers.remove(i);
            } else {
                i += 1;
            }
        }

        if !remaining.is_zero() {
            self.approves.push(BufferedApprove {
                module: pending.module,
                tick_lower,
                scale,
                owner: pending.owner,
                create_idx_key,
                remaining,
            });
        }

        events
    }
}

fn apply_event(modules: &mut ModuleLedger, event: &CondApproveEvent) {
    modules.debit_cond_approveable(&event.module, &event.tick_lower, event.amount.scale(), &event.owner, &event.amount);
    modules.credit_swap_account(&event.module, &event.tick_lower, event.amount.scale(), &event.from, &event.amount);
    let cond = modules.cond_state_mut(&event.module, &event.tick_lower, event.amount.scale());
    if event.self_matched {
        cond.cancel_approve = cond
            .cancel_approve
            .add(&event.amount)
            .expect("cancel_approve and event amount share scale");
    } else {
        cond.approve = cond.approve.add(&event.amount).expect("approve and event amount share scale");
    }
}

fn fd_min(a: &FixedDecimal, b: &FixedDecimal) -> FixedDecimal {
    if a.cmp_value(b) == std::cmp::Ordering::Greater {
        b.clone()
    } else {
        a.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::IndexerContext;
    use crate::ids::InscriptionId;
    use crate::module::state::ModuleOpKind;
    use crate::token::TokenLedger;

    fn pk(b: u8) -> PkScript {
        PkScript(vec![b])
    }

    fn setup() -> (ModuleLedger, TokenLedger, ModuleId) {
        let module_id = InscriptionId::new([1u8; 32], 0);
        let ctx = IndexerContext {
            module_swap_source_inscription_id: Some(module_id.clone()),
            ..IndexerContext::default()
        };
        let mut tokens = TokenLedger::new();
        tokens
            .deploy(&ctx, "ordi", "21000000", None, Some("18"), None, InscriptionId::new([9u8; 32], 0), 1)
            .unwrap();
        let mut modules = ModuleLedger::new();
        modules
            .deploy(
                &ctx,
                &tokens,
                "swap",
                &module_id.to_string(),
                pk(0xA0),
                pk(0xA1),
                pk(0xA2),
                "ordi",
                None,
                module_id.clone(),
                pk(0xA3),
                1,
            )
            .unwrap();
        (modules, tokens, module_id)
    }

    fn seed_cond_approve(modules: &mut ModuleLedger, tokens: &TokenLedger, module_id: &ModuleId, owner: &PkScript, amount: &str, key: CreateIdxKey) {
        modules.credit_available(module_id, "ordi", 18, owner, &FixedDecimal::parse(amount, 18).unwrap());
        let ctx = IndexerContext::default();
        let outcome = modules
            .inscribe_op(&ctx, tokens, ModuleOpKind::CondApprove, module_id, "ordi", amount, owner, key, 5)
            .unwrap();
        assert!(matches!(outcome, crate::module::ledger::ModuleOpOutcome::Valid { .. }));
    }

    #[test]
    fn transfer_then_approve_matches_in_full() {
        let (mut modules, tokens, module_id) = setup();
        let alice = pk(1);
        let bob = pk(2);
        let txid = [7u8; 32];

        let mut matcher = CondApproveMatcher::new();
        let events = matcher.on_transfer(
            &mut modules,
            txid,
            "ordi",
            18,
            alice.clone(),
            bob.clone(),
            FixedDecimal::parse("100", 18).unwrap(),
        );
        assert!(events.is_empty());

        seed_cond_approve(&mut modules, &tokens, &module_id, &bob, "100", CreateIdxKey::new(6, 0));

        let events = matcher.on_cond_approve_move(&mut modules, &tokens, txid, CreateIdxKey::new(6, 0));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].amount.to_string(), "100");
        assert_eq!(events[0].from, alice);
        assert_eq!(events[0].owner, bob);
        assert!(!events[0].self_matched);

        assert!(modules.peek_cond_approve(CreateIdxKey::new(6, 0)).is_none());
    }

    #[test]
    fn approve_then_transfer_partial_match_leaves_remainder() {
        let (mut modules, tokens, module_id) = setup();
        let alice = pk(1);
        let bob = pk(2);
        let txid = [8u8; 32];

        seed_cond_approve(&mut modules, &tokens, &module_id, &bob, "40", CreateIdxKey::new(6, 0));

        let mut matcher = CondApproveMatcher::new();
        let events = matcher.on_cond_approve_move(&mut modules, &tokens, txid, CreateIdxKey::new(6, 0));
        assert!(events.is_empty());

        let events = matcher.on_transfer(
            &mut modules,
            txid,
            "ordi",
            18,
            alice.clone(),
            bob.clone(),
            FixedDecimal::parse("100", 18).unwrap(),
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].amount.to_string(), "40");
        // 60 left over, buffered as a transfer for the rest of the tx.
        assert_eq!(matcher.transfers.len(), 1);
        assert_eq!(matcher.transfers[0].remaining.to_string(), "60");
    }

    #[test]
    fn new_txid_clears_buffers() {
        let (mut modules, _tokens, _module_id) = setup();
        let alice = pk(1);
        let bob = pk(2);

        let mut matcher = CondApproveMatcher::new();
        matcher.on_transfer(
            &mut modules,
            [1u8; 32],
            "ordi",
            18,
            alice,
            bob,
            FixedDecimal::parse("100", 18).unwrap(),
        );
        assert_eq!(matcher.transfers.len(), 1);

        matcher.reset_if_new_tx([2u8; 32]);
        assert!(matcher.transfers.is_empty());
    }
}
