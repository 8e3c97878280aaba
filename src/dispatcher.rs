//! Single-threaded event dispatcher (C8): consumes the ordered event stream
//! and routes each event to the base token ledger (C4), the swap-module
//! ledger (C5), the conditional-approve matcher (C7) and the commit engine
//! (C6), enforcing the `TICKS_ENABLED` allow-list and the "valid only until
//! its first move" rule every `CreateIdxKey`-keyed pending record depends
//! on.
//!
//! `RawEvent` carries only the event's own pkScript (the current location
//! after a move, or the initial owner at creation) — never the previous
//! holder a move came from. [`Dispatcher::current_holder`] is this crate's
//! own bookkeeping to recover a move's sender: it is not part of any
//! upstream wire format, just the dispatcher's private join table.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::cond_approve::CondApproveMatcher;
use crate::commit::sig::SignatureVerifier;
use crate::commit::CommitStore;
use crate::context::IndexerContext;
use crate::error::{CommitError, IndexerError};
use crate::event::{decode_payload, looks_like_json, Operation, PayloadError, RawEvent};
use crate::ids::{CreateIdxKey, InscriptionId, ModuleId};
use crate::module::{ModuleLedger, ModuleOpKind};
use crate::script::{AddressCodec, PkScript};
use crate::token::TokenLedger;

/// Counters returned by [`Dispatcher::finish`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub events_processed: u64,
    pub events_dropped: u64,
    pub zero_balance_holders_swept: usize,
}

/// Drives the whole indexer from one ordered event stream. Generic over
/// the address codec and signature verifier so the CLI binary can wire in
/// real implementations while tests use the stub ones.
pub struct Dispatcher<C: AddressCodec, V: SignatureVerifier> {
    ctx: IndexerContext,
    codec: C,
    verifier: V,
    tokens: TokenLedger,
    modules: ModuleLedger,
    commits: CommitStore,
    cond_approve: CondApproveMatcher,
    current_holder: BTreeMap<CreateIdxKey, PkScript>,
    events_processed: u64,
    events_dropped: u64,
}

impl<C: AddressCodec, V: SignatureVerifier> Dispatcher<C, V> {
    pub fn new(ctx: IndexerContext, codec: C, verifier: V) -> Self {
        Self {
            ctx,
            codec,
            verifier,
            tokens: TokenLedger::new(),
            modules: ModuleLedger::new(),
            commits: CommitStore::new(),
            cond_approve: CondApproveMatcher::new(),
            current_holder: BTreeMap::new(),
            events_processed: 0,
            events_dropped: 0,
        }
    }

    pub fn ctx(&self) -> &IndexerContext {
        &self.ctx
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn tokens(&self) -> &TokenLedger {
        &self.tokens
    }

    pub fn modules(&self) -> &ModuleLedger {
        &self.modules
    }

    /// Feed one event. Never panics and never aborts the stream: every
    /// failure is logged and the offending event is dropped, exactly as
    /// every ledger method it calls already does for state it manages
    /// itself.
    pub fn process_event(&mut self, event: &RawEvent) {
        self.events_processed += 1;
        if event.is_transfer() {
            self.process_move(event);
        } else {
            self.process_creation(event);
        }
    }

    /// End-of-stream housekeeping: sweep zero-balance holders and report
    /// final counters.
    pub fn finish(&mut self) -> Summary {
        let swept = self.tokens.sweep_zero_balances();
        info!(
            "dispatcher finished: processed={} dropped={} swept={}",
            self.events_processed, self.events_dropped, swept
        );
        Summary {
            events_processed: self.events_processed,
            events_dropped: self.events_dropped,
            zero_balance_holders_swept: swept,
        }
    }

    fn check_ticker_allowed(&self, raw_tick: &str) -> Result<(), IndexerError> {
        let lower = raw_tick.to_ascii_lowercase();
        if self.ctx.ticker_allowed(&lower) {
            Ok(())
        } else {
            Err(IndexerError::DisabledTicker(lower))
        }
    }

    fn resolve_address(&self, addr: &str) -> Result<PkScript, IndexerError> {
        self.codec
            .address_to_script(addr)
            .ok_or_else(|| IndexerError::Payload(PayloadError::Malformed(format!("bad address `{}`", addr))))
    }

    fn process_creation(&mut self, event: &RawEvent) {
        self.current_holder
            .insert(event.create_idx_key, event.pk_script.clone());

        if event.satoshi == 0 {
            debug!("dropping zero-sat inscription at {}", event.create_idx_key);
            self.events_dropped += 1;
            return;
        }
        if !looks_like_json(&event.content) {
            // An ordinary, non-protocol inscription: not an error.
            return;
        }

        let op = match decode_payload(&event.content) {
            Ok(op) => op,
            Err(e) => {
                debug!("dropping unparsable protocol body at {}: {}", event.create_idx_key, e);
                self.events_dropped += 1;
                return;
            }
        };

        let inscription_id = InscriptionId::new(event.txid, event.idx);

        let result = match op {
            Operation::Deploy(p) => self.check_ticker_allowed(&p.tick).and_then(|_| {
                self.tokens
                    .deploy(
                        &self.ctx,
                        &p.tick,
                        &p.max,
                        p.lim.as_deref(),
                        p.dec.as_deref(),
                        p.self_mint.as_deref(),
                        inscription_id,
                        event.height,
                    )
                    .map(|_| ())
                    .map_err(IndexerError::from)
            }),
            Operation::Mint(p) => self.check_ticker_allowed(&p.tick).and_then(|_| {
                self.tokens
                    .mint(
                        &self.ctx,
                        &p.tick,
                        &p.amt,
                        &event.pk_script,
                        event.create_idx_key,
                        event.height,
                        event.block_time,
                        event.parent,
                    )
                    .map(|_| ())
                    .map_err(IndexerError::from)
            }),
            Operation::Transfer(p) => self.check_ticker_allowed(&p.tick).and_then(|_| {
                self.tokens
                    .inscribe_transfer(
                        &self.ctx,
                        &p.tick,
                        &p.amt,
                        &event.pk_script,
                        event.create_idx_key,
                        event.inscr_number,
                        event.height,
                        event.tx_idx,
                    )
                    .map(|_| ())
                    .map_err(IndexerError::from)
            }),
            Operation::ModuleDeploy(p) => self.check_ticker_allowed(&p.init.gas_tick).and_then(|_| {
                let sequencer = self.resolve_address(&p.init.sequencer)?;
                let gas_to = self.resolve_address(&p.init.gas_to)?;
                let fee_to = self.resolve_address(&p.init.fee_to)?;
                self.modules
                    .deploy(
                        &self.ctx,
                        &self.tokens,
                        &p.name,
                        &p.source,
                        sequencer,
                        gas_to,
                        fee_to,
                        &p.init.gas_tick,
                        p.init.swap_fee_rate.as_deref(),
                        inscription_id,
                        event.pk_script.clone(),
                        event.height,
                    )
                    .map(|_| ())
                    .map_err(IndexerError::from)
            }),
            Operation::ModuleWithdraw(p) => {
                self.handle_module_op(event, ModuleOpKind::Withdraw, &p.module, &p.tick, &p.amt)
            }
            Operation::Approve(p) => self.handle_module_op(event, ModuleOpKind::Approve, &p.module, &p.tick, &p.amt),
            Operation::CondApprove(p) => {
                self.handle_module_op(event, ModuleOpKind::CondApprove, &p.module, &p.tick, &p.amt)
            }
            Operation::Commit(p) => {
                let raw_body = event.content.clone();
                self.commits
                    .inscribe(
                        &self.ctx,
                        &self.tokens,
                        &mut self.modules,
                        &self.codec,
                        &self.verifier,
                        event.height,
                        event.create_idx_key,
                        inscription_id,
                        &event.pk_script,
                        &raw_body,
                        &p,
                    )
                    .map_err(IndexerError::from)
            }
        };

        if let Err(e) = result {
            warn!("dropping event at {}: {}", event.create_idx_key, e);
            self.events_dropped += 1;
        }
    }

    fn handle_module_op(
        &mut self,
        event: &RawEvent,
        kind: ModuleOpKind,
        module_str: &str,
        raw_tick: &str,
        raw_amt: &str,
    ) -> Result<(), IndexerError> {
        self.check_ticker_allowed(raw_tick)?;
        let module_id: ModuleId = module_str
            .parse()
            .map_err(|_| IndexerError::Payload(PayloadError::Malformed(format!("bad module id `{}`", module_str))))?;
        self.modules
            .inscribe_op(
                &self.ctx,
                &self.tokens,
                kind,
                &module_id,
                raw_tick,
                raw_amt,
                &event.pk_script,
                event.create_idx_key,
                event.height,
            )
            .map(|_| ())
            .map_err(IndexerError::from)
    }

    fn process_move(&mut self, event: &RawEvent) {
        let sender = self
            .current_holder
            .get(&event.create_idx_key)
            .cloned()
            .unwrap_or_else(|| event.pk_script.clone());
        let receiver = event.pk_script.clone();
        self.current_holder.insert(event.create_idx_key, receiver.clone());

        // Every pending record this dispatcher resolves (transfer,
        // approve/withdraw, cond-approve, commit) is valid only from
        // creation until its *first* move; a later move of the same
        // inscription carries no further protocol effect, and replaying
        // it would double-count (e.g. re-emit a Send history entry for an
        // already-resolved transfer).
        if event.sequence != 1 {
            return;
        }
        if event.satoshi == 0 {
            debug!("dropping zero-sat move at {}", event.create_idx_key);
            return;
        }

        let confirmed = event.is_confirmed();

        if self.modules.peek_cond_approve(event.create_idx_key).is_some() {
            self.cond_approve
                .on_cond_approve_move(&mut self.modules, &self.tokens, event.txid, event.create_idx_key);
            return;
        }

        let outcome = self.tokens.process_transfer_move(
            &self.ctx,
            event.create_idx_key,
            &sender,
            &receiver,
            event.satoshi,
            confirmed,
            event.height,
        );
        if let Some(ticker) = &outcome.ticker {
            if outcome.applied {
                let lower = ticker.lower().to_string();
                let scale = self.tokens.get(&lower).map(|t| t.decimal).unwrap_or(0);

                if !outcome.self_mint && !self.ctx.swap_withdraw_enabled_at(event.height) {
                    self.cond_approve.on_transfer(
                        &mut self.modules,
                        event.txid,
                        &lower,
                        scale,
                        sender.clone(),
                        receiver.clone(),
                        outcome.amount.clone(),
                    );
                }

                if !outcome.self_mint {
                    if let Some(module_id) = receiver.as_module_commitment() {
                        if self.modules.get(&module_id).is_some() {
                            self.modules
                                .deposit(&module_id, &lower, scale, &sender, &outcome.amount, confirmed);
                        }
                    }
                }
            }
            return;
        }

        if self
            .modules
            .process_op_move(&self.tokens, event.create_idx_key, &sender, &receiver, confirmed)
            .is_some()
        {
            return;
        }

        match self
            .commits
            .apply_move(&self.tokens, &mut self.modules, event.create_idx_key, &sender, &receiver)
        {
            Ok(_) => {}
            Err(CommitError::MissingCommitBody(_)) => {
                // create_idx_key belongs to none of the four subsystems:
                // an ordinary, non-protocol inscription move.
            }
            Err(e) => {
                warn!("commit move rejected at {}: {}", event.create_idx_key, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::sig::StubVerifier;
    use crate::script::NullAddressCodec;

    fn pk(b: u8) -> PkScript {
        PkScript(vec![b])
    }

    fn creation(height: u32, idx: u64, owner: PkScript, content: &str) -> RawEvent {
        RawEvent {
            sequence: 0,
            txid: [idx as u8; 32],
            idx: 0,
            vout: 0,
            offset: 0,
            satoshi: 1,
            pk_script: owner,
            inscr_number: idx as i64,
            content: content.as_bytes().to_vec(),
            create_idx_key: CreateIdxKey::new(height, idx),
            height,
            tx_idx: 0,
            block_time: 100,
            parent: None,
        }
    }

    fn mv(create_idx_key: CreateIdxKey, receiver: PkScript, txid: [u8; 32], height: u32) -> RawEvent {
        RawEvent {
            sequence: 1,
            txid,
            idx: 0,
            vout: 0,
            offset: 0,
            satoshi: 1,
            pk_script: receiver,
            inscr_number: 0,
            content: Vec::new(),
            create_idx_key,
            height,
            tx_idx: 0,
            block_time: 100,
            parent: None,
        }
    }

    #[test]
    fn deploy_mint_transfer_through_dispatcher() {
        let mut d = Dispatcher::new(IndexerContext::default(), NullAddressCodec::default(), StubVerifier);

        let deploy = creation(
            1,
            0,
            pk(0xD0),
            r#"{"p":"brc-20","op":"deploy","tick":"ordi","max":"1000","lim":"1000"}"#,
        );
        d.process_event(&deploy);
        assert!(d.tokens().get("ordi").is_some());

        let alice = pk(0xA0);
        let mint = creation(2, 0, alice.clone(), r#"{"p":"brc-20","op":"mint","tick":"ordi","amt":"100"}"#);
        d.process_event(&mint);
        assert_eq!(d.tokens().balance("ordi", &alice).unwrap().available.to_string(), "100");

        let transfer_key = CreateIdxKey::new(3, 0);
        let inscribe_transfer = creation(3, 0, alice.clone(), r#"{"p":"brc-20","op":"transfer","tick":"ordi","amt":"40"}"#);
        d.process_event(&inscribe_transfer);

        let bob = pk(0xB0);
        let move_event = mv(transfer_key, bob.clone(), [0xAB; 32], 4);
        d.process_event(&move_event);

        assert_eq!(d.tokens().balance("ordi", &bob).unwrap().available.to_string(), "40");
        assert_eq!(d.tokens().balance("ordi", &alice).unwrap().available.to_string(), "60");

        let summary = d.finish();
        assert_eq!(summary.events_processed, 4);
    }

    #[test]
    fn disabled_ticker_is_dropped() {
        let mut ctx = IndexerContext::default();
        ctx.ticks_enabled.insert("ordi".to_string());
        let mut d = Dispatcher::new(ctx, NullAddressCodec::default(), StubVerifier);
        let deploy = creation(1, 0, pk(0xD0), r#"{"p":"brc-20","op":"deploy","tick":"xxxx","max":"1000"}"#);
        d.process_event(&deploy);
        assert!(d.tokens().get("xxxx").is_none());

        let summary = d.finish();
        assert_eq!(summary.events_dropped, 1);
    }

    #[test]
    fn second_move_of_a_transfer_has_no_further_effect() {
        let mut d = Dispatcher::new(IndexerContext::default(), NullAddressCodec::default(), StubVerifier);
        d.process_event(&creation(
            1,
            0,
            pk(0xD0),
            r#"{"p":"brc-20","op":"deploy","tick":"ordi","max":"1000","lim":"1000"}"#,
        ));
        let alice = pk(0xA0);
        d.process_event(&creation(2, 0, alice.clone(), r#"{"p":"brc-20","op":"mint","tick":"ordi","amt":"100"}"#));
        let key = CreateIdxKey::new(3, 0);
        d.process_event(&creation(3, 0, alice.clone(), r#"{"p":"brc-20","op":"transfer","tick":"ordi","amt":"40"}"#));

        let bob = pk(0xB0);
        let mut first_move = mv(key, bob.clone(), [1u8; 32], 4);
        first_move.sequence = 1;
        d.process_event(&first_move);

        let carol = pk(0xC0);
        let mut second_move = mv(key, carol.clone(), [1u8; 32], 5);
        second_move.sequence = 2;
        d.process_event(&second_move);

        assert_eq!(d.tokens().balance("ordi", &bob).unwrap().available.to_string(), "40");
        assert!(d.tokens().balance("ordi", &carol).is_none());
    }
}
