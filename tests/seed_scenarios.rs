//! Integration coverage for the six worked scenarios this crate's ledgers
//! are specified against, driven entirely through the crate's public API
//! (mirroring how `dispatcher.rs`'s and `commit/mod.rs`'s own inline tests
//! are built) so this file only ever exercises what a real caller could.

use brc20_swap_indexer::cond_approve::CondApproveMatcher;
use brc20_swap_indexer::commit::sig::{canonical_text, function_id, signing_message, StubVerifier};
use brc20_swap_indexer::commit::CommitStore;
use brc20_swap_indexer::context::IndexerContext;
use brc20_swap_indexer::dispatcher::Dispatcher;
use brc20_swap_indexer::event::RawEvent;
use brc20_swap_indexer::event::payload::{CommitFunctionRaw, CommitPayload};
use brc20_swap_indexer::ids::{CreateIdxKey, InscriptionId, PoolPair, Ticker};
use brc20_swap_indexer::module::ModuleLedger;
use brc20_swap_indexer::script::{HexAddressCodec, NullAddressCodec, PkScript, BURN_SINK_SCRIPT};
use brc20_swap_indexer::token::TokenLedger;

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
        block_time: 1_700_000_000,
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
        block_time: 1_700_000_000,
        parent: None,
    }
}

/// Seed scenario 1: deploy/mint/transfer round-trip.
#[test]
fn seed_scenario_1_deploy_mint_transfer_round_trip() {
    let mut d = Dispatcher::new(IndexerContext::default(), NullAddressCodec::default(), StubVerifier);

    d.process_event(&creation(
        1,
        0,
        pk(0xD0),
        r#"{"p":"brc-20","op":"deploy","tick":"ordi","max":"21000000","lim":"1000","dec":"18"}"#,
    ));

    let alice = pk(0xA0);
    d.process_event(&creation(2, 0, alice.clone(), r#"{"p":"brc-20","op":"mint","tick":"ordi","amt":"1000"}"#));
    assert_eq!(d.tokens().balance("ordi", &alice).unwrap().available.to_string(), "1000");

    let transfer_key = CreateIdxKey::new(3, 0);
    d.process_event(&creation(3, 0, alice.clone(), r#"{"p":"brc-20","op":"transfer","tick":"ordi","amt":"400"}"#));

    let bob = pk(0xB0);
    d.process_event(&mv(transfer_key, bob.clone(), [0xAB; 32], 4));

    let a_balance = d.tokens().balance("ordi", &alice).unwrap();
    assert_eq!(a_balance.available.to_string(), "600");
    assert_eq!(a_balance.transferable.to_string(), "0");
    assert_eq!(d.tokens().balance("ordi", &bob).unwrap().available.to_string(), "400");
    assert_eq!(d.tokens().get("ordi").unwrap().total_minted.to_string(), "1000");
}

/// Seed scenario 2: mint-exhaustion clamp, with `complete_height` set at
/// the mint that exhausts supply.
#[test]
fn seed_scenario_2_mint_exhaustion_clamp() {
    let mut d = Dispatcher::new(IndexerContext::default(), NullAddressCodec::default(), StubVerifier);

    d.process_event(&creation(
        1,
        0,
        pk(0xD0),
        r#"{"p":"brc-20","op":"deploy","tick":"abcd","max":"5","lim":"10"}"#,
    ));

    let first = pk(0xA0);
    d.process_event(&creation(2, 0, first.clone(), r#"{"p":"brc-20","op":"mint","tick":"abcd","amt":"3"}"#));
    assert_eq!(d.tokens().balance("abcd", &first).unwrap().available.to_string(), "3");

    let second = pk(0xB0);
    d.process_event(&creation(3, 0, second.clone(), r#"{"p":"brc-20","op":"mint","tick":"abcd","amt":"3"}"#));
    assert_eq!(d.tokens().balance("abcd", &second).unwrap().available.to_string(), "2");

    let info = d.tokens().get("abcd").unwrap();
    assert_eq!(info.total_minted.to_string(), "5");
    assert!(info.is_complete());
    assert_eq!(info.complete_height, 3);
}

/// Seed scenario 3: an over-budget inscribe-transfer is recorded invalid
/// and left that way; a later valid inscribe-transfer still succeeds.
#[test]
fn seed_scenario_3_invalid_inscribe_transfer_is_audited() {
    let mut d = Dispatcher::new(IndexerContext::default(), NullAddressCodec::default(), StubVerifier);

    d.process_event(&creation(
        1,
        0,
        pk(0xD0),
        r#"{"p":"brc-20","op":"deploy","tick":"ordi","max":"1000","lim":"1000"}"#,
    ));
    let alice = pk(0xA0);
    d.process_event(&creation(2, 0, alice.clone(), r#"{"p":"brc-20","op":"mint","tick":"ordi","amt":"10"}"#));

    let over_budget_key = CreateIdxKey::new(3, 0);
    d.process_event(&creation(3, 0, alice.clone(), r#"{"p":"brc-20","op":"transfer","tick":"ordi","amt":"20"}"#));

    let history = d.tokens().history_of("ordi");
    let invalid_entry = history.iter().find(|h| h.create_idx_key == over_budget_key).unwrap();
    assert!(!invalid_entry.valid);
    assert_eq!(d.tokens().balance("ordi", &alice).unwrap().transferable.to_string(), "0");

    d.process_event(&creation(4, 0, alice.clone(), r#"{"p":"brc-20","op":"transfer","tick":"ordi","amt":"5"}"#));
    assert_eq!(d.tokens().balance("ordi", &alice).unwrap().transferable.to_string(), "5");
    assert_eq!(d.tokens().balance("ordi", &alice).unwrap().available.to_string(), "5");

    let summary = d.finish();
    assert_eq!(summary.events_processed, 4);
}

fn pool_with_tokens() -> (IndexerContext, TokenLedger, ModuleLedger, InscriptionId, PoolPair) {
    let module_id = InscriptionId::new([9u8; 32], 0);
    let ctx = IndexerContext {
        module_swap_source_inscription_id: Some(module_id.clone()),
        ..IndexerContext::default()
    };
    let mut tokens = TokenLedger::new();
    tokens
        .deploy(&ctx, "aaaa", "1000000000", None, Some("0"), None, InscriptionId::new([1u8; 32], 0), 1)
        .unwrap();
    tokens
        .deploy(&ctx, "bbbb", "1000000000", None, Some("0"), None, InscriptionId::new([2u8; 32], 0), 1)
        .unwrap();

    let mut modules = ModuleLedger::new();
    modules
        .deploy(
            &ctx,
            &tokens,
            "amm",
            &module_id.to_string(),
            pk(0xE0),
            pk(0xE1),
            pk(0xE2),
            "aaaa",
            None,
            module_id.clone(),
            pk(0xD0),
            1,
        )
        .unwrap();

    let tick_a = Ticker::parse("aaaa").unwrap();
    let tick_b = Ticker::parse("bbbb").unwrap();
    let pair = PoolPair::new(&tick_a, &tick_b);
    modules.deploy_pool(&module_id, pair.clone(), 0, 0).unwrap();
    (ctx, tokens, modules, module_id, pair)
}

/// Seed scenario 4: the `MINIMUM_LIQUIDITY` floor is strict — exactly
/// 1000 is rejected, 1001 seeds the pool with 1 to the depositor and the
/// floor burned to the sink.
#[test]
fn seed_scenario_4_initial_add_liq_floor() {
    let (_ctx, _tokens, mut modules, module_id, pair) = pool_with_tokens();
    let sender = pk(7);
    let fee_to = pk(0xE2);

    // sqrt(1000 * 1000) == 1000 exactly: rejected.
    modules.deposit(&module_id, "aaaa", 0, &sender, &fd(1000), false);
    modules.deposit(&module_id, "bbbb", 0, &sender, &fd(1000), false);
    let err = modules
        .add_liquidity(&module_id, &pair, &sender, &fee_to, fd(1000), fd(1000), fd18(0), 0, 0, 0)
        .unwrap_err();
    assert!(matches!(err, brc20_swap_indexer::error::ModuleError::InitialLiquidityTooLow));

    // sqrt(1001 * 1001) == 1001: accepted, user gets 1, burn sink gets 1000.
    modules.deposit(&module_id, "aaaa", 0, &sender, &fd(1), false);
    modules.deposit(&module_id, "bbbb", 0, &sender, &fd(1), false);
    let lp = modules
        .add_liquidity(&module_id, &pair, &sender, &fee_to, fd(1001), fd(1001), fd18(0), 0, 0, 0)
        .unwrap();
    assert_eq!(lp.to_string(), "1");

    let pool = modules.pool(&module_id, &pair).unwrap();
    assert_eq!(pool.lp_supply.to_string(), "1001");
    let burn_lp = modules.lp_balance(&module_id, &pair, &PkScript::burn_sink());
    assert_eq!(burn_lp.to_string(), "1000");
}

/// Seed scenario 5: constant-product `swap exactIn` with a 3‰ fee.
#[test]
fn seed_scenario_5_swap_exact_in_with_fee() {
    let (_ctx, _tokens, mut modules, module_id, pair) = pool_with_tokens();
    let seeder = pk(1);
    let fee_to = pk(0xE2);
    modules.deposit(&module_id, "aaaa", 0, &seeder, &fd(1_000_000), false);
    modules.deposit(&module_id, "bbbb", 0, &seeder, &fd(1_000_000), false);
    modules
        .add_liquidity(&module_id, &pair, &seeder, &fee_to, fd(1_000_000), fd(1_000_000), fd18(0), 0, 0, 0)
        .unwrap();

    let trader = pk(7);
    modules.deposit(&module_id, "aaaa", 0, &trader, &fd(10_000), false);

    let amt_out = modules
        .swap_exact_in(&module_id, &pair, &trader, 0, fd(10_000), fd(0), 0, 3, 0, 0)
        .unwrap();
    assert_eq!(amt_out.to_string(), "9871");

    let pool = modules.pool(&module_id, &pair).unwrap();
    assert_eq!(pool.reserves[0].to_string(), "1010000");
    assert_eq!(pool.reserves[1].to_string(), "990129");
}

fn fd(v: u64) -> brc20_swap_indexer::decimal::FixedDecimal {
    brc20_swap_indexer::decimal::FixedDecimal::parse(&v.to_string(), 0).unwrap()
}

fn fd18(v: u64) -> brc20_swap_indexer::decimal::FixedDecimal {
    brc20_swap_indexer::decimal::FixedDecimal::parse(&v.to_string(), 18).unwrap()
}

fn module_commitment_script(module_id: &InscriptionId) -> PkScript {
    let mut reversed = module_id.txid;
    reversed.reverse();
    let mut bytes = vec![BURN_SINK_SCRIPT, reversed.len() as u8];
    bytes.extend_from_slice(&reversed);
    PkScript(bytes)
}

fn signed_func(func: &str, params: &[&str], addr_script: &PkScript, module: &str, parent: Option<&str>, gas_price: &str, ts: u64) -> CommitFunctionRaw {
    let params: Vec<String> = params.iter().map(|s| s.to_string()).collect();
    let text = canonical_text(module, parent, Some(gas_price), &[], &hex::encode(&addr_script.0), func, &params, ts);
    let fid = function_id(&text);
    let message = signing_message(&fid, &hex::encode(&addr_script.0), func, &params, ts);
    let sig = StubVerifier::sign(addr_script, message.as_bytes());
    CommitFunctionRaw {
        addr: hex::encode(&addr_script.0),
        func: func.to_string(),
        params,
        ts,
        sig,
    }
}

fn raw_commit_body(payload: &CommitPayload) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "p": "brc20-swap",
        "op": "commit",
        "module": payload.module,
        "parent": payload.parent,
        "gas_price": payload.gas_price,
        "data": payload.data.iter().map(|f| serde_json::json!({
            "addr": f.addr,
            "func": f.func,
            "params": f.params,
            "ts": f.ts,
            "sig": f.sig,
        })).collect::<Vec<_>>(),
    }))
    .unwrap()
}

/// Seed scenario 6: a commit's parent chain is checked one hop at a time,
/// against `commit_id_map`/`commit_id_chain_map`, not by walking the full
/// ancestor chain (see `DESIGN.md`'s Open Question record).
#[test]
fn seed_scenario_6_commit_parent_chain() {
    let module_id = InscriptionId::new([9u8; 32], 0);
    let ctx = IndexerContext {
        module_swap_source_inscription_id: Some(module_id.clone()),
        ..IndexerContext::default()
    };
    let mut tokens = TokenLedger::new();
    tokens
        .deploy(&ctx, "gasx", "1000000000", None, Some("0"), None, InscriptionId::new([1u8; 32], 0), 1)
        .unwrap();

    let mut modules = ModuleLedger::new();
    let sequencer = pk(0xE0);
    modules
        .deploy(
            &ctx,
            &tokens,
            "amm",
            &module_id.to_string(),
            sequencer.clone(),
            pk(0xE1),
            pk(0xE2),
            "gasx",
            None,
            module_id.clone(),
            pk(0xD0),
            1,
        )
        .unwrap();

    let codec = HexAddressCodec::default();
    let verifier = StubVerifier;
    let receiver = module_commitment_script(&module_id);

    let mut store = CommitStore::new();

    // C1: parent = "".
    let f1 = signed_func("decrease-approval", &["gasx", "0"], &sequencer, &module_id.to_string(), None, "0", 1);
    let c1_payload = CommitPayload {
        module: module_id.to_string(),
        parent: None,
        gas_price: "0".to_string(),
        data: vec![f1],
    };
    let c1_body = raw_commit_body(&c1_payload);
    let c1_key = CreateIdxKey::new(10, 0);
    let c1_id = InscriptionId::new([0xC1; 32], 0);
    store
        .inscribe(&ctx, &tokens, &mut modules, &codec, &verifier, 10, c1_key, c1_id.clone(), &sequencer, &c1_body, &c1_payload)
        .unwrap();

    // C2: parent = C1.
    let f2 = signed_func("decrease-approval", &["gasx", "0"], &sequencer, &module_id.to_string(), Some(&c1_id.to_string()), "0", 1);
    let c2_payload = CommitPayload {
        module: module_id.to_string(),
        parent: Some(c1_id.to_string()),
        gas_price: "0".to_string(),
        data: vec![f2],
    };
    let c2_body = raw_commit_body(&c2_payload);
    let c2_key = CreateIdxKey::new(11, 0);
    let c2_id = InscriptionId::new([0xC2; 32], 0);
    store
        .inscribe(&ctx, &tokens, &mut modules, &codec, &verifier, 11, c2_key, c2_id.clone(), &sequencer, &c2_body, &c2_payload)
        .unwrap();

    // Moving C2 before C1 is rejected: C1 is not yet in commit_id_map.
    let err = store.apply_move(&tokens, &mut modules, c2_key, &sequencer, &receiver).unwrap_err();
    assert!(matches!(err, brc20_swap_indexer::error::CommitError::BadParent));

    // C2's entry was consumed by the failed apply_move (removed from the
    // store's pending indexes); re-inscribe it so it can be moved again
    // once C1 has landed, exactly as a sequencer would re-broadcast.
    let c2_retry_key = CreateIdxKey::new(11, 1);
    let c2_retry_id = InscriptionId::new([0xC2; 32], 1);
    store
        .inscribe(&ctx, &tokens, &mut modules, &codec, &verifier, 11, c2_retry_key, c2_retry_id.clone(), &sequencer, &c2_body, &c2_payload)
        .unwrap();

    // Moving C1 first succeeds.
    let applied = store.apply_move(&tokens, &mut modules, c1_key, &sequencer, &receiver).unwrap();
    assert_eq!(applied, c1_id);
    assert!(modules.get(&module_id).unwrap().commit_id_map.contains(&c1_id));

    // Now C2 (re-inscribed with the same parent) succeeds.
    let applied = store.apply_move(&tokens, &mut modules, c2_retry_key, &sequencer, &receiver).unwrap();
    assert_eq!(applied, c2_retry_id);

    // A fresh C3 with parent = C1 is rejected: C1 is now in
    // commit_id_chain_map (already consumed as someone's parent).
    let f3 = signed_func("decrease-approval", &["gasx", "0"], &sequencer, &module_id.to_string(), Some(&c1_id.to_string()), "0", 1);
    let c3_payload = CommitPayload {
        module: module_id.to_string(),
        parent: Some(c1_id.to_string()),
        gas_price: "0".to_string(),
        data: vec![f3],
    };
    let c3_body = raw_commit_body(&c3_payload);
    let c3_key = CreateIdxKey::new(12, 0);
    let c3_id = InscriptionId::new([0xC3; 32], 0);
    store
        .inscribe(&ctx, &tokens, &mut modules, &codec, &verifier, 12, c3_key, c3_id, &sequencer, &c3_body, &c3_payload)
        .unwrap();
    let err = store.apply_move(&tokens, &mut modules, c3_key, &sequencer, &receiver).unwrap_err();
    assert!(matches!(err, brc20_swap_indexer::error::CommitError::BadParent));
}

/// The conditional-approve matcher (C7), exercised directly: a transfer
/// buffered ahead of its matching approve is resolved once the approve's
/// move arrives.
#[test]
fn cond_approve_matcher_resolves_buffered_transfer() {
    use brc20_swap_indexer::module::ModuleOpKind;
    use brc20_swap_indexer::decimal::FixedDecimal;

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

    let alice = pk(1);
    let bob = pk(2);
    let txid = [7u8; 32];

    let mut matcher = CondApproveMatcher::new();
    let events = matcher.on_transfer(&mut modules, txid, "ordi", 18, alice.clone(), bob.clone(), FixedDecimal::parse("100", 18).unwrap());
    assert!(events.is_empty());

    modules.deposit(&module_id, "ordi", 18, &bob, &FixedDecimal::parse("100", 18).unwrap(), false);
    let key = CreateIdxKey::new(6, 0);
    let outcome = modules
        .inscribe_op(&ctx, &tokens, ModuleOpKind::CondApprove, &module_id, "ordi", "100", &bob, key, 5)
        .unwrap();
    assert!(matches!(outcome, brc20_swap_indexer::module::ModuleOpOutcome::Valid { .. }));

    let events = matcher.on_cond_approve_move(&mut modules, &tokens, txid, key);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].amount.to_string(), "100");
    assert!(modules.peek_cond_approve(key).is_none());
}
