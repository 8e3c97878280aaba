//! Commit-verification engine (C6): pre-verify a signed off-chain batch at
//! inscribe time, then on the commit inscription's move re-execute it
//! twice — once against a cherry-picked throwaway copy of the module's
//! state, once for real — committing or rejecting atomically.
//!
//! Grounded on `module_commit_inscribe.go`'s `ProcessInscribeCommit` /
//! `ProcessInscribeCommitPreVerify` (inscribe phase) and
//! `module_commit.go`'s `ProcessCommit` / `ProcessCommitVerify` (move
//! phase). The real `ProcessCommit` path never walks a commit's ancestor
//! chain and auto-applies it — it only checks that `parent` is already in
//! `commit_id_map` and not yet in `commit_id_chain_map` (see
//! `ProcessCommitVerify`'s "check empty parent" / "invalid if reusing
//! 'parent'" block). The ancestor-walking logic lives only in
//! `BRC20ModuleVerifySwapCommitContent`, a separate bulk-verification path
//! the live move handler never calls — this crate follows the move
//! handler.

pub mod function;
pub mod sig;
pub mod tokenizer;

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use log::{info, warn};

use crate::context::IndexerContext;
use crate::decimal::FixedDecimal;
use crate::error::{CommitError, ModuleError};
use crate::event::payload::{CommitFunctionRaw, CommitPayload};
use crate::ids::{CreateIdxKey, InscriptionId, ModuleId, PoolPair, Ticker};
use crate::module::ModuleLedger;
use crate::script::{AddressCodec, PkScript};
use crate::token::TokenLedger;

use function::{parse_function, check_tick_amount, FunctionBody, SwapDirection};
use sig::{canonical_text, function_id, signing_message, SignatureVerifier};
use tokenizer::data_element_byte_sizes;

/// One commit function, fully parsed and with its signer's pkScript
/// already resolved; signatures are only ever checked at inscribe time
/// (`ProcessCommitVerify`, the move-time re-executor, never re-verifies
/// them), so nothing else from the raw wire form needs to survive.
#[derive(Clone, Debug)]
struct ParsedFunction {
    body: FunctionBody,
    addr_script: PkScript,
}

/// A commit batch that has passed inscribe-time pre-verification and is
/// waiting for its move event.
#[derive(Clone, Debug)]
struct StoredCommit {
    module_id: ModuleId,
    parent: Option<InscriptionId>,
    gas_price: FixedDecimal,
    functions: Vec<ParsedFunction>,
    /// Byte span of each function's JSON object in the original commit
    /// body, in `data[]` order (§4.4); computed once at inscribe time
    /// since the body never changes afterward.
    byte_sizes: Vec<usize>,
    /// `true` iff gas is charged proportionally to `byte_sizes` rather
    /// than flat per function — decided once at inscribe time from the
    /// height then current, exactly as the original per-function gas
    /// scan does, so move-time replay never needs a height again.
    charge_by_size: bool,
}

/// Indexes over not-yet-moved commits: `valid_by_create_key` is the
/// per-creation-site join handle a move event arrives with;
/// `valid_by_id` holds the parsed batch itself.
#[derive(Debug, Default)]
pub struct CommitStore {
    valid_by_create_key: BTreeMap<CreateIdxKey, InscriptionId>,
    valid_by_id: BTreeMap<InscriptionId, StoredCommit>,
}

impl CommitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inscribe phase (`ProcessInscribeCommit` + `ProcessInscribeCommitPreVerify`):
    /// syntax, ticker/amount, and per-function-signature checks only — no
    /// ledger state is read or touched besides `modules`' own
    /// preset-then-clear invalid bookkeeping. `raw_body` is the exact
    /// inscription content bytes (needed for the byte-span gas scan).
    #[allow(clippy::too_many_arguments)]
    pub fn inscribe(
        &mut self,
        ctx: &IndexerContext,
        tokens: &TokenLedger,
        modules: &mut ModuleLedger,
        codec: &dyn AddressCodec,
        verifier: &dyn SignatureVerifier,
        height: u32,
        create_idx_key: CreateIdxKey,
        inscription_id: InscriptionId,
        inscriber: &PkScript,
        raw_body: &[u8],
        payload: &CommitPayload,
    ) -> Result<(), CommitError> {
        if payload.module != payload.module.to_ascii_lowercase() {
            return Err(CommitError::MalformedBody("module id must be lowercase".to_string()));
        }
        let module_id: ModuleId = payload
            .module
            .parse()
            .map_err(|_| CommitError::MalformedBody(format!("bad module id `{}`", payload.module)))?;

        let module = modules
            .get(&module_id)
            .ok_or_else(|| CommitError::Module(ModuleError::UnknownModule(payload.module.clone())))?;
        let gas_tick_lower = module.gas_tick.lower().to_string();
        let sequencer = module.sequencer.clone();

        modules.mark_commit_invalid(&module_id, inscription_id.clone());

        if &sequencer != inscriber {
            warn!("commit inscribe rejected: sequencer mismatch for module {}", module_id);
            return Err(CommitError::MalformedBody("commit sender is not the module sequencer".to_string()));
        }

        let gas_price = check_tick_amount(tokens, &gas_tick_lower, &payload.gas_price)?;

        let parent = payload
            .parent
            .as_ref()
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<InscriptionId>())
            .transpose()
            .map_err(|_| CommitError::MalformedBody("bad parent commit id".to_string()))?;

        let parent_for_sig = payload.parent.as_deref().filter(|p| !p.is_empty());
        let gas_price_for_sig = Some(payload.gas_price.as_str()).filter(|g| !g.is_empty());
        let functions = verify_and_parse_functions(ctx, tokens, codec, verifier, height, &payload.module, parent_for_sig, gas_price_for_sig, &payload.data)?;

        let byte_sizes = data_element_byte_sizes(raw_body)?;
        if byte_sizes.len() != payload.data.len() {
            return Err(CommitError::MalformedBody("function count does not match byte-size scan".to_string()));
        }
        let charge_by_size = !ctx.swap_withdraw_enabled_at(height);

        self.valid_by_create_key.insert(create_idx_key, inscription_id.clone());
        self.valid_by_id.insert(
            inscription_id.clone(),
            StoredCommit {
                module_id: module_id.clone(),
                parent,
                gas_price,
                functions,
                byte_sizes,
                charge_by_size,
            },
        );
        modules.unmark_commit_invalid(&module_id, &inscription_id);
        info!("commit inscribed: id={} module={} functions={}", inscription_id, module_id, payload.data.len());
        Ok(())
    }

    /// Move-of-commit phase (`ProcessCommit` / `ProcessCommitVerify`):
    /// receiver/sequencer checks, strict parent-chain check, then the
    /// two-phase cherry-pick-verify-then-replay apply. Returns the
    /// inscription id of the commit that was accepted.
    pub fn apply_move(
        &mut self,
        tokens: &TokenLedger,
        modules: &mut ModuleLedger,
        create_idx_key: CreateIdxKey,
        sender: &PkScript,
        receiver: &PkScript,
    ) -> Result<InscriptionId, CommitError> {
        let inscription_id = self
            .valid_by_create_key
            .remove(&create_idx_key)
            .ok_or_else(|| CommitError::MissingCommitBody(create_idx_key.to_string()))?;
        let stored = self
            .valid_by_id
            .remove(&inscription_id)
            .ok_or_else(|| CommitError::MissingCommitBody(inscription_id.to_string()))?;

        let receiver_module = receiver.as_module_commitment();
        if receiver_module.as_ref() != Some(&stored.module_id) {
            return Err(CommitError::MalformedBody("commit move not sent to its module".to_string()));
        }

        modules.mark_commit_invalid(&stored.module_id, inscription_id.clone());

        let module = modules
            .get(&stored.module_id)
            .ok_or_else(|| CommitError::Module(ModuleError::UnknownModule(stored.module_id.to_string())))?;
        if &module.sequencer != sender {
            return Err(CommitError::MalformedBody("commit sender is not the module sequencer".to_string()));
        }
        let has_prior_commits = !module.commit_id_map.is_empty();

        match &stored.parent {
            None => {
                if has_prior_commits {
                    return Err(CommitError::BadParent);
                }
            }
            Some(parent) => {
                if modules.commit_chain_consumed(&stored.module_id, parent) {
                    return Err(CommitError::BadParent);
                }
                if !modules.commit_accepted(&stored.module_id, parent) {
                    return Err(CommitError::BadParent);
                }
            }
        }

        let (user_keys, pool_pairs, lp_keys) = touched_keys(modules, &stored)?;

        let mut snapshot = modules.cherry_pick(&stored.module_id, &user_keys, &pool_pairs, &lp_keys);
        execute_batch(&mut snapshot, tokens, &stored)?;

        execute_batch(modules, tokens, &stored)?;

        modules.mark_commit_accepted(&stored.module_id, inscription_id.clone(), stored.parent.clone());
        modules.unmark_commit_invalid(&stored.module_id, &inscription_id);
        info!("commit applied: id={} module={}", inscription_id, stored.module_id);
        Ok(inscription_id)
    }
}

/// Per-function signature verification and parsing
/// (`ProcessInscribeCommitPreVerify`'s `CheckFunctionSigVerify` + function
/// dispatch loop, fused into one pass).
fn verify_and_parse_functions(
    ctx: &IndexerContext,
    tokens: &TokenLedger,
    codec: &dyn AddressCodec,
    verifier: &dyn SignatureVerifier,
    height: u32,
    module_id_str: &str,
    parent: Option<&str>,
    gas_price: Option<&str>,
    data: &[CommitFunctionRaw],
) -> Result<Vec<ParsedFunction>, CommitError> {
    let mut prevs_by_addr: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut out = Vec::with_capacity(data.len());

    for raw in data {
        let addr_script = codec
            .address_to_script(&raw.addr)
            .ok_or_else(|| CommitError::MalformedBody(format!("bad commit function address `{}`", raw.addr)))?;

        let prevs = prevs_by_addr.get(&raw.addr).cloned().unwrap_or_default();
        let text = canonical_text(module_id_str, parent, gas_price, &prevs, &raw.addr, &raw.func, &raw.params, raw.ts);
        let fid = function_id(&text);
        let message = signing_message(&fid, &raw.addr, &raw.func, &raw.params, raw.ts);
        if !verifier.verify(&addr_script, message.as_bytes(), &raw.sig) {
            return Err(CommitError::BadSignature);
        }
        prevs_by_addr.entry(raw.addr.clone()).or_default().push(fid);

        let body = parse_function(ctx, tokens, codec, height, raw)?;
        out.push(ParsedFunction { body, addr_script });
    }

    Ok(out)
}

/// `InitCherryPickFilter`: every pkScript/ticker/pool a batch's functions
/// (and the module's own fixed accounts) touch, expanded into the
/// concrete `(tick, pkScript)` / `(pair, pkScript)` key sets
/// [`ModuleLedger::cherry_pick`] needs. This is a superset of what a
/// per-function filter would name exactly — harmless, since cherry-pick
/// only copies entries that actually exist.
fn touched_keys(
    modules: &ModuleLedger,
    stored: &StoredCommit,
) -> Result<(BTreeSet<(String, PkScript)>, BTreeSet<PoolPair>, BTreeSet<(PoolPair, PkScript)>), CommitError> {
    let module = modules
        .get(&stored.module_id)
        .ok_or_else(|| CommitError::Module(ModuleError::UnknownModule(stored.module_id.to_string())))?;

    let mut ticks: BTreeSet<String> = BTreeSet::new();
    let mut scripts: BTreeSet<PkScript> = BTreeSet::new();
    let mut pool_pairs: BTreeSet<PoolPair> = BTreeSet::new();

    ticks.insert(module.gas_tick.lower().to_string());
    scripts.insert(module.gas_to.clone());
    scripts.insert(module.fee_to.clone());
    scripts.insert(module.sequencer.clone());
    scripts.insert(module.deployer.clone());

    for pf in &stored.functions {
        scripts.insert(pf.addr_script.clone());
        match &pf.body {
            FunctionBody::DeployPool { token0, token1 } => {
                ticks.insert(token0.clone());
                ticks.insert(token1.clone());
                pool_pairs.insert(pool_pair_of(token0, token1)?);
            }
            FunctionBody::AddLiq { token0, token1, .. } | FunctionBody::RemoveLiq { token0, token1, .. } => {
                ticks.insert(token0.clone());
                ticks.insert(token1.clone());
                pool_pairs.insert(pool_pair_of(token0, token1)?);
            }
            FunctionBody::Swap { token0, token1, .. } => {
                ticks.insert(token0.clone());
                ticks.insert(token1.clone());
                pool_pairs.insert(pool_pair_of(token0, token1)?);
            }
            FunctionBody::Send { to, ticker, .. } => {
                ticks.insert(ticker.clone());
                scripts.insert(to.clone());
            }
            FunctionBody::SendLp { to, token0, token1, .. } => {
                ticks.insert(token0.clone());
                ticks.insert(token1.clone());
                pool_pairs.insert(pool_pair_of(token0, token1)?);
                scripts.insert(to.clone());
            }
            FunctionBody::DecreaseApproval { ticker, .. } => {
                ticks.insert(ticker.clone());
            }
        }
    }

    let mut user_keys = BTreeSet::new();
    for t in &ticks {
        for pk in &scripts {
            user_keys.insert((t.clone(), pk.clone()));
        }
    }
    let mut lp_keys = BTreeSet::new();
    for pair in &pool_pairs {
        for pk in &scripts {
            lp_keys.insert((pair.clone(), pk.clone()));
        }
    }

    Ok((user_keys, pool_pairs, lp_keys))
}

fn pool_pair_of(tick0_lower: &str, tick1_lower: &str) -> Result<PoolPair, CommitError> {
    let a = Ticker::parse(tick0_lower).map_err(|e| CommitError::Module(ModuleError::Token(e)))?;
    let b = Ticker::parse(tick1_lower).map_err(|e| CommitError::Module(ModuleError::Token(e)))?;
    Ok(PoolPair::new(&a, &b))
}

/// Run every function of `stored` against `ledger` in order, charging gas
/// first (§4.3's "for every function, charge..."). Used twice per move: once
/// on a cherry-picked throwaway copy, once for real.
fn execute_batch(ledger: &mut ModuleLedger, tokens: &TokenLedger, stored: &StoredCommit) -> Result<(), CommitError> {
    // `charge_by_size` is fixed per batch at inscribe time (the height then
    // current decides it once, same as the original per-function gas
    // scan), so replaying a batch later never needs a height again.
    for (idx, pf) in stored.functions.iter().enumerate() {
        if stored.gas_price.sign() > 0 {
            let byte_size = stored.byte_sizes[idx] as u64;
            ledger
                .charge_gas(&stored.module_id, tokens, &pf.addr_script, &stored.gas_price, byte_size, stored.charge_by_size)
                .map_err(|_| CommitError::InsufficientGas)?;
        }
        execute_function(ledger, tokens, &stored.module_id, &pf.addr_script, &pf.body)?;
    }
    Ok(())
}

fn execute_function(
    ledger: &mut ModuleLedger,
    tokens: &TokenLedger,
    module_id: &ModuleId,
    sender: &PkScript,
    body: &FunctionBody,
) -> Result<(), CommitError> {
    let scale_of = |tick: &str| -> Result<u8, CommitError> {
        tokens
            .get(tick)
            .map(|info| info.decimal)
            .ok_or_else(|| CommitError::MalformedBody(format!("unknown ticker `{}`", tick)))
    };
    let fee_to_of = |ledger: &ModuleLedger| -> Result<PkScript, CommitError> {
        ledger
            .get(module_id)
            .map(|m| m.fee_to.clone())
            .ok_or_else(|| CommitError::Module(ModuleError::UnknownModule(module_id.to_string())))
    };

    match body {
        FunctionBody::DeployPool { token0, token1 } => {
            let pair = pool_pair_of(token0, token1)?;
            let (s0, s1) = (scale_of(token0)?, scale_of(token1)?);
            ledger.pool_deploy(module_id, pair, s0, s1)?;
        }
        FunctionBody::AddLiq {
            token0,
            token1,
            amt0,
            amt1,
            lp_expected,
            slippage,
        } => {
            let pair = pool_pair_of(token0, token1)?;
            let (s0, s1) = (scale_of(token0)?, scale_of(token1)?);
            let fee_to = fee_to_of(ledger)?;
            ledger.add_liquidity(module_id, &pair, sender, &fee_to, amt0.clone(), amt1.clone(), lp_expected.clone(), *slippage, s0, s1)?;
        }
        FunctionBody::RemoveLiq {
            token0,
            token1,
            lp_amt,
            min_amt0,
            min_amt1,
            slippage,
        } => {
            let pair = pool_pair_of(token0, token1)?;
            let (s0, s1) = (scale_of(token0)?, scale_of(token1)?);
            let fee_to = fee_to_of(ledger)?;
            ledger.remove_liquidity(module_id, &pair, sender, &fee_to, lp_amt.clone(), min_amt0.clone(), min_amt1.clone(), *slippage, s0, s1)?;
        }
        FunctionBody::Swap {
            token0,
            token1,
            token_spec,
            amt_spec,
            direction,
            counter_amt,
            slippage,
        } => {
            let pair = pool_pair_of(token0, token1)?;
            let idx_spec = pair
                .index_of(token_spec)
                .ok_or_else(|| CommitError::MalformedBody("swap: token not in pair".to_string()))?;
            let fee_rate = ledger
                .get(module_id)
                .map(|m| m.fee_rate_swap)
                .ok_or_else(|| CommitError::Module(ModuleError::UnknownModule(module_id.to_string())))?;
            let other = pair.tick_at(PoolPair::other_index(idx_spec));
            match direction {
                SwapDirection::ExactIn => {
                    let scale_in = scale_of(token_spec)?;
                    let scale_out = scale_of(&other)?;
                    ledger.swap_exact_in(module_id, &pair, sender, idx_spec, amt_spec.clone(), counter_amt.clone(), *slippage, fee_rate, scale_in, scale_out)?;
                }
                SwapDirection::ExactOut => {
                    let scale_out = scale_of(token_spec)?;
                    let scale_in = scale_of(&other)?;
                    ledger.swap_exact_out(module_id, &pair, sender, idx_spec, amt_spec.clone(), counter_amt.clone(), *slippage, fee_rate, scale_in, scale_out)?;
                }
            }
        }
        FunctionBody::Send { to, ticker, amt } => {
            let scale = scale_of(ticker)?;
            ledger.send(module_id, ticker, scale, sender, to, amt)?;
        }
        FunctionBody::SendLp { to, token0, token1, lp_amt } => {
            let pair = pool_pair_of(token0, token1)?;
            ledger.send_lp(module_id, &pair, sender, to, lp_amt)?;
        }
        FunctionBody::DecreaseApproval { ticker, amt } => {
            let scale = scale_of(ticker)?;
            ledger.decrease_approval(module_id, ticker, scale, sender, amt)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Ticker;
    use crate::script::{HexAddressCodec, BURN_SINK_SCRIPT};
    use crate::token::TokenLedger;
    use sig::StubVerifier;

    fn module_commitment_script(module_id: &ModuleId) -> PkScript {
        let mut reversed = module_id.txid;
        reversed.reverse();
        let mut bytes = vec![BURN_SINK_SCRIPT, reversed.len() as u8];
        bytes.extend_from_slice(&reversed);
        PkScript(bytes)
    }

    fn pk(b: u8) -> PkScript {
        PkScript(vec![b])
    }

    fn setup() -> (IndexerContext, TokenLedger, ModuleLedger, ModuleId, HexAddressCodec) {
        let ctx = IndexerContext {
            module_swap_source_inscription_id: Some(InscriptionId::new([9u8; 32], 0)),
            ..IndexerContext::default()
        };
        let mut tokens = TokenLedger::new();
        tokens
            .deploy(&ctx, "aaaa", "1000000000", None, Some("0"), None, InscriptionId::new([1u8; 32], 0), 1)
            .unwrap();
        tokens
            .deploy(&ctx, "bbbb", "1000000000", None, Some("0"), None, InscriptionId::new([2u8; 32], 0), 1)
            .unwrap();
        tokens
            .deploy(&ctx, "gasx", "1000000000", None, Some("0"), None, InscriptionId::new([3u8; 32], 0), 1)
            .unwrap();

        let mut modules = ModuleLedger::new();
        let module_id = InscriptionId::new([9u8; 32], 0);
        modules
            .deploy(
                &ctx,
                &tokens,
                "amm",
                &module_id.to_string(),
                pk(0xE0), // sequencer
                pk(0xE1), // gas_to
                pk(0xE2), // fee_to
                "gasx",
                None,
                module_id.clone(),
                pk(0xD0),
                1,
            )
            .unwrap();

        let tick_a = Ticker::parse("aaaa").unwrap();
        let tick_b = Ticker::parse("bbbb").unwrap();
        let pair = PoolPair::new(&tick_a, &tick_b);
        modules.deploy_pool(&module_id, pair, 0, 0).unwrap();

        let codec = HexAddressCodec::default();
        (ctx, tokens, modules, module_id, codec)
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

    #[test]
    fn inscribe_then_move_deploy_pool_roundtrip() {
        let (ctx, tokens, mut modules, module_id, codec) = setup();
        let sender = pk(1);
        let f = signed_func("sendlp", &["00", "aaaa", "bbbb", "0"], &sender, &module_id.to_string(), None, "0", 1);
        let payload = CommitPayload {
            module: module_id.to_string(),
            parent: None,
            gas_price: "0".to_string(),
            data: vec![f],
        };
        let raw_body = serde_json::to_vec(&serde_json::json!({
            "p": "brc20-swap",
            "op": "commit",
            "module": module_id.to_string(),
            "gas_price": "0",
            "data": [{"addr": hex::encode(&sender.0), "func": "sendlp", "params": ["00","aaaa","bbbb","0"], "ts": 1, "sig": ""}]
        }))
        .unwrap();
        let mut store = CommitStore::new();
        let inscriber = pk(0xE0);
        let create_key = CreateIdxKey::new(10, 0);
        let id = InscriptionId::new([5u8; 32], 0);
        let verifier = StubVerifier;
        store
            .inscribe(&ctx, &tokens, &mut modules, &codec, &verifier, 1, create_key, id.clone(), &inscriber, &raw_body, &payload)
            .unwrap();
        assert!(!modules.get(&module_id).unwrap().commit_invalid_map.contains(&id));

        let receiver = module_commitment_script(&module_id);
        let applied = store.apply_move(&tokens, &mut modules, create_key, &inscriber, &receiver).unwrap();
        assert_eq!(applied, id);
        assert!(modules.get(&module_id).unwrap().commit_id_map.contains(&id));
    }

    #[test]
    fn move_with_nonempty_parent_before_any_commit_is_rejected() {
        let (ctx, tokens, mut modules, module_id, codec) = setup();
        let sender = pk(1);
        let parent_id = InscriptionId::new([7u8; 32], 0).to_string();
        let f = signed_func("decrease-approval", &["aaaa", "0"], &sender, &module_id.to_string(), Some(&parent_id), "0", 1);
        let payload = CommitPayload {
            module: module_id.to_string(),
            parent: Some(parent_id),
            gas_price: "0".to_string(),
            data: vec![f],
        };
        let raw_body = serde_json::to_vec(&serde_json::json!({
            "data": [{"addr": hex::encode(&sender.0), "func": "decrease-approval", "params": ["aaaa","0"], "ts": 1, "sig": ""}]
        }))
        .unwrap();
        let mut store = CommitStore::new();
        let inscriber = pk(0xE0);
        let create_key = CreateIdxKey::new(10, 0);
        let id = InscriptionId::new([6u8; 32], 0);
        let verifier = StubVerifier;
        store
            .inscribe(&ctx, &tokens, &mut modules, &codec, &verifier, 1, create_key, id, &inscriber, &raw_body, &payload)
            .unwrap();

        let receiver = module_commitment_script(&module_id);

        let err = store.apply_move(&tokens, &mut modules, create_key, &inscriber, &receiver).unwrap_err();
        assert!(matches!(err, CommitError::BadParent));
    }
}
