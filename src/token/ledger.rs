//! [`TokenLedger`]: the state machine behind C4's deploy / mint /
//! inscribe-transfer / transfer operations.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::config::MAX_DECIMAL_WIDTH;
use crate::context::IndexerContext;
use crate::decimal::FixedDecimal;
use crate::error::TokenError;
use crate::ids::{CreateIdxKey, InscriptionId, Ticker};
use crate::script::PkScript;

use super::balance::{HistoryEntry, HistoryKind, HolderBalance, PendingTransfer, TransferMeta};
use super::info::TokenInfo;

/// Single owned table keyed by `(ticker_lower, pkScript)`: per-user and
/// per-token views are just range queries over this `BTreeMap`, which
/// also gives us the dump's required ticker-ascending / holder-ascending
/// iteration order for free.
type BalanceKey = (String, PkScript);

#[derive(Debug, Default, Clone)]
pub struct TokenLedger {
    tokens: BTreeMap<String, TokenInfo>,
    balances: BTreeMap<BalanceKey, HolderBalance>,
    /// Global index: creation key -> pending inscribe-transfer, live from
    /// validation until its first move.
    valid_transfer_map: BTreeMap<CreateIdxKey, PendingTransfer>,
    /// Invalid inscribe-transfers are retained for audit and are never
    /// consumed by a later move.
    invalid_transfer_map: BTreeMap<CreateIdxKey, PendingTransfer>,
    history: BTreeMap<String, Vec<HistoryEntry>>,
}

#[derive(Clone, Debug)]
pub struct MintOutcome {
    pub ticker: Ticker,
    pub credited: FixedDecimal,
    pub clamped: Option<String>,
    pub burned: bool,
}

#[derive(Clone, Debug)]
pub enum TransferOutcome {
    Valid { ticker: Ticker, amount: FixedDecimal },
    Invalid { ticker: Ticker, requested: FixedDecimal },
}

/// Result of resolving a transfer-move.
#[derive(Clone, Debug)]
pub struct MoveOutcome {
    /// `None` if the creation key was not found in either map (dropped).
    pub ticker: Option<Ticker>,
    pub amount: FixedDecimal,
    pub sender: PkScript,
    pub receiver: PkScript,
    /// `true` once balances were actually moved (false for no-ops: unknown
    /// key, invalid inscription, self-send, or `satoshi == 0`).
    pub applied: bool,
    pub receiver_is_burn: bool,
    pub self_mint: bool,
    pub height: u32,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ticker_lower: &str) -> Option<&TokenInfo> {
        self.tokens.get(ticker_lower)
    }

    pub fn balance(&self, ticker_lower: &str, owner: &PkScript) -> Option<&HolderBalance> {
        self.balances.get(&(ticker_lower.to_string(), owner.clone()))
    }

    /// All tickers ascending by lowercased bytes, as the dump format
    /// requires.
    pub fn tickers(&self) -> impl Iterator<Item = &TokenInfo> {
        self.tokens.values()
    }

    /// Holders of `ticker_lower`, ascending by pkScript bytes.
    pub fn holders_of<'a>(
        &'a self,
        ticker_lower: &'a str,
    ) -> impl Iterator<Item = (&'a PkScript, &'a HolderBalance)> {
        self.balances
            .range((ticker_lower.to_string(), PkScript(Vec::new()))..)
            .take_while(move |((t, _), _)| t == ticker_lower)
            .map(|((_, pk), bal)| (pk, bal))
    }

    pub fn history_of(&self, ticker_lower: &str) -> &[HistoryEntry] {
        self.history
            .get(ticker_lower)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn balance_mut(&mut self, ticker_lower: &str, owner: &PkScript, scale: u8) -> &mut HolderBalance {
        self.balances
            .entry((ticker_lower.to_string(), owner.clone()))
            .or_insert_with(|| HolderBalance::zero(scale))
    }

    fn push_history(&mut self, ctx: &IndexerContext, ticker_lower: &str, entry: HistoryEntry) {
        if !ctx.enable_history {
            return;
        }
        self.history
            .entry(ticker_lower.to_string())
            .or_default()
            .push(entry);
    }

    /// Deploy. Any precondition failure leaves
    /// state untouched and returns an error for the dispatcher to log and
    /// drop.
    pub fn deploy(
        &mut self,
        ctx: &IndexerContext,
        raw_tick: &str,
        raw_max: &str,
        raw_lim: Option<&str>,
        raw_dec: Option<&str>,
        raw_self_mint: Option<&str>,
        inscription_id: InscriptionId,
        height: u32,
    ) -> Result<Ticker, TokenError> {
        let ticker = Ticker::parse(raw_tick)?;
        let self_mint = raw_self_mint.map(|s| s == "true").unwrap_or(false);

        if ticker.is_self_mint_length() {
            if !self_mint {
                return Err(TokenError::SelfMintNotAllowed(
                    ticker.display().to_string(),
                    ctx.enable_self_mint_height,
                ));
            }
            if !ctx.self_mint_enabled_at(height) {
                return Err(TokenError::SelfMintNotAllowed(
                    ticker.display().to_string(),
                    ctx.enable_self_mint_height,
                ));
            }
        } else if self_mint {
            // 4-byte tickers cannot be self-mint.
            return Err(TokenError::SelfMintNotAllowed(
                ticker.display().to_string(),
                ctx.enable_self_mint_height,
            ));
        }

        if self.tokens.contains_key(ticker.lower()) {
            return Err(TokenError::DuplicateDeploy(ticker.lower().to_string()));
        }

        let dec: u8 = match raw_dec {
            None => MAX_DECIMAL_WIDTH,
            Some(s) => s
                .parse::<u8>()
                .map_err(|_| TokenError::BadDecimal(0))
                .and_then(|d| {
                    if d > MAX_DECIMAL_WIDTH {
                        Err(TokenError::BadDecimal(d))
                    } else {
                        Ok(d)
                    }
                })?,
        };

        let max = parse_supply(raw_max, dec, self_mint)?;
        let lim = match raw_lim {
            None => max.clone(),
            Some(s) => parse_supply(s, dec, self_mint)?,
        };

        let max = unbounded_if_zero(max, dec, self_mint)?;
        let lim = unbounded_if_zero(lim, dec, self_mint)?;

        if lim.sign() <= 0 || lim.cmp_value(&max) == std::cmp::Ordering::Greater {
            return Err(TokenError::BadAmount(raw_lim.unwrap_or(raw_max).to_string()));
        }

        let info = TokenInfo {
            ticker: ticker.clone(),
            deploy_inscription_id: inscription_id,
            decimal: dec,
            limit: lim,
            max,
            total_minted: FixedDecimal::zero(dec),
            burned: FixedDecimal::zero(dec),
            self_mint,
            deploy_height: height,
            complete_height: 0,
            complete_block_time: 0,
        };

        info!(
            "brc20 deploy: tick={} max={} lim={} dec={} self_mint={}",
            info.ticker, info.max, info.limit, info.decimal, info.self_mint
        );

        self.tokens.insert(ticker.lower().to_string(), info);
        Ok(ticker)
    }

    /// Mint. `parent` is the decoded inscription id referenced by the
    /// mint inscription's `parent` binary field, required (and checked)
    /// only for self-mint tokens.
    pub fn mint(
        &mut self,
        ctx: &IndexerContext,
        raw_tick: &str,
        raw_amt: &str,
        owner: &PkScript,
        create_idx_key: CreateIdxKey,
        height: u32,
        block_time: u64,
        parent: Option<InscriptionId>,
    ) -> Result<MintOutcome, TokenError> {
        let ticker = Ticker::parse(raw_tick)?;
        let lower = ticker.lower().to_string();
        let info = self
            .tokens
            .get(&lower)
            .ok_or_else(|| TokenError::UnknownTicker(lower.clone()))?
            .clone();

        if info.self_mint {
            match parent {
                Some(p) if p == info.deploy_inscription_id => {}
                _ => return Err(TokenError::SelfMintParentMismatch),
            }
        }

        let amount = FixedDecimal::parse(raw_amt, info.decimal)?;
        if amount.sign() <= 0 || amount.cmp_value(&info.limit) == std::cmp::Ordering::Greater {
            return Err(TokenError::BadAmount(raw_amt.to_string()));
        }

        if info.total_minted.cmp_value(&info.max) != std::cmp::Ordering::Less {
            self.push_history(
                ctx,
                &lower,
                HistoryEntry {
                    create_idx_key,
                    kind: HistoryKind::Mint,
                    valid: false,
                    pk_script: owner.clone(),
                    amount: amount.clone(),
                },
            );
            return Err(TokenError::MintExhausted);
        }

        let remaining = info.remaining_mintable();
        let (credited, clamped) = if amount.cmp_value(&remaining) == std::cmp::Ordering::Greater {
            let msg = format!(
                "amt has been cut off to fit the supply: requested {}, credited {}",
                amount, remaining
            );
            (remaining, Some(msg))
        } else {
            (amount, None)
        };

        let scale = info.decimal;
        {
            let bal = self.balance_mut(&lower, owner, scale);
            bal.available = bal
                .available
                .add(&credited)
                .expect("available and credited share the token's decimal scale");
            if block_time > 0 {
                bal.available_safe = bal
                    .available_safe
                    .add(&credited)
                    .expect("available_safe and credited share the token's decimal scale");
            }
        }

        let burned = owner.is_burn_sink();

        let info = self.tokens.get_mut(&lower).expect("checked above");
        info.total_minted = info
            .total_minted
            .add(&credited)
            .expect("total_minted and credited share the token's decimal scale");
        if burned {
            info.burned = info
                .burned
                .add(&credited)
                .expect("burned and credited share the token's decimal scale");
        }
        if info.total_minted.cmp_value(&info.max) != std::cmp::Ordering::Less
            && info.complete_height == 0
        {
            info.complete_height = height;
            info.complete_block_time = block_time;
            info!("brc20 mint complete: tick={} at height={}", info.ticker, height);
        }

        self.push_history(
            ctx,
            &lower,
            HistoryEntry {
                create_idx_key,
                kind: HistoryKind::Mint,
                valid: true,
                pk_script: owner.clone(),
                amount: credited.clone(),
            },
        );

        Ok(MintOutcome {
            ticker,
            credited,
            clamped,
            burned,
        })
    }

    /// Inscribe-transfer.
    pub fn inscribe_transfer(
        &mut self,
        ctx: &IndexerContext,
        raw_tick: &str,
        raw_amt: &str,
        owner: &PkScript,
        create_idx_key: CreateIdxKey,
        inscription_number: i64,
        height: u32,
        tx_idx: u32,
    ) -> Result<TransferOutcome, TokenError> {
        let ticker = Ticker::parse(raw_tick)?;
        let lower = ticker.lower().to_string();
        let info = self
            .tokens
            .get(&lower)
            .ok_or_else(|| TokenError::UnknownTicker(lower.clone()))?;
        let scale = info.decimal;
        let max = info.max.clone();

        let amount = FixedDecimal::parse(raw_amt, scale)?;
        if amount.sign() <= 0 || amount.cmp_value(&max) == std::cmp::Ordering::Greater {
            return Err(TokenError::BadAmount(raw_amt.to_string()));
        }

        let bal = self.balance_mut(&lower, owner, scale);
        if bal.available.cmp_value(&amount) != std::cmp::Ordering::Less {
            bal.available = bal
                .available
                .sub(&amount)
                .expect("available and amount share the token's decimal scale");
            bal.available_safe = bal
                .available_safe
                .sub(&amount)
                .unwrap_or_else(|_| bal.available_safe.clone());
            bal.transferable = bal
                .transferable
                .add(&amount)
                .expect("transferable and amount share the token's decimal scale");

            let pending = PendingTransfer {
                ticker: ticker.clone(),
                amount: amount.clone(),
                owner: owner.clone(),
                meta: TransferMeta {
                    inscription_number,
                    height,
                    tx_idx,
                },
            };
            self.valid_transfer_map.insert(create_idx_key, pending);

            self.push_history(
                ctx,
                &lower,
                HistoryEntry {
                    create_idx_key,
                    kind: HistoryKind::InscribeTransfer,
                    valid: true,
                    pk_script: owner.clone(),
                    amount: amount.clone(),
                },
            );

            debug!("brc20 inscribe-transfer valid: tick={} amount={}", ticker, amount);
            Ok(TransferOutcome::Valid { ticker, amount })
        } else {
            let pending = PendingTransfer {
                ticker: ticker.clone(),
                amount: amount.clone(),
                owner: owner.clone(),
                meta: TransferMeta {
                    inscription_number,
                    height,
                    tx_idx,
                },
            };
            self.invalid_transfer_map.insert(create_idx_key, pending);

            self.push_history(
                ctx,
                &lower,
                HistoryEntry {
                    create_idx_key,
                    kind: HistoryKind::InscribeTransfer,
                    valid: false,
                    pk_script: owner.clone(),
                    amount: amount.clone(),
                },
            );

            warn!(
                "brc20 inscribe-transfer invalid (insufficient balance): tick={} amount={}",
                ticker, amount
            );
            Ok(TransferOutcome::Invalid {
                ticker,
                requested: amount,
            })
        }
    }

    /// Transfer-move: the first move of an
    /// inscribe-transfer inscription. Triggers only when `sequence == 1`
    /// at the call site (the dispatcher enforces that).
    pub fn process_transfer_move(
        &mut self,
        ctx: &IndexerContext,
        create_idx_key: CreateIdxKey,
        sender: &PkScript,
        receiver: &PkScript,
        satoshi: u64,
        confirmed: bool,
        height: u32,
    ) -> MoveOutcome {
        let pending = self
            .valid_transfer_map
            .remove(&create_idx_key)
            .map(|p| (p, true))
            .or_else(|| self.invalid_transfer_map.get(&create_idx_key).cloned().map(|p| (p, false)));

        let Some((pending, was_valid)) = pending else {
            return MoveOutcome {
                ticker: None,
                amount: FixedDecimal::zero(0),
                sender: sender.clone(),
                receiver: receiver.clone(),
                applied: false,
                receiver_is_burn: false,
                self_mint: false,
                height,
            };
        };

        let lower = pending.ticker.lower().to_string();
        let self_mint = self
            .tokens
            .get(&lower)
            .map(|t| t.self_mint)
            .unwrap_or(false);

        let no_op = !was_valid || sender == receiver || satoshi == 0;
        if no_op {
            if was_valid {
                // Should not happen: a valid entry was already removed
                // above, so re-insert it untouched for no-op self-sends.
                self.valid_transfer_map.insert(create_idx_key, pending.clone());
            }
            self.push_history(
                ctx,
                &lower,
                HistoryEntry {
                    create_idx_key,
                    kind: HistoryKind::Send,
                    valid: was_valid,
                    pk_script: sender.clone(),
                    amount: pending.amount.clone(),
                },
            );
            return MoveOutcome {
                ticker: Some(pending.ticker),
                amount: pending.amount,
                sender: sender.clone(),
                receiver: receiver.clone(),
                applied: false,
                receiver_is_burn: receiver.is_burn_sink(),
                self_mint,
                height,
            };
        }

        let scale = self.tokens.get(&lower).map(|t| t.decimal).unwrap_or(0);
        {
            let from_bal = self.balance_mut(&lower, sender, scale);
            from_bal.transferable = from_bal
                .transferable
                .sub(&pending.amount)
                .expect("transferable and pending amount share the ticker's decimal scale");
        }
        {
            let to_bal = self.balance_mut(&lower, receiver, scale);
            to_bal.available = to_bal
                .available
                .add(&pending.amount)
                .expect("available and pending amount share the ticker's decimal scale");
            if confirmed {
                to_bal.available_safe = to_bal
                    .available_safe
                    .add(&pending.amount)
                    .expect("available_safe and pending amount share the ticker's decimal scale");
            }
        }

        let receiver_is_burn = receiver.is_burn_sink();
        if receiver_is_burn {
            if let Some(info) = self.tokens.get_mut(&lower) {
                info.burned = info
                    .burned
                    .add(&pending.amount)
                    .expect("burned and pending amount share the ticker's decimal scale");
            }
        }

        self.push_history(
            ctx,
            &lower,
            HistoryEntry {
                create_idx_key,
                kind: HistoryKind::Send,
                valid: true,
                pk_script: sender.clone(),
                amount: pending.amount.clone(),
            },
        );

        MoveOutcome {
            ticker: Some(pending.ticker),
            amount: pending.amount,
            sender: sender.clone(),
            receiver: receiver.clone(),
            applied: true,
            receiver_is_burn,
            self_mint,
            height,
        }
    }

    /// End-of-stream sweep (C8): drop holders whose `overall` balance is
    /// zero.
    pub fn sweep_zero_balances(&mut self) -> usize {
        let before = self.balances.len();
        self.balances.retain(|_, bal| !bal.is_zero());
        before - self.balances.len()
    }
}

/// Parse a `max`/`lim` field: `0` is legal only for self-mint (meaning
/// "unbounded", resolved below to `u64::MAX * 10^dec`); otherwise it must
/// be `> 0` and fit `u64::MAX * 10^dec`.
fn parse_supply(raw: &str, dec: u8, self_mint: bool) -> Result<FixedDecimal, TokenError> {
    let value = FixedDecimal::parse(raw, dec)?;
    if value.sign() < 0 {
        return Err(TokenError::BadAmount(raw.to_string()));
    }
    if value.is_zero() && !self_mint {
        return Err(TokenError::BadAmount(raw.to_string()));
    }
    if value.is_overflow_u64() {
        return Err(TokenError::BadAmount(raw.to_string()));
    }
    Ok(value)
}

fn unbounded_if_zero(value: FixedDecimal, dec: u8, self_mint: bool) -> Result<FixedDecimal, TokenError> {
    if self_mint && value.is_zero() {
        let max = FixedDecimal::from_raw(
            num_bigint::BigInt::from(u64::MAX) * num_bigint::BigInt::from(10u64).pow(dec as u32),
            dec,
        );
        Ok(max)
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> IndexerContext {
        IndexerContext::default()
    }

    fn pk(byte: u8) -> PkScript {
        PkScript(vec![byte])
    }

    #[test]
    fn deploy_mint_transfer_round_trip() {
        let mut ledger = TokenLedger::new();
        let ctx = ctx();
        let deploy_id = InscriptionId::new([1u8; 32], 0);
        ledger
            .deploy(&ctx, "ordi", "21000000", Some("1000"), Some("18"), None, deploy_id.clone(), 1)
            .unwrap();

        let a = pk(0xA0);
        let b = pk(0xB0);

        ledger
            .mint(&ctx, "ordi", "1000", &a, CreateIdxKey::new(1, 0), 1, 100, None)
            .unwrap();

        ledger
            .inscribe_transfer(&ctx, "ordi", "400", &a, CreateIdxKey::new(2, 0), 1, 2, 0)
            .unwrap();

        let outcome = ledger.process_transfer_move(&ctx, CreateIdxKey::new(2, 0), &a, &b, 1, true, 3);
        assert!(outcome.applied);

        let bal_a = ledger.balance("ordi", &a).unwrap();
        assert_eq!(bal_a.available.to_string(), "600");
        assert_eq!(bal_a.transferable.to_string(), "0");

        let bal_b = ledger.balance("ordi", &b).unwrap();
        assert_eq!(bal_b.available.to_string(), "400");

        let info = ledger.get("ordi").unwrap();
        assert_eq!(info.total_minted.to_string(), "1000");
    }

    #[test]
    fn mint_exhaustion_clamps_and_completes() {
        let mut ledger = TokenLedger::new();
        let ctx = ctx();
        ledger
            .deploy(&ctx, "abcd", "5", Some("10"), Some("0"), None, InscriptionId::new([2u8; 32], 0), 1)
            .unwrap();
        let a = pk(1);
        let b = pk(2);

        let r1 = ledger
            .mint(&ctx, "abcd", "3", &a, CreateIdxKey::new(1, 0), 10, 100, None)
            .unwrap();
        assert_eq!(r1.credited.to_string(), "3");

        let r2 = ledger
            .mint(&ctx, "abcd", "3", &b, CreateIdxKey::new(1, 1), 11, 100, None)
            .unwrap();
        assert_eq!(r2.credited.to_string(), "2");
        assert!(r2.clamped.is_some());

        let info = ledger.get("abcd").unwrap();
        assert_eq!(info.total_minted.to_string(), "5");
        assert_eq!(info.complete_height, 11);
    }

    #[test]
    fn invalid_inscribe_transfer_is_audited_and_never_consumed() {
        let mut ledger = TokenLedger::new();
        let ctx = ctx();
        ledger
            .deploy(&ctx, "ordi", "21000000", Some("1000"), Some("18"), None, InscriptionId::new([3u8; 32], 0), 1)
            .unwrap();
        let a = pk(1);
        ledger
            .mint(&ctx, "ordi", "10", &a, CreateIdxKey::new(1, 0), 1, 100, None)
            .unwrap();

        let key = CreateIdxKey::new(2, 0);
        let out = ledger
            .inscribe_transfer(&ctx, "ordi", "20", &a, key, 1, 2, 0)
            .unwrap();
        assert!(matches!(out, TransferOutcome::Invalid { .. }));

        let b = pk(2);
        let mv = ledger.process_transfer_move(&ctx, key, &a, &b, 1, true, 3);
        assert!(!mv.applied);

        let key2 = CreateIdxKey::new(4, 0);
        let out2 = ledger
            .inscribe_transfer(&ctx, "ordi", "5", &a, key2, 1, 4, 0)
            .unwrap();
        assert!(matches!(out2, TransferOutcome::Valid { .. }));
    }
}

