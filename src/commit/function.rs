//! Per-function wire parsing (§4.3's seven-function closed enum) and the
//! parameter-count/shape checks §4.3/`module_commit_verify.go`'s
//! `ProcessInscribeCommitPreVerify` performs before a function ever
//! touches ledger state.
//!
//! The pre-`ENABLE_SWAP_WITHDRAW_HEIGHT` wire format encodes a pool pair
//! as a single legacy parameter (`PoolPair::decode_wire_param`); from that
//! height on, `token0`/`token1` are carried as two separate parameters
//! (`paramOffset = 1`). Both shapes are parsed into the same
//! [`FunctionBody`] so the execution side never branches on height again.

use crate::context::IndexerContext;
use crate::decimal::FixedDecimal;
use crate::error::CommitError;
use crate::event::payload::CommitFunctionRaw;
use crate::ids::{PoolPair, Ticker};
use crate::script::{AddressCodec, PkScript};
use crate::token::TokenLedger;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapDirection {
    ExactIn,
    ExactOut,
}

/// The closed set of commit functions (Design Note in `spec.md` §9: a
/// tagged union, not a trait/interface map).
#[derive(Clone, Debug)]
pub enum FunctionBody {
    DeployPool {
        token0: String,
        token1: String,
    },
    AddLiq {
        token0: String,
        token1: String,
        amt0: FixedDecimal,
        amt1: FixedDecimal,
        lp_expected: FixedDecimal,
        slippage: u64,
    },
    RemoveLiq {
        token0: String,
        token1: String,
        lp_amt: FixedDecimal,
        min_amt0: FixedDecimal,
        min_amt1: FixedDecimal,
        slippage: u64,
    },
    Swap {
        token0: String,
        token1: String,
        /// The ticker the amount/direction are specified against.
        token_spec: String,
        amt_spec: FixedDecimal,
        direction: SwapDirection,
        counter_amt: FixedDecimal,
        slippage: u64,
    },
    Send {
        to: PkScript,
        ticker: String,
        amt: FixedDecimal,
    },
    SendLp {
        to: PkScript,
        token0: String,
        token1: String,
        lp_amt: FixedDecimal,
    },
    DecreaseApproval {
        ticker: String,
        amt: FixedDecimal,
    },
}

impl FunctionBody {
    pub fn name(&self) -> &'static str {
        match self {
            FunctionBody::DeployPool { .. } => "deploy-pool",
            FunctionBody::AddLiq { .. } => "add-liq",
            FunctionBody::RemoveLiq { .. } => "remove-liq",
            FunctionBody::Swap { .. } => "swap",
            FunctionBody::Send { .. } => "send",
            FunctionBody::SendLp { .. } => "sendlp",
            FunctionBody::DecreaseApproval { .. } => "decrease-approval",
        }
    }
}

/// `1` at/after `ENABLE_SWAP_WITHDRAW_HEIGHT`, `0` before: the number of
/// extra leading parameters the two-token wire form adds over the legacy
/// single-pool-pair-parameter form.
fn param_offset(ctx: &IndexerContext, height: u32) -> usize {
    if ctx.swap_withdraw_enabled_at(height) {
        1
    } else {
        0
    }
}

fn lower_ticker(raw: &str) -> Result<String, CommitError> {
    Ticker::parse(raw)
        .map(|t| t.lower().to_string())
        .map_err(|_| CommitError::MalformedBody(format!("bad ticker `{}`", raw)))
}

/// `CheckTickVerify`: the ticker must be deployed and `amt_str` must parse
/// at its decimal scale within `[0, max]`.
pub(crate) fn check_tick_amount(tokens: &TokenLedger, tick_lower: &str, amt_str: &str) -> Result<FixedDecimal, CommitError> {
    let info = tokens
        .get(tick_lower)
        .ok_or_else(|| CommitError::MalformedBody(format!("unknown ticker `{}`", tick_lower)))?;
    let amt = FixedDecimal::parse(amt_str, info.decimal)
        .map_err(|_| CommitError::MalformedBody(format!("bad amount `{}`", amt_str)))?;
    if amt.sign() < 0 || amt.cmp_value(&info.max) == std::cmp::Ordering::Greater {
        return Err(CommitError::MalformedBody(format!("amount `{}` out of range for `{}`", amt_str, tick_lower)));
    }
    Ok(amt)
}

/// A scale-3 parts-per-1000 rate (fee rate or slippage), parsed and
/// range-checked to `[0, 1000]`.
fn parse_rate(s: &str) -> Result<u64, CommitError> {
    let v = FixedDecimal::parse(s, 3).map_err(|_| CommitError::MalformedBody(format!("bad rate `{}`", s)))?;
    if v.sign() < 0 {
        return Err(CommitError::MalformedBody(format!("negative rate `{}`", s)));
    }
    let raw = v.to_u128().ok_or_else(|| CommitError::MalformedBody(format!("rate `{}` too large", s)))?;
    if raw > 1000 {
        return Err(CommitError::MalformedBody(format!("rate `{}` exceeds 1000", s)));
    }
    Ok(raw as u64)
}

fn resolve_pair_tokens(ctx: &IndexerContext, height: u32, params: &[String], po: usize) -> Result<(String, String), CommitError> {
    if po == 0 {
        let (t0, t1) = PoolPair::decode_wire_param(&params[0])
            .ok_or_else(|| CommitError::MalformedBody("bad legacy pool-pair parameter".to_string()))?;
        Ok((lower_ticker(&t0)?, lower_ticker(&t1)?))
    } else {
        let _ = ctx;
        Ok((lower_ticker(&params[0])?, lower_ticker(&params[1])?))
    }
}

/// Parse and range-check one commit function's parameters (the
/// non-signature half of `ProcessInscribeCommitPreVerify`). Does not touch
/// ledger state; `tokens` is consulted read-only for ticker existence and
/// decimal scale.
pub fn parse_function(
    ctx: &IndexerContext,
    tokens: &TokenLedger,
    codec: &dyn AddressCodec,
    height: u32,
    raw: &CommitFunctionRaw,
) -> Result<FunctionBody, CommitError> {
    let po = param_offset(ctx, height);
    let params = &raw.params;

    match raw.func.as_str() {
        "deploy-pool" => {
            if params.len() != 2 {
                return Err(CommitError::MalformedBody("deploy-pool: expected 2 params".to_string()));
            }
            let token0 = lower_ticker(&params[0])?;
            let token1 = lower_ticker(&params[1])?;
            if token0 == token1 {
                return Err(CommitError::MalformedBody("deploy-pool: tokens identical".to_string()));
            }
            tokens.get(&token0).ok_or_else(|| CommitError::MalformedBody("deploy-pool: unknown token0".to_string()))?;
            tokens.get(&token1).ok_or_else(|| CommitError::MalformedBody("deploy-pool: unknown token1".to_string()))?;
            Ok(FunctionBody::DeployPool { token0, token1 })
        }
        "add-liq" => {
            if params.len() != 5 + po {
                return Err(CommitError::MalformedBody("add-liq: wrong param count".to_string()));
            }
            let (token0, token1) = resolve_pair_tokens(ctx, height, params, po)?;
            let amt0 = check_tick_amount(tokens, &token0, &params[1 + po])?;
            let amt1 = check_tick_amount(tokens, &token1, &params[2 + po])?;
            let lp_expected = FixedDecimal::parse(&params[3 + po], 18).map_err(|_| CommitError::MalformedBody("add-liq: bad lp amount".to_string()))?;
            let slippage = parse_rate(&params[4 + po])?;
            Ok(FunctionBody::AddLiq {
                token0,
                token1,
                amt0,
                amt1,
                lp_expected,
                slippage,
            })
        }
        "remove-liq" => {
            if params.len() != 5 + po {
                return Err(CommitError::MalformedBody("remove-liq: wrong param count".to_string()));
            }
            let (token0, token1) = resolve_pair_tokens(ctx, height, params, po)?;
            let lp_amt = FixedDecimal::parse(&params[1 + po], 18).map_err(|_| CommitError::MalformedBody("remove-liq: bad lp amount".to_string()))?;
            let min_amt0 = check_tick_amount(tokens, &token0, &params[2 + po])?;
            let min_amt1 = check_tick_amount(tokens, &token1, &params[3 + po])?;
            let slippage = parse_rate(&params[4 + po])?;
            Ok(FunctionBody::RemoveLiq {
                token0,
                token1,
                lp_amt,
                min_amt0,
                min_amt1,
                slippage,
            })
        }
        "swap" => {
            if params.len() != 6 + po {
                return Err(CommitError::MalformedBody("swap: wrong param count".to_string()));
            }
            let (token0, token1) = resolve_pair_tokens(ctx, height, params, po)?;
            let token_spec = lower_ticker(&params[1 + po])?;
            if token_spec != token0 && token_spec != token1 {
                return Err(CommitError::MalformedBody("swap: token not in pair".to_string()));
            }
            let other = if token_spec == token0 { token1.clone() } else { token0.clone() };
            let direction = match params[3 + po].as_str() {
                "exactIn" => SwapDirection::ExactIn,
                "exactOut" => SwapDirection::ExactOut,
                _ => return Err(CommitError::MalformedBody("swap: bad direction".to_string())),
            };
            let amt_spec = check_tick_amount(tokens, &token_spec, &params[2 + po])?;
            let counter_amt = check_tick_amount(tokens, &other, &params[4 + po])?;
            let slippage = parse_rate(&params[5 + po])?;
            Ok(FunctionBody::Swap {
                token0,
                token1,
                token_spec,
                amt_spec,
                direction,
                counter_amt,
                slippage,
            })
        }
        "decrease-approval" => {
            if params.len() != 2 {
                return Err(CommitError::MalformedBody("decrease-approval: wrong param count".to_string()));
            }
            let ticker = lower_ticker(&params[0])?;
            let amt = check_tick_amount(tokens, &ticker, &params[1])?;
            Ok(FunctionBody::DecreaseApproval { ticker, amt })
        }
        "send" => {
            if params.len() != 3 {
                return Err(CommitError::MalformedBody("send: wrong param count".to_string()));
            }
            let to = codec
                .address_to_script(&params[0])
                .ok_or_else(|| CommitError::MalformedBody("send: unresolvable recipient address".to_string()))?;
            if let Some((t0, t1)) = params[1].split_once('/') {
                let token0 = lower_ticker(t0)?;
                let token1 = lower_ticker(t1)?;
                let lp_amt = FixedDecimal::parse(&params[2], 18).map_err(|_| CommitError::MalformedBody("send: bad lp amount".to_string()))?;
                Ok(FunctionBody::SendLp { to, token0, token1, lp_amt })
            } else {
                let ticker = lower_ticker(&params[1])?;
                let amt = check_tick_amount(tokens, &ticker, &params[2])?;
                Ok(FunctionBody::Send { to, ticker, amt })
            }
        }
        "sendlp" => {
            if params.len() != 4 {
                return Err(CommitError::MalformedBody("sendlp: wrong param count".to_string()));
            }
            let to = codec
                .address_to_script(&params[0])
                .ok_or_else(|| CommitError::MalformedBody("sendlp: unresolvable recipient address".to_string()))?;
            let token0 = lower_ticker(&params[1])?;
            let token1 = lower_ticker(&params[2])?;
            tokens.get(&token0).ok_or_else(|| CommitError::MalformedBody("sendlp: unknown token0".to_string()))?;
            tokens.get(&token1).ok_or_else(|| CommitError::MalformedBody("sendlp: unknown token1".to_string()))?;
            let lp_amt = FixedDecimal::parse(&params[3], 18).map_err(|_| CommitError::MalformedBody("sendlp: bad lp amount".to_string()))?;
            Ok(FunctionBody::SendLp { to, token0, token1, lp_amt })
        }
        other => Err(CommitError::UnknownFunction(other.to_string())),
    }
}
