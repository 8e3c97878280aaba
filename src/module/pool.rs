//! Constant-product pool math (C6 function semantics): deploy-pool,
//! add-liq, remove-liq, swap (exactIn/exactOut), send/sendlp,
//! decrease-approval, and gas charging. All integer math, per the
//! formulas the commit engine's functions are specified against.

use std::cmp::Ordering;

use num_bigint::BigInt;

use crate::config::{LP_SCALE, MINIMUM_LIQUIDITY, RATE_DENOMINATOR};
use crate::decimal::FixedDecimal;
use crate::error::ModuleError;
use crate::ids::{ModuleId, PoolPair};
use crate::script::PkScript;
use crate::token::TokenLedger;

use super::ledger::ModuleLedger;

fn fd_u64(v: u64, scale: u8) -> FixedDecimal {
    FixedDecimal::from_raw(BigInt::from(v), scale)
}

fn fd_min(a: &FixedDecimal, b: &FixedDecimal) -> FixedDecimal {
    if a.cmp_value(b) == Ordering::Greater {
        b.clone()
    } else {
        a.clone()
    }
}

impl ModuleLedger {
    /// Fee-dilution mint, run before any add-liq/remove-liq that touches
    /// an already-seeded pool: mints `lp_fee` to `fee_to` proportional to
    /// the growth of `rootK` since the last liquidity event.
    fn mint_fee(&mut self, module_id: &ModuleId, pair: &PoolPair, fee_to: &PkScript) -> Result<(), ModuleError> {
        let pool = self.pool(module_id, pair).ok_or_else(|| ModuleError::UnknownPool(pair.to_string()))?;
        if pool.lp_supply.is_zero() {
            return Ok(());
        }
        let root_k = pool.root_k();
        if root_k.cmp_value(&pool.last_root_k) != Ordering::Greater {
            return Ok(());
        }
        let diff = root_k.sub(&pool.last_root_k).expect("root_k and last_root_k are both scale 18");
        let five = fd_u64(5, 18);
        let denom = root_k
            .mul(&five)
            .add(&pool.last_root_k)
            .expect("root_k*5 and last_root_k are both scale 18");
        let lp_fee = pool.lp_supply.mul(&diff).div(&denom).expect("denom is positive when root_k grew");
        if lp_fee.is_zero() {
            return Ok(());
        }
        let pool = self.pool_mut(module_id, pair).expect("checked above");
        pool.lp_supply = pool.lp_supply.add(&lp_fee).expect("lp_supply and lp_fee are both scale 18");
        let slot = self.lp_balance_mut(module_id, pair, fee_to);
        *slot = slot.add(&lp_fee).expect("fee_to's lp balance and lp_fee are both scale 18");
        Ok(())
    }

    /// `deploy-pool(a, b)`.
    pub fn pool_deploy(&mut self, module_id: &ModuleId, pair: PoolPair, scale0: u8, scale1: u8) -> Result<(), ModuleError> {
        self.deploy_pool(module_id, pair, scale0, scale1)
    }

    /// `add-liq(pair, amt0, amt1, lp_expected, slippage)`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_liquidity(
        &mut self,
        module_id: &ModuleId,
        pair: &PoolPair,
        sender: &PkScript,
        fee_to: &PkScript,
        amt0_in: FixedDecimal,
        amt1_in: FixedDecimal,
        lp_expected: FixedDecimal,
        slippage: u64,
        scale0: u8,
        scale1: u8,
    ) -> Result<FixedDecimal, ModuleError> {
        let seeded = {
            let pool = self.pool(module_id, pair).ok_or_else(|| ModuleError::UnknownPool(pair.to_string()))?;
            !pool.lp_supply.is_zero()
        };

        let (amt0_final, amt1_final, lp_for_user, burn_extra) = if !seeded {
            let lp_for_pool = amt0_in.mul(&amt1_in).sqrt();
            let floor = fd_u64(MINIMUM_LIQUIDITY, LP_SCALE);
            if lp_for_pool.cmp_value(&floor) != Ordering::Greater {
                return Err(ModuleError::InitialLiquidityTooLow);
            }
            let lp_for_user = lp_for_pool.sub(&floor).expect("lp_for_pool and floor are both scale 18");
            (amt0_in, amt1_in, lp_for_user, Some(floor))
        } else {
            self.mint_fee(module_id, pair, fee_to)?;
            let pool = self.pool(module_id, pair).expect("checked above");
            let amt1_optimal = pool.reserves[1]
                .mul(&amt0_in)
                .div(&pool.reserves[0])
                .expect("reserves[0] is nonzero once seeded");
            let (amt0_final, amt1_final) = if amt1_optimal.cmp_value(&amt1_in) != Ordering::Greater {
                (amt0_in.clone(), amt1_optimal)
            } else {
                let amt0_optimal = pool.reserves[0]
                    .mul(&amt1_in)
                    .div(&pool.reserves[1])
                    .expect("reserves[1] is nonzero once seeded");
                (fd_min(&amt0_optimal, &amt0_in), amt1_in.clone())
            };
            let lp_for_pool0 = pool
                .lp_supply
                .mul(&amt0_final)
                .div(&pool.reserves[0])
                .expect("reserves[0] is nonzero once seeded");
            let lp_for_pool1 = pool
                .lp_supply
                .mul(&amt1_final)
                .div(&pool.reserves[1])
                .expect("reserves[1] is nonzero once seeded");
            let lp_for_user = fd_min(&lp_for_pool0, &lp_for_pool1);
            (amt0_final, amt1_final, lp_for_user, None)
        };

        let thousand = fd_u64(RATE_DENOMINATOR, LP_SCALE);
        let slip_factor = fd_u64(RATE_DENOMINATOR - slippage, LP_SCALE);
        let min_lp = lp_expected.mul(&slip_factor).div(&thousand).expect("thousand is nonzero");
        if lp_for_user.cmp_value(&min_lp) == Ordering::Less {
            return Err(ModuleError::SlippageExceeded);
        }

        self.debit_swap_account(module_id, &pair.tick0, scale0, sender, &amt0_final)?;
        self.debit_swap_account(module_id, &pair.tick1, scale1, sender, &amt1_final)?;

        if let Some(floor) = &burn_extra {
            let slot = self.lp_balance_mut(module_id, pair, &PkScript::burn_sink());
            *slot = slot.add(floor).expect("burn sink lp balance and floor are both scale 18");
        }
        let slot = self.lp_balance_mut(module_id, pair, sender);
        *slot = slot.add(&lp_for_user).expect("sender's lp balance and lp_for_user are both scale 18");

        let pool = self.pool_mut(module_id, pair).expect("checked above");
        pool.reserves[0] = pool.reserves[0].add(&amt0_final).expect("reserves[0] and amt0_final share scale0");
        pool.reserves[1] = pool.reserves[1].add(&amt1_final).expect("reserves[1] and amt1_final share scale1");
        let total_minted = match &burn_extra {
            Some(floor) => lp_for_user.add(floor).expect("lp_for_user and floor are both scale 18"),
            None => lp_for_user.clone(),
        };
        pool.lp_supply = pool.lp_supply.add(&total_minted).expect("lp_supply and total_minted are both scale 18");
        pool.last_root_k = pool.root_k();

        Ok(lp_for_user)
    }

    /// `remove-liq(pair, lp_amt, min_amt0, min_amt1, slippage)`.
    #[allow(clippy::too_many_arguments)]
    pub fn remove_liquidity(
        &mut self,
        module_id: &ModuleId,
        pair: &PoolPair,
        sender: &PkScript,
        fee_to: &PkScript,
        lp_amt: FixedDecimal,
        min_amt0: FixedDecimal,
        min_amt1: FixedDecimal,
        slippage: u64,
        scale0: u8,
        scale1: u8,
    ) -> Result<(FixedDecimal, FixedDecimal), ModuleError> {
        self.mint_fee(module_id, pair, fee_to)?;

        let held = self.lp_balance(module_id, pair, sender);
        if held.cmp_value(&lp_amt) == Ordering::Less {
            return Err(ModuleError::InsufficientBalance {
                need: lp_amt.to_string(),
                have: held.to_string(),
            });
        }

        let (amt0, amt1) = {
            let pool = self.pool(module_id, pair).ok_or_else(|| ModuleError::UnknownPool(pair.to_string()))?;
            let amt0 = pool.reserves[0].mul(&lp_amt).div(&pool.lp_supply).expect("lp_supply is nonzero while lp_amt is held");
            let amt1 = pool.reserves[1].mul(&lp_amt).div(&pool.lp_supply).expect("lp_supply is nonzero while lp_amt is held");
            (amt0, amt1)
        };

        let thousand = fd_u64(RATE_DENOMINATOR, scale0.max(scale1));
        let _ = thousand;
        let factor0 = fd_u64(RATE_DENOMINATOR - slippage, scale0);
        let factor1 = fd_u64(RATE_DENOMINATOR - slippage, scale1);
        let expected0 = min_amt0.mul(&factor0).div(&fd_u64(RATE_DENOMINATOR, scale0)).expect("RATE_DENOMINATOR is nonzero");
        let expected1 = min_amt1.mul(&factor1).div(&fd_u64(RATE_DENOMINATOR, scale1)).expect("RATE_DENOMINATOR is nonzero");
        if amt0.cmp_value(&expected0) == Ordering::Less || amt1.cmp_value(&expected1) == Ordering::Less {
            return Err(ModuleError::SlippageExceeded);
        }

        let slot = self.lp_balance_mut(module_id, pair, sender);
        *slot = slot.sub(&lp_amt).expect("sender holds at least lp_amt");

        self.credit_swap_account(module_id, &pair.tick0, scale0, sender, &amt0);
        self.credit_swap_account(module_id, &pair.tick1, scale1, sender, &amt1);

        let pool = self.pool_mut(module_id, pair).expect("checked above");
        pool.reserves[0] = pool.reserves[0].sub(&amt0).expect("reserves[0] holds at least amt0");
        pool.reserves[1] = pool.reserves[1].sub(&amt1).expect("reserves[1] holds at least amt1");
        pool.lp_supply = pool.lp_supply.sub(&lp_amt).expect("lp_supply holds at least lp_amt");
        pool.last_root_k = pool.root_k();

        Ok((amt0, amt1))
    }

    /// `swap(pair, tokenIn, amtIn, exactIn, counter_amt, slippage)`.
    #[allow(clippy::too_many_arguments)]
    pub fn swap_exact_in(
        &mut self,
        module_id: &ModuleId,
        pair: &PoolPair,
        sender: &PkScript,
        token_in_idx: usize,
        amt_in: FixedDecimal,
        counter_amt_min_out: FixedDecimal,
        slippage: u64,
        fee_rate: u64,
        scale_in: u8,
        scale_out: u8,
    ) -> Result<FixedDecimal, ModuleError> {
        let token_out_idx = PoolPair::other_index(token_in_idx);
        let amt_out = {
            let pool = self.pool(module_id, pair).ok_or_else(|| ModuleError::UnknownPool(pair.to_string()))?;
            let reserve_in = &pool.reserves[token_in_idx];
            let reserve_out = &pool.reserves[token_out_idx];
            let amt_in_with_fee = amt_in.mul(&fd_u64(RATE_DENOMINATOR - fee_rate, scale_in));
            let numerator = reserve_out.mul(&amt_in_with_fee);
            let denom = reserve_in
                .mul(&fd_u64(RATE_DENOMINATOR, scale_in))
                .add(&amt_in_with_fee)
                .expect("reserve_in*1000 and amt_in_with_fee share scale_in");
            numerator.div(&denom).map_err(|_| ModuleError::InsufficientBalance {
                need: amt_in.to_string(),
                have: reserve_in.to_string(),
            })?
        };

        let threshold = counter_amt_min_out
            .mul(&fd_u64(RATE_DENOMINATOR, scale_out))
            .div(&fd_u64(RATE_DENOMINATOR + slippage, scale_out))
            .expect("RATE_DENOMINATOR + slippage is nonzero");
        if amt_out.cmp_value(&threshold) == Ordering::Less {
            return Err(ModuleError::SlippageExceeded);
        }

        self.debit_swap_account(module_id, &pair.tick_at(token_in_idx), scale_in, sender, &amt_in)?;
        self.credit_swap_account(module_id, &pair.tick_at(token_out_idx), scale_out, sender, &amt_out);

        let pool = self.pool_mut(module_id, pair).expect("checked above");
        pool.reserves[token_in_idx] = pool.reserves[token_in_idx]
            .add(&amt_in)
            .expect("reserves[token_in_idx] and amt_in share scale_in");
        pool.reserves[token_out_idx] = pool.reserves[token_out_idx]
            .sub(&amt_out)
            .expect("reserves[token_out_idx] holds at least amt_out");
        pool.last_root_k = pool.root_k();

        Ok(amt_out)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn swap_exact_out(
        &mut self,
        module_id: &ModuleId,
        pair: &PoolPair,
        sender: &PkScript,
        token_out_idx: usize,
        amt_out: FixedDecimal,
        counter_amt_max_in: FixedDecimal,
        slippage: u64,
        fee_rate: u64,
        scale_in: u8,
        scale_out: u8,
    ) -> Result<FixedDecimal, ModuleError> {
        let token_in_idx = PoolPair::other_index(token_out_idx);
        let amt_in = {
            let pool = self.pool(module_id, pair).ok_or_else(|| ModuleError::UnknownPool(pair.to_string()))?;
            let reserve_in = &pool.reserves[token_in_idx];
            let reserve_out = &pool.reserves[token_out_idx];
            if reserve_out.cmp_value(&amt_out) != Ordering::Greater {
                return Err(ModuleError::InsufficientBalance {
                    need: amt_out.to_string(),
                    have: reserve_out.to_string(),
                });
            }
            let numerator = reserve_in.mul(&amt_out.mul(&fd_u64(RATE_DENOMINATOR, scale_out)));
            let denom = reserve_out
                .sub(&amt_out)
                .expect("checked above that reserve_out > amt_out")
                .mul(&fd_u64(RATE_DENOMINATOR - fee_rate, scale_out));
            let base = numerator.div(&denom).map_err(|_| ModuleError::SlippageExceeded)?;
            base.add(&fd_u64(1, scale_in)).expect("base and one ulp share scale_in")
        };

        let threshold = counter_amt_max_in
            .mul(&fd_u64(RATE_DENOMINATOR + slippage, scale_in))
            .div(&fd_u64(RATE_DENOMINATOR, scale_in))
            .expect("RATE_DENOMINATOR is nonzero");
        if amt_in.cmp_value(&threshold) == Ordering::Greater {
            return Err(ModuleError::SlippageExceeded);
        }

        self.debit_swap_account(module_id, &pair.tick_at(token_in_idx), scale_in, sender, &amt_in)?;
        self.credit_swap_account(module_id, &pair.tick_at(token_out_idx), scale_out, sender, &amt_out);

        let pool = self.pool_mut(module_id, pair).expect("checked above");
        pool.reserves[token_in_idx] = pool.reserves[token_in_idx]
            .add(&amt_in)
            .expect("reserves[token_in_idx] and amt_in share scale_in");
        pool.reserves[token_out_idx] = pool.reserves[token_out_idx]
            .sub(&amt_out)
            .expect("reserves[token_out_idx] holds at least amt_out");
        pool.last_root_k = pool.root_k();

        Ok(amt_in)
    }

    /// `send(recipient, ticker, amt)`.
    pub fn send(
        &mut self,
        module_id: &ModuleId,
        ticker_lower: &str,
        scale: u8,
        sender: &PkScript,
        receiver: &PkScript,
        amt: &FixedDecimal,
    ) -> Result<(), ModuleError> {
        self.debit_swap_account(module_id, ticker_lower, scale, sender, amt)?;
        self.credit_swap_account(module_id, ticker_lower, scale, receiver, amt);
        Ok(())
    }

    /// `sendlp(recipient, token0, token1, lp_amt)`.
    pub fn send_lp(&mut self, module_id: &ModuleId, pair: &PoolPair, sender: &PkScript, receiver: &PkScript, lp_amt: &FixedDecimal) -> Result<(), ModuleError> {
        let held = self.lp_balance(module_id, pair, sender);
        if held.cmp_value(lp_amt) == Ordering::Less {
            return Err(ModuleError::InsufficientBalance {
                need: lp_amt.to_string(),
                have: held.to_string(),
            });
        }
        let from = self.lp_balance_mut(module_id, pair, sender);
        *from = from.sub(lp_amt).expect("sender holds at least lp_amt");
        let to = self.lp_balance_mut(module_id, pair, receiver);
        *to = to.add(lp_amt).expect("receiver's lp balance and lp_amt are both scale 18");
        Ok(())
    }

    /// `decrease-approval(ticker, amt)`: moves `swap_account` back to the
    /// base ledger's `available`, letting the owner withdraw to the token
    /// ledger proper.
    pub fn decrease_approval(&mut self, module_id: &ModuleId, ticker_lower: &str, scale: u8, owner: &PkScript, amt: &FixedDecimal) -> Result<(), ModuleError> {
        self.debit_swap_account(module_id, ticker_lower, scale, owner, amt)?;
        self.credit_available(module_id, ticker_lower, scale, owner, amt);
        Ok(())
    }

    /// Gas charge for one commit function: `gas_price * byte_size` before
    /// `ENABLE_SWAP_WITHDRAW_HEIGHT`, `gas_price * 1` after.
    pub fn charge_gas(
        &mut self,
        module_id: &ModuleId,
        tokens: &TokenLedger,
        payer: &PkScript,
        gas_price: &FixedDecimal,
        byte_size: u64,
        charge_by_size: bool,
    ) -> Result<(), ModuleError> {
        let module = self.get(module_id).ok_or_else(|| ModuleError::UnknownModule(module_id.to_string()))?;
        let gas_tick_lower = module.gas_tick.lower().to_string();
        let gas_to = module.gas_to.clone();
        let info = tokens
            .get(&gas_tick_lower)
            .ok_or_else(|| ModuleError::UnknownGasTick(gas_tick_lower.clone()))?;
        let scale = info.decimal;

        let multiplier = if charge_by_size { byte_size } else { 1 };
        let gas_amt = gas_price.mul(&fd_u64(multiplier, scale));

        self.debit_swap_account(module_id, &gas_tick_lower, scale, payer, &gas_amt)
            .map_err(|_| ModuleError::InsufficientBalance {
                need: gas_amt.to_string(),
                have: self.balance(module_id, &gas_tick_lower, payer).map(|b| b.swap_account.to_string()).unwrap_or_default(),
            })?;
        self.credit_swap_account(module_id, &gas_tick_lower, scale, &gas_to, &gas_amt);
        Ok(())
    }
}
