//! The collateral pool engine.
//!
//! [`PoolEngine`] owns every piece of pool state (clock, oracle, collateral,
//! both ledgers, the decayed signals) and exposes one method per external
//! instruction. Each instruction is staged on a copy of the engine and
//! committed only if all of its steps succeed, so a rejected instruction
//! leaves state and the event queue exactly as they were.

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::decay::{DecayKind, DecayedSignal};
use crate::error::{require_positive, PoolError, Result};
use crate::events::{EngineEvent, FundLeg, FundPricing};
use crate::guard::{DebtRatioGuard, FloorState, FloorTrigger};
use crate::ledger::TokenLedger;
use crate::oracle::OracleFeed;
use crate::pool::CollateralPool;
use crate::pricing::{AdjustmentFactors, PriceOptions, Pricing};
use crate::status::{FloorStatus, PoolStatus, Quote};
use crate::types::{HolderId, PriceSide, Token};

/// USM/FUM collateral pool engine.
#[derive(Debug, Clone)]
pub struct PoolEngine {
    config: EngineConfig,
    clock: Clock,
    oracle: OracleFeed,
    pool: CollateralPool,
    stable: TokenLedger,
    funding: TokenLedger,
    mint_burn_adjustment: DecayedSignal,
    fund_defund_adjustment: DecayedSignal,
    /// Minimum FUM buy price in collateral units.
    min_funding_buy_price: DecayedSignal,
    guard: DebtRatioGuard,
    events: Vec<EngineEvent>,
}

impl PoolEngine {
    /// Create an empty pool.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let start = config.start_timestamp();
        let oracle = OracleFeed::new(
            config.initial_oracle.sell_price,
            config.initial_oracle.buy_price,
        )?;

        info!(
            max_debt_ratio = config.max_debt_ratio,
            sell = oracle.sell_price(),
            buy = oracle.buy_price(),
            start,
            "Pool engine created"
        );

        Ok(Self {
            clock: Clock::new(start),
            oracle,
            pool: CollateralPool::new(),
            stable: TokenLedger::new(Token::Stable),
            funding: TokenLedger::new(Token::Funding),
            mint_burn_adjustment: DecayedSignal::at_baseline(
                DecayKind::Multiplicative,
                config.adjustment_half_life_secs,
                start,
            ),
            fund_defund_adjustment: DecayedSignal::at_baseline(
                DecayKind::Multiplicative,
                config.adjustment_half_life_secs,
                start,
            ),
            min_funding_buy_price: DecayedSignal::at_baseline(
                DecayKind::Linear,
                config.min_buy_price_half_life_secs,
                start,
            ),
            guard: DebtRatioGuard::new(config.max_debt_ratio),
            events: Vec::new(),
            config,
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current simulated time, seconds since the Unix epoch.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn oracle(&self) -> &OracleFeed {
        &self.oracle
    }

    pub fn pool_collateral(&self) -> f64 {
        self.pool.balance()
    }

    pub fn stable_balance(&self, holder: &HolderId) -> f64 {
        self.stable.balance_of(holder)
    }

    pub fn funding_balance(&self, holder: &HolderId) -> f64 {
        self.funding.balance_of(holder)
    }

    pub fn stable_outstanding(&self) -> f64 {
        self.stable.outstanding()
    }

    pub fn funding_outstanding(&self) -> f64 {
        self.funding.outstanding()
    }

    /// Effective mint/burn adjustment at the current time.
    pub fn mint_burn_adjustment(&self) -> f64 {
        self.mint_burn_adjustment.effective(self.now())
    }

    /// Effective fund/defund adjustment at the current time.
    pub fn fund_defund_adjustment(&self) -> f64 {
        self.fund_defund_adjustment.effective(self.now())
    }

    /// Pricing view built from the current state and decayed signals.
    pub fn pricing(&self) -> Pricing {
        let now = self.now();
        Pricing {
            pool_collateral: self.pool.balance(),
            stable_outstanding: self.stable.outstanding(),
            funding_outstanding: self.funding.outstanding(),
            oracle: self.oracle,
            adjustments: AdjustmentFactors {
                mint_burn: self.mint_burn_adjustment.effective(now),
                fund_defund: self.fund_defund_adjustment.effective(now),
            },
            min_funding_buy_price_in_collateral: self.min_funding_buy_price.effective(now),
        }
    }

    pub fn debt_ratio(&self) -> f64 {
        self.debt_ratio_with(None, None)
    }

    /// Debt ratio for a hypothetical pool size and/or stable supply; `None`
    /// uses the current value.
    pub fn debt_ratio_with(&self, collateral: Option<f64>, stable: Option<f64>) -> f64 {
        let collateral = collateral.unwrap_or_else(|| self.pool.balance());
        let stable = stable.unwrap_or_else(|| self.stable.outstanding());
        DebtRatioGuard::debt_ratio(
            stable,
            Pricing::pool_value_of(collateral, self.oracle.mid_price()),
        )
    }

    fn post_trade_ratio(&self, collateral: f64, stable: f64) -> f64 {
        DebtRatioGuard::post_trade_ratio(
            stable,
            Pricing::pool_value_of(collateral, self.oracle.mid_price()),
        )
    }

    pub fn floor_state(&self) -> FloorState {
        if self.min_funding_buy_price.is_at_baseline() {
            FloorState::Inactive
        } else {
            FloorState::Active
        }
    }

    /// Decayed minimum FUM buy price in collateral units, if installed.
    pub fn min_funding_buy_price(&self) -> Option<f64> {
        match self.floor_state() {
            FloorState::Active => Some(self.min_funding_buy_price.effective(self.now())),
            FloorState::Inactive => None,
        }
    }

    /// Full snapshot of the pool.
    pub fn status(&self) -> PoolStatus {
        let pricing = self.pricing();
        let opts = PriceOptions::default();
        let mid = pricing.collateral_mid();

        PoolStatus {
            time: self.now(),
            datetime: self.clock.datetime(),
            pool_collateral: self.pool.balance(),
            collateral_price: Quote {
                buy: pricing.collateral_price(PriceSide::Buy, opts),
                sell: pricing.collateral_price(PriceSide::Sell, opts),
                mid,
            },
            pool_value: pricing.pool_value(),
            stable_outstanding: pricing.stable_outstanding,
            stable_price: Quote {
                buy: pricing.stable_token_price(PriceSide::Buy, opts),
                sell: pricing.stable_token_price(PriceSide::Sell, opts),
                mid: pricing.stable_token_price(PriceSide::Mid, opts),
            },
            buffer_value: pricing.buffer_value(),
            debt_ratio: self.debt_ratio(),
            funding_outstanding: pricing.funding_outstanding,
            funding_buy_price: pricing
                .funding_token_price(PriceSide::Buy, opts)
                .unwrap_or(1.0),
            funding_sell_price: pricing.funding_token_price(PriceSide::Sell, opts).ok(),
            min_funding_buy_price: self.min_funding_buy_price().map(|price_in_collateral| {
                FloorStatus {
                    price_in_collateral,
                    price: price_in_collateral * mid,
                }
            }),
            mint_burn_adjustment: pricing.adjustments.mint_burn,
            fund_defund_adjustment: pricing.adjustments.fund_defund,
            stable_holdings: self.stable.snapshot(),
            funding_holdings: self.funding.snapshot(),
        }
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Instructions
    // ------------------------------------------------------------------

    /// Replace the oracle quote; `buy_price` defaults to `sell_price`.
    pub fn set_oracle_price(&mut self, sell_price: f64, buy_price: Option<f64>) -> Result<()> {
        self.transact(|engine| {
            engine.oracle.set(sell_price, buy_price)?;
            engine.emit(EngineEvent::OraclePriceSet {
                at: engine.now(),
                sell_price: engine.oracle.sell_price(),
                buy_price: engine.oracle.buy_price(),
            });

            // Pool and supply are unchanged, so the crossing happened at the
            // current pool size.
            if engine.floor_needs_installing() {
                let price = engine
                    .guard
                    .funding_price_at_max_ratio(engine.pool.balance(), engine.funding.outstanding());
                engine.install_floor(price, FloorTrigger::PriceChange);
            }
            engine.reconcile_floor();
            Ok(())
        })
    }

    /// Advance the simulated clock; returns the new time.
    pub fn advance_time(&mut self, delta_secs: f64) -> Result<f64> {
        self.transact(|engine| {
            let now = engine.clock.advance(delta_secs)?;
            engine.emit(EngineEvent::TimeAdvanced {
                at: now,
                delta_secs,
            });
            engine.reconcile_floor();
            Ok(now)
        })
    }

    /// Deposit collateral for newly minted USM; returns USM minted.
    pub fn mint(&mut self, holder: &HolderId, collateral: f64) -> Result<f64> {
        self.transact(|engine| engine.mint_inner(holder, collateral))
    }

    /// Burn USM for collateral; returns collateral removed.
    pub fn burn(&mut self, holder: &HolderId, stable: f64) -> Result<f64> {
        self.transact(|engine| {
            let removed = engine.burn_inner(holder, stable, true)?;
            engine.reconcile_floor();
            Ok(removed)
        })
    }

    /// Deposit collateral for newly created FUM; returns FUM created.
    pub fn fund_from_collateral(&mut self, holder: &HolderId, collateral: f64) -> Result<f64> {
        self.transact(|engine| {
            let created = engine.fund_inner(holder, collateral)?;
            engine.reconcile_floor();
            Ok(created)
        })
    }

    /// Convert USM into FUM: burn without the backing check, then fund with
    /// the released collateral. Returns FUM created.
    pub fn fund_from_stable_token(&mut self, holder: &HolderId, stable: f64) -> Result<f64> {
        self.transact(|engine| {
            let collateral = engine.burn_inner(holder, stable, false)?;
            // Clear an obsolete floor before the fund leg prices FUM.
            engine.reconcile_floor();
            let created = engine.fund_inner(holder, collateral)?;
            engine.reconcile_floor();
            Ok(created)
        })
    }

    /// Redeem FUM for collateral; returns collateral removed.
    pub fn redeem(&mut self, holder: &HolderId, funding: f64) -> Result<f64> {
        self.transact(|engine| {
            let removed = engine.redeem_inner(holder, funding)?;
            engine.reconcile_floor();
            Ok(removed)
        })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Run `op` against a staged copy and commit only on success.
    fn transact<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let mut staged = self.clone();
        match op(&mut staged) {
            Ok(out) => {
                *self = staged;
                Ok(out)
            }
            Err(e) => {
                warn!(error = %e, "Instruction rejected");
                Err(e)
            }
        }
    }

    fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    fn mint_inner(&mut self, holder: &HolderId, amount: f64) -> Result<f64> {
        require_positive("mint amount", amount)?;
        let now = self.now();
        let pricing = self.pricing();
        let sell = pricing.collateral_price(PriceSide::Sell, PriceOptions::default());
        let pool_before = self.pool.balance();
        let stable_before = self.stable.outstanding();

        let minted = if self.pool.is_empty() {
            amount * sell
        } else {
            // Integral over a sliding-down collateral price.
            let growth = (pool_before + amount) / pool_before;
            self.mint_burn_adjustment
                .set(pricing.adjustments.mint_burn / growth, now);
            pool_before * sell * (amount / pool_before).ln_1p()
        };
        if !(minted.is_finite() && minted > 0.0) {
            return Err(PoolError::InvalidInput(format!(
                "mint of {} ETH is too small to create any USM",
                amount
            )));
        }

        self.pool.deposit(amount)?;
        self.stable.credit(holder, minted)?;
        debug!(pool_before, sell, minted, "Mint priced");
        info!(holder = %holder, collateral_in = amount, stable_out = minted, "USM minted");
        self.emit(EngineEvent::Minted {
            at: now,
            holder: holder.clone(),
            collateral_in: amount,
            stable_out: minted,
        });

        if self.floor_needs_installing() {
            let pool_after = self.pool.balance();
            let crossing = self.guard.mint_crossing_pool(
                pool_before,
                pool_after,
                pricing.collateral_mid(),
                |pool| {
                    if pool_before > 0.0 {
                        stable_before + pool_before * sell * (pool / pool_before).ln()
                    } else {
                        stable_before + (pool - pool_before) * sell
                    }
                },
            );
            let price = self
                .guard
                .funding_price_at_max_ratio(crossing, self.funding.outstanding());
            self.install_floor(price, FloorTrigger::Mint);
        }
        self.reconcile_floor();
        Ok(minted)
    }

    fn burn_inner(&mut self, holder: &HolderId, amount: f64, check_ratio: bool) -> Result<f64> {
        require_positive("burn amount", amount)?;
        self.stable.ensure_balance(holder, amount)?;
        let now = self.now();
        let pricing = self.pricing();
        let buy = pricing.collateral_price(PriceSide::Buy, PriceOptions::default());
        let pool_before = self.pool.balance();

        // Integral over a sliding-up collateral price.
        let removed = -pool_before * (-amount / (pool_before * buy)).exp_m1();
        if !(removed.is_finite() && removed > 0.0) {
            return Err(PoolError::InvalidInput(format!(
                "burn of {} USM is too small to release any ETH",
                amount
            )));
        }
        if removed > pool_before {
            return Err(PoolError::InsufficientPoolLiquidity {
                requested: removed,
                available: pool_before,
            });
        }
        if check_ratio {
            let ratio = self.post_trade_ratio(
                pool_before - removed,
                self.stable.outstanding() - amount,
            );
            self.guard.check_burn(ratio)?;
        }

        let shrink = (pool_before - removed) / pool_before;
        if shrink > 0.0 {
            self.mint_burn_adjustment
                .set(pricing.adjustments.mint_burn / shrink, now);
        }
        self.stable.debit(holder, amount)?;
        self.pool.withdraw(removed)?;
        debug!(pool_before, buy, removed, "Burn priced");
        info!(holder = %holder, stable_in = amount, collateral_out = removed, "USM burned");
        self.emit(EngineEvent::Burned {
            at: now,
            holder: holder.clone(),
            stable_in: amount,
            collateral_out: removed,
            ratio_check_bypassed: !check_ratio,
        });
        Ok(removed)
    }

    fn fund_inner(&mut self, holder: &HolderId, amount: f64) -> Result<f64> {
        require_positive("fund amount", amount)?;
        let now = self.now();
        let funding_before = self.funding.outstanding();
        let mut remaining = amount;
        let mut legs = Vec::with_capacity(2);

        // Leg 1: the part that brings the ratio back down to the maximum, at
        // the FUM price the pool had when it sat exactly at the maximum.
        if funding_before > 0.0 && self.guard.exceeds_max(self.debt_ratio()) {
            let pricing = self.pricing();
            let pool_before = self.pool.balance();
            let to_max = self.guard.collateral_to_reach_max(
                pricing.stable_outstanding,
                pool_before,
                pricing.collateral_mid(),
            );
            let leg = remaining.min(to_max).max(0.0);
            if leg > 0.0 {
                let price = self
                    .guard
                    .funding_price_at_max_ratio(pool_before, funding_before)
                    * pricing.adjustments.buy_multiplier();
                if !(price.is_finite() && price > 0.0) {
                    return Err(PoolError::UndefinedPrice {
                        token: Token::Funding,
                        side: PriceSide::Buy,
                    });
                }
                let created = leg / price;
                self.pool.deposit(leg)?;
                self.funding.credit(holder, created)?;
                let growth = (pool_before + leg) / pool_before;
                self.fund_defund_adjustment
                    .set(pricing.adjustments.fund_defund * growth, now);
                debug!(leg, price_in_collateral = price, created, "Fund leg priced at max ratio");
                legs.push(FundLeg {
                    pricing: FundPricing::AtMaxRatio,
                    collateral_in: leg,
                    funding_out: created,
                });
                remaining -= leg;
            }
            if remaining > 0.0 {
                self.clear_floor(true);
            }
        }

        // Leg 2: the rest, at par for the first FUM or along the sliding price.
        if remaining > 0.0 {
            let pricing = self.pricing();
            let mid = pricing.collateral_mid();
            let pool_before = self.pool.balance();

            let (kind, created) = if pricing.funding_outstanding <= 0.0 {
                (FundPricing::Par, remaining * mid)
            } else {
                let buy = pricing.funding_token_price(PriceSide::Buy, PriceOptions::default())?;
                if !(buy.is_finite() && buy > 0.0) {
                    return Err(PoolError::UndefinedPrice {
                        token: Token::Funding,
                        side: PriceSide::Buy,
                    });
                }
                let growth = (pool_before + remaining) / pool_before;
                self.fund_defund_adjustment
                    .set(pricing.adjustments.fund_defund * growth, now);
                let created = pool_before * (mid / buy) * (remaining / pool_before).ln_1p();
                (FundPricing::Sliding, created)
            };
            if !(created.is_finite() && created > 0.0) {
                return Err(PoolError::InvalidInput(format!(
                    "fund of {} ETH is too small to create any FUM",
                    remaining
                )));
            }
            self.pool.deposit(remaining)?;
            self.funding.credit(holder, created)?;
            debug!(leg = remaining, ?kind, created, "Fund leg priced");
            legs.push(FundLeg {
                pricing: kind,
                collateral_in: remaining,
                funding_out: created,
            });
        }

        let created: f64 = legs.iter().map(|leg| leg.funding_out).sum();
        info!(holder = %holder, collateral_in = amount, funding_out = created, legs = legs.len(), "FUM funded");
        self.emit(EngineEvent::Funded {
            at: now,
            holder: holder.clone(),
            collateral_in: amount,
            funding_out: created,
            legs,
        });

        // The first FUM ever created has no prior crossing point: protect it
        // at the buy price the pool now quotes.
        if funding_before <= 0.0 && self.floor_needs_installing() {
            let price = self.unadjusted_funding_buy_price_in_collateral();
            self.install_floor(price, FloorTrigger::FirstFunding);
        }
        Ok(created)
    }

    fn redeem_inner(&mut self, holder: &HolderId, amount: f64) -> Result<f64> {
        require_positive("redeem amount", amount)?;
        self.funding.ensure_balance(holder, amount)?;
        let now = self.now();
        let pricing = self.pricing();
        let sell = pricing.funding_token_price(PriceSide::Sell, PriceOptions::default())?;
        let mid = pricing.collateral_mid();
        let pool_before = self.pool.balance();

        // Integral over a sliding-down FUM price; worthless FUM releases nothing.
        let removed = if sell > 0.0 {
            -pool_before * (-amount * sell / (pool_before * mid)).exp_m1()
        } else {
            0.0
        };
        if !removed.is_finite() {
            return Err(PoolError::InvalidInput(format!(
                "redeem of {} FUM has no defined value",
                amount
            )));
        }
        if removed > pool_before {
            return Err(PoolError::InsufficientPoolLiquidity {
                requested: removed,
                available: pool_before,
            });
        }
        let ratio = self.post_trade_ratio(pool_before - removed, self.stable.outstanding());
        self.guard.check_redeem(ratio)?;

        let shrink = (pool_before - removed) / pool_before;
        if removed > 0.0 && shrink > 0.0 {
            self.fund_defund_adjustment
                .set(pricing.adjustments.fund_defund * shrink, now);
        }
        self.funding.debit(holder, amount)?;
        self.pool.withdraw(removed)?;
        debug!(pool_before, sell, removed, "Redeem priced");
        info!(holder = %holder, funding_in = amount, collateral_out = removed, "FUM redeemed");
        self.emit(EngineEvent::Redeemed {
            at: now,
            holder: holder.clone(),
            funding_in: amount,
            collateral_out: removed,
        });
        Ok(removed)
    }

    fn floor_needs_installing(&self) -> bool {
        self.guard.floor_needs_installing(
            self.debt_ratio(),
            self.floor_state(),
            self.funding.outstanding(),
        )
    }

    /// Post-instruction check: clear an obsolete floor, or install one for
    /// an excursion no specific path covered.
    fn reconcile_floor(&mut self) {
        let ratio = self.debt_ratio();
        let state = self.floor_state();
        if self.guard.floor_is_obsolete(ratio, state) {
            self.clear_floor(false);
        } else if self.floor_needs_installing() {
            let price = self.unadjusted_funding_buy_price_in_collateral();
            self.install_floor(price, FloorTrigger::Reconciliation);
        }
    }

    /// FUM buy price in ETH with no adjustment and no floor, falling back to
    /// the at-max-ratio price when the buffer leaves it non-positive.
    fn unadjusted_funding_buy_price_in_collateral(&self) -> f64 {
        self.pricing()
            .funding_token_price_in_collateral(PriceSide::Buy, PriceOptions::RAW)
            .ok()
            .filter(|price| *price > 0.0)
            .unwrap_or_else(|| {
                self.guard
                    .funding_price_at_max_ratio(self.pool.balance(), self.funding.outstanding())
            })
    }

    fn install_floor(&mut self, price_in_collateral: f64, trigger: FloorTrigger) {
        if !(price_in_collateral.is_finite() && price_in_collateral > 0.0) {
            debug!(price_in_collateral, ?trigger, "Skipping floor with no positive price");
            return;
        }
        let now = self.now();
        self.min_funding_buy_price.set(price_in_collateral, now);
        let price = price_in_collateral * self.oracle.mid_price();
        let debt_ratio = self.debt_ratio();
        warn!(
            price_in_collateral,
            price,
            debt_ratio,
            max_debt_ratio = self.guard.max_debt_ratio(),
            ?trigger,
            "Minimum FUM buy price installed"
        );
        self.emit(EngineEvent::FloorInstalled {
            at: now,
            price_in_collateral,
            price,
            debt_ratio,
            trigger,
        });
    }

    fn clear_floor(&mut self, forced: bool) {
        if self.floor_state() == FloorState::Inactive {
            return;
        }
        let now = self.now();
        self.min_funding_buy_price.reset(now);
        let debt_ratio = self.debt_ratio();
        info!(debt_ratio, forced, "Minimum FUM buy price cleared");
        self.emit(EngineEvent::FloorCleared {
            at: now,
            debt_ratio,
            forced,
        });
    }
}
