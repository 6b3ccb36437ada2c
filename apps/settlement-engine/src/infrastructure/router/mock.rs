//! Mock liquidity router and price oracle for testing.
//!
//! Swaps fill at the configured oracle price, adjusted by optional quote
//! slippage and execution shortfall or surplus. The mock does not enforce
//! `min_out`, so it can play an adversarial router.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::application::ports::{
    LiquidityRouterPort, OracleError, PriceOraclePort, RouterError, SwapExecution,
};
use crate::domain::settlement::RouteQuote;
use crate::domain::shared::{Amount, AssetId, Price};

const BPS: i64 = 10_000;

/// Mock router + oracle.
#[derive(Debug)]
pub struct MockLiquidityRouter {
    quote_asset: AssetId,
    prices: RwLock<HashMap<AssetId, Decimal>>,
    quote_slippage_bps: i64,
    execution_adjust_bps: i64,
    delay: Option<Duration>,
    fail_quotes: AtomicBool,
    fail_executions: AtomicBool,
    quote_calls: AtomicUsize,
    execute_calls: AtomicUsize,
    executions: RwLock<Vec<SwapExecution>>,
}

impl Default for MockLiquidityRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLiquidityRouter {
    /// A router quoting in `USDC` with no prices set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            quote_asset: AssetId::new("USDC"),
            prices: RwLock::new(HashMap::new()),
            quote_slippage_bps: 0,
            execution_adjust_bps: 0,
            delay: None,
            fail_quotes: AtomicBool::new(false),
            fail_executions: AtomicBool::new(false),
            quote_calls: AtomicUsize::new(0),
            execute_calls: AtomicUsize::new(0),
            executions: RwLock::new(Vec::new()),
        }
    }

    /// Set the quote currency.
    #[must_use]
    pub fn with_quote_asset(mut self, asset: &str) -> Self {
        self.quote_asset = AssetId::new(asset);
        self
    }

    /// Set an asset price.
    #[must_use]
    pub fn with_price(self, asset: &str, price: Decimal) -> Self {
        self.set_price(asset, price);
        self
    }

    /// Quotes come in this many bps below the fair amount.
    #[must_use]
    pub const fn with_quote_slippage_bps(mut self, bps: i64) -> Self {
        self.quote_slippage_bps = bps;
        self
    }

    /// Executions deliver this many bps less than the fair amount.
    #[must_use]
    pub const fn with_execution_shortfall_bps(mut self, bps: i64) -> Self {
        self.execution_adjust_bps = -bps;
        self
    }

    /// Executions deliver this many bps more than the fair amount.
    #[must_use]
    pub const fn with_execution_surplus_bps(mut self, bps: i64) -> Self {
        self.execution_adjust_bps = bps;
        self
    }

    /// Every call sleeps this long first.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Change an asset price.
    pub fn set_price(&self, asset: &str, price: Decimal) {
        self.prices.write().insert(AssetId::new(asset), price);
    }

    /// Make quotes fail.
    pub fn fail_quotes(&self, fail: bool) {
        self.fail_quotes.store(fail, Ordering::SeqCst);
    }

    /// Make executions fail.
    pub fn fail_executions(&self, fail: bool) {
        self.fail_executions.store(fail, Ordering::SeqCst);
    }

    /// Number of `quote` calls received.
    #[must_use]
    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    /// Number of `execute` calls received.
    #[must_use]
    pub fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    /// Executions received, in order.
    #[must_use]
    pub fn executions(&self) -> Vec<SwapExecution> {
        self.executions.read().clone()
    }

    fn price_of(&self, asset: &AssetId) -> Option<Decimal> {
        if *asset == self.quote_asset {
            return Some(Decimal::ONE);
        }
        self.prices.read().get(asset).copied()
    }

    /// Fair output of swapping `amount` of `from` into `to`.
    fn fair_out(&self, from: &AssetId, to: &AssetId, amount: Amount) -> Result<Decimal, RouterError> {
        let no_route = || RouterError::Rejected {
            message: format!("no route {from} -> {to}"),
        };
        let from_price = self.price_of(from).ok_or_else(no_route)?;
        let to_price = self.price_of(to).ok_or_else(no_route)?;
        if to_price.is_zero() {
            return Err(no_route());
        }
        amount
            .value()
            .checked_mul(from_price)
            .and_then(|value| value.checked_div(to_price))
            .ok_or_else(|| out_of_range(amount))
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn adjust(value: Decimal, bps: i64) -> Result<Amount, RouterError> {
    let factor = Decimal::from(BPS + bps);
    let adjusted = value
        .checked_mul(factor)
        .and_then(|scaled| scaled.checked_div(Decimal::from(BPS)))
        .or_else(|| (value / Decimal::from(BPS)).checked_mul(factor))
        .ok_or_else(|| out_of_range(Amount::new(value)))?;
    Ok(Amount::new(
        adjusted.round_dp_with_strategy(18, RoundingStrategy::ToZero).max(Decimal::ZERO),
    ))
}

fn out_of_range(amount: Amount) -> RouterError {
    RouterError::Rejected {
        message: format!("amount {amount} out of range"),
    }
}

#[async_trait]
impl LiquidityRouterPort for MockLiquidityRouter {
    async fn quote(
        &self,
        from: &AssetId,
        to: &AssetId,
        amount: Amount,
    ) -> Result<RouteQuote, RouterError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_quotes.load(Ordering::SeqCst) {
            return Err(RouterError::Unavailable {
                message: "quote service down".to_string(),
            });
        }
        let fair = self.fair_out(from, to, amount)?;
        Ok(RouteQuote {
            expected_out: adjust(fair, -self.quote_slippage_bps)?,
            route: format!("mock:{from}->{to}"),
        })
    }

    async fn execute(&self, swap: SwapExecution) -> Result<Amount, RouterError> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_executions.load(Ordering::SeqCst) {
            return Err(RouterError::Unavailable {
                message: "execution reverted".to_string(),
            });
        }
        let fair = self.fair_out(&swap.from, &swap.to, swap.amount_in)?;
        self.executions.write().push(swap);
        adjust(fair, self.execution_adjust_bps)
    }
}

#[async_trait]
impl PriceOraclePort for MockLiquidityRouter {
    async fn price(&self, asset: &AssetId) -> Result<Price, OracleError> {
        let price = self.price_of(asset).ok_or_else(|| OracleError::UnknownAsset {
            asset: asset.clone(),
        })?;
        Price::positive(price).map_err(|e| OracleError::InvalidPrice {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::Timestamp;
    use rust_decimal_macros::dec;

    fn weth() -> AssetId {
        AssetId::new("WETH")
    }

    fn usdc() -> AssetId {
        AssetId::new("USDC")
    }

    #[tokio::test]
    async fn quotes_at_oracle_price_both_ways() {
        let router = MockLiquidityRouter::new().with_price("WETH", dec!(4000));
        let sell = router.quote(&weth(), &usdc(), Amount::new(dec!(0.5))).await.unwrap();
        assert_eq!(sell.expected_out, Amount::new(dec!(2000)));

        let buy = router.quote(&usdc(), &weth(), Amount::new(dec!(1000))).await.unwrap();
        assert_eq!(buy.expected_out, Amount::new(dec!(0.25)));
        assert_eq!(router.quote_calls(), 2);
    }

    #[tokio::test]
    async fn execution_shortfall_applied() {
        let router = MockLiquidityRouter::new()
            .with_price("WETH", dec!(4000))
            .with_execution_shortfall_bps(50);
        let out = router
            .execute(SwapExecution {
                from: weth(),
                to: usdc(),
                amount_in: Amount::new(dec!(0.5)),
                min_out: Amount::new(dec!(2000)),
                route: "mock".to_string(),
                deadline: Timestamp::from_unix_millis(0).unwrap(),
            })
            .await
            .unwrap();
        assert_eq!(out, Amount::new(dec!(1990)));
        assert_eq!(router.executions().len(), 1);
    }

    #[tokio::test]
    async fn unrepresentable_output_is_rejected() {
        let router = MockLiquidityRouter::new().with_price("WETH", dec!(4000));
        let err = router
            .quote(&weth(), &usdc(), Amount::new(Decimal::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::Rejected { .. }));
    }

    #[tokio::test]
    async fn unknown_asset_has_no_route_or_price() {
        let router = MockLiquidityRouter::new();
        assert!(matches!(
            router.quote(&weth(), &usdc(), Amount::new(dec!(1))).await,
            Err(RouterError::Rejected { .. })
        ));
        assert!(matches!(
            router.price(&weth()).await,
            Err(OracleError::UnknownAsset { .. })
        ));
        assert_eq!(router.price(&usdc()).await.unwrap(), Price::new(dec!(1)));
    }

    #[tokio::test]
    async fn injected_failures() {
        let router = MockLiquidityRouter::new().with_price("WETH", dec!(4000));
        router.fail_quotes(true);
        assert!(matches!(
            router.quote(&weth(), &usdc(), Amount::new(dec!(1))).await,
            Err(RouterError::Unavailable { .. })
        ));
    }
}
