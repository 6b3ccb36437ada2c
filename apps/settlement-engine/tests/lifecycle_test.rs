//! End-to-end option lifecycle tests against the mock router.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::time::Duration as StdDuration;

use chrono::Duration;
use common::{Harness, admin, amt, lp_signer, protocol, taker_signer, usdc, weth};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use settlement_engine::application::dto::TakePublishedRequest;
use settlement_engine::domain::collateral::LedgerState;
use settlement_engine::domain::option_lifecycle::ExpiryBranch;
use settlement_engine::infrastructure::router::MockLiquidityRouter;
use settlement_engine::{
    BasisPoints, CommitmentType, ErrorCode, ExerciseRequest, Identity, LiquidationParams,
    OptionId, OptionState, OptionType, Price, SignedCommitment, TakeRequest,
};

fn take_request(signed: SignedCommitment) -> TakeRequest {
    TakeRequest {
        signed,
        duration_days: 7,
        settlement: None,
        max_price_movement_bps: None,
    }
}

async fn take_call(harness: &Harness) -> OptionId {
    let request = take_request(harness.call_offer());
    harness
        .engine
        .take(&harness.taker_id(), request)
        .await
        .unwrap()
        .option_id
}

#[tokio::test]
async fn take_call_locks_collateral_and_pays_premium() {
    let h = Harness::new(dec!(3500));
    h.fund();

    let receipt = h
        .engine
        .take(&h.taker_id(), take_request(h.call_offer()))
        .await
        .unwrap();

    assert_eq!(receipt.lp, h.lp_id());
    assert_eq!(receipt.taker, h.taker_id());
    assert_eq!(receipt.strike_price, Price::new(dec!(3500)));
    assert_eq!(receipt.premium, amt(dec!(70)));
    assert_eq!(receipt.exercise_deadline, h.now().plus_days(7));

    assert_eq!(h.balance(&h.lp_id(), &weth()), amt(dec!(0.5)));
    assert_eq!(h.balance(&h.lp_id(), &usdc()), amt(dec!(70)));
    assert_eq!(h.balance(&h.taker_id(), &usdc()), amt(dec!(930)));
    assert_eq!(h.engine.total_locked(&weth()), amt(dec!(0.5)));
    assert_eq!(h.engine.check_collateralization(&weth()).await.unwrap(), amt(dec!(0.5)));
    assert_eq!(h.engine.nonce_of(&h.lp_id()).await, 1);

    let option = h.engine.get_option(receipt.option_id).await.unwrap();
    assert_eq!(option.state, OptionState::Taken);
    assert_eq!(option.total_premium_paid, amt(dec!(70)));
    assert_eq!(h.router.quote_calls(), 0);
}

#[tokio::test]
async fn demand_creator_becomes_taker() {
    let h = Harness::new(dec!(3000));
    h.fund();
    let commitment = h.commitment(&h.taker, OptionType::Call, CommitmentType::Demand, 0);
    let signed = h.sign(&h.taker, commitment);

    let receipt = h.engine.take(&h.lp_id(), take_request(signed)).await.unwrap();

    assert_eq!(receipt.taker, h.taker_id());
    assert_eq!(receipt.lp, h.lp_id());
    // DEMAND premium is the flat rate, whatever the duration.
    assert_eq!(receipt.premium, amt(dec!(10)));
    assert_eq!(h.balance(&h.taker_id(), &usdc()), amt(dec!(990)));
    assert_eq!(h.engine.nonce_of(&h.taker_id()).await, 1);
}

#[tokio::test]
async fn replayed_commitment_rejected() {
    let h = Harness::new(dec!(3000));
    h.fund();
    let signed = h.call_offer();
    h.engine
        .take(&h.taker_id(), take_request(signed.clone()))
        .await
        .unwrap();

    let err = h
        .engine
        .take(&h.taker_id(), take_request(signed))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NonceMismatch);
    assert_eq!(h.engine.total_locked(&weth()), amt(dec!(0.5)));
}

#[tokio::test]
async fn expired_commitment_rejected() {
    let h = Harness::new(dec!(3000));
    h.fund();
    let signed = h.call_offer();
    h.clock.advance(Duration::days(2));

    let err = h.engine.take(&h.taker_id(), take_request(signed)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::CommitmentExpired);
}

#[tokio::test]
async fn signature_bound_to_deployment() {
    let h = Harness::new(dec!(3000));
    h.fund();
    let commitment = h.commitment(&h.lp, OptionType::Call, CommitmentType::Offer, 0);
    let foreign = settlement_engine::domain::commitment::CanonicalEncoder::new("other-deployment");
    let signed = h.lp.sign(&foreign, commitment);

    let err = h.engine.take(&h.taker_id(), take_request(signed)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidSignature);
    assert_eq!(h.engine.nonce_of(&h.lp_id()).await, 0);
}

#[tokio::test]
async fn tampered_commitment_rejected() {
    let h = Harness::new(dec!(3000));
    h.fund();
    let mut signed = h.call_offer();
    signed.commitment.amount = amt(dec!(0.9));

    let err = h.engine.take(&h.taker_id(), take_request(signed)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidSignature);
}

#[tokio::test]
async fn duration_outside_range_rejected() {
    let h = Harness::new(dec!(3000));
    h.fund();
    let mut request = take_request(h.call_offer());
    request.duration_days = 8;

    let err = h.engine.take(&h.taker_id(), request).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidDuration);
    assert_eq!(h.engine.nonce_of(&h.lp_id()).await, 0);
}

#[tokio::test]
async fn amount_outside_asset_bounds_rejected() {
    let h = Harness::new(dec!(3000));
    h.fund();
    let mut commitment = h.commitment(&h.lp, OptionType::Call, CommitmentType::Offer, 0);
    commitment.amount = amt(dec!(1.5));
    let signed = h.sign(&h.lp, commitment);

    let err = h.engine.take(&h.taker_id(), take_request(signed)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidCommitment);
}

#[tokio::test]
async fn creator_cannot_take_own_commitment() {
    let h = Harness::new(dec!(3000));
    h.fund();

    let err = h
        .engine
        .take(&h.lp_id(), take_request(h.call_offer()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[tokio::test]
async fn failed_take_leaves_no_trace() {
    let h = Harness::new(dec!(3000));
    // Taker can pay, LP has no WETH.
    h.engine.deposit(&h.taker_id(), &usdc(), amt(dec!(1000))).unwrap();

    let err = h
        .engine
        .take(&h.taker_id(), take_request(h.call_offer()))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InsufficientCollateral);
    assert_eq!(h.engine.nonce_of(&h.lp_id()).await, 0);
    assert_eq!(h.balance(&h.taker_id(), &usdc()), amt(dec!(1000)));
    assert_eq!(h.engine.total_locked(&weth()), amt(dec!(0)));
    assert!(h.engine.list_options(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn taker_without_premium_rejected() {
    let h = Harness::new(dec!(3000));
    h.engine.deposit(&h.lp_id(), &weth(), amt(dec!(1))).unwrap();

    let err = h
        .engine
        .take(&h.taker_id(), take_request(h.call_offer()))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InsufficientFunds);
    assert_eq!(h.balance(&h.lp_id(), &weth()), amt(dec!(1)));
    assert_eq!(h.engine.nonce_of(&h.lp_id()).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_takes_of_one_commitment_yield_one_option() {
    let h = Harness::new(dec!(3000));
    h.fund();
    let other = Identity::new("carol");
    h.engine.deposit(&other, &usdc(), amt(dec!(1000))).unwrap();
    let signed = h.call_offer();

    let first = {
        let engine = h.engine.clone();
        let request = take_request(signed.clone());
        let taker = h.taker_id();
        tokio::spawn(async move { engine.take(&taker, request).await })
    };
    let second = {
        let engine = h.engine.clone();
        let request = take_request(signed);
        tokio::spawn(async move { engine.take(&other, request).await })
    };
    let results = [first.await.unwrap(), second.await.unwrap()];

    let taken = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(taken, 1);
    let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(failure.code(), ErrorCode::NonceMismatch);
    assert_eq!(h.engine.total_locked(&weth()), amt(dec!(0.5)));
    assert_eq!(h.engine.check_collateralization(&weth()).await.unwrap(), amt(dec!(0.5)));
}

#[tokio::test]
async fn out_of_the_money_call_cannot_be_exercised() {
    let h = Harness::new(dec!(3500));
    h.fund();
    let option_id = take_call(&h).await;
    h.router.set_price("WETH", dec!(3000));

    let err = h
        .engine
        .exercise(
            &h.taker_id(),
            option_id,
            ExerciseRequest {
                settlement: h.params(dec!(1500)),
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::NotExercisable);
    assert_eq!(h.router.quote_calls(), 0);
    assert_eq!(h.router.execute_calls(), 0);
    assert_eq!(h.engine.get_option(option_id).await.unwrap().state, OptionState::Taken);
}

#[tokio::test]
async fn in_the_money_call_exercise_pays_out() {
    let h = Harness::new(dec!(3500));
    h.fund();
    let option_id = take_call(&h).await;
    h.router.set_price("WETH", dec!(4000));

    let receipt = h
        .engine
        .exercise(
            &h.taker_id(),
            option_id,
            ExerciseRequest {
                settlement: h.params(dec!(2000)),
                max_price_movement_bps: Some(BasisPoints::new(50)),
            },
        )
        .await
        .unwrap();

    assert_eq!(receipt.state, OptionState::Exercised);
    assert_eq!(receipt.settlement_price, Price::new(dec!(4000)));
    // taker (4000 - 3500) × 0.5; LP 3500 × 0.5 less the 1bp margin on 2000.
    assert_eq!(h.balance(&h.taker_id(), &usdc()), amt(dec!(1180)));
    assert_eq!(h.balance(&h.lp_id(), &usdc()), amt(dec!(1819.8)));
    assert_eq!(h.engine.protocol_revenue(&usdc()), amt(dec!(0.2)));
    assert_eq!(h.balance(&h.lp_id(), &weth()), amt(dec!(0.5)));
    assert_eq!(h.engine.total_locked(&weth()), amt(dec!(0)));
    assert_eq!(h.engine.check_collateralization(&weth()).await.unwrap(), amt(dec!(0)));
    assert!(h.engine.escrow(option_id).is_none());

    let executions = h.router.executions();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].min_out, amt(dec!(2000)));
}

#[tokio::test]
async fn router_surplus_goes_to_protocol() {
    let h = Harness::with_router(
        MockLiquidityRouter::new()
            .with_price("WETH", dec!(3500))
            .with_execution_surplus_bps(10),
    );
    h.fund();
    let option_id = take_call(&h).await;
    h.router.set_price("WETH", dec!(4000));

    h.engine
        .exercise(
            &h.taker_id(),
            option_id,
            ExerciseRequest {
                settlement: h.params(dec!(2000)),
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap();

    // 2002 received, 2000 required: margin 0.2 plus surplus 2.
    assert_eq!(h.engine.protocol_revenue(&usdc()), amt(dec!(2.2)));
    assert_eq!(h.balance(&h.taker_id(), &usdc()), amt(dec!(1180)));
}

#[tokio::test]
async fn min_return_below_fair_value_rejected_before_routing() {
    let h = Harness::new(dec!(3500));
    h.fund();
    let option_id = take_call(&h).await;
    h.router.set_price("WETH", dec!(4000));

    let err = h
        .engine
        .exercise(
            &h.taker_id(),
            option_id,
            ExerciseRequest {
                settlement: h.params(dec!(1999)),
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InsufficientReturn);
    assert_eq!(h.router.quote_calls(), 0);
}

#[tokio::test]
async fn execution_shortfall_leaves_option_taken() {
    let h = Harness::with_router(
        MockLiquidityRouter::new()
            .with_price("WETH", dec!(3500))
            .with_execution_shortfall_bps(50),
    );
    h.fund();
    let option_id = take_call(&h).await;
    h.router.set_price("WETH", dec!(4000));

    let err = h
        .engine
        .exercise(
            &h.taker_id(),
            option_id,
            ExerciseRequest {
                settlement: h.params(dec!(2000)),
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InsufficientReturn);
    assert_eq!(h.engine.get_option(option_id).await.unwrap().state, OptionState::Taken);
    assert_eq!(h.engine.total_locked(&weth()), amt(dec!(0.5)));
    assert_eq!(h.engine.escrow(option_id).unwrap().holding.quantity, amt(dec!(0.5)));
    assert_eq!(h.balance(&h.taker_id(), &usdc()), amt(dec!(930)));
    assert_eq!(h.engine.check_collateralization(&weth()).await.unwrap(), amt(dec!(0.5)));
}

#[tokio::test]
async fn quote_far_from_oracle_rejected() {
    let h = Harness::with_router(
        MockLiquidityRouter::new()
            .with_price("WETH", dec!(3500))
            .with_quote_slippage_bps(-200),
    );
    h.fund();
    let option_id = take_call(&h).await;
    h.router.set_price("WETH", dec!(4000));

    let err = h
        .engine
        .exercise(
            &h.taker_id(),
            option_id,
            ExerciseRequest {
                settlement: h.params(dec!(2000)),
                max_price_movement_bps: Some(BasisPoints::new(100)),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ExcessivePriceMovement);
    assert_eq!(h.router.execute_calls(), 0);
}

#[tokio::test]
async fn router_outage_leaves_option_taken() {
    let h = Harness::new(dec!(3500));
    h.fund();
    let option_id = take_call(&h).await;
    h.router.set_price("WETH", dec!(4000));
    h.router.fail_executions(true);

    let err = h
        .engine
        .exercise(
            &h.taker_id(),
            option_id,
            ExerciseRequest {
                settlement: h.params(dec!(2000)),
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ExternalRouterFailure);
    assert_eq!(h.engine.get_option(option_id).await.unwrap().state, OptionState::Taken);

    h.router.fail_executions(false);
    let receipt = h
        .engine
        .exercise(
            &h.taker_id(),
            option_id,
            ExerciseRequest {
                settlement: h.params(dec!(2000)),
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(receipt.state, OptionState::Exercised);
}

#[tokio::test(start_paused = true)]
async fn settlement_deadline_bounds_router_calls() {
    let h = Harness::with_router(
        MockLiquidityRouter::new()
            .with_price("WETH", dec!(3500))
            .with_delay(StdDuration::from_secs(120)),
    );
    h.fund();
    let option_id = take_call(&h).await;
    h.router.set_price("WETH", dec!(4000));

    let err = h
        .engine
        .exercise(
            &h.taker_id(),
            option_id,
            ExerciseRequest {
                settlement: h.params(dec!(2000)),
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ExternalRouterFailure);
    assert_eq!(h.router.execute_calls(), 0);
    assert_eq!(h.engine.get_option(option_id).await.unwrap().state, OptionState::Taken);
}

#[tokio::test]
async fn concurrent_exercises_settle_once() {
    let h = Harness::with_router(
        MockLiquidityRouter::new()
            .with_price("WETH", dec!(3500))
            .with_delay(StdDuration::from_millis(50)),
    );
    h.fund();
    let option_id = take_call(&h).await;
    h.router.set_price("WETH", dec!(4000));
    let request = ExerciseRequest {
        settlement: h.params(dec!(2000)),
        max_price_movement_bps: None,
    };
    let taker = h.taker_id();

    let (first, second) = tokio::join!(
        h.engine.exercise(&taker, option_id, request),
        h.engine.exercise(&taker, option_id, request),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(failure.code(), ErrorCode::SettlementInFlight);
    assert_eq!(h.router.execute_calls(), 1);
    assert_eq!(h.balance(&h.taker_id(), &usdc()), amt(dec!(1180)));

    let err = h.engine.exercise(&taker, option_id, request).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotExercisable);
}

#[tokio::test]
async fn only_taker_may_exercise() {
    let h = Harness::new(dec!(3500));
    h.fund();
    let option_id = take_call(&h).await;
    h.router.set_price("WETH", dec!(4000));

    let err = h
        .engine
        .exercise(
            &h.lp_id(),
            option_id,
            ExerciseRequest {
                settlement: h.params(dec!(2000)),
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[tokio::test]
async fn exercise_after_deadline_rejected() {
    let h = Harness::new(dec!(3500));
    h.fund();
    let option_id = take_call(&h).await;
    h.router.set_price("WETH", dec!(4000));
    h.clock.advance(Duration::days(7) + Duration::milliseconds(1));

    let err = h
        .engine
        .exercise(
            &h.taker_id(),
            option_id,
            ExerciseRequest {
                settlement: h.params(dec!(2000)),
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotExercisable);
}

#[tokio::test]
async fn exercise_at_the_deadline_allowed() {
    let h = Harness::new(dec!(3500));
    h.fund();
    let option_id = take_call(&h).await;
    h.router.set_price("WETH", dec!(4000));
    h.clock.advance(Duration::days(7));

    let receipt = h
        .engine
        .exercise(
            &h.taker_id(),
            option_id,
            ExerciseRequest {
                settlement: h.params(dec!(2000)),
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(receipt.state, OptionState::Exercised);
}

#[tokio::test]
async fn put_take_converts_and_exercise_buys_back() {
    let h = Harness::new(dec!(3000));
    h.fund();

    // 0.5 × 3000 less the 1bp margin.
    let mut request = take_request(h.put_offer());
    request.settlement = Some(h.params(dec!(1499.85)));
    let receipt = h.engine.take(&h.taker_id(), request).await.unwrap();

    assert_eq!(receipt.escrow.asset, usdc());
    assert_eq!(receipt.escrow.quantity, amt(dec!(1500)));
    assert_eq!(h.balance(&h.lp_id(), &weth()), amt(dec!(0.5)));
    assert_eq!(h.engine.total_locked(&weth()), amt(dec!(0.5)));
    assert_eq!(h.engine.check_collateralization(&weth()).await.unwrap(), amt(dec!(0.5)));

    h.router.set_price("WETH", dec!(2000));
    // Taker 500, margin 0.1, 999.9 buys 0.49995 WETH back for the LP.
    let settlement = h
        .engine
        .exercise(
            &h.taker_id(),
            receipt.option_id,
            ExerciseRequest {
                settlement: h.params(dec!(0.49995)),
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(settlement.state, OptionState::Exercised);
    assert_eq!(h.balance(&h.taker_id(), &usdc()), amt(dec!(1430)));
    assert_eq!(h.balance(&h.lp_id(), &weth()), amt(dec!(0.99995)));
    assert_eq!(h.balance(&h.lp_id(), &usdc()), amt(dec!(70)));
    assert_eq!(h.engine.protocol_revenue(&usdc()), amt(dec!(0.1)));
    assert_eq!(h.engine.total_locked(&weth()), amt(dec!(0)));
}

#[tokio::test]
async fn put_take_without_settlement_bounds_rolls_back() {
    let h = Harness::new(dec!(3000));
    h.fund();

    let err = h
        .engine
        .take(&h.taker_id(), take_request(h.put_offer()))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InsufficientReturn);
    assert_eq!(h.balance(&h.lp_id(), &weth()), amt(dec!(1)));
    assert_eq!(h.balance(&h.taker_id(), &usdc()), amt(dec!(1000)));
    assert_eq!(h.engine.nonce_of(&h.lp_id()).await, 0);
    assert_eq!(h.router.quote_calls(), 0);
}

#[tokio::test]
async fn put_conversion_shortfall_rolls_back() {
    let h = Harness::with_router(
        MockLiquidityRouter::new()
            .with_price("WETH", dec!(3000))
            .with_execution_shortfall_bps(5),
    );
    h.fund();
    let mut request = take_request(h.put_offer());
    request.settlement = Some(h.params(dec!(1499.85)));

    let err = h.engine.take(&h.taker_id(), request).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::InsufficientReturn);
    assert_eq!(h.balance(&h.lp_id(), &weth()), amt(dec!(1)));
    assert_eq!(h.balance(&h.taker_id(), &usdc()), amt(dec!(1000)));
    assert_eq!(h.engine.total_locked(&weth()), amt(dec!(0)));
    assert_eq!(h.engine.nonce_of(&h.lp_id()).await, 0);
}

#[tokio::test]
async fn out_of_the_money_expiry_returns_collateral() {
    let h = Harness::new(dec!(3500));
    h.fund();
    let option_id = take_call(&h).await;
    h.router.set_price("WETH", dec!(3000));
    let liquidator = Identity::new("anyone");

    let early = h
        .engine
        .liquidate_expired(&liquidator, option_id, LiquidationParams::default())
        .await
        .unwrap_err();
    assert_eq!(early.code(), ErrorCode::NotExercisable);

    h.clock.advance(Duration::days(8));
    let receipt = h
        .engine
        .liquidate_expired(&liquidator, option_id, LiquidationParams::default())
        .await
        .unwrap();

    assert_eq!(receipt.state, OptionState::Expired);
    assert_eq!(receipt.branch, Some(ExpiryBranch::ReturnedToLp));
    assert_eq!(h.balance(&h.lp_id(), &weth()), amt(dec!(1)));
    assert_eq!(h.engine.total_locked(&weth()), amt(dec!(0)));
    assert_eq!(h.router.quote_calls(), 0);
}

#[tokio::test]
async fn forced_settlement_pays_liquidator_from_margin() {
    let h = Harness::new(dec!(3500));
    h.fund();
    let option_id = take_call(&h).await;
    h.router.set_price("WETH", dec!(4000));
    h.clock.advance(Duration::days(8));
    let liquidator = Identity::new("liquidator");

    let plan = h.engine.plan_liquidation(&liquidator, option_id).await.unwrap();
    assert_eq!(plan.required_return(), amt(dec!(2000)));

    let receipt = h
        .engine
        .liquidate_expired(
            &liquidator,
            option_id,
            LiquidationParams {
                settlement: Some(h.params(dec!(2000))),
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(receipt.branch, Some(ExpiryBranch::ForcedSettlement));
    // Margin 0.2 split 25% / 75%.
    assert_eq!(h.balance(&liquidator, &usdc()), amt(dec!(0.05)));
    assert_eq!(h.engine.protocol_revenue(&usdc()), amt(dec!(0.15)));
    assert_eq!(h.balance(&h.taker_id(), &usdc()), amt(dec!(1180)));
    assert_eq!(h.balance(&h.lp_id(), &usdc()), amt(dec!(1819.8)));
}

async fn take_put(harness: &Harness) -> OptionId {
    let mut request = take_request(harness.put_offer());
    request.settlement = Some(harness.params(dec!(1499.85)));
    harness
        .engine
        .take(&harness.taker_id(), request)
        .await
        .unwrap()
        .option_id
}

#[tokio::test]
async fn out_of_the_money_put_expiry_returns_quote_escrow() {
    let h = Harness::new(dec!(3000));
    h.fund();
    let option_id = take_put(&h).await;
    let quotes = h.router.quote_calls();
    let executions = h.router.execute_calls();

    h.router.set_price("WETH", dec!(3500));
    h.clock.advance(Duration::days(8));
    let receipt = h
        .engine
        .liquidate_expired(&Identity::new("anyone"), option_id, LiquidationParams::default())
        .await
        .unwrap();

    assert_eq!(receipt.state, OptionState::Expired);
    assert_eq!(receipt.branch, Some(ExpiryBranch::ReturnedToLp));
    // The LP keeps the premium and receives the USDC escrow, not WETH.
    assert_eq!(h.balance(&h.lp_id(), &usdc()), amt(dec!(1570)));
    assert_eq!(h.balance(&h.lp_id(), &weth()), amt(dec!(0.5)));
    assert_eq!(h.balance(&h.taker_id(), &usdc()), amt(dec!(930)));
    assert_eq!(h.router.quote_calls(), quotes);
    assert_eq!(h.router.execute_calls(), executions);
    assert_eq!(h.engine.total_locked(&weth()), amt(dec!(0)));
    assert!(h.engine.escrow(option_id).is_none());
}

#[tokio::test]
async fn forced_put_settlement_buys_back_for_lp() {
    let h = Harness::new(dec!(3000));
    h.fund();
    let option_id = take_put(&h).await;
    h.router.set_price("WETH", dec!(2000));
    h.clock.advance(Duration::days(8));
    let liquidator = Identity::new("liquidator");

    // Taker 500, margin 0.1, 999.9 USDC buys 0.49995 WETH.
    let plan = h.engine.plan_liquidation(&liquidator, option_id).await.unwrap();
    assert_eq!(plan.required_return(), amt(dec!(0.49995)));

    let receipt = h
        .engine
        .liquidate_expired(
            &liquidator,
            option_id,
            LiquidationParams {
                settlement: Some(h.params(dec!(0.49995))),
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(receipt.branch, Some(ExpiryBranch::ForcedSettlement));
    assert_eq!(h.balance(&h.taker_id(), &usdc()), amt(dec!(1430)));
    assert_eq!(h.balance(&h.lp_id(), &weth()), amt(dec!(0.99995)));
    assert_eq!(h.balance(&h.lp_id(), &usdc()), amt(dec!(70)));
    // Margin 0.1 split 25% / 75%.
    assert_eq!(h.balance(&liquidator, &usdc()), amt(dec!(0.025)));
    assert_eq!(h.engine.protocol_revenue(&usdc()), amt(dec!(0.075)));
    assert_eq!(h.engine.total_locked(&weth()), amt(dec!(0)));

    let buy_back = h.router.executions().pop().unwrap();
    assert_eq!(buy_back.from, usdc());
    assert_eq!(buy_back.to, weth());
    assert_eq!(buy_back.amount_in, amt(dec!(999.9)));
}

#[tokio::test]
async fn oversized_premium_rate_rejected_without_trace() {
    let h = Harness::new(dec!(3000));
    h.fund();
    let mut commitment = h.commitment(&h.lp, OptionType::Call, CommitmentType::Offer, 0);
    commitment.premium_rate = amt(Decimal::MAX / dec!(2));
    let signed = h.sign(&h.lp, commitment);

    let err = h
        .engine
        .take(&h.taker_id(), take_request(signed))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InvalidCommitment);
    assert_eq!(h.engine.nonce_of(&h.lp_id()).await, 0);
    assert_eq!(h.balance(&h.lp_id(), &weth()), amt(dec!(1)));
    assert_eq!(h.balance(&h.taker_id(), &usdc()), amt(dec!(1000)));
    assert_eq!(h.engine.total_locked(&weth()), amt(dec!(0)));
}

#[tokio::test]
async fn quote_for_oversized_premium_rate_rejected() {
    let h = Harness::new(dec!(2000));
    let mut commitment = h.commitment(&h.lp, OptionType::Call, CommitmentType::Offer, 0);
    commitment.premium_rate = amt(Decimal::MAX / dec!(1000));

    let err = h.engine.quote_premium(&commitment, 7).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::InvalidCommitment);
}

#[tokio::test]
async fn deposit_past_decimal_range_rejected() {
    let h = Harness::new(dec!(3000));
    h.engine.deposit(&h.lp_id(), &usdc(), amt(Decimal::MAX)).unwrap();

    let err = h
        .engine
        .deposit(&h.lp_id(), &usdc(), amt(Decimal::MAX))
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::AmountOutOfRange);
    assert_eq!(h.balance(&h.lp_id(), &usdc()), amt(Decimal::MAX));
}

#[tokio::test]
async fn take_against_seeded_books() {
    let mut books = LedgerState::default();
    books
        .deposit(&lp_signer().identity(), &weth(), amt(dec!(0.5)))
        .unwrap();
    books
        .deposit(&taker_signer().identity(), &usdc(), amt(dec!(70)))
        .unwrap();
    let h = Harness::with_books(dec!(3000), books);

    let option_id = take_call(&h).await;

    assert_eq!(h.balance(&h.lp_id(), &weth()), amt(dec!(0)));
    assert_eq!(h.balance(&h.lp_id(), &usdc()), amt(dec!(70)));
    assert_eq!(h.balance(&h.taker_id(), &usdc()), amt(dec!(0)));
    assert_eq!(h.engine.total_locked(&weth()), amt(dec!(0.5)));
    assert!(h.engine.escrow(option_id).is_some());
}

#[tokio::test]
async fn pause_blocks_takes_but_not_exercise() {
    let h = Harness::new(dec!(3500));
    h.fund();
    let option_id = take_call(&h).await;

    let err = h.engine.pause(&h.taker_id()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);

    h.engine.pause(&admin()).unwrap();
    let commitment = h.commitment(&h.lp, OptionType::Call, CommitmentType::Offer, 1);
    let signed = h.sign(&h.lp, commitment);
    let err = h
        .engine
        .take(&h.taker_id(), take_request(signed.clone()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Paused);

    h.router.set_price("WETH", dec!(4000));
    let receipt = h
        .engine
        .exercise(
            &h.taker_id(),
            option_id,
            ExerciseRequest {
                settlement: h.params(dec!(2000)),
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(receipt.state, OptionState::Exercised);

    h.engine.unpause(&admin()).unwrap();
    h.engine.take(&h.taker_id(), take_request(signed)).await.unwrap();
}

#[tokio::test]
async fn admin_changes_safety_margin() {
    let h = Harness::new(dec!(3500));
    h.fund();

    let err = h.engine.set_safety_margin(&admin(), BasisPoints::new(1_001)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidConfiguration);

    h.engine.set_safety_margin(&admin(), BasisPoints::new(100)).unwrap();
    assert_eq!(h.engine.parameters().safety_margin, BasisPoints::new(100));

    let option_id = take_call(&h).await;
    h.router.set_price("WETH", dec!(4000));
    h.engine
        .exercise(
            &h.taker_id(),
            option_id,
            ExerciseRequest {
                settlement: h.params(dec!(2000)),
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap();

    // 1% of 2000.
    assert_eq!(h.engine.protocol_revenue(&usdc()), amt(dec!(20)));
    assert_eq!(h.balance(&h.lp_id(), &usdc()), amt(dec!(1800)));
}

#[tokio::test]
async fn published_commitment_taken_from_book() {
    let h = Harness::new(dec!(3000));
    h.fund();

    let hash = h.engine.publish_commitment(h.call_offer()).await.unwrap();
    assert_eq!(h.engine.list_commitments().await.unwrap().len(), 1);
    assert_eq!(h.engine.nonce_of(&h.lp_id()).await, 0);

    let receipt = h
        .engine
        .take_published(
            &h.taker_id(),
            &hash,
            TakePublishedRequest {
                duration_days: 3,
                settlement: None,
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(receipt.commitment_hash, hash);
    assert_eq!(receipt.premium, amt(dec!(30)));
    assert!(h.engine.list_commitments().await.unwrap().is_empty());
    let err = h.engine.get_commitment(&hash).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::CommitmentNotFound);
}

#[tokio::test]
async fn quote_premium_reports_yield() {
    let h = Harness::new(dec!(2000));
    let commitment = h.commitment(&h.lp, OptionType::Call, CommitmentType::Offer, 0);

    let quote = h.engine.quote_premium(&commitment, 5).await.unwrap();

    assert_eq!(quote.premium, amt(dec!(50)));
    assert_eq!(quote.price, Price::new(dec!(2000)));
    // 10 USDC a day on 1000 USDC of collateral.
    assert_eq!(quote.daily_yield_bps, Some(dec!(100)));
    assert_eq!(quote.annualized_yield_bps, Some(dec!(36500)));
}

#[tokio::test]
async fn list_options_filters_by_state() {
    let h = Harness::new(dec!(3500));
    h.fund();
    let first = take_call(&h).await;
    let commitment = h.commitment(&h.lp, OptionType::Call, CommitmentType::Offer, 1);
    let signed = h.sign(&h.lp, commitment);
    h.engine.take(&h.taker_id(), take_request(signed)).await.unwrap();

    h.router.set_price("WETH", dec!(4000));
    h.engine
        .exercise(
            &h.taker_id(),
            first,
            ExerciseRequest {
                settlement: h.params(dec!(2000)),
                max_price_movement_bps: None,
            },
        )
        .await
        .unwrap();

    let all = h.engine.list_options(None).await.unwrap();
    assert_eq!(all.len(), 2);
    let taken = h.engine.list_options(Some(OptionState::Taken)).await.unwrap();
    assert_eq!(taken.len(), 1);
    assert_ne!(taken[0].id, first);
    assert_eq!(h.engine.check_collateralization(&weth()).await.unwrap(), amt(dec!(0.5)));
    assert_eq!(protocol(), *h.engine.protocol_account());
}
