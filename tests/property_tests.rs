//! Property tests over the settlement arithmetic and ledger invariants.

use paper_futures::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn btc() -> Symbol {
    Symbol::new("BTCUSDT")
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

proptest! {
    /// Weighted entry lands between the two fill prices and matches the
    /// closed formula (q1*p1 + q2*p2) / (q1 + q2).
    #[test]
    fn weighted_entry_matches_formula(
        q1_raw in 1i64..1_000_000,
        q2_raw in 1i64..1_000_000,
        p1_raw in 1i64..10_000_000,
        p2_raw in 1i64..10_000_000,
    ) {
        let (q1, q2) = (Decimal::new(q1_raw, 4), Decimal::new(q2_raw, 4));
        let (p1, p2) = (Decimal::new(p1_raw, 2), Decimal::new(p2_raw, 2));

        let entry = weighted_entry(q1, p1, q2, p2);

        prop_assert_eq!(entry, (q1 * p1 + q2 * p2) / (q1 + q2));
        prop_assert!(entry >= p1.min(p2));
        prop_assert!(entry <= p1.max(p2));
    }

    /// The liquidation price always sits on the losing side of entry.
    #[test]
    fn liquidation_price_sits_below_long_entry_above_short(
        entry_raw in 1_000i64..100_000_000,
        leverage_raw in 2u32..=125,
    ) {
        let entry = Decimal::new(entry_raw, 2);
        let leverage = Leverage::new(leverage_raw).unwrap();
        let mmr = dec!(0.004);

        let long_liq = liquidation_price(entry, leverage, PositionSide::Long, mmr);
        let short_liq = liquidation_price(entry, leverage, PositionSide::Short, mmr);

        prop_assert!(long_liq < entry);
        prop_assert!(short_liq > entry);
    }

    /// The bankruptcy clamp never lets a loss exceed the pledged margin and
    /// never touches profits.
    #[test]
    fn clamp_bounds_losses(
        pnl_raw in -10_000_000i64..10_000_000,
        margin_raw in 0i64..1_000_000,
    ) {
        let pnl = Decimal::new(pnl_raw, 2);
        let margin = Decimal::new(margin_raw, 2);

        let clamped = clamp_isolated_loss(pnl, margin);

        prop_assert!(clamped >= -margin);
        if pnl >= -margin {
            prop_assert_eq!(clamped, pnl);
        }
    }

    /// Sweeping any book conserves quantity and cost: the fill never
    /// exceeds the request or the displayed depth, and total cost is the
    /// exact sum over consumed levels.
    #[test]
    fn market_sweep_conserves_quantity_and_cost(
        levels in proptest::collection::vec((1i64..10_000_000, 1i64..100_000), 0..20),
        quantity_raw in 1i64..1_000_000,
    ) {
        let quantity = Decimal::new(quantity_raw, 4);

        let rt = runtime();
        rt.block_on(async {
            let ledger = Ledger::new();
            let engine = Engine::new(ledger.clone(), EngineConfig::default());

            let mut depth_total = Decimal::ZERO;
            {
                let mut tx = ledger.begin().await;
                for &(price_raw, qty_raw) in &levels {
                    let price = Decimal::new(price_raw, 2);
                    let qty = Decimal::new(qty_raw, 4);
                    tx.apply_depth(&btc(), BookSide::Ask, price, qty);
                }
                if let Some(book) = tx.book(&btc()) {
                    depth_total = book
                        .levels(BookSide::Ask, usize::MAX)
                        .iter()
                        .map(|(_, q)| *q)
                        .sum();
                }
                tx.commit();
            }

            let result = engine.execute_market(&btc(), OrderSide::Buy, quantity).await;

            prop_assert!(result.filled_qty <= quantity);
            prop_assert!(result.filled_qty <= depth_total);
            if result.filled_qty > Decimal::ZERO {
                // avg * filled may round in the last digit; cost is exact.
                let diff = (result.avg_price * result.filled_qty - result.total_cost).abs();
                prop_assert!(diff < dec!(0.0001));
            } else {
                prop_assert_eq!(result.total_cost, Decimal::ZERO);
            }
            Ok(())
        })?;
    }

    /// Any interleaving of orders, cancels and trade prints leaves every
    /// account balanced and at most one OPEN position per (account, symbol,
    /// side).
    #[test]
    fn ledger_invariants_hold_under_random_flows(
        actions in proptest::collection::vec(0u8..4, 1..25),
        sizes in proptest::collection::vec(1i64..500, 25),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let ledger = Ledger::new();
            let engine = Engine::new(ledger.clone(), EngineConfig::default());

            {
                let mut tx = ledger.begin().await;
                tx.apply_depth(&btc(), BookSide::Bid, dec!(49900), dec!(1000));
                tx.apply_depth(&btc(), BookSide::Ask, dec!(50100), dec!(1000));
                tx.commit();
            }

            let mut last_limit = None;
            for (i, &action) in actions.iter().enumerate() {
                let quantity = Decimal::new(sizes[i % sizes.len()], 3);
                let owner = format!("trader-{}", i % 3);
                match action {
                    0 => {
                        let _ = engine
                            .place_order(OrderRequest {
                                symbol: btc(),
                                side: OrderSide::Buy,
                                order_type: OrderType::Market,
                                quantity,
                                price: None,
                                leverage: 10,
                                owner,
                                account: None,
                            })
                            .await;
                    }
                    1 => {
                        let _ = engine
                            .place_order(OrderRequest {
                                symbol: btc(),
                                side: OrderSide::Sell,
                                order_type: OrderType::Market,
                                quantity,
                                price: None,
                                leverage: 10,
                                owner,
                                account: None,
                            })
                            .await;
                    }
                    2 => {
                        if let Ok(ack) = engine
                            .place_order(OrderRequest {
                                symbol: btc(),
                                side: OrderSide::Buy,
                                order_type: OrderType::Limit,
                                quantity,
                                price: Some(dec!(50000)),
                                leverage: 5,
                                owner: owner.clone(),
                                account: None,
                            })
                            .await
                        {
                            let tx = ledger.begin().await;
                            let id = tx.account_by_owner(&owner).map(|a| a.id);
                            drop(tx);
                            last_limit = id.map(|account| (ack.order_id, account));
                        }
                    }
                    _ => {
                        if let Some((order_id, account)) = last_limit.take() {
                            let _ = engine.cancel_order(order_id, account).await;
                        } else {
                            let _ = engine.match_limits(&btc(), dec!(49950)).await;
                        }
                    }
                }
            }

            let tx = ledger.begin().await;
            for account in tx.accounts() {
                prop_assert!(
                    account.balanced(),
                    "account {:?}: {} != {} + {}",
                    account.id,
                    account.total_balance,
                    account.available_balance,
                    account.margin_balance
                );
                prop_assert!(account.available_balance >= Decimal::ZERO);
                prop_assert!(account.margin_balance >= Decimal::ZERO);

                for side in [PositionSide::Long, PositionSide::Short] {
                    let open = tx
                        .open_positions_for(account.id)
                        .into_iter()
                        .filter(|p| p.side == side)
                        .count();
                    prop_assert!(open <= 1);
                }
            }
            Ok(())
        })?;
    }
}
