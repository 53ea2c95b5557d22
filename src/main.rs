//! Paper trading backend simulation.
//!
//! Walks the full engine lifecycle against a seeded book: market sweeps
//! with slippage, limit reservation and trade-print fills, netting with
//! realized PnL, and a liquidation pass after a price crash.

use paper_futures::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("Paper Futures Engine Simulation");
    println!("Isolated Margin, Netted Settlement, Background Liquidation\n");

    let ledger = Ledger::new();
    let engine = Engine::new(ledger.clone(), EngineConfig::default());

    seed_market(&ledger).await;

    let (feed_tx, feed_rx) = mpsc::channel(256);
    let feed = FeedConsumer::new(ledger.clone(), engine.clone()).spawn(feed_rx);

    scenario_1_market_sweep(&engine).await;
    scenario_2_limit_fill(&engine, &feed_tx).await;
    scenario_3_netting(&engine).await;
    scenario_4_liquidation(&ledger, &engine, &feed_tx).await;

    drop(feed_tx);
    feed.stop().await;

    println!("\nAll scenarios completed.");
}

/// Seed brackets and a two-sided BTCUSDT book around $50,000.
async fn seed_market(ledger: &Ledger) {
    let symbol = Symbol::new("BTCUSDT");
    let mut tx = ledger.begin().await;
    tx.seed_brackets(bracket::btcusdt_fallback());
    for (price, qty) in [(dec!(49900), dec!(2)), (dec!(49950), dec!(1.5))] {
        tx.apply_depth(&symbol, BookSide::Bid, price, qty);
    }
    for (price, qty) in [(dec!(50050), dec!(0.5)), (dec!(50100), dec!(2))] {
        tx.apply_depth(&symbol, BookSide::Ask, price, qty);
    }
    tx.commit();
    println!("  Seeded BTCUSDT book: bids to $49,950, asks from $50,050\n");
}

/// Market buy sweeping two ask levels.
async fn scenario_1_market_sweep(engine: &Engine) {
    println!("Scenario 1: Market Sweep\n");

    let ack = engine
        .place_order(OrderRequest {
            symbol: Symbol::new("BTCUSDT"),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: dec!(1),
            price: None,
            leverage: 10,
            owner: "alice".into(),
            account: None,
        })
        .await
        .expect("market order");

    println!(
        "  Alice buys 1 BTC at market: {:?} avg ${}\n",
        ack.status,
        ack.avg_price.unwrap_or_default()
    );
}

/// Limit order reserving margin, filled by a trade print.
async fn scenario_2_limit_fill(engine: &Engine, feed: &mpsc::Sender<MarketEvent>) {
    println!("Scenario 2: Limit Reservation and Fill\n");

    let ack = engine
        .place_order(OrderRequest {
            symbol: Symbol::new("BTCUSDT"),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            quantity: dec!(0.5),
            price: Some(dec!(49800)),
            leverage: 10,
            owner: "bob".into(),
            account: None,
        })
        .await
        .expect("limit order");
    println!("  Bob rests BUY 0.5 @ $49,800: {:?}", ack.status);

    feed.send(MarketEvent::Trade(TradePrint {
        symbol: Symbol::new("BTCUSDT"),
        price: dec!(49750),
        quantity: dec!(0.2),
        side: OrderSide::Sell,
    }))
    .await
    .ok();

    // Give the consumer a beat to settle.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let orders = engine
        .list_orders(AccountId(2), None, Some(OrderStatus::Filled))
        .await;
    println!("  Print at $49,750 crosses it: {} filled order(s)\n", orders.len());
}

/// Opposite-side order nets the open position and realizes PnL.
async fn scenario_3_netting(engine: &Engine) {
    println!("Scenario 3: Netting Close\n");

    let before = engine
        .account_overview(AccountId(1))
        .await
        .expect("account");

    let ack = engine
        .place_order(OrderRequest {
            symbol: Symbol::new("BTCUSDT"),
            side: OrderSide::Sell,
            order_type: OrderType::Market,
            quantity: dec!(1),
            price: None,
            leverage: 10,
            owner: "alice".into(),
            account: None,
        })
        .await
        .expect("closing order");

    let after = engine
        .account_overview(AccountId(1))
        .await
        .expect("account");

    println!(
        "  Alice sells 1 BTC at market ({:?}), total ${} -> ${}\n",
        ack.status, before.total_balance, after.total_balance
    );
}

/// Crash the book and let the monitor liquidate.
async fn scenario_4_liquidation(
    ledger: &Ledger,
    engine: &Engine,
    feed: &mpsc::Sender<MarketEvent>,
) {
    println!("Scenario 4: Liquidation\n");

    engine
        .place_order(OrderRequest {
            symbol: Symbol::new("BTCUSDT"),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: dec!(1),
            price: None,
            leverage: 10,
            owner: "carol".into(),
            account: None,
        })
        .await
        .expect("carol's long");

    let positions = {
        let tx = ledger.begin().await;
        let open = tx.open_positions();
        tx.rollback();
        open
    };
    for p in &positions {
        println!(
            "  Open: {:?} {} @ ${} liq ${}",
            p.side,
            p.quantity,
            p.entry_price,
            p.liquidation_price.unwrap_or_default()
        );
    }

    // Crash the book well below every long's liquidation price.
    for (side, price, qty) in [
        (BookSide::Bid, dec!(49900), Decimal::ZERO),
        (BookSide::Bid, dec!(49950), Decimal::ZERO),
        (BookSide::Ask, dec!(50050), Decimal::ZERO),
        (BookSide::Ask, dec!(50100), Decimal::ZERO),
        (BookSide::Bid, dec!(40000), dec!(5)),
        (BookSide::Ask, dec!(40010), dec!(5)),
    ] {
        feed.send(MarketEvent::Depth(DepthUpdate {
            symbol: Symbol::new("BTCUSDT"),
            side,
            price,
            quantity: qty,
        }))
        .await
        .ok();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    let monitor = LiquidationMonitor::new(
        ledger.clone(),
        MonitorConfig {
            interval: Duration::from_millis(100),
        },
    );
    let handle = monitor.spawn();
    tokio::time::sleep(Duration::from_millis(250)).await;
    handle.stop().await;

    let tx = ledger.begin().await;
    let liquidations: Vec<&Trade> = tx
        .trades()
        .iter()
        .filter(|t| t.order_id.is_none())
        .collect();
    for t in &liquidations {
        println!(
            "  Liquidated {} {} @ ${}, realized ${}",
            t.quantity, t.symbol, t.price, t.realized_pnl
        );
    }
    println!("  {} liquidation trade(s) recorded", liquidations.len());
    tx.rollback();
}
