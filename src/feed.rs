// 10.0: market-event consumer. depth updates maintain the book snapshot
// (the only writer); trade prints trigger limit matching. events arrive on
// an mpsc channel from whatever transport feeds the process. supervised
// like the liquidation monitor: already-queued events drain first, the stop
// signal is observed once the channel idles.

use crate::engine::Engine;
use crate::store::Ledger;
use crate::types::{BookSide, OrderSide, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One depth row change; quantity 0 removes the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthUpdate {
    pub symbol: Symbol,
    pub side: BookSide,
    pub price: Decimal,
    pub quantity: Decimal,
}

/// An executed trade observed on the live market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradePrint {
    pub symbol: Symbol,
    pub price: Decimal,
    pub quantity: Decimal,
    pub side: OrderSide,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketEvent {
    Depth(DepthUpdate),
    Trade(TradePrint),
}

pub struct FeedConsumer {
    ledger: Ledger,
    engine: Engine,
}

/// Handle to a running consumer; `stop` cancels and awaits it.
pub struct FeedHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

impl FeedConsumer {
    pub fn new(ledger: Ledger, engine: Engine) -> Self {
        Self { ledger, engine }
    }

    /// Consume events until the channel closes or stop is signalled.
    pub fn spawn(self, mut events: mpsc::Receiver<MarketEvent>) -> FeedHandle {
        let (stop, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            info!("feed consumer running");
            loop {
                tokio::select! {
                    biased;
                    received = events.recv() => match received {
                        Some(event) => self.handle(event).await,
                        None => break,
                    },
                    _ = stop_rx.changed() => break,
                }
            }
            info!("feed consumer stopped");
        });

        FeedHandle { stop, task }
    }

    async fn handle(&self, event: MarketEvent) {
        match event {
            MarketEvent::Depth(update) => {
                let mut tx = self.ledger.begin().await;
                tx.apply_depth(&update.symbol, update.side, update.price, update.quantity);
                tx.commit();
            }
            MarketEvent::Trade(print) => {
                let summary = self.engine.match_limits(&print.symbol, print.price).await;
                if summary.settled > 0 {
                    debug!(
                        symbol = %print.symbol,
                        price = %print.price,
                        settled = summary.settled,
                        "trade print settled limit orders"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn market_events_round_trip_through_json() {
        let event = MarketEvent::Trade(TradePrint {
            symbol: Symbol::new("BTCUSDT"),
            price: dec!(50000.5),
            quantity: dec!(0.25),
            side: OrderSide::Sell,
        });

        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: MarketEvent = serde_json::from_str(&encoded).unwrap();
        match decoded {
            MarketEvent::Trade(print) => {
                assert_eq!(print.price, dec!(50000.5));
                assert_eq!(print.quantity, dec!(0.25));
            }
            MarketEvent::Depth(_) => panic!("wrong variant"),
        }
    }
}
