// 9.0: liquidation monitor. an independent fixed-interval loop that marks
// every symbol off the book midpoint and force-closes breached positions.
// runs as a supervised tokio task: the stop signal is observed at loop
// boundaries, so an in-flight sweep always finishes before shutdown.

use crate::config::MonitorConfig;
use crate::store::{Ledger, LedgerTx, StoreError};
use crate::types::{PositionId, PositionStatus, Timestamp};
use crate::position::Position;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// One pass over the open positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub liquidated: usize,
    /// Candidates that were no longer breached (or no longer open) when
    /// their transaction re-read them.
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct LiquidationMonitor {
    ledger: Ledger,
    config: MonitorConfig,
}

/// Handle to a running monitor. Dropping it detaches the task; `stop`
/// signals cancellation and waits for the in-flight sweep to finish.
pub struct MonitorHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl LiquidationMonitor {
    pub fn new(ledger: Ledger, config: MonitorConfig) -> Self {
        Self { ledger, config }
    }

    /// Start the monitor loop. A failing sweep is logged and the loop
    /// keeps ticking; only the stop signal halts it.
    pub fn spawn(self) -> MonitorHandle {
        let (stop, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            info!(interval_ms = self.config.interval.as_millis() as u64, "liquidation monitor running");
            let mut ticker = tokio::time::interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        let stats = self.sweep_once().await;
                        if stats.failed > 0 {
                            error!(failed = stats.failed, "liquidation sweep had failures");
                        }
                        if stats.liquidated > 0 {
                            info!(liquidated = stats.liquidated, scanned = stats.scanned, "liquidation sweep");
                        }
                    }
                }
            }
            info!("liquidation monitor stopped");
        });

        MonitorHandle { stop, task }
    }

    /// One full insolvency sweep: recompute midpoints, collect breached
    /// candidates, then liquidate each in its own transaction. Every
    /// candidate is re-read inside its transaction and skipped if the
    /// matching engine got there first — stale reads reload, never
    /// overwrite.
    pub async fn sweep_once(&self) -> SweepStats {
        let mut stats = SweepStats::default();

        let (marks, candidates) = {
            let tx = self.ledger.begin().await;
            let marks = tx.mark_prices();
            if marks.is_empty() {
                return stats;
            }
            let positions = tx.open_positions();
            stats.scanned = positions.len();
            let candidates: Vec<PositionId> = positions
                .iter()
                .filter(|p| {
                    p.liquidation_price.is_some()
                        && marks.get(&p.symbol).is_some_and(|mark| p.is_breached(*mark))
                })
                .map(|p| p.id)
                .collect();
            tx.rollback();
            (marks, candidates)
        };

        for id in candidates {
            let mut tx = self.ledger.begin().await;
            let position = match tx.position(id) {
                Ok(p) => p.clone(),
                Err(_) => continue,
            };
            if position.status != PositionStatus::Open {
                stats.skipped += 1;
                continue;
            }
            let Some(mark) = marks.get(&position.symbol).copied() else {
                continue;
            };
            if !position.is_breached(mark) {
                stats.skipped += 1;
                continue;
            }

            match liquidate(&mut tx, &position, mark) {
                Ok(()) => {
                    tx.commit();
                    stats.liquidated += 1;
                    warn!(
                        position_id = position.id.0,
                        symbol = %position.symbol,
                        side = ?position.side,
                        mark = %mark,
                        margin_lost = %position.margin,
                        "position liquidated"
                    );
                }
                Err(err) => {
                    tx.rollback();
                    stats.failed += 1;
                    error!(position_id = position.id.0, error = %err, "liquidation failed");
                }
            }
        }

        stats
    }
}

/// Force-close one breached position: the full pledged margin is lost, the
/// row flips to LIQUIDATED, and a closing trade records `-margin` as pnl.
fn liquidate(tx: &mut LedgerTx, position: &Position, mark: Decimal) -> Result<(), StoreError> {
    let now = Timestamp::now();

    tx.account_mut(position.account_id)?
        .absorb_liquidation(position.margin, now);

    {
        let row = tx.position_mut(position.id)?;
        row.status = PositionStatus::Liquidated;
        row.closed_at = Some(now);
        row.updated_at = now;
    }

    tx.record_trade(
        None,
        position.account_id,
        position.symbol.clone(),
        position.side.closing_order_side(),
        position.quantity,
        mark,
        -position.margin,
        now,
    );

    Ok(())
}
