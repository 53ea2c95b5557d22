// paper-futures: simulated derivatives trading backend.
// ledger-first architecture: every settlement is one atomic store transaction.
//
// file map:
//   1.x  types.rs     primitives: ids, symbols, sides, statuses, leverage
//   2.x  order.rs     order rows and status transitions
//   3.x  bracket.rs   per-symbol leverage brackets, maintenance rates
//   4.x  position.rs  position rows, weighted entries, netting math
//   5.x  trade.rs     append-only execution records
//   6.x  book.rs      order-book snapshot (read-only to the engine)
//   7.x  store.rs     transactional ledger: Ledger / LedgerTx, claiming
//   8.x  engine/      order intake, market sweep, limit matching, settlement
//   9.x  monitor.rs   liquidation monitor loop
//   10.x feed.rs      market-event consumer (depth + trade prints)
//        account.rs   account rows and balance identities
//        margin.rs    required margin, liquidation price, bankruptcy clamp
//        config.rs    engine and monitor configuration

// ledger data model
pub mod account;
pub mod book;
pub mod bracket;
pub mod margin;
pub mod order;
pub mod position;
pub mod trade;
pub mod types;

// store and execution
pub mod config;
pub mod engine;
pub mod feed;
pub mod monitor;
pub mod store;

// re exports for convenience
pub use account::{account_view, Account, AccountError, AccountView};
pub use book::SymbolBook;
pub use bracket::LeverageBracket;
pub use config::{EngineConfig, MonitorConfig};
pub use engine::{Engine, EngineError, MatchSummary, OrderAck, OrderRequest, SweepResult};
pub use feed::{DepthUpdate, FeedConsumer, FeedHandle, MarketEvent, TradePrint};
pub use margin::{clamp_isolated_loss, liquidation_price, required_margin};
pub use monitor::{LiquidationMonitor, MonitorHandle, SweepStats};
pub use order::Order;
pub use position::{weighted_entry, Position, PositionView};
pub use store::{Ledger, LedgerTx, StoreError};
pub use trade::Trade;
pub use types::*;
