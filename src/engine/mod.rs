// 8.0: matching and netting engine plus order intake. every entry point
// funnels into the shared settlement in settle.rs, one atomic transaction
// per settled order. dependencies are injected at construction; the engine
// owns no state beyond its ledger handle.

mod intake;
mod limits;
mod results;
mod settle;
mod sweep;

pub use intake::OrderRequest;
pub use results::{EngineError, MatchSummary, OrderAck, SweepResult};

use crate::config::EngineConfig;
use crate::store::Ledger;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Engine {
    ledger: Ledger,
    config: Arc<EngineConfig>,
}

impl Engine {
    pub fn new(ledger: Ledger, config: EngineConfig) -> Self {
        Self {
            ledger,
            config: Arc::new(config),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}
