//! Engine and monitor configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Balance seeded into auto-created accounts.
    pub starting_balance: Decimal,
    /// Book levels read per market sweep.
    pub max_sweep_levels: usize,
    /// Maintenance margin rate when a symbol has no leverage brackets.
    pub default_maint_margin_rate: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_balance: dec!(100000),
            max_sweep_levels: 100,
            default_maint_margin_rate: dec!(0.004),
        }
    }
}

/// Liquidation monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Delay between insolvency sweeps.
    pub interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}
