// 3.0: per-symbol leverage brackets. the maintenance margin rate rises with
// position notional; the engine looks the rate up by fill notional when it
// computes a liquidation price. seeded from exchange data or the builtin
// BTCUSDT fallback table.

use crate::types::Symbol;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeverageBracket {
    pub symbol: Symbol,
    pub bracket_id: u32,
    pub initial_leverage: u32,
    pub min_notional: Decimal,
    pub max_notional: Decimal,
    pub maint_margin_rate: Decimal,
    pub cum_maintenance: Decimal,
}

/// Maintenance margin rate for a fill of `notional` on `symbol`.
/// Falls back to `default_rate` when the symbol has no brackets.
pub fn maint_margin_rate(
    brackets: &[LeverageBracket],
    symbol: &Symbol,
    notional: Decimal,
    default_rate: Decimal,
) -> Decimal {
    let mut rows: Vec<&LeverageBracket> =
        brackets.iter().filter(|b| b.symbol == *symbol).collect();
    rows.sort_by_key(|b| b.bracket_id);

    for bracket in &rows {
        if notional <= bracket.max_notional {
            return bracket.maint_margin_rate;
        }
    }
    // Above the top bracket, the top rate applies.
    rows.last().map(|b| b.maint_margin_rate).unwrap_or(default_rate)
}

/// Fallback BTCUSDT brackets used when no exchange data is available.
pub fn btcusdt_fallback() -> Vec<LeverageBracket> {
    let rows: [(u32, u32, i64, i64, Decimal, i64); 9] = [
        (1, 125, 0, 20_000, dec!(0.004), 0),
        (2, 100, 20_000, 50_000, dec!(0.005), 20),
        (3, 50, 50_000, 250_000, dec!(0.01), 1_270),
        (4, 20, 250_000, 1_000_000, dec!(0.025), 15_020),
        (5, 10, 1_000_000, 5_000_000, dec!(0.05), 140_020),
        (6, 5, 5_000_000, 20_000_000, dec!(0.1), 1_140_020),
        (7, 4, 20_000_000, 50_000_000, dec!(0.15), 3_640_020),
        (8, 2, 50_000_000, 100_000_000, dec!(0.2), 8_640_020),
        (9, 1, 100_000_000, 200_000_000, dec!(0.25), 18_640_020),
    ];

    rows.iter()
        .map(|&(id, lev, floor, cap, rate, cum)| LeverageBracket {
            symbol: Symbol::new("BTCUSDT"),
            bracket_id: id,
            initial_leverage: lev,
            min_notional: Decimal::from(floor),
            max_notional: Decimal::from(cap),
            maint_margin_rate: rate,
            cum_maintenance: Decimal::from(cum),
        })
        .collect()
}
