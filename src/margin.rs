//! Margin arithmetic: reservations, liquidation prices, the bankruptcy clamp.
//!
//! Initial margin for a fill is notional divided by leverage. The liquidation
//! price leaves a buffer of `1/leverage - mmr` between entry and forced close,
//! where `mmr` is the maintenance margin rate from the symbol's leverage
//! bracket.

use crate::types::{Leverage, PositionSide};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Margin required to carry `quantity` at `price` under `leverage`.
pub fn required_margin(price: Decimal, quantity: Decimal, leverage: Leverage) -> Decimal {
    price * quantity / Decimal::from(leverage.value())
}

/// Price at which an isolated position is force-closed.
///
/// LONG:  entry * (1 - 1/leverage + mmr)
/// SHORT: entry * (1 + 1/leverage - mmr)
pub fn liquidation_price(
    entry_price: Decimal,
    leverage: Leverage,
    side: PositionSide,
    maint_margin_rate: Decimal,
) -> Decimal {
    let imf = leverage.fraction();
    let liq = match side {
        PositionSide::Long => entry_price * (Decimal::ONE - imf + maint_margin_rate),
        PositionSide::Short => entry_price * (Decimal::ONE + imf - maint_margin_rate),
    };
    liq.max(dec!(0.0001))
}

/// Isolated-margin backstop: a closing loss never exceeds the pledged margin.
pub fn clamp_isolated_loss(pnl: Decimal, pledged_margin: Decimal) -> Decimal {
    pnl.max(-pledged_margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn required_margin_scales_with_leverage() {
        let lev_10x = Leverage::new(10).unwrap();
        assert_eq!(required_margin(dec!(50000), dec!(1), lev_10x), dec!(5000));

        let lev_1x = Leverage::new(1).unwrap();
        assert_eq!(required_margin(dec!(50000), dec!(1), lev_1x), dec!(50000));
    }

    #[test]
    fn liquidation_price_long_10x() {
        // 50000 * (1 - 0.1 + 0.004) = 45200
        let liq = liquidation_price(
            dec!(50000),
            Leverage::new(10).unwrap(),
            PositionSide::Long,
            dec!(0.004),
        );
        assert_eq!(liq, dec!(45200));
    }

    #[test]
    fn liquidation_price_short_10x() {
        // 50000 * (1 + 0.1 - 0.004) = 54800
        let liq = liquidation_price(
            dec!(50000),
            Leverage::new(10).unwrap(),
            PositionSide::Short,
            dec!(0.004),
        );
        assert_eq!(liq, dec!(54800));
    }

    #[test]
    fn liquidation_price_floors_above_zero() {
        // 1x long with a tiny mmr would otherwise land at ~0
        let liq = liquidation_price(
            dec!(0.0001),
            Leverage::new(1).unwrap(),
            PositionSide::Long,
            dec!(0.004),
        );
        assert!(liq >= dec!(0.0001));
    }

    #[test]
    fn bankruptcy_clamp() {
        assert_eq!(clamp_isolated_loss(dec!(-150), dec!(100)), dec!(-100));
        assert_eq!(clamp_isolated_loss(dec!(-50), dec!(100)), dec!(-50));
        assert_eq!(clamp_isolated_loss(dec!(75), dec!(100)), dec!(75));
    }
}
