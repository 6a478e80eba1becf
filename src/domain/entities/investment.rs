use rust_decimal::Decimal;

use crate::domain::value_objects::{lots::Lots, money::Money};

/// Valuation of one investment position, derived from its quantity and
/// per-lot cost basis / mark. Unmarked investments value at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Valuation {
    pub market_value: Decimal,
    pub cost_basis: Decimal,
    pub profit_loss: Decimal,
}

impl Valuation {
    pub fn of(quantity: Lots, acquisition_cost: Money, current_value: Option<Money>) -> Self {
        let cost_basis = acquisition_cost.value() * quantity.value();
        let market_value = current_value
            .map(|mark| mark.value() * quantity.value())
            .unwrap_or(Decimal::ZERO);

        Valuation {
            market_value,
            cost_basis,
            profit_loss: market_value - cost_basis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_valuation_with_mark() {
        let quantity = Lots::new(dec!(10)).unwrap();
        let cost = Money::new(dec!(100)).unwrap();
        let mark = Money::new(dec!(120)).unwrap();

        let valuation = Valuation::of(quantity, cost, Some(mark));
        assert_eq!(valuation.market_value, dec!(1200));
        assert_eq!(valuation.cost_basis, dec!(1000));
        assert_eq!(valuation.profit_loss, dec!(200));
    }

    #[test]
    fn test_valuation_unmarked_values_at_zero() {
        let quantity = Lots::new(dec!(4)).unwrap();
        let cost = Money::new(dec!(50)).unwrap();

        let valuation = Valuation::of(quantity, cost, None);
        assert_eq!(valuation.market_value, Decimal::ZERO);
        assert_eq!(valuation.cost_basis, dec!(200));
        assert_eq!(valuation.profit_loss, dec!(-200));
    }

    #[test]
    fn test_valuation_zero_position() {
        let valuation = Valuation::of(
            Lots::ZERO,
            Money::new(dec!(75)).unwrap(),
            Some(Money::new(dec!(80)).unwrap()),
        );
        assert_eq!(valuation.market_value, Decimal::ZERO);
        assert_eq!(valuation.cost_basis, Decimal::ZERO);
        assert_eq!(valuation.profit_loss, Decimal::ZERO);
    }
}
