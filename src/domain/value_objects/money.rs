use rust_decimal::Decimal;

/// Non-negative currency amount (per-lot costs, marks, cash positions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Money(Decimal);

impl Money {
    pub fn new(value: Decimal) -> Result<Self, String> {
        if value >= Decimal::ZERO {
            Ok(Money(value))
        } else {
            Err("Amount must be non-negative".to_string())
        }
    }

    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn add(&self, other: Money) -> Result<Money, String> {
        Money::new(self.0 + other.0)
    }

    pub fn multiply(&self, factor: Decimal) -> Result<Money, String> {
        Money::new(self.0 * factor)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Money {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: Decimal = s.parse().map_err(|_| format!("Invalid amount: {}", s))?;
        Money::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_new_valid() {
        let amount = Money::new(dec!(199.90));
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().value(), dec!(199.90));
    }

    #[test]
    fn test_money_new_negative() {
        let amount = Money::new(dec!(-0.01));
        assert!(amount.is_err());
        assert_eq!(amount.unwrap_err(), "Amount must be non-negative");
    }

    #[test]
    fn test_money_new_zero() {
        let amount = Money::new(Decimal::ZERO);
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().value(), Decimal::ZERO);
    }

    #[test]
    fn test_money_multiply() {
        let amount = Money::new(dec!(12.50)).unwrap();
        let result = amount.multiply(dec!(4)).unwrap();
        assert_eq!(result.value(), dec!(50.00));
    }

    #[test]
    fn test_money_add() {
        let a = Money::new(dec!(100)).unwrap();
        let b = Money::new(dec!(0.5)).unwrap();
        assert_eq!(a.add(b).unwrap().value(), dec!(100.5));
    }
}
