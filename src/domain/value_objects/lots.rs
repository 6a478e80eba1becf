use rust_decimal::Decimal;

/// Stock quantity held or traded, in lots. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Lots(Decimal);

impl Lots {
    pub fn new(value: Decimal) -> Result<Self, String> {
        if value >= Decimal::ZERO {
            Ok(Lots(value))
        } else {
            Err("Lot quantity must be non-negative".to_string())
        }
    }

    pub const ZERO: Lots = Lots(Decimal::ZERO);

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(&self, other: Lots) -> Result<Lots, String> {
        Lots::new(self.0 + other.0)
    }

    pub fn subtract(&self, other: Lots) -> Result<Lots, String> {
        Lots::new(self.0 - other.0)
    }
}

impl std::fmt::Display for Lots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Lots {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: Decimal = s
            .parse()
            .map_err(|_| format!("Invalid lot quantity: {}", s))?;
        Lots::new(value)
    }
}
