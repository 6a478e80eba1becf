/// Transaction types recognized by the back office. BUY increases an
/// investment's position, SELL decreases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Buy,
    Sell,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Buy => write!(f, "BUY"),
            TransactionType::Sell => write!(f, "SELL"),
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(TransactionType::Buy),
            "SELL" => Ok(TransactionType::Sell),
            other => Err(format!("Invalid transaction type: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_roundtrip() {
        assert_eq!("BUY".parse::<TransactionType>(), Ok(TransactionType::Buy));
        assert_eq!("sell".parse::<TransactionType>(), Ok(TransactionType::Sell));
        assert_eq!(TransactionType::Buy.to_string(), "BUY");
        assert_eq!(TransactionType::Sell.to_string(), "SELL");
    }

    #[test]
    fn test_transaction_type_invalid() {
        assert!("TRANSFER".parse::<TransactionType>().is_err());
        assert!("".parse::<TransactionType>().is_err());
    }
}
