use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Side of a surveilled order event.
///
/// `Cancel` is carried on the same axis as `Buy`/`Sell` because venues report
/// pulled orders through the same trade feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
    Cancel,
}

impl Side {
    /// Returns true for fills (BUY or SELL), false for cancellations
    pub fn is_execution(&self) -> bool {
        matches!(self, Side::Buy | Side::Sell)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
            Side::Cancel => "CANCEL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            "CANCEL" => Ok(Side::Cancel),
            other => Err(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_side_case_insensitive() {
        assert_eq!("buy".parse::<Side>(), Ok(Side::Buy));
        assert_eq!(" SELL ".parse::<Side>(), Ok(Side::Sell));
        assert_eq!("Cancel".parse::<Side>(), Ok(Side::Cancel));
        assert!("HOLD".parse::<Side>().is_err());
    }

    #[test]
    fn test_execution_sides() {
        assert!(Side::Buy.is_execution());
        assert!(Side::Sell.is_execution());
        assert!(!Side::Cancel.is_execution());
    }
}
