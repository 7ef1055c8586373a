//! Canned trading scenarios for demos and end-to-end checks
//!
//! Each builder returns wire records stamped one second apart starting at
//! `t0`, so with a window-aligned `t0` a scenario lands in a single window.

use crate::ingest::TradeRecord;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;
use std::str::FromStr;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Size of the quiet crowd trading alongside the spoofer
pub const SPOOFING_BACKGROUND_TRADERS: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Normal,
    Spoofing,
    WashTrading,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Normal, Scenario::Spoofing, Scenario::WashTrading];

    pub fn records(&self, t0: i64) -> Vec<TradeRecord> {
        match self {
            Scenario::Normal => normal_trading(t0),
            Scenario::Spoofing => {
                let mut records = background_market(t0, SPOOFING_BACKGROUND_TRADERS);
                let offset = records.len() as i64 * NANOS_PER_SEC;
                records.extend(spoofing(t0 + offset));
                records
            }
            Scenario::WashTrading => wash_trading(t0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Normal => "normal",
            Scenario::Spoofing => "spoofing",
            Scenario::WashTrading => "wash",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Scenario::Normal),
            "spoofing" | "spoof" => Ok(Scenario::Spoofing),
            "wash" | "wash_trading" | "wash-trading" => Ok(Scenario::WashTrading),
            other => Err(format!("unknown scenario: {other}")),
        }
    }
}

struct Leg {
    venue: &'static str,
    instrument: &'static str,
    side: &'static str,
    price: Decimal,
    quantity: Decimal,
    participant: &'static str,
}

fn build(tag: &str, t0: i64, legs: &[Leg]) -> Vec<TradeRecord> {
    legs.iter()
        .enumerate()
        .map(|(i, leg)| record(tag, t0 + i as i64 * NANOS_PER_SEC, i, leg))
        .collect()
}

fn record(tag: &str, event_time_ns: i64, seq: usize, leg: &Leg) -> TradeRecord {
    let executed = leg.side != "CANCEL";
    TradeRecord {
        event_time_ns,
        venue: leg.venue.to_string(),
        instrument: leg.instrument.to_string(),
        side: leg.side.to_string(),
        price: leg.price,
        quantity: leg.quantity,
        participant_id: leg.participant.to_string(),
        order_id: format!("ORD-{tag}-{seq}"),
        execution_id: executed.then(|| format!("EXEC-{tag}-{seq}")),
        origin: Some(leg.venue.to_string()),
    }
}

/// Small, unremarkable trades across two venues
pub fn normal_trading(t0: i64) -> Vec<TradeRecord> {
    build(
        "NORMAL",
        t0,
        &[
            Leg { venue: "CEX", instrument: "BTC-USDT", side: "BUY", price: dec!(43000), quantity: dec!(0.05), participant: "Alice" },
            Leg { venue: "CEX", instrument: "BTC-USDT", side: "SELL", price: dec!(43001), quantity: dec!(0.04), participant: "Bob" },
            Leg { venue: "DEX", instrument: "ETH-USDC", side: "BUY", price: dec!(2400), quantity: dec!(0.10), participant: "Carol" },
            Leg { venue: "CEX", instrument: "BTC-USDT", side: "BUY", price: dec!(42998), quantity: dec!(0.03), participant: "Dave" },
            Leg { venue: "CEX", instrument: "BTC-USDT", side: "BUY", price: dec!(42999), quantity: dec!(0.02), participant: "Alice" },
        ],
    )
}

/// Eve posts three large bids, cancels them, then sells a small clip
pub fn spoofing(t0: i64) -> Vec<TradeRecord> {
    build(
        "SPOOF",
        t0,
        &[
            Leg { venue: "CEX", instrument: "BTC-USDT", side: "CANCEL", price: dec!(43100), quantity: dec!(10.0), participant: "Eve" },
            Leg { venue: "CEX", instrument: "BTC-USDT", side: "CANCEL", price: dec!(43099), quantity: dec!(10.0), participant: "Eve" },
            Leg { venue: "CEX", instrument: "BTC-USDT", side: "CANCEL", price: dec!(43098), quantity: dec!(10.0), participant: "Eve" },
            Leg { venue: "CEX", instrument: "BTC-USDT", side: "SELL", price: dec!(43000), quantity: dec!(0.5), participant: "Eve" },
        ],
    )
}

/// Frank and Grace swap the same size back and forth at one price
pub fn wash_trading(t0: i64) -> Vec<TradeRecord> {
    let legs: Vec<Leg> = (0..6)
        .flat_map(|round| {
            let (frank, grace) = if round % 2 == 0 { ("BUY", "SELL") } else { ("SELL", "BUY") };
            [
                Leg { venue: "CEX", instrument: "BTC-USDT", side: frank, price: dec!(43000), quantity: dec!(1.0), participant: "Frank" },
                Leg { venue: "CEX", instrument: "BTC-USDT", side: grace, price: dec!(43000), quantity: dec!(1.0), participant: "Grace" },
            ]
        })
        .collect();
    build("WASH", t0, &legs)
}

/// `traders` participants each placing one identical small bid
pub fn background_market(t0: i64, traders: usize) -> Vec<TradeRecord> {
    (0..traders)
        .map(|i| {
            let mut r = record(
                "MKT",
                t0 + i as i64 * NANOS_PER_SEC,
                i,
                &Leg {
                    venue: "CEX",
                    instrument: "BTC-USDT",
                    side: "BUY",
                    price: dec!(43000),
                    quantity: dec!(0.05),
                    participant: "",
                },
            );
            r.participant_id = format!("trader-{i:02}");
            r
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_100_000_000_000;

    #[test]
    fn test_parse() {
        assert_eq!("normal".parse::<Scenario>().unwrap(), Scenario::Normal);
        assert_eq!("Spoofing".parse::<Scenario>().unwrap(), Scenario::Spoofing);
        assert_eq!("wash".parse::<Scenario>().unwrap(), Scenario::WashTrading);
        assert!("layering".parse::<Scenario>().is_err());
    }

    #[test]
    fn test_spoofing_has_crowd_then_eve() {
        let records = Scenario::Spoofing.records(T0);
        assert_eq!(records.len(), SPOOFING_BACKGROUND_TRADERS + 4);

        let eve: Vec<&TradeRecord> = records.iter().filter(|r| r.participant_id == "Eve").collect();
        assert_eq!(eve.len(), 4);
        assert_eq!(eve.iter().filter(|r| r.side == "CANCEL").count(), 3);
        assert!(eve.iter().filter(|r| r.side == "CANCEL").all(|r| r.execution_id.is_none()));
    }

    #[test]
    fn test_wash_alternates_per_participant() {
        let records = wash_trading(T0);
        assert_eq!(records.len(), 12);
        let frank: Vec<&str> = records
            .iter()
            .filter(|r| r.participant_id == "Frank")
            .map(|r| r.side.as_str())
            .collect();
        assert_eq!(frank, vec!["BUY", "SELL", "BUY", "SELL", "BUY", "SELL"]);
    }

    #[test]
    fn test_timestamps_increase() {
        let records = normal_trading(T0);
        assert!(records.windows(2).all(|w| w[0].event_time_ns < w[1].event_time_ns));
        assert_eq!(records[0].event_time_ns, T0);
    }
}
