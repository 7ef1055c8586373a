//! Wire-level trade records and ingestion acknowledgements

use crate::error::IngestError;
use argus_core::{Side, TradeEvent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade record as submitted by feeds. `side` stays a string until validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub event_time_ns: i64,
    pub venue: String,
    pub instrument: String,
    pub side: String,
    pub price: Decimal,
    pub quantity: Decimal,
    pub participant_id: String,
    pub order_id: String,
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl TryFrom<TradeRecord> for TradeEvent {
    type Error = IngestError;

    fn try_from(record: TradeRecord) -> Result<Self, Self::Error> {
        let side: Side = record.side.parse().map_err(|_| IngestError::UnknownSide {
            side: record.side.clone(),
            order_id: record.order_id.clone(),
        })?;
        if record.quantity.is_sign_negative() && !record.quantity.is_zero() {
            return Err(IngestError::NegativeQuantity {
                order_id: record.order_id,
            });
        }
        if record.price.is_sign_negative() && !record.price.is_zero() {
            return Err(IngestError::NegativePrice {
                order_id: record.order_id,
            });
        }

        Ok(TradeEvent {
            venue: record.venue,
            instrument: record.instrument,
            side,
            price: record.price,
            quantity: record.quantity,
            participant_id: record.participant_id,
            order_id: record.order_id,
            execution_id: non_empty(record.execution_id),
            origin: non_empty(record.origin),
            event_time_ns: record.event_time_ns,
        })
    }
}

impl From<&TradeEvent> for TradeRecord {
    fn from(event: &TradeEvent) -> Self {
        Self {
            event_time_ns: event.event_time_ns,
            venue: event.venue.clone(),
            instrument: event.instrument.clone(),
            side: event.side.as_str().to_string(),
            price: event.price,
            quantity: event.quantity,
            participant_id: event.participant_id.clone(),
            order_id: event.order_id.clone(),
            execution_id: event.execution_id.clone(),
            origin: event.origin.clone(),
        }
    }
}

/// Result of submitting one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestAck {
    pub success: bool,
    pub message: String,
    pub cases_opened: usize,
}

impl IngestAck {
    pub fn accepted(events: usize, cases_opened: usize) -> Self {
        Self {
            success: true,
            message: format!("Processed {events} events"),
            cases_opened,
        }
    }

    pub fn rejected(error: &IngestError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            cases_opened: 0,
        }
    }
}
