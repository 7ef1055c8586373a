use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::Side;

/// Event time in nanoseconds since the Unix epoch
pub type EventTimeNs = i64;

/// A single order/trade event observed on a venue.
///
/// Immutable once created; the buffer and the broadcast hub hand out clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub venue: String,
    pub instrument: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub participant_id: String,
    pub order_id: String,
    /// Present for fills, usually absent for cancels
    pub execution_id: Option<String>,
    /// Venue family the event came from (e.g. CEX, DEX)
    pub origin: Option<String>,
    pub event_time_ns: EventTimeNs,
}

impl TradeEvent {
    /// Create an event with the mandatory fields; optional ids default to `None`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        venue: impl Into<String>,
        instrument: impl Into<String>,
        side: Side,
        price: Decimal,
        quantity: Decimal,
        participant_id: impl Into<String>,
        order_id: impl Into<String>,
        event_time_ns: EventTimeNs,
    ) -> Self {
        Self {
            venue: venue.into(),
            instrument: instrument.into(),
            side,
            price,
            quantity,
            participant_id: participant_id.into(),
            order_id: order_id.into(),
            execution_id: None,
            origin: None,
            event_time_ns,
        }
    }

    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = Some(execution_id.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Quantity as f64 for statistical aggregation
    pub fn quantity_f64(&self) -> f64 {
        self.quantity.to_f64().unwrap_or(0.0)
    }
}
