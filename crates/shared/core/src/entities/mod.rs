mod case;
mod side;
mod trade_event;

pub use case::{Case, CaseAction, CaseEvent, CaseId, CaseStatus, Priority, SYSTEM_ACTOR};
pub use side::Side;
pub use trade_event::{EventTimeNs, TradeEvent};
