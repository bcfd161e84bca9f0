//! Notifications module
//!
//! Fire-and-forget events for reminders, overdue warnings, suspensions and
//! session milestones. Delivery (e-mail, SMS, push) subscribes to the bus;
//! a slow or absent consumer never blocks a billing transition.
//!
//! ```ignore
//! use chargegrid::notifications::{create_event_bus, Event, AccountStatusEvent};
//!
//! let bus = create_event_bus();
//! bus.publish(Event::AccountSuspended(AccountStatusEvent {
//!     driver_id: 42,
//!     invoice_id: 7,
//!     timestamp: chrono::Utc::now(),
//! }));
//! ```

pub mod event_bus;
pub mod events;

pub use event_bus::{create_event_bus, EventBus, EventSubscriber, SharedEventBus};
pub use events::*;
