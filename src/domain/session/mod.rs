//! Charging session aggregate

pub mod model;
pub mod pricing;
pub mod repository;

pub use model::{ChargingSession, SessionCharge, SessionOwner, SessionStatus};
pub use repository::SessionRepository;
