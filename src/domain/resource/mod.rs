//! Resource aggregate
//!
//! The physical hierarchy (facility > station > point > charger) and its
//! availability statuses.

pub mod model;
pub mod repository;

pub use model::{
    Charger, ChargingPoint, Facility, ResourceKind, ResourceRef, ResourceStatus, Station,
};
pub use repository::ResourceRepository;
