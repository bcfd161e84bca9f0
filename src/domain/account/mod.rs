//! Driver account aggregate

pub mod model;
pub mod repository;

pub use model::AccountStatus;
pub use repository::AccountRepository;
