pub mod errors;
pub mod locks;
pub mod shutdown;

pub use errors::*;
pub use locks::{AdmissionLocks, KeyedLocks};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
