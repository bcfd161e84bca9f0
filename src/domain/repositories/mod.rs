//! Repository traits for the domain layer
//!
//! Contains:
//! - `RepositoryProvider` - unified access to all per-aggregate repositories
//! - `DomainResult` - standard result type for domain operations

use super::account::AccountRepository;
use super::invoice::InvoiceRepository;
use super::reservation::ReservationRepository;
use super::resource::ResourceRepository;
use super::session::SessionRepository;
use super::subscription::SubscriptionRepository;
use crate::shared::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Provides access to all domain repositories.
///
/// Services hold an `Arc<dyn RepositoryProvider>` and request only the
/// repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let point = repos.resources().find_point(12).await?;
///     let running = repos.sessions().find_charging_for_point(12).await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn resources(&self) -> &dyn ResourceRepository;
    fn reservations(&self) -> &dyn ReservationRepository;
    fn sessions(&self) -> &dyn SessionRepository;
    fn subscriptions(&self) -> &dyn SubscriptionRepository;
    fn invoices(&self) -> &dyn InvoiceRepository;
    fn accounts(&self) -> &dyn AccountRepository;
}
