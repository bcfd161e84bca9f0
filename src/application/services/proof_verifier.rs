//! Subscription proof check backed by the registration store

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::ports::{SubscriptionProof, SubscriptionProofVerifier};
use crate::domain::{DomainResult, RegistrationStatus, RepositoryProvider};

/// Treats the decoded QR payload as a registration id.
///
/// The payload encoding belongs to the QR service; what reaches the core is
/// the id, and the proof is valid while that registration is `ACTIVE`.
/// Whether it covers the current instant is the session engine's call.
pub struct RegistrationProofVerifier {
    repos: Arc<dyn RepositoryProvider>,
}

impl RegistrationProofVerifier {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }
}

#[async_trait]
impl SubscriptionProofVerifier for RegistrationProofVerifier {
    async fn verify(&self, code: &str) -> DomainResult<SubscriptionProof> {
        let Ok(registration_id) = code.trim().parse::<i32>() else {
            return Ok(SubscriptionProof {
                registration_id: 0,
                valid: false,
            });
        };
        let valid = self
            .repos
            .subscriptions()
            .find_registration(registration_id)
            .await?
            .is_some_and(|r| r.status == RegistrationStatus::Active);
        Ok(SubscriptionProof {
            registration_id,
            valid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::fixtures::{at, Fixture, BASIC_PLAN};

    #[tokio::test]
    async fn active_registration_is_valid_proof() {
        let fx = Fixture::new().await;
        let reg = fx.subscribe(10, BASIC_PLAN, at(2025, 3, 1, 0, 0)).await;
        let verifier = RegistrationProofVerifier::new(fx.repos.clone());

        let proof = verifier.verify(&format!(" {} ", reg.id)).await.unwrap();
        assert_eq!(proof, SubscriptionProof { registration_id: reg.id, valid: true });

        fx.services.plans.cancel(reg.id).await.unwrap();
        assert!(!verifier.verify(&reg.id.to_string()).await.unwrap().valid);
    }

    #[tokio::test]
    async fn garbage_code_is_invalid() {
        let fx = Fixture::new().await;
        let verifier = RegistrationProofVerifier::new(fx.repos.clone());
        assert!(!verifier.verify("QR:abc").await.unwrap().valid);
        assert!(!verifier.verify("4242").await.unwrap().valid);
    }
}
