use tracing::{error, warn};

use crate::domain::{
    error::IdentityProviderError, models::user::ExternalId,
    services::identity_provider::IdentityProvider,
};

/// Corrective action undoing a forward step that already succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    DeleteRemoteIdentity(ExternalId),
}

/// Compensations recorded in the order their forward steps completed.
#[derive(Debug, Default)]
pub struct CompensationLog {
    steps: Vec<Compensation>,
}

impl CompensationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, compensation: Compensation) {
        self.steps.push(compensation);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every compensation once, newest first.
    ///
    /// Failures are logged and returned; they never abort the remaining steps.
    pub async fn unwind<I>(
        self,
        identity_provider: &I,
    ) -> Vec<(Compensation, IdentityProviderError)>
    where
        I: IdentityProvider + Sync,
    {
        let mut failures = Vec::new();
        for step in self.steps.into_iter().rev() {
            let outcome = match &step {
                Compensation::DeleteRemoteIdentity(id) => identity_provider.delete_user(id).await,
            };
            match outcome {
                Ok(()) => warn!(compensation = ?step, "Rolled back identity provider user creation"),
                Err(e) => {
                    error!(compensation = ?step, error = %e, "Failed to roll back identity provider user creation");
                    failures.push((step, e));
                }
            }
        }
        failures
    }
}
