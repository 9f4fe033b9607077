//! Role and ownership checks for privileged operations.

use crate::{SecurityError, SecurityErrorKind, SecurityResult};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use warden_core::{Principal, Role};
use warden_interface::{ConversationStore, IdentityOracle};

/// Validates that a principal may perform admin operations and touch a
/// given conversation.
///
/// Both checks are pure reads. Collaborator failures are reported as the
/// corresponding denial.
#[derive(Clone)]
pub struct AccessValidator {
    identity: Arc<dyn IdentityOracle>,
    conversations: Arc<dyn ConversationStore>,
}

impl AccessValidator {
    /// Create a validator over the given collaborators.
    pub fn new(
        identity: Arc<dyn IdentityOracle>,
        conversations: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            identity,
            conversations,
        }
    }

    /// Confirm the principal holds ADMIN or SUPER_ADMIN and return the role.
    pub async fn validate_role(&self, principal_id: &str) -> SecurityResult<Role> {
        let principal = self.resolve_elevated(principal_id).await?;
        Ok(*principal.role())
    }

    /// Resolve the principal, failing unless it is active and elevated.
    #[instrument(skip(self))]
    pub async fn resolve_elevated(&self, principal_id: &str) -> SecurityResult<Principal> {
        debug!("Validating role");

        let deny = |reason: String| {
            SecurityError::new(SecurityErrorKind::RoleInsufficient {
                principal_id: principal_id.to_string(),
                reason,
            })
        };

        let principal = match self.identity.resolve_principal(principal_id).await {
            Ok(Some(principal)) => principal,
            Ok(None) => {
                debug!("Principal unknown");
                return Err(deny("principal not found".to_string()));
            }
            Err(e) => {
                warn!(error = %e, "Identity lookup failed, denying");
                return Err(deny(format!("identity lookup failed: {}", e)));
            }
        };

        if !principal.is_active() {
            debug!("Principal inactive");
            return Err(deny("principal is inactive".to_string()));
        }

        if !principal.role().meets_or_exceeds(Role::Admin) {
            debug!(role = %principal.role(), "Role below ADMIN");
            return Err(deny(format!("role {} is below ADMIN", principal.role())));
        }

        debug!(role = %principal.role(), "Role permitted");
        Ok(principal)
    }

    /// Confirm the principal may access the conversation.
    pub async fn validate_resource_access(
        &self,
        principal_id: &str,
        resource_id: &str,
    ) -> SecurityResult<()> {
        let principal = self.resolve_elevated(principal_id).await.map_err(|e| {
            SecurityError::new(SecurityErrorKind::ResourceAccessDenied {
                principal_id: principal_id.to_string(),
                resource: resource_id.to_string(),
                reason: e.kind().to_string(),
            })
        })?;
        self.check_ownership(&principal, resource_id).await
    }

    /// Ownership check for an already resolved principal.
    ///
    /// SUPER_ADMIN bypasses the lookup entirely.
    #[instrument(skip(self, principal), fields(principal_id = %principal.id()))]
    pub async fn check_ownership(
        &self,
        principal: &Principal,
        resource_id: &str,
    ) -> SecurityResult<()> {
        debug!("Checking resource access");

        if principal.role().bypasses_ownership() {
            debug!("Ownership bypassed by role");
            return Ok(());
        }

        let deny = |reason: String| {
            SecurityError::new(SecurityErrorKind::ResourceAccessDenied {
                principal_id: principal.id().to_string(),
                resource: resource_id.to_string(),
                reason,
            })
        };

        match self.conversations.owner_of(resource_id).await {
            Ok(Some(owner)) if owner == *principal.id() => {
                debug!("Principal owns resource");
                Ok(())
            }
            Ok(Some(_)) => {
                debug!("Resource owned by another principal");
                Err(deny("resource belongs to another principal".to_string()))
            }
            Ok(None) => {
                debug!("Resource unknown");
                Err(deny("resource not found".to_string()))
            }
            Err(e) => {
                warn!(error = %e, "Ownership lookup failed, denying");
                Err(deny(format!("ownership lookup failed: {}", e)))
            }
        }
    }
}

impl std::fmt::Debug for AccessValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessValidator").finish_non_exhaustive()
    }
}
