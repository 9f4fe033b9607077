//! Tests for role and ownership validation.

use async_trait::async_trait;
use std::sync::Arc;
use warden_core::{Principal, Role};
use warden_error::{BackendError, WardenResult};
use warden_interface::{ConversationStore, IdentityOracle};
use warden_security::{AccessValidator, SecurityErrorKind};
use warden_storage::{InMemoryConversations, InMemoryDirectory};

struct UnreachableDirectory;

#[async_trait]
impl IdentityOracle for UnreachableDirectory {
    async fn resolve_principal(&self, _principal_id: &str) -> WardenResult<Option<Principal>> {
        Err(BackendError::new("directory", "connection refused").into())
    }
}

struct UnreachableStore;

#[async_trait]
impl ConversationStore for UnreachableStore {
    async fn owner_of(&self, _resource_id: &str) -> WardenResult<Option<String>> {
        Err(BackendError::new("conversation store", "timeout").into())
    }
}

fn validator() -> AccessValidator {
    let directory: InMemoryDirectory = [
        Principal::active("user-1", Role::User),
        Principal::active("admin-1", Role::Admin),
        Principal::active("admin-2", Role::Admin),
        Principal::active("root", Role::SuperAdmin),
        Principal::new("retired", Role::Admin, false),
    ]
    .into_iter()
    .collect();

    let conversations = InMemoryConversations::new();
    conversations.insert("conv-1", "admin-1");
    conversations.insert("conv-2", "admin-2");

    AccessValidator::new(Arc::new(directory), Arc::new(conversations))
}

#[tokio::test]
async fn test_user_role_insufficient() {
    let err = validator().validate_role("user-1").await.unwrap_err();
    assert!(matches!(err.kind(), SecurityErrorKind::RoleInsufficient { .. }));
}

#[tokio::test]
async fn test_admin_and_super_admin_pass() {
    let validator = validator();
    assert_eq!(validator.validate_role("admin-1").await.unwrap(), Role::Admin);
    assert_eq!(validator.validate_role("root").await.unwrap(), Role::SuperAdmin);
}

#[tokio::test]
async fn test_unknown_and_inactive_denied() {
    let validator = validator();
    for id in ["ghost", "retired"] {
        let err = validator.validate_role(id).await.unwrap_err();
        assert!(
            matches!(err.kind(), SecurityErrorKind::RoleInsufficient { .. }),
            "{} should be denied",
            id
        );
    }
}

#[tokio::test]
async fn test_admin_only_own_resources() {
    let validator = validator();
    assert!(validator.validate_resource_access("admin-1", "conv-1").await.is_ok());

    let err = validator
        .validate_resource_access("admin-1", "conv-2")
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), SecurityErrorKind::ResourceAccessDenied { .. }));

    let err = validator
        .validate_resource_access("admin-1", "conv-missing")
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), SecurityErrorKind::ResourceAccessDenied { .. }));
}

#[tokio::test]
async fn test_super_admin_any_resource() {
    let validator = validator();
    assert!(validator.validate_resource_access("root", "conv-1").await.is_ok());
    assert!(validator.validate_resource_access("root", "conv-2").await.is_ok());
    assert!(validator.validate_resource_access("root", "conv-missing").await.is_ok());
}

#[tokio::test]
async fn test_user_denied_resource_access() {
    let err = validator()
        .validate_resource_access("user-1", "conv-1")
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), SecurityErrorKind::ResourceAccessDenied { .. }));
}

#[tokio::test]
async fn test_identity_failure_fails_closed() {
    let validator = AccessValidator::new(
        Arc::new(UnreachableDirectory),
        Arc::new(InMemoryConversations::new()),
    );
    let err = validator.validate_role("admin-1").await.unwrap_err();
    match err.kind() {
        SecurityErrorKind::RoleInsufficient { reason, .. } => {
            assert!(reason.contains("identity lookup failed"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_ownership_failure_fails_closed() {
    let directory: InMemoryDirectory = [
        Principal::active("admin-1", Role::Admin),
        Principal::active("root", Role::SuperAdmin),
    ]
    .into_iter()
    .collect();
    let validator = AccessValidator::new(Arc::new(directory), Arc::new(UnreachableStore));

    let err = validator
        .validate_resource_access("admin-1", "conv-1")
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), SecurityErrorKind::ResourceAccessDenied { .. }));

    // SUPER_ADMIN never consults the store.
    assert!(validator.validate_resource_access("root", "conv-1").await.is_ok());
}
