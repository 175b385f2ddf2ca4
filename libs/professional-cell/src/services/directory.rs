use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::auth::UserRole;

use crate::error::{AvailabilityError, StorageError};
use crate::models::DirectoryUser;

/// Read-only view of the clinic's user accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<DirectoryUser>, StorageError>;
}

/// Looks a user up and checks they hold `expected`.
///
/// Unknown ids surface as `NotFound`, a wrong role as `InvalidRole` attributed to `field`.
pub async fn require_role(
    directory: &dyn UserDirectory,
    user_id: Uuid,
    expected: UserRole,
    field: &'static str,
) -> Result<DirectoryUser, AvailabilityError> {
    let user = directory
        .find_user(user_id)
        .await?
        .ok_or_else(|| AvailabilityError::NotFound(format!("User {}", user_id)))?;

    if user.role != expected {
        return Err(AvailabilityError::InvalidRole {
            field,
            user_id,
            expected,
        });
    }

    Ok(user)
}

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<Uuid, DirectoryUser>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, user: DirectoryUser) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, id: Uuid) -> Result<Option<DirectoryUser>, StorageError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn user(role: UserRole) -> DirectoryUser {
        DirectoryUser {
            id: Uuid::new_v4(),
            email: "someone@clinic.test".to_string(),
            first_name: "Laura".to_string(),
            last_name: "Gómez".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn require_role_accepts_matching_user() {
        let directory = InMemoryUserDirectory::new();
        let professional = user(UserRole::Professional);
        directory.register(professional.clone()).await;

        let found = require_role(&directory, professional.id, UserRole::Professional, "professional_id")
            .await
            .unwrap();
        assert_eq!(found.full_name(), "Laura Gómez");
    }

    #[tokio::test]
    async fn require_role_rejects_wrong_role_and_unknown_id() {
        let directory = InMemoryUserDirectory::new();
        let patient = user(UserRole::Patient);
        directory.register(patient.clone()).await;

        let wrong = require_role(&directory, patient.id, UserRole::Professional, "professional_id").await;
        assert_matches!(wrong, Err(AvailabilityError::InvalidRole { field: "professional_id", .. }));

        let missing = require_role(&directory, Uuid::new_v4(), UserRole::Patient, "patient_id").await;
        assert_matches!(missing, Err(AvailabilityError::NotFound(_)));
    }
}
