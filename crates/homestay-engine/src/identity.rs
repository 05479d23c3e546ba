//! Identity store: user lookup for the dispatcher and the lifecycles.

use async_trait::async_trait;

use homestay_core::UserId;
use homestay_core::db::DatabaseError;
use homestay_core::domain::Role;

use crate::storage::{Database, User};

/// Read access to user accounts.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn resolve_user(&self, id: UserId) -> Result<User, DatabaseError>;

    async fn resolve_users_by_role(&self, role: Role) -> Result<Vec<User>, DatabaseError>;

    /// Moderators and administrators.
    async fn resolve_operators(&self) -> Result<Vec<User>, DatabaseError>;

    /// The given accounts; unknown IDs are skipped.
    async fn resolve_users(&self, ids: &[UserId]) -> Result<Vec<User>, DatabaseError>;
}

#[async_trait]
impl IdentityStore for Database {
    async fn resolve_user(&self, id: UserId) -> Result<User, DatabaseError> {
        self.get_user(id).await
    }

    async fn resolve_users_by_role(&self, role: Role) -> Result<Vec<User>, DatabaseError> {
        self.list_users_with_roles(&[role]).await
    }

    async fn resolve_operators(&self) -> Result<Vec<User>, DatabaseError> {
        self.list_users_with_roles(&[Role::Moderator, Role::Administrator])
            .await
    }

    async fn resolve_users(&self, ids: &[UserId]) -> Result<Vec<User>, DatabaseError> {
        self.list_users_by_ids(ids).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::NewUser;

    async fn store() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        for (username, role) in [
            ("cust", Role::Customer),
            ("mod", Role::Moderator),
            ("admin", Role::Administrator),
        ] {
            db.create_user(&NewUser {
                username: username.into(),
                email: format!("{username}@example.com"),
                first_name: username.into(),
                last_name: String::new(),
                title: String::new(),
                role,
            })
            .await
            .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn operators_are_moderators_and_administrators() {
        let db = store().await;
        let store: &dyn IdentityStore = &db;

        let mut operators: Vec<String> = store
            .resolve_operators()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        operators.sort();
        assert_eq!(operators, vec!["admin", "mod"]);

        let customers = store.resolve_users_by_role(Role::Customer).await.unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].email, "cust@example.com");
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let db = store().await;
        assert_eq!(db.resolve_user(1).await.unwrap().username, "cust");
        assert!(matches!(
            db.resolve_user(99).await,
            Err(DatabaseError::NotFound(_))
        ));
    }
}
