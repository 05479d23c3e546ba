//! User registry.

use tracing::{info, instrument, warn};

use homestay_core::domain::{Activation, Role};
use homestay_core::lifecycle::Lifecycle;
use homestay_core::visibility::Transition;
use homestay_core::{Actor, UserId};

use crate::identity::IdentityStore;
use crate::storage::{Database, NewUser, User};

use super::{WorkflowError, active_account, count_transition, require};

/// Creates, reads, suspends, and reactivates user accounts.
#[derive(Debug, Clone)]
pub struct UserRegistry {
    db: Database,
}

impl UserRegistry {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Register an account. Username and email must both be unused.
    #[instrument(skip(self, user), fields(username = %user.username, role = %user.role))]
    pub async fn create_user(&self, user: &NewUser) -> Result<User, WorkflowError> {
        if user.username.trim().is_empty() {
            return Err(WorkflowError::Validation("username is required".into()));
        }
        if !user.email.contains('@') {
            return Err(WorkflowError::Validation(format!(
                "invalid email address: {}",
                user.email
            )));
        }
        if self.db.user_exists(&user.username, &user.email).await? {
            return Err(WorkflowError::Validation(
                "username or email already registered".into(),
            ));
        }

        let created = self.db.create_user(user).await?;
        info!(user_id = created.id, "User registered");
        Ok(created)
    }

    pub async fn get(&self, id: UserId) -> Result<User, WorkflowError> {
        Ok(self.db.get_user(id).await?)
    }

    /// Suspend an account. Nothing it owns is touched, and every operation it
    /// attempts fails with `PermissionDenied` until it is reactivated.
    #[instrument(skip(self), fields(admin_id = admin.id))]
    pub async fn suspend_user(&self, admin: &Actor, user_id: UserId) -> Result<User, WorkflowError> {
        require(admin, Transition::ManageAccounts)?;
        if admin.id == user_id {
            return Err(WorkflowError::Validation(
                "administrators cannot suspend themselves".into(),
            ));
        }
        let user = self.set_activation(admin, user_id, Activation::Inactive).await?;
        warn!(user_id, "Account suspended");
        Ok(user)
    }

    /// Reactivate a suspended account.
    #[instrument(skip(self), fields(admin_id = admin.id))]
    pub async fn activate_user(&self, admin: &Actor, user_id: UserId) -> Result<User, WorkflowError> {
        let user = self.set_activation(admin, user_id, Activation::Active).await?;
        info!(user_id, "Account reactivated");
        Ok(user)
    }

    /// Moderators and administrators, for addressing suggestion broadcasts.
    pub async fn operators(&self) -> Result<Vec<User>, WorkflowError> {
        Ok(self.db.resolve_operators().await?)
    }

    pub async fn list(&self) -> Result<Vec<User>, WorkflowError> {
        Ok(self.db.list_users().await?)
    }

    pub async fn list_by_role(&self, role: Role) -> Result<Vec<User>, WorkflowError> {
        Ok(self.db.list_users_with_roles(&[role]).await?)
    }

    async fn set_activation(
        &self,
        admin: &Actor,
        user_id: UserId,
        to: Activation,
    ) -> Result<User, WorkflowError> {
        require(admin, Transition::ManageAccounts)?;
        active_account(&self.db, admin).await?;

        let current = self.db.get_user(user_id).await?;
        let from = current.activation;
        from.transition(to)?;
        let user = self
            .db
            .compare_and_set_user_activation(user_id, from, to)
            .await?
            .ok_or_else(|| {
                WorkflowError::InvalidState(format!("account {user_id} changed concurrently"))
            })?;
        count_transition(Activation::ENTITY, user.activation.as_str());
        Ok(user)
    }
}
