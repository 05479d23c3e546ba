//! User account queries.

use homestay_core::UserId;
use homestay_core::db::{DatabaseError, unix_timestamp};
use homestay_core::domain::{Activation, Role};

use super::db::Database;
use super::models::{NewUser, User};

impl Database {
    // =========================================================================
    // User queries
    // =========================================================================

    /// Create a new user account.
    pub async fn create_user(&self, user: &NewUser) -> Result<User, DatabaseError> {
        let now = unix_timestamp();

        let id = sqlx::query(
            "INSERT INTO users (username, email, first_name, last_name, title, role, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.title)
        .bind(user.role.as_str())
        .bind(now)
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        self.get_user(id).await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: UserId) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Move an account from `from` to `to` if it is still in `from`.
    ///
    /// Returns `None` when no row matched.
    pub async fn compare_and_set_user_activation(
        &self,
        id: UserId,
        from: Activation,
        to: Activation,
    ) -> Result<Option<User>, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let updated = sqlx::query("UPDATE users SET activation = ? WHERE id = ? AND activation = ?")
            .bind(to.as_str())
            .bind(id)
            .bind(from.as_str())
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(user))
    }

    /// Whether a username or email is already registered.
    pub async fn user_exists(&self, username: &str, email: &str) -> Result<bool, DatabaseError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE username = ? OR email = ? COLLATE NOCASE",
        )
        .bind(username)
        .bind(email)
        .fetch_one(self.pool())
        .await?;

        Ok(count > 0)
    }

    /// List all users, oldest first.
    pub async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
            .fetch_all(self.pool())
            .await?;

        Ok(users)
    }

    /// List users holding one of `roles`.
    pub async fn list_users_with_roles(&self, roles: &[Role]) -> Result<Vec<User>, DatabaseError> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT * FROM users WHERE role IN ({}) ORDER BY id",
            placeholders(roles.len())
        );
        let mut query = sqlx::query_as::<_, User>(&sql);
        for role in roles {
            query = query.bind(role.as_str());
        }

        Ok(query.fetch_all(self.pool()).await?)
    }

    /// Fetch the given users; unknown IDs are skipped.
    pub async fn list_users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT * FROM users WHERE id IN ({}) ORDER BY id",
            placeholders(ids.len())
        );
        let mut query = sqlx::query_as::<_, User>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        Ok(query.fetch_all(self.pool()).await?)
    }
}

/// `?, ?, ...` with `n` markers.
pub(super) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
