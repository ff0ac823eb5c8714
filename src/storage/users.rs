use anyhow::Result;

use super::schema::Database;
use super::types::User;

impl Database {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a user. Fails if the name is already taken (UNIQUE constraint).
    pub async fn create_user(&self, name: &str) -> Result<User> {
        let now = chrono::Utc::now().timestamp();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, created_at)
            VALUES (?, ?)
            RETURNING id, name, created_at
        "#,
        )
        .bind(name)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Look up a user by name
    pub async fn user_by_name(&self, name: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, created_at FROM users WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// List all users, oldest first
    pub async fn all_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, name, created_at FROM users ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Delete every user. Feeds, follows, and posts go with them via
    /// ON DELETE CASCADE.
    pub async fn delete_all_users(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
