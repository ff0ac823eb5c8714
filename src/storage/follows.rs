use anyhow::Result;

use super::schema::Database;

impl Database {
    // ========================================================================
    // Follow Operations
    // ========================================================================

    /// Follow a feed. Returns `false` when the user already follows it
    /// (UNIQUE(user_id, feed_id) conflict, not an error).
    pub async fn create_follow(&self, user_id: i64, feed_id: i64) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO feed_follows (user_id, feed_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, feed_id) DO NOTHING
        "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stop following a feed. Returns `false` when no follow existed.
    pub async fn delete_follow(&self, user_id: i64, feed_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = ? AND feed_id = ?")
            .bind(user_id)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Names of the feeds a user follows, in follow order
    pub async fn following(&self, user_id: i64) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT f.name
            FROM feed_follows ff
            INNER JOIN feeds f ON ff.feed_id = f.id
            WHERE ff.user_id = ?
            ORDER BY ff.created_at, ff.id
        "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}
