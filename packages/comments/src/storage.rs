// ABOUTME: Comment storage layer using SQLite
// ABOUTME: Append-only rows ordered by creation time, with a visibility filter

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use cartshift_core::new_entity_id;
use cartshift_storage::{parse_timestamp, StorageError};

use crate::types::{Comment, CommentVisibility};

pub struct CommentStorage {
    pool: SqlitePool,
}

impl CommentStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_comment(row: &SqliteRow) -> Result<Comment, StorageError> {
        let visibility_str: String = row.try_get("visibility")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Comment {
            id: row.try_get("id")?,
            request_id: row.try_get("request_id")?,
            org_id: row.try_get("org_id")?,
            user_id: row.try_get("user_id")?,
            user_name: row.try_get("user_name")?,
            content: row.try_get("content")?,
            visibility: CommentVisibility::parse(&visibility_str).unwrap_or_default(),
            created_at: parse_timestamp(&created_at, "created_at")?,
        })
    }

    pub async fn create_comment(
        &self,
        request_id: &str,
        org_id: &str,
        user_id: &str,
        user_name: &str,
        content: &str,
        visibility: CommentVisibility,
    ) -> Result<Comment, StorageError> {
        let id = new_entity_id();
        let now = Utc::now();

        debug!("Appending comment {} to request {}", id, request_id);

        sqlx::query(
            r#"
            INSERT INTO comments (id, request_id, org_id, user_id, user_name, content, visibility, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(request_id)
        .bind(org_id)
        .bind(user_id)
        .bind(user_name)
        .bind(content)
        .bind(visibility.as_str())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Comment {
            id,
            request_id: request_id.to_string(),
            org_id: org_id.to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            content: content.to_string(),
            visibility,
            created_at: now,
        })
    }

    /// Comments for a request, oldest first. When `include_agency_only` is
    /// false, agency-only rows are filtered out.
    pub async fn list_for_request(
        &self,
        request_id: &str,
        include_agency_only: bool,
    ) -> Result<Vec<Comment>, StorageError> {
        let rows = if include_agency_only {
            sqlx::query("SELECT * FROM comments WHERE request_id = ? ORDER BY created_at")
                .bind(request_id)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query(
                "SELECT * FROM comments WHERE request_id = ? AND visibility != 'agency-only' ORDER BY created_at",
            )
            .bind(request_id)
            .fetch_all(&self.pool)
            .await?
        };

        let mut comments = Vec::with_capacity(rows.len());
        for row in &rows {
            comments.push(Self::row_to_comment(row)?);
        }
        Ok(comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn seeded_storage() -> CommentStorage {
        let pool = cartshift_storage::connect_in_memory().await.unwrap();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO organizations (id, name, created_at, updated_at) VALUES ('org-1', 'Acme', ?, ?)",
        )
        .bind(&now)
        .bind(&now)
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            r#"
            INSERT INTO requests (
                id, org_id, title, description, request_type, priority, status,
                created_by_user_id, created_by_name, created_at, updated_at
            ) VALUES ('req-1', 'org-1', 'work', '', 'feature', 'normal', 'new', 'u1', 'Noa', ?, ?)
            "#,
        )
        .bind(&now)
        .bind(&now)
        .execute(&pool)
        .await
        .unwrap();
        CommentStorage::new(pool)
    }

    #[tokio::test]
    async fn test_comments_ordered_oldest_first() {
        let storage = seeded_storage().await;

        storage
            .create_comment("req-1", "org-1", "u1", "Noa", "first", CommentVisibility::Shared)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        storage
            .create_comment("req-1", "org-1", "u2", "Dana", "second", CommentVisibility::Shared)
            .await
            .unwrap();

        let comments = storage.list_for_request("req-1", true).await.unwrap();
        let contents: Vec<&str> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_agency_only_filtered_for_clients() {
        let storage = seeded_storage().await;

        storage
            .create_comment("req-1", "org-1", "u1", "Noa", "hello", CommentVisibility::Shared)
            .await
            .unwrap();
        storage
            .create_comment(
                "req-1",
                "org-1",
                "u2",
                "Dana",
                "internal note",
                CommentVisibility::AgencyOnly,
            )
            .await
            .unwrap();

        let all = storage.list_for_request("req-1", true).await.unwrap();
        assert_eq!(all.len(), 2);

        let shared_only = storage.list_for_request("req-1", false).await.unwrap();
        assert_eq!(shared_only.len(), 1);
        assert_eq!(shared_only[0].content, "hello");
    }
}
