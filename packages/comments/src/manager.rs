// ABOUTME: Comment service layer with per-request snapshot broadcasting
// ABOUTME: Visibility filtering for client subscribers happens at delivery, not storage

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::warn;

use cartshift_core::{Actor, ValidationError};
use cartshift_storage::StorageError;

use crate::storage::CommentStorage;
use crate::types::{Comment, CommentCreateInput, CommentVisibility};

const DEFAULT_CHANNEL_CAPACITY: usize = 200;

/// Comment service errors
#[derive(Error, Debug)]
pub enum CommentError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Validation errors: {0:?}")]
    Validation(Vec<ValidationError>),
}

pub type CommentResult<T> = Result<T, CommentError>;

pub struct CommentManager {
    storage: Arc<CommentStorage>,
    /// Per-request snapshot channels. Snapshots carry every comment; the
    /// consumer applies the visibility filter for client-role subscribers.
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<Vec<Comment>>>>>,
    channel_capacity: usize,
}

impl CommentManager {
    pub fn new(storage: Arc<CommentStorage>) -> Self {
        Self::with_capacity(storage, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(storage: Arc<CommentStorage>, channel_capacity: usize) -> Self {
        Self {
            storage,
            channels: Arc::new(RwLock::new(HashMap::new())),
            channel_capacity,
        }
    }

    pub async fn subscribe(&self, request_id: &str) -> broadcast::Receiver<Vec<Comment>> {
        let mut channels = self.channels.write().await;
        channels
            .entry(request_id.to_string())
            .or_insert_with(|| broadcast::channel(self.channel_capacity).0)
            .subscribe()
    }

    async fn broadcast_request(&self, request_id: &str) -> CommentResult<()> {
        let tx = {
            let channels = self.channels.read().await;
            match channels.get(request_id) {
                Some(tx) => tx.clone(),
                None => return Ok(()),
            }
        };

        if tx.receiver_count() == 0 {
            return Ok(());
        }

        let snapshot = self.storage.list_for_request(request_id, true).await?;
        if tx.send(snapshot).is_err() {
            warn!("Failed to broadcast comment snapshot for request {}", request_id);
        }
        Ok(())
    }

    /// Append a comment. The only validation is non-empty content.
    pub async fn create(
        &self,
        request_id: &str,
        org_id: &str,
        actor: &Actor,
        input: CommentCreateInput,
    ) -> CommentResult<Comment> {
        if input.content.trim().is_empty() {
            return Err(CommentError::Validation(vec![ValidationError::new(
                "content",
                "Comment content is required",
            )]));
        }

        let comment = self
            .storage
            .create_comment(
                request_id,
                org_id,
                &actor.user_id,
                &actor.user_name,
                input.content.trim(),
                input.visibility,
            )
            .await?;

        self.broadcast_request(request_id).await?;
        Ok(comment)
    }

    pub async fn list_for_request(
        &self,
        request_id: &str,
        include_agency_only: bool,
    ) -> CommentResult<Vec<Comment>> {
        Ok(self
            .storage
            .list_for_request(request_id, include_agency_only)
            .await?)
    }
}

/// Strip agency-only comments from a snapshot before delivering it to a
/// client-role subscriber.
pub fn visible_to_client(comments: &[Comment]) -> Vec<Comment> {
    comments
        .iter()
        .filter(|c| c.visibility != CommentVisibility::AgencyOnly)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    async fn test_manager() -> CommentManager {
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
        CommentManager::new(Arc::new(CommentStorage::new(pool)))
    }

    #[tokio::test]
    async fn test_create_rejects_empty_content() {
        let manager = test_manager().await;
        let actor = Actor::client("u1", "Noa");

        let result = manager
            .create(
                "req-1",
                "org-1",
                &actor,
                CommentCreateInput {
                    content: "   ".to_string(),
                    visibility: CommentVisibility::Shared,
                },
            )
            .await;
        assert!(matches!(result, Err(CommentError::Validation(_))));
    }

    #[tokio::test]
    async fn test_subscribe_receives_full_thread() {
        let manager = test_manager().await;
        let actor = Actor::agency("u2", "Dana");

        let mut rx = manager.subscribe("req-1").await;

        manager
            .create(
                "req-1",
                "org-1",
                &actor,
                CommentCreateInput {
                    content: "looking into it".to_string(),
                    visibility: CommentVisibility::AgencyOnly,
                },
            )
            .await
            .unwrap();

        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);

        // Client delivery drops the agency-only comment
        assert!(visible_to_client(&snapshot).is_empty());
    }
}
