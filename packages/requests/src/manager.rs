// ABOUTME: Request service layer with validation and real-time snapshots
// ABOUTME: Broadcasts the full per-organization request list after every mutation

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use cartshift_core::{Actor, ValidationError};
use cartshift_storage::StorageError;

use crate::storage::RequestStorage;
use crate::types::{Request, RequestCreateInput, RequestStatus};

/// Default capacity for snapshot broadcast channels
const DEFAULT_CHANNEL_CAPACITY: usize = 200;

/// Request service errors
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Validation errors: {0:?}")]
    Validation(Vec<ValidationError>),
    #[error("Request not found: {0}")]
    NotFound(String),
}

pub type RequestResult<T> = Result<T, RequestError>;

pub struct RequestManager {
    storage: Arc<RequestStorage>,
    /// Per-organization snapshot channels
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<Vec<Request>>>>>,
    channel_capacity: usize,
}

impl RequestManager {
    pub fn new(storage: Arc<RequestStorage>) -> Self {
        Self::with_capacity(storage, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(storage: Arc<RequestStorage>, channel_capacity: usize) -> Self {
        Self {
            storage,
            channels: Arc::new(RwLock::new(HashMap::new())),
            channel_capacity,
        }
    }

    /// Subscribe to the full request list of an organization. A fresh
    /// snapshot is delivered after every mutation touching that org;
    /// dropping the receiver unsubscribes.
    pub async fn subscribe(&self, org_id: &str) -> broadcast::Receiver<Vec<Request>> {
        self.channel(org_id).await.subscribe()
    }

    async fn channel(&self, org_id: &str) -> broadcast::Sender<Vec<Request>> {
        let mut channels = self.channels.write().await;
        channels
            .entry(org_id.to_string())
            .or_insert_with(|| broadcast::channel(self.channel_capacity).0)
            .clone()
    }

    /// Re-query and broadcast the organization's request list. Called after
    /// every local mutation, and by the pricing service when it links or
    /// unlinks requests.
    pub async fn refresh_org(&self, org_id: &str) -> RequestResult<()> {
        let tx = {
            let channels = self.channels.read().await;
            match channels.get(org_id) {
                Some(tx) => tx.clone(),
                None => return Ok(()),
            }
        };

        if tx.receiver_count() == 0 {
            return Ok(());
        }

        let snapshot = self.storage.list_for_org(org_id).await?;
        if tx.send(snapshot).is_err() {
            warn!("Failed to broadcast request snapshot for org {}", org_id);
        }
        Ok(())
    }

    pub async fn create(
        &self,
        org_id: &str,
        actor: &Actor,
        input: RequestCreateInput,
    ) -> RequestResult<Request> {
        let mut errors = Vec::new();
        if input.title.trim().is_empty() {
            errors.push(ValidationError::new("title", "Request title is required"));
        }
        if !errors.is_empty() {
            return Err(RequestError::Validation(errors));
        }

        let request = self
            .storage
            .create_request(org_id, &actor.user_id, &actor.user_name, input)
            .await?;

        info!("Created request '{}' with ID {}", request.title, request.id);

        self.refresh_org(org_id).await?;
        Ok(request)
    }

    pub async fn get(&self, id: &str) -> RequestResult<Option<Request>> {
        Ok(self.storage.get_request(id).await?)
    }

    pub async fn list_for_org(&self, org_id: &str) -> RequestResult<Vec<Request>> {
        Ok(self.storage.list_for_org(org_id).await?)
    }

    pub async fn list_eligible_for_pricing(&self, org_id: &str) -> RequestResult<Vec<Request>> {
        Ok(self.storage.list_eligible_for_pricing(org_id).await?)
    }

    /// Overwrite a request's status. The source system enforces no
    /// transition graph here and neither do we.
    pub async fn update_status(&self, id: &str, status: RequestStatus) -> RequestResult<Request> {
        let request = match self.storage.update_status(id, status).await {
            Ok(request) => request,
            Err(StorageError::NotFound) => return Err(RequestError::NotFound(id.to_string())),
            Err(e) => return Err(e.into()),
        };

        info!("Request {} status set to {}", id, status);

        self.refresh_org(&request.org_id).await?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestType;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    async fn test_manager() -> RequestManager {
        let pool = cartshift_storage::connect_in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO organizations (id, name, created_at, updated_at) VALUES ('org-1', 'Acme', ?, ?)",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .unwrap();
        RequestManager::new(Arc::new(RequestStorage::new(pool)))
    }

    fn input(title: &str) -> RequestCreateInput {
        RequestCreateInput {
            title: title.to_string(),
            description: String::new(),
            request_type: RequestType::Bug,
            priority: None,
            attachment_ids: None,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_empty_title() {
        let manager = test_manager().await;
        let actor = Actor::client("u1", "Noa");

        let result = manager.create("org-1", &actor, input("  ")).await;
        assert!(matches!(result, Err(RequestError::Validation(_))));
    }

    #[tokio::test]
    async fn test_subscribe_receives_snapshot_on_create() {
        let manager = test_manager().await;
        let actor = Actor::client("u1", "Noa");

        let mut rx = manager.subscribe("org-1").await;

        let created = manager.create("org-1", &actor, input("fix checkout")).await.unwrap();

        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, created.id);
    }

    #[tokio::test]
    async fn test_subscribe_receives_snapshot_on_status_change() {
        let manager = test_manager().await;
        let actor = Actor::client("u1", "Noa");
        let created = manager.create("org-1", &actor, input("fix checkout")).await.unwrap();

        let mut rx = manager.subscribe("org-1").await;
        manager
            .update_status(&created.id, RequestStatus::InProgress)
            .await
            .unwrap();

        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot[0].status, RequestStatus::InProgress);
    }

    #[tokio::test]
    async fn test_update_status_unknown_request() {
        let manager = test_manager().await;
        let result = manager.update_status("missing", RequestStatus::Closed).await;
        assert!(matches!(result, Err(RequestError::NotFound(_))));
    }
}
