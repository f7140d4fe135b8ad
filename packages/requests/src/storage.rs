// ABOUTME: Request storage layer using SQLite
// ABOUTME: Handles CRUD, status overwrites and the pricing eligibility query

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use cartshift_core::new_entity_id;
use cartshift_storage::{parse_timestamp, StorageError};

use crate::types::{Request, RequestCreateInput, RequestPriority, RequestStatus, RequestType};

pub struct RequestStorage {
    pool: SqlitePool,
}

impl RequestStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) fn row_to_request(row: &SqliteRow) -> Result<Request, StorageError> {
        let type_str: String = row.try_get("request_type")?;
        let priority_str: String = row.try_get("priority")?;
        let status_str: String = row.try_get("status")?;
        let attachments_json: Option<String> = row.try_get("attachment_ids")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        let attachment_ids = match attachments_json {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };

        Ok(Request {
            id: row.try_get("id")?,
            org_id: row.try_get("org_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            request_type: RequestType::parse(&type_str)
                .ok_or_else(|| StorageError::InvalidValue(format!("request type '{}'", type_str)))?,
            priority: RequestPriority::parse(&priority_str).unwrap_or_default(),
            status: RequestStatus::parse(&status_str)
                .ok_or_else(|| StorageError::InvalidValue(format!("request status '{}'", status_str)))?,
            created_by_user_id: row.try_get("created_by_user_id")?,
            created_by_name: row.try_get("created_by_name")?,
            attachment_ids,
            pricing_offer_id: row.try_get("pricing_offer_id")?,
            created_at: parse_timestamp(&created_at, "created_at")?,
            updated_at: parse_timestamp(&updated_at, "updated_at")?,
        })
    }

    pub async fn create_request(
        &self,
        org_id: &str,
        author_id: &str,
        author_name: &str,
        input: RequestCreateInput,
    ) -> Result<Request, StorageError> {
        let id = new_entity_id();
        let now = Utc::now();
        let priority = input.priority.unwrap_or_default();
        let attachments_json = input
            .attachment_ids
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        debug!("Creating request {} for organization {}", id, org_id);

        sqlx::query(
            r#"
            INSERT INTO requests (
                id, org_id, title, description, request_type, priority, status,
                created_by_user_id, created_by_name, attachment_ids,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, 'new', ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(org_id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(input.request_type.as_str())
        .bind(priority.as_str())
        .bind(author_id)
        .bind(author_name)
        .bind(attachments_json)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get_request(&id).await?.ok_or(StorageError::NotFound)
    }

    pub async fn get_request(&self, id: &str) -> Result<Option<Request>, StorageError> {
        let row = sqlx::query("SELECT * FROM requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::row_to_request(&r)).transpose()
    }

    /// All requests for an organization, newest first
    pub async fn list_for_org(&self, org_id: &str) -> Result<Vec<Request>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM requests WHERE org_id = ? ORDER BY created_at DESC",
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            requests.push(Self::row_to_request(row)?);
        }
        Ok(requests)
    }

    /// Requests that can still be bundled into a pricing offer: not yet
    /// referenced by one, and not in a terminal status.
    pub async fn list_eligible_for_pricing(&self, org_id: &str) -> Result<Vec<Request>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM requests
            WHERE org_id = ?
              AND pricing_offer_id IS NULL
              AND status NOT IN ('paid', 'closed')
            ORDER BY created_at DESC
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            requests.push(Self::row_to_request(row)?);
        }
        Ok(requests)
    }

    /// Overwrite the status field. No transition graph is enforced.
    pub async fn update_status(
        &self,
        id: &str,
        status: RequestStatus,
    ) -> Result<Request, StorageError> {
        let now = Utc::now();

        let result = sqlx::query("UPDATE requests SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.get_request(id).await?.ok_or(StorageError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn seeded_pool() -> SqlitePool {
        let pool = cartshift_storage::connect_in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO organizations (id, name, created_at, updated_at) VALUES ('org-1', 'Acme', ?, ?)",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    fn input(title: &str) -> RequestCreateInput {
        RequestCreateInput {
            title: title.to_string(),
            description: "details".to_string(),
            request_type: RequestType::Feature,
            priority: None,
            attachment_ids: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_request() {
        let storage = RequestStorage::new(seeded_pool().await);

        let request = storage
            .create_request("org-1", "u1", "Noa", input("New landing page"))
            .await
            .unwrap();

        assert_eq!(request.status, RequestStatus::New);
        assert_eq!(request.priority, RequestPriority::Normal);
        assert_eq!(request.pricing_offer_id, None);

        let fetched = storage.get_request(&request.id).await.unwrap().unwrap();
        assert_eq!(fetched, request);
    }

    #[tokio::test]
    async fn test_list_for_org_newest_first() {
        let storage = RequestStorage::new(seeded_pool().await);

        let first = storage
            .create_request("org-1", "u1", "Noa", input("first"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = storage
            .create_request("org-1", "u1", "Noa", input("second"))
            .await
            .unwrap();

        let listed = storage.list_for_org("org-1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn test_update_status_overwrites() {
        let storage = RequestStorage::new(seeded_pool().await);
        let request = storage
            .create_request("org-1", "u1", "Noa", input("work"))
            .await
            .unwrap();

        // Any status may follow any other; jump straight to delivered
        let updated = storage
            .update_status(&request.id, RequestStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(updated.status, RequestStatus::Delivered);

        // And back again
        let reverted = storage
            .update_status(&request.id, RequestStatus::New)
            .await
            .unwrap();
        assert_eq!(reverted.status, RequestStatus::New);
    }

    #[tokio::test]
    async fn test_update_status_missing_request() {
        let storage = RequestStorage::new(seeded_pool().await);
        let result = storage.update_status("nope", RequestStatus::Closed).await;
        assert!(matches!(result, Err(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn test_eligible_excludes_linked_and_terminal() {
        let pool = seeded_pool().await;
        let storage = RequestStorage::new(pool.clone());

        let open = storage
            .create_request("org-1", "u1", "Noa", input("open"))
            .await
            .unwrap();
        let linked = storage
            .create_request("org-1", "u1", "Noa", input("linked"))
            .await
            .unwrap();
        let paid = storage
            .create_request("org-1", "u1", "Noa", input("paid"))
            .await
            .unwrap();

        sqlx::query("UPDATE requests SET pricing_offer_id = 'offer-1' WHERE id = ?")
            .bind(&linked.id)
            .execute(&pool)
            .await
            .unwrap();
        storage.update_status(&paid.id, RequestStatus::Paid).await.unwrap();

        let eligible = storage.list_eligible_for_pricing("org-1").await.unwrap();
        let ids: Vec<&str> = eligible.iter().map(|r| r.id.as_str()).collect();

        assert_eq!(ids, vec![open.id.as_str()]);
    }
}
