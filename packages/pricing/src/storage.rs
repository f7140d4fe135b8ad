// ABOUTME: Pricing offer storage layer using SQLite
// ABOUTME: Offer writes and request link/unlink writes share one transaction

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use cartshift_core::{new_entity_id, Currency};
use cartshift_requests::RequestStatus;
use cartshift_storage::{parse_timestamp, StorageError};

use crate::error::{PricingError, PricingResult};
use crate::types::{
    total_amount, LineItem, PricingOffer, PricingOfferCreateInput, PricingOfferStatus,
    PricingOfferUpdateInput,
};

pub struct PricingOfferStorage {
    pool: SqlitePool,
}

impl PricingOfferStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_offer(row: &SqliteRow) -> Result<PricingOffer, StorageError> {
        let line_items_json: String = row.try_get("line_items")?;
        let request_ids_json: String = row.try_get("request_ids")?;
        let currency_str: String = row.try_get("currency")?;
        let status_str: String = row.try_get("status")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;
        let valid_until: Option<String> = row.try_get("valid_until")?;
        let sent_at: Option<String> = row.try_get("sent_at")?;

        Ok(PricingOffer {
            id: row.try_get("id")?,
            org_id: row.try_get("org_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            line_items: serde_json::from_str(&line_items_json)?,
            currency: Currency::parse(&currency_str)
                .ok_or_else(|| StorageError::InvalidValue(format!("currency '{}'", currency_str)))?,
            total_amount: row.try_get("total_amount")?,
            status: PricingOfferStatus::parse(&status_str)
                .ok_or_else(|| StorageError::InvalidValue(format!("offer status '{}'", status_str)))?,
            request_ids: serde_json::from_str(&request_ids_json)?,
            client_name: row.try_get("client_name")?,
            client_email: row.try_get("client_email")?,
            valid_until: valid_until
                .map(|v| parse_timestamp(&v, "valid_until"))
                .transpose()?,
            agency_notes: row.try_get("agency_notes")?,
            created_by: row.try_get("created_by")?,
            created_by_name: row.try_get("created_by_name")?,
            created_at: parse_timestamp(&created_at, "created_at")?,
            updated_at: parse_timestamp(&updated_at, "updated_at")?,
            sent_at: sent_at.map(|v| parse_timestamp(&v, "sent_at")).transpose()?,
        })
    }

    /// Check every bundled request inside the transaction, before any write:
    /// it must exist, belong to the offer's organization, not be linked to
    /// another offer, and not be in a terminal status.
    async fn validate_bundle(
        tx: &mut Transaction<'_, Sqlite>,
        org_id: &str,
        request_ids: &[String],
        current_offer_id: Option<&str>,
    ) -> PricingResult<()> {
        for request_id in request_ids {
            let row = sqlx::query(
                "SELECT org_id, status, pricing_offer_id FROM requests WHERE id = ?",
            )
            .bind(request_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(StorageError::Sqlx)?;

            let row = row.ok_or_else(|| PricingError::UnknownRequest(request_id.clone()))?;

            let request_org: String = row.try_get("org_id").map_err(StorageError::Sqlx)?;
            if request_org != org_id {
                return Err(PricingError::CrossOrgRequest {
                    request_id: request_id.clone(),
                });
            }

            let linked_offer: Option<String> =
                row.try_get("pricing_offer_id").map_err(StorageError::Sqlx)?;
            if let Some(linked) = linked_offer {
                if current_offer_id != Some(linked.as_str()) {
                    return Err(PricingError::RequestNotEligible(request_id.clone()));
                }
            }

            let status_str: String = row.try_get("status").map_err(StorageError::Sqlx)?;
            let status = RequestStatus::parse(&status_str).ok_or_else(|| {
                StorageError::InvalidValue(format!("request status '{}'", status_str))
            })?;
            if status.is_terminal() {
                return Err(PricingError::RequestNotEligible(request_id.clone()));
            }
        }
        Ok(())
    }

    async fn link_requests(
        tx: &mut Transaction<'_, Sqlite>,
        offer_id: &str,
        request_ids: &[String],
    ) -> Result<(), StorageError> {
        let now = Utc::now().to_rfc3339();
        for request_id in request_ids {
            sqlx::query("UPDATE requests SET pricing_offer_id = ?, updated_at = ? WHERE id = ?")
                .bind(offer_id)
                .bind(&now)
                .bind(request_id)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    async fn unlink_requests(
        tx: &mut Transaction<'_, Sqlite>,
        request_ids: &[String],
    ) -> Result<(), StorageError> {
        let now = Utc::now().to_rfc3339();
        for request_id in request_ids {
            sqlx::query("UPDATE requests SET pricing_offer_id = NULL, updated_at = ? WHERE id = ?")
                .bind(&now)
                .bind(request_id)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    pub async fn create_offer(
        &self,
        org_id: &str,
        creator_id: &str,
        creator_name: &str,
        input: PricingOfferCreateInput,
    ) -> PricingResult<PricingOffer> {
        let id = new_entity_id();
        let now = Utc::now();
        let request_ids = input.request_ids.unwrap_or_default();

        let line_items: Vec<LineItem> = input
            .line_items
            .into_iter()
            .map(|item| LineItem {
                id: new_entity_id(),
                description: item.description,
                quantity: item.quantity,
                unit_price: item.unit_price,
                notes: item.notes,
            })
            .collect();
        let total = total_amount(&line_items);

        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;

        Self::validate_bundle(&mut tx, org_id, &request_ids, None).await?;

        sqlx::query(
            r#"
            INSERT INTO pricing_offers (
                id, org_id, title, description, line_items, currency, total_amount,
                status, request_ids, client_name, client_email, valid_until,
                agency_notes, created_by, created_by_name, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 'draft', ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(org_id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(serde_json::to_string(&line_items).map_err(StorageError::Json)?)
        .bind(input.currency.as_str())
        .bind(total)
        .bind(serde_json::to_string(&request_ids).map_err(StorageError::Json)?)
        .bind(&input.client_name)
        .bind(&input.client_email)
        .bind(input.valid_until.map(|v| v.to_rfc3339()))
        .bind(&input.agency_notes)
        .bind(creator_id)
        .bind(creator_name)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Sqlx)?;

        Self::link_requests(&mut tx, &id, &request_ids).await?;

        tx.commit().await.map_err(StorageError::Sqlx)?;

        info!("Created pricing offer {} for organization {}", id, org_id);

        self.get_offer(&id)
            .await?
            .ok_or(PricingError::Storage(StorageError::NotFound))
    }

    pub async fn get_offer(&self, id: &str) -> PricingResult<Option<PricingOffer>> {
        let row = sqlx::query("SELECT * FROM pricing_offers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        row.map(|r| Self::row_to_offer(&r))
            .transpose()
            .map_err(PricingError::Storage)
    }

    pub async fn list_all(&self) -> PricingResult<Vec<PricingOffer>> {
        let rows = sqlx::query("SELECT * FROM pricing_offers ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        let mut offers = Vec::with_capacity(rows.len());
        for row in &rows {
            offers.push(Self::row_to_offer(row)?);
        }
        debug!("Retrieved {} pricing offers", offers.len());
        Ok(offers)
    }

    pub async fn list_for_org(
        &self,
        org_id: &str,
        exclude_drafts: bool,
    ) -> PricingResult<Vec<PricingOffer>> {
        let rows = if exclude_drafts {
            sqlx::query(
                "SELECT * FROM pricing_offers WHERE org_id = ? AND status != 'draft' ORDER BY created_at DESC",
            )
            .bind(org_id)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?
        } else {
            sqlx::query("SELECT * FROM pricing_offers WHERE org_id = ? ORDER BY created_at DESC")
                .bind(org_id)
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::Sqlx)?
        };

        let mut offers = Vec::with_capacity(rows.len());
        for row in &rows {
            offers.push(Self::row_to_offer(row)?);
        }
        Ok(offers)
    }

    /// Apply a partial update. Allowed only while the offer is draft or
    /// sent; the total is recomputed whenever line items change and the
    /// request bundle is re-validated and relinked when it changes.
    pub async fn update_offer(
        &self,
        id: &str,
        input: PricingOfferUpdateInput,
    ) -> PricingResult<PricingOffer> {
        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;

        let row = sqlx::query("SELECT * FROM pricing_offers WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(StorageError::Sqlx)?;
        let current = match row {
            Some(ref r) => Self::row_to_offer(r)?,
            None => return Err(PricingError::NotFound(id.to_string())),
        };

        if !current.status.is_editable() {
            return Err(PricingError::NotEditable(current.status));
        }

        let line_items = match input.line_items {
            Some(items) => items
                .into_iter()
                .map(|item| LineItem {
                    id: new_entity_id(),
                    description: item.description,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    notes: item.notes,
                })
                .collect(),
            None => current.line_items.clone(),
        };
        let total = total_amount(&line_items);

        let request_ids = match input.request_ids {
            Some(new_ids) => {
                Self::validate_bundle(&mut tx, &current.org_id, &new_ids, Some(id)).await?;

                let removed: Vec<String> = current
                    .request_ids
                    .iter()
                    .filter(|old| !new_ids.contains(old))
                    .cloned()
                    .collect();
                Self::unlink_requests(&mut tx, &removed).await?;
                Self::link_requests(&mut tx, id, &new_ids).await?;
                new_ids
            }
            None => current.request_ids.clone(),
        };

        let now = Utc::now();
        let title = match input.title {
            Some(ref new_title) => new_title.trim().to_string(),
            None => current.title.clone(),
        };

        sqlx::query(
            r#"
            UPDATE pricing_offers SET
                title = ?, description = ?, line_items = ?, currency = ?,
                total_amount = ?, request_ids = ?, client_name = ?,
                client_email = ?, valid_until = ?, agency_notes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&title)
        .bind(input.description.or(current.description))
        .bind(serde_json::to_string(&line_items).map_err(StorageError::Json)?)
        .bind(input.currency.unwrap_or(current.currency).as_str())
        .bind(total)
        .bind(serde_json::to_string(&request_ids).map_err(StorageError::Json)?)
        .bind(input.client_name.or(current.client_name))
        .bind(input.client_email.or(current.client_email))
        .bind(
            input
                .valid_until
                .or(current.valid_until)
                .map(|v| v.to_rfc3339()),
        )
        .bind(input.agency_notes.or(current.agency_notes))
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Sqlx)?;

        tx.commit().await.map_err(StorageError::Sqlx)?;

        info!("Updated pricing offer {}", id);

        self.get_offer(id)
            .await?
            .ok_or(PricingError::Storage(StorageError::NotFound))
    }

    /// Draft → sent, stamping sent_at. Irreversible through normal flow.
    pub async fn send_offer(&self, id: &str) -> PricingResult<PricingOffer> {
        let current = self
            .get_offer(id)
            .await?
            .ok_or_else(|| PricingError::NotFound(id.to_string()))?;

        if current.status != PricingOfferStatus::Draft {
            return Err(PricingError::NotDraft(current.status));
        }

        let now = Utc::now();

        // Status predicate guards against a concurrent send
        let result = sqlx::query(
            "UPDATE pricing_offers SET status = 'sent', sent_at = ?, updated_at = ? WHERE id = ? AND status = 'draft'",
        )
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(PricingError::NotDraft(current.status));
        }

        info!("Pricing offer {} sent", id);

        self.get_offer(id)
            .await?
            .ok_or(PricingError::Storage(StorageError::NotFound))
    }

    /// Overwrite the status field (external accepted/paid/declined marking)
    pub async fn update_status(
        &self,
        id: &str,
        status: PricingOfferStatus,
    ) -> PricingResult<PricingOffer> {
        let now = Utc::now();

        let result = sqlx::query("UPDATE pricing_offers SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(PricingError::NotFound(id.to_string()));
        }

        self.get_offer(id)
            .await?
            .ok_or(PricingError::Storage(StorageError::NotFound))
    }

    /// Hard delete; bundled requests are unlinked in the same transaction
    pub async fn delete_offer(&self, id: &str) -> PricingResult<bool> {
        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;

        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE requests SET pricing_offer_id = NULL, updated_at = ? WHERE pricing_offer_id = ?")
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::Sqlx)?;

        let result = sqlx::query("DELETE FROM pricing_offers WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::Sqlx)?;

        tx.commit().await.map_err(StorageError::Sqlx)?;

        if result.rows_affected() > 0 {
            info!("Deleted pricing offer {}", id);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
