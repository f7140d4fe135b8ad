// ABOUTME: Consultation storage layer using SQLite
// ABOUTME: Status transitions out of scheduled are one-way and guarded in SQL

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use cartshift_core::new_entity_id;
use cartshift_storage::{parse_timestamp, StorageError};

use crate::types::{
    Consultation, ConsultationCreateInput, ConsultationFilter, ConsultationStatus,
    ConsultationType,
};

pub struct ConsultationStorage {
    pool: SqlitePool,
}

impl ConsultationStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_consultation(row: &SqliteRow) -> Result<Consultation, StorageError> {
        let type_str: String = row.try_get("consultation_type")?;
        let status_str: String = row.try_get("status")?;
        let scheduled_at: String = row.try_get("scheduled_at")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Consultation {
            id: row.try_get("id")?,
            org_id: row.try_get("org_id")?,
            consultation_type: ConsultationType::parse(&type_str).ok_or_else(|| {
                StorageError::InvalidValue(format!("consultation type '{}'", type_str))
            })?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            scheduled_at: parse_timestamp(&scheduled_at, "scheduled_at")?,
            duration: row.try_get("duration_minutes")?,
            status: ConsultationStatus::parse(&status_str).ok_or_else(|| {
                StorageError::InvalidValue(format!("consultation status '{}'", status_str))
            })?,
            external_calendar_link: row.try_get("external_calendar_link")?,
            meeting_notes: row.try_get("meeting_notes")?,
            created_by: row.try_get("created_by")?,
            created_at: parse_timestamp(&created_at, "created_at")?,
            updated_at: parse_timestamp(&updated_at, "updated_at")?,
        })
    }

    pub async fn create_consultation(
        &self,
        creator_id: &str,
        input: &ConsultationCreateInput,
        external_calendar_link: Option<String>,
    ) -> Result<Consultation, StorageError> {
        let id = new_entity_id();
        let now = Utc::now();

        debug!("Creating consultation {} for organization {}", id, input.org_id);

        sqlx::query(
            r#"
            INSERT INTO consultations (
                id, org_id, consultation_type, title, description, scheduled_at,
                duration_minutes, status, external_calendar_link, created_by,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 'scheduled', ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&input.org_id)
        .bind(input.consultation_type.as_str())
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(input.scheduled_at.to_rfc3339())
        .bind(input.duration)
        .bind(&external_calendar_link)
        .bind(creator_id)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get_consultation(&id).await?.ok_or(StorageError::NotFound)
    }

    pub async fn get_consultation(&self, id: &str) -> Result<Option<Consultation>, StorageError> {
        let row = sqlx::query("SELECT * FROM consultations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::row_to_consultation(&r)).transpose()
    }

    /// Consultations matching the filter, soonest first
    pub async fn list(&self, filter: &ConsultationFilter) -> Result<Vec<Consultation>, StorageError> {
        let mut query_str = String::from("SELECT * FROM consultations WHERE 1 = 1");
        if filter.org_id.is_some() {
            query_str.push_str(" AND org_id = ?");
        }
        if filter.status.is_some() {
            query_str.push_str(" AND status = ?");
        }
        query_str.push_str(" ORDER BY scheduled_at");

        let mut query = sqlx::query(&query_str);
        if let Some(ref org_id) = filter.org_id {
            query = query.bind(org_id);
        }
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut consultations = Vec::with_capacity(rows.len());
        for row in &rows {
            consultations.push(Self::row_to_consultation(row)?);
        }
        Ok(consultations)
    }

    /// One-way transition out of scheduled. Returns the rows affected; zero
    /// means the consultation was missing or already terminal.
    pub async fn transition_from_scheduled(
        &self,
        id: &str,
        to: ConsultationStatus,
        meeting_notes: Option<&str>,
    ) -> Result<u64, StorageError> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE consultations
            SET status = ?, meeting_notes = COALESCE(?, meeting_notes), updated_at = ?
            WHERE id = ? AND status = 'scheduled'
            "#,
        )
        .bind(to.as_str())
        .bind(meeting_notes)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
