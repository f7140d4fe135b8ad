// ABOUTME: Organization, membership and invite storage using SQLite
// ABOUTME: Handles CRUD and the one-way invite lifecycle

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use sqlx::sqlite::SqliteRow;
use tracing::{debug, info};

use cartshift_core::new_entity_id;
use cartshift_storage::{parse_timestamp, StorageError};

use crate::error::OrganizationError;
use crate::types::{
    Invite, InviteCreateInput, InviteStatus, MemberRole, Organization, OrganizationCreateInput,
    OrganizationMember,
};

pub struct OrganizationStorage {
    pool: SqlitePool,
}

impl OrganizationStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_organization(row: &SqliteRow) -> Result<Organization, StorageError> {
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Organization {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            contact_email: row.try_get("contact_email")?,
            created_at: parse_timestamp(&created_at, "created_at")?,
            updated_at: parse_timestamp(&updated_at, "updated_at")?,
        })
    }

    fn row_to_member(row: &SqliteRow) -> Result<OrganizationMember, StorageError> {
        let role_str: String = row.try_get("role")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(OrganizationMember {
            id: row.try_get("id")?,
            org_id: row.try_get("org_id")?,
            user_id: row.try_get("user_id")?,
            user_name: row.try_get("user_name")?,
            role: MemberRole::parse(&role_str).unwrap_or_default(),
            created_at: parse_timestamp(&created_at, "created_at")?,
        })
    }

    fn row_to_invite(row: &SqliteRow) -> Result<Invite, StorageError> {
        let role_str: String = row.try_get("role")?;
        let status_str: String = row.try_get("status")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Invite {
            id: row.try_get("id")?,
            org_id: row.try_get("org_id")?,
            email: row.try_get("email")?,
            role: MemberRole::parse(&role_str).unwrap_or_default(),
            status: InviteStatus::parse(&status_str)
                .ok_or_else(|| StorageError::InvalidValue(format!("invite status '{}'", status_str)))?,
            created_at: parse_timestamp(&created_at, "created_at")?,
        })
    }

    pub async fn create_organization(
        &self,
        input: OrganizationCreateInput,
    ) -> Result<Organization, OrganizationError> {
        if input.name.trim().is_empty() {
            return Err(OrganizationError::validation("name", "Organization name is required"));
        }

        let id = new_entity_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO organizations (id, name, contact_email, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(input.name.trim())
        .bind(&input.contact_email)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        info!("Created organization '{}' with ID {}", input.name.trim(), id);

        self.get_organization(&id)
            .await?
            .ok_or(OrganizationError::Storage(StorageError::NotFound))
    }

    pub async fn get_organization(
        &self,
        id: &str,
    ) -> Result<Option<Organization>, OrganizationError> {
        let row = sqlx::query("SELECT * FROM organizations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        row.map(|r| Self::row_to_organization(&r))
            .transpose()
            .map_err(OrganizationError::Storage)
    }

    pub async fn list_organizations(&self) -> Result<Vec<Organization>, OrganizationError> {
        let rows = sqlx::query("SELECT * FROM organizations ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        let mut organizations = Vec::with_capacity(rows.len());
        for row in &rows {
            organizations.push(Self::row_to_organization(row)?);
        }
        debug!("Retrieved {} organizations", organizations.len());
        Ok(organizations)
    }

    pub async fn add_member(
        &self,
        org_id: &str,
        user_id: &str,
        user_name: &str,
        role: MemberRole,
    ) -> Result<OrganizationMember, OrganizationError> {
        let id = new_entity_id();
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO organization_members (id, org_id, user_id, user_name, role, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(org_id)
        .bind(user_id)
        .bind(user_name)
        .bind(role.as_str())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(OrganizationError::DuplicateMember {
                    org_id: org_id.to_string(),
                    user_id: user_id.to_string(),
                });
            }
            Err(e) => return Err(OrganizationError::Storage(StorageError::Sqlx(e))),
        }

        info!("Added member {} to organization {}", user_id, org_id);

        Ok(OrganizationMember {
            id,
            org_id: org_id.to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            role,
            created_at: now,
        })
    }

    pub async fn list_members(
        &self,
        org_id: &str,
    ) -> Result<Vec<OrganizationMember>, OrganizationError> {
        let rows = sqlx::query(
            "SELECT * FROM organization_members WHERE org_id = ? ORDER BY created_at",
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        let mut members = Vec::with_capacity(rows.len());
        for row in &rows {
            members.push(Self::row_to_member(row)?);
        }
        Ok(members)
    }

    pub async fn remove_member(&self, org_id: &str, user_id: &str) -> Result<bool, OrganizationError> {
        let result = sqlx::query(
            "DELETE FROM organization_members WHERE org_id = ? AND user_id = ?",
        )
        .bind(org_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn create_invite(
        &self,
        org_id: &str,
        input: InviteCreateInput,
    ) -> Result<Invite, OrganizationError> {
        if input.email.trim().is_empty() {
            return Err(OrganizationError::validation("email", "Invite email is required"));
        }

        let id = new_entity_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO invites (id, org_id, email, role, status, created_at)
            VALUES (?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(&id)
        .bind(org_id)
        .bind(input.email.trim())
        .bind(input.role.as_str())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        info!("Created invite {} for {} in organization {}", id, input.email.trim(), org_id);

        Ok(Invite {
            id,
            org_id: org_id.to_string(),
            email: input.email.trim().to_string(),
            role: input.role,
            status: InviteStatus::Pending,
            created_at: now,
        })
    }

    pub async fn get_invite(&self, id: &str) -> Result<Option<Invite>, OrganizationError> {
        let row = sqlx::query("SELECT * FROM invites WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        row.map(|r| Self::row_to_invite(&r))
            .transpose()
            .map_err(OrganizationError::Storage)
    }

    pub async fn list_invites(&self, org_id: &str) -> Result<Vec<Invite>, OrganizationError> {
        let rows = sqlx::query("SELECT * FROM invites WHERE org_id = ? ORDER BY created_at DESC")
            .bind(org_id)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        let mut invites = Vec::with_capacity(rows.len());
        for row in &rows {
            invites.push(Self::row_to_invite(row)?);
        }
        Ok(invites)
    }

    /// Accept a pending invite: marks it accepted and creates the membership
    /// in one transaction.
    pub async fn accept_invite(
        &self,
        invite_id: &str,
        user_id: &str,
        user_name: &str,
    ) -> Result<OrganizationMember, OrganizationError> {
        let invite = self
            .get_invite(invite_id)
            .await?
            .ok_or_else(|| OrganizationError::NotFound(invite_id.to_string()))?;

        if invite.status != InviteStatus::Pending {
            return Err(OrganizationError::InviteNotPending(invite.status));
        }

        let member_id = new_entity_id();
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;

        // Guard against a concurrent accept: the status predicate makes the
        // transition one-way even if two calls race.
        let updated = sqlx::query(
            "UPDATE invites SET status = 'accepted' WHERE id = ? AND status = 'pending'",
        )
        .bind(invite_id)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Sqlx)?;

        if updated.rows_affected() == 0 {
            return Err(OrganizationError::InviteNotPending(invite.status));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO organization_members (id, org_id, user_id, user_name, role, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&member_id)
        .bind(&invite.org_id)
        .bind(user_id)
        .bind(user_name)
        .bind(invite.role.as_str())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(OrganizationError::DuplicateMember {
                    org_id: invite.org_id.clone(),
                    user_id: user_id.to_string(),
                });
            }
            Err(e) => return Err(OrganizationError::Storage(StorageError::Sqlx(e))),
        }

        tx.commit().await.map_err(StorageError::Sqlx)?;

        info!("Invite {} accepted by {}", invite_id, user_id);

        Ok(OrganizationMember {
            id: member_id,
            org_id: invite.org_id,
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            role: invite.role,
            created_at: now,
        })
    }

    /// Revoke a pending invite. One-way; fails on accepted or revoked invites.
    pub async fn revoke_invite(&self, invite_id: &str) -> Result<Invite, OrganizationError> {
        let invite = self
            .get_invite(invite_id)
            .await?
            .ok_or_else(|| OrganizationError::NotFound(invite_id.to_string()))?;

        if invite.status != InviteStatus::Pending {
            return Err(OrganizationError::InviteNotPending(invite.status));
        }

        sqlx::query("UPDATE invites SET status = 'revoked' WHERE id = ? AND status = 'pending'")
            .bind(invite_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        info!("Invite {} revoked", invite_id);

        Ok(Invite {
            status: InviteStatus::Revoked,
            ..invite
        })
    }
}
