/// Membership model and database operations
///
/// A membership grants an account a [`Role`] within an organization. The
/// provisioning sequence writes exactly one membership per new account, in the
/// same transaction as the account itself.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE org_members (
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role account_role NOT NULL DEFAULT 'admin',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (organization_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use super::role::Role;

/// Account-organization relationship with role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// Organization ID
    pub organization_id: Uuid,

    /// Account ID
    #[sqlx(rename = "user_id")]
    pub account_id: Uuid,

    /// Role within the organization
    pub role: Role,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMembership {
    /// Organization ID
    pub organization_id: Uuid,

    /// Account ID
    pub account_id: Uuid,

    /// Role to assign
    #[serde(default)]
    pub role: Role,
}

impl Membership {
    /// Creates a membership
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The membership already exists (primary key violation)
    /// - The organization or account doesn't exist (foreign key violation)
    /// - Database connection fails
    pub async fn create<'e, E>(executor: E, data: NewMembership) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO org_members (organization_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING organization_id, user_id, role, created_at
            "#,
        )
        .bind(data.organization_id)
        .bind(data.account_id)
        .bind(data.role)
        .fetch_one(executor)
        .await?;

        Ok(membership)
    }

    /// Finds the membership of an account in an organization
    pub async fn find<'e, E>(
        executor: E,
        organization_id: Uuid,
        account_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT organization_id, user_id, role, created_at
            FROM org_members
            WHERE organization_id = $1 AND user_id = $2
            "#,
        )
        .bind(organization_id)
        .bind(account_id)
        .fetch_optional(executor)
        .await?;

        Ok(membership)
    }
}
