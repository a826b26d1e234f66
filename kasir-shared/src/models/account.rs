/// Account model and database operations
///
/// An account is the local user record bound to an identity issued by the
/// external authentication provider. The provider's subject id is the natural
/// key (`external_id`); accounts are created by the provisioning sequence and
/// never deleted by it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     external_id VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL DEFAULT '',
///     name VARCHAR(255),
///     role account_role NOT NULL DEFAULT 'admin',
///     organization_id UUID NOT NULL REFERENCES organizations(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT users_external_id_key UNIQUE (external_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use super::role::Role;

/// Local account bound to an external identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    /// Unique account ID
    pub id: Uuid,

    /// Subject id issued by the identity provider (unique)
    pub external_id: String,

    /// Email address; empty until the profile is filled in
    pub email: String,

    /// Optional display name
    pub name: Option<String>,

    /// Role the account was created with
    pub role: Role,

    /// Owning organization
    pub organization_id: Uuid,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    /// Identity provider subject id
    pub external_id: String,

    /// Email address (may be empty)
    pub email: String,

    /// Optional display name
    pub name: Option<String>,

    /// Account role
    pub role: Role,

    /// Owning organization
    pub organization_id: Uuid,
}

impl Account {
    /// Inserts a new account
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An account with the same `external_id` exists (unique violation)
    /// - The organization doesn't exist (foreign key violation)
    /// - Database connection fails
    pub async fn create<'e, E>(executor: E, data: NewAccount) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO users (external_id, email, name, role, organization_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, external_id, email, name, role, organization_id,
                      created_at, updated_at
            "#,
        )
        .bind(data.external_id)
        .bind(data.email)
        .bind(data.name)
        .bind(data.role)
        .bind(data.organization_id)
        .fetch_one(executor)
        .await?;

        Ok(account)
    }

    /// Finds an account by identity provider subject id
    pub async fn find_by_external_id<'e, E>(
        executor: E,
        external_id: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, external_id, email, name, role, organization_id,
                   created_at, updated_at
            FROM users
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(executor)
        .await?;

        Ok(account)
    }
}
