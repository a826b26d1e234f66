/// Organization model and database operations
///
/// An organization is the business that owns accounts, categories and
/// products. Account provisioning relies on a single organization with the
/// slug `default`, created on first use.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE organizations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     slug VARCHAR(100) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT organizations_slug_key UNIQUE (slug)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Organization (business/tenant) record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    /// Unique organization ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Unique lookup key
    pub slug: String,

    /// When the organization was created
    pub created_at: DateTime<Utc>,

    /// When the organization was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrganization {
    /// Display name
    pub name: String,

    /// Unique slug
    pub slug: String,
}

impl Organization {
    /// Finds an organization by its slug
    ///
    /// # Returns
    ///
    /// The organization if found, None otherwise
    pub async fn find_by_slug<'e, E>(executor: E, slug: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let organization = sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, name, slug, created_at, updated_at
            FROM organizations
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(executor)
        .await?;

        Ok(organization)
    }

    /// Returns the organization with `data.slug`, creating it if absent
    ///
    /// The insert is `ON CONFLICT (slug) DO NOTHING`, so concurrent callers
    /// racing on the same slug all end up with the single stored row. The
    /// existing row's name is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn get_or_create(pool: &PgPool, data: NewOrganization) -> Result<Self, sqlx::Error> {
        let slug = data.slug.clone();

        let inserted = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name, slug)
            VALUES ($1, $2)
            ON CONFLICT (slug) DO NOTHING
            RETURNING id, name, slug, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.slug)
        .fetch_optional(pool)
        .await?;

        if let Some(organization) = inserted {
            return Ok(organization);
        }

        // Lost the race (or the row already existed); a fresh statement sees
        // the committed row.
        Self::find_by_slug(pool, &slug)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }
}
