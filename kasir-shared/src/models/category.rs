/// Category model and database operations
///
/// Categories group products on the menu. A category cannot be deleted while
/// any product still references it (`ON DELETE RESTRICT`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE categories (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     color VARCHAR(32),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Product category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,

    /// Display color, e.g. `#F59E0B`
    pub color: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

/// Partial update for a category
///
/// `None` leaves a field unchanged. For nullable columns `Some(None)` clears
/// the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<Option<String>>,
}

impl UpdateCategory {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.color.is_none()
    }

    /// Applies the update to an in-memory record
    pub fn apply_to(self, category: &mut Category) {
        if let Some(name) = self.name {
            category.name = name;
        }
        if let Some(description) = self.description {
            category.description = description;
        }
        if let Some(color) = self.color {
            category.color = color;
        }
    }
}

impl Category {
    /// Inserts a category
    pub async fn create<'e, E>(executor: E, data: NewCategory) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (organization_id, name, description, color)
            VALUES ($1, $2, $3, $4)
            RETURNING id, organization_id, name, description, color, created_at, updated_at
            "#,
        )
        .bind(data.organization_id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.color)
        .fetch_one(executor)
        .await?;

        Ok(category)
    }

    /// Finds a category by ID within an organization
    pub async fn find<'e, E>(
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, organization_id, name, description, color, created_at, updated_at
            FROM categories
            WHERE organization_id = $1 AND id = $2
            "#,
        )
        .bind(organization_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(category)
    }

    /// Lists an organization's categories ordered by name
    pub async fn list<'e, E>(executor: E, organization_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, organization_id, name, description, color, created_at, updated_at
            FROM categories
            WHERE organization_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(executor)
        .await?;

        Ok(categories)
    }

    /// Updates the provided fields of a category
    ///
    /// # Returns
    ///
    /// The updated category, or None if it doesn't exist in the organization
    pub async fn update<'e, E>(
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        data: UpdateCategory,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut query = String::from("UPDATE categories SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.color.is_some() {
            bind_count += 1;
            query.push_str(&format!(", color = ${}", bind_count));
        }

        query.push_str(
            " WHERE organization_id = $1 AND id = $2 \
             RETURNING id, organization_id, name, description, color, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Category>(&query)
            .bind(organization_id)
            .bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(color) = data.color {
            q = q.bind(color);
        }

        let category = q.fetch_optional(executor).await?;

        Ok(category)
    }

    /// Deletes a category
    ///
    /// # Returns
    ///
    /// True if a row was deleted
    ///
    /// # Errors
    ///
    /// Returns a foreign key violation if products still reference it
    pub async fn delete<'e, E>(executor: E, organization_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM categories WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Checks whether any product references the category
    pub async fn is_in_use<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let in_use: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM products WHERE category_id = $1)",
        )
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(in_use)
    }
}
