/// Product model and database operations
///
/// Products are the sellable items on the menu. Reads return a
/// [`ProductWithCategory`], the product joined with its category's name.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE products (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     category_id UUID REFERENCES categories(id) ON DELETE RESTRICT,
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     price NUMERIC(12, 2) NOT NULL,
///     image_url VARCHAR(1024),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT products_price_positive CHECK (price > 0)
/// );
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Sellable product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,

    /// Unit price, two decimal places
    pub price: Decimal,

    pub image_url: Option<String>,

    /// Inactive products stay in the catalog but are hidden from the register
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product joined with its category name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductWithCategory {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub product: Product,

    /// Name of the referenced category, if any
    pub category_name: Option<String>,
}

/// Input for creating a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub organization_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_active: bool,
}

/// Partial update for a product
///
/// `None` leaves a field unchanged. For nullable columns `Some(None)` clears
/// the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub category_id: Option<Option<Uuid>>,
    pub image_url: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl UpdateProduct {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.category_id.is_none()
            && self.image_url.is_none()
            && self.is_active.is_none()
    }

    /// Applies the update to an in-memory record
    pub fn apply_to(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = category_id;
        }
        if let Some(image_url) = self.image_url {
            product.image_url = image_url;
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
    }
}

/// Decimal places kept by the `price` column
pub const PRICE_SCALE: u32 = 2;

/// Whole units the `price` column must stay below (`NUMERIC(12, 2)`)
pub const PRICE_LIMIT_UNITS: i64 = 10_000_000_000;

/// Describes why `price` can't be stored as given, if it can't
///
/// Mirrors `NUMERIC(12, 2)` with `CHECK (price > 0)`. Trailing zeros don't
/// count towards the scale, so `8000.500` is accepted.
pub fn price_problem(price: Decimal) -> Option<&'static str> {
    if price <= Decimal::ZERO {
        Some("Price must be greater than 0")
    } else if price.normalize().scale() > PRICE_SCALE {
        Some("Price must have at most 2 decimal places")
    } else if price >= Decimal::new(PRICE_LIMIT_UNITS, 0) {
        Some("Price must be less than 10000000000")
    } else {
        None
    }
}

const PRODUCT_COLUMNS: &str =
    "id, organization_id, category_id, name, description, price, image_url, is_active, created_at, updated_at";

const PRODUCT_WITH_CATEGORY_SELECT: &str = r#"
    SELECT p.id, p.organization_id, p.category_id, p.name, p.description, p.price,
           p.image_url, p.is_active, p.created_at, p.updated_at,
           c.name AS category_name
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

impl Product {
    /// Inserts a product
    ///
    /// # Errors
    ///
    /// Returns an error if the category doesn't exist (foreign key violation)
    /// or the price is not positive (check violation)
    pub async fn create<'e, E>(executor: E, data: NewProduct) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO products (organization_id, category_id, name, description, price, image_url, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {}",
            PRODUCT_COLUMNS
        );

        let product = sqlx::query_as::<_, Product>(&query)
            .bind(data.organization_id)
            .bind(data.category_id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.price)
            .bind(data.image_url)
            .bind(data.is_active)
            .fetch_one(executor)
            .await?;

        Ok(product)
    }

    /// Finds a product with its category name
    pub async fn find<'e, E>(
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ProductWithCategory>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "{} WHERE p.organization_id = $1 AND p.id = $2",
            PRODUCT_WITH_CATEGORY_SELECT
        );

        let product = sqlx::query_as::<_, ProductWithCategory>(&query)
            .bind(organization_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(product)
    }

    /// Lists an organization's products ordered by name
    pub async fn list<'e, E>(
        executor: E,
        organization_id: Uuid,
    ) -> Result<Vec<ProductWithCategory>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "{} WHERE p.organization_id = $1 ORDER BY p.name ASC",
            PRODUCT_WITH_CATEGORY_SELECT
        );

        let products = sqlx::query_as::<_, ProductWithCategory>(&query)
            .bind(organization_id)
            .fetch_all(executor)
            .await?;

        Ok(products)
    }

    /// Updates the provided fields of a product
    ///
    /// # Returns
    ///
    /// The updated product, or None if it doesn't exist in the organization
    pub async fn update<'e, E>(
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        data: UpdateProduct,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut query = String::from("UPDATE products SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.price.is_some() {
            bind_count += 1;
            query.push_str(&format!(", price = ${}", bind_count));
        }
        if data.category_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", category_id = ${}", bind_count));
        }
        if data.image_url.is_some() {
            bind_count += 1;
            query.push_str(&format!(", image_url = ${}", bind_count));
        }
        if data.is_active.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_active = ${}", bind_count));
        }

        query.push_str(" WHERE organization_id = $1 AND id = $2 RETURNING ");
        query.push_str(PRODUCT_COLUMNS);

        let mut q = sqlx::query_as::<_, Product>(&query)
            .bind(organization_id)
            .bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(price) = data.price {
            q = q.bind(price);
        }
        if let Some(category_id) = data.category_id {
            q = q.bind(category_id);
        }
        if let Some(image_url) = data.image_url {
            q = q.bind(image_url);
        }
        if let Some(is_active) = data.is_active {
            q = q.bind(is_active);
        }

        let product = q.fetch_optional(executor).await?;

        Ok(product)
    }

    /// Deletes a product
    ///
    /// # Returns
    ///
    /// True if a row was deleted
    pub async fn delete<'e, E>(executor: E, organization_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM products WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
