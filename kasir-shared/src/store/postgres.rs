/// PostgreSQL record store
///
/// Thin adapter from the [`Store`] trait onto the model query functions. The
/// only multi-statement operation is
/// [`create_account_with_membership`](Store::create_account_with_membership),
/// which runs inside a transaction.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{AccountWriteError, Store, StoreResult};
use crate::db::pool::health_check;
use crate::models::{
    account::{Account, NewAccount},
    category::{Category, NewCategory, UpdateCategory},
    membership::{Membership, NewMembership},
    organization::{NewOrganization, Organization},
    product::{NewProduct, Product, ProductWithCategory, UpdateProduct},
};

/// [`Store`] backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps a connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }

    async fn find_account(&self, external_id: &str) -> StoreResult<Option<Account>> {
        Ok(Account::find_by_external_id(&self.pool, external_id).await?)
    }

    async fn find_organization_by_slug(&self, slug: &str) -> StoreResult<Option<Organization>> {
        Ok(Organization::find_by_slug(&self.pool, slug).await?)
    }

    async fn get_or_create_organization(&self, data: NewOrganization) -> StoreResult<Organization> {
        Ok(Organization::get_or_create(&self.pool, data).await?)
    }

    async fn create_account_with_membership(
        &self,
        data: NewAccount,
    ) -> Result<(Account, Membership), AccountWriteError> {
        let mut tx = self.pool.begin().await.map_err(AccountWriteError::account)?;

        let account = Account::create(&mut *tx, data)
            .await
            .map_err(AccountWriteError::account)?;
        let membership = Membership::create(
            &mut *tx,
            NewMembership {
                organization_id: account.organization_id,
                account_id: account.id,
                role: account.role,
            },
        )
        .await
        .map_err(AccountWriteError::membership)?;

        // Dropping `tx` on any error above rolls both inserts back.
        tx.commit().await.map_err(AccountWriteError::membership)?;

        debug!(
            account_id = %account.id,
            organization_id = %account.organization_id,
            "Committed account and membership"
        );

        Ok((account, membership))
    }

    async fn find_membership(
        &self,
        organization_id: Uuid,
        account_id: Uuid,
    ) -> StoreResult<Option<Membership>> {
        Ok(Membership::find(&self.pool, organization_id, account_id).await?)
    }

    async fn list_categories(&self, organization_id: Uuid) -> StoreResult<Vec<Category>> {
        Ok(Category::list(&self.pool, organization_id).await?)
    }

    async fn find_category(&self, organization_id: Uuid, id: Uuid) -> StoreResult<Option<Category>> {
        Ok(Category::find(&self.pool, organization_id, id).await?)
    }

    async fn create_category(&self, data: NewCategory) -> StoreResult<Category> {
        Ok(Category::create(&self.pool, data).await?)
    }

    async fn update_category(
        &self,
        organization_id: Uuid,
        id: Uuid,
        data: UpdateCategory,
    ) -> StoreResult<Option<Category>> {
        Ok(Category::update(&self.pool, organization_id, id, data).await?)
    }

    async fn delete_category(&self, organization_id: Uuid, id: Uuid) -> StoreResult<bool> {
        Ok(Category::delete(&self.pool, organization_id, id).await?)
    }

    async fn category_in_use(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Category::is_in_use(&self.pool, id).await?)
    }

    async fn list_products(&self, organization_id: Uuid) -> StoreResult<Vec<ProductWithCategory>> {
        Ok(Product::list(&self.pool, organization_id).await?)
    }

    async fn find_product(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> StoreResult<Option<ProductWithCategory>> {
        Ok(Product::find(&self.pool, organization_id, id).await?)
    }

    async fn create_product(&self, data: NewProduct) -> StoreResult<Product> {
        Ok(Product::create(&self.pool, data).await?)
    }

    async fn update_product(
        &self,
        organization_id: Uuid,
        id: Uuid,
        data: UpdateProduct,
    ) -> StoreResult<Option<Product>> {
        Ok(Product::update(&self.pool, organization_id, id, data).await?)
    }

    async fn delete_product(&self, organization_id: Uuid, id: Uuid) -> StoreResult<bool> {
        Ok(Product::delete(&self.pool, organization_id, id).await?)
    }
}
