/// In-process record store
///
/// Mirrors the constraints of the PostgreSQL schema (unique slug, unique
/// external id, category foreign keys, positive price) so that code written
/// against [`Store`] behaves the same on both. Every operation holds a single
/// lock for its whole duration, which makes the compound writes atomic.
///
/// Failures can be injected per write kind with [`MemoryStore::fail_next`].
/// An injected failure fires once and is then cleared.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashSet;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AccountWriteError, Store, StoreError, StoreResult};
use crate::models::{
    account::{Account, NewAccount},
    category::{Category, NewCategory, UpdateCategory},
    membership::Membership,
    organization::{NewOrganization, Organization},
    product::{NewProduct, Product, ProductWithCategory, UpdateProduct},
};

/// Operation kinds that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// Account lookups by external id
    AccountLookup,
    /// Organization lookups by slug
    OrganizationLookup,
    /// Organization get-or-create
    OrganizationWrite,
    /// The account half of account + membership creation
    AccountWrite,
    /// The membership half of account + membership creation
    MembershipWrite,
}

#[derive(Debug, Default)]
struct State {
    organizations: Vec<Organization>,
    accounts: Vec<Account>,
    memberships: Vec<Membership>,
    categories: Vec<Category>,
    products: Vec<Product>,
    failures: HashSet<FailPoint>,
}

impl State {
    fn trip(&mut self, point: FailPoint) -> StoreResult<()> {
        if self.failures.remove(&point) {
            return Err(StoreError::Backend(format!("injected failure: {:?}", point)));
        }
        Ok(())
    }

    fn with_category_name(&self, product: &Product) -> ProductWithCategory {
        let category_name = product.category_id.and_then(|category_id| {
            self.categories
                .iter()
                .find(|c| c.id == category_id)
                .map(|c| c.name.clone())
        });

        ProductWithCategory {
            product: product.clone(),
            category_name,
        }
    }

    fn check_category(&self, organization_id: Uuid, category_id: Option<Uuid>) -> StoreResult<()> {
        match category_id {
            Some(id)
                if !self
                    .categories
                    .iter()
                    .any(|c| c.id == id && c.organization_id == organization_id) =>
            {
                Err(StoreError::ForeignKey("products_category_id_fkey".to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn check_price(price: Decimal) -> StoreResult<()> {
    if price <= Decimal::ZERO {
        return Err(StoreError::Invalid("products_price_positive".to_string()));
    }
    Ok(())
}

/// [`Store`] kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next operation of the given kind fail with a backend error
    pub async fn fail_next(&self, point: FailPoint) {
        self.state.lock().await.failures.insert(point);
    }

    pub async fn organization_count(&self) -> usize {
        self.state.lock().await.organizations.len()
    }

    pub async fn account_count(&self) -> usize {
        self.state.lock().await.accounts.len()
    }

    pub async fn membership_count(&self) -> usize {
        self.state.lock().await.memberships.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_account(&self, external_id: &str) -> StoreResult<Option<Account>> {
        let mut state = self.state.lock().await;
        state.trip(FailPoint::AccountLookup)?;

        Ok(state
            .accounts
            .iter()
            .find(|a| a.external_id == external_id)
            .cloned())
    }

    async fn find_organization_by_slug(&self, slug: &str) -> StoreResult<Option<Organization>> {
        let mut state = self.state.lock().await;
        state.trip(FailPoint::OrganizationLookup)?;

        Ok(state.organizations.iter().find(|o| o.slug == slug).cloned())
    }

    async fn get_or_create_organization(&self, data: NewOrganization) -> StoreResult<Organization> {
        let mut state = self.state.lock().await;
        state.trip(FailPoint::OrganizationWrite)?;

        if let Some(existing) = state.organizations.iter().find(|o| o.slug == data.slug) {
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let organization = Organization {
            id: Uuid::new_v4(),
            name: data.name,
            slug: data.slug,
            created_at: now,
            updated_at: now,
        };
        state.organizations.push(organization.clone());

        Ok(organization)
    }

    async fn create_account_with_membership(
        &self,
        data: NewAccount,
    ) -> Result<(Account, Membership), AccountWriteError> {
        let mut state = self.state.lock().await;
        state
            .trip(FailPoint::AccountWrite)
            .map_err(AccountWriteError::account)?;

        if state.accounts.iter().any(|a| a.external_id == data.external_id) {
            return Err(AccountWriteError::account(StoreError::Conflict(
                "users_external_id_key".to_string(),
            )));
        }
        if !state.organizations.iter().any(|o| o.id == data.organization_id) {
            return Err(AccountWriteError::account(StoreError::ForeignKey(
                "users_organization_id_fkey".to_string(),
            )));
        }

        // Nothing has been written yet, so a failure here leaves no account.
        state
            .trip(FailPoint::MembershipWrite)
            .map_err(AccountWriteError::membership)?;

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            external_id: data.external_id,
            email: data.email,
            name: data.name,
            role: data.role,
            organization_id: data.organization_id,
            created_at: now,
            updated_at: now,
        };
        let membership = Membership {
            organization_id: account.organization_id,
            account_id: account.id,
            role: account.role,
            created_at: now,
        };

        state.accounts.push(account.clone());
        state.memberships.push(membership.clone());

        Ok((account, membership))
    }

    async fn find_membership(
        &self,
        organization_id: Uuid,
        account_id: Uuid,
    ) -> StoreResult<Option<Membership>> {
        let state = self.state.lock().await;
        Ok(state
            .memberships
            .iter()
            .find(|m| m.organization_id == organization_id && m.account_id == account_id)
            .cloned())
    }

    async fn list_categories(&self, organization_id: Uuid) -> StoreResult<Vec<Category>> {
        let state = self.state.lock().await;
        let mut categories: Vec<Category> = state
            .categories
            .iter()
            .filter(|c| c.organization_id == organization_id)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(categories)
    }

    async fn find_category(&self, organization_id: Uuid, id: Uuid) -> StoreResult<Option<Category>> {
        let state = self.state.lock().await;
        Ok(state
            .categories
            .iter()
            .find(|c| c.organization_id == organization_id && c.id == id)
            .cloned())
    }

    async fn create_category(&self, data: NewCategory) -> StoreResult<Category> {
        let mut state = self.state.lock().await;

        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            organization_id: data.organization_id,
            name: data.name,
            description: data.description,
            color: data.color,
            created_at: now,
            updated_at: now,
        };
        state.categories.push(category.clone());

        Ok(category)
    }

    async fn update_category(
        &self,
        organization_id: Uuid,
        id: Uuid,
        data: UpdateCategory,
    ) -> StoreResult<Option<Category>> {
        let mut state = self.state.lock().await;

        let Some(category) = state
            .categories
            .iter_mut()
            .find(|c| c.organization_id == organization_id && c.id == id)
        else {
            return Ok(None);
        };

        data.apply_to(category);
        category.updated_at = Utc::now();

        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, organization_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock().await;

        let Some(index) = state
            .categories
            .iter()
            .position(|c| c.organization_id == organization_id && c.id == id)
        else {
            return Ok(false);
        };

        if state.products.iter().any(|p| p.category_id == Some(id)) {
            return Err(StoreError::ForeignKey("products_category_id_fkey".to_string()));
        }

        state.categories.remove(index);
        Ok(true)
    }

    async fn category_in_use(&self, id: Uuid) -> StoreResult<bool> {
        let state = self.state.lock().await;
        Ok(state.products.iter().any(|p| p.category_id == Some(id)))
    }

    async fn list_products(&self, organization_id: Uuid) -> StoreResult<Vec<ProductWithCategory>> {
        let state = self.state.lock().await;
        let mut products: Vec<ProductWithCategory> = state
            .products
            .iter()
            .filter(|p| p.organization_id == organization_id)
            .map(|p| state.with_category_name(p))
            .collect();
        products.sort_by(|a, b| a.product.name.cmp(&b.product.name));

        Ok(products)
    }

    async fn find_product(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> StoreResult<Option<ProductWithCategory>> {
        let state = self.state.lock().await;
        Ok(state
            .products
            .iter()
            .find(|p| p.organization_id == organization_id && p.id == id)
            .map(|p| state.with_category_name(p)))
    }

    async fn create_product(&self, data: NewProduct) -> StoreResult<Product> {
        let mut state = self.state.lock().await;
        state.check_category(data.organization_id, data.category_id)?;
        check_price(data.price)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            organization_id: data.organization_id,
            category_id: data.category_id,
            name: data.name,
            description: data.description,
            price: data.price,
            image_url: data.image_url,
            is_active: data.is_active,
            created_at: now,
            updated_at: now,
        };
        state.products.push(product.clone());

        Ok(product)
    }

    async fn update_product(
        &self,
        organization_id: Uuid,
        id: Uuid,
        data: UpdateProduct,
    ) -> StoreResult<Option<Product>> {
        let mut state = self.state.lock().await;

        if let Some(category_id) = data.category_id {
            state.check_category(organization_id, category_id)?;
        }
        if let Some(price) = data.price {
            check_price(price)?;
        }

        let Some(product) = state
            .products
            .iter_mut()
            .find(|p| p.organization_id == organization_id && p.id == id)
        else {
            return Ok(None);
        };

        data.apply_to(product);
        product.updated_at = Utc::now();

        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, organization_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.products.len();
        state
            .products
            .retain(|p| !(p.organization_id == organization_id && p.id == id));

        Ok(state.products.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::Role;
    use crate::store::AccountInsert;

    async fn seeded() -> (MemoryStore, Organization) {
        let store = MemoryStore::new();
        let organization = store
            .get_or_create_organization(NewOrganization {
                name: "Warung Test".to_string(),
                slug: "warung-test".to_string(),
            })
            .await
            .unwrap();
        (store, organization)
    }

    fn new_account(organization_id: Uuid, external_id: &str) -> NewAccount {
        NewAccount {
            external_id: external_id.to_string(),
            email: String::new(),
            name: None,
            role: Role::Admin,
            organization_id,
        }
    }

    #[tokio::test]
    async fn test_get_or_create_organization_is_idempotent() {
        let (store, organization) = seeded().await;

        let again = store
            .get_or_create_organization(NewOrganization {
                name: "Another Name".to_string(),
                slug: "warung-test".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(again.id, organization.id);
        assert_eq!(again.name, "Warung Test");
        assert_eq!(store.organization_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_external_id_conflicts() {
        let (store, organization) = seeded().await;

        store
            .create_account_with_membership(new_account(organization.id, "user_1"))
            .await
            .unwrap();
        let err = store
            .create_account_with_membership(new_account(organization.id, "user_1"))
            .await
            .unwrap_err();

        assert_eq!(err.insert, AccountInsert::Account);
        assert!(matches!(err.source, StoreError::Conflict(_)));
        assert_eq!(store.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_membership_failure_writes_nothing() {
        let (store, organization) = seeded().await;
        store.fail_next(FailPoint::MembershipWrite).await;

        let err = store
            .create_account_with_membership(new_account(organization.id, "user_1"))
            .await
            .unwrap_err();

        assert_eq!(err.insert, AccountInsert::Membership);
        assert!(matches!(err.source, StoreError::Backend(_)));
        assert_eq!(store.account_count().await, 0);
        assert_eq!(store.membership_count().await, 0);

        // One-shot: the retry goes through.
        store
            .create_account_with_membership(new_account(organization.id, "user_1"))
            .await
            .unwrap();
        assert_eq!(store.account_count().await, 1);
        assert_eq!(store.membership_count().await, 1);
    }

    #[tokio::test]
    async fn test_category_in_use_cannot_be_deleted() {
        let (store, organization) = seeded().await;
        let category = store
            .create_category(NewCategory {
                organization_id: organization.id,
                name: "Makanan".to_string(),
                description: None,
                color: None,
            })
            .await
            .unwrap();
        store
            .create_product(NewProduct {
                organization_id: organization.id,
                category_id: Some(category.id),
                name: "Nasi Goreng".to_string(),
                description: None,
                price: Decimal::new(25000, 0),
                image_url: None,
                is_active: true,
            })
            .await
            .unwrap();

        assert!(store.category_in_use(category.id).await.unwrap());
        let err = store
            .delete_category(organization.id, category.id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKey(_)));
        assert!(store
            .find_category(organization.id, category.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_product_rejects_foreign_category_and_bad_price() {
        let (store, organization) = seeded().await;

        let err = store
            .create_product(NewProduct {
                organization_id: organization.id,
                category_id: Some(Uuid::new_v4()),
                name: "Es Teh".to_string(),
                description: None,
                price: Decimal::new(5000, 0),
                image_url: None,
                is_active: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKey(_)));

        let err = store
            .create_product(NewProduct {
                organization_id: organization.id,
                category_id: None,
                name: "Es Teh".to_string(),
                description: None,
                price: Decimal::ZERO,
                image_url: None,
                is_active: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_records_are_scoped_to_organization() {
        let (store, organization) = seeded().await;
        let category = store
            .create_category(NewCategory {
                organization_id: organization.id,
                name: "Minuman".to_string(),
                description: None,
                color: None,
            })
            .await
            .unwrap();

        let other = Uuid::new_v4();
        assert!(store.find_category(other, category.id).await.unwrap().is_none());
        assert!(store.list_categories(other).await.unwrap().is_empty());
        assert!(!store.delete_category(other, category.id).await.unwrap());
    }
}
