/// Persistent record store
///
/// The [`Store`] trait is the seam between request handling and persistence.
/// It exposes find / insert / update / delete / list operations per record
/// collection, plus the two compound writes the provisioning sequence needs:
///
/// - [`Store::get_or_create_organization`]: idempotent get-or-create keyed by
///   the organization's unique slug
/// - [`Store::create_account_with_membership`]: account and membership written
///   atomically
///
/// Not-found is expressed as `Ok(None)` (or `Ok(false)` for deletes), never as
/// an error, so callers can tell a missing record from a failing store.
///
/// # Implementations
///
/// - [`postgres::PgStore`]: PostgreSQL via sqlx
/// - [`memory::MemoryStore`]: in-process store for tests and local demos, with
///   one-shot failure injection
///
/// # Example
///
/// ```no_run
/// use kasir_shared::store::{postgres::PgStore, Store};
/// use kasir_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let store = PgStore::new(pool);
///
/// if let Some(account) = store.find_account("user_2abc").await? {
///     println!("account {} belongs to {}", account.id, account.organization_id);
/// }
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    account::{Account, NewAccount},
    category::{Category, NewCategory, UpdateCategory},
    membership::Membership,
    organization::{NewOrganization, Organization},
    product::{NewProduct, Product, ProductWithCategory, UpdateProduct},
};

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared, type-erased store handle
pub type SharedStore = Arc<dyn Store>;

/// Errors surfaced by a record store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    /// A foreign key constraint rejected the write or delete
    #[error("Referenced record missing or still in use: {0}")]
    ForeignKey(String),

    /// A check constraint rejected the write
    #[error("Check constraint violated: {0}")]
    Invalid(String),

    /// Any other data-access failure
    #[error("Store failure: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.kind() {
                ErrorKind::UniqueViolation => return StoreError::Conflict(constraint),
                ErrorKind::ForeignKeyViolation => return StoreError::ForeignKey(constraint),
                ErrorKind::CheckViolation => return StoreError::Invalid(constraint),
                _ => {}
            }
        }

        StoreError::Backend(err.to_string())
    }
}

/// One of the two inserts of [`Store::create_account_with_membership`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountInsert {
    Account,
    Membership,
}

impl fmt::Display for AccountInsert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountInsert::Account => f.write_str("account"),
            AccountInsert::Membership => f.write_str("membership"),
        }
    }
}

/// Failure of an account + membership write, naming the insert that failed
///
/// Nothing is persisted whichever insert fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to insert {insert}: {source}")]
pub struct AccountWriteError {
    pub insert: AccountInsert,
    pub source: StoreError,
}

impl AccountWriteError {
    pub fn account(source: impl Into<StoreError>) -> Self {
        Self {
            insert: AccountInsert::Account,
            source: source.into(),
        }
    }

    pub fn membership(source: impl Into<StoreError>) -> Self {
        Self {
            insert: AccountInsert::Membership,
            source: source.into(),
        }
    }
}

/// Record store operations used by the provisioning sequence and the API
#[async_trait]
pub trait Store: Send + Sync {
    /// Verifies the store is reachable
    async fn ping(&self) -> StoreResult<()>;

    // Accounts and organizations

    /// Finds the account bound to an external identity
    async fn find_account(&self, external_id: &str) -> StoreResult<Option<Account>>;

    /// Finds an organization by slug
    async fn find_organization_by_slug(&self, slug: &str) -> StoreResult<Option<Organization>>;

    /// Returns the organization with `data.slug`, creating it if absent
    ///
    /// Concurrent callers with the same slug observe the same organization.
    async fn get_or_create_organization(&self, data: NewOrganization) -> StoreResult<Organization>;

    /// Creates an account and its membership (with the account's role) atomically
    ///
    /// Either both records are written or neither is.
    ///
    /// # Errors
    ///
    /// [`AccountWriteError`] naming the failed insert; its source is
    /// [`StoreError::Conflict`] if an account with the same external id exists
    async fn create_account_with_membership(
        &self,
        data: NewAccount,
    ) -> Result<(Account, Membership), AccountWriteError>;

    /// Finds the membership of an account in an organization
    async fn find_membership(
        &self,
        organization_id: Uuid,
        account_id: Uuid,
    ) -> StoreResult<Option<Membership>>;

    // Categories

    async fn list_categories(&self, organization_id: Uuid) -> StoreResult<Vec<Category>>;

    async fn find_category(&self, organization_id: Uuid, id: Uuid) -> StoreResult<Option<Category>>;

    async fn create_category(&self, data: NewCategory) -> StoreResult<Category>;

    async fn update_category(
        &self,
        organization_id: Uuid,
        id: Uuid,
        data: UpdateCategory,
    ) -> StoreResult<Option<Category>>;

    /// Deletes a category; [`StoreError::ForeignKey`] if products reference it
    async fn delete_category(&self, organization_id: Uuid, id: Uuid) -> StoreResult<bool>;

    /// Whether any product references the category
    async fn category_in_use(&self, id: Uuid) -> StoreResult<bool>;

    // Products

    async fn list_products(&self, organization_id: Uuid) -> StoreResult<Vec<ProductWithCategory>>;

    async fn find_product(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> StoreResult<Option<ProductWithCategory>>;

    async fn create_product(&self, data: NewProduct) -> StoreResult<Product>;

    async fn update_product(
        &self,
        organization_id: Uuid,
        id: Uuid,
        data: UpdateProduct,
    ) -> StoreResult<Option<Product>>;

    async fn delete_product(&self, organization_id: Uuid, id: Uuid) -> StoreResult<bool>;
}
