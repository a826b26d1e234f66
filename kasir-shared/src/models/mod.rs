/// Database models for Kasir
///
/// This module contains the record types stored by the point-of-sale backend
/// and the SQL used to read and write them.
///
/// # Models
///
/// - `organization`: Businesses (tenants); one `default` organization is
///   created lazily by account provisioning
/// - `account`: Local user records bound to an external identity
/// - `membership`: Account-organization relationships with roles
/// - `role`: Closed role enumeration and its capability mapping
/// - `category`: Product categories
/// - `product`: Sellable products, optionally grouped by category
///
/// Every query function is generic over [`sqlx::PgExecutor`], so the same code
/// runs against a pool or inside a transaction.
///
/// # Example
///
/// ```no_run
/// use kasir_shared::models::organization::{NewOrganization, Organization};
/// use kasir_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let org = Organization::get_or_create(
///     &pool,
///     NewOrganization {
///         name: "Warung Sederhana".to_string(),
///         slug: "warung-sederhana".to_string(),
///     },
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```

pub mod account;
pub mod category;
pub mod membership;
pub mod organization;
pub mod product;
pub mod role;
