/// Account provisioning
///
/// Binds an external identity to a local account the first time it is seen.
/// The sequence is linear and stops at the first failure:
///
/// 1. **Resolve identity**: look up the account by external id. If one exists,
///    return it without writing anything.
/// 2. **Resolve organization**: get or create the default organization
///    (slug [`DEFAULT_ORGANIZATION_SLUG`]).
/// 3. **Write account**: create the account (role `admin`, empty email, no
///    display name).
/// 4. **Write membership**: create its `admin` membership. Steps 3 and 4 run
///    as one atomic store operation, so a failure in either leaves nothing
///    behind; the error still names the insert that failed.
///
/// Two requests provisioning the same identity at once both succeed: the one
/// that loses the insert race sees a uniqueness conflict and returns the
/// winner's account.
///
/// # Example
///
/// ```
/// use kasir_shared::provisioning::provision_account;
/// use kasir_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
///
/// let first = provision_account(&store, "user_2abc").await?;
/// assert!(first.created);
///
/// let second = provision_account(&store, "user_2abc").await?;
/// assert!(!second.created);
/// assert_eq!(first.account.id, second.account.id);
/// # Ok(())
/// # }
/// ```

use tracing::{debug, error, info, warn};

use crate::models::{
    account::{Account, NewAccount},
    organization::{NewOrganization, Organization},
    role::Role,
};
use crate::store::{AccountInsert, AccountWriteError, Store, StoreError};

/// Slug of the organization new accounts join
pub const DEFAULT_ORGANIZATION_SLUG: &str = "default";

/// Display name given to the default organization when it is created
pub const DEFAULT_ORGANIZATION_NAME: &str = "Default Organization";

/// Step of the provisioning sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ResolveIdentity,
    ResolveOrganization,
    WriteAccount,
    WriteMembership,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::ResolveIdentity => "resolve_identity",
            Step::ResolveOrganization => "resolve_organization",
            Step::WriteAccount => "write_account",
            Step::WriteMembership => "write_membership",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provisioning failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvisioningError {
    /// The identity carried no subject id
    #[error("External identity is empty")]
    EmptyIdentity,

    /// The store failed at a step of the sequence
    #[error("Provisioning failed at {step}: {source}")]
    Store { step: Step, source: StoreError },
}

impl ProvisioningError {
    fn at(step: Step) -> impl FnOnce(StoreError) -> Self {
        move |source| ProvisioningError::Store { step, source }
    }
}

/// Outcome of [`provision_account`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    /// The account bound to the identity
    pub account: Account,

    /// Whether this call created the account
    pub created: bool,
}

/// Returns the account for `external_id`, creating it on first sight
///
/// # Errors
///
/// - [`ProvisioningError::EmptyIdentity`] if `external_id` is blank
/// - [`ProvisioningError::Store`] naming the step whose store call failed
pub async fn provision_account(
    store: &dyn Store,
    external_id: &str,
) -> Result<Provisioned, ProvisioningError> {
    if external_id.trim().is_empty() {
        return Err(ProvisioningError::EmptyIdentity);
    }

    if let Some(account) = resolve_identity(store, external_id).await? {
        debug!(account_id = %account.id, "Account already provisioned");
        return Ok(Provisioned {
            account,
            created: false,
        });
    }

    let organization = resolve_organization(store).await?;

    let data = NewAccount {
        external_id: external_id.to_string(),
        email: String::new(),
        name: None,
        role: Role::Admin,
        organization_id: organization.id,
    };

    match store.create_account_with_membership(data).await {
        Ok((account, membership)) => {
            info!(
                account_id = %account.id,
                organization_id = %organization.id,
                role = %membership.role,
                "Provisioned new account"
            );
            Ok(Provisioned {
                account,
                created: true,
            })
        }
        Err(AccountWriteError {
            insert: AccountInsert::Account,
            source: StoreError::Conflict(constraint),
        }) => {
            // A concurrent request created the account first.
            warn!(%constraint, "Account created concurrently, re-resolving identity");
            match resolve_identity(store, external_id).await? {
                Some(account) => Ok(Provisioned {
                    account,
                    created: false,
                }),
                None => Err(ProvisioningError::Store {
                    step: Step::WriteAccount,
                    source: StoreError::Conflict(constraint),
                }),
            }
        }
        Err(e) => {
            let step = match e.insert {
                AccountInsert::Account => Step::WriteAccount,
                AccountInsert::Membership => Step::WriteMembership,
            };
            error!(error = %e.source, %step, "Failed to write account and membership");
            Err(ProvisioningError::at(step)(e.source))
        }
    }
}

async fn resolve_identity(
    store: &dyn Store,
    external_id: &str,
) -> Result<Option<Account>, ProvisioningError> {
    store.find_account(external_id).await.map_err(|e| {
        error!(error = %e, "Failed to look up account");
        ProvisioningError::at(Step::ResolveIdentity)(e)
    })
}

async fn resolve_organization(store: &dyn Store) -> Result<Organization, ProvisioningError> {
    let existing = store
        .find_organization_by_slug(DEFAULT_ORGANIZATION_SLUG)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to look up default organization");
            ProvisioningError::at(Step::ResolveOrganization)(e)
        })?;

    if let Some(organization) = existing {
        return Ok(organization);
    }

    let organization = store
        .get_or_create_organization(NewOrganization {
            name: DEFAULT_ORGANIZATION_NAME.to_string(),
            slug: DEFAULT_ORGANIZATION_SLUG.to_string(),
        })
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create default organization");
            ProvisioningError::at(Step::ResolveOrganization)(e)
        })?;

    info!(organization_id = %organization.id, "Resolved default organization");
    Ok(organization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{FailPoint, MemoryStore};

    #[tokio::test]
    async fn test_provision_new_identity() {
        let store = MemoryStore::new();

        let provisioned = provision_account(&store, "user_1").await.unwrap();

        assert!(provisioned.created);
        let account = provisioned.account;
        assert_eq!(account.external_id, "user_1");
        assert_eq!(account.email, "");
        assert_eq!(account.name, None);
        assert_eq!(account.role, Role::Admin);

        let organization = store
            .find_organization_by_slug(DEFAULT_ORGANIZATION_SLUG)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(organization.name, DEFAULT_ORGANIZATION_NAME);
        assert_eq!(account.organization_id, organization.id);

        let membership = store
            .find_membership(organization.id, account.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(membership.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_empty_identity_is_rejected() {
        let store = MemoryStore::new();

        let err = provision_account(&store, "  ").await.unwrap_err();

        assert_eq!(err, ProvisioningError::EmptyIdentity);
        assert_eq!(store.organization_count().await, 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_names_step() {
        let store = MemoryStore::new();
        store.fail_next(FailPoint::AccountLookup).await;

        let err = provision_account(&store, "user_1").await.unwrap_err();

        assert!(matches!(
            err,
            ProvisioningError::Store {
                step: Step::ResolveIdentity,
                ..
            }
        ));
        assert_eq!(store.organization_count().await, 0);
    }

    #[tokio::test]
    async fn test_organization_lookup_failure_names_step() {
        let store = MemoryStore::new();
        store.fail_next(FailPoint::OrganizationLookup).await;

        let err = provision_account(&store, "user_1").await.unwrap_err();

        assert!(matches!(
            err,
            ProvisioningError::Store {
                step: Step::ResolveOrganization,
                ..
            }
        ));
        assert_eq!(store.organization_count().await, 0);
        assert_eq!(store.account_count().await, 0);
    }

    #[tokio::test]
    async fn test_membership_failure_names_step() {
        let store = MemoryStore::new();
        store.fail_next(FailPoint::MembershipWrite).await;

        let err = provision_account(&store, "user_1").await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Provisioning failed at write_membership: Store failure: injected failure: MembershipWrite"
        );
        assert_eq!(store.account_count().await, 0);
    }

    #[tokio::test]
    async fn test_organization_failure_stops_sequence() {
        let store = MemoryStore::new();
        store.fail_next(FailPoint::OrganizationWrite).await;

        let err = provision_account(&store, "user_1").await.unwrap_err();

        assert!(matches!(
            err,
            ProvisioningError::Store {
                step: Step::ResolveOrganization,
                ..
            }
        ));
        assert_eq!(store.account_count().await, 0);
    }

    #[tokio::test]
    async fn test_account_failure_names_step() {
        let store = MemoryStore::new();
        store.fail_next(FailPoint::AccountWrite).await;

        let err = provision_account(&store, "user_1").await.unwrap_err();

        assert!(matches!(
            err,
            ProvisioningError::Store {
                step: Step::WriteAccount,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "Provisioning failed at write_account: Store failure: injected failure: AccountWrite"
        );
    }
}
