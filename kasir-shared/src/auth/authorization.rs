/// Authorization checks
///
/// A caller may act on a resource when:
///
/// 1. **Provisioned**: an account is bound to the caller's external id
/// 2. **Member**: the account holds a membership in its organization
/// 3. **Granted**: the membership's [`Role`] allows the action on the resource
///
/// The resolved [`Caller`] carries the organization every subsequent record
/// access is scoped to.
///
/// # Example
///
/// ```no_run
/// use kasir_shared::auth::authorization::authorize;
/// use kasir_shared::auth::middleware::AuthContext;
/// use kasir_shared::models::role::{Action, Resource};
/// use kasir_shared::store::Store;
///
/// # async fn example(store: &dyn Store, auth: &AuthContext) -> Result<(), Box<dyn std::error::Error>> {
/// let caller = authorize(store, auth, Resource::Categories, Action::Create).await?;
/// println!("acting in organization {}", caller.organization_id());
/// # Ok(())
/// # }
/// ```

use tracing::debug;
use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::{
    account::Account,
    membership::Membership,
    role::{Action, Resource, Role},
};
use crate::store::{Store, StoreError};

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// No account is bound to the identity yet
    #[error("Account has not been provisioned")]
    NotProvisioned,

    /// Account has no membership in its organization
    #[error("Not a member of organization {0}")]
    NotMember(Uuid),

    /// Role doesn't grant the action
    #[error("Role {role} may not {action} {resource}")]
    Forbidden {
        role: Role,
        resource: Resource,
        action: Action,
    },

    /// Store error
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Authorized caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub account: Account,
    pub membership: Membership,
}

impl Caller {
    /// Organization the caller acts in
    pub fn organization_id(&self) -> Uuid {
        self.membership.organization_id
    }
}

/// Checks that `role` may perform `action` on `resource`
pub fn require_permission(role: Role, resource: Resource, action: Action) -> Result<(), AuthzError> {
    if !role.can(resource, action) {
        return Err(AuthzError::Forbidden {
            role,
            resource,
            action,
        });
    }
    Ok(())
}

/// Resolves the caller's account and membership and checks the grant
///
/// # Errors
///
/// - [`AuthzError::NotProvisioned`] if no account matches the identity
/// - [`AuthzError::NotMember`] if the account has no membership
/// - [`AuthzError::Forbidden`] if the role lacks the grant
/// - [`AuthzError::Store`] on store failure
pub async fn authorize(
    store: &dyn Store,
    auth: &AuthContext,
    resource: Resource,
    action: Action,
) -> Result<Caller, AuthzError> {
    let account = store
        .find_account(&auth.external_id)
        .await?
        .ok_or(AuthzError::NotProvisioned)?;

    let membership = store
        .find_membership(account.organization_id, account.id)
        .await?
        .ok_or(AuthzError::NotMember(account.organization_id))?;

    require_permission(membership.role, resource, action).map_err(|e| {
        debug!(
            account_id = %account.id,
            role = %membership.role,
            resource = %resource,
            action = %action,
            "Permission denied"
        );
        e
    })?;

    Ok(Caller {
        account,
        membership,
    })
}
