/// Roles and their capabilities
///
/// Every account and membership carries one [`Role`]. What a role may do is a
/// static table of [`Grant`]s over ([`Resource`], [`Action`]) pairs, so a
/// permission check is a pure function with no string matching.
///
/// # Roles
///
/// - **owner**: Everything
/// - **admin**: Catalog, orders, payments and inventory; read-only outlets,
///   members and reports
/// - **cashier**: Read the catalog, take orders and payments
/// - **cook**: Read orders, drive the kitchen display
/// - **waiter**: Read the catalog, take orders, manage tables
/// - **courier**: Read and update orders
///
/// # Example
///
/// ```
/// use kasir_shared::models::role::{Action, Resource, Role};
///
/// assert!(Role::Admin.can(Resource::Products, Action::Delete));
/// assert!(!Role::Cashier.can(Resource::Products, Action::Delete));
/// assert!(Role::Cashier.can(Resource::Categories, Action::Read));
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role held by an account within an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Business owner, unrestricted
    Owner,

    /// Back-office administrator (default for provisioned accounts)
    Admin,

    /// Front-of-house cashier
    Cashier,

    /// Kitchen staff
    Cook,

    /// Table service staff
    Waiter,

    /// Delivery staff
    Courier,
}

/// Kinds of records a role may act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Organizations,
    Outlets,
    Members,
    Products,
    Categories,
    Orders,
    Payments,
    Inventory,
    Reports,
    Settings,
    Kds,
    Tables,
}

/// Operations on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

/// A single entry in a role's capability table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Every action on the resource
    All(Resource),

    /// One action on the resource
    Only(Resource, Action),
}

impl Grant {
    /// Whether this grant covers `action` on `resource`
    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        match *self {
            Grant::All(r) => r == resource,
            Grant::Only(r, a) => r == resource && a == action,
        }
    }
}

use Action::{Create, Read, Update};
use Grant::{All, Only};
use Resource::*;

const ADMIN_GRANTS: &[Grant] = &[
    Only(Outlets, Read),
    Only(Members, Read),
    All(Products),
    All(Categories),
    All(Orders),
    All(Payments),
    All(Inventory),
    Only(Reports, Read),
];

const CASHIER_GRANTS: &[Grant] = &[
    Only(Products, Read),
    Only(Categories, Read),
    Only(Orders, Create),
    Only(Orders, Read),
    Only(Orders, Update),
    Only(Payments, Create),
    Only(Payments, Read),
];

const COOK_GRANTS: &[Grant] = &[Only(Orders, Read), All(Kds)];

const WAITER_GRANTS: &[Grant] = &[
    Only(Products, Read),
    Only(Categories, Read),
    Only(Orders, Create),
    Only(Orders, Read),
    Only(Orders, Update),
    All(Tables),
];

const COURIER_GRANTS: &[Grant] = &[Only(Orders, Read), Only(Orders, Update)];

impl Role {
    /// Converts role to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Cashier => "cashier",
            Role::Cook => "cook",
            Role::Waiter => "waiter",
            Role::Courier => "courier",
        }
    }

    /// Capability table for non-owner roles
    ///
    /// Owners are not table-driven; see [`Role::can`].
    pub fn grants(&self) -> &'static [Grant] {
        match self {
            Role::Owner => &[],
            Role::Admin => ADMIN_GRANTS,
            Role::Cashier => CASHIER_GRANTS,
            Role::Cook => COOK_GRANTS,
            Role::Waiter => WAITER_GRANTS,
            Role::Courier => COURIER_GRANTS,
        }
    }

    /// Checks whether this role may perform `action` on `resource`
    pub fn can(&self, resource: Resource, action: Action) -> bool {
        match self {
            Role::Owner => true,
            _ => self
                .grants()
                .iter()
                .any(|grant| grant.allows(resource, action)),
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "cashier" => Ok(Role::Cashier),
            "cook" => Ok(Role::Cook),
            "waiter" => Ok(Role::Waiter),
            "courier" => Ok(Role::Courier),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Organizations => "organizations",
            Resource::Outlets => "outlets",
            Resource::Members => "members",
            Resource::Products => "products",
            Resource::Categories => "categories",
            Resource::Orders => "orders",
            Resource::Payments => "payments",
            Resource::Inventory => "inventory",
            Resource::Reports => "reports",
            Resource::Settings => "settings",
            Resource::Kds => "kds",
            Resource::Tables => "tables",
        }
    }
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
