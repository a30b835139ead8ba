use sea_orm::{ColumnTrait, Condition};

use crate::entity::nodes;

/// Access tier decoded from the numeric privilege level carried in a token.
///
/// Lower levels hold more rights. The mapping is total over every level a
/// token may carry:
///
/// - `<= 0`: service accounts, own-node listings with unrestricted deletion
/// - `1`: institute admin, institute-wide listings and full control
/// - `2`: owner, may create/modify/delete their own nodes
/// - `3`: institute viewer, institute-wide listings but read-only
/// - `>= 4`: restricted, own nodes and read-only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Service,
    InstituteAdmin,
    Owner,
    InstituteViewer,
    Restricted,
}

impl Privilege {
    #[must_use]
    pub fn from_level(level: i32) -> Self {
        match level {
            ..=0 => Self::Service,
            1 => Self::InstituteAdmin,
            2 => Self::Owner,
            3 => Self::InstituteViewer,
            _ => Self::Restricted,
        }
    }
}

/// The authenticated actor behind a dashboard request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub username: String,
    pub institute: String,
    pub privilege: Privilege,
}

/// Visibility filter for node queries. This predicate is the whole
/// multi-tenancy boundary: there is no per-node ACL beyond it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeScope {
    /// Every node registered at the given institute.
    Institute(String),
    /// Only nodes owned by the given username.
    Owner(String),
}

impl NodeScope {
    /// Database condition selecting exactly the nodes this scope covers.
    #[must_use]
    pub fn condition(&self) -> Condition {
        match self {
            Self::Institute(location) => {
                Condition::all().add(nodes::Column::Location.eq(location))
            }
            Self::Owner(username) => Condition::all().add(nodes::Column::Owner.eq(username)),
        }
    }
}

impl Principal {
    /// Listing scope for this principal: institute-wide for institute tiers,
    /// owner-only for everyone else.
    #[must_use]
    pub fn scope(&self) -> NodeScope {
        match self.privilege {
            Privilege::InstituteAdmin | Privilege::InstituteViewer => {
                NodeScope::Institute(self.institute.clone())
            }
            _ => NodeScope::Owner(self.username.clone()),
        }
    }

    /// Whether this principal may create, modify, or delete nodes.
    #[must_use]
    pub fn can_mutate_nodes(&self) -> bool {
        matches!(
            self.privilege,
            Privilege::Service | Privilege::InstituteAdmin | Privilege::Owner
        )
    }

    /// Whether deletion may target any node by uid, or only nodes this
    /// principal owns.
    #[must_use]
    pub fn can_delete_any_node(&self) -> bool {
        matches!(self.privilege, Privilege::Service | Privilege::InstituteAdmin)
    }
}
