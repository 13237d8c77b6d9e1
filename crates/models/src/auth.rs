use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// The fixed set of permission classes a user can hold
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RoleName {
    Student,
    Instructor,
    Admin,
}

impl RoleName {
    /// Human readable description stored alongside the role row
    pub fn description(self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Instructor => "Instructor",
            Self::Admin => "Administrator",
        }
    }
}

/// Roles allowed to author and manage catalog content
pub const CATALOG_EDITORS: [RoleName; 2] = [RoleName::Instructor, RoleName::Admin];

/// Identity of the caller, established at sign-in and handed to every
/// operation that needs to know who is acting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub roles: Vec<RoleName>,
}

impl AuthContext {
    pub fn has_role(&self, role: RoleName) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[RoleName]) -> bool {
        roles.iter().any(|role| self.has_role(*role))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(RoleName::Admin)
    }

    /// Admins may act on anything, everyone else only on what they own
    pub fn may_manage(&self, owner_id: i64) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}
