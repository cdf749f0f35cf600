//! Admin models, region assignment, and role codes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use validator::Validate;

use crate::ids::{AdminId, RegionId};
use crate::regions::RegionType;

/// Well-known role codes carried in `Admin::role_codes`.
pub mod role_codes {
    pub const SUPER_ADMIN: &str = "super_admin";
    pub const STATE_ADMIN: &str = "state_admin";
    pub const DISTRICT_ADMIN: &str = "district_admin";
    pub const DIVISION_ADMIN: &str = "division_admin";
    pub const CONSTITUENCY_ADMIN: &str = "constituency_admin";
    pub const MANDAL_ADMIN: &str = "mandal_admin";
    pub const COORDINATOR: &str = "coordinator";

    pub fn all() -> Vec<&'static str> {
        vec![
            SUPER_ADMIN,
            STATE_ADMIN,
            DISTRICT_ADMIN,
            DIVISION_ADMIN,
            CONSTITUENCY_ADMIN,
            MANDAL_ADMIN,
            COORDINATOR,
        ]
    }
}

/// Structured role codes, parsed from the free-form strings on an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleCode {
    SuperAdmin,
    StateAdmin,
    DistrictAdmin,
    DivisionAdmin,
    ConstituencyAdmin,
    MandalAdmin,
    Coordinator,
}

impl RoleCode {
    /// Exact match on the structured code; unknown codes yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            role_codes::SUPER_ADMIN => Some(RoleCode::SuperAdmin),
            role_codes::STATE_ADMIN => Some(RoleCode::StateAdmin),
            role_codes::DISTRICT_ADMIN => Some(RoleCode::DistrictAdmin),
            role_codes::DIVISION_ADMIN => Some(RoleCode::DivisionAdmin),
            role_codes::CONSTITUENCY_ADMIN => Some(RoleCode::ConstituencyAdmin),
            role_codes::MANDAL_ADMIN => Some(RoleCode::MandalAdmin),
            role_codes::COORDINATOR => Some(RoleCode::Coordinator),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            RoleCode::SuperAdmin => role_codes::SUPER_ADMIN,
            RoleCode::StateAdmin => role_codes::STATE_ADMIN,
            RoleCode::DistrictAdmin => role_codes::DISTRICT_ADMIN,
            RoleCode::DivisionAdmin => role_codes::DIVISION_ADMIN,
            RoleCode::ConstituencyAdmin => role_codes::CONSTITUENCY_ADMIN,
            RoleCode::MandalAdmin => role_codes::MANDAL_ADMIN,
            RoleCode::Coordinator => role_codes::COORDINATOR,
        }
    }

    /// Higher number = more privileges.
    pub fn privilege(self) -> u8 {
        match self {
            RoleCode::SuperAdmin => 6,
            RoleCode::StateAdmin => 5,
            RoleCode::DistrictAdmin => 4,
            RoleCode::DivisionAdmin => 3,
            RoleCode::ConstituencyAdmin => 2,
            RoleCode::MandalAdmin => 1,
            RoleCode::Coordinator => 0,
        }
    }

    /// The region level a role is normally assigned at.
    pub fn home_level(self) -> Option<RegionType> {
        match self {
            RoleCode::SuperAdmin | RoleCode::Coordinator => None,
            RoleCode::StateAdmin => Some(RegionType::State),
            RoleCode::DistrictAdmin => Some(RegionType::District),
            RoleCode::DivisionAdmin => Some(RegionType::Division),
            RoleCode::ConstituencyAdmin => Some(RegionType::Constituency),
            RoleCode::MandalAdmin => Some(RegionType::Mandal),
        }
    }
}

impl fmt::Display for RoleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Where an admin's authority is anchored. Serialized as the region id, or
/// the literal `"ALL"` for unscoped access.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AdminRegion {
    All,
    Node(RegionId),
}

impl AdminRegion {
    pub const ALL: &'static str = "ALL";

    pub fn is_all(&self) -> bool {
        matches!(self, AdminRegion::All)
    }

    pub fn node_id(&self) -> Option<&RegionId> {
        match self {
            AdminRegion::All => None,
            AdminRegion::Node(id) => Some(id),
        }
    }
}

impl From<&str> for AdminRegion {
    fn from(value: &str) -> Self {
        if value == Self::ALL {
            AdminRegion::All
        } else {
            AdminRegion::Node(RegionId::from(value))
        }
    }
}

impl fmt::Display for AdminRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminRegion::All => f.write_str(Self::ALL),
            AdminRegion::Node(id) => write!(f, "{}", id),
        }
    }
}

impl Serialize for AdminRegion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AdminRegion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(AdminRegion::from(raw.as_str()))
    }
}

/// A console administrator, held for the duration of a console session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: AdminId,
    pub email: String,
    pub name: String,
    pub region_id: AdminRegion,
    #[serde(default)]
    pub role_codes: Vec<String>,
    /// Free-text role label shown in the UI, e.g. "Super Admin".
    #[serde(default)]
    pub role_label: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Admin {
    /// Structured role codes, skipping anything unrecognized.
    pub fn roles(&self) -> impl Iterator<Item = RoleCode> + '_ {
        self.role_codes.iter().filter_map(|c| RoleCode::from_code(c))
    }

    /// The most privileged recognized role, if any.
    pub fn highest_role(&self) -> Option<RoleCode> {
        self.roles().max_by_key(|r| r.privilege())
    }
}

/// Payload for inviting a new admin.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InviteAdminDto {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    pub region_id: AdminRegion,
    #[validate(length(min = 1, message = "at least one role code is required"))]
    pub role_codes: Vec<String>,
}
