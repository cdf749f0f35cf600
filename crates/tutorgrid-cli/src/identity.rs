//! Who the CLI is acting as.
//!
//! The remote API authenticates the bearer token; the console still needs the
//! admin's region, roles and permissions to scope what it shows and allows.

use clap::Args;
use tutorgrid_models::{Admin, AdminId, AdminRegion};

#[derive(Args, Debug, Clone)]
pub struct AdminArgs {
    /// Admin id recorded in the audit trail
    #[arg(long = "admin-id", env = "TUTORGRID_ADMIN_ID", default_value = "ADM-LOCAL")]
    pub id: String,

    /// Admin email
    #[arg(long = "admin-email", env = "TUTORGRID_ADMIN_EMAIL", default_value = "admin@localhost")]
    pub email: String,

    /// Region node id the admin is scoped to, or ALL
    #[arg(long, env = "TUTORGRID_ADMIN_REGION", default_value = "ALL")]
    pub region: String,

    /// Role code (repeatable), e.g. super_admin, mandal_admin
    #[arg(long = "role", env = "TUTORGRID_ADMIN_ROLES", value_delimiter = ',')]
    pub roles: Vec<String>,

    /// Permission code (repeatable), e.g. allocations:approve
    #[arg(long = "permission", env = "TUTORGRID_ADMIN_PERMISSIONS", value_delimiter = ',')]
    pub permissions: Vec<String>,
}

impl AdminArgs {
    pub fn into_admin(self) -> Admin {
        let roles: Vec<String> = self
            .roles
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        let permissions = self
            .permissions
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        Admin {
            id: AdminId::new(self.id),
            name: self.email.split('@').next().unwrap_or_default().to_string(),
            email: self.email,
            region_id: AdminRegion::from(self.region.trim()),
            role_label: roles.first().cloned(),
            role_codes: roles,
            permissions,
        }
    }
}
