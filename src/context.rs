use std::sync::Arc;

use tutorgrid_core::ConsoleResult;
use tutorgrid_models::{Admin, RegionScoped};

use crate::hierarchy::Hierarchy;
use crate::scope::{self, Action};

/// The signed-in admin plus the shared, read-only hierarchy. Passed into every
/// console operation instead of living in global state.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub admin: Admin,
    pub hierarchy: Arc<Hierarchy>,
}

impl AuthContext {
    pub fn new(admin: Admin, hierarchy: Arc<Hierarchy>) -> Self {
        Self { admin, hierarchy }
    }

    pub fn actor(&self) -> &str {
        self.admin.id.as_str()
    }

    pub fn is_in_scope(&self, region_id: &str) -> bool {
        scope::is_in_scope(&self.hierarchy, &self.admin, region_id)
    }

    pub fn ensure_in_scope(&self, region_id: &str) -> ConsoleResult<()> {
        scope::ensure_in_scope(&self.hierarchy, &self.admin, region_id)
    }

    pub fn can_perform(&self, action: Action) -> bool {
        scope::can_perform(&self.admin, action)
    }

    /// Permission first, then scope. Both are checked before any remote call.
    pub fn authorize(&self, action: Action, entity: &impl RegionScoped) -> ConsoleResult<()> {
        scope::ensure_can_perform(&self.admin, action)?;
        self.ensure_in_scope(entity.region_id().as_str())
    }

    pub fn filter_in_scope<'a, T: RegionScoped + 'a>(
        &self,
        items: impl IntoIterator<Item = &'a T>,
    ) -> Vec<&'a T> {
        scope::filter_in_scope(&self.hierarchy, &self.admin, items)
    }
}
