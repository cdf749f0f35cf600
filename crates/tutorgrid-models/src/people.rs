//! Students, trainers, and the region-scoping seam they share with allocations.

use serde::{Deserialize, Serialize};

use crate::ids::{CourseId, RegionId, StudentId, TrainerId};

/// Anything that lives at a node of the region hierarchy and is therefore
/// subject to scope filtering.
pub trait RegionScoped {
    fn region_id(&self) -> &RegionId;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub region_id: RegionId,
    #[serde(default)]
    pub course_ids: Vec<CourseId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trainer {
    pub id: TrainerId,
    pub name: String,
    pub region_id: RegionId,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl RegionScoped for Student {
    fn region_id(&self) -> &RegionId {
        &self.region_id
    }
}

impl RegionScoped for Trainer {
    fn region_id(&self) -> &RegionId {
        &self.region_id
    }
}
