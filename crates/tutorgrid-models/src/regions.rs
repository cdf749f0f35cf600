//! Region hierarchy models.
//!
//! The operator's geography is a forest of `State` roots, each refining down
//! through District, Division, and Constituency to Mandal leaves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::RegionId;

/// Level of a region node, ordered from least to most local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegionType {
    State,
    District,
    Division,
    Constituency,
    Mandal,
}

impl RegionType {
    /// The ordered level sequence used for relative-privilege comparisons.
    pub const LEVELS: [RegionType; 5] = [
        RegionType::State,
        RegionType::District,
        RegionType::Division,
        RegionType::Constituency,
        RegionType::Mandal,
    ];

    /// Position in [`RegionType::LEVELS`].
    pub fn index(self) -> usize {
        match self {
            RegionType::State => 0,
            RegionType::District => 1,
            RegionType::Division => 2,
            RegionType::Constituency => 3,
            RegionType::Mandal => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::LEVELS.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RegionType::State => "State",
            RegionType::District => "District",
            RegionType::Division => "Division",
            RegionType::Constituency => "Constituency",
            RegionType::Mandal => "Mandal",
        }
    }

    /// Whether `self` is strictly more local than `other`.
    pub fn is_below(self, other: RegionType) -> bool {
        self.index() > other.index()
    }

    pub fn is_leaf_level(self) -> bool {
        self == RegionType::Mandal
    }
}

impl fmt::Display for RegionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::LEVELS
            .iter()
            .copied()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown region type: {}", s))
    }
}

/// One node of the region hierarchy, owning its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionNode {
    pub id: RegionId,
    pub name: String,
    #[serde(rename = "type")]
    pub region_type: RegionType,
    #[serde(default)]
    pub children: Vec<RegionNode>,
}

impl RegionNode {
    pub fn new(id: impl Into<RegionId>, name: impl Into<String>, region_type: RegionType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            region_type,
            children: Vec::new(),
        }
    }

    /// Builder-style child attachment, used mostly by fixtures.
    pub fn with_child(mut self, child: RegionNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order() {
        for (i, level) in RegionType::LEVELS.iter().enumerate() {
            assert_eq!(level.index(), i);
            assert_eq!(RegionType::from_index(i), Some(*level));
        }
        assert_eq!(RegionType::from_index(5), None);
        assert!(RegionType::Mandal.is_below(RegionType::State));
        assert!(!RegionType::District.is_below(RegionType::District));
    }

    #[test]
    fn test_parse_region_type() {
        assert_eq!("mandal".parse::<RegionType>(), Ok(RegionType::Mandal));
        assert_eq!(" District ".parse::<RegionType>(), Ok(RegionType::District));
        assert!("village".parse::<RegionType>().is_err());
    }

    #[test]
    fn test_node_deserialize_uses_type_key() {
        let json = r#"{
            "id": "ST-01",
            "name": "Telangana",
            "type": "State",
            "children": [{"id": "DIS-01", "name": "Hyderabad", "type": "District"}]
        }"#;
        let node: RegionNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.region_type, RegionType::State);
        assert_eq!(node.children.len(), 1);
        assert!(node.children[0].is_leaf());
    }
}
