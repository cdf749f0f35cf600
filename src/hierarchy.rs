//! Immutable region hierarchy.
//!
//! The forest of `State` roots is loaded once and only read afterwards. Lookups
//! go through an index of child-position paths, so `find_node` never deep-copies
//! and duplicate ids resolve to the first node in depth-first pre-order.

use std::collections::{HashMap, HashSet};

use tracing::{instrument, warn};
use tutorgrid_core::{ConsoleError, ConsoleResult};
use tutorgrid_models::{RegionId, RegionNode, RegionType};

#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    roots: Vec<RegionNode>,
    /// Child positions from the root list down to each node.
    index: HashMap<RegionId, Vec<usize>>,
}

impl Hierarchy {
    /// Build a hierarchy, rejecting trees that break the level ordering.
    #[instrument(skip(roots), fields(roots = roots.len()))]
    pub fn from_roots(roots: Vec<RegionNode>) -> ConsoleResult<Self> {
        for root in &roots {
            if root.region_type != RegionType::State {
                return Err(ConsoleError::InvalidHierarchy(format!(
                    "root {} is a {}, expected State",
                    root.id, root.region_type
                )));
            }
            validate_levels(root)?;
        }

        let mut index = HashMap::new();
        for (i, root) in roots.iter().enumerate() {
            index_node(root, vec![i], &mut index);
        }

        Ok(Self { roots, index })
    }

    /// Parse a JSON array of State roots.
    pub fn from_json(json: &str) -> ConsoleResult<Self> {
        let roots: Vec<RegionNode> = serde_json::from_str(json)
            .map_err(|e| ConsoleError::InvalidHierarchy(e.to_string()))?;
        Self::from_roots(roots)
    }

    pub fn roots(&self) -> &[RegionNode] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// First node with `id` in depth-first order, or `None`.
    pub fn find_node(&self, id: &str) -> Option<&RegionNode> {
        let path = self.index.get(id)?;
        self.node_at(path)
    }

    pub fn parent_of(&self, id: &str) -> Option<&RegionNode> {
        let path = self.index.get(id)?;
        if path.len() < 2 {
            return None;
        }
        self.node_at(&path[..path.len() - 1])
    }

    /// Root-to-node chain, inclusive. Empty when `id` is unknown.
    pub fn path_to(&self, id: &str) -> Vec<&RegionNode> {
        let Some(path) = self.index.get(id) else {
            return Vec::new();
        };
        (1..=path.len())
            .filter_map(|depth| self.node_at(&path[..depth]))
            .collect()
    }

    /// Every node of `region_type` across the whole forest, in tree order.
    pub fn nodes_of_type(&self, region_type: RegionType) -> Vec<&RegionNode> {
        self.roots
            .iter()
            .flat_map(|root| descendants_by_type(root, region_type))
            .collect()
    }

    fn node_at(&self, path: &[usize]) -> Option<&RegionNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.get(*first)?;
        for &i in rest {
            node = node.children.get(i)?;
        }
        Some(node)
    }
}

fn validate_levels(node: &RegionNode) -> ConsoleResult<()> {
    for child in &node.children {
        if !child.region_type.is_below(node.region_type) {
            return Err(ConsoleError::InvalidHierarchy(format!(
                "{} ({}) cannot sit under {} ({})",
                child.id, child.region_type, node.id, node.region_type
            )));
        }
        validate_levels(child)?;
    }
    Ok(())
}

fn index_node(node: &RegionNode, path: Vec<usize>, index: &mut HashMap<RegionId, Vec<usize>>) {
    if index.contains_key(&node.id) {
        warn!(region_id = %node.id, "Duplicate region id, keeping first occurrence");
    } else {
        index.insert(node.id.clone(), path.clone());
    }
    for (i, child) in node.children.iter().enumerate() {
        let mut child_path = path.clone();
        child_path.push(i);
        index_node(child, child_path, index);
    }
}

/// Depth-first, pre-order walk over a node and all of its descendants.
pub fn pre_order(node: &RegionNode) -> PreOrder<'_> {
    PreOrder { stack: vec![node] }
}

pub struct PreOrder<'a> {
    stack: Vec<&'a RegionNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a RegionNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reversed so the leftmost child is visited first.
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// The node's own id plus every transitive child id.
pub fn descendant_ids(node: &RegionNode) -> HashSet<RegionId> {
    pre_order(node).map(|n| n.id.clone()).collect()
}

/// All nodes of `region_type` in the subtree rooted at `node` (inclusive),
/// in left-to-right tree order.
pub fn descendants_by_type(node: &RegionNode, region_type: RegionType) -> Vec<&RegionNode> {
    pre_order(node)
        .filter(|n| n.region_type == region_type)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, ty: RegionType) -> RegionNode {
        RegionNode::new(id, id, ty)
    }

    fn sample() -> Hierarchy {
        let state = node("ST-01", RegionType::State)
            .with_child(
                node("DIS-01", RegionType::District).with_child(
                    node("DIV-01", RegionType::Division)
                        .with_child(
                            node("CON-01", RegionType::Constituency)
                                .with_child(node("MAN-01", RegionType::Mandal))
                                .with_child(node("MAN-02", RegionType::Mandal)),
                        ),
                ),
            )
            .with_child(
                node("DIS-02", RegionType::District)
                    .with_child(node("MAN-03", RegionType::Mandal)),
            );
        Hierarchy::from_roots(vec![state, node("ST-02", RegionType::State)]).unwrap()
    }

    #[test]
    fn test_find_node() {
        let h = sample();
        assert_eq!(h.find_node("MAN-02").unwrap().region_type, RegionType::Mandal);
        assert!(h.find_node("MAN-99").is_none());
        assert_eq!(h.len(), 9);
    }

    #[test]
    fn test_descendant_ids_self_inclusive() {
        let h = sample();
        let ids = descendant_ids(h.find_node("DIS-01").unwrap());
        let expected: HashSet<RegionId> = ["DIS-01", "DIV-01", "CON-01", "MAN-01", "MAN-02"]
            .into_iter()
            .map(RegionId::from)
            .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_descendants_by_type_preserves_order() {
        let h = sample();
        let mandals: Vec<_> = descendants_by_type(&h.roots()[0], RegionType::Mandal)
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(mandals, vec!["MAN-01", "MAN-02", "MAN-03"]);
    }

    #[test]
    fn test_descendants_by_type_on_leaf() {
        let h = sample();
        let leaf = h.find_node("MAN-01").unwrap();
        let found = descendants_by_type(leaf, RegionType::Mandal);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_str(), "MAN-01");
        assert!(descendants_by_type(leaf, RegionType::District).is_empty());
    }

    #[test]
    fn test_parent_and_path() {
        let h = sample();
        assert_eq!(h.parent_of("MAN-03").unwrap().id.as_str(), "DIS-02");
        assert!(h.parent_of("ST-01").is_none());

        let path: Vec<_> = h.path_to("MAN-01").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(path, vec!["ST-01", "DIS-01", "DIV-01", "CON-01", "MAN-01"]);
        assert!(h.path_to("nowhere").is_empty());
    }

    #[test]
    fn test_nodes_of_type_across_forest() {
        let h = sample();
        let states: Vec<_> = h
            .nodes_of_type(RegionType::State)
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(states, vec!["ST-01", "ST-02"]);
    }

    #[test]
    fn test_rejects_non_state_root() {
        let err = Hierarchy::from_roots(vec![node("DIS-01", RegionType::District)]).unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidHierarchy(_)));
    }

    #[test]
    fn test_rejects_child_not_below_parent() {
        let bad = node("ST-01", RegionType::State).with_child(
            node("DIS-01", RegionType::District).with_child(node("DIS-02", RegionType::District)),
        );
        assert!(Hierarchy::from_roots(vec![bad]).is_err());
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut second = node("MAN-01", RegionType::Mandal);
        second.name = "Shadow".into();
        let state = node("ST-01", RegionType::State)
            .with_child(node("DIS-01", RegionType::District).with_child(node("MAN-01", RegionType::Mandal)))
            .with_child(node("DIS-02", RegionType::District).with_child(second));
        let h = Hierarchy::from_roots(vec![state]).unwrap();
        assert_eq!(h.find_node("MAN-01").unwrap().name, "MAN-01");
    }

    #[test]
    fn test_from_json() {
        let json = r#"[{"id": "ST-01", "name": "Telangana", "type": "State",
            "children": [{"id": "DIS-01", "name": "Hyderabad", "type": "District"}]}]"#;
        let h = Hierarchy::from_json(json).unwrap();
        assert_eq!(h.find_node("DIS-01").unwrap().name, "Hyderabad");
        assert!(Hierarchy::from_json("{not json").is_err());
    }
}
