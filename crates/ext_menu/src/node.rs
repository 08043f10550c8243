//! Navigation tree nodes.
//!
//! Internally a node has one canonical `children` field. Consumers of the
//! serialized tree read either `children` or `routes`, so the serde boundary
//! reads whichever is present (preferring `children`) and always writes both.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::MenuError;

/// One entry of the navigation tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ExternalNode", into = "ExternalNode")]
pub struct NavNode {
    pub path: Option<String>,
    pub name: Option<String>,
    pub children: Option<Vec<NavNode>>,
    /// Any other attributes (icon, component, access, ...), preserved verbatim
    pub extra: Map<String, Value>,
}

impl NavNode {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_children(mut self, children: Vec<NavNode>) -> Self {
        self.children = Some(children);
        self
    }

    /// Same identity: equal path, or equal name when a path is missing upstream
    pub fn same_identity(&self, other: &NavNode) -> bool {
        let same_path = self.path.is_some() && self.path == other.path;
        let same_name = self.name.is_some() && self.name == other.name;
        same_path || same_name
    }

    /// Depth-first search by path
    pub fn find(&self, path: &str) -> Option<&NavNode> {
        if self.path.as_deref() == Some(path) {
            return Some(self);
        }
        self.children
            .iter()
            .flatten()
            .find_map(|child| child.find(path))
    }

    /// Parse a serialized tree: a single root node or an array of nodes
    pub fn parse_tree(source: &str) -> Result<Vec<NavNode>, MenuError> {
        let value: Value = serde_json::from_str(source)?;
        match value {
            Value::Array(_) => Ok(serde_json::from_value(value)?),
            Value::Object(_) => Ok(vec![serde_json::from_value(value)?]),
            other => Err(MenuError::decode(format!(
                "navigation tree must be an object or array, got {other}"
            ))),
        }
    }
}

/// Total number of nodes in a forest
pub fn count_nodes(nodes: &[NavNode]) -> usize {
    nodes
        .iter()
        .map(|n| 1 + n.children.as_deref().map(count_nodes).unwrap_or(0))
        .sum()
}

#[derive(Serialize, Deserialize)]
struct ExternalNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<NavNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    routes: Option<Vec<NavNode>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<ExternalNode> for NavNode {
    fn from(node: ExternalNode) -> Self {
        Self {
            path: node.path,
            name: node.name,
            children: node.children.or(node.routes),
            extra: node.extra,
        }
    }
}

impl From<NavNode> for ExternalNode {
    fn from(node: NavNode) -> Self {
        Self {
            path: node.path,
            name: node.name,
            routes: node.children.clone(),
            children: node.children,
            extra: node.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_routes_are_read_and_mirrored() {
        let node: NavNode = serde_json::from_value(json!({
            "path": "/ops",
            "name": "Ops",
            "icon": "tool",
            "routes": [{"path": "/ops/a", "name": "A"}]
        }))
        .unwrap();

        assert_eq!(node.children.as_ref().unwrap().len(), 1);
        assert_eq!(node.extra.get("icon"), Some(&json!("tool")));

        let out = serde_json::to_value(&node).unwrap();
        assert_eq!(out["children"], out["routes"]);
        assert_eq!(out["routes"][0]["path"], json!("/ops/a"));
        assert_eq!(out["icon"], json!("tool"));
    }

    #[test]
    fn test_children_preferred_over_routes() {
        let node: NavNode = serde_json::from_value(json!({
            "path": "/x",
            "children": [{"path": "/x/c"}],
            "routes": [{"path": "/x/r"}]
        }))
        .unwrap();
        let kids = node.children.unwrap();
        assert_eq!(kids[0].path.as_deref(), Some("/x/c"));
    }

    #[test]
    fn test_leaf_has_no_child_fields() {
        let out = serde_json::to_value(NavNode::new("Leaf", "/leaf")).unwrap();
        assert_eq!(out, json!({"path": "/leaf", "name": "Leaf"}));
    }

    #[test]
    fn test_parse_tree_shapes() {
        let forest = NavNode::parse_tree(r#"[{"path": "/a"}, {"path": "/b"}]"#).unwrap();
        assert_eq!(forest.len(), 2);

        let single = NavNode::parse_tree(r#"{"path": "/", "routes": [{"path": "/a"}]}"#).unwrap();
        assert_eq!(count_nodes(&single), 2);

        assert!(NavNode::parse_tree("42").is_err());
    }

    #[test]
    fn test_identity_and_find() {
        let tree = NavNode::new("Root", "/").with_children(vec![
            NavNode::new("Functions", "/functions")
                .with_children(vec![NavNode::new("Registered", "/functions/registered")]),
        ]);
        assert!(tree.find("/functions/registered").is_some());
        assert!(tree.find("/nope").is_none());

        let nameless_path = NavNode {
            name: Some("Registered".to_string()),
            ..NavNode::default()
        };
        assert!(nameless_path.same_identity(&NavNode::new("Registered", "/elsewhere")));
        assert!(!NavNode::default().same_identity(&NavNode::default()));
    }
}
