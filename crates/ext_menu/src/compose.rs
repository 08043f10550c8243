//! Grouping descriptors and mounting the result into the static tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::descriptor::{DescriptorSource, FunctionDescriptor};
use crate::node::NavNode;

/// Category key for descriptors without one
pub const UNCATEGORIZED: &str = "uncategorized";

/// Display order for descriptors without a finite one; an explicit 0 is kept
pub const DEFAULT_ORDER: f64 = 100.0;

/// Fixed routes and labels used by composition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuLayout {
    /// Path of the static node the group is mounted under
    pub mount_point: String,
    /// Identity path of the synthetic group
    pub group_path: String,
    /// Identity name of the synthetic group
    pub group_name: String,
    /// Listing route, parameterized per category
    pub listing_route: String,
    /// Invocation route for descriptors without `menu.path`
    pub invoke_route: String,
    /// Query parameter carrying the function id on leaf paths
    pub id_param: String,
    /// Label of the `uncategorized` bucket
    pub other_label: String,
}

impl Default for MenuLayout {
    fn default() -> Self {
        Self {
            mount_point: "/functions".to_string(),
            group_path: "/functions/registered".to_string(),
            group_name: "Registered".to_string(),
            listing_route: "/functions/list".to_string(),
            invoke_route: "/functions/invoke".to_string(),
            id_param: "function_id".to_string(),
            other_label: "Other".to_string(),
        }
    }
}

/// A descriptor reduced to what the menu needs
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub order: f64,
    pub path: String,
}

fn append_query(base: &str, key: &str, value: &str) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    let value: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
    format!("{base}{sep}{key}={value}")
}

/// Filter visible descriptors and map them to menu items, in input order
pub fn menu_items(descriptors: &[FunctionDescriptor], layout: &MenuLayout) -> Vec<MenuItem> {
    descriptors
        .iter()
        .filter(|d| !d.is_hidden())
        .filter_map(|d| {
            let id = d.id.as_deref().filter(|id| !id.trim().is_empty())?;
            let menu = d.menu.as_ref();
            let category = d
                .category
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(UNCATEGORIZED);
            let order = menu
                .and_then(|m| m.order)
                .filter(|o| o.is_finite())
                .unwrap_or(DEFAULT_ORDER);
            let base = menu
                .and_then(|m| m.path.as_deref())
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(&layout.invoke_route);

            Some(MenuItem {
                id: id.to_string(),
                name: d.label().unwrap_or_else(|| id.to_string()),
                category: category.to_string(),
                order,
                path: append_query(base, &layout.id_param, id),
            })
        })
        .collect()
}

/// Build the synthetic group node from the descriptor catalog.
///
/// Returns `None` when no descriptor survives filtering; callers then leave
/// the static tree alone.
pub fn build_grouped_menu(
    descriptors: &[FunctionDescriptor],
    layout: &MenuLayout,
) -> Option<NavNode> {
    let items = menu_items(descriptors, layout);
    if items.is_empty() {
        return None;
    }

    let mut groups: BTreeMap<String, Vec<MenuItem>> = BTreeMap::new();
    for item in items {
        groups.entry(item.category.clone()).or_default().push(item);
    }

    let categories = groups
        .into_iter()
        .map(|(category, mut items)| {
            items.sort_by(|a, b| a.order.total_cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
            let label = if category == UNCATEGORIZED {
                layout.other_label.clone()
            } else {
                category.clone()
            };
            let leaves = items
                .into_iter()
                .map(|item| NavNode::new(item.name, item.path))
                .collect();
            NavNode::new(label, append_query(&layout.listing_route, "category", &category))
                .with_children(leaves)
        })
        .collect::<Vec<_>>();

    debug!(categories = categories.len(), "composed registered function menu");
    Some(NavNode::new(&layout.group_name, &layout.group_path).with_children(categories))
}

/// Mount `group` under the node at `layout.mount_point`.
///
/// Pure: the input is untouched and a new tree is returned. When the mount
/// node already has a child with the group's path (or name), nothing is added.
pub fn merge_into_tree(
    tree: &[NavNode],
    group: Option<&NavNode>,
    layout: &MenuLayout,
) -> Vec<NavNode> {
    tree.iter()
        .map(|node| merge_node(node, group, layout))
        .collect()
}

fn merge_node(node: &NavNode, group: Option<&NavNode>, layout: &MenuLayout) -> NavNode {
    let mut merged = NavNode {
        path: node.path.clone(),
        name: node.name.clone(),
        children: node
            .children
            .as_deref()
            .map(|children| merge_into_tree(children, group, layout)),
        extra: node.extra.clone(),
    };

    if merged.path.as_deref() != Some(layout.mount_point.as_str()) {
        return merged;
    }
    let Some(group) = group else {
        return merged;
    };

    let children = merged.children.get_or_insert_with(Vec::new);
    if !children.iter().any(|child| child.same_identity(group)) {
        children.push(group.clone());
    }
    merged
}

/// Fetch descriptors and merge them into `tree`.
///
/// A catalog failure is logged and yields the static tree unchanged.
pub async fn compose_navigation(
    source: &dyn DescriptorSource,
    tree: &[NavNode],
    layout: &MenuLayout,
) -> Vec<NavNode> {
    let descriptors = match source.list_descriptors().await {
        Ok(descriptors) => descriptors,
        Err(e) => {
            warn!(error = %e, "descriptor catalog unavailable, using static navigation");
            Vec::new()
        }
    };
    let group = build_grouped_menu(&descriptors, layout);
    merge_into_tree(tree, group.as_ref(), layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::count_nodes;
    use crate::MenuError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn descriptors(value: Value) -> Vec<FunctionDescriptor> {
        serde_json::from_value(value).unwrap()
    }

    fn static_tree() -> Vec<NavNode> {
        NavNode::parse_tree(
            &json!([
                {"path": "/", "name": "Home"},
                {"path": "/admin", "name": "Admin", "routes": [
                    {"path": "/functions", "name": "Functions", "icon": "code", "routes": [
                        {"path": "/functions/all", "name": "All"}
                    ]}
                ]}
            ])
            .to_string(),
        )
        .unwrap()
    }

    fn names(nodes: &[NavNode]) -> Vec<String> {
        nodes.iter().filter_map(|n| n.name.clone()).collect()
    }

    #[test]
    fn test_grouping_is_deterministic() {
        let layout = MenuLayout::default();
        let group = build_grouped_menu(
            &descriptors(json!([
                {"id": "x", "category": "b", "menu": {"order": 5}},
                {"id": "y", "category": "a"},
                {"id": "z", "category": "a", "menu": {"order": 1}}
            ])),
            &layout,
        )
        .unwrap();

        assert_eq!(group.name.as_deref(), Some("Registered"));
        assert_eq!(group.path.as_deref(), Some("/functions/registered"));

        let categories = group.children.as_ref().unwrap();
        assert_eq!(names(categories), vec!["a", "b"]);
        assert_eq!(
            categories[0].path.as_deref(),
            Some("/functions/list?category=a")
        );
        assert_eq!(names(categories[0].children.as_ref().unwrap()), vec!["z", "y"]);
        assert_eq!(names(categories[1].children.as_ref().unwrap()), vec!["x"]);
    }

    #[test]
    fn test_equal_order_sorts_by_name() {
        let group = build_grouped_menu(
            &descriptors(json!([
                {"id": "2", "category": "c", "display_name": {"en": "beta"}},
                {"id": "1", "category": "c", "display_name": {"en": "alpha"}}
            ])),
            &MenuLayout::default(),
        )
        .unwrap();
        let leaves = group.children.unwrap()[0].children.clone().unwrap();
        assert_eq!(names(&leaves), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_hidden_and_invalid_are_excluded() {
        let items = menu_items(
            &descriptors(json!([
                {"id": "shown"},
                {"id": "secret", "menu": {"hidden": true}},
                {"id": ""},
                {"category": "a"}
            ])),
            &MenuLayout::default(),
        );
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["shown"]);
    }

    #[test]
    fn test_item_defaults_and_paths() {
        let items = menu_items(
            &descriptors(json!([
                {"id": "ban", "display_name": {"zh": "封禁", "en": "Ban"}},
                {"id": "mail", "category": " ", "menu": {"path": "/ops/mail?tab=send", "order": 0}},
                {"id": "gift box", "menu": {"path": "/ops/gift"}}
            ])),
            &MenuLayout::default(),
        );

        assert_eq!(
            items[0],
            MenuItem {
                id: "ban".to_string(),
                name: "封禁".to_string(),
                category: UNCATEGORIZED.to_string(),
                order: DEFAULT_ORDER,
                path: "/functions/invoke?function_id=ban".to_string(),
            }
        );
        assert_eq!(items[1].order, 0.0);
        assert_eq!(items[1].path, "/ops/mail?tab=send&function_id=mail");
        assert_eq!(items[2].path, "/ops/gift?function_id=gift+box");
    }

    #[test]
    fn test_uncategorized_label() {
        let group =
            build_grouped_menu(&descriptors(json!([{"id": "a"}])), &MenuLayout::default()).unwrap();
        let category = &group.children.unwrap()[0];
        assert_eq!(category.name.as_deref(), Some("Other"));
        assert_eq!(
            category.path.as_deref(),
            Some("/functions/list?category=uncategorized")
        );
    }

    #[test]
    fn test_empty_descriptors_leave_tree_unchanged() {
        let layout = MenuLayout::default();
        let tree = static_tree();
        let group = build_grouped_menu(&[], &layout);
        assert!(group.is_none());

        let merged = merge_into_tree(&tree, group.as_ref(), &layout);
        assert_eq!(merged, tree);
        assert_eq!(
            serde_json::to_string(&merged).unwrap(),
            serde_json::to_string(&tree).unwrap()
        );
    }

    #[test]
    fn test_merge_mounts_group_once() {
        let layout = MenuLayout::default();
        let tree = static_tree();
        let group = build_grouped_menu(&descriptors(json!([{"id": "a"}])), &layout).unwrap();

        let once = merge_into_tree(&tree, Some(&group), &layout);
        let twice = merge_into_tree(&once, Some(&group), &layout);
        let again = merge_into_tree(&tree, Some(&group), &layout);

        assert_eq!(once, twice);
        assert_eq!(once, again);
        assert_eq!(count_nodes(&once), count_nodes(&tree) + 3);

        let mount = once[1].find("/functions").unwrap();
        assert_eq!(names(mount.children.as_ref().unwrap()), vec!["All", "Registered"]);
        assert_eq!(mount.extra.get("icon"), Some(&json!("code")));
    }

    #[test]
    fn test_merge_detects_group_by_name() {
        let layout = MenuLayout::default();
        let group = build_grouped_menu(&descriptors(json!([{"id": "a"}])), &layout).unwrap();
        let tree = vec![NavNode::new("Functions", "/functions").with_children(vec![NavNode {
            name: Some("Registered".to_string()),
            ..NavNode::default()
        }])];

        let merged = merge_into_tree(&tree, Some(&group), &layout);
        assert_eq!(merged, tree);
    }

    #[test]
    fn test_merge_is_pure() {
        let layout = MenuLayout::default();
        let tree = static_tree();
        let snapshot = tree.clone();
        let group = build_grouped_menu(&descriptors(json!([{"id": "a"}])), &layout).unwrap();

        let merged = merge_into_tree(&tree, Some(&group), &layout);
        assert_ne!(merged, tree);
        assert_eq!(tree, snapshot);
    }

    #[test]
    fn test_mount_without_children_and_missing_mount() {
        let layout = MenuLayout::default();
        let group = build_grouped_menu(&descriptors(json!([{"id": "a"}])), &layout).unwrap();

        let bare = vec![NavNode::new("Functions", "/functions")];
        let merged = merge_into_tree(&bare, Some(&group), &layout);
        assert_eq!(merged[0].children.as_ref().unwrap().len(), 1);

        let elsewhere = vec![NavNode::new("Home", "/")];
        assert_eq!(merge_into_tree(&elsewhere, Some(&group), &layout), elsewhere);
    }

    #[test]
    fn test_merged_tree_mirrors_routes() {
        let layout = MenuLayout::default();
        let group = build_grouped_menu(&descriptors(json!([{"id": "a"}])), &layout).unwrap();
        let merged = merge_into_tree(&static_tree(), Some(&group), &layout);

        let out = serde_json::to_value(&merged).unwrap();
        let mount = &out[1]["children"][0];
        assert_eq!(mount["children"], mount["routes"]);
        assert_eq!(mount["routes"][1]["name"], json!("Registered"));
    }

    struct FailingSource;

    #[async_trait]
    impl DescriptorSource for FailingSource {
        async fn list_descriptors(&self) -> Result<Vec<FunctionDescriptor>, MenuError> {
            Err(MenuError::descriptor_fetch("connection refused"))
        }
    }

    struct FixedSource(Vec<FunctionDescriptor>);

    #[async_trait]
    impl DescriptorSource for FixedSource {
        async fn list_descriptors(&self) -> Result<Vec<FunctionDescriptor>, MenuError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_malformed_rows_keep_valid_entries() {
        let layout = MenuLayout::default();
        let envelope = serde_json::from_value(json!([{"id": "kick"}, null])).unwrap();
        let source = FixedSource(crate::decode_descriptors(envelope));

        let composed = compose_navigation(&source, &static_tree(), &layout).await;
        let group = composed[1].find("/functions/registered").unwrap();
        let leaves = group.children.as_ref().unwrap()[0].children.clone().unwrap();
        assert_eq!(names(&leaves), vec!["kick"]);
        assert_eq!(
            leaves[0].path.as_deref(),
            Some("/functions/invoke?function_id=kick")
        );
    }

    #[tokio::test]
    async fn test_compose_navigation() {
        let layout = MenuLayout::default();
        let tree = static_tree();

        let unchanged = compose_navigation(&FailingSource, &tree, &layout).await;
        assert_eq!(unchanged, tree);

        let source = FixedSource(vec![FunctionDescriptor::new("reload")]);
        let composed = compose_navigation(&source, &tree, &layout).await;
        assert!(composed[1].find("/functions/registered").is_some());
    }
}
