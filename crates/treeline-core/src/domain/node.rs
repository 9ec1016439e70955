//! Remote node snapshot and visible listing entries
//!
//! `RemoteNode` is an immutable snapshot of remote provider state at
//! fetch time. `VisibleNode` is the annotated entry returned by listing
//! operations, carrying the permission and expandability flags the
//! caller renders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::NodeId;

/// Node classification reported by the remote provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A container node that can hold children
    Folder,
    /// A leaf content node
    File,
}

impl NodeKind {
    /// Sort rank: folders always precede files
    fn rank(self) -> u8 {
        match self {
            NodeKind::Folder => 0,
            NodeKind::File => 1,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Folder => write!(f, "folder"),
            NodeKind::File => write!(f, "file"),
        }
    }
}

/// Permission annotation on a visible node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// The node (or its subtree root) has been granted read access
    Read,
    /// No permission granted
    None,
}

/// Immutable snapshot of a remote node at fetch time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNode {
    /// Provider-assigned identifier
    pub id: NodeId,
    /// Parent identifier (None for roots and drives)
    pub parent_id: Option<NodeId>,
    /// Display name
    pub name: String,
    /// Folder or file
    pub kind: NodeKind,
    /// Last-modified timestamp, when the provider reports one
    pub modified_at: Option<DateTime<Utc>>,
    /// External view URL, when the provider reports one
    pub web_url: Option<String>,
}

/// A listing entry annotated for the caller
///
/// Produced by `listVisibleNodes`; ordering within a result set is
/// deterministic regardless of remote ordering (see [`sort_visible`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleNode {
    /// Provider-assigned identifier
    pub id: NodeId,
    /// Parent identifier (None for roots and drives)
    pub parent_id: Option<NodeId>,
    /// Display title
    pub title: String,
    /// Folder or file
    pub kind: NodeKind,
    /// Whether the subtree containing this node is in scope
    pub permission: Permission,
    /// Whether the node has at least one locally mirrored child
    pub expandable: bool,
    /// Last-modified timestamp from the remote snapshot
    pub updated_at: Option<DateTime<Utc>>,
    /// External view URL
    pub web_url: Option<String>,
}

impl VisibleNode {
    /// Builds a visible node from a remote snapshot
    pub fn from_remote(node: RemoteNode, permission: Permission, expandable: bool) -> Self {
        Self {
            id: node.id,
            parent_id: node.parent_id,
            title: node.name,
            kind: node.kind,
            permission,
            expandable,
            updated_at: node.modified_at,
            web_url: node.web_url,
        }
    }
}

/// Sorts a result set into the externally guaranteed order:
/// folders before files, then case-sensitive lexicographic by title.
///
/// Ties on (kind, title) fall back to the node id so the order is total.
pub fn sort_visible(nodes: &mut [VisibleNode]) {
    nodes.sort_by(|a, b| {
        a.kind
            .rank()
            .cmp(&b.kind.rank())
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.id.as_str().cmp(b.id.as_str()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, title: &str, kind: NodeKind) -> VisibleNode {
        VisibleNode {
            id: NodeId::new(id.to_string()).unwrap(),
            parent_id: None,
            title: title.to_string(),
            kind,
            permission: Permission::None,
            expandable: false,
            updated_at: None,
            web_url: None,
        }
    }

    #[test]
    fn test_folders_precede_files() {
        let mut nodes = vec![
            node("a", "alpha.txt", NodeKind::File),
            node("b", "zebra", NodeKind::Folder),
        ];
        sort_visible(&mut nodes);
        assert_eq!(nodes[0].title, "zebra");
        assert_eq!(nodes[1].title, "alpha.txt");
    }

    #[test]
    fn test_titles_sort_case_sensitively() {
        let mut nodes = vec![
            node("a", "beta", NodeKind::Folder),
            node("b", "Alpha", NodeKind::Folder),
            node("c", "alpha", NodeKind::Folder),
        ];
        sort_visible(&mut nodes);
        // Uppercase sorts before lowercase in a case-sensitive comparison
        assert_eq!(nodes[0].title, "Alpha");
        assert_eq!(nodes[1].title, "alpha");
        assert_eq!(nodes[2].title, "beta");
    }

    #[test]
    fn test_order_is_stable_across_calls() {
        let build = || {
            vec![
                node("f2", "docs", NodeKind::File),
                node("f1", "docs", NodeKind::File),
                node("d1", "docs", NodeKind::Folder),
            ]
        };
        let mut first = build();
        let mut second = build();
        second.reverse();
        sort_visible(&mut first);
        sort_visible(&mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn test_from_remote_carries_fields() {
        let remote = RemoteNode {
            id: NodeId::new("F1".to_string()).unwrap(),
            parent_id: None,
            name: "Docs".to_string(),
            kind: NodeKind::Folder,
            modified_at: None,
            web_url: Some("https://drive.example.com/F1".to_string()),
        };
        let visible = VisibleNode::from_remote(remote, Permission::Read, true);
        assert_eq!(visible.title, "Docs");
        assert_eq!(visible.permission, Permission::Read);
        assert!(visible.expandable);
        assert_eq!(
            visible.web_url.as_deref(),
            Some("https://drive.example.com/F1")
        );
    }
}
