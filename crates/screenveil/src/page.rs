//! In-memory page model.
//!
//! A minimal document tree standing in for the DOM of an observed page:
//! element nodes with attributes and ordered children, and text nodes
//! holding content. Every mutating operation appends a [`MutationRecord`]
//! to an internal queue that observers drain with [`Page::take_records`],
//! mirroring the `childList`/`subtree`/`attributes` observer contract.
//!
//! Operations addressing a node that was already removed are silent no-ops.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Handle to a node in a [`Page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// The content of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// An element with a tag name, attributes, and ordered children.
    Element {
        /// Tag name, e.g. `div` or `span`.
        tag: String,
        /// Attribute name/value pairs.
        attributes: BTreeMap<String, String>,
        /// Child nodes in document order.
        children: Vec<NodeId>,
    },
    /// A text node.
    Text {
        /// The text content.
        content: String,
    },
}

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    kind: NodeKind,
    alive: bool,
}

/// What changed in a single mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    /// Children of the target were added or removed.
    ChildList {
        /// Nodes added under the target.
        added: Vec<NodeId>,
        /// Nodes removed from under the target.
        removed: Vec<NodeId>,
    },
    /// The target text node's content changed.
    CharacterData,
    /// An attribute of the target changed.
    Attributes {
        /// Name of the changed attribute.
        name: String,
    },
}

/// A recorded mutation, queued until an observer drains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// The node the mutation applies to (the parent for child-list changes).
    pub target: NodeId,
    /// What changed.
    pub kind: MutationKind,
    /// When the mutation was recorded.
    pub timestamp: DateTime<Utc>,
}

/// An in-memory document tree with mutation records.
#[derive(Debug)]
pub struct Page {
    nodes: Vec<Node>,
    root: NodeId,
    records: Vec<MutationRecord>,
}

impl Page {
    /// Create a page with an empty `body` root element.
    #[must_use]
    pub fn new() -> Self {
        let root_node = Node {
            parent: None,
            kind: NodeKind::Element {
                tag: "body".to_string(),
                attributes: BTreeMap::new(),
                children: Vec::new(),
            },
            alive: true,
        };
        Self {
            nodes: vec![root_node],
            root: NodeId(0),
            records: Vec::new(),
        }
    }

    /// The root element of the page.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether the node exists and has not been removed.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(|n| n.alive)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).filter(|n| n.alive)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).filter(|n| n.alive)
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            kind,
            alive: true,
        });
        id
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        self.records.push(MutationRecord {
            target,
            kind,
            timestamp: Utc::now(),
        });
    }

    /// Create a detached element node.
    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Text {
            content: content.into(),
        })
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// Detaches the child from its previous parent first. Returns `false`
    /// (no-op) if either node is missing, the parent is not an element, or
    /// the append would create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.node(parent).is_none() || self.node(child).is_none() || parent == child {
            return false;
        }
        if self.is_descendant_of(parent, child) {
            return false;
        }
        if !matches!(self.node(parent).map(|n| &n.kind), Some(NodeKind::Element { .. })) {
            return false;
        }

        self.detach(child);

        if let Some(Node {
            kind: NodeKind::Element { children, .. },
            ..
        }) = self.nodes.get_mut(parent.0)
        {
            children.push(child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        self.record(
            parent,
            MutationKind::ChildList {
                added: vec![child],
                removed: Vec::new(),
            },
        );
        true
    }

    /// Replace `old` with `replacements` at the same position under its
    /// parent.
    ///
    /// The old node (and its subtree) is removed. Returns `false` (no-op) if
    /// the old node is missing or has no parent.
    pub fn replace_with(&mut self, old: NodeId, replacements: &[NodeId]) -> bool {
        let Some(parent) = self.node(old).and_then(|n| n.parent) else {
            return false;
        };
        if replacements.iter().any(|&r| self.node(r).is_none()) {
            return false;
        }

        let Some(Node {
            kind: NodeKind::Element { children, .. },
            ..
        }) = self.nodes.get_mut(parent.0)
        else {
            return false;
        };
        let Some(index) = children.iter().position(|&c| c == old) else {
            return false;
        };
        let _ = children.splice(index..=index, replacements.iter().copied());

        for &r in replacements {
            if let Some(node) = self.node_mut(r) {
                node.parent = Some(parent);
            }
        }
        self.kill_subtree(old);
        self.record(
            parent,
            MutationKind::ChildList {
                added: replacements.to_vec(),
                removed: vec![old],
            },
        );
        true
    }

    /// Remove a node and its subtree from the page.
    ///
    /// Returns `false` (no-op) if the node is missing or is the root.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if id == self.root || self.node(id).is_none() {
            return false;
        }
        let parent = self.node(id).and_then(|n| n.parent);
        self.detach(id);
        self.kill_subtree(id);
        if let Some(parent) = parent {
            self.record(
                parent,
                MutationKind::ChildList {
                    added: Vec::new(),
                    removed: vec![id],
                },
            );
        }
        true
    }

    /// Set the content of a text node.
    ///
    /// Returns `false` (no-op) if the node is missing or not a text node.
    pub fn set_text(&mut self, id: NodeId, content: impl Into<String>) -> bool {
        match self.node_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Text { content: c }) => {
                *c = content.into();
                self.record(id, MutationKind::CharacterData);
                true
            }
            _ => false,
        }
    }

    /// Set an attribute on an element node.
    ///
    /// Returns `false` (no-op) if the node is missing or not an element.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> bool {
        let name = name.into();
        match self.node_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Element { attributes, .. }) => {
                attributes.insert(name.clone(), value.into());
                self.record(id, MutationKind::Attributes { name });
                true
            }
            _ => false,
        }
    }

    /// Get an attribute value of an element node.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Element { attributes, .. }) => {
                attributes.get(name).map(String::as_str)
            }
            _ => None,
        }
    }

    /// The tag name of an element node.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Element { tag, .. }) => Some(tag.as_str()),
            _ => None,
        }
    }

    /// The content of a text node.
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Text { content }) => Some(content.as_str()),
            _ => None,
        }
    }

    /// The children of an element node (empty for text/missing nodes).
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Element { children, .. }) => children,
            _ => &[],
        }
    }

    /// The parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Whether `id` is a descendant of `ancestor` (or is `ancestor`).
    #[must_use]
    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parent(c);
        }
        false
    }

    /// Concatenated content of all text nodes under `id`, in document order.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.node(current).map(|n| &n.kind) {
                Some(NodeKind::Text { content }) => out.push_str(content),
                Some(NodeKind::Element { children, .. }) => {
                    stack.extend(children.iter().rev().copied());
                }
                None => {}
            }
        }
        out
    }

    /// All text node ids under `id`, in document order.
    #[must_use]
    pub fn descendant_text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.node(current).map(|n| &n.kind) {
                Some(NodeKind::Text { .. }) => out.push(current),
                Some(NodeKind::Element { children, .. }) => {
                    stack.extend(children.iter().rev().copied());
                }
                None => {}
            }
        }
        out
    }

    /// Merge adjacent text-node children throughout the subtree under `id`.
    ///
    /// Used after unwrapping redactions so the restored text is a single
    /// node again.
    pub fn normalize(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let children: Vec<NodeId> = self.children(current).to_vec();
            if children.is_empty() {
                continue;
            }

            let mut merged: Vec<NodeId> = Vec::with_capacity(children.len());
            let mut removed: Vec<NodeId> = Vec::new();
            for child in children {
                let is_text = matches!(
                    self.node(child).map(|n| &n.kind),
                    Some(NodeKind::Text { .. })
                );
                if is_text {
                    if let Some(&prev) = merged.last() {
                        if let Some(prev_text) = self.text(prev).map(str::to_string) {
                            let content = self.text(child).unwrap_or_default().to_string();
                            if let Some(NodeKind::Text { content: c }) =
                                self.node_mut(prev).map(|n| &mut n.kind)
                            {
                                *c = format!("{prev_text}{content}");
                            }
                            removed.push(child);
                            continue;
                        }
                    }
                    merged.push(child);
                } else {
                    merged.push(child);
                    stack.push(child);
                }
            }

            if !removed.is_empty() {
                if let Some(Node {
                    kind: NodeKind::Element { children, .. },
                    ..
                }) = self.nodes.get_mut(current.0)
                {
                    children.retain(|c| !removed.contains(c));
                }
                for r in &removed {
                    self.kill_subtree(*r);
                }
                self.record(
                    current,
                    MutationKind::ChildList {
                        added: Vec::new(),
                        removed,
                    },
                );
            }
        }
    }

    /// Drain the queued mutation records.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    /// Number of queued mutation records.
    #[must_use]
    pub fn pending_records(&self) -> usize {
        self.records.len()
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).and_then(|n| n.parent) else {
            return;
        };
        if let Some(Node {
            kind: NodeKind::Element { children, .. },
            ..
        }) = self.nodes.get_mut(parent.0)
        {
            children.retain(|&c| c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    fn kill_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(NodeKind::Element { children, .. }) =
                self.node(current).map(|n| &n.kind)
            {
                stack.extend(children.iter().copied());
            }
            if let Some(node) = self.nodes.get_mut(current.0) {
                node.alive = false;
                node.parent = None;
            }
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}
