//! The policy graph.
//!
//! Nodes live in an id-indexed arena. Each entry keeps both its parent and
//! child adjacency sets, so every traversal is a chain of id lookups and the
//! structure never holds references into itself.


use crate::error::{require_non_empty, NgacError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{btree_set, BTreeMap, BTreeSet, HashSet};
use std::fmt;
use tracing::debug;

/// The five node kinds of the policy graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeType {
    #[serde(rename = "U")]
    User,
    #[serde(rename = "UA")]
    UserAttribute,
    #[serde(rename = "O")]
    Object,
    #[serde(rename = "OA")]
    ObjectAttribute,
    #[serde(rename = "PC")]
    PolicyClass,
}

impl NodeType {
    /// Whether a node of this type may be assigned to a node of `parent` type.
    pub fn can_assign_to(self, parent: NodeType) -> bool {
        use NodeType::*;
        matches!(
            (self, parent),
            (User, UserAttribute)
                | (UserAttribute, UserAttribute)
                | (UserAttribute, PolicyClass)
                | (Object, ObjectAttribute)
                | (ObjectAttribute, ObjectAttribute)
                | (ObjectAttribute, PolicyClass)
        )
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            NodeType::User => "U",
            NodeType::UserAttribute => "UA",
            NodeType::Object => "O",
            NodeType::ObjectAttribute => "OA",
            NodeType::PolicyClass => "PC",
        };
        write!(f, "{}", tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

/// Which way to walk assignment edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Child to parent: "is contained in".
    Ascending,
    /// Parent to child.
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeEntry {
    node: PolicyNode,
    parents: BTreeSet<String>,
    children: BTreeSet<String>,
}

impl NodeEntry {
    fn new(node: PolicyNode) -> Self {
        Self {
            node,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "GraphDocument", try_from = "GraphDocument")]
pub struct PolicyGraph {
    nodes: BTreeMap<String, NodeEntry>,
    // ua -> target -> permissions
    associations: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

impl PolicyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node and assign it to every listed parent.
    ///
    /// Nothing is inserted unless every check passes: the id must be new,
    /// every parent must exist, and each edge must respect the assignment
    /// rules of [`NodeType::can_assign_to`]. Policy classes take no parents;
    /// every other node needs at least one.
    pub fn create_node(
        &mut self,
        id: &str,
        kind: NodeType,
        properties: BTreeMap<String, String>,
        parents: &[&str],
    ) -> Result<()> {
        require_non_empty("node id", id)?;
        if self.nodes.contains_key(id) {
            return Err(NgacError::DuplicateNode(id.to_string()));
        }

        let parents: BTreeSet<&str> = parents.iter().copied().collect();
        for parent in &parents {
            let parent_node = self
                .node(parent)
                .ok_or_else(|| NgacError::NodeNotFound(parent.to_string()))?;
            if !kind.can_assign_to(parent_node.kind) {
                return Err(NgacError::InvalidAssignment {
                    child: id.to_string(),
                    parent: parent.to_string(),
                    reason: format!("{} nodes cannot be assigned to {} nodes", kind, parent_node.kind),
                });
            }
        }

        match (kind, parents.is_empty()) {
            (NodeType::PolicyClass, false) => {
                return Err(NgacError::InvalidAssignment {
                    child: id.to_string(),
                    parent: parents.iter().next().map(|p| p.to_string()).unwrap_or_default(),
                    reason: "policy classes cannot have parents".to_string(),
                })
            }
            (NodeType::PolicyClass, true) => {}
            (_, true) => {
                return Err(NgacError::InvalidAssignment {
                    child: id.to_string(),
                    parent: String::new(),
                    reason: "node must be assigned to at least one parent".to_string(),
                })
            }
            _ => {}
        }

        debug!("Creating {} node {} under {:?}", kind, id, parents);
        let mut entry = NodeEntry::new(PolicyNode {
            name: id.to_string(),
            kind,
            properties,
        });
        for parent in &parents {
            entry.parents.insert(parent.to_string());
            if let Some(parent_entry) = self.nodes.get_mut(*parent) {
                parent_entry.children.insert(id.to_string());
            }
        }
        self.nodes.insert(id.to_string(), entry);
        Ok(())
    }

    /// Add the assignment edge `child -> parent`.
    ///
    /// Returns `false` if the edge already existed.
    pub fn assign(&mut self, child: &str, parent: &str) -> Result<bool> {
        let child_kind = self.kind_of(child)?;
        let parent_kind = self.kind_of(parent)?;
        if !child_kind.can_assign_to(parent_kind) {
            return Err(NgacError::InvalidAssignment {
                child: child.to_string(),
                parent: parent.to_string(),
                reason: format!("{} nodes cannot be assigned to {} nodes", child_kind, parent_kind),
            });
        }
        if self.is_assigned(child, parent) {
            return Ok(false);
        }
        if self.reachable(parent, Direction::Ascending)?.contains(child) {
            return Err(NgacError::InvalidAssignment {
                child: child.to_string(),
                parent: parent.to_string(),
                reason: "assignment would create a cycle".to_string(),
            });
        }

        debug!("Assigning {} to {}", child, parent);
        self.link(child, parent);
        Ok(true)
    }

    /// Grant `permissions` to `ua` over `target`, replacing any previous grant
    /// between the same pair.
    pub fn associate<I, S>(&mut self, ua: &str, target: &str, permissions: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ua_kind = self.kind_of(ua)?;
        let target_kind = self.kind_of(target)?;
        let invalid = |reason: &str| NgacError::InvalidAssociation {
            source_id: ua.to_string(),
            target: target.to_string(),
            reason: reason.to_string(),
        };

        if ua_kind != NodeType::UserAttribute {
            return Err(invalid("source must be a user attribute"));
        }
        if !matches!(target_kind, NodeType::Object | NodeType::ObjectAttribute) {
            return Err(invalid("target must be an object or object attribute"));
        }
        let permissions: BTreeSet<String> = permissions.into_iter().map(Into::into).collect();
        if permissions.is_empty() || permissions.iter().any(|p| p.is_empty()) {
            return Err(invalid("permission set must be non-empty"));
        }

        debug!("Associating {} with {}: {:?}", ua, target, permissions);
        self.associations
            .entry(ua.to_string())
            .or_default()
            .insert(target.to_string(), permissions);
        Ok(())
    }

    /// All nodes reachable from `start` in `direction`, `start` included.
    ///
    /// A node reached twice along different paths is fine. A node reached
    /// again while it is still on the current path is a cycle.
    pub fn reachable(&self, start: &str, direction: Direction) -> Result<BTreeSet<String>> {
        let mut visited = BTreeSet::new();
        let mut path = HashSet::new();
        let mut stack = Vec::new();
        let (start_id, _) = self
            .nodes
            .get_key_value(start)
            .ok_or_else(|| NgacError::NodeNotFound(start.to_string()))?;
        path.insert(start_id.as_str());
        stack.push((start_id.as_str(), self.neighbours(start_id, direction)));

        loop {
            let step = match stack.last_mut() {
                Some((_, next)) => next.as_mut().and_then(|it| it.next()),
                None => break,
            };
            match step {
                Some(neighbour) => {
                    let neighbour = neighbour.as_str();
                    if path.contains(neighbour) {
                        return Err(NgacError::CycleDetected(neighbour.to_string()));
                    }
                    if visited.contains(neighbour) {
                        continue;
                    }
                    path.insert(neighbour);
                    stack.push((neighbour, self.neighbours(neighbour, direction)));
                }
                None => {
                    if let Some((id, _)) = stack.pop() {
                        path.remove(id);
                        visited.insert(id.to_string());
                    }
                }
            }
        }
        Ok(visited)
    }

    fn neighbours(&self, id: &str, direction: Direction) -> Option<btree_set::Iter<'_, String>> {
        self.nodes.get(id).map(|entry| match direction {
            Direction::Ascending => entry.parents.iter(),
            Direction::Descending => entry.children.iter(),
        })
    }

    /// The (target, permissions) grants attached directly to `ua`.
    pub fn associations(&self, ua: &str) -> Result<impl Iterator<Item = (&str, &BTreeSet<String>)>> {
        if !self.exists(ua) {
            return Err(NgacError::NodeNotFound(ua.to_string()));
        }
        Ok(self
            .associations
            .get(ua)
            .into_iter()
            .flatten()
            .map(|(target, ops)| (target.as_str(), ops)))
    }

    pub fn node(&self, id: &str) -> Option<&PolicyNode> {
        self.nodes.get(id).map(|entry| &entry.node)
    }

    pub fn exists(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PolicyNode> {
        self.nodes.values().map(|entry| &entry.node)
    }

    pub fn parents(&self, id: &str) -> Result<&BTreeSet<String>> {
        self.entry(id).map(|entry| &entry.parents)
    }

    pub fn children(&self, id: &str) -> Result<&BTreeSet<String>> {
        self.entry(id).map(|entry| &entry.children)
    }

    pub fn is_assigned(&self, child: &str, parent: &str) -> bool {
        self.nodes
            .get(child)
            .is_some_and(|entry| entry.parents.contains(parent))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn entry(&self, id: &str) -> Result<&NodeEntry> {
        self.nodes
            .get(id)
            .ok_or_else(|| NgacError::NodeNotFound(id.to_string()))
    }

    fn kind_of(&self, id: &str) -> Result<NodeType> {
        self.entry(id).map(|entry| entry.node.kind)
    }

    fn link(&mut self, child: &str, parent: &str) {
        if let Some(entry) = self.nodes.get_mut(child) {
            entry.parents.insert(parent.to_string());
        }
        if let Some(entry) = self.nodes.get_mut(parent) {
            entry.children.insert(child.to_string());
        }
    }
}

/// Serialized form of a [`PolicyGraph`], emitted in sorted order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GraphDocument {
    #[serde(default)]
    nodes: Vec<PolicyNode>,
    #[serde(default)]
    assignments: Vec<(String, String)>,
    #[serde(default)]
    associations: Vec<AssociationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AssociationRecord {
    source: String,
    target: String,
    operations: BTreeSet<String>,
}

impl From<PolicyGraph> for GraphDocument {
    fn from(graph: PolicyGraph) -> Self {
        let mut doc = GraphDocument::default();
        for (id, entry) in graph.nodes {
            doc.assignments
                .extend(entry.parents.into_iter().map(|parent| (id.clone(), parent)));
            doc.nodes.push(entry.node);
        }
        for (source, grants) in graph.associations {
            for (target, operations) in grants {
                doc.associations.push(AssociationRecord {
                    source: source.clone(),
                    target,
                    operations,
                });
            }
        }
        doc
    }
}

impl TryFrom<GraphDocument> for PolicyGraph {
    type Error = NgacError;

    // Cycles are left for `reachable` to report.
    fn try_from(doc: GraphDocument) -> Result<Self> {
        let mut graph = PolicyGraph::new();
        for node in doc.nodes {
            if graph.exists(&node.name) {
                return Err(NgacError::DuplicateNode(node.name));
            }
            graph.nodes.insert(node.name.clone(), NodeEntry::new(node));
        }
        for (child, parent) in doc.assignments {
            let child_kind = graph.kind_of(&child)?;
            let parent_kind = graph.kind_of(&parent)?;
            if !child_kind.can_assign_to(parent_kind) {
                return Err(NgacError::InvalidAssignment {
                    reason: format!("{} nodes cannot be assigned to {} nodes", child_kind, parent_kind),
                    child,
                    parent,
                });
            }
            graph.link(&child, &parent);
        }
        for record in doc.associations {
            graph.associate(&record.source, &record.target, record.operations)?;
        }
        Ok(graph)
    }
}
