use generational_arena::{Arena, Index};
use std::fmt;
use termtree::Tree;
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{split_text, DecisionNode, Predicate};

/// Which child slot of its parent a node fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Left,
    Right,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Left => f.write_str("left"),
            Branch::Right => f.write_str("right"),
        }
    }
}

/// Construction state of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildNodeKind {
    /// Not yet answered
    Pending,
    Split {
        attribute: String,
        predicate: Predicate,
        /// Comparison value as typed
        value: String,
    },
    Leaf {
        label: String,
    },
}

/// Node of a tree under construction.
#[derive(Debug)]
pub struct BuildNode {
    pub kind: BuildNodeKind,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<(Index, Branch)>,
    /// Left and right children once the node is a split
    pub children: Option<(Index, Index)>,
    /// Split levels above this node
    pub depth: usize,
    /// Display trail of decisions leading here
    pub path: String,
}

/// Arena holding a partially built decision tree.
///
/// Parent links are explicit indices, so nothing is ever recovered by parsing
/// the display path.
#[derive(Debug)]
pub struct BuildArena {
    arena: Arena<BuildNode>,
    root: Option<Index>,
}

impl Default for BuildArena {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Insert the pending root node.
    pub fn insert_root(&mut self) -> Index {
        let idx = self.arena.insert(BuildNode {
            kind: BuildNodeKind::Pending,
            parent: None,
            children: None,
            depth: 0,
            path: String::new(),
        });
        self.root = Some(idx);
        idx
    }

    pub fn get_node(&self, idx: Index) -> Option<&BuildNode> {
        self.arena.get(idx)
    }

    /// Drop every node, e.g. when a build is abandoned.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
    }

    /// Turn a pending node into a leaf.
    #[instrument(level = "trace", skip(self))]
    pub fn make_leaf(&mut self, idx: Index, label: String) -> DomainResult<()> {
        let node = self.pending_mut(idx)?;
        node.kind = BuildNodeKind::Leaf { label };
        Ok(())
    }

    /// Turn a pending node into a split and insert its two pending children.
    ///
    /// Returns `(left, right)`.
    #[instrument(level = "trace", skip(self))]
    pub fn make_split(
        &mut self,
        idx: Index,
        attribute: String,
        predicate: Predicate,
        value: String,
    ) -> DomainResult<(Index, Index)> {
        let (depth, base) = {
            let node = self.pending_mut(idx)?;
            (node.depth, node.path.clone())
        };
        let step = split_text(&attribute, predicate.condition(), &value);
        let child = |branch: Branch| BuildNode {
            kind: BuildNodeKind::Pending,
            parent: Some((idx, branch)),
            children: None,
            depth: depth + 1,
            path: extend_path(&base, &format!("{} ({})", step, branch)),
        };
        let left = self.arena.insert(child(Branch::Left));
        let right = self.arena.insert(child(Branch::Right));

        let node = self.pending_mut(idx)?;
        node.kind = BuildNodeKind::Split {
            attribute,
            predicate,
            value,
        };
        node.children = Some((left, right));
        Ok((left, right))
    }

    fn pending_mut(&mut self, idx: Index) -> DomainResult<&mut BuildNode> {
        match self.arena.get_mut(idx) {
            Some(node) if node.kind == BuildNodeKind::Pending => Ok(node),
            _ => Err(DomainError::BuildIncomplete),
        }
    }

    /// Convert a fully answered arena into an owned tree.
    pub fn to_decision_tree(&self) -> DomainResult<DecisionNode> {
        let root = self.root.ok_or(DomainError::BuildIncomplete)?;
        self.convert(root)
    }

    fn convert(&self, idx: Index) -> DomainResult<DecisionNode> {
        let node = self.get_node(idx).ok_or(DomainError::BuildIncomplete)?;
        match (&node.kind, node.children) {
            (BuildNodeKind::Leaf { label }, _) => Ok(DecisionNode::leaf(label.clone())),
            (
                BuildNodeKind::Split {
                    attribute,
                    predicate,
                    value,
                },
                Some((left, right)),
            ) => Ok(DecisionNode::split_as_typed(
                attribute.clone(),
                predicate.clone(),
                value.clone(),
                self.convert(left)?,
                self.convert(right)?,
            )),
            _ => Err(DomainError::BuildIncomplete),
        }
    }

    /// Render the partial tree; unanswered nodes show as `?`.
    pub fn to_term_tree(&self) -> Tree<String> {
        fn build(arena: &BuildArena, idx: Index) -> Tree<String> {
            let Some(node) = arena.get_node(idx) else {
                return Tree::new("?".to_string());
            };
            let text = match &node.kind {
                BuildNodeKind::Pending => "?".to_string(),
                BuildNodeKind::Leaf { label } => format!("=> {}", label),
                BuildNodeKind::Split {
                    attribute,
                    predicate,
                    value,
                } => split_text(attribute, predicate.condition(), value),
            };
            let mut tree = Tree::new(text);
            if let Some((left, right)) = node.children {
                tree.push(build(arena, left));
                tree.push(build(arena, right));
            }
            tree
        }

        match self.root {
            Some(root) => build(self, root),
            None => Tree::new("Empty tree".to_string()),
        }
    }
}

fn extend_path(base: &str, step: &str) -> String {
    if base.is_empty() {
        step.to_string()
    } else {
        format!("{} -> {}", base, step)
    }
}
