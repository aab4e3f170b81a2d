//! Prompt-driven decision tree construction.
//!
//! [`TreeBuilder`] is a state machine: it exposes the question it is waiting on via
//! [`TreeBuilder::next_prompt`] and advances when answered. Nodes are asked
//! depth-first, pre-order, left subtree before right. [`build_tree`] drives the
//! machine against a [`BuildCollaborator`], which is how the terminal front-end and
//! scripted tests plug in.

use generational_arena::Index;
use tracing::{debug, instrument, trace};

use crate::domain::arena::BuildArena;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{Condition, DecisionNode, Predicate};

/// Default attribute answer that turns the current node into a leaf.
pub const DEFAULT_LEAF_SENTINEL: &str = "result";

/// Default bound on split levels.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Question the builder is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    AttributeOrLeaf { path: String },
    LeafLabel { path: String },
    SplitValueAndCondition { attribute: String, path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BuildState {
    AwaitingAttribute(Index),
    AwaitingLabel(Index),
    AwaitingSplit { node: Index, attribute: String },
    Complete,
    Aborted,
    Failed,
}

impl BuildState {
    fn name(&self) -> &'static str {
        match self {
            BuildState::AwaitingAttribute(_) => "attribute",
            BuildState::AwaitingLabel(_) => "leaf label",
            BuildState::AwaitingSplit { .. } => "split value and condition",
            BuildState::Complete => "nothing (complete)",
            BuildState::Aborted => "nothing (aborted)",
            BuildState::Failed => "nothing (failed)",
        }
    }
}

/// Single-use builder for one decision tree.
#[derive(Debug)]
pub struct TreeBuilder {
    arena: BuildArena,
    /// Nodes still to be asked; the next one is on top
    pending: Vec<Index>,
    state: BuildState,
    max_depth: usize,
    leaf_sentinel: String,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, DEFAULT_LEAF_SENTINEL)
    }
}

impl TreeBuilder {
    pub fn new(max_depth: usize, leaf_sentinel: impl Into<String>) -> Self {
        let mut arena = BuildArena::new();
        let root = arena.insert_root();
        Self {
            arena,
            pending: Vec::new(),
            state: BuildState::AwaitingAttribute(root),
            max_depth,
            leaf_sentinel: leaf_sentinel.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == BuildState::Complete
    }

    pub fn is_aborted(&self) -> bool {
        self.state == BuildState::Aborted
    }

    /// The question currently awaiting an answer, None once the build is over.
    pub fn next_prompt(&self) -> Option<Prompt> {
        match &self.state {
            BuildState::AwaitingAttribute(idx) => Some(Prompt::AttributeOrLeaf {
                path: self.path_of(*idx),
            }),
            BuildState::AwaitingLabel(idx) => Some(Prompt::LeafLabel {
                path: self.path_of(*idx),
            }),
            BuildState::AwaitingSplit { node, attribute } => Some(Prompt::SplitValueAndCondition {
                attribute: attribute.clone(),
                path: self.path_of(*node),
            }),
            BuildState::Complete | BuildState::Aborted | BuildState::Failed => None,
        }
    }

    /// Build path of the node currently being asked.
    pub fn current_path(&self) -> String {
        match &self.state {
            BuildState::AwaitingAttribute(idx)
            | BuildState::AwaitingLabel(idx)
            | BuildState::AwaitingSplit { node: idx, .. } => self.path_of(*idx),
            _ => String::new(),
        }
    }

    fn path_of(&self, idx: Index) -> String {
        self.arena
            .get_node(idx)
            .map(|n| n.path.clone())
            .unwrap_or_default()
    }

    /// Rendering of the tree as answered so far.
    pub fn render(&self) -> String {
        self.arena.to_term_tree().to_string()
    }

    /// Answer an attribute prompt with an attribute name or the leaf sentinel.
    #[instrument(level = "debug", skip(self))]
    pub fn answer_attribute(&mut self, answer: &str) -> DomainResult<()> {
        let BuildState::AwaitingAttribute(idx) = self.state else {
            return Err(self.out_of_order("attribute"));
        };
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(DomainError::InvalidAnswer(format!(
                "attribute must not be empty (use '{}' for a leaf)",
                self.leaf_sentinel
            )));
        }
        self.state = if answer == self.leaf_sentinel {
            BuildState::AwaitingLabel(idx)
        } else {
            BuildState::AwaitingSplit {
                node: idx,
                attribute: answer.to_string(),
            }
        };
        Ok(())
    }

    /// Answer a leaf label prompt; the node becomes terminal.
    #[instrument(level = "debug", skip(self))]
    pub fn answer_label(&mut self, label: &str) -> DomainResult<()> {
        let BuildState::AwaitingLabel(idx) = self.state else {
            return Err(self.out_of_order("leaf label"));
        };
        let label = label.trim();
        if label.is_empty() {
            return Err(DomainError::InvalidAnswer("leaf label must not be empty".into()));
        }
        self.arena.make_leaf(idx, label.to_string())?;
        debug!("leaf '{}' at '{}'", label, self.path_of(idx));
        self.advance();
        Ok(())
    }

    /// Answer a split prompt; the node gains two pending children, left asked first.
    ///
    /// A non-numeric value for `>=`/`<=` is rejected and the prompt stays open.
    /// Exceeding the depth bound fails the whole build.
    #[instrument(level = "debug", skip(self))]
    pub fn answer_split(&mut self, value: &str, condition: Condition) -> DomainResult<()> {
        let BuildState::AwaitingSplit { node, attribute } = &self.state else {
            return Err(self.out_of_order("split value and condition"));
        };
        let (node, attribute) = (*node, attribute.clone());
        let value = value.trim();
        let predicate = Predicate::new(condition, value)?;

        let depth = self.arena.get_node(node).map(|n| n.depth).unwrap_or_default();
        if depth + 1 > self.max_depth {
            debug!("depth {} exceeds bound {}", depth + 1, self.max_depth);
            self.arena.clear();
            self.pending.clear();
            self.state = BuildState::Failed;
            return Err(DomainError::TreeTooDeep {
                max_depth: self.max_depth,
            });
        }

        let (left, right) = self
            .arena
            .make_split(node, attribute, predicate, value.to_string())?;
        self.pending.push(right);
        self.pending.push(left);
        self.advance();
        Ok(())
    }

    /// Abandon the build and discard the partial tree.
    pub fn cancel(&mut self) {
        debug!("build cancelled at '{}'", self.current_path());
        self.arena.clear();
        self.pending.clear();
        self.state = BuildState::Aborted;
    }

    /// Consume a complete builder and return the built tree.
    pub fn finish(self) -> DomainResult<DecisionNode> {
        match self.state {
            BuildState::Complete => self.arena.to_decision_tree(),
            BuildState::Aborted => Err(DomainError::BuildCancelled),
            _ => Err(DomainError::BuildIncomplete),
        }
    }

    fn advance(&mut self) {
        self.state = match self.pending.pop() {
            Some(next) => BuildState::AwaitingAttribute(next),
            None => BuildState::Complete,
        };
        trace!("next: {}", self.state.name());
    }

    fn out_of_order(&self, got: &'static str) -> DomainError {
        DomainError::BuildOutOfOrder {
            expected: self.state.name(),
            got,
        }
    }
}

/// Source of answers during a build, e.g. an interactive prompt.
///
/// Every method returns `Ok(None)` when the user cancels.
pub trait BuildCollaborator {
    fn ask_attribute_or_leaf(&mut self, path: &str) -> Result<Option<String>, String>;

    fn ask_leaf_label(&mut self, path: &str) -> Result<Option<String>, String>;

    fn ask_split(&mut self, attribute: &str, path: &str) -> Result<Option<(String, Condition)>, String>;
}

/// Receives presentation updates during a build. Never read back.
pub trait BuildObserver {
    /// Build path of the node about to be asked.
    fn on_path(&mut self, _path: &str) {}

    /// Full rendering after a node was added.
    fn on_tree(&mut self, _rendered: &str) {}

    /// An answer was refused and the question will be repeated.
    fn on_rejected(&mut self, _error: &DomainError) {}
}

/// Observer that ignores every update.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl BuildObserver for NoopObserver {}

/// Drive a fresh builder to completion.
///
/// Invalid answers are reported to the observer and asked again. Cancellation,
/// collaborator failure and depth overflow end the build with nothing returned.
#[instrument(level = "debug", skip(collaborator, observer))]
pub fn build_tree(
    max_depth: usize,
    leaf_sentinel: &str,
    collaborator: &mut dyn BuildCollaborator,
    observer: &mut dyn BuildObserver,
) -> DomainResult<DecisionNode> {
    let mut builder = TreeBuilder::new(max_depth, leaf_sentinel);

    while let Some(prompt) = builder.next_prompt() {
        let result = match prompt {
            Prompt::AttributeOrLeaf { path } => {
                observer.on_path(&path);
                match collaborator.ask_attribute_or_leaf(&path) {
                    Ok(Some(answer)) => builder.answer_attribute(&answer),
                    Ok(None) => Err(DomainError::BuildCancelled),
                    Err(e) => Err(DomainError::Collaborator(e)),
                }
            }
            Prompt::LeafLabel { path } => match collaborator.ask_leaf_label(&path) {
                Ok(Some(label)) => builder.answer_label(&label).map(|_| {
                    observer.on_tree(&builder.render());
                }),
                Ok(None) => Err(DomainError::BuildCancelled),
                Err(e) => Err(DomainError::Collaborator(e)),
            },
            Prompt::SplitValueAndCondition { attribute, path } => {
                match collaborator.ask_split(&attribute, &path) {
                    Ok(Some((value, condition))) => {
                        builder.answer_split(&value, condition).map(|_| {
                            observer.on_tree(&builder.render());
                        })
                    }
                    Ok(None) => Err(DomainError::BuildCancelled),
                    Err(e) => Err(DomainError::Collaborator(e)),
                }
            }
        };

        match result {
            Ok(()) => {}
            Err(e @ (DomainError::InvalidAnswer(_) | DomainError::InvalidSplitValue { .. })) => {
                observer.on_rejected(&e);
            }
            Err(e) => {
                builder.cancel();
                return Err(e);
            }
        }
    }

    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_sentinel_at_root_when_labelled_then_single_leaf_tree() {
        let mut builder = TreeBuilder::default();
        assert_eq!(
            builder.next_prompt(),
            Some(Prompt::AttributeOrLeaf { path: String::new() })
        );
        builder.answer_attribute("result").unwrap();
        builder.answer_label("Fraud").unwrap();
        assert!(builder.is_complete());
        assert_eq!(builder.next_prompt(), None);
        assert_eq!(builder.finish().unwrap(), DecisionNode::leaf("Fraud"));
    }

    #[test]
    fn given_split_when_answered_then_left_subtree_asked_first() {
        let mut builder = TreeBuilder::default();
        builder.answer_attribute("Transaction Type").unwrap();
        builder.answer_split("IMPS", Condition::Equals).unwrap();
        assert_eq!(
            builder.next_prompt(),
            Some(Prompt::AttributeOrLeaf {
                path: "Transaction Type == IMPS (left)".into()
            })
        );
        builder.answer_attribute("result").unwrap();
        builder.answer_label("Fraud").unwrap();
        assert_eq!(builder.current_path(), "Transaction Type == IMPS (right)");
    }

    #[test]
    fn given_label_while_awaiting_attribute_when_answering_then_out_of_order() {
        let mut builder = TreeBuilder::default();
        let err = builder.answer_label("Fraud").unwrap_err();
        assert!(matches!(err, DomainError::BuildOutOfOrder { got: "leaf label", .. }));
        // state untouched
        assert!(matches!(builder.next_prompt(), Some(Prompt::AttributeOrLeaf { .. })));
    }

    #[test]
    fn given_cancelled_builder_when_finishing_then_build_cancelled() {
        let mut builder = TreeBuilder::default();
        builder.answer_attribute("Transaction Amount").unwrap();
        builder.cancel();
        assert!(builder.is_aborted());
        assert_eq!(builder.next_prompt(), None);
        assert_eq!(builder.finish(), Err(DomainError::BuildCancelled));
    }

    #[test]
    fn given_incomplete_builder_when_finishing_then_incomplete() {
        let mut builder = TreeBuilder::default();
        builder.answer_attribute("Transaction Amount").unwrap();
        assert_eq!(builder.finish(), Err(DomainError::BuildIncomplete));
    }

    #[test]
    fn given_zero_max_depth_when_splitting_root_then_too_deep() {
        let mut builder = TreeBuilder::new(0, "result");
        builder.answer_attribute("Transaction Amount").unwrap();
        assert_eq!(
            builder.answer_split("10", Condition::AtLeast),
            Err(DomainError::TreeTooDeep { max_depth: 0 })
        );
        assert_eq!(builder.next_prompt(), None);
        assert_eq!(builder.finish(), Err(DomainError::BuildIncomplete));
    }

    #[test]
    fn given_custom_sentinel_when_answered_then_it_marks_leaf() {
        let mut builder = TreeBuilder::new(4, "leaf");
        builder.answer_attribute("result").unwrap();
        assert!(matches!(
            builder.next_prompt(),
            Some(Prompt::SplitValueAndCondition { ref attribute, .. }) if attribute == "result"
        ));
    }
}
