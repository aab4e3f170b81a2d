//! Decision tree node model.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use termtree::Tree;

use crate::domain::error::{DomainError, DomainResult};

/// Comparison operator of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Equals,
    AtLeast,
    AtMost,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Equals => "==",
            Condition::AtLeast => ">=",
            Condition::AtMost => "<=",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "==" => Ok(Condition::Equals),
            ">=" => Ok(Condition::AtLeast),
            "<=" => Ok(Condition::AtMost),
            other => Err(DomainError::InvalidAnswer(format!(
                "unknown condition '{}', choose from ==, >=, <=",
                other
            ))),
        }
    }
}

/// Comparison value typed per condition.
///
/// Numeric conditions carry a parsed decimal, so a split can never hold a
/// comparison value that fails to parse at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Equals(String),
    AtLeast(Decimal),
    AtMost(Decimal),
}

impl Predicate {
    pub fn new(condition: Condition, value: &str) -> DomainResult<Self> {
        match condition {
            Condition::Equals => Ok(Predicate::Equals(value.to_string())),
            Condition::AtLeast => parse_number(value, condition).map(Predicate::AtLeast),
            Condition::AtMost => parse_number(value, condition).map(Predicate::AtMost),
        }
    }

    pub fn condition(&self) -> Condition {
        match self {
            Predicate::Equals(_) => Condition::Equals,
            Predicate::AtLeast(_) => Condition::AtLeast,
            Predicate::AtMost(_) => Condition::AtMost,
        }
    }

    /// Comparison value in canonical form.
    pub fn value_text(&self) -> String {
        match self {
            Predicate::Equals(v) => v.clone(),
            Predicate::AtLeast(v) | Predicate::AtMost(v) => v.to_string(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.condition(), self.value_text())
    }
}

/// `"<attribute> <condition> <value>"`, as paths and rendered trees show a split.
pub fn split_text(attribute: &str, condition: Condition, value: &str) -> String {
    format!("{} {} {}", attribute, condition, value)
}

fn parse_number(value: &str, condition: Condition) -> DomainResult<Decimal> {
    let trimmed = value.trim();
    trimmed
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| DomainError::InvalidSplitValue {
            value: value.to_string(),
            condition,
        })
}

/// One node of a built decision tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionNode {
    Split {
        attribute: String,
        predicate: Predicate,
        /// Comparison value as the user typed it
        value: String,
        left: Box<DecisionNode>,
        right: Box<DecisionNode>,
    },
    Leaf {
        label: String,
    },
}

impl DecisionNode {
    pub fn split(
        attribute: impl Into<String>,
        predicate: Predicate,
        left: DecisionNode,
        right: DecisionNode,
    ) -> Self {
        let value = predicate.value_text();
        Self::split_as_typed(attribute, predicate, value, left, right)
    }

    /// Split that displays `value` verbatim, e.g. `1e3` rather than `1000`.
    pub fn split_as_typed(
        attribute: impl Into<String>,
        predicate: Predicate,
        value: impl Into<String>,
        left: DecisionNode,
        right: DecisionNode,
    ) -> Self {
        DecisionNode::Split {
            attribute: attribute.into(),
            predicate,
            value: value.into(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn leaf(label: impl Into<String>) -> Self {
        DecisionNode::Leaf {
            label: label.into(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, DecisionNode::Leaf { .. })
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            DecisionNode::Leaf { label } => Some(label),
            DecisionNode::Split { .. } => None,
        }
    }

    /// Number of split levels on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        match self {
            DecisionNode::Leaf { .. } => 0,
            DecisionNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            DecisionNode::Leaf { .. } => 1,
            DecisionNode::Split { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    /// Distinct attribute names used by splits, in pre-order of first use.
    pub fn attributes(&self) -> Vec<&str> {
        fn collect<'a>(node: &'a DecisionNode, out: &mut Vec<&'a str>) {
            if let DecisionNode::Split {
                attribute,
                left,
                right,
                ..
            } = node
            {
                if !out.contains(&attribute.as_str()) {
                    out.push(attribute);
                }
                collect(left, out);
                collect(right, out);
            }
        }
        let mut out = Vec::new();
        collect(self, &mut out);
        out
    }

    pub fn to_term_tree(&self) -> Tree<String> {
        match self {
            DecisionNode::Leaf { label } => Tree::new(format!("=> {}", label)),
            DecisionNode::Split {
                attribute,
                predicate,
                value,
                left,
                right,
            } => Tree::new(split_text(attribute, predicate.condition(), value))
                .with_leaves([left.to_term_tree(), right.to_term_tree()]),
        }
    }
}
