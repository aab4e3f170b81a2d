//! Tree evaluation against one enriched record.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{DecisionNode, Predicate};
use crate::domain::record::{FieldValue, Transaction};

/// What to do when a split names an attribute the record does not have.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownAttributePolicy {
    /// Treat as "no match" and follow the right branch
    #[default]
    Right,
    /// Fail the evaluation
    Error,
}

/// Does the predicate send this value down the left branch?
///
/// `==` matches text only, exactly and case-sensitively. `>=` and `<=` match
/// numeric values only. Anything else is not a match.
pub fn matches(predicate: &Predicate, value: &FieldValue) -> bool {
    match (predicate, value) {
        (Predicate::Equals(expected), FieldValue::Text(actual)) => actual == expected,
        (Predicate::Equals(_), _) => false,
        (Predicate::AtLeast(bound), v) => v.as_decimal().is_some_and(|n| n >= *bound),
        (Predicate::AtMost(bound), v) => v.as_decimal().is_some_and(|n| n <= *bound),
    }
}

/// Walk the tree from `root` and return the label of the leaf reached.
pub fn evaluate<'t>(
    root: &'t DecisionNode,
    record: &Transaction,
    policy: UnknownAttributePolicy,
) -> DomainResult<&'t str> {
    let mut node = root;
    loop {
        match node {
            DecisionNode::Leaf { label } => return Ok(label),
            DecisionNode::Split {
                attribute,
                predicate,
                left,
                right,
                ..
            } => {
                let go_left = match record.field(attribute) {
                    Some(value) => matches(predicate, &value),
                    None => match policy {
                        UnknownAttributePolicy::Right => false,
                        UnknownAttributePolicy::Error => {
                            return Err(DomainError::UnknownAttribute {
                                attribute: attribute.clone(),
                            })
                        }
                    },
                };
                trace!(
                    "row {}: {} {} -> {}",
                    record.index,
                    attribute,
                    predicate,
                    if go_left { "left" } else { "right" }
                );
                node = if go_left { left } else { right };
            }
        }
    }
}
