//! Domain layer: transaction enrichment and the decision tree engine
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod enrichment;
pub mod error;
pub mod evaluator;
pub mod node;
pub mod record;

pub use arena::{Branch, BuildArena};
pub use builder::{build_tree, BuildCollaborator, BuildObserver, NoopObserver, Prompt, TreeBuilder};
pub use enrichment::{enrich, parse_currency, DEFAULT_DATE_FORMATS};
pub use error::{DomainError, DomainResult};
pub use evaluator::{evaluate, UnknownAttributePolicy};
pub use node::{Condition, DecisionNode, Predicate};
pub use record::*;
