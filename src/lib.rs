//! Interactive fraud decision trees over bank statement exports.
//!
//! A statement CSV is enriched with derived per-transaction features
//! ([`domain::enrich`]), an analyst answers prompts to grow a binary decision
//! tree ([`domain::TreeBuilder`]), and the tree labels every row
//! ([`application::services::PredictionService`]) for export.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
