//! Batch prediction over a loaded table

use std::collections::BTreeMap;
use std::fmt;

use tracing::{info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{evaluate, DecisionNode, TransactionTable, UnknownAttributePolicy};

/// Predicted label for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    /// Row index in the loaded file
    pub index: usize,
    pub label: String,
}

/// Label counts of one prediction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictionSummary {
    pub total: usize,
    pub by_label: BTreeMap<String, usize>,
}

impl PredictionSummary {
    pub fn from_predictions(predictions: &[Prediction]) -> Self {
        let mut by_label = BTreeMap::new();
        for p in predictions {
            *by_label.entry(p.label.clone()).or_insert(0) += 1;
        }
        Self {
            total: predictions.len(),
            by_label,
        }
    }
}

impl fmt::Display for PredictionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rows", self.total)?;
        for (label, count) in &self.by_label {
            write!(f, ", {}: {}", label, count)?;
        }
        Ok(())
    }
}

/// Applies a decision tree to every row of a table.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredictionService {
    policy: UnknownAttributePolicy,
}

impl PredictionService {
    pub fn new(policy: UnknownAttributePolicy) -> Self {
        Self { policy }
    }

    /// Evaluate `tree` on each record in table order.
    ///
    /// Fails with a precondition error naming what is missing: a loaded table,
    /// a non-empty table, or a built tree.
    #[instrument(level = "debug", skip(self, table, tree))]
    pub fn predict(
        &self,
        table: Option<&TransactionTable>,
        tree: Option<&DecisionNode>,
    ) -> ApplicationResult<Vec<Prediction>> {
        let table = table.ok_or_else(|| ApplicationError::Precondition("no table loaded".into()))?;
        if table.is_empty() {
            return Err(ApplicationError::Precondition("table is empty".into()));
        }
        let tree = tree.ok_or_else(|| ApplicationError::Precondition("no decision tree built".into()))?;

        let known = table.attribute_names();
        for attribute in tree.attributes() {
            if !known.iter().any(|k| k == attribute) {
                warn!("attribute '{}' is not a column of the loaded table", attribute);
            }
        }

        let predictions = table
            .records
            .iter()
            .map(|record| {
                evaluate(tree, record, self.policy).map(|label| Prediction {
                    index: record.index,
                    label: label.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!("{}", PredictionSummary::from_predictions(&predictions));
        Ok(predictions)
    }
}
