//! One analyst session: the current table and the current tree.
//!
//! Loading replaces the table and building replaces the tree, each only when the
//! operation succeeds. A failed load keeps the old table; a failed or cancelled
//! build keeps the old tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument};

use crate::application::services::{DatasetService, Prediction, PredictionService};
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{build_tree, BuildCollaborator, BuildObserver, DecisionNode, TransactionTable};
use crate::infrastructure::traits::FileSystem;

pub struct Session {
    settings: Arc<Settings>,
    dataset: DatasetService,
    predictor: PredictionService,
    table: Option<TransactionTable>,
    tree: Option<DecisionNode>,
}

impl Session {
    pub fn new(settings: Arc<Settings>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            dataset: DatasetService::new(fs, settings.date_formats.clone()),
            predictor: PredictionService::new(settings.unknown_attribute),
            settings,
            table: None,
            tree: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn table(&self) -> Option<&TransactionTable> {
        self.table.as_ref()
    }

    pub fn tree(&self) -> Option<&DecisionNode> {
        self.tree.as_ref()
    }

    /// Load and enrich a statement file, replacing the current table on success.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&mut self, path: &Path) -> ApplicationResult<&TransactionTable> {
        let table = self.dataset.load(path).map_err(|e| e.during("load"))?;
        Ok(self.table.insert(table))
    }

    /// Run an interactive build, replacing the current tree on success.
    #[instrument(level = "debug", skip(self, collaborator, observer))]
    pub fn build(
        &mut self,
        collaborator: &mut dyn BuildCollaborator,
        observer: &mut dyn BuildObserver,
    ) -> ApplicationResult<&DecisionNode> {
        let tree = build_tree(
            self.settings.max_depth,
            &self.settings.leaf_sentinel,
            collaborator,
            observer,
        )
        .map_err(|e| ApplicationError::from(e).during("build"))?;
        info!("built tree: depth {}, {} leaves", tree.depth(), tree.leaf_count());
        Ok(self.tree.insert(tree))
    }

    /// Install a tree constructed elsewhere.
    pub fn install_tree(&mut self, tree: DecisionNode) {
        self.tree = Some(tree);
    }

    /// Predict every row of the current table with the current tree.
    pub fn predict(&self) -> ApplicationResult<Vec<Prediction>> {
        self.predictor
            .predict(self.table.as_ref(), self.tree.as_ref())
            .map_err(|e| e.during("predict"))
    }

    /// Write the current table, with predictions when given.
    ///
    /// Relative paths are resolved against the configured output directory.
    /// Returns the path written.
    pub fn export(&self, path: &Path, predictions: Option<&[Prediction]>) -> ApplicationResult<PathBuf> {
        let table = self.table.as_ref().ok_or_else(|| {
            ApplicationError::Precondition("no table loaded".into()).during("export")
        })?;
        let target = self.settings.resolve_output(path);
        self.dataset
            .export(&target, table, predictions, &self.settings.results_column)
            .map_err(|e| e.during("export"))?;
        Ok(target)
    }
}
