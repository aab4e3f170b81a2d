//! Service container for dependency injection
//!
//! Wires up the session and services with their dependencies.

use std::sync::Arc;

use crate::application::services::DatasetService;
use crate::application::Session;
use crate::config::Settings;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding settings and I/O dependencies.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        let settings = Arc::new(settings);

        Self { settings, fs }
    }

    /// Fresh session with no table and no tree.
    pub fn session(&self) -> Session {
        Session::new(Arc::clone(&self.settings), Arc::clone(&self.fs))
    }

    pub fn dataset_service(&self) -> DatasetService {
        DatasetService::new(Arc::clone(&self.fs), self.settings.date_formats.clone())
    }
}
