//! The file manager handle shared by every request.

use std::path::Path;

use protocol::FeatureFlags;

use super::classifier::CategoryTable;
use super::error::{Feature, FileError};
use super::resolver::{ResolvedPath, Resolver, Root};
use crate::config::Config;

/// Default upload size limit (1 GiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 1024 * 1024 * 1024;

/// Default directory, relative to the root, holding the software catalog.
pub const DEFAULT_CATALOG_DIR: &str = "software";

/// File operations confined to a single root.
///
/// Holds only immutable state: the root, the classification tables and
/// the feature switches captured at startup. Every operation is a
/// one-shot call against the filesystem, so a `FileManager` can be shared
/// across concurrent requests without locking.
#[derive(Debug, Clone)]
pub struct FileManager {
    pub(crate) resolver: Resolver,
    pub(crate) categories: CategoryTable,
    features: FeatureFlags,
    max_upload_size: u64,
    catalog_dir: String,
}

impl FileManager {
    /// Create a manager with every optional feature disabled.
    pub fn new(root: Root) -> Self {
        Self {
            resolver: Resolver::new(root),
            categories: CategoryTable::builtin(),
            features: FeatureFlags::default(),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            catalog_dir: DEFAULT_CATALOG_DIR.to_string(),
        }
    }

    /// Build a manager from validated configuration.
    pub fn from_config(config: &Config) -> Result<Self, FileError> {
        let root = Root::new(&config.files.root)?;
        let categories = CategoryTable::builtin()
            .with_overrides(&config.classifier.names, &config.classifier.extensions);

        Ok(Self::new(root)
            .with_features(FeatureFlags {
                upload: config.files.enable_upload,
                new_folder: config.files.enable_new_folder,
            })
            .with_categories(categories)
            .with_max_upload_size(config.files.max_upload_size)
            .with_catalog_dir(&config.catalog.subdir))
    }

    /// Set the feature switches.
    pub fn with_features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Replace the classification tables.
    pub fn with_categories(mut self, categories: CategoryTable) -> Self {
        self.categories = categories;
        self
    }

    /// Set the upload size limit in bytes.
    pub fn with_max_upload_size(mut self, max_upload_size: u64) -> Self {
        self.max_upload_size = max_upload_size;
        self
    }

    /// Set the catalog directory, relative to the root.
    pub fn with_catalog_dir(mut self, catalog_dir: &str) -> Self {
        self.catalog_dir = catalog_dir.to_string();
        self
    }

    /// Canonical root path.
    pub fn root(&self) -> &Path {
        self.resolver.root().path()
    }

    /// Feature switches in effect.
    pub fn features(&self) -> FeatureFlags {
        self.features
    }

    /// Upload size limit in bytes.
    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size
    }

    /// Catalog directory, relative to the root.
    pub fn catalog_dir(&self) -> &str {
        &self.catalog_dir
    }

    /// Resolve a request path inside the root.
    pub fn resolve(&self, request_path: &str) -> Result<ResolvedPath, FileError> {
        self.resolver.resolve(request_path)
    }

    pub(crate) fn require(&self, feature: Feature) -> Result<(), FileError> {
        let enabled = match feature {
            Feature::Upload => self.features.upload,
            Feature::NewFolder => self.features.new_folder,
        };

        if enabled {
            Ok(())
        } else {
            Err(FileError::FeatureDisabled(feature))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_disables_features() {
        let temp_dir = TempDir::new().unwrap();
        let manager = FileManager::new(Root::new(temp_dir.path()).unwrap());

        assert!(!manager.features().upload);
        assert!(!manager.features().new_folder);
        assert!(matches!(
            manager.require(Feature::Upload),
            Err(FileError::FeatureDisabled(Feature::Upload))
        ));
    }

    #[test]
    fn test_builder_settings() {
        let temp_dir = TempDir::new().unwrap();
        let manager = FileManager::new(Root::new(temp_dir.path()).unwrap())
            .with_features(FeatureFlags {
                upload: true,
                new_folder: false,
            })
            .with_max_upload_size(42)
            .with_catalog_dir("releases");

        assert!(manager.require(Feature::Upload).is_ok());
        assert!(manager.require(Feature::NewFolder).is_err());
        assert_eq!(manager.max_upload_size(), 42);
        assert_eq!(manager.catalog_dir(), "releases");
    }

    #[test]
    fn test_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.files.root = temp_dir.path().to_path_buf();
        config.files.enable_upload = true;
        config
            .classifier
            .extensions
            .insert("hcl".to_string(), "config".to_string());

        let manager = FileManager::from_config(&config).unwrap();
        assert!(manager.features().upload);
        assert!(!manager.features().new_folder);
        assert_eq!(manager.root(), temp_dir.path().canonicalize().unwrap());
        assert_eq!(manager.categories.classify("main.hcl").category, "config");
    }

    #[test]
    fn test_from_config_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.files.root = temp_dir.path().join("nope");

        assert!(matches!(
            FileManager::from_config(&config),
            Err(FileError::NotFound(_))
        ));
    }
}
