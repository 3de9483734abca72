//! Folder creation and deletion.

use std::fs;

use tracing::info;

use super::error::{Feature, FileError};
use super::manager::FileManager;
use super::resolver::ResolvedPath;

impl FileManager {
    /// Create `folder_name` (and any missing parents) under `parent`.
    ///
    /// Creating a folder that already exists succeeds. Nested names such as
    /// `a/b` are allowed as long as the result stays inside the root.
    pub fn create_folder(
        &self,
        parent: &str,
        folder_name: &str,
    ) -> Result<ResolvedPath, FileError> {
        if folder_name.trim().is_empty() {
            return Err(FileError::InvalidInput("folder name is required".to_string()));
        }

        self.require(Feature::NewFolder)?;

        let parent = self.resolver.resolve(parent)?;
        let target = self.resolver.resolve(&parent.join_name(folder_name))?;
        if target.is_root() {
            return Err(FileError::InvalidInput(format!(
                "folder name {:?} names the root",
                folder_name
            )));
        }

        fs::create_dir_all(target.absolute())
            .map_err(|e| FileError::from_io(e, target.relative()))?;

        info!(path = %target.relative(), "Created folder");
        Ok(target)
    }

    /// Delete a file, a symlink, or a directory with everything below it.
    ///
    /// A symlink is removed itself; its target is never touched. Deleting
    /// the root is refused.
    pub fn delete(&self, path: &str) -> Result<ResolvedPath, FileError> {
        if matches!(path.trim(), "" | "/" | ".") {
            return Err(FileError::RootProtected);
        }

        let target = self.resolver.resolve_entry(path)?;
        if target.is_root() {
            return Err(FileError::RootProtected);
        }

        let metadata = fs::symlink_metadata(target.absolute())
            .map_err(|e| FileError::from_io(e, target.relative()))?;

        let removed = if metadata.is_dir() {
            fs::remove_dir_all(target.absolute())
        } else {
            fs::remove_file(target.absolute())
        };
        // A concurrent delete surfaces here as NotFound.
        removed.map_err(|e| FileError::from_io(e, target.relative()))?;

        info!(
            path = %target.relative(),
            directory = metadata.is_dir(),
            "Deleted entry"
        );
        Ok(target)
    }
}
