//! Software catalog: released files laid out as `group/tool/version/file`
//! below the catalog directory.

use std::fs;
use std::io::Read;

use protocol::{CatalogGroup, CatalogTool, CatalogVersion, UploadResponse};
use tracing::{debug, warn};

use super::error::{Feature, FileError};
use super::manager::FileManager;
use super::resolver::ResolvedPath;
use super::upload::ReservedUpload;

/// Where a release upload is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseTarget {
    pub group: String,
    pub tool: String,
    pub version: String,
    /// Stored file name; the uploaded file's own name when absent.
    pub name: Option<String>,
}

impl ReleaseTarget {
    fn segments(&self) -> Result<[&str; 3], FileError> {
        let segments = [
            ("group", self.group.as_str()),
            ("tool", self.tool.as_str()),
            ("version", self.version.as_str()),
        ];

        for (field, value) in segments {
            if value.trim().is_empty() {
                return Err(FileError::InvalidInput(format!("missing {}", field)));
            }
            if value.contains(['/', '\\']) || value == "." || value == ".." {
                return Err(FileError::InvalidInput(format!(
                    "{} must be a single name: {:?}",
                    field, value
                )));
            }
        }

        Ok([self.group.as_str(), self.tool.as_str(), self.version.as_str()])
    }
}

/// A child directory entry, already confined to the root.
struct Child {
    name: String,
    resolved: ResolvedPath,
    is_directory: bool,
}

impl FileManager {
    /// Every group below the catalog directory, sorted by name.
    pub fn catalog(&self) -> Result<Vec<CatalogGroup>, FileError> {
        let base = self.catalog_base()?;
        debug!(path = %base.relative(), "Reading software catalog");

        let mut groups = Vec::new();
        for group in self.children(&base)?.into_iter().filter(|c| c.is_directory) {
            let mut tools = Vec::new();
            for tool in self.children(&group.resolved)?.into_iter().filter(|c| c.is_directory) {
                tools.push(self.read_tool(&tool)?);
            }
            groups.push(CatalogGroup {
                group: group.name,
                tools,
            });
        }

        Ok(groups)
    }

    /// A single tool with all of its versions.
    pub fn catalog_tool(&self, group: &str, tool: &str) -> Result<CatalogTool, FileError> {
        let target = ReleaseTarget {
            group: group.to_string(),
            tool: tool.to_string(),
            version: "any".to_string(),
            name: None,
        };
        target.segments()?;

        let base = self.catalog_base()?;
        let resolved = self
            .resolver
            .resolve(&base.join_name(&format!("{}/{}", group, tool)))?;
        if !resolved.absolute().is_dir() {
            return Err(FileError::NotFound(resolved.relative().to_string()));
        }

        self.read_tool(&Child {
            name: tool.to_string(),
            resolved,
            is_directory: true,
        })
    }

    /// Create an empty release file, creating its directories as needed.
    pub fn reserve_release(
        &self,
        target: &ReleaseTarget,
        file_name: &str,
    ) -> Result<ReservedUpload, FileError> {
        self.require(Feature::Upload)?;
        let [group, tool, version] = target.segments()?;

        let base = self.resolver.resolve(self.catalog_dir())?;
        let dir = self
            .resolver
            .resolve(&base.join_name(&format!("{}/{}/{}", group, tool, version)))?;
        fs::create_dir_all(dir.absolute()).map_err(|e| FileError::from_io(e, dir.relative()))?;

        let name = match target.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => file_name,
        };
        self.reserve_in(&dir, name)
    }

    /// Store a release file read from `reader`.
    pub fn upload_release<R: Read>(
        &self,
        target: &ReleaseTarget,
        file_name: &str,
        mut reader: R,
    ) -> Result<UploadResponse, FileError> {
        let reserved = self.reserve_release(target, file_name)?;
        self.write_reserved(reserved, &mut reader)
    }

    fn catalog_base(&self) -> Result<ResolvedPath, FileError> {
        let base = self.resolver.resolve(self.catalog_dir())?;
        if !base.absolute().is_dir() {
            return Err(FileError::NotFound(base.relative().to_string()));
        }
        Ok(base)
    }

    fn read_tool(&self, tool: &Child) -> Result<CatalogTool, FileError> {
        let mut versions = Vec::new();
        for version in self.children(&tool.resolved)?.into_iter().filter(|c| c.is_directory) {
            for file in self.children(&version.resolved)?.into_iter().filter(|c| !c.is_directory) {
                versions.push(CatalogVersion {
                    display: format!("{} ({})", file.name, version.name),
                    relative_path: file.resolved.relative().to_string(),
                    name: file.name,
                    version: version.name.clone(),
                });
            }
        }

        Ok(CatalogTool {
            name: tool.name.clone(),
            versions,
        })
    }

    fn children(&self, dir: &ResolvedPath) -> Result<Vec<Child>, FileError> {
        let reader =
            fs::read_dir(dir.absolute()).map_err(|e| FileError::from_io(e, dir.relative()))?;

        let mut children = Vec::new();
        for entry in reader {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = %dir.relative(), error = %e, "Skipping unreadable catalog entry");
                    continue;
                }
            };

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(path = %dir.relative(), name = ?raw, "Skipping catalog entry with non-UTF-8 name");
                    continue;
                }
            };
            let resolved = match self.resolver.resolve(&dir.join_name(&name)) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(path = %dir.join_name(&name), error = %e, "Skipping catalog entry");
                    continue;
                }
            };

            children.push(Child {
                is_directory: resolved.absolute().is_dir(),
                name,
                resolved,
            });
        }

        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::resolver::Root;
    use protocol::FeatureFlags;
    use std::io::Cursor;
    use std::os::unix::fs::symlink;
    use std::path::Path;
    use tempfile::TempDir;

    fn manager(temp_dir: &TempDir) -> FileManager {
        FileManager::new(Root::new(temp_dir.path()).unwrap()).with_features(FeatureFlags {
            upload: true,
            new_folder: false,
        })
    }

    fn release(root: &Path, path: &str) {
        let path = root.join("software").join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "binary").unwrap();
    }

    fn target(group: &str, tool: &str, version: &str) -> ReleaseTarget {
        ReleaseTarget {
            group: group.to_string(),
            tool: tool.to_string(),
            version: version.to_string(),
            name: None,
        }
    }

    #[test]
    fn test_catalog_tree() {
        let temp_dir = TempDir::new().unwrap();
        release(temp_dir.path(), "network/wireshark/4.2/wireshark.msi");
        release(temp_dir.path(), "network/wireshark/4.0/wireshark.msi");
        release(temp_dir.path(), "editors/vim/9.1/vim.tar.gz");
        release(temp_dir.path(), "editors/vim/9.1/vim.zip");
        fs::write(temp_dir.path().join("software/README"), "stray").unwrap();

        let groups = manager(&temp_dir).catalog().unwrap();

        let names: Vec<&str> = groups.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(names, vec!["editors", "network"]);

        let vim = &groups[0].tools[0];
        assert_eq!(vim.name, "vim");
        assert_eq!(vim.version_count(), 2);
        assert_eq!(vim.versions[0].display, "vim.tar.gz (9.1)");
        assert_eq!(
            vim.versions[0].relative_path,
            "/software/editors/vim/9.1/vim.tar.gz"
        );

        let wireshark = &groups[1].tools[0];
        let versions: Vec<&str> = wireshark.versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(versions, vec!["4.0", "4.2"]);
    }

    #[test]
    fn test_catalog_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            manager(&temp_dir).catalog(),
            Err(FileError::NotFound(_))
        ));
    }

    #[test]
    fn test_catalog_skips_symlink_outside_root() {
        let outside = TempDir::new().unwrap();
        fs::create_dir_all(outside.path().join("tool/1.0")).unwrap();
        let temp_dir = TempDir::new().unwrap();
        release(temp_dir.path(), "local/tool/1.0/tool.bin");
        symlink(outside.path(), temp_dir.path().join("software/leak")).unwrap();

        let groups = manager(&temp_dir).catalog().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group, "local");
    }

    #[test]
    fn test_catalog_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        release(temp_dir.path(), "editors/vim/9.1/vim.zip");
        let bad = temp_dir
            .path()
            .join("software/editors/vim/9.1")
            .join(OsStr::from_bytes(b"vim\xff.zip"));
        if fs::write(bad, "x").is_err() {
            return;
        }

        let tool = manager(&temp_dir).catalog_tool("editors", "vim").unwrap();
        let files: Vec<&str> = tool.versions.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(files, vec!["vim.zip"]);
    }

    #[test]
    fn test_catalog_tool() {
        let temp_dir = TempDir::new().unwrap();
        release(temp_dir.path(), "editors/vim/9.1/vim.zip");
        let manager = manager(&temp_dir);

        let tool = manager.catalog_tool("editors", "vim").unwrap();
        assert_eq!(tool.version_count(), 1);

        assert!(matches!(
            manager.catalog_tool("editors", "emacs"),
            Err(FileError::NotFound(_))
        ));
        assert!(matches!(
            manager.catalog_tool("..", "vim"),
            Err(FileError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_upload_release_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);

        let response = manager
            .upload_release(
                &target("editors", "vim", "9.1"),
                "vim installer.zip",
                Cursor::new(b"zip".to_vec()),
            )
            .unwrap();

        assert_eq!(response.stored_name, "vim_installer.zip");
        assert_eq!(
            response.relative_path,
            "/software/editors/vim/9.1/vim_installer.zip"
        );
        assert!(temp_dir
            .path()
            .join("software/editors/vim/9.1/vim_installer.zip")
            .is_file());
    }

    #[test]
    fn test_upload_release_name_override_and_collision() {
        let temp_dir = TempDir::new().unwrap();
        release(temp_dir.path(), "editors/vim/9.1/vim.zip");
        let manager = manager(&temp_dir);

        let mut release_target = target("editors", "vim", "9.1");
        release_target.name = Some("vim.zip".to_string());

        let response = manager
            .upload_release(&release_target, "upload.bin", Cursor::new(b"new".to_vec()))
            .unwrap();
        assert_eq!(response.stored_name, "vim (1).zip");
    }

    #[test]
    fn test_upload_release_validation() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);

        for bad in [
            target("", "vim", "9.1"),
            target("editors", "", "9.1"),
            target("editors", "vim", " "),
            target("..", "vim", "9.1"),
            target("editors", "../vim", "9.1"),
        ] {
            assert!(matches!(
                manager.upload_release(&bad, "a.zip", Cursor::new(Vec::new())),
                Err(FileError::InvalidInput(_))
            ));
        }
        assert!(!temp_dir.path().join("software").exists());
    }

    #[test]
    fn test_upload_release_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let manager = FileManager::new(Root::new(temp_dir.path()).unwrap());

        assert!(matches!(
            manager.upload_release(&target("a", "b", "c"), "a.zip", Cursor::new(Vec::new())),
            Err(FileError::FeatureDisabled(Feature::Upload))
        ));
    }
}
