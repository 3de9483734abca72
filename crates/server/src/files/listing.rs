//! Directory listing with deterministic ordering.
//!
//! Entries are grouped directories-first, then hidden-first within each
//! group, then ordered by the requested [`SortKey`]. Ties are always broken
//! by name so the result does not depend on the order the platform returns
//! directory entries in.

use std::cmp::Ordering;
use std::fs::{self, Metadata};
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use protocol::{DirEntryView, SortField, SortKey};
use tracing::{debug, warn};

use super::classifier::{
    FOLDER_CATEGORY, FOLDER_COLOR, FOLDER_ICON, PARENT_CATEGORY, PARENT_COLOR, PARENT_ICON,
};
use super::error::FileError;
use super::format::{format_relative, format_size};
use super::manager::FileManager;
use super::resolver::ResolvedPath;

/// One child of a listed directory, before projection.
#[derive(Debug, Clone)]
struct ListedEntry {
    name: String,
    is_directory: bool,
    /// Byte length for files, `None` for directories.
    size: Option<u64>,
    modified: Option<SystemTime>,
}

impl ListedEntry {
    fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// A regular file located for streaming.
#[derive(Debug, Clone)]
pub struct LocatedFile {
    /// Absolute path to open.
    pub path: PathBuf,
    /// Root-relative path.
    pub relative_path: String,
    /// Size in bytes.
    pub size: u64,
}

impl FileManager {
    /// List the immediate children of `request_path`.
    ///
    /// Returns `Ok(None)` when the resolved path is not a directory, which
    /// callers treat as a request to serve a file instead.
    pub fn list(
        &self,
        request_path: &str,
        sort_key: SortKey,
        include_parent: bool,
    ) -> Result<Option<Vec<DirEntryView>>, FileError> {
        let resolved = self.resolver.resolve(request_path)?;

        if !resolved.absolute().is_dir() {
            return Ok(None);
        }

        debug!(path = %resolved.relative(), sort = %sort_key, "Listing directory");

        let mut entries = read_entries(&resolved)?;
        entries.sort_by(|a, b| compare_entries(a, b, sort_key));

        let now = Utc::now();
        let mut views = Vec::with_capacity(entries.len() + 1);

        if include_parent {
            if let Some(parent) = resolved.parent_relative() {
                views.push(parent_entry(parent));
            }
        }

        views.extend(entries.iter().map(|entry| self.project(&resolved, entry, now)));

        Ok(Some(views))
    }

    /// Locate a regular file for streaming.
    pub fn locate_file(&self, request_path: &str) -> Result<LocatedFile, FileError> {
        let resolved = self.resolver.resolve(request_path)?;
        let metadata = fs::metadata(resolved.absolute())
            .map_err(|e| FileError::from_io(e, resolved.relative()))?;

        if !metadata.is_file() {
            return Err(FileError::InvalidInput(format!(
                "not a regular file: {}",
                resolved.relative()
            )));
        }

        Ok(LocatedFile {
            relative_path: resolved.relative().to_string(),
            path: resolved.absolute().to_path_buf(),
            size: metadata.len(),
        })
    }

    fn project(&self, dir: &ResolvedPath, entry: &ListedEntry, now: DateTime<Utc>) -> DirEntryView {
        let (category, icon, color) = if entry.is_directory {
            (FOLDER_CATEGORY, FOLDER_ICON, FOLDER_COLOR)
        } else {
            let class = self.categories.classify(&entry.name);
            (class.category, class.icon, class.color)
        };

        let modified = entry.modified.map(DateTime::<Utc>::from);

        DirEntryView {
            name: entry.name.clone(),
            is_directory: entry.is_directory,
            relative_path: dir.join_name(&entry.name),
            size: entry.size,
            size_human: entry.size.map(format_size),
            modified: modified.map(|m| m.timestamp()),
            modified_human: modified.map(|m| format_relative(m, now)),
            category: category.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
            deletable: true,
        }
    }
}

fn parent_entry(parent: String) -> DirEntryView {
    DirEntryView {
        name: "..".to_string(),
        is_directory: true,
        relative_path: parent,
        size: None,
        size_human: None,
        modified: None,
        modified_human: None,
        category: PARENT_CATEGORY.to_string(),
        icon: PARENT_ICON.to_string(),
        color: PARENT_COLOR.to_string(),
        deletable: false,
    }
}

fn read_entries(dir: &ResolvedPath) -> Result<Vec<ListedEntry>, FileError> {
    let reader =
        fs::read_dir(dir.absolute()).map_err(|e| FileError::from_io(e, dir.relative()))?;

    let mut entries = Vec::new();
    for entry_result in reader {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %dir.relative(), error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };

        // A lossy name would not resolve back to this entry.
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(path = %dir.relative(), name = ?raw, "Skipping entry with non-UTF-8 name");
                continue;
            }
        };

        // Follow symlinks for the type, but still list dangling ones.
        let metadata = match fs::metadata(entry.path()).or_else(|_| entry.metadata()) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %dir.join_name(&name), error = %e, "Skipping entry without metadata");
                continue;
            }
        };

        entries.push(listed_entry(name, &metadata));
    }

    Ok(entries)
}

fn listed_entry(name: String, metadata: &Metadata) -> ListedEntry {
    let is_directory = metadata.is_dir();
    ListedEntry {
        name,
        is_directory,
        size: if is_directory {
            None
        } else {
            Some(metadata.len())
        },
        modified: metadata.modified().ok(),
    }
}

/// Directories first, hidden first, then `key`.
///
/// A descending key reverses only the last tier; the grouping never flips.
fn compare_entries(a: &ListedEntry, b: &ListedEntry, key: SortKey) -> Ordering {
    b.is_directory
        .cmp(&a.is_directory)
        .then_with(|| b.is_hidden().cmp(&a.is_hidden()))
        .then_with(|| {
            let order = compare_by_field(a, b, key.field);
            if key.descending {
                order.reverse()
            } else {
                order
            }
        })
}

fn compare_by_field(a: &ListedEntry, b: &ListedEntry, field: SortField) -> Ordering {
    match field {
        SortField::Name => compare_names(a, b),
        SortField::Date => a.modified.cmp(&b.modified).then_with(|| compare_names(a, b)),
        SortField::Size => a
            .size
            .unwrap_or(0)
            .cmp(&b.size.unwrap_or(0))
            .then_with(|| compare_names(a, b)),
    }
}

fn compare_names(a: &ListedEntry, b: &ListedEntry) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
}
