//! Safe path resolution beneath the served root.
//!
//! Every listing, upload and mutation goes through [`Resolver`]. It is the
//! only place that decides whether a caller-supplied path stays inside the
//! root; no other module performs its own prefix checks.
//!
//! Resolution walks the request path one component at a time. Each existing
//! prefix is canonicalized (resolving symlinks), components that do not
//! exist yet are appended as-is, and the walk fails the moment the current
//! location leaves the root. Containment is checked on path components, so
//! `/srv/files-old` is never mistaken for a child of `/srv/files`.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use super::error::FileError;

/// The served root directory, canonicalized once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    path: PathBuf,
}

impl Root {
    /// Canonicalize `path` and check that it is a directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, FileError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let canonical = fs::canonicalize(path).map_err(|e| FileError::from_io(e, &display))?;
        if !canonical.is_dir() {
            return Err(FileError::InvalidInput(format!(
                "root is not a directory: {}",
                display
            )));
        }

        Ok(Self { path: canonical })
    }

    /// Canonical absolute path of the root.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A location proven to be inside the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Absolute filesystem path.
    absolute: PathBuf,
    /// Slash-separated path relative to the root, always with a leading `/`.
    relative: String,
}

impl ResolvedPath {
    /// Absolute filesystem path.
    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    /// Root-relative form, valid as input to [`Resolver::resolve`].
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Whether this is the root itself.
    pub fn is_root(&self) -> bool {
        self.relative == "/"
    }

    /// Root-relative path of the parent, or `None` for the root.
    pub fn parent_relative(&self) -> Option<String> {
        if self.is_root() {
            return None;
        }

        match self.relative.rfind('/') {
            Some(0) | None => Some("/".to_string()),
            Some(index) => Some(self.relative[..index].to_string()),
        }
    }

    /// Root-relative path of a child named `name`.
    pub fn join_name(&self, name: &str) -> String {
        normalize_relative(&format!("{}/{}", self.relative, name))
    }
}

/// Collapse duplicate slashes and force a single leading `/`.
pub fn normalize_relative(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Maps untrusted request paths to locations inside the root.
#[derive(Debug, Clone)]
pub struct Resolver {
    root: Root,
}

impl Resolver {
    /// Create a resolver for `root`.
    pub fn new(root: Root) -> Self {
        Self { root }
    }

    /// The root this resolver confines paths to.
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// Resolve a request path, following every symlink.
    ///
    /// The target does not have to exist. Fails with
    /// [`FileError::PathEscapesRoot`] for `..` traversal above the root,
    /// absolute overrides, and symlinks that lead outside.
    pub fn resolve(&self, request_path: &str) -> Result<ResolvedPath, FileError> {
        self.walk(request_path, true)
    }

    /// Resolve a request path without following a symlink in the final
    /// component.
    ///
    /// Used where the entry itself matters rather than what it points at,
    /// such as deleting a link.
    pub fn resolve_entry(&self, request_path: &str) -> Result<ResolvedPath, FileError> {
        self.walk(request_path, false)
    }

    fn walk(&self, request_path: &str, follow_last: bool) -> Result<ResolvedPath, FileError> {
        if request_path.contains('\0') {
            return Err(FileError::InvalidInput("path contains a NUL byte".to_string()));
        }

        let relative = request_path.strip_prefix('/').unwrap_or(request_path);
        let root = self.root.path();
        let components: Vec<Component<'_>> = Path::new(relative).components().collect();
        let mut current = root.to_path_buf();

        for (index, component) in components.iter().enumerate() {
            match component {
                Component::Normal(name) => {
                    current.push(name);
                    let is_last = index + 1 == components.len();
                    if follow_last || !is_last {
                        // Missing components stay lexical until something exists again.
                        if let Ok(canonical) = fs::canonicalize(&current) {
                            current = canonical;
                        }
                    }
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    current.pop();
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(self.escape(request_path));
                }
            }

            if !current.starts_with(root) {
                return Err(self.escape(request_path));
            }
        }

        let relative = match current.strip_prefix(root) {
            Ok(rest) => {
                let segments: Vec<String> = rest
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                format!("/{}", segments.join("/"))
            }
            Err(_) => return Err(self.escape(request_path)),
        };

        Ok(ResolvedPath {
            absolute: current,
            relative,
        })
    }

    fn escape(&self, request_path: &str) -> FileError {
        warn!(path = %request_path, "Rejected path outside the served root");
        FileError::PathEscapesRoot(request_path.to_string())
    }
}
