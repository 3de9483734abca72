//! # File Browser Library
//!
//! A file manager served over HTTP, confined to a single root directory.
//!
//! ## Overview
//!
//! - **Path resolution**: every request path is mapped into the served root
//!   or rejected, including traversal through symlinks
//! - **Listings**: directories first, hidden entries first, then the
//!   requested sort key, with a display category for every file
//! - **Mutations**: uploads with collision-free names, folder creation and
//!   recursive delete, each behind the same containment check
//! - **Software catalog**: released files grouped as `group/tool/version`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use filebrowser::files::{FileManager, Root};
//! use protocol::SortKey;
//!
//! let files = FileManager::new(Root::new("/srv/share")?);
//! if let Some(entries) = files.list("/docs", SortKey::parse("size_desc"), true)? {
//!     for entry in entries {
//!         println!("{} {}", entry.icon, entry.name);
//!     }
//! }
//! # Ok::<(), filebrowser::files::FileError>(())
//! ```
//!
//! ## Modules
//!
//! - [`files`]: The confined file engine
//! - [`config`]: TOML configuration
//! - [`http`]: The axum router over the engine

pub mod config;
pub mod files;
pub mod http;

pub use config::{Config, ConfigError};
pub use files::{FileError, FileManager};
pub use http::{router, AppState};
