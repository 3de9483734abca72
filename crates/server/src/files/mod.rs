//! File management confined to a single served root.
//!
//! This module provides:
//! - Resolution of untrusted request paths to locations inside the root
//! - Sorted, classified directory listings
//! - Uploads with collision-free names
//! - Folder creation and recursive deletion
//! - The software release catalog
//!
//! Every operation goes through [`Resolver`] first, so nothing outside the
//! root is ever read, written or removed.

mod catalog;
pub mod classifier;
mod error;
pub mod format;
mod listing;
mod manager;
mod mutations;
pub mod resolver;
mod upload;

pub use catalog::ReleaseTarget;
pub use classifier::{CategoryTable, Classification};
pub use error::{Feature, FileError};
pub use listing::LocatedFile;
pub use manager::{FileManager, DEFAULT_CATALOG_DIR, DEFAULT_MAX_UPLOAD_SIZE};
pub use resolver::{normalize_relative, ResolvedPath, Resolver, Root};
pub use upload::{
    sanitize_filename, split_extension, PartialUpload, ReservedUpload, UploadProgress,
    UPLOAD_BUFFER_SIZE,
};
