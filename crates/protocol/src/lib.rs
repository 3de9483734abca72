//! # File Browser Protocol Library
//!
//! This crate defines the values exchanged between the file browser engine
//! and whatever front end drives it (the bundled HTTP adapter, or any other
//! caller).
//!
//! ## Overview
//!
//! - **Listing views**: [`DirEntryView`] and [`ListingResponse`], the
//!   display projection of a directory
//! - **Sorting**: [`SortKey`], parsed leniently from `sort_by` values
//! - **Mutation results**: [`UploadResponse`], [`MutationResponse`]
//! - **Catalog views**: groups, tools and versions of the software catalog
//! - **Errors**: [`ErrorCode`] with its HTTP status mapping and the
//!   [`ErrorMessage`] body
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{ErrorCode, SortField, SortKey};
//!
//! let key = SortKey::parse("size_desc");
//! assert_eq!(key.field, SortField::Size);
//! assert!(key.descending);
//!
//! assert_eq!(ErrorCode::PathEscapesRoot.http_status(), 400);
//! ```
//!
//! ## Modules
//!
//! - [`messages`]: View-model definitions
//! - [`error`]: Error types

pub mod error;
pub mod messages;

pub use error::{ProtocolError, Result};
pub use messages::{
    CatalogGroup, CatalogTool, CatalogVersion, DirEntryView, ErrorCode, ErrorMessage,
    FeatureFlags, ListingEntry, ListingResponse, MutationResponse, SortField, SortKey,
    UploadResponse,
};
