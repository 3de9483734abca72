//! View-model definitions exchanged between the file browser engine and
//! its callers.
//!
//! Every type here is a plain serde value. The engine builds them fresh on
//! each request; nothing in this module touches the filesystem.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

// ============================================================================
// Sorting
// ============================================================================

/// Column a listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Case-insensitive file name.
    #[default]
    Name,
    /// Modification timestamp, oldest first.
    Date,
    /// Byte count, smallest first.
    Size,
}

impl SortField {
    /// Query-string token for this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Date => "date",
            Self::Size => "size",
        }
    }
}

/// Requested listing order, parsed from a `sort_by` value such as
/// `size_desc`.
///
/// Unknown values fall back to name ascending; parsing never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SortKey {
    /// Column to order by.
    pub field: SortField,
    /// Whether the order is reversed.
    pub descending: bool,
}

impl SortKey {
    /// Create a sort key.
    pub fn new(field: SortField, descending: bool) -> Self {
        Self { field, descending }
    }

    /// Parse a `sort_by` query value.
    pub fn parse(value: &str) -> Self {
        let value = value.trim().to_ascii_lowercase();
        let (base, descending) = match value.strip_suffix("_desc") {
            Some(base) => (base, true),
            None => (value.as_str(), false),
        };

        let field = match base {
            "name" => SortField::Name,
            "date" => SortField::Date,
            "size" => SortField::Size,
            _ => return Self::default(),
        };

        Self { field, descending }
    }
}

impl FromStr for SortKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "{}_desc", self.field.as_str())
        } else {
            f.write_str(self.field.as_str())
        }
    }
}

impl From<String> for SortKey {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<SortKey> for String {
    fn from(key: SortKey) -> Self {
        key.to_string()
    }
}

// ============================================================================
// Listing
// ============================================================================

/// Display projection of one directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntryView {
    /// Entry name (not full path). `..` for the parent-navigation entry.
    pub name: String,
    /// Whether the entry is (or links to) a directory.
    pub is_directory: bool,
    /// Slash-separated path relative to the served root, with a leading `/`.
    pub relative_path: String,
    /// Size in bytes. Absent for directories and the parent entry.
    pub size: Option<u64>,
    /// Human-readable size.
    pub size_human: Option<String>,
    /// Last modified timestamp (Unix epoch seconds).
    pub modified: Option<i64>,
    /// Human-readable modification time relative to now.
    pub modified_human: Option<String>,
    /// Display category (`python`, `archive`, `folder`, ...).
    pub category: String,
    /// Icon token for the category.
    pub icon: String,
    /// Color token for the category.
    pub color: String,
    /// Whether the UI may offer a delete action.
    pub deletable: bool,
}

impl DirEntryView {
    /// Whether this is the synthetic parent-navigation entry.
    pub fn is_parent_entry(&self) -> bool {
        self.name == ".."
    }
}

/// A listing entry with caller-derived links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// The entry itself.
    #[serde(flatten)]
    pub entry: DirEntryView,
    /// Link for navigating to or downloading the entry.
    pub url: String,
    /// Link for deleting the entry, when deletable.
    pub delete_url: Option<String>,
}

/// Administrative feature switches advertised to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Whether uploads are accepted.
    pub upload: bool,
    /// Whether folders may be created.
    pub new_folder: bool,
}

/// Full response for a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingResponse {
    /// Path that was listed, relative to the root.
    pub path: String,
    /// Sort order that was applied.
    pub sort_by: SortKey,
    /// Notice banner text.
    pub notice_text: String,
    /// Enabled features.
    pub features: FeatureFlags,
    /// Entries in display order.
    pub entries: Vec<ListingEntry>,
}

impl ListingResponse {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

// ============================================================================
// Mutations
// ============================================================================

/// Result of a stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Collision-free name the file was stored under.
    pub stored_name: String,
    /// Path of the stored file relative to the root.
    pub relative_path: String,
    /// Bytes written.
    pub size: u64,
    /// Hex-encoded SHA-256 of the stored bytes.
    pub sha256: String,
}

impl UploadResponse {
    /// Deserialize from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Result of a folder creation or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResponse {
    /// Path affected, relative to the root.
    pub relative_path: String,
}

// ============================================================================
// Software catalog
// ============================================================================

/// One downloadable file inside a tool version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogVersion {
    /// Label shown to users, e.g. `setup.exe (1.2.0)`.
    pub display: String,
    /// File name.
    pub name: String,
    /// Version directory name.
    pub version: String,
    /// Path of the file relative to the root.
    pub relative_path: String,
}

/// A tool and all of its released files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTool {
    /// Tool directory name.
    pub name: String,
    /// Released files across every version.
    pub versions: Vec<CatalogVersion>,
}

impl CatalogTool {
    /// Number of released files.
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }
}

/// A group of tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogGroup {
    /// Group directory name.
    pub group: String,
    /// Tools in the group.
    pub tools: Vec<CatalogTool>,
}

// ============================================================================
// Errors
// ============================================================================

/// Error message returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Error code for programmatic handling.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
    /// Optional context (e.g., the request path).
    pub context: Option<String>,
}

impl ErrorMessage {
    /// Deserialize from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Error codes for the failure kinds the engine reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request tried to leave the served root.
    PathEscapesRoot,
    /// The operation is administratively turned off.
    FeatureDisabled,
    /// The target does not exist.
    NotFound,
    /// The operating system refused the operation.
    PermissionDenied,
    /// A required field is missing or malformed.
    InvalidInput,
    /// Any other filesystem failure.
    InternalError,
}

impl ErrorCode {
    /// HTTP status a web caller should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::PathEscapesRoot | Self::InvalidInput => 400,
            Self::FeatureDisabled | Self::PermissionDenied => 403,
            Self::NotFound => 404,
            Self::InternalError => 500,
        }
    }

    /// Stable string form of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PathEscapesRoot => "path_escapes_root",
            Self::FeatureDisabled => "feature_disabled",
            Self::NotFound => "not_found",
            Self::PermissionDenied => "permission_denied",
            Self::InvalidInput => "invalid_input",
            Self::InternalError => "internal_error",
        }
    }
}

impl FromStr for ErrorCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "path_escapes_root" => Ok(Self::PathEscapesRoot),
            "feature_disabled" => Ok(Self::FeatureDisabled),
            "not_found" => Ok(Self::NotFound),
            "permission_denied" => Ok(Self::PermissionDenied),
            "invalid_input" => Ok(Self::InvalidInput),
            "internal_error" => Ok(Self::InternalError),
            other => Err(ProtocolError::UnknownErrorCode(other.to_string())),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
