/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the database layer and the UI layer.

use serde::{Deserialize, Serialize};

/// Media details for an image's binary content
///
/// Stored as JSON in the catalog so the column can grow new fields
/// without a schema migration.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(default)]
pub struct ImageDescriptor {
    /// Pixel width of the image
    pub width: u32,
    /// Pixel height of the image
    pub height: u32,
    /// Size of the content file in bytes
    pub size_bytes: u64,
}

impl ImageDescriptor {
    /// Convert to JSON string for database storage
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string (from database)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Represents a single image resource in the library
#[derive(Debug, Clone, PartialEq)]
pub struct ImageResource {
    /// Unique database ID
    pub id: i64,
    /// Unique resource key, derived from the original file name
    pub key: String,
    /// Display title, editable in the details dialog
    pub title: String,
    /// Original file name (used as the download suggestion)
    pub file_name: String,
    /// Sniffed media type (e.g. "image/png")
    pub media_type: String,
    /// Location of the binary content in the content store.
    /// Versioned: every content replacement yields a fresh path.
    pub content_path: String,
    /// Media details (dimensions, content size)
    pub descriptor: ImageDescriptor,
    /// File status: 'exists' or 'missing'
    pub file_status: String,
    /// Path to the cached grid thumbnail (None if not yet generated)
    pub thumbnail_path: Option<String>,
}

impl ImageResource {
    /// The backing content file has gone missing from the store.
    /// Such images open read-only in the details dialog.
    pub fn is_missing(&self) -> bool {
        self.file_status == "missing"
    }
}
