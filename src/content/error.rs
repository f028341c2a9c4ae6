//! Content pipeline errors

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for the content pipeline
pub type Result<T, E = ContentError> = std::result::Result<T, E>;

/// Errors produced while loading or reading content collections
#[derive(Debug, Error)]
pub enum ContentError {
    /// The collection root does not exist in the filesystem
    #[error("content directory is missing: {}", path.display())]
    MissingRoot { path: PathBuf },

    /// A directory could not be enumerated
    #[error("failed to walk directory {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A content file could not be read
    #[error("failed to read content file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A content file is not valid UTF-8
    #[error("content file {} is not valid UTF-8", path.display())]
    InvalidUtf8 { path: PathBuf },

    /// The front matter block could not be parsed
    #[error("failed to parse front matter in {}: {message}", path.display())]
    FrontMatter { path: PathBuf, message: String },

    /// Front matter is required but the file has none
    #[error("no front matter found in {}", path.display())]
    MissingFrontMatter { path: PathBuf },

    /// Code highlighting failed while rendering a file
    #[error("failed to highlight code in {}: {message}", path.display())]
    Highlight { path: PathBuf, message: String },

    /// `get_items` was called for a type that has not been loaded
    #[error("no items found for type {type_name}, ensure load_items was called")]
    NotLoaded { type_name: &'static str },
}

impl ContentError {
    /// The file or directory the error is about, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ContentError::MissingRoot { path }
            | ContentError::Walk { path, .. }
            | ContentError::Read { path, .. }
            | ContentError::InvalidUtf8 { path }
            | ContentError::FrontMatter { path, .. }
            | ContentError::MissingFrontMatter { path }
            | ContentError::Highlight { path, .. } => Some(path),
            ContentError::NotLoaded { .. } => None,
        }
    }

    /// Whether the error only means the collection has not been loaded yet
    pub fn is_not_loaded(&self) -> bool {
        matches!(self, ContentError::NotLoaded { .. })
    }
}
