//! Read-only filesystem abstraction for content loading
//!
//! Paths are slash-separated and relative to the filesystem root, so the
//! same collection can be loaded from disk or from memory.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use super::resolve::clean;

/// One entry produced by a recursive walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Slash-separated path relative to the filesystem root
    pub path: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
}

impl DirEntry {
    /// Last path component
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A walk that failed at `path`
#[derive(Debug, Error)]
#[error("{path}: {source}")]
pub struct WalkError {
    /// Normalized path of the entry the walk failed at
    pub path: String,
    #[source]
    pub source: io::Error,
}

impl WalkError {
    pub fn new(path: &str, source: io::Error) -> Self {
        Self {
            path: normalize_path(path),
            source,
        }
    }

    /// Whether the walk root itself does not exist
    pub fn is_missing_root(&self, root: &str) -> bool {
        self.source.kind() == io::ErrorKind::NotFound && self.path == normalize_path(root)
    }
}

/// Normalize a slash-separated path relative to the filesystem root
///
/// `./posts/`, `/posts` and `posts` all become `posts`; the root itself
/// becomes the empty string.
pub fn normalize_path(path: &str) -> String {
    match clean(path.trim_start_matches('/')).as_str() {
        "." => String::new(),
        cleaned => cleaned.to_string(),
    }
}

/// A read-only tree of content files
pub trait ContentFs {
    /// Recursively list `root` in lexical walk order, `root` itself first
    ///
    /// Entry paths are normalized with [`normalize_path`]. A missing `root`
    /// fails with [`io::ErrorKind::NotFound`] at `root` itself.
    fn walk(&self, root: &str) -> Result<Vec<DirEntry>, WalkError>;

    /// Read a file's bytes
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// Files on disk below a base directory
///
/// Symbolic links are listed but not followed, so a dangling link only
/// matters if it is read.
#[derive(Debug, Clone)]
pub struct DiskFs {
    base: PathBuf,
}

impl DiskFs {
    /// Create a filesystem rooted at `base`
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    /// The base directory
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn full_path(&self, path: &str) -> PathBuf {
        normalize_path(path)
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.base.clone(), |acc, segment| acc.join(segment))
    }

    /// Slash-separated form of a path below the base directory
    fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base).ok()?;
        Some(
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
        )
    }
}

impl ContentFs for DiskFs {
    fn walk(&self, root: &str) -> Result<Vec<DirEntry>, WalkError> {
        let root = normalize_path(root);
        let mut entries = Vec::new();

        for entry in WalkDir::new(self.full_path(&root)).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                let path = err
                    .path()
                    .and_then(|p| self.relative_path(p))
                    .unwrap_or_else(|| root.clone());
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"));
                WalkError::new(&path, source)
            })?;

            let path = self.relative_path(entry.path()).ok_or_else(|| {
                WalkError::new(
                    &root,
                    io::Error::new(io::ErrorKind::Other, "walk left the base directory"),
                )
            })?;

            entries.push(DirEntry {
                path: if path.is_empty() { ".".to_string() } else { path },
                is_dir: entry.file_type().is_dir(),
            });
        }

        Ok(entries)
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.full_path(path))
    }
}

/// In-memory files keyed by slash-separated path
///
/// Directories are implied by the file paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryFs {
    /// Create an empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        let path: String = path.into();
        self.files.insert(normalize_path(&path), data.into());
    }

    /// Builder-style [`MemoryFs::insert`]
    pub fn with_file(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    /// Remove a file
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(&normalize_path(path))
    }
}

impl ContentFs for MemoryFs {
    fn walk(&self, root: &str) -> Result<Vec<DirEntry>, WalkError> {
        let root = normalize_path(root);
        let prefix = if root.is_empty() {
            String::new()
        } else {
            format!("{}/", root)
        };

        if self.files.contains_key(&root) {
            return Ok(vec![DirEntry {
                path: root,
                is_dir: false,
            }]);
        }

        let mut dirs: BTreeMap<Vec<&str>, bool> = BTreeMap::new();
        for path in self.files.keys() {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            let segments: Vec<&str> = rest.split('/').collect();
            for depth in 1..segments.len() {
                dirs.insert(segments[..depth].to_vec(), true);
            }
            dirs.insert(segments, false);
        }

        if dirs.is_empty() && !root.is_empty() {
            return Err(WalkError::new(
                &root,
                io::Error::new(io::ErrorKind::NotFound, "no such directory"),
            ));
        }

        // Ordering by segment vectors yields a depth-first lexical walk
        let mut entries = vec![DirEntry {
            path: if root.is_empty() { ".".to_string() } else { root.clone() },
            is_dir: true,
        }];
        entries.extend(dirs.into_iter().map(|(segments, is_dir)| DirEntry {
            path: format!("{}{}", prefix, segments.join("/")),
            is_dir,
        }));

        Ok(entries)
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        self.files.get(&normalize_path(path)).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{}: no such file", path))
        })
    }
}
