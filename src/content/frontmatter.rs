//! Front-matter splitting
//!
//! A content file may start with a fenced metadata block. The fence decides
//! the format:
//!
//! ```text
//! ---            +++            ;;;
//! title: YAML    title = "TOML" { "title": "JSON" }
//! ---            +++            ;;;
//! ```
//!
//! Everything after the closing fence line is the Markdown body.

use serde::de::DeserializeOwned;
use std::fmt;
use thiserror::Error;

/// Front-matter block formats, identified by their fence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontMatterFormat {
    Yaml,
    Toml,
    Json,
}

impl FrontMatterFormat {
    fn from_fence(line: &str) -> Option<Self> {
        match line {
            "---" => Some(Self::Yaml),
            "+++" => Some(Self::Toml),
            ";;;" => Some(Self::Json),
            _ => None,
        }
    }

    fn fence(self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
            Self::Json => ";;;",
        }
    }
}

impl fmt::Display for FrontMatterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Yaml => "YAML",
            Self::Toml => "TOML",
            Self::Json => "JSON",
        };
        f.write_str(name)
    }
}

/// Why a front-matter block could not be split off
#[derive(Debug, Error)]
pub enum FrontMatterError {
    #[error("{0} front matter is not terminated")]
    Unterminated(FrontMatterFormat),

    #[error("invalid {format} front matter: {message}")]
    Parse {
        format: FrontMatterFormat,
        message: String,
    },

    #[error("front matter is required but missing")]
    Missing,
}

/// A content file split into decoded metadata and Markdown body
#[derive(Debug)]
pub struct FrontMatter<'a, T> {
    /// Decoded metadata, `T::default()` when the file has no block
    pub meta: T,
    /// The body after the closing fence
    pub body: &'a str,
    /// The detected block format
    pub format: Option<FrontMatterFormat>,
}

impl<'a, T> FrontMatter<'a, T>
where
    T: DeserializeOwned + Default,
{
    /// Split `content` into metadata and body
    ///
    /// With `required` set, a file without a leading block is an error;
    /// otherwise the metadata falls back to `T::default()` and the whole
    /// file is the body.
    pub fn parse(content: &'a str, required: bool) -> Result<Self, FrontMatterError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let (first_line, rest) = split_line(content);
        let Some(format) = FrontMatterFormat::from_fence(first_line.trim_end()) else {
            if required {
                return Err(FrontMatterError::Missing);
            }
            return Ok(Self {
                meta: T::default(),
                body: content,
                format: None,
            });
        };

        let (block, body) =
            find_closing_fence(rest, format.fence()).ok_or(FrontMatterError::Unterminated(format))?;

        let meta = if block.trim().is_empty() {
            T::default()
        } else {
            decode(block, format)?
        };

        Ok(Self {
            meta,
            body,
            format: Some(format),
        })
    }
}

fn decode<T: DeserializeOwned>(block: &str, format: FrontMatterFormat) -> Result<T, FrontMatterError> {
    let parsed = match format {
        FrontMatterFormat::Yaml => serde_yaml::from_str(block).map_err(|e| e.to_string()),
        FrontMatterFormat::Toml => toml::from_str(block).map_err(|e| e.to_string()),
        FrontMatterFormat::Json => serde_json::from_str(block).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| FrontMatterError::Parse { format, message })
}

/// Split off the first line, without its terminator
fn split_line(s: &str) -> (&str, &str) {
    match s.find('\n') {
        Some(pos) => (s[..pos].trim_end_matches('\r'), &s[pos + 1..]),
        None => (s, ""),
    }
}

/// Find the closing fence line; returns (block, body)
fn find_closing_fence<'a>(s: &'a str, fence: &str) -> Option<(&'a str, &'a str)> {
    let mut offset = 0;
    while offset <= s.len() {
        let rest = &s[offset..];
        let (line, after) = split_line(rest);
        if line.trim_end() == fence {
            return Some((&s[..offset], after));
        }
        if after.len() == rest.len() || rest.is_empty() {
            return None;
        }
        offset = s.len() - after.len();
    }
    None
}
