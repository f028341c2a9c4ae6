//! Content item model

use serde::Serialize;

/// One rendered content file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentItem<T> {
    /// Decoded front matter
    pub meta: T,

    /// Raw markdown body, front matter stripped
    pub content: String,

    /// Rendered HTML, including any appended highlight stylesheet
    pub html: String,

    /// Routing path derived from the file path
    pub slug: String,
}

impl<T> ContentItem<T> {
    /// Find an item by slug
    pub fn find<'a>(items: &'a [ContentItem<T>], slug: &str) -> Option<&'a ContentItem<T>> {
        items.iter().find(|item| item.slug == slug)
    }
}
