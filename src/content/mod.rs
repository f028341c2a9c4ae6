//! Content module - typed Markdown collections
//!
//! ```ignore
//! #[derive(Default, Deserialize)]
//! struct Post { title: String }
//!
//! content::load_items::<Post, _>(&DiskFs::new("content"), "posts", &LoadOptions::new())?;
//! for item in content::get_items::<Post>()?.iter() {
//!     println!("{} -> {}", item.slug, item.meta.title);
//! }
//! ```

mod error;
pub mod frontmatter;
pub mod fs;
mod highlight;
mod item;
pub mod loader;
pub mod render;
pub mod resolve;
pub mod store;

pub use error::{ContentError, Result};
pub use frontmatter::{FrontMatter, FrontMatterFormat};
pub use fs::{ContentFs, DirEntry, DiskFs, MemoryFs, WalkError};
pub use highlight::Highlighter;
pub use item::ContentItem;
pub use loader::{derive_slug, load_collection, load_file, LoadOptions};
pub use render::{AssetRewriter, ImageExtension, LinkResolver, MarkdownRenderer};
pub use store::{clear_items, get_items, load_items, ContentStore, Items};
