//! Configuration module

mod site;

pub use site::CollectionConfig;
pub use site::FrontMatterConfig;
pub use site::HighlightConfig;
pub use site::MarkdownConfig;
pub use site::SiteConfig;
