//! Render a single content file

use anyhow::{Context, Result};
use std::path::Path;

use super::PageMeta;
use crate::content::{load_file, ContentItem};
use crate::Site;

/// Render one Markdown file and print its HTML
pub fn run(site: &Site, file: &Path) -> Result<()> {
    let item = render(site, file)?;
    tracing::info!("Rendered {} ({})", item.slug, item.meta.display_title());
    println!("{}", item.html);
    Ok(())
}

/// Render a file inside the content directory
///
/// The path may be absolute or relative to the content directory.
pub fn render(site: &Site, file: &Path) -> Result<ContentItem<PageMeta>> {
    let relative = if file.is_absolute() {
        file.strip_prefix(&site.content_dir)
            .with_context(|| format!("{:?} is outside {:?}", file, site.content_dir))?
    } else {
        file
    };

    let path = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let item = load_file::<PageMeta, _>(&site.fs(), "", &path, &site.load_options())?;
    Ok(item)
}
