//! List collection content

use anyhow::{Context, Result};

use super::PageMeta;
use crate::config::CollectionConfig;
use crate::content::{load_collection, ContentItem};
use crate::Site;

/// Load one collection, or all of them, and print their slugs
pub fn run(site: &Site, collection: Option<&str>) -> Result<()> {
    for (collection, items) in load(site, collection)? {
        println!("{} ({}):", collection.name, items.len());
        for item in items {
            let draft = if item.meta.draft { " [draft]" } else { "" };
            println!("  {} - {}{}", item.slug, item.meta.display_title(), draft);
        }
    }

    Ok(())
}

/// Load the selected collections in configuration order
pub fn load<'a>(
    site: &'a Site,
    collection: Option<&str>,
) -> Result<Vec<(&'a CollectionConfig, Vec<ContentItem<PageMeta>>)>> {
    let selected: Vec<&CollectionConfig> = match collection {
        Some(name) => vec![site.config.collection(name).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown collection: {}. Available: {}",
                name,
                collection_names(site)
            )
        })?],
        None => site.config.collections.iter().collect(),
    };

    let fsys = site.fs();
    let options = site.load_options();

    let mut loaded = Vec::with_capacity(selected.len());
    for c in selected {
        let items = load_collection::<PageMeta, _>(&fsys, &c.dir, &options)
            .with_context(|| format!("failed to load collection {}", c.name))?;
        loaded.push((c, items));
    }

    Ok(loaded)
}

fn collection_names(site: &Site) -> String {
    site.config
        .collections
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
