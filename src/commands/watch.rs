//! Watch a collection and reload it on change

use anyhow::{Context, Result};
use notify::{EventKind, RecursiveMode, Watcher};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

use super::PageMeta;
use crate::config::CollectionConfig;
use crate::content::{self, DiskFs, LoadOptions};
use crate::Site;

/// Quiet period before a burst of file events triggers a reload
const DEBOUNCE: Duration = Duration::from_millis(300);

/// Load a collection into the global store and keep it fresh
pub async fn run(site: &Site, collection: &str) -> Result<()> {
    let collection = site
        .config
        .collection(collection)
        .with_context(|| format!("Unknown collection: {}", collection))?;

    let fsys = site.fs();
    let options = site.load_options();
    reload(&fsys, collection, &options)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher =
        notify::recommended_watcher(move |res: notify::Result<notify::Event>| forward(res, &tx))?;

    let dir = site.content_dir.join(&collection.dir);
    watcher.watch(&dir, RecursiveMode::Recursive)?;

    tracing::info!(
        "Watching {:?} for changes. Press Ctrl+C to stop.",
        dir
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                if !is_relevant(&event.kind, &event.paths) {
                    continue;
                }

                // Swallow the rest of the burst
                while let Ok(Some(_)) = tokio::time::timeout(DEBOUNCE, rx.recv()).await {}

                tracing::info!("Content changed, reloading {}", collection.name);
                if let Err(e) = reload(&fsys, collection, &options) {
                    tracing::error!("Reload failed: {}", e);
                }
            }
        }
    }

    Ok(())
}

/// Hand a watcher result to the reload loop
fn forward(res: notify::Result<notify::Event>, tx: &mpsc::UnboundedSender<notify::Event>) {
    match res {
        Ok(event) => {
            if tx.send(event).is_err() {
                tracing::debug!("Watch loop stopped, dropping file event");
            }
        }
        Err(e) => tracing::warn!("File watch error: {}", e),
    }
}

/// Reload one collection into the global store
fn reload(fsys: &DiskFs, collection: &CollectionConfig, options: &LoadOptions) -> Result<()> {
    let start = std::time::Instant::now();
    content::load_items::<PageMeta, _>(fsys, &collection.dir, options)?;
    let items = content::get_items::<PageMeta>()?;
    tracing::info!(
        "Loaded {} items for {} in {:.2}s",
        items.len(),
        collection.name,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Only writes to Markdown files (or whole directories) matter
fn is_relevant(kind: &EventKind, paths: &[impl AsRef<Path>]) -> bool {
    if kind.is_access() {
        return false;
    }
    paths.iter().any(|p| {
        let p = p.as_ref();
        p.extension().map_or(true, |ext| ext == "md")
    })
}
