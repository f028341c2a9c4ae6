//! Typed content store
//!
//! Holds one list of [`ContentItem`]s per metadata type. Each list is
//! replaced as a whole: readers either see the previous complete list, no
//! list, or the new complete list, never a partially loaded one.
//!
//! Loads for the same type must not run concurrently; callers load their
//! collections up front (or from a single watcher) and read from anywhere.

use lazy_static::lazy_static;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use super::error::{ContentError, Result};
use super::fs::ContentFs;
use super::loader::{load_collection, LoadOptions};
use super::ContentItem;

/// Shared handle to a loaded list of items
pub type Items<T> = Arc<Vec<ContentItem<T>>>;

lazy_static! {
    /// Process-wide store used by [`load_items`] and [`get_items`]
    static ref GLOBAL_STORE: ContentStore = ContentStore::new();
}

/// Registry of loaded collections keyed by metadata type
#[derive(Default)]
pub struct ContentStore {
    entries: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl ContentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the collection for `T`, replacing any previous list
    ///
    /// The previous list is dropped before the walk starts. On failure the
    /// type stays unloaded.
    pub fn load<T, F>(&self, fsys: &F, root: &str, options: &LoadOptions) -> Result<()>
    where
        T: DeserializeOwned + Default + Send + Sync + 'static,
        F: ContentFs + ?Sized,
    {
        let key = TypeId::of::<T>();
        self.entries.write().remove(&key);

        let items = load_collection::<T, F>(fsys, root, options)?;
        self.entries.write().insert(key, Arc::new(items));
        Ok(())
    }

    /// All items for `T`
    pub fn get_items<T>(&self) -> Result<Items<T>>
    where
        T: Send + Sync + 'static,
    {
        let erased = self
            .entries
            .read()
            .get(&TypeId::of::<T>())
            .cloned()
            .ok_or(ContentError::NotLoaded {
                type_name: std::any::type_name::<T>(),
            })?;

        erased
            .downcast::<Vec<ContentItem<T>>>()
            .map_err(|_| ContentError::NotLoaded {
                type_name: std::any::type_name::<T>(),
            })
    }

    /// Whether a load for `T` has completed
    pub fn is_loaded<T: 'static>(&self) -> bool {
        self.entries.read().contains_key(&TypeId::of::<T>())
    }

    /// Forget the list for `T`
    pub fn unload<T: 'static>(&self) {
        self.entries.write().remove(&TypeId::of::<T>());
    }

    /// Forget every loaded list
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of loaded types
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is loaded
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// The process-wide store
pub fn global() -> &'static ContentStore {
    &GLOBAL_STORE
}

/// Load the collection for `T` into the process-wide store
pub fn load_items<T, F>(fsys: &F, root: &str, options: &LoadOptions) -> Result<()>
where
    T: DeserializeOwned + Default + Send + Sync + 'static,
    F: ContentFs + ?Sized,
{
    GLOBAL_STORE.load::<T, F>(fsys, root, options)
}

/// Items for `T` from the process-wide store
pub fn get_items<T>() -> Result<Items<T>>
where
    T: Send + Sync + 'static,
{
    GLOBAL_STORE.get_items::<T>()
}

/// Forget every list in the process-wide store
pub fn clear_items() {
    GLOBAL_STORE.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::fs::MemoryFs;
    use crate::content::loader::tests::{setup_test_fs, Post};
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Page {
        title: String,
    }

    #[test]
    fn test_get_items_without_loading() {
        let store = ContentStore::new();
        let err = store.get_items::<Post>().unwrap_err();
        assert!(err.is_not_loaded());
        assert!(err.to_string().contains("Post"));
    }

    #[test]
    fn test_load_and_get_items() {
        let store = ContentStore::new();
        store
            .load::<Post, _>(&setup_test_fs(), "posts", &LoadOptions::new())
            .unwrap();

        let items = store.get_items::<Post>().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].meta.title, "Some Post");
        assert!(store.is_loaded::<Post>());
    }

    #[test]
    fn test_types_are_isolated() {
        let store = ContentStore::new();
        let pages = MemoryFs::new().with_file("pages/about.md", "---\ntitle: About\n---\nHi");

        store
            .load::<Post, _>(&setup_test_fs(), "posts", &LoadOptions::new())
            .unwrap();
        assert!(store.get_items::<Page>().unwrap_err().is_not_loaded());

        store
            .load::<Page, _>(&pages, "pages", &LoadOptions::new())
            .unwrap();
        assert_eq!(store.get_items::<Page>().unwrap()[0].meta.title, "About");
        assert_eq!(store.get_items::<Post>().unwrap().len(), 4);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_reload_replaces_list() {
        let store = ContentStore::new();
        let mut fsys = setup_test_fs();
        store
            .load::<Post, _>(&fsys, "posts", &LoadOptions::new())
            .unwrap();
        let before = store.get_items::<Post>().unwrap();

        fsys.remove("posts/2014/some-post.md");
        store
            .load::<Post, _>(&fsys, "posts", &LoadOptions::new())
            .unwrap();

        // Readers holding the old list keep it intact
        assert_eq!(before.len(), 4);
        assert_eq!(store.get_items::<Post>().unwrap().len(), 3);
    }

    #[test]
    fn test_failed_load_unloads_type() {
        let store = ContentStore::new();
        let mut fsys = setup_test_fs();
        store
            .load::<Post, _>(&fsys, "posts", &LoadOptions::new())
            .unwrap();

        fsys.insert("posts/2015/broken.md", "---\ntitle: [oops\n---\n");
        assert!(store
            .load::<Post, _>(&fsys, "posts", &LoadOptions::new())
            .is_err());
        assert!(store.get_items::<Post>().unwrap_err().is_not_loaded());
    }

    #[test]
    fn test_missing_root_unloads_type() {
        let store = ContentStore::new();
        let err = store
            .load::<Post, _>(&MemoryFs::new(), "posts", &LoadOptions::new())
            .unwrap_err();
        assert!(matches!(err, ContentError::MissingRoot { .. }));
        assert!(!store.is_loaded::<Post>());
    }

    #[test]
    fn test_clear_and_unload() {
        let store = ContentStore::new();
        store
            .load::<Post, _>(&setup_test_fs(), "posts", &LoadOptions::new())
            .unwrap();
        store.unload::<Post>();
        assert!(store.is_empty());

        store
            .load::<Post, _>(&setup_test_fs(), "posts", &LoadOptions::new())
            .unwrap();
        store.clear();
        assert!(store.get_items::<Post>().is_err());
    }

    #[test]
    fn test_concurrent_readers() {
        let store = Arc::new(ContentStore::new());
        store
            .load::<Post, _>(&setup_test_fs(), "posts", &LoadOptions::new())
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.get_items::<Post>().unwrap().len())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 4);
        }
    }

    #[test]
    fn test_global_store() {
        #[derive(Debug, Default, Deserialize)]
        struct GlobalOnly {}

        assert!(get_items::<GlobalOnly>().is_err());
        let fsys = MemoryFs::new().with_file("notes/a.md", "---\n---\nA");
        load_items::<GlobalOnly, _>(&fsys, "notes", &LoadOptions::new()).unwrap();
        assert_eq!(get_items::<GlobalOnly>().unwrap()[0].slug, "a");
        assert!(global().is_loaded::<GlobalOnly>());
    }
}
