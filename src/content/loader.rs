//! Content loader - walks a collection directory and renders every Markdown file

use serde::de::DeserializeOwned;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use super::error::{ContentError, Result};
use super::frontmatter::{FrontMatter, FrontMatterError};
use super::fs::{normalize_path, ContentFs};
use super::render::{AssetRewriter, ImageExtension, LinkResolver, MarkdownRenderer};
use super::resolve::{dirname, join};
use super::ContentItem;
use crate::config::SiteConfig;

/// Virtual prefix that relative image paths are resolved under
pub const DEFAULT_MOUNT_PREFIX: &str = "/content";

/// Settings shared by every file of a load
#[derive(Clone)]
pub struct LoadOptions {
    renderer: MarkdownRenderer,
    mount_prefix: String,
    require_front_matter: bool,
    image_callback: Option<AssetRewriter>,
    resolve_link: Option<LinkResolver>,
}

impl LoadOptions {
    /// Default options: highlighting on, front matter optional
    pub fn new() -> Self {
        Self {
            renderer: MarkdownRenderer::new(),
            mount_prefix: DEFAULT_MOUNT_PREFIX.to_string(),
            require_front_matter: false,
            image_callback: None,
            resolve_link: None,
        }
    }

    /// Options matching a site configuration
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            renderer: MarkdownRenderer::with_options(&config.markdown, &config.highlight),
            mount_prefix: config.mount_prefix.clone(),
            require_front_matter: config.front_matter.required,
            image_callback: None,
            resolve_link: None,
        }
    }

    /// Pass every rendered image tag through `callback`
    pub fn image_post_process<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.image_callback = Some(Arc::new(callback));
        self
    }

    /// Render non-embed wikilinks as anchors to `resolve(target)`
    pub fn resolve_link<F>(mut self, resolve: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.resolve_link = Some(Arc::new(resolve));
        self
    }

    /// Set the virtual prefix for relative image paths
    pub fn mount_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.mount_prefix = prefix.into();
        self
    }

    /// Fail files that have no front matter block
    pub fn require_front_matter(mut self, required: bool) -> Self {
        self.require_front_matter = required;
        self
    }

    /// Use a custom renderer
    pub fn renderer(mut self, renderer: MarkdownRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Parent path for resolving targets inside `path`
    fn parent_path(&self, path: &str) -> String {
        dirname(&join(&self.mount_prefix, path))
    }

    fn extension_for(&self, path: &str) -> ImageExtension {
        ImageExtension::new(self.parent_path(path))
            .with_callback(self.image_callback.clone())
            .with_link_resolver(self.resolve_link.clone())
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("renderer", &self.renderer)
            .field("mount_prefix", &self.mount_prefix)
            .field("require_front_matter", &self.require_front_matter)
            .field("image_callback", &self.image_callback.is_some())
            .field("resolve_link", &self.resolve_link.is_some())
            .finish()
    }
}

/// Load every Markdown file below `root` into content items
///
/// Items come back in walk order. Any failure aborts the whole load.
pub fn load_collection<T, F>(
    fsys: &F,
    root: &str,
    options: &LoadOptions,
) -> Result<Vec<ContentItem<T>>>
where
    T: DeserializeOwned + Default,
    F: ContentFs + ?Sized,
{
    let type_name = std::any::type_name::<T>();
    let root = normalize_path(root);
    tracing::info!("Loading content for {} from {:?}", type_name, root);

    let entries = fsys.walk(&root).map_err(|err| {
        if err.is_missing_root(&root) {
            ContentError::MissingRoot {
                path: PathBuf::from(&root),
            }
        } else {
            ContentError::Walk {
                path: PathBuf::from(&err.path),
                source: err.source,
            }
        }
    })?;

    let mut items = Vec::new();
    for entry in entries {
        if entry.is_dir || !is_markdown_file(entry.name()) {
            continue;
        }
        tracing::debug!("Loading content file {}", entry.path);
        items.push(load_file(fsys, &root, &entry.path, options)?);
    }

    tracing::info!("Loaded {} items for {}", items.len(), type_name);
    Ok(items)
}

/// Load and render a single content file
///
/// `root` only affects the slug; `path` is read as given.
pub fn load_file<T, F>(fsys: &F, root: &str, path: &str, options: &LoadOptions) -> Result<ContentItem<T>>
where
    T: DeserializeOwned + Default,
    F: ContentFs + ?Sized,
{
    let bytes = fsys.read(path).map_err(|source| ContentError::Read {
        path: PathBuf::from(path),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|_| ContentError::InvalidUtf8 {
        path: PathBuf::from(path),
    })?;

    let fm = FrontMatter::<T>::parse(&text, options.require_front_matter).map_err(|e| match e {
        FrontMatterError::Missing => ContentError::MissingFrontMatter {
            path: PathBuf::from(path),
        },
        other => ContentError::FrontMatter {
            path: PathBuf::from(path),
            message: other.to_string(),
        },
    })?;

    let ext = options.extension_for(path);
    let html = options
        .renderer
        .render(fm.body, &ext)
        .map_err(|e| ContentError::Highlight {
            path: PathBuf::from(path),
            message: e.to_string(),
        })?;

    Ok(ContentItem {
        meta: fm.meta,
        content: fm.body.to_string(),
        html,
        slug: derive_slug(root, path),
    })
}

/// Routing slug for a content file
///
/// Both paths are normalized first. The path is taken relative to `root`,
/// the `.md` extension is dropped and a trailing `/index` segment is
/// removed, so `posts/2024/foo/index.md` and
/// `posts/2024/foo.md` both map to `2024/foo`.
pub fn derive_slug(root: &str, path: &str) -> String {
    let root = normalize_path(root);
    let path = normalize_path(path);

    let relative = if root.is_empty() {
        path.as_str()
    } else {
        path.strip_prefix(root.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&path)
    };

    let without_ext = relative.strip_suffix(".md").unwrap_or(relative);
    without_ext
        .strip_suffix("/index")
        .unwrap_or(without_ext)
        .to_string()
}

/// Check if a file name is a markdown file
fn is_markdown_file(name: &str) -> bool {
    name.ends_with(".md")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::content::fs::{DirEntry, DiskFs, MemoryFs, WalkError};
    use serde::Deserialize;
    use std::fs;
    use std::io;
    use tempfile::TempDir;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default, Clone, PartialEq, Deserialize)]
    #[serde(default)]
    pub(crate) struct Post {
        pub title: String,
        pub description: String,
        pub date: String,
    }

    pub(crate) fn setup_test_fs() -> MemoryFs {
        MemoryFs::new()
            .with_file(
                "posts/2014/some-post.md",
                "---
title: Some Post
date: 2014-01-06
description: Brief description of some post
---
This is the content of Some Post.

## It is markdown.",
            )
            .with_file(
                "posts/2024/test-1-two/index.md",
                "---
title: Index Post
date: 2024-01-01
description: Test index post
---
This is an index post.",
            )
            .with_file(
                "posts/2020/images-test.md",
                "---
title: Images Test
date: 2024-01-01
description: Test post with various image types
---
# Testing Images

1. Hotlink: ![hotlink](https://example.com/image.jpg)
2. Data URL: ![data url](data:image/png;base64,abc123)
3. Absolute path: ![absolute](/images/test.png)
4. Relative path: ![relative](./images/test.jpg)",
            )
            .with_file(
                "posts/2023/wikilink-test.md",
                "---
title: Wikilink Images Test
date: 2023-05-15
description: Test post with Obsidian wiki-style image embeds
---
# Testing Wikilinks

1. Wiki image: ![[photo.png]]
2. Wiki image with path: ![[assets/diagram.jpg]]
3. Non-image wikilink: ![[document.pdf]]
4. Regular wikilink (not embed): [[another-page]]",
            )
            .with_file("posts/2023/notes.txt", "not markdown")
    }

    fn find<'a>(items: &'a [ContentItem<Post>], title: &str) -> &'a ContentItem<Post> {
        items
            .iter()
            .find(|item| item.meta.title == title)
            .unwrap_or_else(|| panic!("missing item {:?}", title))
    }

    #[test]
    fn test_load_collection() {
        let items: Vec<ContentItem<Post>> =
            load_collection(&setup_test_fs(), "posts", &LoadOptions::new()).unwrap();
        assert_eq!(items.len(), 4);

        let item = &items[0];
        assert_eq!(item.meta.title, "Some Post");
        assert_eq!(item.meta.date, "2014-01-06");
        assert_eq!(item.meta.description, "Brief description of some post");
        assert!(item
            .content
            .contains("This is the content of Some Post.\n\n## It is markdown."));
        assert!(item.html.contains("<h2>It is markdown.</h2>"));
        assert_eq!(item.slug, "2014/some-post");
    }

    #[test]
    fn test_walk_order() {
        let items: Vec<ContentItem<Post>> =
            load_collection(&setup_test_fs(), "posts", &LoadOptions::new()).unwrap();
        let slugs: Vec<&str> = items.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(
            slugs,
            vec![
                "2014/some-post",
                "2020/images-test",
                "2023/wikilink-test",
                "2024/test-1-two"
            ]
        );
    }

    #[test]
    fn test_index_slug() {
        let items: Vec<ContentItem<Post>> =
            load_collection(&setup_test_fs(), "posts", &LoadOptions::new()).unwrap();
        assert_eq!(find(&items, "Index Post").slug, "2024/test-1-two");
    }

    #[test]
    fn test_image_urls() {
        let items: Vec<ContentItem<Post>> =
            load_collection(&setup_test_fs(), "posts", &LoadOptions::new()).unwrap();
        let html = &find(&items, "Images Test").html;

        assert!(html.contains(r#"<img src="https://example.com/image.jpg""#));
        assert!(html.contains(r#"<img src="data:image/png;base64,abc123""#));
        assert!(html.contains(r#"<img src="/images/test.png""#));
        assert!(
            html.contains(r#"<img src="/content/posts/2020/images/test.jpg""#),
            "{}",
            html
        );
    }

    #[test]
    fn test_wikilink_images() {
        let items: Vec<ContentItem<Post>> =
            load_collection(&setup_test_fs(), "posts", &LoadOptions::new()).unwrap();
        let html = &find(&items, "Wikilink Images Test").html;

        assert!(html.contains(r#"<img src="/content/posts/2023/photo.png""#));
        assert!(html.contains(r#"<img src="/content/posts/2023/diagram.jpg""#));
        assert!(html.contains(r#"alt="photo.png""#));
        assert!(!html.contains(r#"<img src="/content/posts/2023/document.pdf""#));
    }

    #[test]
    fn test_custom_mount_prefix() {
        let options = LoadOptions::new().mount_prefix("/static");
        let items: Vec<ContentItem<Post>> =
            load_collection(&setup_test_fs(), "posts", &options).unwrap();
        assert!(find(&items, "Wikilink Images Test")
            .html
            .contains(r#"<img src="/static/posts/2023/photo.png""#));
    }

    #[test]
    fn test_image_callback_and_link_resolver() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let options = LoadOptions::new()
            .image_post_process(move |tag| {
                counter.fetch_add(1, Ordering::SeqCst);
                tag.replace("/content/", "/assets/")
            })
            .resolve_link(|target| format!("/posts/{}", target));

        let items: Vec<ContentItem<Post>> =
            load_collection(&setup_test_fs(), "posts", &options).unwrap();
        let html = &find(&items, "Wikilink Images Test").html;

        assert!(html.contains(r#"<img src="/assets/posts/2023/photo.png""#));
        assert!(html.contains(r#"<a href="/posts/another-page">another-page</a>"#), "{}", html);
        // four regular images plus two image embeds
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_load_is_idempotent() {
        let fsys = setup_test_fs();
        let first: Vec<ContentItem<Post>> =
            load_collection(&fsys, "posts", &LoadOptions::new()).unwrap();
        let second: Vec<ContentItem<Post>> =
            load_collection(&fsys, "posts", &LoadOptions::new()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_root() {
        let err = load_collection::<Post, _>(&setup_test_fs(), "pages", &LoadOptions::new())
            .unwrap_err();
        assert!(matches!(err, ContentError::MissingRoot { .. }));
    }

    #[test]
    fn test_frontmatter_error_aborts_load() {
        let fsys = setup_test_fs().with_file("posts/2015/broken.md", "---\ntitle: [oops\n---\nBody");
        let err = load_collection::<Post, _>(&fsys, "posts", &LoadOptions::new()).unwrap_err();
        match err {
            ContentError::FrontMatter { path, .. } => {
                assert_eq!(path, PathBuf::from("posts/2015/broken.md"))
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_required_frontmatter() {
        let fsys = MemoryFs::new().with_file("posts/plain.md", "# No meta");
        let loose: Vec<ContentItem<Post>> =
            load_collection(&fsys, "posts", &LoadOptions::new()).unwrap();
        assert_eq!(loose[0].meta, Post::default());
        assert_eq!(loose[0].content, "# No meta");

        let strict = LoadOptions::new().require_front_matter(true);
        let err = load_collection::<Post, _>(&fsys, "posts", &strict).unwrap_err();
        assert!(matches!(err, ContentError::MissingFrontMatter { .. }));
    }

    #[test]
    fn test_invalid_utf8() {
        let fsys = MemoryFs::new().with_file("posts/bad.md", vec![0xff, 0xfe, 0x00]);
        let err = load_collection::<Post, _>(&fsys, "posts", &LoadOptions::new()).unwrap_err();
        assert!(matches!(err, ContentError::InvalidUtf8 { .. }));
    }

    #[test]
    fn test_derive_slug() {
        assert_eq!(derive_slug("posts", "posts/2014/some-post.md"), "2014/some-post");
        assert_eq!(derive_slug("posts", "posts/2024/test-1-two/index.md"), "2024/test-1-two");
        assert_eq!(derive_slug("posts/", "posts/about.md"), "about");
        assert_eq!(derive_slug("content/posts", "content/posts/a/b.md"), "a/b");
        assert_eq!(derive_slug("", "a/index.md"), "a");
        assert_eq!(derive_slug("posts", "posts/index.md"), "index");
        assert_eq!(derive_slug("./posts", "posts/2014/some-post.md"), "2014/some-post");
        assert_eq!(derive_slug("posts/", "./posts/2014/some-post.md"), "2014/some-post");
    }

    #[test]
    fn test_unnormalized_root() {
        for root in ["./posts", "posts/", "/posts"] {
            let items: Vec<ContentItem<Post>> =
                load_collection(&setup_test_fs(), root, &LoadOptions::new()).unwrap();
            assert_eq!(items.len(), 4, "root {:?}", root);
            assert_eq!(items[0].slug, "2014/some-post", "root {:?}", root);
        }
    }

    #[test]
    fn test_unnormalized_root_on_disk() {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("posts/2014");
        fs::create_dir_all(&posts).unwrap();
        fs::write(posts.join("some-post.md"), "---\ntitle: Some Post\n---\nBody").unwrap();

        let items: Vec<ContentItem<Post>> =
            load_collection(&DiskFs::new(dir.path()), "./posts", &LoadOptions::new()).unwrap();
        assert_eq!(items[0].slug, "2014/some-post");
    }

    /// Walks fine down to one unreadable directory
    struct BrokenSubdirFs {
        inner: MemoryFs,
        broken: &'static str,
        kind: io::ErrorKind,
    }

    impl ContentFs for BrokenSubdirFs {
        fn walk(&self, root: &str) -> std::result::Result<Vec<DirEntry>, WalkError> {
            self.inner.walk(root)?;
            Err(WalkError::new(self.broken, io::Error::new(self.kind, "unreadable")))
        }

        fn read(&self, path: &str) -> io::Result<Vec<u8>> {
            self.inner.read(path)
        }
    }

    #[test]
    fn test_walk_error_carries_failing_path() {
        for kind in [io::ErrorKind::PermissionDenied, io::ErrorKind::NotFound] {
            let fsys = BrokenSubdirFs {
                inner: setup_test_fs(),
                broken: "posts/2020/private",
                kind,
            };
            let err = load_collection::<Post, _>(&fsys, "posts", &LoadOptions::new()).unwrap_err();
            match err {
                ContentError::Walk { path, source } => {
                    assert_eq!(path, PathBuf::from("posts/2020/private"));
                    assert_eq!(source.kind(), kind);
                }
                other => panic!("unexpected error: {}", other),
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_link_in_collection_is_skipped() {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(posts.join("a.md"), "---\ntitle: A\n---\nBody").unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing.png"), posts.join("img.png")).unwrap();

        let items: Vec<ContentItem<Post>> =
            load_collection(&DiskFs::new(dir.path()), "posts", &LoadOptions::new()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].slug, "a");
    }
}
