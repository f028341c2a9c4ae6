//! Markdown rendering with image and wikilink resolution
//!
//! The renderer rewrites the pulldown-cmark event stream before it reaches
//! the stock HTML writer. Three node kinds are intercepted:
//!
//! - images (`![alt](dest "title")`), whose `src` is resolved against the
//!   document's parent path,
//! - wikilinks (`[[target]]`), which become anchors when a link resolver is
//!   configured,
//! - wikilink embeds (`![[photo.png]]`), rendered like images when the
//!   target has an image extension.
//!
//! Fenced code blocks are highlighted when a [`Highlighter`] is set, and the
//! stylesheet for the emitted classes is appended to the document.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};
use std::fmt;
use std::sync::Arc;

use super::highlight::Highlighter;
use super::resolve::{basename, extension, is_dangerous_url, resolve};
use crate::config::{HighlightConfig, MarkdownConfig};

/// Post-processes a rendered `<img>` tag, e.g. to fingerprint its `src`
pub type AssetRewriter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Maps a wikilink target to the href of its anchor
pub type LinkResolver = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Embed extensions rendered as `<img>`
pub const IMAGE_EXTENSIONS: [&str; 8] = [
    ".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".bmp", ".mp4",
];

/// Characters percent-encoded inside `src` and `href` attributes
const HREF_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'\\')
    .add(b'^')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Per-document settings for image and wikilink resolution
#[derive(Clone, Default)]
pub struct ImageExtension {
    parent_path: String,
    callback: Option<AssetRewriter>,
    resolve_link: Option<LinkResolver>,
}

impl ImageExtension {
    /// Create an extension resolving relative targets against `parent_path`
    pub fn new(parent_path: impl Into<String>) -> Self {
        Self {
            parent_path: parent_path.into(),
            callback: None,
            resolve_link: None,
        }
    }

    /// Pass every rendered image tag through `callback`
    pub fn with_callback(mut self, callback: Option<AssetRewriter>) -> Self {
        self.callback = callback;
        self
    }

    /// Render non-embed wikilinks as anchors pointing at `resolve_link(target)`
    pub fn with_link_resolver(mut self, resolve_link: Option<LinkResolver>) -> Self {
        self.resolve_link = resolve_link;
        self
    }

    /// Base directory for relative targets
    pub fn parent_path(&self) -> &str {
        &self.parent_path
    }

    fn post_process(&self, tag: String) -> String {
        match &self.callback {
            Some(callback) => callback(&tag),
            None => tag,
        }
    }
}

impl fmt::Debug for ImageExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageExtension")
            .field("parent_path", &self.parent_path)
            .field("callback", &self.callback.is_some())
            .field("resolve_link", &self.resolve_link.is_some())
            .finish()
    }
}

/// Markdown to HTML renderer
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: Options,
    xhtml: bool,
    unsafe_urls: bool,
    highlighter: Option<Highlighter>,
}

impl MarkdownRenderer {
    /// Create a renderer with default settings
    pub fn new() -> Self {
        Self::with_options(&MarkdownConfig::default(), &HighlightConfig::default())
    }

    /// Create with custom settings
    pub fn with_options(markdown: &MarkdownConfig, highlight: &HighlightConfig) -> Self {
        // Front matter is split off before rendering, so YAML metadata
        // blocks stay disabled here.
        let mut options = Options::ENABLE_HEADING_ATTRIBUTES;
        options.set(Options::ENABLE_TABLES, markdown.tables);
        options.set(Options::ENABLE_FOOTNOTES, markdown.footnotes);
        options.set(Options::ENABLE_STRIKETHROUGH, markdown.strikethrough);
        options.set(Options::ENABLE_TASKLISTS, markdown.tasklists);
        options.set(Options::ENABLE_SMART_PUNCTUATION, markdown.smart_punctuation);
        options.set(Options::ENABLE_WIKILINKS, markdown.wikilinks);

        let highlighter = highlight
            .enable
            .then(|| Highlighter::new(&highlight.theme, highlight.guess_language));

        Self {
            options,
            xhtml: markdown.xhtml,
            unsafe_urls: markdown.unsafe_urls,
            highlighter,
        }
    }

    /// Render one document to HTML
    pub fn render(&self, markdown: &str, ext: &ImageExtension) -> Result<String, syntect::Error> {
        let mut parser = Parser::new_ext(markdown, self.options);
        let mut ctx = RenderContext::new(self, ext);

        while let Some(event) = parser.next() {
            ctx.handle(event, &mut parser)?;
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, ctx.events.into_iter());

        if ctx.highlighted {
            if let Some(highlighter) = &self.highlighter {
                html_output.push_str("<style>");
                html_output.push_str(&highlighter.stylesheet()?);
                html_output.push_str("</style>");
            }
        }

        Ok(html_output)
    }

    /// Build an `<img>` tag for a Markdown image
    fn image_tag(&self, dest: &str, alt: &str, title: &str, ext: &ImageExtension) -> String {
        let src = (self.unsafe_urls || !is_dangerous_url(dest))
            .then(|| resolve(dest, ext.parent_path()));
        let title = (!title.is_empty()).then_some(title);
        self.build_img(src.as_deref(), alt, title)
    }

    /// Build an `<img>` tag for an embed, or `None` if the target is not an image
    fn embed_tag(&self, target: &str, ext: &ImageExtension) -> Option<String> {
        let name = basename(target);
        let ext_name = extension(name)?;
        if !IMAGE_EXTENSIONS.contains(&ext_name.as_str()) {
            return None;
        }

        let src = resolve(name, ext.parent_path());
        Some(self.build_img(Some(&src), &escape_html(name), None))
    }

    fn build_img(&self, src: Option<&str>, alt: &str, title: Option<&str>) -> String {
        let mut tag = String::from("<img");
        if let Some(src) = src {
            tag.push_str(r#" src=""#);
            tag.push_str(&escape_href(src));
            tag.push('"');
        }
        tag.push_str(r#" alt=""#);
        tag.push_str(alt);
        tag.push('"');
        if let Some(title) = title {
            tag.push_str(r#" title=""#);
            tag.push_str(&escape_html(title));
            tag.push('"');
        }
        tag.push_str(if self.xhtml { " />" } else { ">" });
        tag
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a link start emitted its own anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenLink {
    /// We wrote `<a href>`, so we owe the `</a>`
    Anchor,
    /// The default writer handles both ends
    Default,
}

/// State for a single document render
struct RenderContext<'r, 'a> {
    renderer: &'r MarkdownRenderer,
    ext: &'r ImageExtension,
    events: Vec<Event<'a>>,
    open_links: Vec<OpenLink>,
    code_block: Option<CodeBlock>,
    highlighted: bool,
}

struct CodeBlock {
    lang: Option<String>,
    code: String,
}

impl<'r, 'a> RenderContext<'r, 'a> {
    fn new(renderer: &'r MarkdownRenderer, ext: &'r ImageExtension) -> Self {
        Self {
            renderer,
            ext,
            events: Vec::new(),
            open_links: Vec::new(),
            code_block: None,
            highlighted: false,
        }
    }

    fn handle(
        &mut self,
        event: Event<'a>,
        parser: &mut impl Iterator<Item = Event<'a>>,
    ) -> Result<(), syntect::Error> {
        if self.code_block.is_some() {
            return self.handle_code(event);
        }

        match event {
            Event::Start(Tag::Image {
                link_type: link_type @ LinkType::WikiLink { .. },
                dest_url,
                title,
                id,
            }) => self.enter_embed(link_type, dest_url, title, id, parser),
            Event::Start(Tag::Image {
                dest_url, title, ..
            }) => {
                let alt = flatten_alt(parser);
                let tag = self.renderer.image_tag(&dest_url, &alt, &title, self.ext);
                self.push_tag(tag);
            }
            // Every other image is consumed up to its end, so this one
            // belongs to an embed handed to the default link writer.
            Event::End(TagEnd::Image) => self.exit_link(),
            Event::Start(Tag::Link {
                link_type: LinkType::WikiLink { .. },
                dest_url,
                ..
            }) if self.ext.resolve_link.is_some() => self.enter_wikilink(&dest_url),
            Event::Start(tag @ Tag::Link { .. }) => {
                self.open_links.push(OpenLink::Default);
                self.events.push(Event::Start(tag));
            }
            Event::End(TagEnd::Link) => self.exit_link(),
            Event::Start(Tag::CodeBlock(kind)) if self.renderer.highlighter.is_some() => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) if !info.is_empty() => Some(info.to_string()),
                    _ => None,
                };
                self.code_block = Some(CodeBlock {
                    lang,
                    code: String::new(),
                });
            }
            other => self.events.push(other),
        }
        Ok(())
    }

    fn handle_code(&mut self, event: Event<'a>) -> Result<(), syntect::Error> {
        match event {
            Event::End(TagEnd::CodeBlock) => {
                if let (Some(block), Some(highlighter)) =
                    (self.code_block.take(), &self.renderer.highlighter)
                {
                    let html = highlighter.highlight(&block.code, block.lang.as_deref())?;
                    self.events.push(Event::Html(CowStr::from(html)));
                    self.highlighted = true;
                }
            }
            Event::Text(text) => {
                if let Some(block) = self.code_block.as_mut() {
                    block.code.push_str(&text);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn enter_embed(
        &mut self,
        link_type: LinkType,
        dest_url: CowStr<'a>,
        title: CowStr<'a>,
        id: CowStr<'a>,
        parser: &mut impl Iterator<Item = Event<'a>>,
    ) {
        match self.renderer.embed_tag(&dest_url, self.ext) {
            Some(tag) => {
                skip_image(parser);
                self.push_tag(tag);
            }
            None => {
                // Not an image: render as a plain wikilink anchor
                self.open_links.push(OpenLink::Default);
                self.events.push(Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }));
            }
        }
    }

    fn enter_wikilink(&mut self, target: &str) {
        let Some(resolve_link) = &self.ext.resolve_link else {
            return;
        };
        let href = escape_href(&resolve_link(target));
        self.events
            .push(Event::InlineHtml(CowStr::from(format!(r#"<a href="{}">"#, href))));
        self.open_links.push(OpenLink::Anchor);
    }

    fn exit_link(&mut self) {
        match self.open_links.pop() {
            Some(OpenLink::Anchor) => self.events.push(Event::InlineHtml(CowStr::Borrowed("</a>"))),
            Some(OpenLink::Default) | None => self.events.push(Event::End(TagEnd::Link)),
        }
    }

    fn push_tag(&mut self, tag: String) {
        let tag = self.ext.post_process(tag);
        self.events.push(Event::InlineHtml(CowStr::from(tag)));
    }
}

/// Flatten the children of an image into escaped alt text
///
/// Consumes events up to and including the image's end. The parser has
/// already decoded entities and code spans arrive verbatim, so every
/// fragment is escaped exactly once. Nested markup contributes only its
/// text.
fn flatten_alt<'a>(parser: &mut impl Iterator<Item = Event<'a>>) -> String {
    let mut alt = String::new();
    let mut depth = 0usize;

    for event in parser.by_ref() {
        match event {
            Event::Start(Tag::Image { .. }) => depth += 1,
            Event::End(TagEnd::Image) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Text(text)
            | Event::Code(text)
            | Event::InlineMath(text)
            | Event::DisplayMath(text)
            | Event::Html(text)
            | Event::InlineHtml(text) => alt.push_str(&escape_html(&text)),
            Event::SoftBreak | Event::HardBreak => alt.push(' '),
            Event::FootnoteReference(name) => {
                alt.push('[');
                alt.push_str(&escape_html(&name));
                alt.push(']');
            }
            _ => {}
        }
    }

    alt
}

/// Discard the children of an image
fn skip_image<'a>(parser: &mut impl Iterator<Item = Event<'a>>) {
    let _ = flatten_alt(parser);
}

/// Simple HTML escaping
pub(crate) fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escape a URL for use in an attribute value
pub(crate) fn escape_href(url: &str) -> String {
    utf8_percent_encode(url, HREF_ESCAPE)
        .to_string()
        .replace('&', "&amp;")
        .replace('\'', "&#39;")
}
