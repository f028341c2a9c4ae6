//! Code block highlighting
//!
//! Fenced code blocks are rendered with CSS classes instead of inline
//! styles; the matching stylesheet is appended once per document.

use lazy_static::lazy_static;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use super::render::escape_html;

/// Theme used when none is configured
pub const DEFAULT_THEME: &str = "base16-ocean.dark";

lazy_static! {
    static ref SYNTAX_SET: SyntaxSet = SyntaxSet::load_defaults_newlines();
    static ref THEME_SET: ThemeSet = ThemeSet::load_defaults();
    static ref FALLBACK_THEME: Theme = THEME_SET
        .themes
        .get(DEFAULT_THEME)
        .cloned()
        .unwrap_or_default();
}

/// Class-based syntax highlighter
#[derive(Debug, Clone)]
pub struct Highlighter {
    theme_name: String,
    theme: &'static Theme,
    guess_language: bool,
}

impl Highlighter {
    /// Create a highlighter for a theme
    ///
    /// Unknown themes fall back to [`DEFAULT_THEME`].
    pub fn new(theme: &str, guess_language: bool) -> Self {
        let (theme_name, theme) = match THEME_SET.themes.get(theme) {
            Some(found) => (theme.to_string(), found),
            None => {
                tracing::warn!(
                    "Unknown highlight theme {:?}, falling back to {}",
                    theme,
                    DEFAULT_THEME
                );
                (DEFAULT_THEME.to_string(), &*FALLBACK_THEME)
            }
        };

        Self {
            theme_name,
            theme,
            guess_language,
        }
    }

    /// Name of the theme in use
    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    /// Highlight one code block into a `<pre><code>` element
    pub fn highlight(&self, code: &str, lang: Option<&str>) -> Result<String, syntect::Error> {
        let lang = lang.and_then(normalize_lang);
        let syntax = self.find_syntax(code, lang);

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, ClassStyle::Spaced);
        for line in LinesWithEndings::from(code) {
            generator.parse_html_for_line_which_includes_newline(line)?;
        }
        let highlighted = generator.finalize();

        let class = match lang {
            Some(lang) => format!(r#" class="language-{}""#, escape_html(lang)),
            None => String::new(),
        };
        Ok(format!(
            r#"<pre class="code"><code{}>{}</code></pre>"#,
            class, highlighted
        ))
    }

    /// Stylesheet for the classes emitted by [`Highlighter::highlight`]
    pub fn stylesheet(&self) -> Result<String, syntect::Error> {
        css_for_theme_with_class_style(self.theme, ClassStyle::Spaced)
    }

    fn find_syntax(&self, code: &str, lang: Option<&str>) -> &'static SyntaxReference {
        let by_lang = lang.and_then(|lang| {
            SYNTAX_SET
                .find_syntax_by_token(lang)
                .or_else(|| SYNTAX_SET.find_syntax_by_extension(lang))
        });

        let guessed = || {
            if !self.guess_language || lang.is_some() {
                return None;
            }
            code.lines()
                .next()
                .and_then(|first| SYNTAX_SET.find_syntax_by_first_line(first))
        };

        by_lang
            .or_else(guessed)
            .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text())
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(DEFAULT_THEME, true)
    }
}

/// First word of a fenced block's info string
fn normalize_lang(info: &str) -> Option<&str> {
    info.split(|c: char| c.is_whitespace() || c == ',' || c == '{')
        .next()
        .filter(|s| !s.is_empty())
}
