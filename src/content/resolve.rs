//! Image and link target resolution
//!
//! Targets inside a content file are written relative to that file. Before
//! they reach the rendered HTML they are rewritten against the document's
//! parent path, unless they already point somewhere stable:
//!
//! ```ignore
//! resolve("https://example.com/a.jpg", "/content/posts") // unchanged
//! resolve("/images/a.png", "/content/posts")             // unchanged
//! resolve("./images/a.jpg", "/content/posts/2020")       // "/content/posts/2020/images/a.jpg"
//! ```

/// How a target relates to the document that references it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// `http://` or `https://` URL
    Hotlink,
    /// Inline `data:` URL
    DataUrl,
    /// Path rooted at `/`
    Absolute,
    /// Anything else, resolved against the parent path
    Relative,
}

/// Classify a target, first match wins
pub fn classify(target: &str) -> TargetKind {
    if target.starts_with("http://") || target.starts_with("https://") {
        TargetKind::Hotlink
    } else if target.starts_with("data:") {
        TargetKind::DataUrl
    } else if target.starts_with('/') {
        TargetKind::Absolute
    } else {
        TargetKind::Relative
    }
}

/// Resolve `target` against `parent_path`
pub fn resolve(target: &str, parent_path: &str) -> String {
    match classify(target) {
        TargetKind::Hotlink | TargetKind::DataUrl | TargetKind::Absolute => target.to_string(),
        TargetKind::Relative => join(parent_path, target),
    }
}

/// Join two slash-separated paths and normalize the result
pub fn join(base: &str, path: &str) -> String {
    match (base.is_empty(), path.is_empty()) {
        (true, true) => String::new(),
        (true, false) => clean(path),
        (false, true) => clean(base),
        (false, false) => clean(&format!("{}/{}", base, path)),
    }
}

/// Lexically normalize a slash-separated path
///
/// Collapses repeated separators, drops `.` segments and resolves `..`
/// against the preceding segment. `..` never climbs above a rooted path.
pub fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Directory component of a slash-separated path
pub fn dirname(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(pos) => clean(&path[..pos]),
        None => ".".to_string(),
    }
}

/// Last component of a slash-separated path
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.is_empty() { "." } else { "/" };
    }
    match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

/// Lowercased extension of the last path component, including the dot
pub fn extension(path: &str) -> Option<String> {
    let name = basename(path);
    name.rfind('.')
        .filter(|&pos| pos > 0 || name.len() > 1)
        .map(|pos| name[pos..].to_ascii_lowercase())
}

/// Whether a destination uses a scheme that must not reach the page
///
/// Inline images in the common raster formats are allowed as `data:` URLs.
pub fn is_dangerous_url(url: &str) -> bool {
    const SAFE_DATA_IMAGES: [&str; 4] = ["png", "gif", "jpeg", "webp"];

    if has_prefix_ignore_case(url, "data:image/") {
        let rest = &url["data:image/".len()..];
        return !SAFE_DATA_IMAGES
            .iter()
            .any(|kind| has_prefix_ignore_case(rest, kind));
    }

    ["javascript:", "vbscript:", "file:", "data:"]
        .iter()
        .any(|scheme| has_prefix_ignore_case(url, scheme))
}

fn has_prefix_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}
