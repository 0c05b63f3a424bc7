//! Rewriting of individual link values.
//!
//! A link is rewritten when it points at the backend the page came from:
//! no host at all, or the same host as the page. Its path is re-rooted under
//! the proxy prefix so the browser's next request comes back through us.

use url::Url;

use crate::rewrite::ForwardContext;

/// Rewrite one attribute value, or `None` if it must be left untouched.
pub fn rewrite_link(value: &str, ctx: &ForwardContext) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.starts_with('#') {
        return None;
    }

    let reference = if has_scheme(value) {
        let url = Url::parse(value).ok()?;
        Reference::from_absolute(&url, ctx)?
    } else if value.starts_with("//") {
        let url = Url::parse(&format!("{}:{}", ctx.source.scheme(), value)).ok()?;
        Reference::from_absolute(&url, ctx)?
    } else {
        Reference::split(value)
    };

    // Query-only references already resolve against the proxied page.
    if reference.path.is_empty() {
        return None;
    }

    let backend_path = if reference.path.starts_with('/') {
        clean(&reference.path)
    } else {
        clean(&format!("{}/{}", dir(ctx.source.path()), reference.path))
    };

    let mut path = join(&[ctx.path_prefix.as_str(), backend_path.as_str()]);
    if reference.path.ends_with('/') && !path.ends_with('/') {
        path.push('/');
    }

    let mut rewritten = match &ctx.host {
        Some(host) => format!("{}://{}{}", ctx.scheme, host, path),
        None => path,
    };
    if let Some(query) = reference.query {
        rewritten.push('?');
        rewritten.push_str(&query);
    }
    if let Some(fragment) = reference.fragment {
        rewritten.push('#');
        rewritten.push_str(&fragment);
    }
    Some(rewritten)
}

/// The parts of a link that survive rewriting.
struct Reference {
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl Reference {
    /// Accept an absolute URL only if it points back at the source backend.
    fn from_absolute(url: &Url, ctx: &ForwardContext) -> Option<Self> {
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        if authority(url)? != authority(&ctx.source)? {
            return None;
        }
        Some(Self {
            path: url.path().to_string(),
            query: url.query().map(str::to_string),
            fragment: url.fragment().map(str::to_string),
        })
    }

    /// Split a scheme-less, host-less reference into path, query and fragment.
    fn split(value: &str) -> Self {
        let (rest, fragment) = match value.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (value, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (rest, None),
        };
        Self {
            path: path.to_string(),
            query,
            fragment,
        }
    }
}

/// `host[:port]`, with the port omitted when it is the scheme default.
fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// RFC 3986 scheme check: `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"`.
fn has_scheme(value: &str) -> bool {
    let Some(colon) = value.find(':') else {
        return false;
    };
    let scheme = &value[..colon];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Lexical path normalization: collapses repeated slashes, drops `.`
/// segments and resolves `..`. A rooted path never climbs above `/`.
/// An empty result is `.` (or `/` when rooted).
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if rooted {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Everything but the last element of `path`, cleaned.
pub fn dir(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => clean(&path[..=idx]),
        None => ".".to_string(),
    }
}

/// Join non-empty elements with `/` and clean the result. Empty when every
/// element is empty.
pub fn join(elements: &[&str]) -> String {
    let parts: Vec<&str> = elements.iter().copied().filter(|e| !e.is_empty()).collect();
    if parts.is_empty() {
        return String::new();
    }
    clean(&parts.join("/"))
}
