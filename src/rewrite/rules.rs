//! Which attributes of which tags carry URLs.
//!
//! Sources: <http://www.w3.org/TR/REC-html40/index/attributes.html> and
//! <http://www.w3.org/html/wg/drafts/html/master/index.html#attributes-1>.
//! CSS `url()` references in `<style>` and `style=` are not covered.

use std::collections::HashMap;
use std::sync::LazyLock;

const RULES: &[(&str, &[&str])] = &[
    ("a", &["href"]),
    ("applet", &["codebase"]),
    ("area", &["href"]),
    ("audio", &["src"]),
    ("base", &["href"]),
    ("blockquote", &["cite"]),
    ("body", &["background"]),
    ("button", &["formaction"]),
    ("command", &["icon"]),
    ("del", &["cite"]),
    ("embed", &["src"]),
    ("form", &["action"]),
    ("frame", &["longdesc", "src"]),
    ("head", &["profile"]),
    ("html", &["manifest"]),
    ("iframe", &["longdesc", "src"]),
    ("img", &["longdesc", "src", "usemap"]),
    ("input", &["src", "usemap", "formaction"]),
    ("ins", &["cite"]),
    ("link", &["href"]),
    ("object", &["classid", "codebase", "data", "usemap"]),
    ("q", &["cite"]),
    ("script", &["src"]),
    ("source", &["src"]),
    ("video", &["poster", "src"]),
];

static TAG_ATTRIBUTES: LazyLock<HashMap<&'static str, &'static [&'static str]>> =
    LazyLock::new(|| RULES.iter().copied().collect());

/// URL-carrying attribute names for `tag`, if any.
pub fn url_attributes(tag: &str) -> Option<&'static [&'static str]> {
    TAG_ATTRIBUTES.get(tag).copied()
}
