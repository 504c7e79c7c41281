use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::dataset::LinkTable;

// Matches <InternalLink id="x"/> with double-quoted, single-quoted, or
// unquoted id; tag and attribute names are case-insensitive.
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<InternalLink\s+id\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s/>]+))\s*/?>"#).unwrap()
});

/// Replace every internal-link placeholder in `html`. Known ids become
/// anchors, unknown ids become visible broken-link markers carrying the
/// literal id. Never fails.
pub fn resolve(html: &str, links: &LinkTable) -> String {
    PLACEHOLDER_RE
        .replace_all(html, |caps: &Captures| {
            let id = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or("");
            match links.get(id) {
                Some(target) => format!(
                    r#"<a href="{}" class="internal-link">{}</a>"#,
                    escape_html(&target.url),
                    escape_html(&target.text)
                ),
                None => format!(
                    r#"<span class="broken-link">{}</span>"#,
                    escape_html(id)
                ),
            }
        })
        .into_owned()
}

/// Collect the placeholder ids in `html` that have no table entry.
/// Used by the link audit command.
pub fn unresolved_ids(html: &str, links: &LinkTable) -> Vec<String> {
    PLACEHOLDER_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let id = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())?;
            if links.get(id).is_none() {
                Some(id.to_string())
            } else {
                None
            }
        })
        .collect()
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// ── Tests ──
