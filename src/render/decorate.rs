use std::sync::LazyLock;

use regex::{Captures, Regex};

static H2_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<h2(\s[^>]*)?>").unwrap());
// `(^|\s)` keeps lookalikes such as ng-class or data-class from matching.
static CLASS_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)(^|\s)class\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

/// Promotional phrase scanned for literally, anywhere in the markup.
pub const TOP_PICK_PHRASE: &str = "Pet Gadget Insider's Top Pick";

/// Class token added to every h2 so site CSS can style article headings.
pub const HEADING_CLASS: &str = "article-heading";

/// Append `*` after every literal occurrence of the top-pick phrase.
/// Plain text substitution: occurrences inside attribute values or link
/// text are matched as well.
pub fn annotate_top_picks(html: &str) -> String {
    html.replace(TOP_PICK_PHRASE, &format!("{TOP_PICK_PHRASE}*"))
}

/// Add the heading class token to every h2 opening tag. A tag with an
/// existing class attribute keeps it and gains the token; all other
/// attributes pass through untouched.
pub fn decorate_headings(html: &str) -> String {
    H2_OPEN_RE
        .replace_all(html, |caps: &Captures| {
            let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            if CLASS_ATTR_RE.is_match(attrs) {
                let rewritten = CLASS_ATTR_RE.replace(attrs, |c: &Captures| {
                    let lead = c.get(1).map(|m| m.as_str()).unwrap_or("");
                    let val = c
                        .get(2)
                        .or_else(|| c.get(3))
                        .or_else(|| c.get(4))
                        .map(|m| m.as_str())
                        .unwrap_or("");
                    if val.split_whitespace().any(|t| t == HEADING_CLASS) {
                        format!(r#"{lead}class="{val}""#)
                    } else if val.is_empty() {
                        format!(r#"{lead}class="{HEADING_CLASS}""#)
                    } else {
                        format!(r#"{lead}class="{val} {HEADING_CLASS}""#)
                    }
                });
                format!("<h2{rewritten}>")
            } else {
                format!(r#"<h2{attrs} class="{HEADING_CLASS}">"#)
            }
        })
        .into_owned()
}

// ── Tests ──
