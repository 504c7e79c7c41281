use std::sync::LazyLock;

use regex::Regex;

static H2_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<h2(?:\s[^>]*)?>").unwrap());
static H2_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</h2\s*>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// One question/answer pair derived from the article body. Recomputed per
/// render, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

/// Derive FAQ items from the original (pre-sanitization) body. Each h2 is a
/// question; its answer is the markup-stripped text up to the next h2.
/// Pairs with an empty question or answer are dropped. Returns None when
/// nothing survives, so callers never emit an empty FAQ block.
pub fn extract(html: &str) -> Option<Vec<FaqItem>> {
    let mut items = Vec::new();
    let mut chunks = H2_OPEN_RE.split(html);
    chunks.next(); // text before the first heading

    for chunk in chunks {
        // No closing tag, so no answer region either
        let Some(close) = H2_CLOSE_RE.find(chunk) else {
            continue;
        };
        let question = strip_tags(&chunk[..close.start()]).trim().to_string();
        let answer = collapse_ws(&strip_tags(&chunk[close.end()..]));
        if question.is_empty() || answer.is_empty() {
            continue;
        }
        items.push(FaqItem { question, answer });
    }

    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn strip_tags(s: &str) -> String {
    TAG_RE.replace_all(s, "").into_owned()
}

fn collapse_ws(s: &str) -> String {
    WS_RE.replace_all(s, " ").trim().to_string()
}

// ── Tests ──
