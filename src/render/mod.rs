pub mod decorate;
pub mod faq;
pub mod links;
pub mod sanitize;
pub mod schema;

use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use tracing::warn;

use crate::config::SiteConfig;
use crate::dataset::{Article, ContentProvider, LinkTable};

/// Shown in place of the body when a transform pass fails. The rest of the
/// page, and the rest of a build batch, are unaffected.
const RENDER_FAILURE_HTML: &str =
    r#"<div class="render-error">This section could not be displayed.</div>"#;

/// Output of the pipeline for one article: sanitized display HTML plus the
/// structured-data objects derived from it.
#[derive(Debug, Clone)]
pub struct RenderedArticle {
    pub html: String,
    pub structured_data: Vec<Value>,
}

impl RenderedArticle {
    /// Display HTML followed by the ld+json script payloads.
    pub fn to_fragment(&self) -> String {
        format!(
            "{}\n{}",
            self.html,
            schema::to_script_tags(&self.structured_data)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no article with slug {0:?}")]
    ArticleNotFound(String),
}

/// Display chain in order: placeholder resolution, top-pick annotation,
/// heading decoration, sanitization last. Preformatted bodies are trusted
/// verbatim and skip the whole chain.
fn display_html(article: &Article, links: &LinkTable) -> String {
    if article.preformatted {
        return article.body.clone();
    }
    let resolved = links::resolve(&article.body, links);
    let annotated = decorate::annotate_top_picks(&resolved);
    let decorated = decorate::decorate_headings(&annotated);
    sanitize::sanitize(&decorated)
}

/// Render one article. Pure function of its inputs; a panic anywhere in the
/// display chain degrades that region to a visible placeholder instead of
/// failing the page. FAQ items are derived from the original body, not the
/// display output.
pub fn render_article(article: &Article, links: &LinkTable, site: &SiteConfig) -> RenderedArticle {
    let html =
        panic::catch_unwind(AssertUnwindSafe(|| display_html(article, links))).unwrap_or_else(
            |_| {
                warn!(slug = %article.slug, "body transform panicked, emitting placeholder");
                RENDER_FAILURE_HTML.to_string()
            },
        );

    let mut structured_data = vec![schema::blog_posting(article, site)];
    if let Some(items) = faq::extract(&article.body) {
        structured_data.push(schema::faq_page(&items));
    }
    if let Some(product) = schema::product(article) {
        structured_data.push(product);
    }

    RenderedArticle {
        html,
        structured_data,
    }
}

/// Look an article up and render it. A missing slug is the page-not-found
/// case and the only error this returns.
pub fn render_page(
    provider: &dyn ContentProvider,
    slug: &str,
    site: &SiteConfig,
) -> Result<RenderedArticle, RenderError> {
    let article = provider
        .article(slug)
        .ok_or_else(|| RenderError::ArticleNotFound(slug.to_string()))?;
    Ok(render_article(article, provider.links(), site))
}

// ── Tests ──
