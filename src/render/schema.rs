use chrono::SecondsFormat;
use serde_json::{json, Value};

use super::faq::FaqItem;
use crate::config::SiteConfig;
use crate::dataset::Article;

/// Marketplace price is unknown at build time; offers carry this fixed
/// placeholder instead of a made-up number.
pub const PRODUCT_PRICE_PLACEHOLDER: &str = "0.00";

/// BlogPosting record for the article page itself.
pub fn blog_posting(article: &Article, site: &SiteConfig) -> Value {
    let mut posting = json!({
        "@context": "https://schema.org",
        "@type": "BlogPosting",
        "headline": article.title,
        "description": article.meta_description,
        "url": format!("{}/blog/{}", site.base_url, article.slug),
        "articleSection": article.category,
        "datePublished": article.published.to_rfc3339_opts(SecondsFormat::Secs, true),
        "dateModified": article.modified.to_rfc3339_opts(SecondsFormat::Secs, true),
        "publisher": {
            "@type": "Organization",
            "name": site.site_name,
        },
    });
    if let Some(author) = &article.author {
        let mut person = json!({ "@type": "Person", "name": author.name });
        if let Some(url) = &author.url {
            person["url"] = json!(url);
        }
        posting["author"] = person;
    }
    posting
}

/// FAQPage record from the extracted question/answer pairs. Callers only
/// invoke this when at least one pair survived extraction.
pub fn faq_page(items: &[FaqItem]) -> Value {
    let entities: Vec<Value> = items
        .iter()
        .map(|item| {
            json!({
                "@type": "Question",
                "name": item.question,
                "acceptedAnswer": {
                    "@type": "Answer",
                    "text": item.answer,
                },
            })
        })
        .collect();
    json!({
        "@context": "https://schema.org",
        "@type": "FAQPage",
        "mainEntity": entities,
    })
}

/// Product record, emitted only for articles that review a purchasable
/// product (signalled by the affiliate link).
pub fn product(article: &Article) -> Option<Value> {
    let offer_url = article.affiliate_url.as_deref()?;
    Some(json!({
        "@context": "https://schema.org",
        "@type": "Product",
        "name": article.title,
        "description": article.description,
        "offers": {
            "@type": "Offer",
            "url": offer_url,
            "price": PRODUCT_PRICE_PLACEHOLDER,
            "priceCurrency": "USD",
        },
    }))
}

/// Serialize structured-data objects as ld+json script elements. `</` is
/// escaped so no string value can close the script element early.
pub fn to_script_tags(objects: &[Value]) -> String {
    objects
        .iter()
        .map(|object| {
            let payload = object.to_string().replace("</", "<\\/");
            format!(r#"<script type="application/ld+json">{payload}</script>"#)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ──
