use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One blog article as authored in the static dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct Article {
    pub slug: String,
    pub title: String,
    /// Short blurb shown on listing cards.
    pub description: String,
    /// Longer description emitted into meta tags and structured data.
    pub meta_description: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    /// Raw authored HTML, possibly containing placeholder markers.
    pub body: String,
    /// Body is already sanitized; render it verbatim, skip the display passes.
    #[serde(default)]
    pub preformatted: bool,
    #[serde(default)]
    pub affiliate_url: Option<String>,
    pub published: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<ArticleAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArticleAuthor {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Dataset entry for one internal-link id.
#[derive(Debug, Clone, Deserialize)]
pub struct InternalLink {
    pub id: String,
    pub url: String,
    pub text: String,
}

/// Resolved target for a placeholder id.
#[derive(Debug, Clone)]
pub struct LinkTarget {
    pub url: String,
    pub text: String,
}

/// Link lookup table keyed by lowercased id. Ids are matched
/// case-insensitively, so `About-Us` and `about-us` hit the same entry.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    entries: HashMap<String, LinkTarget>,
}

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_links(links: Vec<InternalLink>) -> Result<Self, DatasetError> {
        let mut table = Self::new();
        for link in links {
            let key = link.id.to_lowercase();
            if table.entries.contains_key(&key) {
                return Err(DatasetError::DuplicateLinkId(link.id));
            }
            table.entries.insert(
                key,
                LinkTarget {
                    url: link.url,
                    text: link.text,
                },
            );
        }
        Ok(table)
    }

    pub fn insert(&mut self, id: &str, url: &str, text: &str) {
        self.entries.insert(
            id.to_lowercase(),
            LinkTarget {
                url: url.to_string(),
                text: text.to_string(),
            },
        );
    }

    pub fn get(&self, id: &str) -> Option<&LinkTarget> {
        self.entries.get(&id.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("duplicate article slug: {0}")]
    DuplicateSlug(String),
    #[error("duplicate internal link id (case-insensitive): {0}")]
    DuplicateLinkId(String),
}

/// Read-only access to the loaded dataset. The render pipeline takes this
/// instead of reaching into globals, so tests can hand it fixture data.
pub trait ContentProvider {
    fn article(&self, slug: &str) -> Option<&Article>;
    fn articles(&self) -> &[Article];
    fn links(&self) -> &LinkTable;
}

/// In-memory dataset loaded once at startup and never mutated.
#[derive(Debug)]
pub struct Dataset {
    articles: Vec<Article>,
    by_slug: HashMap<String, usize>,
    links: LinkTable,
}

impl Dataset {
    pub fn new(articles: Vec<Article>, links: Vec<InternalLink>) -> Result<Self, DatasetError> {
        let mut by_slug = HashMap::with_capacity(articles.len());
        for (i, article) in articles.iter().enumerate() {
            if by_slug.insert(article.slug.clone(), i).is_some() {
                return Err(DatasetError::DuplicateSlug(article.slug.clone()));
            }
        }
        Ok(Self {
            articles,
            by_slug,
            links: LinkTable::from_links(links)?,
        })
    }

    /// Load `articles.json` and `internal_links.json` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, DatasetError> {
        let articles: Vec<Article> = read_json(&dir.join("articles.json"))?;
        let links: Vec<InternalLink> = read_json(&dir.join("internal_links.json"))?;
        Self::new(articles, links)
    }

    pub fn stats(&self) -> DatasetStats {
        DatasetStats {
            articles: self.articles.len(),
            preformatted: self.articles.iter().filter(|a| a.preformatted).count(),
            with_affiliate: self
                .articles
                .iter()
                .filter(|a| a.affiliate_url.is_some())
                .count(),
            links: self.links.len(),
        }
    }
}

impl ContentProvider for Dataset {
    fn article(&self, slug: &str) -> Option<&Article> {
        self.by_slug.get(slug).map(|&i| &self.articles[i])
    }

    fn articles(&self) -> &[Article] {
        &self.articles
    }

    fn links(&self) -> &LinkTable {
        &self.links
    }
}

pub struct DatasetStats {
    pub articles: usize,
    pub preformatted: usize,
    pub with_affiliate: usize,
    pub links: usize,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DatasetError> {
    let raw = fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn article(slug: &str) -> Article {
        Article {
            slug: slug.to_string(),
            title: "Title".to_string(),
            description: "Card blurb".to_string(),
            meta_description: "Meta".to_string(),
            category: "dog-tech".to_string(),
            subcategory: None,
            body: "<p>body</p>".to_string(),
            preformatted: false,
            affiliate_url: None,
            published: "2024-05-01T09:00:00Z".parse().unwrap(),
            modified: "2024-05-02T09:00:00Z".parse().unwrap(),
            author: None,
        }
    }

    #[test]
    fn lookup_by_slug() {
        let ds = Dataset::new(vec![article("a"), article("b")], vec![]).unwrap();
        assert!(ds.article("b").is_some());
        assert!(ds.article("missing").is_none());
    }

    #[test]
    fn duplicate_slug_rejected() {
        let err = Dataset::new(vec![article("a"), article("a")], vec![]).unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateSlug(s) if s == "a"));
    }

    #[test]
    fn link_lookup_is_case_insensitive() {
        let links = vec![InternalLink {
            id: "About-Us".to_string(),
            url: "/about".to_string(),
            text: "About Us".to_string(),
        }];
        let table = LinkTable::from_links(links).unwrap();
        assert_eq!(table.get("about-us").map(|t| t.url.as_str()), Some("/about"));
        assert_eq!(table.get("ABOUT-US").map(|t| t.text.as_str()), Some("About Us"));
        assert!(table.get("about").is_none());
    }

    #[test]
    fn duplicate_link_id_rejected_after_case_fold() {
        let links = vec![
            InternalLink {
                id: "about".to_string(),
                url: "/about".to_string(),
                text: "About".to_string(),
            },
            InternalLink {
                id: "ABOUT".to_string(),
                url: "/about-2".to_string(),
                text: "About".to_string(),
            },
        ];
        let err = LinkTable::from_links(links).unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateLinkId(_)));
    }

    #[test]
    fn load_fixture_dataset() {
        let ds = Dataset::load(Path::new("tests/fixtures/dataset")).unwrap();
        let stats = ds.stats();
        assert_eq!(stats.articles, 3);
        assert_eq!(stats.preformatted, 1);
        assert_eq!(stats.with_affiliate, 1);
        assert!(stats.links >= 2);
        let a = ds.article("smart-feeder-review").unwrap();
        assert!(a.affiliate_url.is_some());
        assert!(!a.preformatted);
    }
}
