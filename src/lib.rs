pub mod config;
pub mod dataset;
pub mod render;

pub use config::SiteConfig;
pub use dataset::{Article, ContentProvider, Dataset, InternalLink, LinkTable};
pub use render::{render_article, render_page, RenderError, RenderedArticle};
