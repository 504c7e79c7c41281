use config::Config;
use serde::Deserialize;

/// Site-wide settings. Defaults cover a local checkout; every field can be
/// overridden through `PGI_*` environment variables (PGI_BASE_URL,
/// PGI_SITE_NAME, ...).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub site_name: String,
    /// Origin used for canonical article URLs, no trailing slash.
    pub base_url: String,
    /// Directory holding articles.json and internal_links.json.
    pub data_dir: String,
    /// Default output directory for the build command.
    pub out_dir: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_name: "Pet Gadget Insider".to_string(),
            base_url: "https://petgadgetinsider.com".to_string(),
            data_dir: "data".to_string(),
            out_dir: "dist".to_string(),
        }
    }
}

impl SiteConfig {
    pub fn load() -> Self {
        Config::builder()
            .add_source(config::Environment::with_prefix("PGI"))
            .build()
            .ok()
            .and_then(|c| c.try_deserialize().ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let cfg = SiteConfig::default();
        assert_eq!(cfg.site_name, "Pet Gadget Insider");
        assert!(cfg.base_url.starts_with("https://"));
        assert!(!cfg.base_url.ends_with('/'));
    }
}
