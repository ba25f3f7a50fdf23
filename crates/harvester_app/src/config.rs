use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use harvester_core::{
    AnyCleanRule, AnyIgnoreRule, CleanRule, HarvestRules, HostAllowRule, IgnoreRule,
    PatternCleanRule, PatternIgnoreRule, DEFAULT_CLEAN_PATTERNS, DEFAULT_IGNORE_PATTERNS,
};
use harvester_engine::{FetchSettings, HarvestSettings};
use serde::{Deserialize, Serialize};

/// Settings read from a RON file. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub download_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_html_bytes: u64,
    pub user_agent: Option<String>,
    pub default_scheme: Option<String>,
    pub follow_html_redirects: bool,
    /// Start from the built-in ignore and clean patterns.
    pub use_default_rules: bool,
    pub ignore_patterns: Vec<String>,
    pub clean_patterns: Vec<String>,
    /// When non-empty, every other host is ignored.
    pub allowed_hosts: Vec<String>,
    pub template_params: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            download_dir: None,
            output_dir: None,
            connect_timeout_secs: fetch.connect_timeout.as_secs(),
            request_timeout_secs: fetch.request_timeout.as_secs(),
            redirect_limit: fetch.redirect_limit,
            max_html_bytes: fetch.max_html_bytes,
            user_agent: None,
            default_scheme: None,
            follow_html_redirects: true,
            use_default_rules: true,
            ignore_patterns: Vec::new(),
            clean_patterns: Vec::new(),
            allowed_hosts: Vec::new(),
            template_params: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    pub fn harvest_settings(&self) -> HarvestSettings {
        let defaults = FetchSettings::default();
        let fetch = FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            redirect_limit: self.redirect_limit,
            max_html_bytes: self.max_html_bytes,
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            default_scheme: self.default_scheme.clone(),
        };
        HarvestSettings {
            fetch,
            download_dir: self.download_dir.clone().unwrap_or_else(std::env::temp_dir),
            follow_html_redirects: self.follow_html_redirects,
        }
    }

    pub fn harvest_rules(&self) -> Result<HarvestRules> {
        let mut ignore: Vec<Arc<dyn IgnoreRule>> = Vec::new();
        let mut clean: Vec<Arc<dyn CleanRule>> = Vec::new();
        if self.use_default_rules {
            ignore.push(Arc::new(PatternIgnoreRule::new(DEFAULT_IGNORE_PATTERNS)?));
            clean.push(Arc::new(PatternCleanRule::new(DEFAULT_CLEAN_PATTERNS)?));
        }
        if !self.ignore_patterns.is_empty() {
            let rule = PatternIgnoreRule::new(&self.ignore_patterns)
                .context("invalid ignore pattern")?;
            ignore.push(Arc::new(rule));
        }
        if !self.allowed_hosts.is_empty() {
            ignore.push(Arc::new(HostAllowRule::new(self.allowed_hosts.iter().cloned())));
        }
        if !self.clean_patterns.is_empty() {
            let rule =
                PatternCleanRule::new(&self.clean_patterns).context("invalid clean pattern")?;
            clean.push(Arc::new(rule));
        }
        Ok(HarvestRules::new(
            Arc::new(AnyIgnoreRule::new(ignore)),
            Arc::new(AnyCleanRule::new(clean)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use harvester_core::Url;
    use tempfile::TempDir;

    use super::AppConfig;

    #[test]
    fn missing_fields_take_defaults() {
        let config = AppConfig::parse("(follow_html_redirects: true)").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn example_config_parses() {
        let config = AppConfig::parse(include_str!("../config/harvester.example.ron")).unwrap();
        assert_eq!(config.default_scheme.as_deref(), Some("https"));
        assert_eq!(config.allowed_hosts, vec!["example.com".to_string()]);
        assert!(config.follow_html_redirects);
    }

    #[test]
    fn load_reads_from_disk_and_reports_bad_files() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.ron");
        fs::write(&good, "(redirect_limit: 3, ignore_patterns: [\"/private/\"])").unwrap();
        let config = AppConfig::load(&good).unwrap();
        assert_eq!(config.redirect_limit, 3);
        assert_eq!(config.harvest_settings().fetch.redirect_limit, 3);

        let bad = dir.path().join("bad.ron");
        fs::write(&bad, "(redirect_limit: \"many\")").unwrap();
        let err = AppConfig::load(&bad).unwrap_err();
        assert!(format!("{err:#}").contains("bad.ron"));
    }

    #[test]
    fn rules_combine_defaults_patterns_and_allow_list() {
        let config = AppConfig {
            ignore_patterns: vec!["/private/".to_string()],
            clean_patterns: vec!["^ref$".to_string()],
            allowed_hosts: vec!["example.com".to_string()],
            ..AppConfig::default()
        };
        let rules = config.harvest_rules().unwrap();

        let tweet = Url::parse("https://twitter.com/someone/status/1").unwrap();
        assert!(rules.ignore.should_ignore(&tweet).is_some());
        let private = Url::parse("https://example.com/private/x").unwrap();
        assert_eq!(
            rules.ignore.should_ignore(&private).as_deref(),
            Some("Matched Ignore Rule `/private/`")
        );
        let elsewhere = Url::parse("https://other.org/").unwrap();
        assert!(rules.ignore.should_ignore(&elsewhere).is_some());
        let fine = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(rules.ignore.should_ignore(&fine), None);

        assert!(rules.clean.should_remove_param("utm_source").is_some());
        assert!(rules.clean.should_remove_param("ref").is_some());
        assert_eq!(rules.clean.should_remove_param("id"), None);
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let config = AppConfig {
            ignore_patterns: vec!["(".to_string()],
            ..AppConfig::default()
        };
        assert!(config.harvest_rules().is_err());
    }
}
