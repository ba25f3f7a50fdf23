use std::collections::BTreeSet;
use std::sync::Arc;

use regex::Regex;
use url::Url;

/// Resolved URLs matching any of these are ignored by default.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] =
    &[r"^https://twitter.com/(.*?)/status/(.*)$", r"https://t.co"];

/// Query parameters whose names match any of these are removed by default.
pub const DEFAULT_CLEAN_PATTERNS: &[&str] = &[r"^utm_"];

/// Decides whether a resolved URL is excluded from further processing.
///
/// Implementations are handed the URL after transport redirects were
/// followed, never the text found in the source content.
pub trait IgnoreRule: Send + Sync {
    /// Returns the reason when `url` should be ignored.
    fn should_ignore(&self, url: &Url) -> Option<String>;
}

/// Selects query parameters to strip from a resolved URL.
pub trait CleanRule: Send + Sync {
    /// Global gate; cleaning is skipped entirely when this is false.
    fn should_attempt_clean(&self, _url: &Url) -> bool {
        true
    }

    /// Returns the reason when the parameter named `name` should be removed.
    fn should_remove_param(&self, name: &str) -> Option<String>;
}

/// Ignores URLs whose full text matches any of a list of patterns.
#[derive(Debug, Clone)]
pub struct PatternIgnoreRule {
    patterns: Vec<Regex>,
}

impl PatternIgnoreRule {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: compile_all(patterns)?,
        })
    }
}

impl IgnoreRule for PatternIgnoreRule {
    fn should_ignore(&self, url: &Url) -> Option<String> {
        let text = url.as_str();
        self.patterns
            .iter()
            .find(|re| re.is_match(text))
            .map(|re| format!("Matched Ignore Rule `{}`", re.as_str()))
    }
}

/// Ignores every URL whose host is not on the list. Subdomains of a listed
/// host are allowed too.
#[derive(Debug, Clone, Default)]
pub struct HostAllowRule {
    hosts: BTreeSet<String>,
}

impl HostAllowRule {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| h.into().trim().trim_end_matches('.').to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    fn allows(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.hosts.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

impl IgnoreRule for HostAllowRule {
    fn should_ignore(&self, url: &Url) -> Option<String> {
        match url.host_str() {
            Some(host) if self.allows(host) => None,
            Some(host) => Some(format!("Host '{host}' is not on the allow list")),
            None => Some(format!("URL '{url}' has no host")),
        }
    }
}

/// Composite rule: the first member that ignores a URL decides the reason.
#[derive(Clone, Default)]
pub struct AnyIgnoreRule {
    rules: Vec<Arc<dyn IgnoreRule>>,
}

impl AnyIgnoreRule {
    pub fn new(rules: Vec<Arc<dyn IgnoreRule>>) -> Self {
        Self { rules }
    }
}

impl IgnoreRule for AnyIgnoreRule {
    fn should_ignore(&self, url: &Url) -> Option<String> {
        self.rules.iter().find_map(|rule| rule.should_ignore(url))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeverIgnore;

impl IgnoreRule for NeverIgnore {
    fn should_ignore(&self, _url: &Url) -> Option<String> {
        None
    }
}

/// Removes query parameters whose names match any of a list of patterns.
#[derive(Debug, Clone)]
pub struct PatternCleanRule {
    patterns: Vec<Regex>,
}

impl PatternCleanRule {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: compile_all(patterns)?,
        })
    }
}

impl CleanRule for PatternCleanRule {
    fn should_remove_param(&self, name: &str) -> Option<String> {
        self.patterns
            .iter()
            .find(|re| re.is_match(name))
            .map(|re| format!("Matched cleaner rule `{}`", re.as_str()))
    }
}

/// Composite rule: cleaning is attempted when any member wants it, and a
/// parameter is removed when any attempting member matches it.
#[derive(Clone, Default)]
pub struct AnyCleanRule {
    rules: Vec<Arc<dyn CleanRule>>,
}

impl AnyCleanRule {
    pub fn new(rules: Vec<Arc<dyn CleanRule>>) -> Self {
        Self { rules }
    }
}

impl CleanRule for AnyCleanRule {
    fn should_attempt_clean(&self, url: &Url) -> bool {
        self.rules.iter().any(|rule| rule.should_attempt_clean(url))
    }

    fn should_remove_param(&self, name: &str) -> Option<String> {
        self.rules
            .iter()
            .find_map(|rule| rule.should_remove_param(name))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeverClean;

impl CleanRule for NeverClean {
    fn should_attempt_clean(&self, _url: &Url) -> bool {
        false
    }

    fn should_remove_param(&self, _name: &str) -> Option<String> {
        None
    }
}

/// The ignore and clean policies handed to a harvester at construction.
#[derive(Clone)]
pub struct HarvestRules {
    pub ignore: Arc<dyn IgnoreRule>,
    pub clean: Arc<dyn CleanRule>,
}

impl HarvestRules {
    pub fn new(ignore: Arc<dyn IgnoreRule>, clean: Arc<dyn CleanRule>) -> Self {
        Self { ignore, clean }
    }

    /// Ignore tweets and `t.co` links, strip `utm_*` parameters.
    pub fn defaults() -> Self {
        let ignore = PatternIgnoreRule::new(DEFAULT_IGNORE_PATTERNS)
            .expect("default ignore patterns are valid regexes");
        let clean = PatternCleanRule::new(DEFAULT_CLEAN_PATTERNS)
            .expect("default clean patterns are valid regexes");
        Self::new(Arc::new(ignore), Arc::new(clean))
    }
}

impl Default for HarvestRules {
    fn default() -> Self {
        Self::defaults()
    }
}

fn compile_all<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, regex::Error> {
    patterns.iter().map(|p| Regex::new(p.as_ref())).collect()
}
