//! Harvester core: pure URL discovery, rule evaluation and cleaning helpers.
mod clean;
mod discover;
mod hostname;
mod rules;

pub use clean::{clean_url, CleanedUrl, RemovedParam};
pub use discover::{discover_urls, url_candidates};
pub use hostname::{simplified_hostname, simplified_hostname_without_tld};
pub use rules::{
    AnyCleanRule, AnyIgnoreRule, CleanRule, HarvestRules, HostAllowRule, IgnoreRule, NeverClean,
    NeverIgnore, PatternCleanRule, PatternIgnoreRule, DEFAULT_CLEAN_PATTERNS,
    DEFAULT_IGNORE_PATTERNS,
};
pub use url::Url;
