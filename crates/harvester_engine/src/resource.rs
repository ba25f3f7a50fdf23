use std::sync::Arc;

use chrono::{DateTime, Utc};
use harvester_core::{CleanedUrl, RemovedParam};
use url::Url;

use crate::content::Content;
use crate::FetchError;

/// One URL discovered in source text and everything learned while resolving it.
#[derive(Debug)]
pub struct Resource {
    pub(crate) original_text: String,
    pub(crate) referrer: Option<Arc<Resource>>,
    pub(crate) harvested_at: DateTime<Utc>,
    pub(crate) url_valid: bool,
    pub(crate) destination_valid: bool,
    pub(crate) http_status: Option<u16>,
    pub(crate) redirect_count: usize,
    pub(crate) fetch_error: Option<FetchError>,
    pub(crate) ignore_reason: Option<String>,
    pub(crate) resolved_url: Option<Url>,
    pub(crate) cleaned: Option<CleanedUrl>,
    pub(crate) content: Option<Arc<Content>>,
}

/// The four states a caller can find a resource in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceOutcome<'a> {
    /// The request could not be issued at all.
    NotFetched { reason: &'a str },
    /// The destination answered with something other than 200.
    Rejected { status: u16 },
    /// The destination is fine but a rule excluded it.
    Ignored { reason: &'a str },
    Classified,
}

impl Resource {
    pub(crate) fn new(original_text: &str) -> Self {
        Self {
            original_text: original_text.to_string(),
            referrer: None,
            harvested_at: Utc::now(),
            url_valid: false,
            destination_valid: false,
            http_status: None,
            redirect_count: 0,
            fetch_error: None,
            ignore_reason: None,
            resolved_url: None,
            cleaned: None,
            content: None,
        }
    }

    /// The URL text exactly as it appeared in the source content.
    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    /// The resource whose HTML redirect led here, if any.
    pub fn referrer(&self) -> Option<&Arc<Resource>> {
        self.referrer.as_ref()
    }

    pub fn harvested_at(&self) -> DateTime<Utc> {
        self.harvested_at
    }

    pub fn is_url_valid(&self) -> bool {
        self.url_valid
    }

    pub fn is_destination_valid(&self) -> bool {
        self.destination_valid
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    /// Transport redirects followed before the final response.
    pub fn redirect_count(&self) -> usize {
        self.redirect_count
    }

    pub fn fetch_error(&self) -> Option<&FetchError> {
        self.fetch_error.as_ref()
    }

    pub fn is_ignored(&self) -> bool {
        self.ignore_reason.is_some()
    }

    pub fn ignore_reason(&self) -> Option<&str> {
        self.ignore_reason.as_deref()
    }

    pub fn resolved_url(&self) -> Option<&Url> {
        self.resolved_url.as_ref()
    }

    pub fn is_cleaned(&self) -> bool {
        self.cleaned.is_some()
    }

    pub fn cleaned_url(&self) -> Option<&Url> {
        self.cleaned.as_ref().map(|c| &c.url)
    }

    pub fn removed_params(&self) -> &[RemovedParam] {
        self.cleaned
            .as_ref()
            .map(|c| c.removed.as_slice())
            .unwrap_or_default()
    }

    /// The cleaned URL when cleaning removed anything, else the resolved URL.
    pub fn final_url(&self) -> Option<&Url> {
        self.cleaned_url().or(self.resolved_url.as_ref())
    }

    pub fn content(&self) -> Option<&Arc<Content>> {
        self.content.as_ref()
    }

    /// Target of a `<meta http-equiv="refresh">` found at the destination.
    pub fn html_redirect_target(&self) -> Option<&str> {
        self.content.as_deref().and_then(Content::html_redirect_target)
    }

    pub fn outcome(&self) -> ResourceOutcome<'_> {
        let reason = self.ignore_reason.as_deref().unwrap_or_default();
        match (self.url_valid, self.destination_valid, self.http_status) {
            (false, _, _) => ResourceOutcome::NotFetched { reason },
            (true, false, status) => ResourceOutcome::Rejected {
                status: status.unwrap_or_default(),
            },
            (true, true, _) if self.is_ignored() => ResourceOutcome::Ignored { reason },
            (true, true, _) => ResourceOutcome::Classified,
        }
    }
}
