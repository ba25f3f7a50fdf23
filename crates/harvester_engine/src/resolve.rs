use std::sync::Arc;

use engine_logging::engine_debug;
use harvester_core::{clean_url, HarvestRules};
use tracing::field::{self, Empty};
use tracing::{debug_span, instrument, Instrument, Span};

use crate::content::Classifier;
use crate::fetch::Fetcher;
use crate::resource::Resource;

/// Turns literal URL text into a populated [`Resource`].
///
/// Steps run strictly in order: fetch (following transport redirects),
/// status check, ignore rule on the resolved URL, cleaning, classification.
/// Every failure ends that resource's journey and is recorded on it.
pub struct Resolver {
    fetcher: Arc<dyn Fetcher>,
    rules: HarvestRules,
    classifier: Classifier,
}

impl Resolver {
    pub fn new(fetcher: Arc<dyn Fetcher>, rules: HarvestRules, classifier: Classifier) -> Self {
        Self {
            fetcher,
            rules,
            classifier,
        }
    }

    #[instrument(
        name = "resolve",
        level = "debug",
        skip_all,
        fields(
            original_text = url_text,
            http_status = Empty,
            resolved_url = Empty,
            ignore_reason = Empty,
            error = Empty
        )
    )]
    pub async fn resolve(&self, url_text: &str) -> Resource {
        let span = Span::current();
        let mut resource = Resource::new(url_text);

        let response = match self.fetcher.get(url_text).await {
            Ok(response) => response,
            Err(err) => {
                resource.ignore_reason = Some(format!("Invalid URL '{url_text}'"));
                span.record("error", field::display(&err));
                engine_debug!("{} could not be fetched: {}", url_text, err);
                resource.fetch_error = Some(err);
                return resource;
            }
        };

        resource.url_valid = true;
        resource.http_status = Some(response.status);
        resource.redirect_count = response.redirect_count;
        span.record("http_status", response.status);
        if response.status != 200 {
            let reason = format!("Invalid HTTP Status Code {}", response.status);
            span.record("error", reason.as_str());
            engine_debug!("{} resolved to {}: {}", url_text, response.final_url, reason);
            resource.ignore_reason = Some(reason);
            return resource;
        }

        let resolved = response.final_url.clone();
        span.record("resolved_url", resolved.as_str());
        resource.destination_valid = true;
        if let Some(reason) = self.rules.ignore.should_ignore(&resolved) {
            span.record("ignore_reason", reason.as_str());
            engine_debug!("{} resolved to ignored {}: {}", url_text, resolved, reason);
            resource.resolved_url = Some(resolved);
            resource.ignore_reason = Some(reason);
            return resource;
        }

        let clean_span = debug_span!("clean", cleaned_url = Empty, removed_params = Empty);
        clean_span.in_scope(|| {
            resource.cleaned = clean_url(&resolved, self.rules.clean.as_ref());
            if let Some(cleaned) = &resource.cleaned {
                let removed: Vec<_> = cleaned.removed.iter().map(|p| p.name.as_str()).collect();
                clean_span
                    .record("cleaned_url", cleaned.url.as_str())
                    .record("removed_params", removed.join(",").as_str());
            }
        });
        resource.resolved_url = Some(resolved);

        let final_url = match resource.final_url() {
            Some(url) => url.clone(),
            None => return resource,
        };
        let content = self.classifier.classify(&final_url, response).await;
        resource.content = Some(Arc::new(content));
        engine_debug!("{} resolved to {}", url_text, final_url);
        resource
    }

    /// Resolves the meta-refresh target of `original`, if it declared one.
    ///
    /// Only this single hop is taken; a redirect declared by the new
    /// resource is left for the caller to inspect.
    pub async fn follow_html_redirect(&self, original: &Arc<Resource>) -> Option<Resource> {
        let target = original.html_redirect_target()?;
        let span = debug_span!(
            "follow_html_redirect",
            from = original.original_text(),
            redirect_to = target
        );
        let mut redirected = self.resolve(target).instrument(span).await;
        redirected.referrer = Some(Arc::clone(original));
        Some(redirected)
    }
}
