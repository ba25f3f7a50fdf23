use std::path::PathBuf;
use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};
use harvester_core::{discover_urls, HarvestRules};
use tracing::field::Empty;
use tracing::{debug_span, instrument};

use crate::content::{Classifier, Content};
use crate::download::Downloader;
use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::resolve::Resolver;
use crate::resource::{Resource, ResourceOutcome};

#[derive(Debug, Clone)]
pub struct HarvestSettings {
    pub fetch: FetchSettings,
    pub download_dir: PathBuf,
    /// Emit the target of an HTML redirect in place of the page declaring it.
    /// The target is resolved either way.
    pub follow_html_redirects: bool,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            fetch: FetchSettings::default(),
            download_dir: std::env::temp_dir(),
            follow_html_redirects: true,
        }
    }
}

/// The source text and one resource per distinct URL found in it.
#[derive(Debug, Clone)]
pub struct HarvestBatch {
    text: String,
    resources: Vec<Arc<Resource>>,
}

impl HarvestBatch {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn resources(&self) -> &[Arc<Resource>] {
        &self.resources
    }
}

/// Drives discovery, resolution and HTML-redirect following over text.
///
/// Every content record classified along the way is kept until
/// [`Harvester::dispose_content`] is called, including those of resources
/// that were replaced by their redirect target.
pub struct Harvester {
    resolver: Resolver,
    follow_html_redirects: bool,
    content: Vec<Arc<Content>>,
}

impl Harvester {
    pub fn new(settings: HarvestSettings, rules: HarvestRules) -> Self {
        let fetcher = Arc::new(ReqwestFetcher::new(settings.fetch.clone()));
        Self::with_fetcher(settings, rules, fetcher)
    }

    pub fn with_fetcher(
        settings: HarvestSettings,
        rules: HarvestRules,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let classifier = Classifier::new(
            Downloader::new(settings.download_dir),
            settings.fetch.max_html_bytes,
        );
        Self {
            resolver: Resolver::new(fetcher, rules, classifier),
            follow_html_redirects: settings.follow_html_redirects,
            content: Vec::new(),
        }
    }

    #[instrument(name = "harvest", level = "debug", skip_all, fields(text_bytes = text.len()))]
    pub async fn harvest(&mut self, text: &str) -> HarvestBatch {
        let urls = {
            let span = debug_span!("discover", count = Empty);
            let urls = span.in_scope(|| discover_urls(text));
            span.record("count", urls.len());
            urls
        };
        engine_info!("Harvesting {} url(s) from {} bytes of text", urls.len(), text.len());

        let mut resources = Vec::with_capacity(urls.len());
        for url_text in &urls {
            let resource = Arc::new(self.resolver.resolve(url_text).await);
            self.remember_content(&resource);

            let mut emitted = resource;
            if let Some(redirected) = self.resolver.follow_html_redirect(&emitted).await {
                let redirected = Arc::new(redirected);
                self.remember_content(&redirected);
                if self.follow_html_redirects {
                    emitted = redirected;
                }
            }

            log_outcome(&emitted);
            resources.push(emitted);
        }

        engine_info!("Harvest finished with {} resource(s)", resources.len());
        HarvestBatch {
            text: text.to_string(),
            resources,
        }
    }

    /// Content records accumulated across every batch so far.
    pub fn content(&self) -> &[Arc<Content>] {
        &self.content
    }

    /// Deletes every downloaded file and forgets the accumulated content.
    /// Returns how many files were removed.
    pub fn dispose_content(&mut self) -> usize {
        let mut removed = 0;
        for content in self.content.drain(..) {
            let Some(download) = content.download() else {
                continue;
            };
            match download.delete() {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(err) => engine_warn!(
                    "Failed to delete download {:?}: {}",
                    download.local_path(),
                    err
                ),
            }
        }
        engine_debug!("Disposed of {} downloaded file(s)", removed);
        removed
    }

    fn remember_content(&mut self, resource: &Resource) {
        if let Some(content) = resource.content() {
            self.content.push(Arc::clone(content));
        }
    }
}

fn log_outcome(resource: &Resource) {
    let text = resource.original_text();
    match resource.outcome() {
        ResourceOutcome::NotFetched { reason } => engine_debug!("{text}: not fetched ({reason})"),
        ResourceOutcome::Rejected { status } => engine_debug!("{text}: rejected with {status}"),
        ResourceOutcome::Ignored { reason } => engine_debug!("{text}: ignored ({reason})"),
        ResourceOutcome::Classified => {
            let final_url = resource.final_url().map(|u| u.as_str()).unwrap_or_default();
            engine_debug!("{text}: {final_url}");
        }
    }
}
