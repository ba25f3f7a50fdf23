use std::collections::BTreeMap;

use engine_logging::{engine_debug, engine_warn};
use tracing::field::{self, Empty};
use tracing::{instrument, Span};
use url::Url;

use crate::decode::decode_html;
use crate::download::{Download, Downloader};
use crate::fetch::FetchResponse;
use crate::html::parse_head;
use crate::FetchError;

const HTML_MEDIA_TYPE: &str = "text/html";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("unparseable media type '{content_type}': {message}")]
    MediaType {
        content_type: String,
        message: String,
    },
    #[error("failed reading html body: {0}")]
    Body(FetchError),
}

/// What was found at a resource's final URL.
#[derive(Debug)]
pub struct Content {
    url: Url,
    content_type: Option<String>,
    media_type: Option<String>,
    media_type_params: BTreeMap<String, String>,
    error: Option<ContentError>,
    encoding: Option<String>,
    decode_errors: bool,
    title: Option<String>,
    meta_tags: BTreeMap<String, String>,
    html_redirect: Option<String>,
    download: Option<Download>,
}

impl Content {
    fn new(url: Url, content_type: Option<String>) -> Self {
        Self {
            url,
            content_type,
            media_type: None,
            media_type_params: BTreeMap::new(),
            error: None,
            encoding: None,
            decode_errors: false,
            title: None,
            meta_tags: BTreeMap::new(),
            html_redirect: None,
            download: None,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The raw `Content-Type` header, if the response carried one.
    pub fn content_type_header(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn media_type_params(&self) -> &BTreeMap<String, String> {
        &self.media_type_params
    }

    pub fn is_html(&self) -> bool {
        self.media_type.as_deref() == Some(HTML_MEDIA_TYPE)
    }

    /// Encoding the HTML body was decoded with.
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Some body bytes were malformed in [`Content::encoding`] and were
    /// replaced. The head is still inspected.
    pub fn had_decode_errors(&self) -> bool {
        self.decode_errors
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn meta_tags(&self) -> &BTreeMap<String, String> {
        &self.meta_tags
    }

    pub fn meta_tag(&self, key: &str) -> Option<&str> {
        self.meta_tags.get(key).map(String::as_str)
    }

    /// Looks up `og:<key>`.
    pub fn open_graph_tag(&self, key: &str) -> Option<&str> {
        self.meta_tag(&format!("og:{key}"))
    }

    /// Looks up `twitter:<key>`.
    pub fn twitter_tag(&self, key: &str) -> Option<&str> {
        self.meta_tag(&format!("twitter:{key}"))
    }

    pub fn is_html_redirect(&self) -> bool {
        self.html_redirect.is_some()
    }

    /// URL text captured from a `<meta http-equiv="refresh">` directive.
    pub fn html_redirect_target(&self) -> Option<&str> {
        self.html_redirect.as_deref()
    }

    pub fn download(&self) -> Option<&Download> {
        self.download.as_ref()
    }

    pub fn was_downloaded(&self) -> bool {
        self.download.is_some()
    }

    pub fn error(&self) -> Option<&ContentError> {
        self.error.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none() && self.download.as_ref().is_none_or(Download::is_valid)
    }
}

/// Decides between HTML inspection and download for an open response.
#[derive(Debug, Clone)]
pub struct Classifier {
    downloader: Downloader,
    max_html_bytes: u64,
}

impl Classifier {
    pub fn new(downloader: Downloader, max_html_bytes: u64) -> Self {
        Self {
            downloader,
            max_html_bytes,
        }
    }

    #[instrument(
        name = "classify",
        level = "debug",
        skip_all,
        fields(url = %url, content_type = Empty, media_type = Empty, error = Empty)
    )]
    pub async fn classify(&self, url: &Url, response: FetchResponse) -> Content {
        let span = Span::current();
        let mut content = Content::new(url.clone(), response.content_type.clone());

        if let Some(header) = content.content_type.clone() {
            span.record("content_type", header.as_str());
            match parse_media_type(&header) {
                Ok((media_type, params)) => {
                    span.record("media_type", media_type.as_str());
                    content.media_type = Some(media_type);
                    content.media_type_params = params;
                }
                Err(err) => {
                    span.record("error", field::display(&err));
                    engine_warn!("Cannot classify {}: {}", url, err);
                    content.error = Some(err);
                    return content;
                }
            }

            if content.is_html() {
                self.inspect_html(&mut content, response).await;
                return content;
            }
        }

        // Anything that is not HTML has to be downloaded to be inspected.
        content.download = Some(self.downloader.download(url, response.body).await);
        content
    }

    #[instrument(
        name = "parse_html",
        level = "debug",
        skip_all,
        fields(
            encoding = Empty,
            decode_errors = Empty,
            meta_tags = Empty,
            html_redirect = Empty,
            error = Empty
        )
    )]
    async fn inspect_html(&self, content: &mut Content, response: FetchResponse) {
        let span = Span::current();
        let bytes = match response.read_to_end(self.max_html_bytes).await {
            Ok(bytes) => bytes,
            Err(err) => {
                let err = ContentError::Body(err);
                span.record("error", field::display(&err));
                engine_warn!("Cannot inspect html at {}: {}", content.url, err);
                content.error = Some(err);
                return;
            }
        };

        let charset = content.media_type_params.get("charset").map(String::as_str);
        let decoded = decode_html(&bytes, charset);
        span.record("encoding", decoded.encoding_label.as_str());
        span.record("decode_errors", decoded.had_errors);
        if decoded.had_errors {
            engine_warn!(
                "{} has bytes that are malformed in {}; they were replaced",
                content.url,
                decoded.encoding_label
            );
        }
        content.encoding = Some(decoded.encoding_label);
        content.decode_errors = decoded.had_errors;

        let head = parse_head(&decoded.html);
        span.record("meta_tags", head.meta_tags.len());
        if let Some(target) = head.refresh_target.as_deref() {
            span.record("html_redirect", target);
            engine_debug!("{} requests an html redirect to {}", content.url, target);
        }
        content.title = head.title;
        content.meta_tags = head.meta_tags;
        content.html_redirect = head.refresh_target;
    }
}

/// Splits a `Content-Type` value into its lower-cased essence and
/// parameters; parameter names are lower-cased, values kept.
pub fn parse_media_type(header: &str) -> Result<(String, BTreeMap<String, String>), ContentError> {
    let parsed: mime::Mime = header.parse().map_err(|err: mime::FromStrError| {
        ContentError::MediaType {
            content_type: header.to_string(),
            message: err.to_string(),
        }
    })?;
    let params = parsed
        .params()
        .map(|(name, value)| (name.as_str().to_ascii_lowercase(), value.as_str().to_string()))
        .collect();
    Ok((parsed.essence_str().to_ascii_lowercase(), params))
}
