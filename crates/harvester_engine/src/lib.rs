//! Harvester engine: resolution pipeline, content classification and output.
mod content;
mod decode;
mod download;
mod engine;
mod fetch;
mod harvester;
mod html;
mod keys;
mod persist;
mod resolve;
mod resource;
mod serialize;
mod types;

pub use content::{parse_media_type, Classifier, Content, ContentError};
pub use decode::{decode_html, DecodedHtml};
pub use download::{sniff_file_type, DetectedType, Download, DownloadError, Downloader};
pub use engine::{EngineEvent, EngineHandle};
pub use fetch::{BodyStream, FetchResponse, FetchSettings, Fetcher, ReqwestFetcher};
pub use harvester::{HarvestBatch, HarvestSettings, Harvester};
pub use html::{parse_head, parse_meta_refresh, HeadMetadata};
pub use keys::{slugify, ResourceKeys};
pub use persist::{OutputBatch, PersistError};
pub use resolve::Resolver;
pub use resource::{Resource, ResourceOutcome};
pub use serialize::{
    BatchSerializer, DirectorySerializer, FrontmatterTemplate, ResourceTemplate, SerializeError,
    TemplateContext, TemplateParams,
};
pub use types::{BatchId, FailureKind, FetchError};
