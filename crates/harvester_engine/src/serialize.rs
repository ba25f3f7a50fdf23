use std::collections::{BTreeMap, HashSet};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use engine_logging::{engine_debug, engine_info};
use thiserror::Error;
use url::Url;

use crate::harvester::HarvestBatch;
use crate::keys::ResourceKeys;
use crate::persist::{OutputBatch, PersistError};
use crate::resource::{Resource, ResourceOutcome};

pub type TemplateParams = BTreeMap<String, String>;

const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("template for '{slug}' failed: {message}")]
    Template { slug: String, message: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Everything a template may draw on for one resource.
pub struct TemplateContext<'a> {
    pub text: &'a str,
    pub resource: &'a Resource,
    pub keys: &'a ResourceKeys,
    pub params: &'a TemplateParams,
}

impl TemplateContext<'_> {
    pub fn harvested_at(&self) -> DateTime<Utc> {
        self.resource.harvested_at()
    }

    pub fn is_cleaned(&self) -> bool {
        self.resource.is_cleaned()
    }

    pub fn final_url(&self) -> Option<&Url> {
        self.resource.final_url()
    }

    pub fn resolved_url(&self) -> Option<&Url> {
        self.resource.resolved_url()
    }

    pub fn slug(&self) -> &str {
        self.keys.slug()
    }
}

pub trait ResourceTemplate: Send + Sync {
    fn render(
        &self,
        context: &TemplateContext<'_>,
        out: &mut dyn Write,
    ) -> Result<(), SerializeError>;
}

/// Callbacks steering [`HarvestBatch::serialize`].
///
/// Only classified resources are rendered. The others are reported to the
/// matching hook and skipped.
pub trait BatchSerializer {
    fn keys(&mut self, resource: &Resource) -> ResourceKeys {
        ResourceKeys::new(resource, |_, _| false)
    }

    fn template(
        &mut self,
        keys: &ResourceKeys,
    ) -> Result<Arc<dyn ResourceTemplate>, SerializeError>;

    fn template_params(&mut self, _resource: &Resource, _keys: &ResourceKeys) -> TemplateParams {
        TemplateParams::new()
    }

    fn writer(&mut self, keys: &ResourceKeys) -> Result<&mut dyn Write, SerializeError>;

    fn on_invalid_url(&mut self, _resource: &Resource) {}

    fn on_invalid_destination(&mut self, _resource: &Resource) {}

    fn on_ignored(&mut self, _resource: &Resource) {}
}

impl HarvestBatch {
    /// Renders every classified resource. The first template or writer
    /// error aborts the remaining resources.
    pub fn serialize(
        &self,
        serializer: &mut dyn BatchSerializer,
    ) -> Result<usize, SerializeError> {
        let mut rendered = 0;
        for resource in self.resources() {
            match resource.outcome() {
                ResourceOutcome::NotFetched { .. } => {
                    serializer.on_invalid_url(resource);
                    continue;
                }
                ResourceOutcome::Rejected { .. } => {
                    serializer.on_invalid_destination(resource);
                    continue;
                }
                ResourceOutcome::Ignored { .. } => {
                    serializer.on_ignored(resource);
                    continue;
                }
                ResourceOutcome::Classified => {}
            }

            let keys = serializer.keys(resource);
            let template = serializer.template(&keys)?;
            let params = serializer.template_params(resource, &keys);
            let context = TemplateContext {
                text: self.text(),
                resource,
                keys: &keys,
                params: &params,
            };
            let out = serializer.writer(&keys)?;
            template.render(&context, out)?;
            rendered += 1;
        }
        Ok(rendered)
    }
}

/// Markdown document: a frontmatter block describing the resource followed
/// by the text it was harvested from.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrontmatterTemplate;

impl ResourceTemplate for FrontmatterTemplate {
    fn render(
        &self,
        context: &TemplateContext<'_>,
        out: &mut dyn Write,
    ) -> Result<(), SerializeError> {
        let resource = context.resource;
        writeln!(out, "---")?;
        writeln!(out, "slug: {}", context.slug())?;
        writeln!(out, "original_url: {}", resource.original_text())?;
        write_optional_url(out, "final_url", context.final_url())?;
        write_optional_url(out, "resolved_url", context.resolved_url())?;
        writeln!(out, "cleaned: {}", context.is_cleaned())?;
        writeln!(
            out,
            "harvested_utc: {}",
            context.harvested_at().to_rfc3339_opts(SecondsFormat::Secs, true)
        )?;
        if let Some(title) = resource.content().and_then(|c| c.title()) {
            writeln!(out, "title: {}", single_line(title))?;
        }
        if let Some(referrer) = resource.referrer() {
            writeln!(out, "referred_by: {}", referrer.original_text())?;
        }
        for (key, value) in context.params {
            writeln!(out, "{key}: {}", single_line(value))?;
        }
        writeln!(out, "---")?;
        writeln!(out)?;
        out.write_all(context.text.as_bytes())?;
        if !context.text.ends_with('\n') {
            writeln!(out)?;
        }
        Ok(())
    }
}

fn write_optional_url(out: &mut dyn Write, key: &str, url: Option<&Url>) -> io::Result<()> {
    match url {
        Some(url) => writeln!(out, "{key}: {url}"),
        None => Ok(()),
    }
}

fn single_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

struct WrittenFile {
    file_name: String,
    slug: String,
    unique_id: u32,
    final_url: String,
}

struct SkippedResource {
    original_text: String,
    reason: String,
}

/// Serializes one `<slug>--<id>.md` file per resource into a directory,
/// plus a `manifest.json` listing what was written and what was skipped.
///
/// Documents are staged in the directory as they are rendered and only
/// appear, together with the manifest, on [`DirectorySerializer::finish`].
/// Dropping the serializer instead leaves the directory as it was.
pub struct DirectorySerializer {
    output: OutputBatch,
    template: Arc<dyn ResourceTemplate>,
    params: TemplateParams,
    taken: HashSet<u32>,
    files: Vec<WrittenFile>,
    skipped: Vec<SkippedResource>,
}

impl DirectorySerializer {
    /// Creates the directory if it is missing.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SerializeError> {
        Ok(Self {
            output: OutputBatch::create(dir)?,
            template: Arc::new(FrontmatterTemplate),
            params: TemplateParams::new(),
            taken: HashSet::new(),
            files: Vec::new(),
            skipped: Vec::new(),
        })
    }

    pub fn with_template(mut self, template: Arc<dyn ResourceTemplate>) -> Self {
        self.template = template;
        self
    }

    /// Extra key/value pairs handed to the template for every resource.
    pub fn with_params(mut self, params: TemplateParams) -> Self {
        self.params = params;
        self
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Publishes the staged documents and the manifest; returns the paths
    /// of the documents.
    pub fn finish(mut self) -> Result<Vec<PathBuf>, SerializeError> {
        let files: Vec<_> = self
            .files
            .iter()
            .map(|file| {
                serde_json::json!({
                    "file": file.file_name,
                    "slug": file.slug,
                    "unique_id": format!("{:08x}", file.unique_id),
                    "final_url": file.final_url,
                })
            })
            .collect();
        let skipped: Vec<_> = self
            .skipped
            .iter()
            .map(|s| serde_json::json!({ "original_url": s.original_text, "reason": s.reason }))
            .collect();
        let manifest = serde_json::json!({ "files": files, "skipped": skipped });
        let manifest = serde_json::to_vec_pretty(&manifest).map_err(io::Error::other)?;
        self.output.stage_bytes(MANIFEST_FILE, &manifest)?;

        let dir = self.output.dir().to_path_buf();
        let mut written = self.output.commit()?;
        // The manifest was staged last.
        written.pop();
        for path in &written {
            engine_debug!("Wrote {}", path.display());
        }
        engine_info!(
            "Serialized {} resource(s) into {} ({} skipped)",
            written.len(),
            dir.display(),
            self.skipped.len()
        );
        Ok(written)
    }

    fn skip(&mut self, resource: &Resource, fallback: &str) {
        let reason = resource.ignore_reason().unwrap_or(fallback).to_string();
        engine_debug!("Skipping {}: {}", resource.original_text(), reason);
        self.skipped.push(SkippedResource {
            original_text: resource.original_text().to_string(),
            reason,
        });
    }
}

impl BatchSerializer for DirectorySerializer {
    fn keys(&mut self, resource: &Resource) -> ResourceKeys {
        let keys = ResourceKeys::new(resource, |id, _| self.taken.contains(&id));
        self.taken.insert(keys.unique_id());
        keys
    }

    fn template(
        &mut self,
        _keys: &ResourceKeys,
    ) -> Result<Arc<dyn ResourceTemplate>, SerializeError> {
        Ok(Arc::clone(&self.template))
    }

    fn template_params(&mut self, _resource: &Resource, _keys: &ResourceKeys) -> TemplateParams {
        self.params.clone()
    }

    fn writer(&mut self, keys: &ResourceKeys) -> Result<&mut dyn Write, SerializeError> {
        let file_name = format!("{}--{:08x}.md", keys.slug(), keys.unique_id());
        self.files.push(WrittenFile {
            file_name: file_name.clone(),
            slug: keys.slug().to_string(),
            unique_id: keys.unique_id(),
            final_url: keys.final_url().to_string(),
        });
        Ok(self.output.stage(&file_name)?)
    }

    fn on_invalid_url(&mut self, resource: &Resource) {
        self.skip(resource, "invalid url");
    }

    fn on_invalid_destination(&mut self, resource: &Resource) {
        self.skip(resource, "invalid destination");
    }

    fn on_ignored(&mut self, resource: &Resource) {
        self.skip(resource, "ignored");
    }
}
