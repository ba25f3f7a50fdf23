use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Local;
use engine_logging::{engine_info, LogDestination};
use harvester_engine::{
    BatchId, Content, DirectorySerializer, EngineEvent, EngineHandle, HarvestBatch, Harvester,
    Resource, ResourceOutcome, TemplateParams,
};

use crate::cli::Cli;
use crate::config::AppConfig;

const BATCH_ID: BatchId = 1;

pub fn run(cli: Cli) -> Result<()> {
    let destination = match &cli.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    engine_logging::initialize(destination, cli.log_level);

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(dir) = &cli.download_dir {
        config.download_dir = Some(dir.clone());
    }
    if cli.no_follow {
        config.follow_html_redirects = false;
    }
    let output_dir = cli.output.clone().or_else(|| config.output_dir.clone());

    let text = read_text(&cli)?;
    let settings = config.harvest_settings();
    fs::create_dir_all(&settings.download_dir).with_context(|| {
        format!("creating download directory {}", settings.download_dir.display())
    })?;
    let rules = config.harvest_rules()?;

    let engine = EngineHandle::spawn(Harvester::new(settings, rules))
        .context("starting harvest engine")?;
    engine.submit(BATCH_ID, text);
    let batch = match engine.recv() {
        Some(EngineEvent::BatchCompleted { batch, .. }) => batch,
        Some(other) => bail!("unexpected engine event {other:?}"),
        None => bail!("harvest engine stopped before finishing the batch"),
    };

    print_summary(&batch);
    let written = match &output_dir {
        Some(dir) => write_documents(&batch, dir, &config.template_params),
        None => Ok(()),
    };

    if cli.keep_downloads {
        engine_info!("Keeping downloaded files");
    } else {
        engine.dispose_content();
        if let Some(EngineEvent::ContentDisposed { files_removed }) = engine.recv() {
            engine_info!("Removed {} downloaded file(s)", files_removed);
        }
    }
    written
}

fn read_text(cli: &Cli) -> Result<String> {
    if let Some(path) = &cli.input {
        return fs::read_to_string(path).with_context(|| format!("reading {}", path.display()));
    }
    if !cli.text.is_empty() {
        return Ok(cli.text.join(" "));
    }
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("reading text from stdin")?;
    Ok(text)
}

fn print_summary(batch: &HarvestBatch) {
    println!(
        "{} url(s) harvested at {}",
        batch.resources().len(),
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    for resource in batch.resources() {
        println!("  {}", describe(resource));
    }
}

fn describe(resource: &Resource) -> String {
    let original = resource.original_text();
    match resource.outcome() {
        ResourceOutcome::NotFetched { reason } => format!("invalid   {original}: {reason}"),
        ResourceOutcome::Rejected { status } => format!("rejected  {original}: HTTP {status}"),
        ResourceOutcome::Ignored { reason } => format!("ignored   {original}: {reason}"),
        ResourceOutcome::Classified => {
            let final_url = resource.final_url().map_or(original, |u| u.as_str());
            let detail = resource.content().map(|c| describe_content(c)).unwrap_or_default();
            match resource.referrer() {
                Some(referrer) => format!(
                    "ok        {} => {final_url}{detail}",
                    referrer.original_text()
                ),
                None => format!("ok        {original} -> {final_url}{detail}"),
            }
        }
    }
}

fn describe_content(content: &Content) -> String {
    if let Some(err) = content.error() {
        return format!(" [error: {err}]");
    }
    if let Some(download) = content.download() {
        return match (download.detected_type(), download.local_path()) {
            (Some(kind), Some(path)) => format!(" [{} at {}]", kind.mime_type, path.display()),
            _ => match download.download_error().or(download.type_error()) {
                Some(err) => format!(" [download: {err}]"),
                None => " [download]".to_string(),
            },
        };
    }
    match content.title() {
        Some(title) => format!(" [\"{title}\"]"),
        None => format!(" [{}]", content.media_type().unwrap_or("unknown type")),
    }
}

fn write_documents(batch: &HarvestBatch, dir: &Path, params: &TemplateParams) -> Result<()> {
    let mut serializer = DirectorySerializer::new(dir)
        .with_context(|| format!("preparing output directory {}", dir.display()))?
        .with_params(params.clone());
    batch
        .serialize(&mut serializer)
        .context("rendering harvested resources")?;
    let written = serializer
        .finish()
        .with_context(|| format!("writing documents to {}", dir.display()))?;
    println!("{} document(s) written to {}", written.len(), dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::fs;

    use clap::Parser;
    use tempfile::TempDir;

    use super::read_text;
    use crate::cli::Cli;

    #[test]
    fn positional_words_are_joined() {
        let cli = Cli::try_parse_from(["harvester", "see", "example.com/a", "now"]).unwrap();
        assert_eq!(read_text(&cli).unwrap(), "see example.com/a now");
    }

    #[test]
    fn input_file_is_read_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "line one\nhttps://example.com\n").unwrap();
        let args = [
            OsString::from("harvester"),
            OsString::from("--input"),
            path.clone().into_os_string(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(read_text(&cli).unwrap(), "line one\nhttps://example.com\n");
    }

    #[test]
    fn missing_input_file_names_the_path() {
        let cli = Cli::try_parse_from(["harvester", "--input", "/nonexistent/notes.txt"]).unwrap();
        let err = read_text(&cli).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/notes.txt"));
    }
}
