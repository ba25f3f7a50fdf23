use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use engine_logging::engine_warn;
use tempfile::NamedTempFile;
use thiserror::Error;

const STAGING_PREFIX: &str = ".harvester-staged-";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {dir} is unusable: {message}")]
    OutputDir { dir: String, message: String },
    #[error("'{0}' is already part of this output batch")]
    Duplicate(String),
    #[error("could not publish {file}: {source}")]
    Publish {
        file: String,
        #[source]
        source: io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

struct StagedFile {
    file_name: String,
    tmp: NamedTempFile,
}

/// A set of files written into one directory that appear together.
///
/// Each file is staged as a hidden temporary next to its final name and only
/// renamed into place by [`OutputBatch::commit`]. Dropping a batch without
/// committing removes what was staged. A commit that fails part way removes
/// the files it had already published.
pub struct OutputBatch {
    dir: PathBuf,
    staged: Vec<StagedFile>,
}

impl OutputBatch {
    /// Creates `dir` (and its parents) if missing.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let dir = dir.into();
        let unusable = |message: String| PersistError::OutputDir {
            dir: dir.display().to_string(),
            message,
        };
        if dir.exists() && !dir.is_dir() {
            return Err(unusable("not a directory".to_string()));
        }
        fs::create_dir_all(&dir).map_err(|err| unusable(err.to_string()))?;
        Ok(Self {
            dir,
            staged: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Opens the staging file for `file_name`. Everything written to it is
    /// published under that name on commit.
    pub fn stage(&mut self, file_name: &str) -> Result<&mut NamedTempFile, PersistError> {
        if self.staged.iter().any(|file| file.file_name == file_name) {
            return Err(PersistError::Duplicate(file_name.to_string()));
        }
        let tmp = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(&self.dir)?;
        self.staged.push(StagedFile {
            file_name: file_name.to_string(),
            tmp,
        });
        let last = self.staged.len() - 1;
        Ok(&mut self.staged[last].tmp)
    }

    /// Stages `file_name` with the given bytes.
    pub fn stage_bytes(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), PersistError> {
        self.stage(file_name)?.write_all(bytes)?;
        Ok(())
    }

    /// Renames every staged file into place, in staging order. Existing
    /// files with the same name are replaced.
    pub fn commit(self) -> Result<Vec<PathBuf>, PersistError> {
        let Self { dir, staged } = self;
        let mut published = Vec::with_capacity(staged.len());
        for file in staged {
            match publish(&dir, file) {
                Ok(path) => published.push(path),
                Err(err) => {
                    roll_back(&published);
                    return Err(err);
                }
            }
        }
        Ok(published)
    }
}

fn publish(dir: &Path, file: StagedFile) -> Result<PathBuf, PersistError> {
    let StagedFile { file_name, mut tmp } = file;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    let target = dir.join(&file_name);
    tmp.persist(&target).map_err(|err| PersistError::Publish {
        file: file_name,
        source: err.error,
    })?;
    Ok(target)
}

fn roll_back(published: &[PathBuf]) {
    for path in published {
        if let Err(err) = fs::remove_file(path) {
            engine_warn!("Could not roll back {}: {}", path.display(), err);
        }
    }
}
