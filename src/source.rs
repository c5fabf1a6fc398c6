//! Locale sources
//!
//! A source is anything that can asynchronously yield the bytes of one locale
//! table. Files on disk are the common case; [`MemorySource`] serves embedded
//! or generated tables and keeps tests away from the file system.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::decoder::SourceFormat;
use crate::error::LoadError;

/// Async access to the raw contents of one locale source.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Human-readable name used in errors and logs (usually the path)
    fn name(&self) -> String;

    /// File extension used for decoder selection, without the dot
    fn extension(&self) -> Option<String>;

    /// Locale implied by the source name (the file stem), if any
    fn implied_locale(&self) -> Option<String>;

    /// Read the full contents.
    async fn read(&self) -> std::io::Result<Vec<u8>>;
}

/// A locale file on disk. `en.json` implies locale `en`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SourceReader for FileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string)
    }

    fn implied_locale(&self) -> Option<String> {
        self.path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// An in-memory source named like a file, e.g. `"fr.json"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySource {
    name: String,
    contents: Vec<u8>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        MemorySource {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

#[async_trait]
impl SourceReader for MemorySource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string)
    }

    fn implied_locale(&self) -> Option<String> {
        Path::new(&self.name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.contents.clone())
    }
}

/// One source queued for loading, with optional per-source overrides.
pub struct LocaleSource {
    pub(crate) reader: Box<dyn SourceReader>,
    pub(crate) locale: Option<String>,
    pub(crate) format: SourceFormat,
}

impl LocaleSource {
    pub fn new(reader: impl SourceReader + 'static) -> Self {
        LocaleSource {
            reader: Box::new(reader),
            locale: None,
            format: SourceFormat::Auto,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        LocaleSource::new(FileSource::new(path))
    }

    pub fn memory(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        LocaleSource::new(MemorySource::new(name, contents))
    }

    /// Force the locale identifier instead of taking it from metadata or the file name.
    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = Some(locale.to_string());
        self
    }

    /// Force a decoder for this source.
    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = format;
        self
    }

    pub fn name(&self) -> String {
        self.reader.name()
    }
}

impl std::fmt::Debug for LocaleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocaleSource")
            .field("name", &self.reader.name())
            .field("locale", &self.locale)
            .field("format", &self.format)
            .finish()
    }
}

/// Expand files and directories into file sources.
///
/// Directories are scanned one level deep and only files with a known locale
/// extension are taken. Explicitly named files are always taken, so an
/// unsupported extension surfaces later as a load error instead of vanishing.
/// Sources come back sorted by path; paths that do not exist are returned as errors.
pub fn discover_sources(paths: &[PathBuf]) -> (Vec<FileSource>, Vec<LoadError>) {
    let mut files = Vec::new();
    let mut errors = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            let entries = match std::fs::read_dir(path) {
                Ok(entries) => entries,
                Err(error) => {
                    errors.push(LoadError::Io {
                        source_name: path.display().to_string(),
                        error,
                    });
                    continue;
                }
            };
            for entry in entries {
                let entry_path = match entry {
                    Ok(entry) => entry.path(),
                    Err(error) => {
                        errors.push(LoadError::Io {
                            source_name: path.display().to_string(),
                            error,
                        });
                        continue;
                    }
                };
                let known_extension = entry_path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(SourceFormat::from_extension)
                    .is_some();
                if entry_path.is_file() && known_extension {
                    files.push(entry_path);
                }
            }
        } else {
            errors.push(LoadError::NotFound { path: path.clone() });
        }
    }

    // The same file may be named explicitly and found again through its directory
    files.sort();
    let mut seen = HashSet::new();
    files.retain(|path| {
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.clone());
        seen.insert(canonical)
    });
    if files.is_empty() {
        tracing::warn!("no locale files found in {} path(s)", paths.len());
    }
    (files.into_iter().map(FileSource::new).collect(), errors)
}
