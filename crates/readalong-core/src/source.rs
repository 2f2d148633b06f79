//! Where the library document comes from, and the one fallible fetch.

use crate::library::{Library, ParseError};
use log::info;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DATA_SOURCE: &str = "data/bible.json";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    /// `http://` and `https://` locations are downloaded, anything else is a
    /// file path.
    pub fn parse(location: &str) -> Self {
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DataSource::Url(location.to_string())
        } else {
            DataSource::File(PathBuf::from(location))
        }
    }
}

impl Default for DataSource {
    fn default() -> Self {
        DataSource::File(PathBuf::from(DEFAULT_DATA_SOURCE))
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => f.write_str(url),
        }
    }
}

#[derive(Debug)]
pub enum LoadError {
    Io { path: PathBuf, source: std::io::Error },
    Http(reqwest::Error),
    Parse(ParseError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io { path, source } => write!(f, "could not read {}: {source}", path.display()),
            LoadError::Http(e) => write!(f, "download failed: {e}"),
            LoadError::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Http(e) => Some(e),
            LoadError::Parse(e) => Some(e),
        }
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(e: reqwest::Error) -> Self {
        LoadError::Http(e)
    }
}

impl From<ParseError> for LoadError {
    fn from(e: ParseError) -> Self {
        LoadError::Parse(e)
    }
}

/// Fetch and parse the library. Called once at startup; there is no retry.
pub async fn fetch_library(source: &DataSource) -> Result<Library, LoadError> {
    info!("Loading library from {}", source);

    let content = match source {
        DataSource::File(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| LoadError::Io {
                path: path.clone(),
                source: e,
            })?,
        DataSource::Url(url) => {
            let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
            client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?
        }
    };

    let library = Library::from_json_str(&content)?;
    info!(
        "Loaded {} verses across {} books",
        library.verse_count(),
        library.len()
    );
    Ok(library)
}
