//! `$ref` resolution against local files and HTTP URLs.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::DiagramError;
use crate::loader::{normalize_path, parse_str, DocumentFormat};

#[cfg(feature = "remote")]
use std::time::Duration;

/// Connect and read timeout for HTTP references.
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a schema document lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    File(PathBuf),
    Remote(Url),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::File(path) => write!(f, "{}", path.display()),
            Location::Remote(url) => write!(f, "{}", url),
        }
    }
}

impl Location {
    /// Location of a local file, normalized to an absolute path.
    pub fn file(path: &Path) -> Self {
        Location::File(normalize_path(path))
    }

    /// Resolve the document part of a reference (no fragment) against this location.
    ///
    /// An empty reference points back at this document.
    pub fn join(&self, reference: &str) -> Result<Location, DiagramError> {
        if reference.is_empty() {
            return Ok(self.clone());
        }
        if is_url(reference) {
            return Url::parse(reference)
                .map(Location::Remote)
                .map_err(|e| DiagramError::reference(reference, e.to_string()));
        }
        match self {
            Location::Remote(url) => url
                .join(reference)
                .map(Location::Remote)
                .map_err(|e| DiagramError::reference(reference, e.to_string())),
            Location::File(path) => {
                let dir = path.parent().unwrap_or(Path::new("."));
                Ok(Location::file(&dir.join(reference)))
            }
        }
    }

    fn format(&self) -> Option<DocumentFormat> {
        match self {
            Location::File(path) => path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(DocumentFormat::from_extension),
            Location::Remote(url) => url
                .path_segments()
                .and_then(|mut s| s.next_back())
                .and_then(|name| name.rsplit_once('.'))
                .and_then(|(_, ext)| DocumentFormat::from_extension(ext)),
        }
    }
}

/// A fetched reference target.
#[derive(Debug, Clone)]
pub struct ResolvedRef {
    /// The document the reference points into.
    pub location: Location,
    /// JSON Pointer fragment, including the leading `#`.
    pub fragment: Option<String>,
    /// The referenced value (the fragment target, or the whole document).
    pub document: Value,
}

impl ResolvedRef {
    /// Identifier used for cycle detection: location plus fragment.
    pub fn key(&self) -> String {
        match &self.fragment {
            Some(fragment) => format!("{}{}", self.location, fragment),
            None => self.location.to_string(),
        }
    }
}

/// Fetches and parses `$ref` targets.
///
/// Remote documents are memoized by URL for the life of the resolver.
/// Local files are re-read on every request.
#[derive(Default)]
pub struct RefResolver {
    cache: HashMap<String, Value>,
    #[cfg(feature = "remote")]
    client: Option<reqwest::blocking::Client>,
}

impl RefResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `reference` relative to the document at `base`.
    ///
    /// # Errors
    ///
    /// Returns `DiagramError::InvalidReference` if the target file is missing,
    /// the URL is unreachable or answers non-2xx, the content type isn't
    /// JSON or YAML, or the fragment doesn't exist.
    pub fn resolve(&mut self, reference: &str, base: &Location) -> Result<ResolvedRef, DiagramError> {
        let (document_part, fragment) = split_reference(reference);
        let location = base.join(document_part)?;
        let document = self.fetch(&location, reference)?;
        let document = match fragment {
            Some(f) => navigate_fragment(&document, f).ok_or_else(|| {
                DiagramError::reference(reference, format!("fragment not found in {}", location))
            })?,
            None => document,
        };
        Ok(ResolvedRef {
            location,
            fragment: fragment.map(String::from),
            document,
        })
    }

    /// Fetch and parse the whole document at `location`.
    pub fn fetch(&mut self, location: &Location, reference: &str) -> Result<Value, DiagramError> {
        match location {
            Location::File(path) => {
                if !path.is_file() {
                    return Err(DiagramError::reference(
                        reference,
                        format!("file not found: {}", path.display()),
                    ));
                }
                let format = location.format().ok_or_else(|| {
                    DiagramError::reference(reference, "unrecognized content type")
                })?;
                debug!(path = %path.display(), "reading referenced schema");
                let content = std::fs::read_to_string(path).map_err(|source| {
                    DiagramError::ReadError {
                        path: path.clone(),
                        source,
                    }
                })?;
                parse_str(&content, format, location)
            }
            Location::Remote(url) => {
                if let Some(cached) = self.cache.get(url.as_str()) {
                    debug!(%url, "remote schema cache hit");
                    return Ok(cached.clone());
                }
                let document = self.fetch_remote(location, url, reference)?;
                self.cache.insert(url.to_string(), document.clone());
                Ok(document)
            }
        }
    }

    #[cfg(feature = "remote")]
    fn fetch_remote(
        &mut self,
        location: &Location,
        url: &Url,
        reference: &str,
    ) -> Result<Value, DiagramError> {
        let network = |source: reqwest::Error| DiagramError::NetworkError {
            url: url.to_string(),
            source,
        };

        let client = match &self.client {
            Some(client) => client.clone(),
            None => {
                let client = reqwest::blocking::Client::builder()
                    .connect_timeout(HTTP_TIMEOUT)
                    .timeout(HTTP_TIMEOUT)
                    .build()
                    .map_err(network)?;
                self.client = Some(client.clone());
                client
            }
        };

        debug!(%url, "fetching remote schema");
        let response = client
            .get(url.clone())
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(network)?;

        let format = location
            .format()
            .or_else(|| {
                response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(DocumentFormat::from_content_type)
            })
            .ok_or_else(|| DiagramError::reference(reference, "unrecognized content type"))?;

        let body = response.text().map_err(network)?;
        parse_str(&body, format, location)
    }

    #[cfg(not(feature = "remote"))]
    fn fetch_remote(
        &mut self,
        _location: &Location,
        _url: &Url,
        reference: &str,
    ) -> Result<Value, DiagramError> {
        Err(DiagramError::reference(
            reference,
            "remote references require the `remote` feature",
        ))
    }
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Split a reference into its document part and `#` fragment.
pub fn split_reference(reference: &str) -> (&str, Option<&str>) {
    match reference.find('#') {
        Some(idx) => (&reference[..idx], Some(&reference[idx..])),
        None => (reference, None),
    }
}

/// Navigate a JSON Pointer fragment (e.g., "#/definitions/foo").
///
/// Returns `None` if any segment along the path is missing.
pub fn navigate_fragment(document: &Value, fragment: &str) -> Option<Value> {
    let path = fragment.trim_start_matches('#').trim_start_matches('/');
    if path.is_empty() {
        return Some(document.clone());
    }

    let mut current = document;
    for part in path.split('/') {
        // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
        let key = part.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Array(arr) => arr.get(key.parse::<usize>().ok()?)?,
            other => other.get(&key)?,
        };
    }
    Some(current.clone())
}
