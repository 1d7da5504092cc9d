//! Schema loading from files and directories.
//!
//! Expands input paths, parses JSON and YAML documents, and resolves each
//! schema's `extends` chain before handing it to the diagram builder.

use std::fmt::Display;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::DiagramError;
use crate::inheritance::InheritanceResolver;
use crate::refs::{Location, RefResolver};
use crate::schema::{Schema, SchemaFileInfo};

/// Extensions recognized as schema documents.
pub const SCHEMA_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Serialization format of a schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(DocumentFormat::Json),
            "yaml" | "yml" => Some(DocumentFormat::Yaml),
            _ => None,
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains("json") {
            Some(DocumentFormat::Json)
        } else if content_type.contains("yaml") || content_type.contains("yml") {
            Some(DocumentFormat::Yaml)
        } else {
            None
        }
    }
}

/// Parse document text. The root must be a JSON object / YAML mapping.
///
/// # Errors
///
/// Returns `DiagramError::FileFormat` for malformed input or a non-mapping root.
pub fn parse_str(
    content: &str,
    format: DocumentFormat,
    location: impl Display,
) -> Result<Value, DiagramError> {
    let value: Value = match format {
        DocumentFormat::Json => {
            serde_json::from_str(content).map_err(|e| DiagramError::format(&location, e))?
        }
        DocumentFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|e| DiagramError::format(&location, e))?
        }
    };

    if !value.is_object() {
        return Err(DiagramError::format(
            location,
            "document root is not a mapping",
        ));
    }
    Ok(value)
}

/// Load a raw document from a file path, choosing the parser by extension.
///
/// # Errors
///
/// Returns `DiagramError::FileNotFound` if the file doesn't exist,
/// or `DiagramError::FileFormat` if it isn't a valid JSON/YAML mapping.
pub fn parse_document(path: &Path) -> Result<Value, DiagramError> {
    if !path.exists() {
        return Err(DiagramError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(DocumentFormat::from_extension)
        .ok_or_else(|| DiagramError::format(path.display(), "unsupported file extension"))?;

    let content = std::fs::read_to_string(path).map_err(|source| DiagramError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    parse_str(&content, format, path.display())
}

/// Load a file into its raw document and typed schema (no `extends` resolution).
pub fn load_schema_file(path: &Path) -> Result<(Value, Schema), DiagramError> {
    let raw = parse_document(path)?;
    let schema = Schema::from_value(&raw).map_err(|e| DiagramError::format(path.display(), e))?;
    Ok((raw, schema))
}

/// Expand files and directories into the schema files they contain.
///
/// Directories are walked recursively and their files sorted; explicit
/// paths keep their given order. Files without a schema extension are
/// skipped, and a file named twice is returned once.
///
/// # Errors
///
/// Returns `DiagramError::FileNotFound` for a path that doesn't exist.
pub fn collect_schema_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, DiagramError> {
    let mut files = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(DiagramError::FileNotFound { path: path.clone() });
        }
        if path.is_dir() {
            let mut found = Vec::new();
            collect_files_recursive(path, &mut found)?;
            found.sort();
            files.extend(found);
        } else if has_schema_extension(path) {
            files.push(path.clone());
        }
    }

    let mut seen = std::collections::HashSet::new();
    files.retain(|f| seen.insert(normalize_path(f)));
    Ok(files)
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), DiagramError> {
    let read_error = |source| DiagramError::ReadError {
        path: dir.to_path_buf(),
        source,
    };

    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if path.is_dir() {
            collect_files_recursive(&path, files)?;
        } else if has_schema_extension(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn has_schema_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SCHEMA_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Absolute form of `path`: canonical when it exists, lexically cleaned otherwise.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Loads schema files and resolves their inheritance.
pub struct SchemaLoader<'r> {
    refs: &'r mut RefResolver,
}

impl<'r> SchemaLoader<'r> {
    pub fn new(refs: &'r mut RefResolver) -> Self {
        Self { refs }
    }

    /// Load every schema file reachable from `paths`, in input order.
    pub fn load(&mut self, paths: &[PathBuf]) -> Result<Vec<SchemaFileInfo>, DiagramError> {
        collect_schema_files(paths)?
            .iter()
            .map(|path| self.load_file(path))
            .collect()
    }

    /// Load one schema file with its `extends` chain merged in.
    pub fn load_file(&mut self, path: &Path) -> Result<SchemaFileInfo, DiagramError> {
        debug!(path = %path.display(), "loading schema");
        let (_, schema) = load_schema_file(path)?;
        let location = Location::file(path);
        let (schema, base) = InheritanceResolver::new(&mut *self.refs).resolve(&location, schema)?;

        Ok(SchemaFileInfo {
            filename: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            path: match location {
                Location::File(p) => Some(p),
                Location::Remote(_) => None,
            },
            schema,
            base,
        })
    }
}
