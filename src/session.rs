//! Load-and-build entry points.

use std::path::PathBuf;

use tracing::debug;

use crate::diagram::DiagramBuilder;
use crate::error::DiagramError;
use crate::loader::SchemaLoader;
use crate::names::NameRegistry;
use crate::refs::RefResolver;
use crate::schema::SchemaFileInfo;
use crate::types::Preferences;

/// One generation session.
///
/// Owns the reference resolver (and its remote-document cache) and the
/// class-name registry. The registry is reset at the start of every build,
/// so a session can build several diagrams.
#[derive(Default)]
pub struct Session {
    prefs: Preferences,
    refs: RefResolver,
    names: NameRegistry,
}

impl Session {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            prefs,
            refs: RefResolver::new(),
            names: NameRegistry::new(),
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Load every schema reachable from `paths`, with `extends` resolved.
    pub fn load(&mut self, paths: &[PathBuf]) -> Result<Vec<SchemaFileInfo>, DiagramError> {
        let schemas = SchemaLoader::new(&mut self.refs).load(paths)?;
        debug!(count = schemas.len(), "loaded schemas");
        Ok(schemas)
    }

    /// Build the diagram text for already loaded schemas.
    pub fn build(&mut self, schemas: &[SchemaFileInfo]) -> Result<String, DiagramError> {
        DiagramBuilder::new(&self.prefs, &mut self.names, &mut self.refs, schemas).build()
    }

    /// Load `paths` and build their diagram.
    pub fn generate(&mut self, paths: &[PathBuf]) -> Result<String, DiagramError> {
        let schemas = self.load(paths)?;
        self.build(&schemas)
    }
}

/// Load `paths` and build their diagram in a fresh session.
///
/// # Errors
///
/// Returns the first error hit while loading or building; no partial
/// diagram is produced.
pub fn generate(paths: &[PathBuf], prefs: &Preferences) -> Result<String, DiagramError> {
    Session::new(prefs.clone()).generate(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn session_builds_repeatably() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("person.json"),
            r#"{"title": "Person", "properties": {"id": {"type": "integer"}}, "required": ["id"]}"#,
        )
        .unwrap();

        let mut session = Session::new(Preferences::default());
        let schemas = session.load(&[dir.path().to_path_buf()]).unwrap();
        let first = session.build(&schemas).unwrap();
        let second = session.build(&schemas).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "classDiagram\nclass Person {\n  +Integer id\n}\n");
    }

    #[test]
    fn generate_reports_missing_input() {
        let err = generate(&[PathBuf::from("/nonexistent/schemas")], &Preferences::default())
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
