//! `extends` resolution.
//!
//! A derived schema is merged with its fully resolved base, depth-first.
//! Each chain carries its own visiting list of normalized locations, so
//! re-entering a location already on the chain is a cycle. There is no
//! global memo: a base shared by several chains is simply read again.

use tracing::debug;

use crate::error::DiagramError;
use crate::refs::{Location, RefResolver};
use crate::schema::Schema;

pub struct InheritanceResolver<'r> {
    refs: &'r mut RefResolver,
}

impl<'r> InheritanceResolver<'r> {
    pub fn new(refs: &'r mut RefResolver) -> Self {
        Self { refs }
    }

    /// Resolve the `extends` chain of `schema`, loaded from `location`.
    ///
    /// Returns the merged schema and the normalized key of its direct base.
    ///
    /// # Errors
    ///
    /// Returns `DiagramError::InheritanceCycle` with the full chain when a
    /// schema (transitively) extends itself, or the resolver's error when a
    /// base can't be fetched or decoded.
    pub fn resolve(
        &mut self,
        location: &Location,
        schema: Schema,
    ) -> Result<(Schema, Option<String>), DiagramError> {
        let mut visiting = Vec::new();
        self.resolve_chain(location.to_string(), location, schema, &mut visiting)
    }

    fn resolve_chain(
        &mut self,
        key: String,
        location: &Location,
        schema: Schema,
        visiting: &mut Vec<String>,
    ) -> Result<(Schema, Option<String>), DiagramError> {
        if visiting.contains(&key) {
            let mut chain = visiting.clone();
            chain.push(key);
            return Err(DiagramError::InheritanceCycle { chain });
        }

        let Some(extends) = schema.extends.as_ref() else {
            return Ok((schema, None));
        };
        let reference = extends.reference().to_string();

        visiting.push(key);
        let target = self.refs.resolve(&reference, location)?;
        let base_schema = Schema::from_value(&target.document)
            .map_err(|e| DiagramError::format(target.key(), e))?;
        let base_key = target.key();
        let (base, _) = self.resolve_chain(base_key.clone(), &target.location, base_schema, visiting)?;
        visiting.pop();

        debug!(derived = %location, base = %base_key, "merging inherited schema");
        Ok((merge_inherited(&base, schema), Some(base_key)))
    }
}

/// Merge a resolved base into a derived schema.
///
/// `properties` and `definitions` take the base's entries first with the
/// derived schema winning on collisions; `required` is the deduplicated
/// union in base-then-derived order. The base's own `extends` is dropped.
pub fn merge_inherited(base: &Schema, derived: Schema) -> Schema {
    let own: Vec<String> = derived.properties.keys().cloned().collect();

    let mut properties = base.properties.clone();
    properties.extend(derived.properties);

    let mut definitions = base.definitions.clone();
    definitions.extend(derived.definitions);

    let mut required = base.required.clone();
    for name in derived.required {
        if !required.contains(&name) {
            required.push(name);
        }
    }

    let mut inherited: Vec<String> = base
        .properties
        .keys()
        .chain(base.inherited_property_names.iter())
        .filter(|name| !own.contains(name))
        .cloned()
        .collect();
    inherited.sort();
    inherited.dedup();

    Schema {
        properties,
        definitions,
        required,
        inherited_property_names: inherited,
        ..derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn schema(value: serde_json::Value) -> Schema {
        Schema::from_value(&value).unwrap()
    }

    #[test]
    fn derived_wins_and_required_unions() {
        let base = schema(json!({
            "required": ["id", "name"],
            "properties": {
                "id": { "type": "integer" },
                "name": { "type": "string" }
            },
            "definitions": { "Tag": { "title": "base" } }
        }));
        let derived = schema(json!({
            "required": ["name", "salary"],
            "properties": {
                "name": { "type": "integer" },
                "salary": { "type": "number" }
            },
            "definitions": { "Tag": { "title": "derived" } }
        }));

        let merged = merge_inherited(&base, derived);
        let keys: Vec<_> = merged.properties.keys().cloned().collect();
        assert_eq!(keys, ["id", "name", "salary"]);
        assert_eq!(
            merged.properties["name"].schema_type.as_deref(),
            Some("integer")
        );
        assert_eq!(merged.definitions["Tag"].title.as_deref(), Some("derived"));
        assert_eq!(merged.required, ["id", "name", "salary"]);
        assert_eq!(merged.inherited_property_names, ["id"]);
    }

    #[test]
    fn inherited_names_exclude_own_properties() {
        let base = schema(json!({ "properties": { "b": {}, "a": {}, "c": {} } }));
        let derived = schema(json!({ "properties": { "c": {} } }));
        let merged = merge_inherited(&base, derived);
        assert_eq!(merged.inherited_property_names, ["a", "b"]);
    }

    #[test]
    fn three_level_chain() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("c.json"),
            r#"{"title": "C", "properties": {"c1": {}, "shared": {}}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("b.json"),
            r#"{"title": "B", "extends": "c.json", "properties": {"b1": {}}}"#,
        )
        .unwrap();
        let a_path = dir.path().join("a.json");
        fs::write(
            &a_path,
            r#"{"title": "A", "extends": {"$ref": "b.json"}, "properties": {"a1": {}, "shared": {}}}"#,
        )
        .unwrap();

        let (_, a) = crate::loader::load_schema_file(&a_path).unwrap();
        let mut refs = RefResolver::new();
        let (merged, base) = InheritanceResolver::new(&mut refs)
            .resolve(&Location::file(&a_path), a)
            .unwrap();

        assert_eq!(merged.inherited_property_names, ["b1", "c1"]);
        assert!(merged.properties.contains_key("c1"));
        assert!(base.unwrap().ends_with("b.json"));
        assert_eq!(merged.title.as_deref(), Some("A"));
    }

    #[test]
    fn two_file_cycle_is_detected() {
        let dir = tempdir().unwrap();
        let a_path = dir.path().join("a.json");
        fs::write(&a_path, r#"{"extends": "b.json"}"#).unwrap();
        fs::write(dir.path().join("b.json"), r#"{"extends": "a.json"}"#).unwrap();

        let (_, a) = crate::loader::load_schema_file(&a_path).unwrap();
        let mut refs = RefResolver::new();
        let err = InheritanceResolver::new(&mut refs)
            .resolve(&Location::file(&a_path), a)
            .unwrap_err();

        match err {
            DiagramError::InheritanceCycle { chain } => {
                assert_eq!(chain.len(), 3);
                assert!(chain[0].ends_with("a.json"));
                assert!(chain[1].ends_with("b.json"));
                assert!(chain[2].ends_with("a.json"));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_extension_is_a_cycle() {
        let dir = tempdir().unwrap();
        let a_path = dir.path().join("a.yaml");
        fs::write(&a_path, "extends: ./a.yaml\n").unwrap();

        let (_, a) = crate::loader::load_schema_file(&a_path).unwrap();
        let mut refs = RefResolver::new();
        let result = InheritanceResolver::new(&mut refs).resolve(&Location::file(&a_path), a);
        assert!(matches!(result, Err(DiagramError::InheritanceCycle { .. })));
    }

    #[test]
    fn missing_base_is_invalid_reference() {
        let dir = tempdir().unwrap();
        let a_path = dir.path().join("a.json");
        fs::write(&a_path, r#"{"extends": "missing.json"}"#).unwrap();

        let (_, a) = crate::loader::load_schema_file(&a_path).unwrap();
        let mut refs = RefResolver::new();
        let result = InheritanceResolver::new(&mut refs).resolve(&Location::file(&a_path), a);
        assert!(matches!(result, Err(DiagramError::InvalidReference { .. })));
    }
}
