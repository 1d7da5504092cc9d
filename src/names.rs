//! Diagram-safe class names and collision handling.

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use crate::loader::SCHEMA_EXTENSIONS;
use crate::schema::SchemaFileInfo;

/// Split on runs of non-alphanumeric characters and PascalCase-join the parts.
///
/// `"order line-item"` becomes `"OrderLineItem"`. Idempotent.
pub fn sanitize(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect()
}

/// Uppercase the first character, leaving the rest unchanged.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Base class name for a schema file: title, else file stem, else `UnknownSchema`.
pub fn class_name(info: &SchemaFileInfo) -> String {
    if let Some(name) = info.schema.title.as_deref().map(sanitize) {
        if !name.is_empty() {
            return name;
        }
    }
    if let Some(name) = info
        .filename
        .as_deref()
        .and_then(|f| Path::new(f).file_stem())
        .map(|stem| sanitize(&stem.to_string_lossy()))
    {
        if !name.is_empty() {
            return name;
        }
    }
    "UnknownSchema".to_string()
}

/// Base class name for a `$ref`: its last `/`- or `#`-delimited segment.
///
/// A trailing schema file extension is dropped, so `address.json` and
/// `#/definitions/Address` both name `Address`.
pub fn ref_class_name(reference: &str) -> String {
    let segment = reference
        .split(|c| c == '/' || c == '#')
        .rev()
        .find(|s| !s.is_empty())
        .unwrap_or("");
    let segment = match segment.rsplit_once('.') {
        Some((stem, ext)) if SCHEMA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => {
            stem
        }
        _ => segment,
    };
    let name = sanitize(segment);
    if name.is_empty() {
        "UnknownRef".to_string()
    } else {
        name
    }
}

/// Registry of class names handed out during one build.
///
/// Maps a base name to the sources (file paths or ref strings) that asked
/// for it, in order, with the name each was given. The first source owns the
/// bare name; later sources get `<base>_2`, `<base>_3`, ... Asking again from
/// the same source is free.
#[derive(Debug, Default)]
pub struct NameRegistry {
    owners: HashMap<String, Vec<(String, String)>>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every name. Called at the start of each build.
    pub fn reset(&mut self) {
        self.owners.clear();
    }

    /// The name `source` should use for `base`.
    pub fn register(&mut self, base: &str, source: &str) -> String {
        if let Some(name) = self.lookup(base, source) {
            return name;
        }

        let taken = self.owners.get(base).map_or(0, Vec::len);
        if taken == 0 {
            self.claim(base, source, base);
            return base.to_string();
        }

        let mut n = taken + 1;
        let mut name = format!("{}_{}", base, n);
        // The suffixed name is a bucket of its own and may already be taken.
        while self.owners.get(&name).is_some_and(|owners| !owners.is_empty()) {
            n += 1;
            name = format!("{}_{}", base, n);
        }
        warn!(
            name = base,
            source,
            renamed = %name,
            "class name collision, renaming"
        );
        self.claim(base, source, &name);
        self.claim(&name, source, &name);
        name
    }

    /// The name already registered by `source` under `base`, if any.
    pub fn lookup(&self, base: &str, source: &str) -> Option<String> {
        self.owners
            .get(base)?
            .iter()
            .find(|(owner, _)| owner == source)
            .map(|(_, name)| name.clone())
    }

    fn claim(&mut self, base: &str, source: &str, name: &str) {
        self.owners
            .entry(base.to_string())
            .or_default()
            .push((source.to_string(), name.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    #[test]
    fn sanitize_pascal_cases() {
        assert_eq!(sanitize("order line-item"), "OrderLineItem");
        assert_eq!(sanitize("person"), "Person");
        assert_eq!(sanitize("snake_case_name"), "SnakeCaseName");
        assert_eq!(sanitize("__"), "");
        assert_eq!(sanitize("camelCase"), "CamelCase");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for input in ["order line-item", "a.b.c", "Already", "x--y__z", "日本 語"] {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn class_name_precedence() {
        let mut info = SchemaFileInfo::detached(Schema::default());
        assert_eq!(class_name(&info), "UnknownSchema");

        info.filename = Some("purchase-order.yaml".into());
        assert_eq!(class_name(&info), "PurchaseOrder");

        info.schema.title = Some("Purchase Order v2".into());
        assert_eq!(class_name(&info), "PurchaseOrderV2");

        info.schema.title = Some("--".into());
        assert_eq!(class_name(&info), "PurchaseOrder");
    }

    #[test]
    fn ref_class_names() {
        assert_eq!(ref_class_name("#/definitions/Address"), "Address");
        assert_eq!(ref_class_name("common/address.json"), "Address");
        assert_eq!(
            ref_class_name("https://example.com/schemas/line-item.yaml#"),
            "LineItem"
        );
        assert_eq!(ref_class_name("#/definitions/postal_code/"), "PostalCode");
        assert_eq!(ref_class_name("#"), "UnknownRef");
    }

    #[test]
    fn same_source_is_idempotent() {
        let mut names = NameRegistry::new();
        assert_eq!(names.register("Person", "a.json"), "Person");
        assert_eq!(names.register("Person", "a.json"), "Person");
    }

    #[test]
    fn collisions_count_up() {
        let mut names = NameRegistry::new();
        assert_eq!(names.register("Person", "a.json"), "Person");
        assert_eq!(names.register("Person", "b.json"), "Person_2");
        assert_eq!(names.register("Person", "c.json"), "Person_3");
        assert_eq!(names.register("Person", "b.json"), "Person_2");
        assert_eq!(names.lookup("Person", "c.json").as_deref(), Some("Person_3"));
    }

    #[test]
    fn disambiguated_name_is_its_own_bucket() {
        let mut names = NameRegistry::new();
        names.register("Person", "a.json");
        assert_eq!(names.register("Person", "b.json"), "Person_2");
        assert_eq!(names.register("Person_2", "c.json"), "Person_2_2");
    }

    #[test]
    fn reset_clears_registry() {
        let mut names = NameRegistry::new();
        names.register("Person", "a.json");
        names.reset();
        assert_eq!(names.register("Person", "b.json"), "Person");
        assert!(names.lookup("Person", "a.json").is_none());
    }
}
