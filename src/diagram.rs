//! Diagram synthesis.
//!
//! `DiagramBuilder` walks every loaded schema into a `DiagramContext`
//! (definitions first, then the schema files themselves) and renders the
//! context as Mermaid `classDiagram` text.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::DiagramError;
use crate::mapper::Scope;
use crate::names::{self, sanitize, NameRegistry};
use crate::refs::{split_reference, Location, RefResolver};
use crate::schema::{Schema, SchemaFileInfo};
use crate::types::{EnumStyle, Preferences};

/// Arrow style of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// `-->`
    Association,
    /// `o--`
    Aggregation,
    /// `*--`
    Composition,
    /// `<|--`
    Inheritance,
}

impl RelationKind {
    pub fn arrow(&self) -> &'static str {
        match self {
            RelationKind::Association => "-->",
            RelationKind::Aggregation => "o--",
            RelationKind::Composition => "*--",
            RelationKind::Inheritance => "<|--",
        }
    }
}

/// One relation line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub from: String,
    pub to: String,
    pub from_multiplicity: Option<String>,
    pub to_multiplicity: Option<String>,
    pub label: String,
    pub kind: RelationKind,
}

impl Relation {
    pub fn new(from: &str, kind: RelationKind, to: &str, label: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            from_multiplicity: None,
            to_multiplicity: None,
            label: label.to_string(),
            kind,
        }
    }

    pub fn multiplied(
        from: &str,
        from_multiplicity: &str,
        kind: RelationKind,
        to_multiplicity: &str,
        to: &str,
        label: &str,
    ) -> Self {
        Self {
            from_multiplicity: Some(from_multiplicity.to_string()),
            to_multiplicity: Some(to_multiplicity.to_string()),
            ..Self::new(from, kind, to, label)
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.from)?;
        if let Some(m) = &self.from_multiplicity {
            write!(f, " \"{}\"", m)?;
        }
        write!(f, " {}", self.kind.arrow())?;
        if let Some(m) = &self.to_multiplicity {
            write!(f, " \"{}\"", m)?;
        }
        write!(f, " {}", self.to)?;
        if !self.label.is_empty() {
            write!(f, " : {}", self.label)?;
        }
        Ok(())
    }
}

/// A class and its rendered field lines, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagramClass {
    pub name: String,
    pub fields: Vec<String>,
}

/// Free-text note attached to a class (`EnumStyle::Note`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumNote {
    pub class_name: String,
    pub text: String,
}

/// Standalone `<<enumeration>>` class (`EnumStyle::Class`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumClass {
    pub name: String,
    pub values: Vec<String>,
}

/// Everything accumulated during one build.
#[derive(Debug, Default)]
pub struct DiagramContext {
    classes: IndexMap<String, DiagramClass>,
    notes: Vec<EnumNote>,
    enum_classes: IndexMap<String, EnumClass>,
    relations: Vec<Relation>,
}

impl DiagramContext {
    pub fn ensure_class(&mut self, name: &str) {
        if !self.classes.contains_key(name) {
            self.classes.insert(
                name.to_string(),
                DiagramClass {
                    name: name.to_string(),
                    fields: Vec::new(),
                },
            );
        }
    }

    /// Append a field; a line already present in the class is not repeated.
    pub fn add_field(&mut self, class: &str, field: String) {
        self.ensure_class(class);
        if let Some(c) = self.classes.get_mut(class) {
            if !c.fields.contains(&field) {
                c.fields.push(field);
            }
        }
    }

    pub fn add_relation(&mut self, relation: Relation) {
        if !self.relations.contains(&relation) {
            self.relations.push(relation);
        }
    }

    pub fn add_note(&mut self, class: &str, text: String) {
        let note = EnumNote {
            class_name: class.to_string(),
            text,
        };
        if !self.notes.contains(&note) {
            self.notes.push(note);
        }
    }

    pub fn add_enum_class(&mut self, name: &str, values: &[String]) {
        self.enum_classes
            .entry(name.to_string())
            .or_insert_with(|| EnumClass {
                name: name.to_string(),
                values: values.to_vec(),
            });
    }

    pub fn class(&self, name: &str) -> Option<&DiagramClass> {
        self.classes.get(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &DiagramClass> {
        self.classes.values()
    }

    pub fn notes(&self) -> &[EnumNote] {
        &self.notes
    }

    pub fn enum_classes(&self) -> impl Iterator<Item = &EnumClass> {
        self.enum_classes.values()
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Render the diagram text.
    ///
    /// Classes come first in first-seen order, then enum notes or enum
    /// classes for the matching style, a blank line, and the relations in
    /// emission order. Trailing blank lines are trimmed.
    pub fn render(&self, prefs: &Preferences) -> String {
        let mut lines = Vec::new();
        if !prefs.no_class_diagram_header {
            lines.push("classDiagram".to_string());
        }

        for class in self.classes.values() {
            lines.push(format!("class {} {{", class.name));
            lines.extend(class.fields.iter().map(|f| format!("  {}", f)));
            lines.push("}".to_string());
        }

        match prefs.enum_style {
            EnumStyle::Note => {
                for note in &self.notes {
                    lines.push(format!(
                        "note for {} \"{}\"",
                        note.class_name,
                        note.text.replace('"', "'")
                    ));
                }
            }
            EnumStyle::Class => {
                for enum_class in self.enum_classes.values() {
                    lines.push(format!("class {} {{", enum_class.name));
                    lines.push("  <<enumeration>>".to_string());
                    lines.extend(enum_class.values.iter().map(|v| format!("  {}", v)));
                    lines.push("}".to_string());
                }
            }
            EnumStyle::Inline => {}
        }

        lines.push(String::new());
        lines.extend(self.relations.iter().map(Relation::to_string));

        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}

/// Builds one diagram from a set of loaded schemas.
pub struct DiagramBuilder<'a> {
    pub(crate) prefs: &'a Preferences,
    pub(crate) names: &'a mut NameRegistry,
    pub(crate) refs: &'a mut RefResolver,
    pub(crate) schemas: &'a [SchemaFileInfo],
    pub(crate) ctx: DiagramContext,
    /// Index of the schema file currently being mapped.
    pub(crate) current: Option<usize>,
    /// Registered class name of each schema file, by index.
    file_classes: Vec<String>,
}

impl<'a> DiagramBuilder<'a> {
    pub fn new(
        prefs: &'a Preferences,
        names: &'a mut NameRegistry,
        refs: &'a mut RefResolver,
        schemas: &'a [SchemaFileInfo],
    ) -> Self {
        Self {
            prefs,
            names,
            refs,
            schemas,
            ctx: DiagramContext::default(),
            current: None,
            file_classes: Vec::new(),
        }
    }

    /// Build and render the diagram text.
    pub fn build(self) -> Result<String, DiagramError> {
        let prefs = self.prefs;
        Ok(self.build_context()?.render(prefs))
    }

    /// Build the diagram model without rendering it.
    pub fn build_context(mut self) -> Result<DiagramContext, DiagramError> {
        self.names.reset();

        let schemas = self.schemas;
        self.file_classes = schemas
            .iter()
            .map(|info| self.names.register(&names::class_name(info), &info.source_id()))
            .collect();

        for (i, info) in schemas.iter().enumerate() {
            self.current = Some(i);
            self.add_definitions(&info.schema.definitions)?;
        }
        for (i, info) in schemas.iter().enumerate() {
            self.current = Some(i);
            self.add_schema(i, info)?;
        }
        Ok(self.ctx)
    }

    fn add_definitions(&mut self, definitions: &IndexMap<String, Schema>) -> Result<(), DiagramError> {
        for (key, definition) in definitions {
            let class = match sanitize(key) {
                s if s.is_empty() => "UnknownRef".to_string(),
                s => s,
            };
            self.ctx.ensure_class(&class);
            self.map_properties(
                &class,
                &definition.properties,
                &definition.required,
                Scope::Definition,
                &[],
            )?;
            self.apply_all_of(&class, "", &definition.all_of, &definition.required, Scope::Definition)?;
            self.add_definitions(&definition.definitions)?;
        }
        Ok(())
    }

    fn add_schema(&mut self, index: usize, info: &SchemaFileInfo) -> Result<(), DiagramError> {
        let class = self.file_classes[index].clone();
        self.ctx.ensure_class(&class);

        let schema = &info.schema;
        if let Some(extends) = &schema.extends {
            let base = self.extends_target_name(index, extends.reference());
            self.ctx
                .add_relation(Relation::new(&base, RelationKind::Inheritance, &class, ""));
        }

        let skip: &[String] = if self.prefs.show_inherited_fields {
            &[]
        } else {
            &schema.inherited_property_names
        };
        self.map_properties(&class, &schema.properties, &schema.required, Scope::TopLevel, skip)?;
        self.apply_all_of(&class, "", &schema.all_of, &schema.required, Scope::TopLevel)?;
        Ok(())
    }

    /// Class name of the schema `index` extends.
    ///
    /// The resolved base location is authoritative. When the base isn't one
    /// of the loaded files, a loaded file whose stem or title appears in the
    /// reference's last segment is used, then the plain ref name.
    fn extends_target_name(&mut self, index: usize, reference: &str) -> String {
        let schemas = self.schemas;
        if let Some(base) = schemas[index].base.as_deref() {
            let base = base.strip_suffix('#').unwrap_or(base);
            if let Some(found) = schemas
                .iter()
                .position(|s| s.path.as_ref().is_some_and(|p| p.display().to_string() == base))
            {
                return self.file_classes[found].clone();
            }
        }

        let (document, _) = split_reference(reference);
        let segment = document.rsplit('/').next().unwrap_or("").to_lowercase();
        if !segment.is_empty() {
            let heuristic = schemas.iter().enumerate().find(|(i, s)| {
                let stem = s
                    .filename
                    .as_deref()
                    .and_then(|f| Path::new(f).file_stem())
                    .map(|stem| stem.to_string_lossy().to_lowercase());
                let title = s.schema.title.as_deref().map(str::to_lowercase);
                *i != index
                    && (stem.is_some_and(|stem| !stem.is_empty() && segment.contains(&stem))
                        || title.is_some_and(|t| !t.is_empty() && segment.contains(&t)))
            });
            if let Some((found, _)) = heuristic {
                return self.file_classes[found].clone();
            }
        }

        self.ref_class_name(reference)
    }

    /// Location of the schema file currently being mapped.
    pub(crate) fn current_location(&self) -> Location {
        match self.current.and_then(|i| self.schemas[i].path.as_deref()) {
            Some(path) => Location::File(path.to_path_buf()),
            None => Location::file(Path::new("schema.json")),
        }
    }

    /// Class name for a `$ref` target.
    ///
    /// Pointers into a document name the definition they point at. A whole
    /// loaded file uses that file's registered class. Any other document is
    /// registered under its ref string so it can't silently merge with an
    /// unrelated class of the same name.
    pub(crate) fn ref_class_name(&mut self, reference: &str) -> String {
        let (document, fragment) = split_reference(reference);
        let pointer = fragment
            .map(|f| f.trim_start_matches('#').trim_start_matches('/'))
            .unwrap_or("");

        if !pointer.is_empty() {
            return names::ref_class_name(reference);
        }
        if document.is_empty() {
            return match self.current {
                Some(i) => self.file_classes[i].clone(),
                None => names::ref_class_name(reference),
            };
        }

        if let Ok(Location::File(path)) = self.current_location().join(document) {
            if let Some(found) = self
                .schemas
                .iter()
                .position(|s| s.path.as_deref() == Some(path.as_path()))
            {
                return self.file_classes[found].clone();
            }
        }
        self.names
            .register(&names::ref_class_name(reference), document)
    }
}
