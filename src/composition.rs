//! `allOf` / `oneOf` / `anyOf` handling.

use indexmap::IndexMap;
use tracing::debug;

use crate::diagram::{DiagramBuilder, Relation, RelationKind};
use crate::error::DiagramError;
use crate::mapper::{primitive_type, Scope};
use crate::names::sanitize;
use crate::refs::split_reference;
use crate::schema::{Property, Schema};
use crate::types::AllOfMode;

/// Deduplicated union, `first` then `second`.
fn union(first: &[String], second: &[String]) -> Vec<String> {
    let mut merged = first.to_vec();
    for name in second {
        if !merged.contains(name) {
            merged.push(name.clone());
        }
    }
    merged
}

impl DiagramBuilder<'_> {
    /// Map a property carrying composition keywords.
    ///
    /// Falls back to a plain field when no member produced anything.
    pub(crate) fn map_composition(
        &mut self,
        owner: &str,
        name: &str,
        property: &Property,
        required: bool,
        scope: Scope,
    ) -> Result<(), DiagramError> {
        let mut emitted = self.apply_all_of(owner, name, &property.all_of, &property.required, scope)?;
        emitted |= self.apply_alternatives(owner, name, &property.one_of, "oneOf")?;
        emitted |= self.apply_alternatives(owner, name, &property.any_of, "anyOf")?;

        if !emitted {
            self.add_field(owner, &primitive_type(property.schema_type.as_deref()), name, required);
        }
        Ok(())
    }

    /// Apply `allOf` members to `owner`. Returns whether anything was emitted.
    ///
    /// Inline members are merged into `owner` whatever the mode. `$ref`
    /// members are merged, inherited from, or composed per `AllOfMode`.
    pub(crate) fn apply_all_of(
        &mut self,
        owner: &str,
        label: &str,
        members: &[Property],
        required: &[String],
        scope: Scope,
    ) -> Result<bool, DiagramError> {
        let mut emitted = false;
        for member in members {
            let Some(reference) = member.reference.as_deref() else {
                if !member.properties.is_empty() {
                    let required = union(required, &member.required);
                    self.map_properties(owner, &member.properties, &required, scope, &[])?;
                    emitted = true;
                }
                continue;
            };

            match self.prefs.all_of_mode {
                AllOfMode::Merge => {
                    let (properties, target_required) = self.resolve_merge_target(reference)?;
                    let required = union(required, &target_required);
                    self.map_properties(owner, &properties, &required, scope, &[])?;
                }
                AllOfMode::Inherit => {
                    let target = self.ref_class_name(reference);
                    self.ctx
                        .add_relation(Relation::new(&target, RelationKind::Inheritance, owner, label));
                }
                AllOfMode::Compose => {
                    let target = self.ref_class_name(reference);
                    self.ctx
                        .add_relation(Relation::new(owner, RelationKind::Composition, &target, label));
                }
            }
            emitted = true;
        }
        Ok(emitted)
    }

    /// Apply `oneOf` / `anyOf` members. Returns whether anything was emitted.
    fn apply_alternatives(
        &mut self,
        owner: &str,
        name: &str,
        members: &[Property],
        keyword: &str,
    ) -> Result<bool, DiagramError> {
        let label = format!("{} ({})", name, keyword);
        let mut options = 0;
        let mut emitted = false;

        for member in members {
            let target = if let Some(reference) = member.reference.as_deref() {
                self.ref_class_name(reference)
            } else if member.is_object() {
                options += 1;
                let class = match options {
                    1 => format!("{}-option", sanitize(name)),
                    n => format!("{}-option{}", sanitize(name), n),
                };
                self.ctx.ensure_class(&class);
                self.map_properties(&class, &member.properties, &member.required, Scope::Nested, &[])?;
                class
            } else {
                continue;
            };
            self.ctx.add_relation(Relation::multiplied(
                owner, "1", RelationKind::Association, "1", &target, &label,
            ));
            emitted = true;
        }
        Ok(emitted)
    }

    /// Properties and `required` of an `allOf` target being merged inline.
    ///
    /// Only the target's own properties are merged; its own composition
    /// keywords are not followed.
    fn resolve_merge_target(
        &mut self,
        reference: &str,
    ) -> Result<(IndexMap<String, Property>, Vec<String>), DiagramError> {
        if let Some(definition) = self.local_definition(reference) {
            return Ok((definition.properties.clone(), definition.required.clone()));
        }

        let location = self.current_location();
        debug!(reference, base = %location, "resolving allOf target");
        let resolved = self.refs.resolve(reference, &location)?;
        let schema = Schema::from_value(&resolved.document)
            .map_err(|e| DiagramError::format(resolved.key(), e))?;
        Ok((schema.properties, schema.required))
    }

    /// `#/definitions/X` or `#/$defs/X` in the schema currently being mapped.
    fn local_definition(&self, reference: &str) -> Option<&Schema> {
        let (document, fragment) = split_reference(reference);
        if !document.is_empty() {
            return None;
        }
        let fragment = fragment?;
        let key = fragment
            .strip_prefix("#/definitions/")
            .or_else(|| fragment.strip_prefix("#/$defs/"))?;
        if key.contains('/') {
            return None;
        }
        let key = key.replace("~1", "/").replace("~0", "~");
        let schemas = self.schemas;
        schemas.get(self.current?)?.schema.definitions.get(&key)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use crate::diagram::{DiagramBuilder, DiagramContext};
    use crate::names::NameRegistry;
    use crate::refs::RefResolver;
    use crate::schema::{Schema, SchemaFileInfo};
    use crate::types::{AllOfMode, Preferences};

    fn build(doc: Value, prefs: Preferences) -> DiagramContext {
        let schemas = vec![SchemaFileInfo::detached(Schema::from_value(&doc).unwrap())];
        let mut names = NameRegistry::new();
        let mut refs = RefResolver::new();
        DiagramBuilder::new(&prefs, &mut names, &mut refs, &schemas)
            .build_context()
            .unwrap()
    }

    fn with_mode(mode: AllOfMode) -> Preferences {
        Preferences {
            all_of_mode: mode,
            ..Preferences::default()
        }
    }

    fn order_schema() -> Value {
        json!({
            "title": "Order",
            "definitions": {
                "Audited": {
                    "type": "object",
                    "required": ["createdAt"],
                    "properties": {
                        "createdAt": { "type": "string" },
                        "createdBy": { "type": "string" }
                    }
                }
            },
            "allOf": [
                { "$ref": "#/definitions/Audited" },
                { "type": "object", "properties": { "note": { "type": "string" } } }
            ],
            "properties": { "id": { "type": "integer" } },
            "required": ["id"]
        })
    }

    #[test]
    fn merge_inlines_referenced_properties() {
        let ctx = build(order_schema(), Preferences::default());
        assert_eq!(
            ctx.class("Order").unwrap().fields,
            [
                "+Integer id",
                "+String createdAt",
                "String createdBy [0..1]",
                "String note [0..1]"
            ]
        );
        assert!(ctx.relations().is_empty());
    }

    #[test]
    fn inherit_mode_emits_generalization() {
        let ctx = build(order_schema(), with_mode(AllOfMode::Inherit));
        let lines: Vec<String> = ctx.relations().iter().map(|r| r.to_string()).collect();
        assert_eq!(lines, ["Audited <|-- Order"]);
        // Inline members still merge.
        assert!(ctx
            .class("Order")
            .unwrap()
            .fields
            .contains(&"String note [0..1]".to_string()));
    }

    #[test]
    fn compose_mode_emits_composition() {
        let ctx = build(order_schema(), with_mode(AllOfMode::Compose));
        let lines: Vec<String> = ctx.relations().iter().map(|r| r.to_string()).collect();
        assert_eq!(lines, ["Order *-- Audited"]);
    }

    #[test]
    fn property_level_all_of_uses_property_label() {
        let doc = json!({
            "title": "Order",
            "definitions": { "Money": { "properties": { "amount": { "type": "number" } } } },
            "properties": {
                "total": { "allOf": [{ "$ref": "#/definitions/Money" }] }
            }
        });
        let ctx = build(doc, with_mode(AllOfMode::Compose));
        let lines: Vec<String> = ctx.relations().iter().map(|r| r.to_string()).collect();
        assert_eq!(lines, ["Order *-- Money : total"]);
    }

    #[test]
    fn one_of_and_any_of_options() {
        let doc = json!({
            "title": "Payment",
            "properties": {
                "method": {
                    "oneOf": [
                        { "$ref": "#/definitions/Card" },
                        { "type": "object", "properties": { "iban": { "type": "string" } } },
                        { "type": "object", "properties": { "wallet": { "type": "string" } } },
                        { "type": "string" }
                    ]
                },
                "contact": { "anyOf": [{ "$ref": "#/definitions/Email" }] }
            }
        });
        let ctx = build(doc, Preferences::default());
        let lines: Vec<String> = ctx.relations().iter().map(|r| r.to_string()).collect();
        assert_eq!(
            lines,
            [
                r#"Payment "1" --> "1" Card : method (oneOf)"#,
                r#"Payment "1" --> "1" Method-option : method (oneOf)"#,
                r#"Payment "1" --> "1" Method-option2 : method (oneOf)"#,
                r#"Payment "1" --> "1" Email : contact (anyOf)"#,
            ]
        );
        assert_eq!(
            ctx.class("Method-option").unwrap().fields,
            ["String iban [0..1]"]
        );
    }

    #[test]
    fn empty_composition_falls_back_to_field() {
        let doc = json!({
            "title": "Thing",
            "properties": { "value": { "type": "string", "oneOf": [{ "type": "string" }] } },
            "required": ["value"]
        });
        let ctx = build(doc, Preferences::default());
        assert_eq!(ctx.class("Thing").unwrap().fields, ["+String value"]);
    }

    #[test]
    fn missing_merge_target_is_fatal() {
        let doc = json!({
            "title": "Order",
            "allOf": [{ "$ref": "missing.json" }]
        });
        let schemas = vec![SchemaFileInfo::detached(Schema::from_value(&doc).unwrap())];
        let prefs = Preferences::default();
        let mut names = NameRegistry::new();
        let mut refs = RefResolver::new();
        let err = DiagramBuilder::new(&prefs, &mut names, &mut refs, &schemas)
            .build_context()
            .unwrap_err();
        assert!(matches!(err, crate::DiagramError::InvalidReference { .. }));
    }
}
