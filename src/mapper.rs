//! Property-to-field mapping.
//!
//! `classify` is the single ordered decision over a property's keywords.
//! The order is load-bearing: an enum beats a `$ref`, a `$ref` beats
//! composition keywords, and so on down to the primitive fallback.

use indexmap::IndexMap;

use crate::diagram::{DiagramBuilder, Relation, RelationKind};
use crate::error::DiagramError;
use crate::inflect::element_name;
use crate::names::{capitalize, sanitize};
use crate::schema::{AdditionalProperties, Property};
use crate::types::{EnumStyle, RequiredFieldStyle};

/// Where a property is being mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Property of a whole schema file.
    TopLevel,
    /// Property of an entry under `definitions`.
    Definition,
    /// Property of a synthetic class (inline objects, array items, options).
    Nested,
}

/// What a property renders as.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyKind<'p> {
    /// `additionalProperties` / `patternProperties` without own properties.
    Map,
    Enum(&'p [String]),
    Reference(&'p str),
    /// `allOf` / `oneOf` / `anyOf`.
    Composition,
    Array(Option<&'p Property>),
    Object,
    Primitive(Option<&'p str>),
}

/// Classify a property. Map-typed properties of top-level and definition
/// classes short-circuit every other keyword; elsewhere an explicit
/// `type: object` is checked before the map keywords.
pub fn classify(property: &Property, scope: Scope, suppress_enum: bool) -> PropertyKind<'_> {
    let is_map = property.is_map() && property.properties.is_empty();
    if is_map && scope != Scope::Nested {
        return PropertyKind::Map;
    }
    if !property.enum_values.is_empty() && !suppress_enum {
        return PropertyKind::Enum(&property.enum_values);
    }
    if let Some(reference) = property.reference.as_deref() {
        return PropertyKind::Reference(reference);
    }
    if property.has_composition() {
        return PropertyKind::Composition;
    }
    if property.schema_type.as_deref() == Some("array") {
        return PropertyKind::Array(property.items.as_deref());
    }
    if property.is_object() {
        return PropertyKind::Object;
    }
    if is_map {
        return PropertyKind::Map;
    }
    PropertyKind::Primitive(property.schema_type.as_deref())
}

/// Diagram type for a JSON Schema primitive type.
pub fn primitive_type(schema_type: Option<&str>) -> String {
    match schema_type {
        Some("integer") => "Integer".to_string(),
        Some("number") => "Number".to_string(),
        Some("boolean") => "Boolean".to_string(),
        Some("string") => "String".to_string(),
        None => "Object".to_string(),
        Some(other) => capitalize(other),
    }
}

/// Render one field line with the required-field markers of `style`.
pub fn render_field(type_name: &str, name: &str, required: bool, style: RequiredFieldStyle) -> String {
    match (style, required) {
        (RequiredFieldStyle::Plus, true) => format!("+{} {}", type_name, name),
        (RequiredFieldStyle::Plus, false) | (RequiredFieldStyle::None, false) => {
            format!("{} {} [0..1]", type_name, name)
        }
        (RequiredFieldStyle::None, true) | (RequiredFieldStyle::SuffixQ, true) => {
            format!("{} {}", type_name, name)
        }
        (RequiredFieldStyle::SuffixQ, false) => format!("{} {}?", type_name, name),
    }
}

/// Base type of an enum property. Untyped enums of strings read as `String`.
fn enum_base_type(property: &Property) -> String {
    match property.schema_type.as_deref() {
        None if !property.enum_values.is_empty() => "String".to_string(),
        other => primitive_type(other),
    }
}

fn sub_schema_type(schema: &Property) -> Option<String> {
    schema
        .schema_type
        .as_deref()
        .map(|t| primitive_type(Some(t)))
        .or_else(|| schema.format.as_deref().map(capitalize))
}

impl DiagramBuilder<'_> {
    /// Map every property of `props` into `owner`, skipping names in `skip`.
    pub(crate) fn map_properties(
        &mut self,
        owner: &str,
        props: &IndexMap<String, Property>,
        required: &[String],
        scope: Scope,
        skip: &[String],
    ) -> Result<(), DiagramError> {
        for (name, property) in props {
            if skip.contains(name) {
                continue;
            }
            let is_required = required.contains(name);
            self.map_property(owner, name, property, is_required, scope)?;
        }
        Ok(())
    }

    /// Map one property into `owner` as a field, relation, or both.
    pub(crate) fn map_property(
        &mut self,
        owner: &str,
        name: &str,
        property: &Property,
        required: bool,
        scope: Scope,
    ) -> Result<(), DiagramError> {
        match classify(property, scope, false) {
            PropertyKind::Map => {
                let value_type = self.map_value_type(property);
                self.add_field(owner, &format!("Map<String,{}>", value_type), name, required);
            }
            PropertyKind::Enum(values) => self.map_enum(owner, name, property, values, required),
            PropertyKind::Reference(reference) => {
                self.map_reference(owner, name, reference, required, scope)
            }
            PropertyKind::Composition => {
                self.map_composition(owner, name, property, required, scope)?
            }
            PropertyKind::Array(items) => self.map_array(owner, name, items, required)?,
            PropertyKind::Object => self.map_object(owner, name, property, required, scope)?,
            PropertyKind::Primitive(schema_type) => {
                self.add_field(owner, &primitive_type(schema_type), name, required);
            }
        }
        Ok(())
    }

    pub(crate) fn add_field(&mut self, owner: &str, type_name: &str, name: &str, required: bool) {
        let field = render_field(type_name, name, required, self.prefs.required_field_style);
        self.ctx.add_field(owner, field);
    }

    fn map_enum(
        &mut self,
        owner: &str,
        name: &str,
        property: &Property,
        values: &[String],
        required: bool,
    ) {
        match self.prefs.enum_style {
            EnumStyle::Inline => {
                let type_name = format!("{{{}}}", values.join("|"));
                self.add_field(owner, &type_name, name, required);
            }
            EnumStyle::Note => {
                self.add_field(owner, &enum_base_type(property), name, required);
                self.ctx
                    .add_note(owner, format!("{}: {}", name, values.join(", ")));
            }
            EnumStyle::Class => {
                let enum_name = format!("{}Enum", sanitize(name));
                self.add_field(owner, &enum_name, name, required);
                self.ctx.add_enum_class(&enum_name, values);
            }
        }
    }

    fn map_array(
        &mut self,
        owner: &str,
        name: &str,
        items: Option<&Property>,
        required: bool,
    ) -> Result<(), DiagramError> {
        let element = element_name(name, self.prefs.use_english_singularizer);

        if self.prefs.arrays_as_relation {
            if let Some(items) = items {
                if let Some(reference) = items.reference.as_deref() {
                    let target = self.ref_class_name(reference);
                    self.ctx.add_relation(Relation::multiplied(
                        owner, "1", RelationKind::Association, "*", &target, name,
                    ));
                    return Ok(());
                }
                if classify(items, Scope::Nested, true) == PropertyKind::Object {
                    let target = self.item_class(owner, &element, items)?;
                    self.ctx.add_relation(Relation::multiplied(
                        owner, "1", RelationKind::Association, "*", &target, name,
                    ));
                    return Ok(());
                }
            }
        }

        let item_type = self.array_item_type(owner, &element, items)?;
        self.add_field(owner, &format!("{}[]", item_type), &element, required);
        Ok(())
    }

    /// Element type of an array; inline object items get a synthetic class.
    fn array_item_type(
        &mut self,
        owner: &str,
        element: &str,
        items: Option<&Property>,
    ) -> Result<String, DiagramError> {
        let Some(items) = items else {
            return Ok("Object".to_string());
        };
        Ok(match classify(items, Scope::Nested, true) {
            PropertyKind::Reference(reference) => self.ref_class_name(reference),
            PropertyKind::Array(inner) => {
                format!("{}[]", self.array_item_type(owner, element, inner)?)
            }
            PropertyKind::Object => self.item_class(owner, element, items)?,
            PropertyKind::Map => format!("Map<String,{}>", self.map_value_type(items)),
            PropertyKind::Enum(_) | PropertyKind::Composition => {
                enum_base_type(items)
            }
            PropertyKind::Primitive(schema_type) => primitive_type(schema_type),
        })
    }

    /// Synthetic class `<Owner><Element>` holding an array item's properties.
    fn item_class(
        &mut self,
        owner: &str,
        element: &str,
        items: &Property,
    ) -> Result<String, DiagramError> {
        let class = format!("{}{}", owner, sanitize(element));
        self.ctx.ensure_class(&class);
        self.map_properties(&class, &items.properties, &items.required, Scope::Nested, &[])?;
        Ok(class)
    }

    fn map_reference(
        &mut self,
        owner: &str,
        name: &str,
        reference: &str,
        required: bool,
        scope: Scope,
    ) {
        let target = self.ref_class_name(reference);
        match scope {
            Scope::Nested => self.add_field(owner, &target, name, required),
            Scope::TopLevel => {
                let to = if required { "1" } else { "0..1" };
                self.ctx.add_relation(Relation::multiplied(
                    owner, "1", RelationKind::Association, to, &target, name,
                ));
            }
            Scope::Definition => {
                self.ctx
                    .add_relation(Relation::new(owner, RelationKind::Aggregation, &target, name));
            }
        }
    }

    /// Inline object: a synthetic class named after the property.
    fn map_object(
        &mut self,
        owner: &str,
        name: &str,
        property: &Property,
        required: bool,
        scope: Scope,
    ) -> Result<(), DiagramError> {
        let class = match sanitize(name) {
            s if s.is_empty() => "Object".to_string(),
            s => s,
        };
        self.ctx.ensure_class(&class);
        self.map_properties(&class, &property.properties, &property.required, Scope::Nested, &[])?;

        match scope {
            Scope::Nested => self.add_field(owner, &class, name, required),
            Scope::TopLevel | Scope::Definition => {
                let to = if required { "1" } else { "0..1" };
                self.ctx.add_relation(Relation::multiplied(
                    owner, "1", RelationKind::Association, to, &class, name,
                ));
            }
        }
        Ok(())
    }

    /// `V` of `Map<String,V>`: the `additionalProperties` schema's type or ref,
    /// else the first `patternProperties` entry's type or format, else `Object`.
    fn map_value_type(&mut self, property: &Property) -> String {
        if let Some(AdditionalProperties::Schema(schema)) = &property.additional_properties {
            if let Some(reference) = schema.reference.as_deref() {
                return self.ref_class_name(reference);
            }
            if let Some(type_name) = schema.schema_type.as_deref() {
                return primitive_type(Some(type_name));
            }
        }
        property
            .pattern_properties
            .values()
            .next()
            .and_then(sub_schema_type)
            .unwrap_or_else(|| "Object".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prop(value: serde_json::Value) -> Property {
        Property::from_value(&value).unwrap()
    }

    #[test]
    fn primitive_types() {
        assert_eq!(primitive_type(Some("integer")), "Integer");
        assert_eq!(primitive_type(Some("number")), "Number");
        assert_eq!(primitive_type(Some("boolean")), "Boolean");
        assert_eq!(primitive_type(Some("string")), "String");
        assert_eq!(primitive_type(None), "Object");
        assert_eq!(primitive_type(Some("null")), "Null");
    }

    #[test]
    fn field_styles() {
        use RequiredFieldStyle::{Plus, SuffixQ};
        let none = RequiredFieldStyle::None;
        assert_eq!(render_field("String", "name", true, Plus), "+String name");
        assert_eq!(render_field("String", "name", false, Plus), "String name [0..1]");
        assert_eq!(render_field("String", "name", true, none), "String name");
        assert_eq!(render_field("String", "name", false, none), "String name [0..1]");
        assert_eq!(render_field("String", "name", true, SuffixQ), "String name");
        assert_eq!(render_field("String", "name", false, SuffixQ), "String name?");
    }

    #[test]
    fn classification_order() {
        let p = prop(json!({ "enum": ["A"], "$ref": "#/definitions/X" }));
        assert!(matches!(classify(&p, Scope::TopLevel, false), PropertyKind::Enum(_)));
        assert!(matches!(
            classify(&p, Scope::TopLevel, true),
            PropertyKind::Reference("#/definitions/X")
        ));

        let p = prop(json!({ "$ref": "#/definitions/X", "oneOf": [{}] }));
        assert!(matches!(classify(&p, Scope::Nested, false), PropertyKind::Reference(_)));

        let p = prop(json!({ "type": "array", "allOf": [{}] }));
        assert_eq!(classify(&p, Scope::Nested, false), PropertyKind::Composition);

        let p = prop(json!({ "type": "object", "properties": { "a": {} } }));
        assert_eq!(classify(&p, Scope::TopLevel, false), PropertyKind::Object);

        let p = prop(json!({ "type": "string" }));
        assert_eq!(
            classify(&p, Scope::TopLevel, false),
            PropertyKind::Primitive(Some("string"))
        );
    }

    #[test]
    fn maps_short_circuit_at_top_level_only() {
        let p = prop(json!({ "enum": ["A"], "additionalProperties": { "type": "string" } }));
        assert_eq!(classify(&p, Scope::TopLevel, false), PropertyKind::Map);
        assert_eq!(classify(&p, Scope::Definition, false), PropertyKind::Map);
        assert!(matches!(classify(&p, Scope::Nested, false), PropertyKind::Enum(_)));

        let p = prop(json!({ "type": "object", "additionalProperties": { "type": "string" } }));
        assert_eq!(classify(&p, Scope::TopLevel, false), PropertyKind::Map);
        assert_eq!(classify(&p, Scope::Nested, false), PropertyKind::Object);

        let p = prop(json!({ "additionalProperties": { "type": "string" } }));
        assert_eq!(classify(&p, Scope::Nested, false), PropertyKind::Map);
    }
}
