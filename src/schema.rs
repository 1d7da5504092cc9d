//! Typed schema model.
//!
//! Documents are decoded with serde, then `required` arrays are recovered by
//! walking the raw document in lockstep with the typed tree. Decoding alone
//! can't be trusted for `required`: draft-3 style `"required": true` on a
//! property would either fail to decode or be mistaken for the nested list.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A whole schema document or one of its `definitions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Schema {
    #[serde(rename = "$id")]
    pub id: Option<String>,
    #[serde(rename = "$schema")]
    pub schema_uri: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "deserialize_type")]
    pub schema_type: Option<String>,
    #[serde(default)]
    pub properties: IndexMap<String, Property>,
    #[serde(default, alias = "$defs")]
    pub definitions: IndexMap<String, Schema>,
    #[serde(skip)]
    pub required: Vec<String>,
    pub extends: Option<Extends>,
    #[serde(rename = "allOf", default)]
    pub all_of: Vec<Property>,
    /// Properties received from an `extends` base and not redeclared here.
    /// Sorted; filled in by inheritance resolution.
    #[serde(skip)]
    pub inherited_property_names: Vec<String>,
}

/// The non-standard `extends` keyword.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Extends {
    /// `"extends": "base.json"`
    Ref(String),
    /// `"extends": {"$ref": "base.json"}`
    Object {
        #[serde(rename = "$ref")]
        reference: String,
    },
}

impl Extends {
    pub fn reference(&self) -> &str {
        match self {
            Extends::Ref(r) => r,
            Extends::Object { reference } => reference,
        }
    }
}

/// A property schema (or any nested sub-schema).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Property {
    #[serde(rename = "type", default, deserialize_with = "deserialize_type")]
    pub schema_type: Option<String>,
    pub format: Option<String>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_items")]
    pub items: Option<Box<Property>>,
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub properties: IndexMap<String, Property>,
    #[serde(rename = "enum", default, deserialize_with = "deserialize_enum")]
    pub enum_values: Vec<String>,
    #[serde(rename = "additionalProperties")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(rename = "patternProperties", default)]
    pub pattern_properties: IndexMap<String, Property>,
    #[serde(rename = "allOf", default)]
    pub all_of: Vec<Property>,
    #[serde(rename = "oneOf", default)]
    pub one_of: Vec<Property>,
    #[serde(rename = "anyOf", default)]
    pub any_of: Vec<Property>,
    /// Required names at this nesting level.
    #[serde(skip)]
    pub required: Vec<String>,
}

/// `additionalProperties`: either a boolean or a schema.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Box<Property>),
}

/// A loaded schema file.
#[derive(Debug, Clone)]
pub struct SchemaFileInfo {
    /// File name with extension, e.g. `person.json`.
    pub filename: Option<String>,
    /// Normalized absolute path of the file.
    pub path: Option<PathBuf>,
    pub schema: Schema,
    /// Normalized location of the resolved `extends` target, if any.
    pub base: Option<String>,
}

impl SchemaFileInfo {
    /// Wrap a schema that didn't come from a file.
    pub fn detached(schema: Schema) -> Self {
        Self {
            filename: None,
            path: None,
            schema,
            base: None,
        }
    }

    /// Identifier that owns this schema's class name in the name registry.
    pub fn source_id(&self) -> String {
        match (&self.path, &self.filename) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(name)) => name.clone(),
            (None, None) => self.schema.title.clone().unwrap_or_default(),
        }
    }
}

impl Schema {
    /// Decode a schema from its raw document, recovering every `required`.
    pub fn from_value(raw: &Value) -> Result<Self, serde_json::Error> {
        let mut schema: Schema = serde_json::from_value(raw.clone())?;
        schema.recover_required(raw);
        Ok(schema)
    }

    fn recover_required(&mut self, raw: &Value) {
        self.required = required_at(raw);
        recover_map(&mut self.properties, raw.get("properties"));
        let defs = raw.get("definitions").or_else(|| raw.get("$defs"));
        for (name, def) in self.definitions.iter_mut() {
            match defs.and_then(|d| d.get(name)) {
                Some(raw_def) => def.recover_required(raw_def),
                None => def.required.clear(),
            }
        }
        recover_list(&mut self.all_of, raw.get("allOf"));
    }
}

impl Property {
    /// Decode a sub-schema from its raw document, recovering every `required`.
    pub fn from_value(raw: &Value) -> Result<Self, serde_json::Error> {
        let mut property: Property = serde_json::from_value(raw.clone())?;
        property.recover_required(raw);
        Ok(property)
    }

    fn recover_required(&mut self, raw: &Value) {
        self.required = required_at(raw);
        recover_map(&mut self.properties, raw.get("properties"));
        recover_map(&mut self.pattern_properties, raw.get("patternProperties"));
        if let Some(items) = self.items.as_deref_mut() {
            let raw_items = match raw.get("items") {
                Some(Value::Array(arr)) => arr.first(),
                other => other,
            };
            match raw_items {
                Some(r) => items.recover_required(r),
                None => items.required.clear(),
            }
        }
        if let Some(AdditionalProperties::Schema(schema)) = self.additional_properties.as_mut() {
            match raw.get("additionalProperties") {
                Some(r) => schema.recover_required(r),
                None => schema.required.clear(),
            }
        }
        recover_list(&mut self.all_of, raw.get("allOf"));
        recover_list(&mut self.one_of, raw.get("oneOf"));
        recover_list(&mut self.any_of, raw.get("anyOf"));
    }

    /// True when `additionalProperties` or `patternProperties` make this a map.
    pub fn is_map(&self) -> bool {
        matches!(
            self.additional_properties,
            Some(AdditionalProperties::Bool(true)) | Some(AdditionalProperties::Schema(_))
        ) || !self.pattern_properties.is_empty()
    }

    pub fn is_object(&self) -> bool {
        self.schema_type.as_deref() == Some("object")
            || (self.schema_type.is_none() && !self.properties.is_empty())
    }

    pub fn has_composition(&self) -> bool {
        !self.all_of.is_empty() || !self.one_of.is_empty() || !self.any_of.is_empty()
    }
}

/// The `required` array at one nesting level; empty when absent or not a list.
fn required_at(raw: &Value) -> Vec<String> {
    raw.get("required")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

fn recover_map(map: &mut IndexMap<String, Property>, raw: Option<&Value>) {
    for (name, property) in map.iter_mut() {
        match raw.and_then(|r| r.get(name)) {
            Some(r) => property.recover_required(r),
            None => property.required.clear(),
        }
    }
}

fn recover_list(list: &mut [Property], raw: Option<&Value>) {
    let raw_list = raw.and_then(|r| r.as_array());
    for (i, property) in list.iter_mut().enumerate() {
        match raw_list.and_then(|arr| arr.get(i)) {
            Some(r) => property.recover_required(r),
            None => property.required.clear(),
        }
    }
}

/// `type` as a string, or the first non-null entry of a type array.
fn deserialize_type<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str())
            .find(|s| *s != "null")
            .map(String::from),
        _ => None,
    })
}

/// `items` as a schema, or the first schema of a tuple-style array.
/// Boolean `items` carries no type information and decodes to `None`.
fn deserialize_items<'de, D>(deserializer: D) -> Result<Option<Box<Property>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let item = match value {
        Some(Value::Array(arr)) => arr.into_iter().next(),
        Some(v @ Value::Object(_)) => Some(v),
        _ => None,
    };
    item.map(|v| serde_json::from_value(v).map(Box::new))
        .transpose()
        .map_err(D::Error::custom)
}

/// Enum literals rendered as strings; non-string literals use their JSON text.
fn deserialize_enum<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_basic_schema() {
        let raw = json!({
            "$id": "https://example.com/person",
            "$schema": "http://json-schema.org/draft-07/schema#",
            "title": "Person",
            "type": "object",
            "required": ["id"],
            "properties": {
                "id": { "type": "integer" },
                "name": { "type": "string" }
            }
        });
        let schema = Schema::from_value(&raw).unwrap();
        assert_eq!(schema.id.as_deref(), Some("https://example.com/person"));
        assert_eq!(schema.title.as_deref(), Some("Person"));
        assert_eq!(schema.required, vec!["id"]);
        let keys: Vec<_> = schema.properties.keys().collect();
        assert_eq!(keys, ["id", "name"]);
    }

    #[test]
    fn recovers_required_at_every_level() {
        let raw = json!({
            "required": ["a"],
            "properties": {
                "a": {
                    "type": "object",
                    "required": ["b"],
                    "properties": {
                        "b": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["c"],
                                "properties": { "c": { "type": "string" } }
                            }
                        }
                    }
                },
                "m": {
                    "patternProperties": {
                        "^x": { "type": "object", "required": ["p"] }
                    }
                },
                "u": {
                    "oneOf": [
                        { "type": "object", "required": ["o1"] },
                        { "type": "object" }
                    ]
                }
            },
            "definitions": {
                "D": { "required": ["d"], "properties": { "d": { "type": "string" } } }
            },
            "allOf": [{ "required": ["z"] }]
        });
        let schema = Schema::from_value(&raw).unwrap();
        let a = &schema.properties["a"];
        assert_eq!(a.required, vec!["b"]);
        let items = a.properties["b"].items.as_ref().unwrap();
        assert_eq!(items.required, vec!["c"]);
        assert_eq!(
            schema.properties["m"].pattern_properties["^x"].required,
            vec!["p"]
        );
        let u = &schema.properties["u"];
        assert_eq!(u.one_of[0].required, vec!["o1"]);
        assert!(u.one_of[1].required.is_empty());
        assert_eq!(schema.definitions["D"].required, vec!["d"]);
        assert_eq!(schema.all_of[0].required, vec!["z"]);
    }

    #[test]
    fn draft3_boolean_required_is_ignored() {
        let raw = json!({
            "properties": {
                "name": { "type": "string", "required": true }
            }
        });
        let schema = Schema::from_value(&raw).unwrap();
        assert!(schema.properties["name"].required.is_empty());
        assert!(schema.required.is_empty());
    }

    #[test]
    fn extends_forms() {
        let s = Schema::from_value(&json!({ "extends": "base.json" })).unwrap();
        assert_eq!(s.extends, Some(Extends::Ref("base.json".into())));
        let s = Schema::from_value(&json!({ "extends": { "$ref": "base.json" } })).unwrap();
        assert_eq!(s.extends.as_ref().map(Extends::reference), Some("base.json"));
    }

    #[test]
    fn type_array_uses_first_non_null() {
        let p = Property::from_value(&json!({ "type": ["null", "string"] })).unwrap();
        assert_eq!(p.schema_type.as_deref(), Some("string"));
    }

    #[test]
    fn tuple_items_use_first_entry() {
        let p = Property::from_value(&json!({
            "type": "array",
            "items": [{ "type": "integer" }, { "type": "string" }]
        }))
        .unwrap();
        assert_eq!(
            p.items.unwrap().schema_type.as_deref(),
            Some("integer")
        );
    }

    #[test]
    fn enum_literals_become_strings() {
        let p = Property::from_value(&json!({ "enum": ["A", 1, true, null] })).unwrap();
        assert_eq!(p.enum_values, vec!["A", "1", "true", "null"]);
    }

    #[test]
    fn defs_alias() {
        let s = Schema::from_value(&json!({
            "$defs": { "Tag": { "required": ["x"] } }
        }))
        .unwrap();
        assert_eq!(s.definitions["Tag"].required, vec!["x"]);
    }

    #[test]
    fn map_detection() {
        let p = Property::from_value(&json!({ "additionalProperties": { "type": "string" } }))
            .unwrap();
        assert!(p.is_map());
        let p = Property::from_value(&json!({ "additionalProperties": false })).unwrap();
        assert!(!p.is_map());
        let p = Property::from_value(&json!({ "patternProperties": { ".*": {} } })).unwrap();
        assert!(p.is_map());
    }
}
