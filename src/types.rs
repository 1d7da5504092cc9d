//! Generation preferences and their option enums.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::DiagramError;

/// How enum-valued properties are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnumStyle {
    /// `{A|B|C} status`
    #[default]
    Inline,
    /// Plain field plus `note for Class "status: A, B, C"`.
    Note,
    /// Field typed `StatusEnum` plus a separate `<<enumeration>>` class.
    Class,
}

/// How required and optional fields are marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequiredFieldStyle {
    /// `+Type name` / `Type name [0..1]`
    #[default]
    Plus,
    /// `Type name` / `Type name [0..1]`
    None,
    /// `Type name` / `Type name?`
    SuffixQ,
}

/// How `$ref` members of `allOf` are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AllOfMode {
    /// Copy the referenced schema's properties into the current class.
    #[default]
    Merge,
    /// `Referenced <|-- Current`
    Inherit,
    /// `Current *-- Referenced`
    Compose,
}

/// Normalize an option value for case-insensitive matching.
///
/// `suffix-q`, `Suffix_Q` and `SUFFIXQ` all normalize to `suffixq`.
fn normalize_option(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for EnumStyle {
    type Err = DiagramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_option(s).as_str() {
            "inline" => Ok(EnumStyle::Inline),
            "note" => Ok(EnumStyle::Note),
            "class" => Ok(EnumStyle::Class),
            _ => Err(DiagramError::InvalidOption {
                option: "enumStyle",
                value: s.to_string(),
                expected: "inline, note, or class",
            }),
        }
    }
}

impl FromStr for RequiredFieldStyle {
    type Err = DiagramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_option(s).as_str() {
            "plus" => Ok(RequiredFieldStyle::Plus),
            "none" => Ok(RequiredFieldStyle::None),
            "suffixq" => Ok(RequiredFieldStyle::SuffixQ),
            _ => Err(DiagramError::InvalidOption {
                option: "requiredFieldStyle",
                value: s.to_string(),
                expected: "plus, none, or suffix_q",
            }),
        }
    }
}

impl FromStr for AllOfMode {
    type Err = DiagramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_option(s).as_str() {
            "merge" => Ok(AllOfMode::Merge),
            "inherit" => Ok(AllOfMode::Inherit),
            "compose" => Ok(AllOfMode::Compose),
            _ => Err(DiagramError::InvalidOption {
                option: "allOfMode",
                value: s.to_string(),
                expected: "merge, inherit, or compose",
            }),
        }
    }
}

/// Options controlling diagram synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    /// Render arrays of objects/refs as `"1" --> "*"` relations instead of fields.
    pub arrays_as_relation: bool,
    pub enum_style: EnumStyle,
    /// Singularize array field names with English inflection rules.
    pub use_english_singularizer: bool,
    /// Render properties a schema inherited through `extends`.
    pub show_inherited_fields: bool,
    pub required_field_style: RequiredFieldStyle,
    pub all_of_mode: AllOfMode,
    /// Omit the leading `classDiagram` line.
    pub no_class_diagram_header: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            arrays_as_relation: true,
            enum_style: EnumStyle::default(),
            use_english_singularizer: true,
            show_inherited_fields: false,
            required_field_style: RequiredFieldStyle::default(),
            all_of_mode: AllOfMode::default(),
            no_class_diagram_header: false,
        }
    }
}

/// Partial preferences as read from a config file.
///
/// Option enums stay strings here so a bad value surfaces as
/// `DiagramError::InvalidOption` rather than a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PreferenceOverrides {
    pub arrays_as_relation: Option<bool>,
    pub enum_style: Option<String>,
    pub use_english_singularizer: Option<bool>,
    pub show_inherited_fields: Option<bool>,
    pub required_field_style: Option<String>,
    pub all_of_mode: Option<String>,
    pub no_class_diagram_header: Option<bool>,
}

impl PreferenceOverrides {
    /// Read overrides from a JSON or YAML config file.
    ///
    /// # Errors
    ///
    /// Returns `DiagramError::FileNotFound` if the file doesn't exist, or
    /// `DiagramError::FileFormat` if it isn't a valid preferences document.
    pub fn from_file(path: &Path) -> Result<Self, DiagramError> {
        let document = crate::loader::parse_document(path)?;
        serde_json::from_value(document).map_err(|e| DiagramError::format(path.display(), e))
    }
}

impl Preferences {
    /// Apply config-file overrides on top of these preferences.
    ///
    /// # Errors
    ///
    /// Returns `DiagramError::InvalidOption` for an unrecognized enum value.
    pub fn apply(mut self, overrides: &PreferenceOverrides) -> Result<Self, DiagramError> {
        if let Some(v) = overrides.arrays_as_relation {
            self.arrays_as_relation = v;
        }
        if let Some(v) = &overrides.enum_style {
            self.enum_style = v.parse()?;
        }
        if let Some(v) = overrides.use_english_singularizer {
            self.use_english_singularizer = v;
        }
        if let Some(v) = overrides.show_inherited_fields {
            self.show_inherited_fields = v;
        }
        if let Some(v) = &overrides.required_field_style {
            self.required_field_style = v.parse()?;
        }
        if let Some(v) = &overrides.all_of_mode {
            self.all_of_mode = v.parse()?;
        }
        if let Some(v) = overrides.no_class_diagram_header {
            self.no_class_diagram_header = v;
        }
        Ok(self)
    }
}
