//! Mermaid Schema
//!
//! Converts JSON-Schema-style documents (JSON or YAML) into Mermaid class
//! diagram text.
//!
//! Loading resolves `$ref` targets across local files and HTTP and merges
//! `extends` chains (base first, derived wins). Diagram synthesis then maps
//! each schema file to a class, each definition to a class, and each
//! property to a field or a relation.
//!
//! # Example
//!
//! ```
//! use mermaid_schema::{DiagramBuilder, NameRegistry, Preferences, RefResolver, Schema, SchemaFileInfo};
//! use serde_json::json;
//!
//! let schema = Schema::from_value(&json!({
//!     "title": "Person",
//!     "type": "object",
//!     "properties": {
//!         "id": { "type": "integer" },
//!         "email": { "type": "string" }
//!     },
//!     "required": ["id"]
//! }))
//! .unwrap();
//!
//! let schemas = vec![SchemaFileInfo::detached(schema)];
//! let prefs = Preferences::default();
//! let mut names = NameRegistry::new();
//! let mut refs = RefResolver::new();
//! let text = DiagramBuilder::new(&prefs, &mut names, &mut refs, &schemas)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     text,
//!     "classDiagram\nclass Person {\n  +Integer id\n  String email [0..1]\n}\n"
//! );
//! ```
//!
//! # Property mapping
//!
//! | Property | Top-level class | Definition class |
//! |----------|-----------------|------------------|
//! | primitive | field | field |
//! | `$ref` | `"1" --> "1"` / `"0..1"` | `o--` |
//! | array of `$ref` or objects | `"1" --> "*"` | `"1" --> "*"` |
//! | inline object | synthetic class + relation | synthetic class + relation |
//! | `additionalProperties` | `Map<String,V>` field | `Map<String,V>` field |
//!
//! Files are loaded from disk with [`Session::load`] or all at once with
//! [`generate`].

mod composition;
mod diagram;
mod error;
mod inflect;
mod inheritance;
mod loader;
mod mapper;
mod names;
mod refs;
mod schema;
mod session;
mod types;

pub use diagram::{
    DiagramBuilder, DiagramClass, DiagramContext, EnumClass, EnumNote, Relation, RelationKind,
};
pub use error::DiagramError;
pub use inflect::singularize;
pub use inheritance::{merge_inherited, InheritanceResolver};
pub use loader::{
    collect_schema_files, load_schema_file, parse_document, DocumentFormat, SchemaLoader,
};
pub use mapper::{classify, primitive_type, render_field, PropertyKind, Scope};
pub use names::{class_name, ref_class_name, sanitize, NameRegistry};
pub use refs::{navigate_fragment, Location, RefResolver, ResolvedRef};
pub use schema::{AdditionalProperties, Extends, Property, Schema, SchemaFileInfo};
pub use session::{generate, Session};
pub use types::{AllOfMode, EnumStyle, PreferenceOverrides, Preferences, RequiredFieldStyle};
