//! Connector Framework schema types
//!
//! Types for describing the object classes and attributes a connector
//! exposes.

use serde::{Deserialize, Serialize};

/// Schema describing the structure of a target system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// The object classes available in this schema.
    pub object_classes: Vec<ObjectClass>,
}

impl Schema {
    /// Create a new empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a schema with the given object classes.
    #[must_use]
    pub fn with_object_classes(object_classes: Vec<ObjectClass>) -> Self {
        Self { object_classes }
    }

    /// Find an object class by name.
    #[must_use]
    pub fn get_object_class(&self, name: &str) -> Option<&ObjectClass> {
        self.object_classes.iter().find(|oc| oc.name == name)
    }

    /// Check if an object class exists.
    #[must_use]
    pub fn has_object_class(&self, name: &str) -> bool {
        self.get_object_class(name).is_some()
    }
}

/// An object class in a target system schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectClass {
    /// Canonical name for this object class (e.g. `__ACCOUNT__`).
    pub name: String,

    /// Native name in the target system.
    pub native_name: String,

    /// Optional display name for UI presentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Attributes belonging to this object class.
    pub attributes: Vec<SchemaAttribute>,
}

impl ObjectClass {
    /// Create a new object class with the given name.
    pub fn new(name: impl Into<String>, native_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_name: native_name.into(),
            display_name: None,
            attributes: Vec::new(),
        }
    }

    /// Set the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Add an attribute using builder pattern.
    #[must_use]
    pub fn with_attribute(mut self, attribute: SchemaAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Find an attribute by name.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&SchemaAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Get the primary identifier attribute for this object class.
    #[must_use]
    pub fn primary_identifier(&self) -> Option<&SchemaAttribute> {
        self.attributes
            .iter()
            .find(|a| a.identifier_type == Some(IdentifierType::Primary))
    }

    /// Get all required attributes.
    #[must_use]
    pub fn required_attributes(&self) -> Vec<&SchemaAttribute> {
        self.attributes.iter().filter(|a| a.required).collect()
    }
}

/// An attribute in an object class schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaAttribute {
    /// Canonical name for this attribute.
    pub name: String,

    /// Native name in the target system.
    pub native_name: String,

    /// Data type of this attribute.
    pub data_type: AttributeDataType,

    /// Whether this attribute can have multiple values.
    #[serde(default)]
    pub multi_valued: bool,

    /// Whether this attribute is required.
    #[serde(default)]
    pub required: bool,

    /// Whether this attribute can be read.
    #[serde(default = "default_true")]
    pub readable: bool,

    /// Whether this attribute can be written.
    #[serde(default = "default_true")]
    pub writable: bool,

    /// Identifier type, when this attribute identifies the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier_type: Option<IdentifierType>,
}

fn default_true() -> bool {
    true
}

/// Identifier type for attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierType {
    /// Primary identifier - immutable, used for correlation.
    Primary,
}

impl SchemaAttribute {
    /// Create a new attribute with the given name and type.
    pub fn new(
        name: impl Into<String>,
        native_name: impl Into<String>,
        data_type: AttributeDataType,
    ) -> Self {
        Self {
            name: name.into(),
            native_name: native_name.into(),
            data_type,
            multi_valued: false,
            required: false,
            readable: true,
            writable: true,
            identifier_type: None,
        }
    }

    /// Mark this attribute as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark this attribute as the primary identifier.
    #[must_use]
    pub fn primary_identifier(mut self) -> Self {
        self.identifier_type = Some(IdentifierType::Primary);
        self
    }
}

/// Data type of a schema attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeDataType {
    String,
}

impl AttributeDataType {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeDataType::String => "string",
        }
    }
}

impl std::fmt::Display for AttributeDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> ObjectClass {
        ObjectClass::new("__ACCOUNT__", "User")
            .with_attribute(
                SchemaAttribute::new("initials", "initials", AttributeDataType::String)
                    .required()
                    .primary_identifier(),
            )
            .with_attribute(SchemaAttribute::new(
                "surname",
                "surname",
                AttributeDataType::String,
            ))
    }

    #[test]
    fn test_object_class_lookup() {
        let schema = Schema::with_object_classes(vec![account()]);
        assert!(schema.has_object_class("__ACCOUNT__"));
        assert!(!schema.has_object_class("__GROUP__"));

        let oc = schema.get_object_class("__ACCOUNT__").unwrap();
        assert_eq!(oc.primary_identifier().map(|a| a.name.as_str()), Some("initials"));
        assert_eq!(oc.required_attributes().len(), 1);
        assert!(oc.get_attribute("surname").is_some_and(|a| !a.required));
    }

    #[test]
    fn test_schema_serialization() {
        let schema = Schema::with_object_classes(vec![account()]);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("\"identifier_type\":\"primary\""));
        assert!(json.contains("\"data_type\":\"string\""));
        assert_eq!(AttributeDataType::String.to_string(), "string");

        let parsed: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.object_classes[0].attributes.len(), 2);
        assert!(parsed.object_classes[0].attributes[1].readable);
    }
}
