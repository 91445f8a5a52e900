//! Connector Framework operation types
//!
//! Types for search operations: UIDs, attribute sets, connector objects,
//! results handlers and filters.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Object class name for accounts.
pub const ACCOUNT_OBJECT_CLASS: &str = "__ACCOUNT__";

/// Special attribute name resolving to an object's UID.
pub const UID_ATTRIBUTE: &str = "__UID__";

/// Special attribute name resolving to an object's name.
pub const NAME_ATTRIBUTE: &str = "__NAME__";

/// Unique identifier for an object in a target system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Uid {
    /// The attribute name used as the identifier.
    attribute_name: String,
    /// The actual value of the identifier.
    value: String,
}

impl Uid {
    /// Create a new UID with the given attribute name and value.
    pub fn new(attribute_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            value: value.into(),
        }
    }

    /// Create a UID using the framework `__UID__` attribute name.
    pub fn from_value(value: impl Into<String>) -> Self {
        Self::new(UID_ATTRIBUTE, value)
    }

    /// Get the attribute name.
    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    /// Get the value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.attribute_name, self.value)
    }
}

/// A set of attributes carried by a connector object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSet {
    #[serde(flatten)]
    attributes: HashMap<String, AttributeValue>,
}

impl AttributeSet {
    /// Create a new empty attribute set.
    pub fn new() -> Self {
        Self {
            attributes: HashMap::new(),
        }
    }

    /// Set an attribute value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Set an attribute using builder pattern.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Get an attribute value.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Get a single-valued string attribute.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_string())
    }

    /// Get all string values of an attribute.
    pub fn get_strings(&self, name: &str) -> Vec<&str> {
        self.get(name).map(|v| v.as_strings()).unwrap_or_default()
    }

    /// Check if an attribute exists.
    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Get all attribute names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(|s| s.as_str())
    }

    /// Get the number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// A value for an attribute, which may be single or multi-valued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// No value (null).
    Null,
    /// A single string value.
    String(String),
    /// A single integer value.
    Integer(i64),
    /// A single boolean value.
    Boolean(bool),
    /// Multiple values.
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Get as a string if this is a single string value.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as strings (works for both single and multi-valued).
    pub fn as_strings(&self) -> Vec<&str> {
        match self {
            AttributeValue::String(s) => vec![s.as_str()],
            AttributeValue::Array(arr) => arr.iter().filter_map(|v| v.as_string()).collect(),
            _ => vec![],
        }
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(AttributeValue::Null, Into::into)
    }
}

/// An object returned by a search, identified by UID and name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorObject {
    /// Object class of this object (e.g. `__ACCOUNT__`).
    pub object_class: String,
    /// Unique identifier.
    pub uid: Uid,
    /// Display name.
    pub name: String,
    /// Remaining attributes.
    pub attributes: AttributeSet,
}

impl ConnectorObject {
    /// Start building a connector object of the given class.
    pub fn builder(object_class: impl Into<String>) -> ConnectorObjectBuilder {
        ConnectorObjectBuilder {
            object_class: object_class.into(),
            uid: None,
            name: None,
            attributes: AttributeSet::new(),
        }
    }

    /// Resolve an attribute's string values, including `__UID__` and `__NAME__`.
    pub fn values_of(&self, attribute: &str) -> Vec<&str> {
        match attribute {
            UID_ATTRIBUTE => vec![self.uid.value()],
            NAME_ATTRIBUTE => vec![self.name.as_str()],
            _ => self.attributes.get_strings(attribute),
        }
    }
}

/// Builder for [`ConnectorObject`].
#[derive(Debug, Clone)]
pub struct ConnectorObjectBuilder {
    object_class: String,
    uid: Option<String>,
    name: Option<String>,
    attributes: AttributeSet,
}

impl ConnectorObjectBuilder {
    /// Set the UID value.
    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Set the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add an attribute.
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.set(name, value);
        self
    }

    /// Build the object. Both UID and name must be present and non-blank.
    pub fn build(self) -> crate::error::ConnectorResult<ConnectorObject> {
        let uid = self
            .uid
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| crate::error::ConnectorError::InvalidData {
                message: "connector object requires a non-blank uid".to_string(),
            })?;
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| crate::error::ConnectorError::InvalidData {
                message: "connector object requires a non-blank name".to_string(),
            })?;

        Ok(ConnectorObject {
            object_class: self.object_class,
            uid: Uid::from_value(uid),
            name,
            attributes: self.attributes,
        })
    }
}

/// Callback receiving search results one at a time.
///
/// Returning `false` stops the search.
pub trait ResultsHandler {
    /// Handle one result.
    fn handle(&mut self, object: ConnectorObject) -> bool;
}

impl<F> ResultsHandler for F
where
    F: FnMut(ConnectorObject) -> bool,
{
    fn handle(&mut self, object: ConnectorObject) -> bool {
        self(object)
    }
}

/// Filter for search operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Match objects where attribute equals value.
    Equals { attribute: String, value: String },

    /// Match objects where attribute contains value (substring).
    Contains { attribute: String, value: String },

    /// Match objects where attribute starts with value.
    StartsWith { attribute: String, value: String },

    /// Match objects where attribute ends with value.
    EndsWith { attribute: String, value: String },

    /// Match objects where attribute is greater than value.
    GreaterThan { attribute: String, value: String },

    /// Match objects where attribute is greater than or equal to value.
    GreaterThanOrEquals { attribute: String, value: String },

    /// Match objects where attribute is less than value.
    LessThan { attribute: String, value: String },

    /// Match objects where attribute is less than or equal to value.
    LessThanOrEquals { attribute: String, value: String },

    /// Match objects where attribute exists (has any value).
    Present { attribute: String },

    /// Logical AND of multiple filters.
    And { filters: Vec<Filter> },

    /// Logical OR of multiple filters.
    Or { filters: Vec<Filter> },

    /// Logical NOT of a filter.
    Not { filter: Box<Filter> },
}

impl Filter {
    /// Create an equals filter.
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a contains filter.
    pub fn contains(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Contains {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a starts-with filter.
    pub fn starts_with(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::StartsWith {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create an ends-with filter.
    pub fn ends_with(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::EndsWith {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than filter.
    pub fn gt(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::GreaterThan {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than-or-equals filter.
    pub fn ge(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::GreaterThanOrEquals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a less-than filter.
    pub fn lt(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::LessThan {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a less-than-or-equals filter.
    pub fn le(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::LessThanOrEquals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a present (attribute exists) filter.
    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    /// Create an AND filter.
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    /// Create an OR filter.
    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    /// Create a NOT filter (negation).
    pub fn negate(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    /// Combine this filter with another using AND.
    pub fn and_with(self, other: Filter) -> Self {
        match self {
            Filter::And { mut filters } => {
                filters.push(other);
                Filter::And { filters }
            }
            _ => Filter::And {
                filters: vec![self, other],
            },
        }
    }

    /// Combine this filter with another using OR.
    pub fn or_with(self, other: Filter) -> Self {
        match self {
            Filter::Or { mut filters } => {
                filters.push(other);
                Filter::Or { filters }
            }
            _ => Filter::Or {
                filters: vec![self, other],
            },
        }
    }

    /// Evaluate this filter against a connector object.
    ///
    /// Comparisons are case-sensitive string comparisons; a multi-valued
    /// attribute matches when any of its values does.
    pub fn matches(&self, object: &ConnectorObject) -> bool {
        match self {
            Filter::Equals { attribute, value } => any_value(object, attribute, |v| v == value),
            Filter::Contains { attribute, value } => {
                any_value(object, attribute, |v| v.contains(value.as_str()))
            }
            Filter::StartsWith { attribute, value } => {
                any_value(object, attribute, |v| v.starts_with(value.as_str()))
            }
            Filter::EndsWith { attribute, value } => {
                any_value(object, attribute, |v| v.ends_with(value.as_str()))
            }
            Filter::GreaterThan { attribute, value } => {
                any_value(object, attribute, |v| v > value.as_str())
            }
            Filter::GreaterThanOrEquals { attribute, value } => {
                any_value(object, attribute, |v| v >= value.as_str())
            }
            Filter::LessThan { attribute, value } => {
                any_value(object, attribute, |v| v < value.as_str())
            }
            Filter::LessThanOrEquals { attribute, value } => {
                any_value(object, attribute, |v| v <= value.as_str())
            }
            Filter::Present { attribute } => match attribute.as_str() {
                UID_ATTRIBUTE | NAME_ATTRIBUTE => true,
                _ => object
                    .attributes
                    .get(attribute)
                    .is_some_and(|v| !v.is_null()),
            },
            Filter::And { filters } => filters.iter().all(|f| f.matches(object)),
            Filter::Or { filters } => filters.iter().any(|f| f.matches(object)),
            Filter::Not { filter } => !filter.matches(object),
        }
    }
}

fn any_value(object: &ConnectorObject, attribute: &str, pred: impl Fn(&str) -> bool) -> bool {
    object.values_of(attribute).into_iter().any(pred)
}
