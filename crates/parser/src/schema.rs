//! Raw schema nodes and their classification
//!
//! [`RawSchema`] mirrors the subset of JSON Schema that Kubernetes emits, in
//! both OpenAPI definitions and CRD `openAPIV3Schema` blocks. The importer
//! never inspects it directly; it decodes each node once into a
//! [`SchemaNode`] and matches on that.

use kube_typegen_common::{GeneratorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String formats that carry plain-string semantics
const PLAIN_STRING_FORMATS: &[&str] = &[
    "", "date", "duration", "uri", "url", "email", "hostname", "ip", "ipv4", "ipv6", "cidr",
    "mac", "uuid", "uuid3", "uuid4", "uuid5", "password", "regex", "int32", "int64",
];

/// Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSchema {
    /// Type: string, number, integer, boolean, array, object
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,

    /// Format (e.g., int32, date-time, int-or-string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Properties (for object type)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, RawSchema>,

    /// Required properties
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    /// Items schema (for array type)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<RawSchema>>,

    #[serde(
        rename = "additionalProperties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<AdditionalProperties>,

    /// Reference to another definition
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_path: Option<String>,

    /// OpenAPI v3 wraps references carrying defaults as `allOf: [{$ref}]`
    #[serde(rename = "allOf", default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<RawSchema>,

    #[serde(
        rename = "x-kubernetes-group-version-kind",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub group_version_kind: Vec<GroupVersionKind>,

    #[serde(
        rename = "x-kubernetes-preserve-unknown-fields",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub preserve_unknown_fields: Option<bool>,

    #[serde(
        rename = "x-kubernetes-int-or-string",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub int_or_string: Option<bool>,

    /// Explicit namespaced/cluster flag
    #[serde(rename = "x-scoped", default, skip_serializing_if = "Option::is_none")]
    pub scoped: Option<bool>,
}

/// `additionalProperties` is either a flag or a value schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Flag(bool),
    Schema(Box<RawSchema>),
}

/// Entry of `x-kubernetes-group-version-kind`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl RawSchema {
    /// A `$ref`-only schema
    pub fn reference(path: &str) -> Self {
        Self {
            ref_path: Some(path.to_string()),
            ..Self::default()
        }
    }

    /// Whether this is the permissive `{}` schema
    pub fn is_unconstrained(&self) -> bool {
        self.schema_type.is_none()
            && self.ref_path.is_none()
            && self.all_of.is_empty()
            && self.properties.is_empty()
            && self.int_or_string.is_none()
            && self.preserve_unknown_fields.is_none()
    }

    /// Whether a named definition should become a record type rather than an alias
    pub fn is_record(&self) -> bool {
        !self.properties.is_empty()
            || (self.schema_type.as_deref() == Some("object")
                && !matches!(
                    self.additional_properties,
                    Some(AdditionalProperties::Schema(_))
                ))
    }
}

/// String specializations selected by `format`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Plain,
    Byte,
    DateTime,
    IntOrString,
    IdnHostname,
}

/// Closed set of schema shapes the importer understands
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemaNode<'a> {
    /// Object with nested properties
    Object(&'a BTreeMap<String, RawSchema>),
    /// Object used as a map; `None` for an untyped map
    Map(Option<&'a RawSchema>),
    Integer,
    Boolean,
    Number { float: bool },
    String(StringFormat),
    /// Array; `None` when `items` is absent
    Array(Option<&'a RawSchema>),
    Ref(&'a str),
    PreserveUnknown,
    IntOrString,
}

impl<'a> SchemaNode<'a> {
    /// Decode a raw schema; `context` names the location for error messages
    pub fn classify(schema: &'a RawSchema, context: &str) -> Result<Self> {
        match schema.schema_type.as_deref() {
            Some("object") => {
                if !schema.properties.is_empty() {
                    return Ok(SchemaNode::Object(&schema.properties));
                }
                match &schema.additional_properties {
                    Some(AdditionalProperties::Schema(value)) if !value.is_unconstrained() => {
                        Ok(SchemaNode::Map(Some(value.as_ref())))
                    }
                    _ => Ok(SchemaNode::Map(None)),
                }
            }
            Some("integer") => Ok(SchemaNode::Integer),
            Some("boolean") => Ok(SchemaNode::Boolean),
            Some("number") => Ok(SchemaNode::Number {
                float: matches!(schema.format.as_deref(), Some("double") | Some("float")),
            }),
            Some("string") => Self::string_format(schema.format.as_deref()).map(SchemaNode::String),
            Some("array") => Ok(SchemaNode::Array(
                schema
                    .items
                    .as_deref()
                    .filter(|items| !items.is_unconstrained()),
            )),
            Some(other) => Err(GeneratorError::UnsupportedSchemaShape {
                context: context.to_string(),
                detail: format!("unknown type '{}'", other),
            }),
            None => Self::classify_untyped(schema, context),
        }
    }

    fn classify_untyped(schema: &'a RawSchema, context: &str) -> Result<Self> {
        if let Some(path) = &schema.ref_path {
            return Ok(SchemaNode::Ref(path));
        }
        if let [single] = schema.all_of.as_slice() {
            return Self::classify(single, context);
        }
        if schema.int_or_string == Some(true) {
            return Ok(SchemaNode::IntOrString);
        }
        if schema.preserve_unknown_fields == Some(true) {
            return Ok(SchemaNode::PreserveUnknown);
        }
        if !schema.properties.is_empty() {
            return Ok(SchemaNode::Object(&schema.properties));
        }

        Err(GeneratorError::UnsupportedSchemaShape {
            context: context.to_string(),
            detail: "schema has no type, $ref, or recognized marker".to_string(),
        })
    }

    fn string_format(format: Option<&str>) -> Result<StringFormat> {
        match format.unwrap_or("") {
            "byte" => Ok(StringFormat::Byte),
            "date-time" => Ok(StringFormat::DateTime),
            "int-or-string" => Ok(StringFormat::IntOrString),
            "idn-hostname" => Ok(StringFormat::IdnHostname),
            other if PLAIN_STRING_FORMATS.contains(&other) => Ok(StringFormat::Plain),
            other => Err(GeneratorError::UnsupportedFormat {
                type_: "string".to_string(),
                format: other.to_string(),
            }),
        }
    }
}
