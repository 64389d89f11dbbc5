//! Message, field and enum descriptors
//!
//! Descriptors are the only source of truth the validator, the field
//! extractor and the decoder consult. They are deserialized from the schema
//! documents embedded in this crate and never change after the registry is
//! built.

use crate::rule::{MessageRule, Rule, deserialize_field_rules, deserialize_message_rules};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar or composite type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Int,
    Uint,
    Double,
    Bool,
    Enum,
    Message,
    StringMap,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Uint => "uint",
            FieldType::Double => "double",
            FieldType::Bool => "bool",
            FieldType::Enum => "enum",
            FieldType::Message => "message",
            FieldType::StringMap => "string_map",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Uint | FieldType::Double)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field of a message
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDescriptor {
    /// JSON (camelCase) name used in manifests
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Full name of the referenced message or enum
    #[serde(default, rename = "ref")]
    pub type_ref: Option<String>,

    #[serde(default)]
    pub repeated: bool,

    #[serde(default, deserialize_with = "deserialize_field_rules")]
    pub rules: Vec<Rule>,

    /// Value filled in when the field is unset
    #[serde(default)]
    pub default: Option<serde_json::Value>,

    #[serde(default)]
    pub description: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            type_ref: None,
            repeated: false,
            rules: Vec::new(),
            default: None,
            description: None,
        }
    }

    pub fn with_ref(mut self, type_ref: impl Into<String>) -> Self {
        self.type_ref = Some(type_ref.into());
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    /// A singular message field, the only kind the extractor descends into
    pub fn is_singular_message(&self) -> bool {
        self.field_type == FieldType::Message && !self.repeated
    }

    pub fn is_required(&self) -> bool {
        self.rules.iter().any(|r| matches!(r, Rule::Required))
    }

    /// Type name for diagnostics, e.g. `repeated AwsS3BucketLifecycleRule`
    pub fn type_name(&self) -> String {
        let base = match (&self.field_type, &self.type_ref) {
            (FieldType::Message | FieldType::Enum, Some(r)) => r.clone(),
            (t, _) => t.to_string(),
        };
        if self.repeated {
            format!("repeated {base}")
        } else {
            base
        }
    }
}

/// Message type: an ordered list of fields plus cross-field rules
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDescriptor {
    #[serde(skip)]
    pub full_name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,

    #[serde(default, deserialize_with = "deserialize_message_rules")]
    pub rules: Vec<MessageRule>,
}

impl MessageDescriptor {
    pub fn new(full_name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            full_name: full_name.into(),
            description: None,
            fields,
            rules: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Enum type. The first value is the zero ("unspecified") value.
#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    pub full_name: String,
    pub values: Vec<String>,
}

impl EnumDescriptor {
    pub fn zero_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    pub fn by_number(&self, number: u64) -> Option<&str> {
        self.values.get(number as usize).map(String::as_str)
    }
}

/// IaC engines a deployment component may ship a module for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IacEngine {
    Pulumi,
    Tofu,
}

impl fmt::Display for IacEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IacEngine::Pulumi => f.write_str("pulumi"),
            IacEngine::Tofu => f.write_str("tofu"),
        }
    }
}

/// One schema document as embedded in the crate
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SchemaDocument {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub id_prefix: Option<String>,
    #[serde(default)]
    pub spec: Option<String>,
    #[serde(default)]
    pub iac: Vec<IacEngine>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub messages: BTreeMap<String, MessageDescriptor>,
    #[serde(default)]
    pub enums: BTreeMap<String, Vec<String>>,
}
