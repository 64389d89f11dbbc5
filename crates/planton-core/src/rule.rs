//! Declarative validation rules attached to schema descriptors
//!
//! Rules are written in the schema documents as YAML mappings:
//!
//! ```yaml
//! fields:
//!   - name: awsRegion
//!     type: string
//!     rules: { required: true, pattern: "^[a-z]{2}-[a-z]+-\\d$" }
//! rules:
//!   - requires_when: { field: encryptionType, equals: SSE_KMS, then: [kmsKeyId] }
//! ```
//!
//! A rule name the registry does not understand is kept as
//! [`Rule::Unsupported`] / [`MessageRule::Unsupported`] so that validation
//! reports it instead of silently accepting the field.

use crate::descriptor::FieldType;
use regex::Regex;
use serde::de::{Deserializer, Error as _};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

/// Field-level rule
#[derive(Debug, Clone)]
pub enum Rule {
    Required,
    Const(String),
    Pattern(Regex),
    MinLen(usize),
    MaxLen(usize),
    Prefix(String),
    In(Vec<String>),
    Gte(f64),
    Lte(f64),
    Gt(f64),
    Lt(f64),
    DefinedOnly,
    MinItems(usize),
    MaxItems(usize),
    Unique,
    MinPairs(usize),
    Unsupported(String),
}

impl Rule {
    /// Parse one `name: value` entry. Returns `None` for rules that are
    /// switched off (`required: false`).
    pub fn parse(name: &str, value: &Value) -> Result<Option<Self>, String> {
        let rule = match name {
            "required" => return Ok(flag(name, value)?.then_some(Rule::Required)),
            "defined_only" => return Ok(flag(name, value)?.then_some(Rule::DefinedOnly)),
            "unique" => return Ok(flag(name, value)?.then_some(Rule::Unique)),
            "const" => Rule::Const(string(name, value)?),
            "pattern" => {
                let pattern = string(name, value)?;
                let regex = Regex::new(&pattern)
                    .map_err(|e| format!("invalid pattern {pattern:?}: {e}"))?;
                Rule::Pattern(regex)
            }
            "min_len" => Rule::MinLen(count(name, value)?),
            "max_len" => Rule::MaxLen(count(name, value)?),
            "prefix" => Rule::Prefix(string(name, value)?),
            "in" => Rule::In(strings(name, value)?),
            "gte" => Rule::Gte(number(name, value)?),
            "lte" => Rule::Lte(number(name, value)?),
            "gt" => Rule::Gt(number(name, value)?),
            "lt" => Rule::Lt(number(name, value)?),
            "min_items" => Rule::MinItems(count(name, value)?),
            "max_items" => Rule::MaxItems(count(name, value)?),
            "min_pairs" => Rule::MinPairs(count(name, value)?),
            other => Rule::Unsupported(other.to_string()),
        };
        Ok(Some(rule))
    }

    /// Rule name as written in schema documents
    pub fn name(&self) -> &str {
        match self {
            Rule::Required => "required",
            Rule::Const(_) => "const",
            Rule::Pattern(_) => "pattern",
            Rule::MinLen(_) => "min_len",
            Rule::MaxLen(_) => "max_len",
            Rule::Prefix(_) => "prefix",
            Rule::In(_) => "in",
            Rule::Gte(_) => "gte",
            Rule::Lte(_) => "lte",
            Rule::Gt(_) => "gt",
            Rule::Lt(_) => "lt",
            Rule::DefinedOnly => "defined_only",
            Rule::MinItems(_) => "min_items",
            Rule::MaxItems(_) => "max_items",
            Rule::Unique => "unique",
            Rule::MinPairs(_) => "min_pairs",
            Rule::Unsupported(name) => name.as_str(),
        }
    }

    /// Whether the rule can constrain a field of this type. String rules
    /// also apply to the values of a string map.
    pub fn applies_to(&self, field_type: FieldType, repeated: bool) -> bool {
        match self {
            Rule::Required | Rule::Unsupported(_) => true,
            Rule::Const(_)
            | Rule::Pattern(_)
            | Rule::MinLen(_)
            | Rule::MaxLen(_)
            | Rule::Prefix(_)
            | Rule::In(_) => matches!(field_type, FieldType::String | FieldType::StringMap),
            Rule::Gte(_) | Rule::Lte(_) | Rule::Gt(_) | Rule::Lt(_) => field_type.is_numeric(),
            Rule::DefinedOnly => field_type == FieldType::Enum,
            Rule::MinItems(_) | Rule::MaxItems(_) | Rule::Unique => repeated,
            Rule::MinPairs(_) => field_type == FieldType::StringMap,
        }
    }

    /// Whether the rule constrains the list/map as a whole rather than
    /// each element.
    pub fn is_collection_rule(&self) -> bool {
        matches!(
            self,
            Rule::Required | Rule::MinItems(_) | Rule::MaxItems(_) | Rule::Unique | Rule::MinPairs(_)
        )
    }
}

/// Message-level rule relating several fields of the same message
#[derive(Debug, Clone)]
pub enum MessageRule {
    /// If `field` is set, every field in `then` must be set
    Requires { field: String, then: Vec<String> },
    /// If `field` equals `equals`, every field in `then` must be set
    RequiresWhen {
        field: String,
        equals: serde_json::Value,
        then: Vec<String>,
    },
    /// At most one of the fields may be set
    MutuallyExclusive(Vec<String>),
    /// At least one of the fields must be set
    OneOfRequired(Vec<String>),
    Unsupported(String),
}

impl MessageRule {
    pub fn id(&self) -> &'static str {
        match self {
            MessageRule::Requires { .. } => "message.requires",
            MessageRule::RequiresWhen { .. } => "message.requires_when",
            MessageRule::MutuallyExclusive(_) => "message.mutually_exclusive",
            MessageRule::OneOfRequired(_) => "message.one_of_required",
            MessageRule::Unsupported(_) => "unsupported",
        }
    }

    fn parse(name: &str, value: &Value) -> Result<Self, String> {
        let rule = match name {
            "requires" => {
                let map = mapping(name, value)?;
                MessageRule::Requires {
                    field: string("requires.field", entry(map, "field")?)?,
                    then: strings("requires.then", entry(map, "then")?)?,
                }
            }
            "requires_when" => {
                let map = mapping(name, value)?;
                let equals = serde_json::to_value(entry(map, "equals")?)
                    .map_err(|e| format!("requires_when.equals: {e}"))?;
                MessageRule::RequiresWhen {
                    field: string("requires_when.field", entry(map, "field")?)?,
                    equals,
                    then: strings("requires_when.then", entry(map, "then")?)?,
                }
            }
            "mutually_exclusive" => MessageRule::MutuallyExclusive(strings(name, value)?),
            "one_of_required" => MessageRule::OneOfRequired(strings(name, value)?),
            other => MessageRule::Unsupported(other.to_string()),
        };
        Ok(rule)
    }
}

pub(crate) fn deserialize_field_rules<'de, D>(deserializer: D) -> Result<Vec<Rule>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = Mapping::deserialize(deserializer)?;
    let mut rules = Vec::with_capacity(map.len());
    for (key, value) in &map {
        let name = key
            .as_str()
            .ok_or_else(|| D::Error::custom("rule names must be strings"))?;
        if let Some(rule) = Rule::parse(name, value).map_err(D::Error::custom)? {
            rules.push(rule);
        }
    }
    Ok(rules)
}

pub(crate) fn deserialize_message_rules<'de, D>(
    deserializer: D,
) -> Result<Vec<MessageRule>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<Mapping>::deserialize(deserializer)?;
    let mut rules = Vec::with_capacity(entries.len());
    for entry in &entries {
        if entry.len() != 1 {
            return Err(D::Error::custom(
                "each message rule must be a single `name: value` entry",
            ));
        }
        for (key, value) in entry {
            let name = key
                .as_str()
                .ok_or_else(|| D::Error::custom("rule names must be strings"))?;
            rules.push(MessageRule::parse(name, value).map_err(D::Error::custom)?);
        }
    }
    Ok(rules)
}

fn flag(name: &str, value: &Value) -> Result<bool, String> {
    value
        .as_bool()
        .ok_or_else(|| format!("{name}: expected a boolean"))
}

fn string(name: &str, value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(format!("{name}: expected a string")),
    }
}

fn strings(name: &str, value: &Value) -> Result<Vec<String>, String> {
    value
        .as_sequence()
        .ok_or_else(|| format!("{name}: expected a list"))?
        .iter()
        .map(|v| string(name, v))
        .collect()
}

fn count(name: &str, value: &Value) -> Result<usize, String> {
    value
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| format!("{name}: expected a non-negative integer"))
}

fn number(name: &str, value: &Value) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("{name}: expected a number"))
}

fn mapping<'a>(name: &str, value: &'a Value) -> Result<&'a Mapping, String> {
    value
        .as_mapping()
        .ok_or_else(|| format!("{name}: expected a mapping"))
}

fn entry<'a>(map: &'a Mapping, key: &str) -> Result<&'a Value, String> {
    map.get(key).ok_or_else(|| format!("missing `{key}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct FieldRules {
        #[serde(deserialize_with = "deserialize_field_rules")]
        rules: Vec<Rule>,
    }

    #[derive(Deserialize)]
    struct MessageRules {
        #[serde(deserialize_with = "deserialize_message_rules")]
        rules: Vec<MessageRule>,
    }

    #[test]
    fn test_parse_field_rules() {
        let doc: FieldRules = serde_yaml::from_str(
            "rules: { required: true, min_len: 3, pattern: '^[a-z]+$', in: [a, b] }",
        )
        .unwrap();
        assert_eq!(doc.rules.len(), 4);
        assert!(matches!(doc.rules[0], Rule::Required));
        assert!(matches!(doc.rules[1], Rule::MinLen(3)));
        assert!(matches!(&doc.rules[2], Rule::Pattern(r) if r.is_match("abc")));
        assert!(matches!(&doc.rules[3], Rule::In(v) if v == &["a", "b"]));
    }

    #[test]
    fn test_disabled_flag_is_dropped() {
        let doc: FieldRules = serde_yaml::from_str("rules: { required: false }").unwrap();
        assert!(doc.rules.is_empty());
    }

    #[test]
    fn test_unknown_rule_is_kept_as_unsupported() {
        let doc: FieldRules = serde_yaml::from_str("rules: { cel: 'this > 0' }").unwrap();
        assert!(matches!(&doc.rules[0], Rule::Unsupported(name) if name == "cel"));
    }

    #[test]
    fn test_rule_field_types() {
        let doc: FieldRules =
            serde_yaml::from_str("rules: { pattern: '^x$', gte: 1, min_items: 1, defined_only: true }")
                .unwrap();
        assert!(doc.rules[0].applies_to(FieldType::String, false));
        assert!(doc.rules[0].applies_to(FieldType::StringMap, false));
        assert!(!doc.rules[0].applies_to(FieldType::Int, false));
        assert!(doc.rules[1].applies_to(FieldType::Uint, false));
        assert!(!doc.rules[1].applies_to(FieldType::String, false));
        assert!(doc.rules[2].applies_to(FieldType::String, true));
        assert!(!doc.rules[2].applies_to(FieldType::String, false));
        assert!(!doc.rules[3].applies_to(FieldType::String, false));
        assert_eq!(doc.rules[1].name(), "gte");
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let result: Result<FieldRules, _> = serde_yaml::from_str("rules: { pattern: '(' }");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_message_rules() {
        let doc: MessageRules = serde_yaml::from_str(
            r#"
rules:
  - requires: { field: replication, then: [versioningEnabled] }
  - requires_when: { field: encryptionType, equals: SSE_KMS, then: [kmsKeyId] }
  - mutually_exclusive: [a, b]
  - one_of_required: [c, d]
  - xor: [e, f]
"#,
        )
        .unwrap();
        let ids: Vec<_> = doc.rules.iter().map(|r| r.id()).collect();
        assert_eq!(
            ids,
            vec![
                "message.requires",
                "message.requires_when",
                "message.mutually_exclusive",
                "message.one_of_required",
                "unsupported",
            ]
        );
    }

    #[test]
    fn test_message_rule_with_two_keys_is_rejected() {
        let result: Result<MessageRules, _> =
            serde_yaml::from_str("rules:\n  - { mutually_exclusive: [a, b], one_of_required: [a] }");
        assert!(result.is_err());
    }
}
