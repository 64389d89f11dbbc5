//! Declarative validator
//!
//! Evaluates the rules attached to descriptors against a decoded message and
//! collects every violation instead of stopping at the first one. Apart from
//! `required` and list/map size rules, rules only apply to populated fields.
//! A rule the registry did not recognise is always reported.

use crate::descriptor::{FieldDescriptor, FieldType, MessageDescriptor};
use crate::error::ValidationError;
use crate::message::{DynamicMessage, is_populated, join_path};
use crate::registry::SchemaRegistry;
use crate::rule::{MessageRule, Rule};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// One broken constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Dotted path of the offending field, e.g. `spec.lifecycleRules[0].id`
    pub field_path: String,
    /// Identifier of the rule, e.g. `string.pattern`
    pub rule_id: String,
    pub message: String,
}

impl Violation {
    pub fn new(
        field_path: impl Into<String>,
        rule_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field_path: field_path.into(),
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.field_path, self.message, self.rule_id)
    }
}

/// Validate a message and return every violation (empty when valid)
pub fn validate(message: &DynamicMessage) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut validator = Validator {
        registry: message.registry(),
        violations: &mut violations,
    };
    validator.walk_message(message.descriptor(), message.fields(), "");
    violations
}

/// Validate a message, failing with all violations at once
pub fn ensure_valid(message: &DynamicMessage) -> Result<(), ValidationError> {
    let violations = validate(message);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}

struct Validator<'a> {
    registry: &'a SchemaRegistry,
    violations: &'a mut Vec<Violation>,
}

impl Validator<'_> {
    fn walk_message(
        &mut self,
        descriptor: &MessageDescriptor,
        fields: &Map<String, Value>,
        prefix: &str,
    ) {
        for field in &descriptor.fields {
            let path = join_path(prefix, &field.name);
            self.field(field, fields.get(&field.name), &path);
        }
        for rule in &descriptor.rules {
            self.message_rule(descriptor, fields, rule, prefix);
        }
    }

    fn field(&mut self, field: &FieldDescriptor, value: Option<&Value>, path: &str) {
        for rule in &field.rules {
            if let Rule::Unsupported(name) = rule {
                self.push(path, "unsupported", format!("rule `{name}` is not supported"));
            }
        }

        let Some(value) = value.filter(|v| is_populated(self.registry, field, v)) else {
            if field.is_required() {
                self.push(path, "required", "value is required");
            } else {
                self.empty_collection(field, path);
            }
            return;
        };

        if field.repeated {
            self.list(field, value, path);
        } else if field.field_type == FieldType::StringMap {
            self.map(field, value, path);
        } else {
            self.single(field, value, path);
        }
    }

    /// Size rules still apply to an absent list or map
    fn empty_collection(&mut self, field: &FieldDescriptor, path: &str) {
        for rule in &field.rules {
            match rule {
                Rule::MinItems(min) if field.repeated && *min > 0 => {
                    self.push(
                        path,
                        "repeated.min_items",
                        format!("must contain at least {min} item(s)"),
                    );
                }
                Rule::MinPairs(min) if field.field_type == FieldType::StringMap && *min > 0 => {
                    self.push(path, "map.min_pairs", format!("must contain at least {min} entries"));
                }
                _ => {}
            }
        }
    }

    fn list(&mut self, field: &FieldDescriptor, value: &Value, path: &str) {
        let Some(items) = value.as_array() else {
            return;
        };
        for rule in &field.rules {
            match rule {
                Rule::MinItems(min) if items.len() < *min => {
                    self.push(
                        path,
                        "repeated.min_items",
                        format!("must contain at least {min} item(s)"),
                    );
                }
                Rule::MaxItems(max) if items.len() > *max => {
                    self.push(
                        path,
                        "repeated.max_items",
                        format!("must contain at most {max} item(s)"),
                    );
                }
                Rule::Unique => {
                    let mut seen = HashSet::new();
                    if !items.iter().all(|item| seen.insert(item.to_string())) {
                        self.push(path, "repeated.unique", "items must be unique");
                    }
                }
                _ => {}
            }
        }
        for (i, item) in items.iter().enumerate() {
            self.single(field, item, &format!("{path}[{i}]"));
        }
    }

    fn map(&mut self, field: &FieldDescriptor, value: &Value, path: &str) {
        let Some(entries) = value.as_object() else {
            return;
        };
        for rule in &field.rules {
            if let Rule::MinPairs(min) = rule {
                if entries.len() < *min {
                    self.push(path, "map.min_pairs", format!("must contain at least {min} entries"));
                }
            }
        }
        for (key, entry) in entries {
            self.scalar_rules(field, entry, &format!("{path}[{key}]"));
        }
    }

    fn single(&mut self, field: &FieldDescriptor, value: &Value, path: &str) {
        if field.field_type == FieldType::Message {
            let nested = field
                .type_ref
                .as_deref()
                .and_then(|r| self.registry.message(r));
            if let (Some(nested), Some(fields)) = (nested, value.as_object()) {
                self.walk_message(&nested, fields, path);
            }
            return;
        }
        self.scalar_rules(field, value, path);
    }

    fn scalar_rules(&mut self, field: &FieldDescriptor, value: &Value, path: &str) {
        for rule in &field.rules {
            if rule.is_collection_rule() {
                continue;
            }
            if let Some((rule_id, message)) = self.check(field, rule, value) {
                self.push(path, rule_id, message);
            }
        }
    }

    fn check(&self, field: &FieldDescriptor, rule: &Rule, value: &Value) -> Option<(String, String)> {
        let text = value.as_str();
        let number = value.as_f64();
        let numeric = |op: &str| format!("{}.{op}", numeric_prefix(field.field_type));

        match rule {
            Rule::Const(expected) => text
                .filter(|t| *t != expected.as_str())
                .map(|_| ("string.const".into(), format!("must equal \"{expected}\""))),
            Rule::Pattern(regex) => text.filter(|t| !regex.is_match(t)).map(|_| {
                (
                    "string.pattern".into(),
                    format!("does not match pattern `{}`", regex.as_str()),
                )
            }),
            Rule::MinLen(min) => text.filter(|t| t.chars().count() < *min).map(|_| {
                (
                    "string.min_len".into(),
                    format!("must be at least {min} characters"),
                )
            }),
            Rule::MaxLen(max) => text.filter(|t| t.chars().count() > *max).map(|_| {
                (
                    "string.max_len".into(),
                    format!("must be at most {max} characters"),
                )
            }),
            Rule::Prefix(prefix) => text.filter(|t| !t.starts_with(prefix.as_str())).map(|_| {
                (
                    "string.prefix".into(),
                    format!("must start with \"{prefix}\""),
                )
            }),
            Rule::In(allowed) => text.filter(|t| !allowed.iter().any(|a| a.as_str() == *t)).map(|_| {
                (
                    "string.in".into(),
                    format!("must be one of [{}]", allowed.join(", ")),
                )
            }),
            Rule::Gte(bound) => number
                .filter(|n| n < bound)
                .map(|_| (numeric("gte"), format!("must be greater than or equal to {bound}"))),
            Rule::Lte(bound) => number
                .filter(|n| n > bound)
                .map(|_| (numeric("lte"), format!("must be less than or equal to {bound}"))),
            Rule::Gt(bound) => number
                .filter(|n| n <= bound)
                .map(|_| (numeric("gt"), format!("must be greater than {bound}"))),
            Rule::Lt(bound) => number
                .filter(|n| n >= bound)
                .map(|_| (numeric("lt"), format!("must be less than {bound}"))),
            Rule::DefinedOnly => {
                let defined = field
                    .type_ref
                    .as_deref()
                    .and_then(|r| self.registry.enum_type(r))
                    .zip(text)
                    .is_some_and(|(e, t)| e.contains(t));
                (!defined).then(|| {
                    (
                        "enum.defined_only".into(),
                        format!("value {value} is not a defined enum value"),
                    )
                })
            }
            Rule::Required
            | Rule::MinItems(_)
            | Rule::MaxItems(_)
            | Rule::Unique
            | Rule::MinPairs(_)
            | Rule::Unsupported(_) => None,
        }
    }

    fn message_rule(
        &mut self,
        descriptor: &MessageDescriptor,
        fields: &Map<String, Value>,
        rule: &MessageRule,
        prefix: &str,
    ) {
        let set = |name: &str| {
            descriptor
                .field(name)
                .zip(fields.get(name))
                .is_some_and(|(f, v)| is_populated(self.registry, f, v))
        };
        let message_path = if prefix.is_empty() {
            descriptor.full_name.clone()
        } else {
            prefix.to_string()
        };

        let mut found = Vec::new();
        match rule {
            MessageRule::Requires { field, then } => {
                if set(field.as_str()) {
                    for target in then.iter().filter(|t| !set(t.as_str())) {
                        found.push((
                            join_path(prefix, target),
                            format!("value is required when `{field}` is set"),
                        ));
                    }
                }
            }
            MessageRule::RequiresWhen {
                field,
                equals,
                then,
            } => {
                if fields.get(field.as_str()) == Some(equals) {
                    for target in then.iter().filter(|t| !set(t.as_str())) {
                        found.push((
                            join_path(prefix, target),
                            format!("value is required when `{field}` is {equals}"),
                        ));
                    }
                }
            }
            MessageRule::MutuallyExclusive(names) => {
                if names.iter().filter(|n| set(n.as_str())).count() > 1 {
                    found.push((
                        message_path,
                        format!("at most one of [{}] may be set", names.join(", ")),
                    ));
                }
            }
            MessageRule::OneOfRequired(names) => {
                if !names.iter().any(|n| set(n.as_str())) {
                    found.push((
                        message_path,
                        format!("one of [{}] must be set", names.join(", ")),
                    ));
                }
            }
            MessageRule::Unsupported(name) => {
                found.push((message_path, format!("rule `{name}` is not supported")));
            }
        }

        for (path, message) in found {
            self.push(&path, rule.id(), message);
        }
    }

    fn push(&mut self, path: &str, rule_id: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation::new(path, rule_id, message));
    }
}

fn numeric_prefix(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Int => "int",
        FieldType::Uint => "uint",
        _ => "double",
    }
}
