//! Error types for schema loading, manifest decoding and validation

use crate::validate::Violation;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building the schema registry
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to parse schema document {document}: {source}")]
    Parse {
        document: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Message {0} is declared more than once")]
    DuplicateMessage(String),

    #[error("Enum {0} is declared more than once")]
    DuplicateEnum(String),

    #[error("Kind {0} is declared more than once")]
    DuplicateKind(String),

    #[error("Field {message}.{field} has type {field_type} but no `ref`")]
    MissingReference {
        message: String,
        field: String,
        field_type: String,
    },

    #[error("Field {message}.{field} references unknown type {reference}")]
    UnresolvedReference {
        message: String,
        field: String,
        reference: String,
    },

    #[error("A rule of {message} refers to unknown field {field}")]
    UnknownRuleField { message: String, field: String },

    #[error("Rule `{rule}` cannot apply to field {message}.{field} of type {field_type}")]
    RuleTypeMismatch {
        message: String,
        field: String,
        rule: String,
        field_type: String,
    },

    #[error("Kind {kind} declares spec message {message} which does not exist")]
    UnknownSpecMessage { kind: String, message: String },

    #[error("Unknown provider {provider} for kind {kind}")]
    UnknownProvider { kind: String, provider: String },
}

/// Errors raised while decoding YAML/JSON into a dynamic message
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unknown message type: {0}")]
    UnknownMessage(String),

    #[error("{path}: expected an object for {message}, found {found}")]
    NotAnObject {
        path: String,
        message: String,
        found: &'static str,
    },

    #[error("{path}: unknown field \"{field}\" in {message}")]
    UnknownField {
        path: String,
        field: String,
        message: String,
    },

    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: String,
    },

    #[error("{path}: \"{value}\" is not a value of enum {enum_name}")]
    UnknownEnumValue {
        path: String,
        value: String,
        enum_name: String,
    },
}

/// Errors raised while loading a manifest from disk
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode manifest: {0}")]
    Decode(#[from] DecodeError),

    #[error("Manifest is empty")]
    Empty,

    #[error("Expected a single manifest document but found {0}")]
    MultipleDocuments(usize),

    #[error("Manifest has no `kind` field")]
    MissingKind,

    #[error("Unsupported kind \"{kind}\"\n{hint}")]
    UnsupportedKind { kind: String, hint: String },

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Every constraint a manifest violates
#[derive(Error, Debug, Clone)]
#[error("{}", render_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

fn render_violations(violations: &[Violation]) -> String {
    let mut out = format!("{} validation error(s):", violations.len());
    for v in violations {
        out.push_str("\n  - ");
        out.push_str(&v.to_string());
    }
    out
}

/// Errors raised by the reflective field extractor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Field path must not be empty")]
    EmptyPath,

    #[error("{message} has no field \"{field}\"")]
    MissingField { message: String, field: String },

    #[error("Field \"{path}\" is not set")]
    NilField { path: String },

    #[error("Field \"{path}\" is not a message")]
    NotAMessage { path: String },
}

/// Errors raised while applying `--set key=value` overrides
#[derive(Error, Debug)]
pub enum OverrideError {
    #[error("Invalid override \"{0}\": expected key=value")]
    InvalidSyntax(String),

    #[error("Unknown field \"{path}\"")]
    UnknownField { path: String },

    #[error("Cannot set \"{path}\": {reason}")]
    Unsupported { path: String, reason: String },

    #[error("Invalid value \"{value}\" for \"{path}\": expected {expected}")]
    InvalidValue {
        path: String,
        value: String,
        expected: String,
    },
}

pub type Result<T, E = ManifestError> = std::result::Result<T, E>;
