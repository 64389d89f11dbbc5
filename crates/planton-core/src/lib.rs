//! Project Planton core
//!
//! Deployment component schemas and everything that works on manifests
//! without talking to a cloud: loading, defaults, overrides, validation and
//! reflective field access.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 schemas/**.yaml                  │
//! │     (kinds, spec messages, enums, rules)         │
//! └────────────────────────┬─────────────────────────┘
//!                          │ include_str!
//! ┌────────────────────────▼─────────────────────────┐
//! │                  SchemaRegistry                  │
//! │  MessageDescriptor / EnumDescriptor / catalog    │
//! └───────┬──────────────────┬──────────────────┬────┘
//!         │                  │                  │
//! ┌───────▼──────┐   ┌───────▼──────┐   ┌───────▼──────┐
//! │    loader    │   │   validate   │   │   reflect    │
//! │ YAML → Dyn-  │   │ all rule     │   │ target.spec  │
//! │ amicMessage  │   │ violations   │   │ extraction   │
//! └──────────────┘   └──────────────┘   └──────────────┘
//! ```

pub mod defaults;
pub mod descriptor;
pub mod error;
pub mod kind;
pub mod loader;
pub mod message;
pub mod naming;
pub mod overrides;
pub mod reflect;
pub mod registry;
pub mod rule;
pub mod validate;

// Re-exports
pub use defaults::apply_defaults;
pub use descriptor::{EnumDescriptor, FieldDescriptor, FieldType, IacEngine, MessageDescriptor};
pub use error::{
    DecodeError, ExtractError, ManifestError, OverrideError, Result, SchemaError, ValidationError,
};
pub use kind::{DeploymentComponent, Provider, normalize_kind};
pub use loader::{
    Manifest, decode_manifest, load_manifest, load_manifest_from_str, load_manifests_from_str,
    split_documents,
};
pub use message::DynamicMessage;
pub use overrides::{ValueOverride, apply_overrides};
pub use reflect::{
    extract_api_resource_metadata, extract_api_resource_spec, extract_message, extract_value,
};
pub use registry::SchemaRegistry;
pub use rule::{MessageRule, Rule};
pub use validate::{Violation, ensure_valid, validate};
