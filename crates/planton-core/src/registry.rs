//! Schema registry (descriptor pool)
//!
//! Built once from the schema documents embedded in the crate. Besides the
//! messages declared in the documents, the registry synthesises for every
//! kind the top-level resource message `<Kind>` and the stack input message
//! `<Kind>StackInput`, so that manifests and stack inputs are described by
//! descriptors like everything else.

use crate::descriptor::{EnumDescriptor, FieldDescriptor, FieldType, MessageDescriptor, SchemaDocument};
use crate::error::SchemaError;
use crate::kind::{DeploymentComponent, Provider, normalize_kind};
use crate::rule::{MessageRule, Rule};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Shared metadata message every resource carries
pub const METADATA_MESSAGE: &str = "CloudResourceMetadata";
/// Shared status message every resource carries
pub const STATUS_MESSAGE: &str = "CloudResourceStatus";

const BUILTIN_SCHEMAS: &[(&str, &str)] = &[
    ("shared.yaml", include_str!("../schemas/shared.yaml")),
    ("provider.yaml", include_str!("../schemas/provider.yaml")),
    ("aws/awss3bucket.yaml", include_str!("../schemas/aws/awss3bucket.yaml")),
    ("aws/awsecrrepo.yaml", include_str!("../schemas/aws/awsecrrepo.yaml")),
    ("aws/awsvpc.yaml", include_str!("../schemas/aws/awsvpc.yaml")),
    ("azure/azurekeyvault.yaml", include_str!("../schemas/azure/azurekeyvault.yaml")),
    ("civo/civodatabase.yaml", include_str!("../schemas/civo/civodatabase.yaml")),
    (
        "cloudflare/cloudflarer2bucket.yaml",
        include_str!("../schemas/cloudflare/cloudflarer2bucket.yaml"),
    ),
    (
        "digitalocean/digitaloceanvolume.yaml",
        include_str!("../schemas/digitalocean/digitaloceanvolume.yaml"),
    ),
    ("gcp/gcpdnszone.yaml", include_str!("../schemas/gcp/gcpdnszone.yaml")),
    ("gcp/gcpgcsbucket.yaml", include_str!("../schemas/gcp/gcpgcsbucket.yaml")),
    (
        "kubernetes/rediskubernetes.yaml",
        include_str!("../schemas/kubernetes/rediskubernetes.yaml"),
    ),
];

static BUILTIN: OnceLock<SchemaRegistry> = OnceLock::new();

/// Immutable pool of message/enum descriptors and the component catalog
///
/// Cloning is cheap; all clones share the same descriptors.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    messages: HashMap<String, Arc<MessageDescriptor>>,
    enums: HashMap<String, Arc<EnumDescriptor>>,
    components: BTreeMap<String, DeploymentComponent>,
}

impl SchemaRegistry {
    /// The registry of all deployment components shipped with this crate
    pub fn builtin() -> Result<&'static SchemaRegistry, SchemaError> {
        if let Some(registry) = BUILTIN.get() {
            return Ok(registry);
        }
        let registry = Self::from_documents(BUILTIN_SCHEMAS)?;
        Ok(BUILTIN.get_or_init(|| registry))
    }

    /// Build a registry from `(document name, YAML)` pairs
    pub fn from_documents(documents: &[(&str, &str)]) -> Result<Self, SchemaError> {
        let mut inner = RegistryInner::default();
        let mut kinds = Vec::new();

        for (name, source) in documents {
            let doc: SchemaDocument =
                serde_yaml::from_str(source).map_err(|source| SchemaError::Parse {
                    document: name.to_string(),
                    source,
                })?;
            debug!(
                document = name,
                messages = doc.messages.len(),
                enums = doc.enums.len(),
                "Loaded schema document"
            );

            for (full_name, mut message) in doc.messages {
                message.full_name = full_name.clone();
                if inner
                    .messages
                    .insert(full_name.clone(), Arc::new(message))
                    .is_some()
                {
                    return Err(SchemaError::DuplicateMessage(full_name));
                }
            }
            for (full_name, values) in doc.enums {
                let descriptor = EnumDescriptor {
                    full_name: full_name.clone(),
                    values,
                };
                if inner
                    .enums
                    .insert(full_name.clone(), Arc::new(descriptor))
                    .is_some()
                {
                    return Err(SchemaError::DuplicateEnum(full_name));
                }
            }

            if let Some(kind) = doc.kind {
                let provider_name = doc.provider.unwrap_or_default();
                let provider: Provider =
                    provider_name
                        .parse()
                        .map_err(|_| SchemaError::UnknownProvider {
                            kind: kind.clone(),
                            provider: provider_name.clone(),
                        })?;
                kinds.push(DeploymentComponent {
                    spec_message: doc.spec.unwrap_or_else(|| format!("{kind}Spec")),
                    api_version: doc
                        .api_version
                        .unwrap_or_else(|| format!("{provider}.project-planton.org/v1")),
                    id_prefix: doc.id_prefix.unwrap_or_default(),
                    iac: doc.iac,
                    outputs: doc.outputs,
                    provider,
                    kind,
                });
            }
        }

        for component in kinds {
            inner.add_component(component)?;
        }
        inner.resolve_references()?;

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn message(&self, full_name: &str) -> Option<Arc<MessageDescriptor>> {
        self.inner.messages.get(full_name).cloned()
    }

    pub fn enum_type(&self, full_name: &str) -> Option<&EnumDescriptor> {
        self.inner.enums.get(full_name).map(Arc::as_ref)
    }

    /// Look up a component by its exact kind name
    pub fn component(&self, kind: &str) -> Option<&DeploymentComponent> {
        self.inner.components.get(kind)
    }

    /// Look up a component by a loosely written kind name
    /// (`aws-s3-bucket`, `awss3bucket`, `AwsS3Bucket`)
    pub fn find_component(&self, kind: &str) -> Option<&DeploymentComponent> {
        let wanted = normalize_kind(kind);
        if wanted.is_empty() {
            return None;
        }
        self.inner
            .components
            .values()
            .find(|c| normalize_kind(&c.kind) == wanted)
    }

    /// All components ordered by kind name
    pub fn components(&self) -> impl Iterator<Item = &DeploymentComponent> {
        self.inner.components.values()
    }
}

impl RegistryInner {
    fn add_component(&mut self, component: DeploymentComponent) -> Result<(), SchemaError> {
        let kind = component.kind.clone();
        if self.components.contains_key(&kind) {
            return Err(SchemaError::DuplicateKind(kind));
        }
        if !self.messages.contains_key(&component.spec_message) {
            return Err(SchemaError::UnknownSpecMessage {
                kind,
                message: component.spec_message.clone(),
            });
        }

        let resource = MessageDescriptor::new(
            kind.clone(),
            vec![
                FieldDescriptor::new("apiVersion", FieldType::String)
                    .with_rule(Rule::Required)
                    .with_rule(Rule::Const(component.api_version.clone())),
                FieldDescriptor::new("kind", FieldType::String)
                    .with_rule(Rule::Required)
                    .with_rule(Rule::Const(kind.clone())),
                FieldDescriptor::new("metadata", FieldType::Message)
                    .with_ref(METADATA_MESSAGE)
                    .with_rule(Rule::Required),
                FieldDescriptor::new("spec", FieldType::Message)
                    .with_ref(component.spec_message.clone())
                    .with_rule(Rule::Required),
                FieldDescriptor::new("status", FieldType::Message).with_ref(STATUS_MESSAGE),
            ],
        );
        let stack_input = MessageDescriptor::new(
            component.stack_input_message(),
            vec![
                FieldDescriptor::new("target", FieldType::Message)
                    .with_ref(kind.clone())
                    .with_rule(Rule::Required),
                FieldDescriptor::new("providerConfig", FieldType::Message)
                    .with_ref(component.provider.config_message()),
            ],
        );

        for message in [resource, stack_input] {
            let name = message.full_name.clone();
            if self.messages.insert(name.clone(), Arc::new(message)).is_some() {
                return Err(SchemaError::DuplicateMessage(name));
            }
        }
        self.components.insert(kind, component);
        Ok(())
    }

    fn resolve_references(&self) -> Result<(), SchemaError> {
        for message in self.messages.values() {
            for rule in &message.rules {
                if let Some(unknown) = rule_fields(rule).find(|f| message.field(f).is_none()) {
                    return Err(SchemaError::UnknownRuleField {
                        message: message.full_name.clone(),
                        field: unknown.to_string(),
                    });
                }
            }
            for field in &message.fields {
                if let Some(rule) = field
                    .rules
                    .iter()
                    .find(|r| !r.applies_to(field.field_type, field.repeated))
                {
                    return Err(SchemaError::RuleTypeMismatch {
                        message: message.full_name.clone(),
                        field: field.name.clone(),
                        rule: rule.name().to_string(),
                        field_type: field.field_type.to_string(),
                    });
                }
                if !matches!(field.field_type, FieldType::Message | FieldType::Enum) {
                    continue;
                }
                let reference =
                    field
                        .type_ref
                        .as_deref()
                        .ok_or_else(|| SchemaError::MissingReference {
                            message: message.full_name.clone(),
                            field: field.name.clone(),
                            field_type: field.field_type.to_string(),
                        })?;
                let known = match field.field_type {
                    FieldType::Message => self.messages.contains_key(reference),
                    _ => self.enums.contains_key(reference),
                };
                if !known {
                    return Err(SchemaError::UnresolvedReference {
                        message: message.full_name.clone(),
                        field: field.name.clone(),
                        reference: reference.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn rule_fields(rule: &MessageRule) -> Box<dyn Iterator<Item = &str> + '_> {
    match rule {
        MessageRule::Requires { field, then } | MessageRule::RequiresWhen { field, then, .. } => {
            Box::new(std::iter::once(field.as_str()).chain(then.iter().map(String::as_str)))
        }
        MessageRule::MutuallyExclusive(names) | MessageRule::OneOfRequired(names) => {
            Box::new(names.iter().map(String::as_str))
        }
        MessageRule::Unsupported(_) => Box::new(std::iter::empty()),
    }
}
