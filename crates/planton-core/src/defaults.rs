//! Schema default values
//!
//! Fields declaring a `default` are filled in when absent. Values already in
//! the manifest are never touched, and absent nested messages are not
//! created just to hold defaults. Applying defaults twice changes nothing.

use crate::descriptor::{FieldType, MessageDescriptor};
use crate::message::DynamicMessage;
use crate::registry::SchemaRegistry;
use serde_json::{Map, Value};
use tracing::debug;

/// Fill unset fields with their schema defaults; returns how many were set
pub fn apply_defaults(message: &mut DynamicMessage) -> usize {
    let registry = message.registry().clone();
    let descriptor = message.descriptor_arc();
    let applied = apply(&registry, &descriptor, message.fields_mut());
    debug!(message = %descriptor.full_name, applied, "Applied schema defaults");
    applied
}

fn apply(
    registry: &SchemaRegistry,
    descriptor: &MessageDescriptor,
    fields: &mut Map<String, Value>,
) -> usize {
    let mut applied = 0;
    for field in &descriptor.fields {
        if fields.get(&field.name).is_none_or(Value::is_null) {
            if let Some(default) = &field.default {
                fields.insert(field.name.clone(), default.clone());
                applied += 1;
            }
            continue;
        }
        if field.field_type != FieldType::Message {
            continue;
        }
        let Some(nested) = field.type_ref.as_deref().and_then(|r| registry.message(r)) else {
            continue;
        };
        match fields.get_mut(&field.name) {
            Some(Value::Object(map)) => applied += apply(registry, &nested, map),
            Some(Value::Array(items)) => {
                for item in items.iter_mut() {
                    if let Value::Object(map) = item {
                        applied += apply(registry, &nested, map);
                    }
                }
            }
            _ => {}
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(message: &str, value: Value) -> DynamicMessage {
        DynamicMessage::decode(SchemaRegistry::builtin().unwrap(), message, &value).unwrap()
    }

    #[test]
    fn test_fills_unset_fields() {
        let mut spec = decode("AwsVpcSpec", json!({ "vpcCidr": "10.0.0.0/16" }));
        let applied = apply_defaults(&mut spec);
        assert_eq!(applied, 4);
        assert_eq!(spec.get("subnetsPerAvailabilityZone"), Some(&json!(1)));
        assert_eq!(spec.get("subnetSize"), Some(&json!(256)));
        assert_eq!(spec.get("isDnsHostnamesEnabled"), Some(&json!(true)));
        assert!(spec.get("isNatGatewayEnabled").is_none());
    }

    #[test]
    fn test_preserves_explicit_values() {
        let mut spec = decode(
            "AwsVpcSpec",
            json!({ "vpcCidr": "10.0.0.0/16", "subnetSize": 512, "isDnsSupportEnabled": false }),
        );
        apply_defaults(&mut spec);
        assert_eq!(spec.get("subnetSize"), Some(&json!(512)));
        assert_eq!(spec.get("isDnsSupportEnabled"), Some(&json!(false)));
    }

    #[test]
    fn test_recurses_into_present_messages_only() {
        let mut spec = decode(
            "RedisKubernetesSpec",
            json!({ "container": { "diskSize": "1Gi" } }),
        );
        apply_defaults(&mut spec);
        assert_eq!(spec.get("container").unwrap()["replicas"], json!(1));
        assert!(spec.get("ingress").is_none());
    }

    #[test]
    fn test_recurses_into_repeated_messages() {
        let mut spec = decode(
            "GcpDnsZoneSpec",
            json!({ "projectId": "my-project-1", "records": [{ "name": "a.example.com." }, { "ttlSeconds": 300 }] }),
        );
        apply_defaults(&mut spec);
        assert_eq!(spec.get("records").unwrap()[0]["ttlSeconds"], json!(60));
        assert_eq!(spec.get("records").unwrap()[1]["ttlSeconds"], json!(300));
    }

    #[test]
    fn test_is_idempotent() {
        let mut spec = decode("AwsVpcSpec", json!({ "vpcCidr": "10.0.0.0/16" }));
        apply_defaults(&mut spec);
        let once = spec.to_value();
        assert_eq!(apply_defaults(&mut spec), 0);
        assert_eq!(spec.to_value(), once);
    }
}
