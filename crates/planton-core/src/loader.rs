//! Manifest loading
//!
//! Reads YAML, splits it into documents, detects the kind of each document and
//! decodes it against the kind's descriptor.

use crate::error::{DecodeError, ManifestError, Result};
use crate::kind::{DeploymentComponent, normalize_kind};
use crate::message::DynamicMessage;
use crate::registry::SchemaRegistry;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, instrument};

/// A decoded deployment component manifest
#[derive(Debug, Clone)]
pub struct Manifest {
    component: DeploymentComponent,
    message: DynamicMessage,
}

impl Manifest {
    pub fn kind(&self) -> &str {
        &self.component.kind
    }

    pub fn component(&self) -> &DeploymentComponent {
        &self.component
    }

    pub fn message(&self) -> &DynamicMessage {
        &self.message
    }

    pub fn message_mut(&mut self) -> &mut DynamicMessage {
        &mut self.message
    }

    pub fn into_message(self) -> DynamicMessage {
        self.message
    }

    /// `metadata.name`, empty when unset
    pub fn name(&self) -> &str {
        self.metadata_str("name").unwrap_or_default()
    }

    /// `metadata.id`, if set
    pub fn id(&self) -> Option<&str> {
        self.metadata_str("id").filter(|s| !s.is_empty())
    }

    /// `metadata.labels` as a sorted map
    pub fn labels(&self) -> BTreeMap<String, String> {
        self.message
            .get("metadata")
            .and_then(|m| m.get("labels"))
            .and_then(Value::as_object)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        self.message.to_yaml()
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.message
            .get("metadata")
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
    }
}

/// Split multi-document YAML into one byte segment per non-empty document
pub fn split_documents(content: &str) -> std::result::Result<Vec<Vec<u8>>, DecodeError> {
    let mut segments = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        segments.push(serde_yaml::to_string(&value)?.into_bytes());
    }
    Ok(segments)
}

/// Load the single manifest in `path`
#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    debug!("Step 1: Reading manifest");
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest = load_manifest_from_str(&content)?;
    info!(kind = manifest.kind(), name = manifest.name(), "Manifest loaded");
    Ok(manifest)
}

/// Load exactly one manifest from YAML text
pub fn load_manifest_from_str(content: &str) -> Result<Manifest> {
    let mut manifests = load_manifests_from_str(content)?;
    match manifests.len() {
        0 => Err(ManifestError::Empty),
        1 => Ok(manifests.remove(0)),
        n => Err(ManifestError::MultipleDocuments(n)),
    }
}

/// Load every manifest in a multi-document YAML text
pub fn load_manifests_from_str(content: &str) -> Result<Vec<Manifest>> {
    let registry = SchemaRegistry::builtin()?;
    debug!("Step 2: Splitting documents");
    let segments = split_documents(content)?;
    debug!(documents = segments.len(), "Step 3: Decoding documents");
    segments
        .iter()
        .map(|segment| {
            let value: Value = serde_yaml::from_slice(segment).map_err(DecodeError::from)?;
            decode_manifest(registry, &value)
        })
        .collect()
}

/// Decode a JSON value as the manifest of the kind it declares
pub fn decode_manifest(registry: &SchemaRegistry, value: &Value) -> Result<Manifest> {
    let kind = value
        .get("kind")
        .and_then(Value::as_str)
        .filter(|k| !k.trim().is_empty())
        .ok_or(ManifestError::MissingKind)?;
    let component = registry
        .find_component(kind)
        .ok_or_else(|| ManifestError::UnsupportedKind {
            kind: kind.to_string(),
            hint: unsupported_kind_hint(registry, kind),
        })?
        .clone();
    debug!(kind = %component.kind, "Detected kind");

    let message = DynamicMessage::decode(registry, component.message_name(), value)?;
    Ok(Manifest { component, message })
}

/// Suggest close kind names for an unknown kind
pub fn unsupported_kind_hint(registry: &SchemaRegistry, kind: &str) -> String {
    let wanted = normalize_kind(kind);
    let similar: Vec<&str> = registry
        .components()
        .map(|c| c.kind.as_str())
        .filter(|k| {
            let candidate = normalize_kind(k);
            !wanted.is_empty() && (candidate.contains(&wanted) || wanted.contains(&candidate))
        })
        .collect();

    let mut hint = String::new();
    if !similar.is_empty() {
        hint.push_str(&format!("Did you mean: {}?\n", similar.join(", ")));
    }
    hint.push_str("Run `project-planton list-deployment-component` to see supported kinds");
    hint
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BUCKET: &str = r#"
apiVersion: aws.project-planton.org/v1
kind: AwsS3Bucket
metadata:
  name: logs
  labels:
    terraform.project-planton.org/backend.type: s3
spec:
  awsRegion: us-east-1
"#;

    #[test]
    fn test_load_manifest_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BUCKET.as_bytes()).unwrap();

        let manifest = load_manifest(file.path()).unwrap();
        assert_eq!(manifest.kind(), "AwsS3Bucket");
        assert_eq!(manifest.name(), "logs");
        assert_eq!(
            manifest.labels().get("terraform.project-planton.org/backend.type"),
            Some(&"s3".to_string())
        );
        assert_eq!(manifest.component().provider.as_str(), "aws");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_manifest(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, ManifestError::Load { .. }));
    }

    #[test]
    fn test_split_documents_skips_empty() {
        let content = format!("---\n{BUCKET}---\n---\n{BUCKET}");
        let segments = split_documents(&content).unwrap();
        assert_eq!(segments.len(), 2);
        let first = String::from_utf8(segments[0].clone()).unwrap();
        assert!(first.contains("kind: AwsS3Bucket"));
    }

    #[test]
    fn test_multiple_documents() {
        let content = format!("{BUCKET}---\n{BUCKET}");
        assert_eq!(load_manifests_from_str(&content).unwrap().len(), 2);
        assert!(matches!(
            load_manifest_from_str(&content),
            Err(ManifestError::MultipleDocuments(2))
        ));
    }

    #[test]
    fn test_empty_manifest() {
        assert!(matches!(
            load_manifest_from_str("---\n"),
            Err(ManifestError::Empty)
        ));
    }

    #[test]
    fn test_missing_kind() {
        let err = load_manifest_from_str("apiVersion: v1\nmetadata: { name: x }\n").unwrap_err();
        assert!(matches!(err, ManifestError::MissingKind));
    }

    #[test]
    fn test_unsupported_kind_has_hint() {
        let err = load_manifest_from_str("kind: AwsS3\n").unwrap_err();
        match err {
            ManifestError::UnsupportedKind { kind, hint } => {
                assert_eq!(kind, "AwsS3");
                assert!(hint.contains("AwsS3Bucket"));
                assert!(hint.contains("list-deployment-component"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_error_is_reported() {
        let content = BUCKET.replace("awsRegion: us-east-1", "awsRegion: us-east-1\n  colour: red");
        let err = load_manifest_from_str(&content).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::Decode(DecodeError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_malformed_yaml() {
        let err = load_manifest_from_str("kind: [unclosed").unwrap_err();
        assert!(matches!(err, ManifestError::Decode(DecodeError::Yaml(_))));
    }
}
