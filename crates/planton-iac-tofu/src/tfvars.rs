//! `terraform.tfvars` rendering
//!
//! The target manifest becomes the module's variables: top-level `metadata`
//! and `spec` (plus anything else except `apiVersion`, `kind` and `status`)
//! rendered as HCL with snake_case keys in sorted order.
//!
//! ```hcl
//! metadata = {
//!   name = "red-one"
//! }
//! spec = {
//!   container = {
//!     disk_size = "2Gi"
//!     replicas = 1
//!   }
//! }
//! ```

use crate::error::Result;
use planton_core::naming::to_snake_case;
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const TFVARS_FILE: &str = "terraform.tfvars";

const SKIPPED_KEYS: [&str; 3] = ["apiVersion", "kind", "status"];

/// Render a manifest as tfvars
pub fn render_tfvars(manifest: &Value) -> String {
    let mut out = String::new();
    if let Value::Object(map) = manifest {
        let filtered: Map<String, Value> = map
            .iter()
            .filter(|(k, _)| !SKIPPED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        write_object_body(&mut out, &filtered, 0);
    }
    out
}

/// Write `terraform.tfvars` into `module_dir`
pub fn write_tfvars(module_dir: &Path, manifest: &Value) -> Result<PathBuf> {
    let path = module_dir.join(TFVARS_FILE);
    std::fs::write(&path, render_tfvars(manifest))?;
    tracing::debug!(path = %path.display(), "Wrote tfvars");
    Ok(path)
}

fn write_object_body(out: &mut String, map: &Map<String, Value>, level: usize) {
    let indent = "  ".repeat(level);
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    for key in keys {
        let _ = write!(out, "{indent}{} = ", render_key(key));
        write_value(out, &map[key.as_str()], level);
        out.push('\n');
    }
}

fn write_value(out: &mut String, value: &Value, level: usize) {
    let indent = "  ".repeat(level);
    match value {
        Value::Object(map) => {
            out.push_str("{\n");
            write_object_body(out, map, level + 1);
            let _ = write!(out, "{indent}}}");
        }
        Value::Array(items) => {
            out.push_str("[\n");
            let inner = "  ".repeat(level + 1);
            for item in items {
                out.push_str(&inner);
                write_value(out, item, level + 1);
                out.push_str(",\n");
            }
            let _ = write!(out, "{indent}]");
        }
        Value::String(s) => out.push_str(&quote(s)),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Null => out.push_str("null"),
    }
}

/// Identifier keys are snake_cased; anything else (label keys) is quoted verbatim
fn render_key(key: &str) -> String {
    let is_identifier = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if is_identifier {
        to_snake_case(key)
    } else {
        quote(key)
    }
}

fn quote(s: &str) -> String {
    let escaped = serde_json::Value::String(s.to_string()).to_string();
    escaped.replace("${", "$${").replace("%{", "%%{")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_manifest() {
        let manifest = json!({
            "apiVersion": "kubernetes.project-planton.org/v1",
            "kind": "RedisKubernetes",
            "metadata": { "name": "red-one", "labels": { "env": "production" } },
            "spec": {
                "container": { "replicas": 1, "isPersistenceEnabled": true, "diskSize": "2Gi" }
            },
            "status": { "outputs": { "x": "y" } }
        });

        let expected = "\
metadata = {
  labels = {
    env = \"production\"
  }
  name = \"red-one\"
}
spec = {
  container = {
    disk_size = \"2Gi\"
    is_persistence_enabled = true
    replicas = 1
  }
}
";
        assert_eq!(render_tfvars(&manifest), expected);
    }

    #[test]
    fn test_render_arrays_and_scalars() {
        let manifest = json!({
            "spec": {
                "zones": ["a", "b"],
                "records": [{ "ttlSeconds": 60, "values": [] }],
                "ratio": 0.5,
                "note": null
            }
        });
        let expected = "\
spec = {
  note = null
  ratio = 0.5
  records = [
    {
      ttl_seconds = 60
      values = [
      ]
    },
  ]
  zones = [
    \"a\",
    \"b\",
  ]
}
";
        assert_eq!(render_tfvars(&manifest), expected);
    }

    #[test]
    fn test_label_keys_are_quoted() {
        let manifest = json!({
            "metadata": { "labels": { "terraform.project-planton.org/backend.type": "s3" } }
        });
        assert!(
            render_tfvars(&manifest)
                .contains("\"terraform.project-planton.org/backend.type\" = \"s3\"")
        );
    }

    #[test]
    fn test_strings_are_escaped() {
        let manifest = json!({ "spec": { "script": "echo \"${HOME}\"\n" } });
        assert!(render_tfvars(&manifest).contains(r#"script = "echo \"$${HOME}\"\n""#));
    }

    #[test]
    fn test_write_tfvars() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tfvars(dir.path(), &json!({ "spec": { "name": "x" } })).unwrap();
        assert_eq!(path, dir.path().join("terraform.tfvars"));
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "spec = {\n  name = \"x\"\n}\n"
        );
    }
}
