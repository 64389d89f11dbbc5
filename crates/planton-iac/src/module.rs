//! IaC module directory resolution
//!
//! `--module-dir` may point at a module itself or at the root of a
//! project-planton checkout, where modules live at
//! `apis/org/project_planton/provider/<provider>/<kind>/v1/iac/{pulumi,tf}`.

use crate::error::{IacError, Result};
use planton_core::{DeploymentComponent, IacEngine};
use std::path::{Path, PathBuf};
use tracing::debug;

const PROVIDER_ROOT: &str = "apis/org/project_planton/provider";

/// Whether `dir` is itself a module for `engine`
pub fn is_module_dir(dir: &Path, engine: IacEngine) -> bool {
    match engine {
        IacEngine::Pulumi => dir.join("Pulumi.yaml").is_file(),
        IacEngine::Tofu => std::fs::read_dir(dir)
            .map(|entries| {
                entries.filter_map(|e| e.ok()).any(|e| {
                    e.path().is_file() && e.path().extension().is_some_and(|ext| ext == "tf")
                })
            })
            .unwrap_or(false),
    }
}

/// Module path of `component` inside a project-planton checkout
pub fn catalog_module_path(root: &Path, component: &DeploymentComponent, engine: IacEngine) -> PathBuf {
    let leaf = match engine {
        IacEngine::Pulumi => "pulumi",
        IacEngine::Tofu => "tf",
    };
    root.join(PROVIDER_ROOT)
        .join(component.provider.as_str())
        .join(component.module_dir_name())
        .join("v1")
        .join("iac")
        .join(leaf)
}

/// Resolve the module directory to run `engine` in
pub fn resolve_module_dir(
    module_dir: &Path,
    component: &DeploymentComponent,
    engine: IacEngine,
) -> Result<PathBuf> {
    if is_module_dir(module_dir, engine) {
        debug!(path = %module_dir.display(), "Using module directory as given");
        return Ok(module_dir.to_path_buf());
    }
    let path = catalog_module_path(module_dir, component, engine);
    if !path.is_dir() {
        return Err(IacError::ModuleNotFound(path));
    }
    debug!(path = %path.display(), "Resolved module directory");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use planton_core::SchemaRegistry;

    fn bucket() -> DeploymentComponent {
        SchemaRegistry::builtin()
            .unwrap()
            .component("AwsS3Bucket")
            .unwrap()
            .clone()
    }

    #[test]
    fn test_module_dir_used_directly() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Pulumi.yaml"), "name: s3\n").unwrap();
        std::fs::write(dir.path().join("main.tf"), "").unwrap();

        for engine in [IacEngine::Pulumi, IacEngine::Tofu] {
            assert_eq!(
                resolve_module_dir(dir.path(), &bucket(), engine).unwrap(),
                dir.path()
            );
        }
    }

    #[test]
    fn test_checkout_layout() {
        let root = tempfile::tempdir().unwrap();
        let expected = root
            .path()
            .join("apis/org/project_planton/provider/aws/awss3bucket/v1/iac/tf");
        std::fs::create_dir_all(&expected).unwrap();

        assert_eq!(
            resolve_module_dir(root.path(), &bucket(), IacEngine::Tofu).unwrap(),
            expected
        );
        assert!(matches!(
            resolve_module_dir(root.path(), &bucket(), IacEngine::Pulumi),
            Err(IacError::ModuleNotFound(p)) if p.ends_with("awss3bucket/v1/iac/pulumi")
        ));
    }

    #[test]
    fn test_tf_detection_ignores_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("modules.tf")).unwrap();
        assert!(!is_module_dir(dir.path(), IacEngine::Tofu));
    }
}
