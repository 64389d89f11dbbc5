//! Manifest resolution for commands: local paths, http(s) URLs, input
//! directories and kustomize overlays

use crate::args::{INPUT_DIR_MANIFEST, ManifestArgs};
use anyhow::Context;
use planton_core::{Manifest, apply_defaults, apply_overrides, load_manifest};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Local path of the manifest from whichever source was given
pub async fn resolve_path(args: &ManifestArgs) -> anyhow::Result<PathBuf> {
    if let Some(input) = &args.manifest {
        return resolve_input(input).await;
    }
    if let Some(dir) = &args.input_dir {
        let path = dir.join(INPUT_DIR_MANIFEST);
        anyhow::ensure!(
            path.is_file(),
            "{} not found in input directory {}",
            INPUT_DIR_MANIFEST,
            dir.display()
        );
        return Ok(path);
    }
    if let (Some(dir), Some(overlay)) = (&args.kustomize_dir, &args.overlay) {
        return kustomize_build(dir, overlay).await;
    }
    anyhow::bail!("No manifest given. Pass --manifest, --input-dir, or --kustomize-dir with --overlay")
}

/// Local path of a `--manifest` value, downloading it first when given a URL
pub async fn resolve_input(input: &str) -> anyhow::Result<PathBuf> {
    if !is_url(input) {
        return Ok(PathBuf::from(input));
    }

    let path = download_path()?;
    debug!(url = input, path = %path.display(), "Downloading manifest");

    let response = reqwest::get(input)
        .await
        .with_context(|| format!("Failed to download manifest from {input}"))?
        .error_for_status()
        .with_context(|| format!("Failed to download manifest from {input}"))?;
    let body = response.bytes().await?;
    tokio::fs::write(&path, &body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), "Manifest downloaded");
    Ok(path)
}

fn download_path() -> anyhow::Result<PathBuf> {
    let dir = planton_config::get_download_dir()?;
    Ok(dir.join(format!("{}.yaml", uuid::Uuid::new_v4())))
}

/// Directory `kustomize build` runs against
pub fn overlay_dir(kustomize_dir: &Path, overlay: &str) -> PathBuf {
    kustomize_dir.join("overlays").join(overlay)
}

/// Render a kustomize overlay into a manifest file
pub async fn kustomize_build(kustomize_dir: &Path, overlay: &str) -> anyhow::Result<PathBuf> {
    let overlay_dir = overlay_dir(kustomize_dir, overlay);
    anyhow::ensure!(
        overlay_dir.is_dir(),
        "Kustomize overlay {} not found",
        overlay_dir.display()
    );
    if !planton_iac::binary_exists("kustomize").await {
        anyhow::bail!(
            "kustomize not found. Please install: https://kubectl.docs.kubernetes.io/installation/kustomize/"
        );
    }

    debug!("Running: kustomize build {}", overlay_dir.display());
    let output = Command::new("kustomize")
        .arg("build")
        .arg(&overlay_dir)
        .output()
        .await
        .context("Failed to run kustomize")?;
    if !output.status.success() {
        anyhow::bail!(
            "kustomize build {} failed: {}",
            overlay_dir.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let path = download_path()?;
    tokio::fs::write(&path, &output.stdout)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(overlay, path = %path.display(), "Manifest built from kustomize overlay");
    Ok(path)
}

/// Load the manifest, then apply `--set` overrides and schema defaults
pub async fn load(args: &ManifestArgs) -> anyhow::Result<Manifest> {
    let path = resolve_path(args).await?;

    debug!("Step 1: Loading manifest");
    let mut manifest = load_manifest(&path)?;

    debug!(overrides = args.overrides.len(), "Step 2: Applying overrides");
    apply_overrides(manifest.message_mut(), &args.overrides)?;

    debug!("Step 3: Applying defaults");
    let filled = apply_defaults(manifest.message_mut());
    debug!(filled, "Defaults applied");

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/bucket.yaml"));
        assert!(is_url("http://localhost:8080/m.yaml"));
        assert!(!is_url("manifests/bucket.yaml"));
        assert!(!is_url("httpdocs/bucket.yaml"));
    }

    #[tokio::test]
    async fn test_resolve_local_path() {
        assert_eq!(
            resolve_input("bucket.yaml").await.unwrap(),
            PathBuf::from("bucket.yaml")
        );
    }

    #[tokio::test]
    async fn test_manifest_flag_wins_over_input_dir() {
        let args = ManifestArgs {
            manifest: Some("bucket.yaml".into()),
            input_dir: Some(PathBuf::from("inputs")),
            ..Default::default()
        };
        assert_eq!(resolve_path(&args).await.unwrap(), PathBuf::from("bucket.yaml"));
    }

    #[tokio::test]
    async fn test_resolve_input_dir() {
        let dir = tempfile::tempdir().unwrap();
        let args = ManifestArgs {
            input_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let err = resolve_path(&args).await.unwrap_err();
        assert!(err.to_string().contains("target.yaml not found"));

        std::fs::write(dir.path().join("target.yaml"), "kind: AwsS3Bucket\n").unwrap();
        assert_eq!(
            resolve_path(&args).await.unwrap(),
            dir.path().join("target.yaml")
        );
    }

    #[tokio::test]
    async fn test_missing_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let args = ManifestArgs {
            kustomize_dir: Some(dir.path().to_path_buf()),
            overlay: Some("prod".into()),
            ..Default::default()
        };
        let err = resolve_path(&args).await.unwrap_err();
        assert!(err.to_string().contains("overlays/prod not found"));
    }

    #[tokio::test]
    async fn test_no_source() {
        let err = resolve_path(&ManifestArgs::default()).await.unwrap_err();
        assert!(err.to_string().contains("No manifest given"));
    }

    #[test]
    fn test_overlay_dir() {
        assert_eq!(
            overlay_dir(Path::new("_kustomize"), "prod"),
            PathBuf::from("_kustomize/overlays/prod")
        );
    }

    #[tokio::test]
    async fn test_load_applies_overrides_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bucket.yaml");
        std::fs::write(
            &path,
            "apiVersion: aws.project-planton.org/v1\nkind: AwsS3Bucket\nmetadata:\n  name: logs\nspec:\n  awsRegion: us-east-1\n",
        )
        .unwrap();

        let args = ManifestArgs {
            manifest: Some(path.display().to_string()),
            overrides: vec!["spec.awsRegion=eu-west-1".parse().unwrap()],
            ..Default::default()
        };
        let manifest = load(&args).await.unwrap();
        let spec = manifest.message().get("spec").unwrap();
        assert_eq!(spec["awsRegion"], "eu-west-1");
        assert_eq!(spec["isPublic"], false);
    }
}
