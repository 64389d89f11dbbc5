#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! migration

mod common;

use assert_cmd::Command;
use common::{TestProject, VALID_BUCKET};
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("project-planton").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("validate-manifest"))
        .stdout(predicate::str::contains("list-deployment-component"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("project-planton").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("project-planton"))
        .stdout(predicate::str::contains(std::env::consts::OS));
}

#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("project-planton").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

#[test]
fn test_apply_help_lists_common_flags() {
    let mut cmd = Command::cargo_bin("project-planton").unwrap();
    cmd.args(["apply", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--manifest"))
        .stdout(predicate::str::contains("--set"))
        .stdout(predicate::str::contains("--module-dir"))
        .stdout(predicate::str::contains("--aws-provider-config"));
}

#[test]
fn test_list_deployment_components() {
    let project = TestProject::new();
    project
        .command()
        .arg("list-deployment-component")
        .assert()
        .success()
        .stdout(predicate::str::contains("AwsS3Bucket"))
        .stdout(predicate::str::contains("RedisKubernetes"));
}

#[test]
fn test_list_deployment_components_by_provider() {
    let project = TestProject::new();
    project
        .command()
        .args(["list-deployment-component", "--provider", "gcp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GcpGcsBucket"))
        .stdout(predicate::str::contains("AwsS3Bucket").not());
}

#[test]
fn test_validate_valid_manifest() {
    let project = TestProject::new();
    let path = project.write_manifest("bucket.yaml", VALID_BUCKET);
    project
        .command()
        .arg("validate-manifest")
        .arg("-f")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Manifest is valid"));
}

#[test]
fn test_validate_reports_violations() {
    let project = TestProject::new();
    let path = project.write_manifest(
        "bucket.yaml",
        "apiVersion: aws.project-planton.org/v1\nkind: AwsS3Bucket\nmetadata:\n  name: access-logs\nspec:\n  awsRegion: \"\"\n",
    );
    project
        .command()
        .arg("validate-manifest")
        .arg("--manifest")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 validation error(s)"))
        .stderr(predicate::str::contains("spec.awsRegion"));
}

#[test]
fn test_validate_with_override_fixing_manifest() {
    let project = TestProject::new();
    let path = project.write_manifest(
        "bucket.yaml",
        "apiVersion: aws.project-planton.org/v1\nkind: AwsS3Bucket\nmetadata:\n  name: access-logs\nspec: {}\n",
    );
    project
        .command()
        .arg("validate-manifest")
        .arg("-f")
        .arg(&path)
        .args(["--set", "spec.awsRegion=eu-west-1"])
        .assert()
        .success();
}

#[test]
fn test_load_manifest_applies_overrides_and_defaults() {
    let project = TestProject::new();
    let path = project.write_manifest("bucket.yaml", VALID_BUCKET);
    project
        .command()
        .arg("load-manifest")
        .arg("-f")
        .arg(&path)
        .args(["--set", "spec.awsRegion=eu-west-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("awsRegion: eu-west-1"))
        .stdout(predicate::str::contains("isPublic: false"));
}

#[test]
fn test_load_manifest_unknown_kind() {
    let project = TestProject::new();
    let path = project.write_manifest(
        "thing.yaml",
        "apiVersion: aws.project-planton.org/v1\nkind: AwsTeleporter\nmetadata:\n  name: x\n",
    );
    project
        .command()
        .arg("load-manifest")
        .arg("-f")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported kind"))
        .stderr(predicate::str::contains("list-deployment-component"));
}

#[test]
fn test_load_manifest_missing_file() {
    let project = TestProject::new();
    project
        .command()
        .args(["load-manifest", "-f"])
        .arg(project.root.path().join("missing.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read manifest"));
}

#[test]
fn test_invalid_override_syntax() {
    let project = TestProject::new();
    let path = project.write_manifest("bucket.yaml", VALID_BUCKET);
    project
        .command()
        .arg("load-manifest")
        .arg("-f")
        .arg(&path)
        .args(["--set", "spec.awsRegion"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected key=value"));
}

#[test]
fn test_config_set_and_get() {
    let project = TestProject::new();
    project
        .command()
        .args(["config", "set", "default-provisioner", "Tofu"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default-provisioner = tofu"));

    project
        .command()
        .args(["config", "get", "default-provisioner"])
        .assert()
        .success()
        .stdout(predicate::str::diff("tofu\n"));

    project
        .command()
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backend-url"))
        .stdout(predicate::str::contains("(not set)"));
}

#[test]
fn test_config_get_unset_key() {
    let project = TestProject::new();
    project
        .command()
        .args(["config", "get", "backend-url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("backend-url is not set"));
}

#[test]
fn test_config_rejects_bad_values() {
    let project = TestProject::new();
    project
        .command()
        .args(["config", "set", "default-provisioner", "ansible"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be one of"));

    project
        .command()
        .args(["config", "set", "colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn test_apply_without_provisioner() {
    let project = TestProject::new();
    let path = project.write_manifest("bucket.yaml", VALID_BUCKET);
    project
        .command()
        .arg("apply")
        .arg("-f")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No provisioner selected"));
}

#[test]
fn test_apply_invalid_manifest_stops_before_provisioning() {
    let project = TestProject::new();
    let path = project.write_manifest(
        "bucket.yaml",
        "apiVersion: aws.project-planton.org/v1\nkind: AwsS3Bucket\nmetadata:\n  name: access-logs\nspec:\n  awsRegion: mars-1\n",
    );
    project
        .command()
        .args(["tofu", "apply", "--yes", "-f"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("spec.awsRegion"));
}

#[test]
fn test_tofu_apply_missing_module() {
    let project = TestProject::new();
    let path = project.write_manifest("bucket.yaml", VALID_BUCKET);
    project
        .command()
        .args(["tofu", "apply", "--yes", "--module-dir"])
        .arg(project.root.path())
        .arg("-f")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("awss3bucket"));
}

#[test]
fn test_tofu_apply_malformed_backend_labels() {
    let project = TestProject::new();
    let module_dir = project.root.path().join("module");
    std::fs::create_dir(&module_dir).unwrap();
    std::fs::write(module_dir.join("main.tf"), "").unwrap();
    let path = project.write_manifest(
        "bucket.yaml",
        "apiVersion: aws.project-planton.org/v1\nkind: AwsS3Bucket\nmetadata:\n  name: access-logs\n  labels:\n    terraform.project-planton.org/backend.type: s3\nspec:\n  awsRegion: us-east-1\n",
    );
    project
        .command()
        .args(["tofu", "apply", "--yes", "--module-dir"])
        .arg(&module_dir)
        .arg("-f")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("both must be specified together"));
    assert!(!module_dir.join("terraform.tfvars").exists());
}

#[test]
fn test_validate_from_input_dir() {
    let project = TestProject::new();
    project.write_manifest("target.yaml", VALID_BUCKET);
    project
        .command()
        .arg("validate-manifest")
        .arg("--input-dir")
        .arg(project.root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Manifest is valid"));
}

#[test]
fn test_manifest_source_required() {
    let project = TestProject::new();
    project
        .command()
        .arg("validate-manifest")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--manifest"));
}

#[test]
fn test_overlay_requires_kustomize_dir() {
    let project = TestProject::new();
    project
        .command()
        .args(["validate-manifest", "--overlay", "prod"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--kustomize-dir"));
}
