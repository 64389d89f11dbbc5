use planton_core::{
    SchemaRegistry, ValueOverride, apply_defaults, apply_overrides, load_manifest_from_str,
    validate,
};

/// (kind, spec YAML, a required field path)
const CASES: &[(&str, &str, &str)] = &[
    ("AwsS3Bucket", "awsRegion: us-east-1", "spec.awsRegion"),
    ("AwsEcrRepo", "repositoryName: team/api", "spec.repositoryName"),
    (
        "AwsVpc",
        "vpcCidr: 10.0.0.0/16\n  availabilityZones: [us-east-1a, us-east-1b]",
        "spec.vpcCidr",
    ),
    (
        "AzureKeyVault",
        "region: eastus\n  resourceGroup: rg-app",
        "spec.region",
    ),
    (
        "CivoDatabase",
        "dbInstanceName: app-db\n  engine: postgres\n  engineVersion: \"16\"\n  region: lon1\n  sizeSlug: g3.db.small\n  networkId: net-1",
        "spec.sizeSlug",
    ),
    (
        "CloudflareR2Bucket",
        "bucketName: assets-bucket\n  accountId: 0123456789abcdef0123456789abcdef",
        "spec.bucketName",
    ),
    (
        "DigitalOceanVolume",
        "volumeName: data-vol\n  region: nyc3\n  sizeGib: 100",
        "spec.region",
    ),
    (
        "GcpDnsZone",
        "projectId: my-project-123\n  records:\n    - recordType: A\n      name: www.example.com.\n      values: [1.2.3.4]",
        "spec.projectId",
    ),
    (
        "GcpGcsBucket",
        "gcpProjectId: my-project\n  gcpRegion: us-central1",
        "spec.gcpRegion",
    ),
    (
        "RedisKubernetes",
        "container:\n    isPersistenceEnabled: true\n    diskSize: 1Gi",
        "spec.container.diskSize",
    ),
];

fn manifest_yaml(kind: &str, spec: &str) -> String {
    let registry = SchemaRegistry::builtin().unwrap();
    let api_version = &registry.component(kind).unwrap().api_version;
    format!(
        "apiVersion: {api_version}\nkind: {kind}\nmetadata:\n  name: test-{}\nspec:\n  {spec}\n",
        kind.to_lowercase()
    )
}

#[test]
fn test_every_case_covers_a_builtin_kind() {
    let registry = SchemaRegistry::builtin().unwrap();
    let mut kinds: Vec<_> = registry.components().map(|c| c.kind.as_str()).collect();
    let mut covered: Vec<_> = CASES.iter().map(|(kind, _, _)| *kind).collect();
    kinds.sort();
    covered.sort();
    assert_eq!(kinds, covered);
}

#[test]
fn test_valid_manifests_have_no_violations() {
    for (kind, spec, _) in CASES {
        let mut manifest = load_manifest_from_str(&manifest_yaml(kind, spec))
            .unwrap_or_else(|e| panic!("{kind}: {e}"));
        apply_defaults(manifest.message_mut());
        let violations = validate(manifest.message());
        assert!(violations.is_empty(), "{kind}: {violations:?}");
    }
}

#[test]
fn test_blanking_one_required_field_yields_one_violation() {
    for (kind, spec, path) in CASES {
        let mut manifest = load_manifest_from_str(&manifest_yaml(kind, spec)).unwrap();
        apply_defaults(manifest.message_mut());
        let blank: ValueOverride = format!("{path}=").parse().unwrap();
        apply_overrides(manifest.message_mut(), &[blank]).unwrap();

        let violations = validate(manifest.message());
        assert_eq!(violations.len(), 1, "{kind}: {violations:?}");
        assert_eq!(violations[0].field_path, *path, "{kind}");
    }
}

#[test]
fn test_stack_input_messages_exist_for_every_kind() {
    let registry = SchemaRegistry::builtin().unwrap();
    for component in registry.components() {
        let input = registry
            .message(&component.stack_input_message())
            .unwrap_or_else(|| panic!("{} has no stack input", component.kind));
        assert!(input.field("target").is_some());
        assert!(input.field("providerConfig").is_some());
        assert!(!component.iac.is_empty(), "{} ships no IaC module", component.kind);
    }
}
