use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const VALID_BUCKET: &str = "\
apiVersion: aws.project-planton.org/v1
kind: AwsS3Bucket
metadata:
  name: access-logs
spec:
  awsRegion: us-east-1
";

/// Scratch directory holding manifests and the CLI home
pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_manifest(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// Value for `PROJECT_PLANTON_HOME`
    pub fn home(&self) -> PathBuf {
        self.root.path().join("home")
    }

    pub fn command(&self) -> assert_cmd::Command {
        #[allow(deprecated)]
        let mut cmd = assert_cmd::Command::cargo_bin("project-planton").unwrap();
        cmd.env("PROJECT_PLANTON_HOME", self.home())
            .env("NO_COLOR", "1")
            .env_remove("PROJECT_PLANTON_PROVISIONER")
            .env_remove("RUST_LOG");
        cmd
    }
}
