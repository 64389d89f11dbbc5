//! Pulumi provisioner for Project Planton
//!
//! Runs a deployment component's Pulumi program through the pulumi CLI. The
//! stack input is handed to the program in the `STACK_INPUT_YAML`
//! environment variable.

pub mod cli;
pub mod error;
pub mod provisioner;

pub use cli::PulumiCli;
pub use error::{PulumiError, Result};
pub use provisioner::PulumiProvisioner;
