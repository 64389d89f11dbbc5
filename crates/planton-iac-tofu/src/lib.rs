//! OpenTofu provisioner for Project Planton
//!
//! Renders the target manifest into `terraform.tfvars`, initialises the
//! module with the backend from the manifest labels and runs the requested
//! operation through the tofu CLI. Provider credentials reach the providers
//! as environment variables.

pub mod cli;
pub mod error;
pub mod provisioner;
pub mod tfvars;

pub use cli::TofuCli;
pub use error::{Result, TofuError};
pub use provisioner::TofuProvisioner;
pub use tfvars::{render_tfvars, write_tfvars};
