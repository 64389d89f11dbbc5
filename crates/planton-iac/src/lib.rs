//! Project Planton IaC plumbing
//!
//! Everything between a validated manifest and an IaC engine run: backend and
//! provisioner labels, stack inputs with provider credentials, module
//! directory lookup and kind-based dispatch to a [`Provisioner`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              project-planton CLI                │
//! │        (apply / plan / destroy / refresh)       │
//! └─────────────────┬───────────────────────────────┘
//!                   │ Manifest + labels
//! ┌─────────────────▼───────────────────────────────┐
//! │                 planton-iac                     │
//! │  backend labels → StackInput → dispatch(kind)   │
//! │  trait Provisioner { provision(ctx, input) }    │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │    pulumi     │ │   opentofu    │
//! │  provisioner  │ │  provisioner  │
//! └───────────────┘ └───────────────┘
//! ```

pub mod backend;
pub mod error;
pub mod module;
pub mod process;
pub mod provisioner;
pub mod stack_input;

// Re-exports
pub use backend::{
    ProvisionerKind, PulumiBackendConfig, TofuBackendConfig, detect_provisioner, resolve_backend,
    resolve_pulumi_backend,
};
pub use error::{BackendConfigError, DispatchError, IacError, ProvisionError, Result, StackInputError};
pub use module::{catalog_module_path, is_module_dir, resolve_module_dir};
pub use process::{CommandOutput, binary_exists, run_interactive, run_streaming};
pub use provisioner::{
    Operation, ProvisionContext, ProvisionOutcome, Provisioner, ProvisionerRegistry,
    UnsupportedModule,
};
pub use stack_input::{ProviderConfig, StackInput, StackOutputs};
