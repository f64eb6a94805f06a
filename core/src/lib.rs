//! Provider catalogue and data model for the database provider switch.
//!
//! This crate defines what a backend *is* from the switch tool's point of
//! view:
//!
//! - [`ProviderDefinition`]: a static record describing one backend, with its
//!   data-model dialect, adapter packages, templates, production env vars
//!   and local-dev options.
//! - [`LocalDevOption`]: one way of running that backend on a developer
//!   machine (local file, container, vendor dev server, remote only).
//! - [`SetupContext`](setup::SetupContext): the seam through which a
//!   provider's `setup` routine prompts the user or runs helper commands.
//!
//! The registry ([`get_provider`], [`provider_choices`]) is a pure lookup
//! over the closed set in [`PROVIDERS`].
//!
//! # Example
//!
//! ```
//! use dbswitch_core::*;
//!
//! let postgres = get_provider("postgres").unwrap();
//! assert_eq!(postgres.data_model_provider, DataModelProvider::Postgresql);
//!
//! let container = postgres.local_dev_option(LocalDevType::Container).unwrap();
//! assert_eq!(container.system_deps[0].command, "docker");
//! assert!(postgres.local_dev_option(LocalDevType::LocalFile).is_err());
//! ```

mod error;
mod registry;
pub mod setup;
mod types;

pub use error::{CoreError, Result, SetupError};
pub use registry::{
    ADAPTER_PACKAGES, PROVIDERS, ProviderChoice, get_provider, managed_env_var_names,
    managed_script_names, provider_choices, provider_ids, require_provider,
};
pub use types::*;
