//! Orchestration for the database provider switch.
//!
//! - [`Switcher`]: the `db-switch` state machine, from the safety gate
//!   through selection, setup and diff preview to the atomic writes,
//!   package install, migration and next steps.
//! - [`EnvConfigSession`] / [`run_env_config`]: pending add/remove edits
//!   over the env schema, applied together with the global-env manifest.
//! - [`link_env_files`]: `.env` symlinks from each app to the single
//!   consolidated env file.
//!
//! All I/O with the operator and with external programs goes through the
//! [`Console`] and [`CommandRunner`] traits; paths come from
//! [`SwitchConfig`].
//!
//! # Example
//!
//! ```
//! use dbswitch_core::{LocalDevType, get_provider};
//! use dbswitch_engine::{SwitchConfig, plan_switch};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let root = dir.path();
//! let config = SwitchConfig::default();
//! for (path, content) in [
//!     (&config.files.package_manifest, "{\n  \"name\": \"@acme/db\"\n}\n"),
//!     (&config.files.data_model, "datasource db {\n  provider = \"sqlite\"\n}\n"),
//!     (&config.files.env_schema, "createEnv({\n  server: {\n  },\n});\n"),
//! ] {
//!     let path = root.join(path);
//!     std::fs::create_dir_all(path.parent().unwrap()).unwrap();
//!     std::fs::write(path, content).unwrap();
//! }
//!
//! let postgres = get_provider("postgres").unwrap();
//! let option = postgres.local_dev_option(LocalDevType::Container).unwrap();
//! let values = [("DATABASE_URL", "postgresql://localhost:5432/app")]
//!     .into_iter()
//!     .map(|(k, v)| (k.to_string(), v.to_string()))
//!     .collect();
//! let plan = plan_switch(root, &config, postgres, option, values).unwrap();
//!
//! let schema = plan.changes.iter().find(|c| c.label.ends_with("schema.prisma")).unwrap();
//! assert!(schema.content.contains("provider = \"postgresql\""));
//! assert!(plan.changes.iter().any(|c| c.label == "docker-compose.yml"));
//! ```

mod config;
mod console;
mod env_config;
mod env_links;
mod error;
mod git;
mod lock;
mod plan;
mod runner;
mod switch;
mod sysdeps;

pub use config::{CONFIG_FILE_NAME, EnvLinksConfig, ProjectFiles, ReadmeMarkers, SwitchConfig};
pub use console::Console;
pub use env_config::{DEFAULT_VALIDATOR, EnvConfigSession, EnvEdit, run_env_config};
pub use env_links::{ENV_FILE_NAME, LinkReport, LinkStatus, link_env_files};
pub use error::{EngineError, MissingDependency, Result};
pub use git::{TreeState, ensure_directories_committed};
pub use lock::WriteLock;
pub use plan::{FileChange, PlannedCommands, SwitchPlan, plan_switch, readme_section};
pub use runner::{CommandRunner, CommandSpec, SetupBridge};
pub use switch::{
    MigrationOutcome, Step, SwitchOptions, SwitchOutcome, SwitchReport, Switcher, next_steps,
};
pub use sysdeps::ensure_system_dependencies;
