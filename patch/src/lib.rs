//! Minimal-diff patchers and file safety for the database provider switch.
//!
//! Every patcher here is a pure transform over file text that touches only
//! the fragment it targets:
//!
//! - Env schema ([`extract_var_names`], [`add_vars`], [`remove_vars`]):
//!   declarations inside a named object block of the env-validation source.
//! - Global-env manifest ([`sync_global_env`]): the build orchestrator's
//!   pass-through variable list, always fully regenerated and sorted.
//! - Data-model source ([`update_datasource_provider`],
//!   [`ensure_generator_compat`], [`remove_deprecated_url_field`]) and the
//!   auth adapter line ([`update_adapter_provider`]).
//! - Package scripts ([`merge_scripts`]), dotenv values ([`upsert_env`])
//!   and the generated README section ([`replace_section`]).
//!
//! File safety lives alongside: [`unified_diff`] for previews (empty means
//! no write), [`backup`]/[`restore`] snapshots, and [`apply_writes`], which
//! applies a whole write set or none of it.
//!
//! # Example
//!
//! ```
//! use dbswitch_patch::*;
//!
//! let schema = "export const env = createEnv({\n  server: {\n    AUTH_SECRET: z.string(),\n  },\n});\n";
//! let def = EnvVarDefinition::new("DATABASE_URL", "z.string().min(1)")
//!     .with_comment("Primary connection string");
//! let patched = add_vars(schema, "server", &[def]).unwrap();
//!
//! assert_eq!(
//!     extract_var_names(&patched, "server").unwrap(),
//!     vec!["AUTH_SECRET", "DATABASE_URL"]
//! );
//! assert!(!unified_diff("env.ts", schema, &patched).is_empty());
//! ```

mod adapter;
mod backup;
mod diff;
mod dotenv;
mod env_schema;
mod error;
mod json;
mod manifest;
mod package;
mod prisma;
mod readme;
mod writeset;

pub use adapter::update_adapter_provider;
pub use backup::{Backup, backup, restore};
pub use diff::{diff_file, read_or_empty, unified_diff};
pub use dotenv::{read_env_value, upsert_env};
pub use env_schema::{
    EnvVarDefinition, add_vars, extract_var_names, is_valid_var_name, parse_definitions,
    remove_vars,
};
pub use error::{PatchError, RestoreFailure, Result};
pub use manifest::{GLOBAL_ENV_KEY, SyncResult, read_global_env, sync_global_env};
pub use package::{dependency_names, merge_scripts, package_name};
pub use prisma::{
    CLIENT_GENERATOR, GENERATOR_OUTPUT, LEGACY_CLIENT_GENERATOR, datasource_provider,
    ensure_generator_compat, remove_deprecated_url_field, update_datasource_provider,
};
pub use readme::{README_END, README_START, replace_section};
pub use writeset::{PendingWrite, Rollback, apply_writes, apply_writes_with};
