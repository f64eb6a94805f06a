//! Provider data model.
//!
//! Every provider is a static [`ProviderDefinition`] record. Records differ
//! only in their field values and in the single [`SetupFn`] callback, so the
//! orchestrator can drive all of them through one fixed pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, SetupError};
use crate::setup::SetupContext;

/// Resolved environment values produced by a provider's setup, keyed by
/// variable name.
pub type EnvValues = BTreeMap<String, String>;

/// Signature of a provider's setup routine.
///
/// Receives the selected local-dev option and a context for prompting and
/// running helper commands; returns the connection values to write.
pub type SetupFn = fn(&LocalDevOption, &mut dyn SetupContext) -> Result<EnvValues, SetupError>;

/// Dialect written into the data-model datasource block.
///
/// # Examples
///
/// ```
/// use dbswitch_core::DataModelProvider;
///
/// assert_eq!(DataModelProvider::Postgresql.as_str(), "postgresql");
/// assert_eq!(DataModelProvider::Sqlite.to_string(), "sqlite");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataModelProvider {
    Sqlite,
    Postgresql,
}

impl DataModelProvider {
    /// Literal used in the datasource block and the auth adapter config.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgresql => "postgresql",
        }
    }
}

impl fmt::Display for DataModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy for running a provider's database on a developer machine.
///
/// # Examples
///
/// ```
/// use dbswitch_core::LocalDevType;
///
/// let kind: LocalDevType = "container".parse().unwrap();
/// assert_eq!(kind, LocalDevType::Container);
/// assert!("kubernetes".parse::<LocalDevType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocalDevType {
    /// A database file next to the project.
    LocalFile,
    /// A dev server managed by the vendor CLI (`prisma dev`, `turso dev`).
    ManagedDevServer,
    /// A container started through compose.
    Container,
    /// A full vendor stack (`supabase start`).
    VendorLocalStack,
    /// No local process; connect to a hosted database.
    Remote,
}

impl LocalDevType {
    /// All variants in declaration order.
    pub const ALL: [LocalDevType; 5] = [
        Self::LocalFile,
        Self::ManagedDevServer,
        Self::Container,
        Self::VendorLocalStack,
        Self::Remote,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LocalFile => "local-file",
            Self::ManagedDevServer => "managed-dev-server",
            Self::Container => "container",
            Self::VendorLocalStack => "vendor-local-stack",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for LocalDevType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocalDevType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| CoreError::InvalidLocalDevType(s.to_string()))
    }
}

/// An external command a local-dev option needs on `PATH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemDependency {
    /// Executable name probed on `PATH`.
    pub command: &'static str,
    /// Human-readable install instructions.
    pub install_hint: &'static str,
}

/// One way of running a provider locally.
#[derive(Debug, Clone, Copy)]
pub struct LocalDevOption {
    pub kind: LocalDevType,
    pub label: &'static str,
    pub description: &'static str,
    /// Placeholder values. A value starting with `#` is a prompt marker: the
    /// text after the `#` is shown to the user and the answer becomes the value.
    pub env_vars: &'static [(&'static str, &'static str)],
    /// Scripts merged into the database package's script manifest.
    pub package_scripts: &'static [(&'static str, &'static str)],
    /// Commands that must resolve on `PATH` before this option can be used.
    pub system_deps: &'static [SystemDependency],
}

impl LocalDevOption {
    /// Returns the prompt text when `value` is a `#`-prefixed marker.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbswitch_core::LocalDevOption;
    ///
    /// assert_eq!(
    ///     LocalDevOption::prompt_marker("# Neon pooled URL"),
    ///     Some("Neon pooled URL")
    /// );
    /// assert_eq!(LocalDevOption::prompt_marker("file:./dev.db"), None);
    /// ```
    pub fn prompt_marker(value: &str) -> Option<&str> {
        value.strip_prefix('#').map(str::trim)
    }

    /// Returns `true` when any env var needs user input.
    pub fn needs_input(&self) -> bool {
        self.env_vars
            .iter()
            .any(|(_, value)| Self::prompt_marker(value).is_some())
    }
}

/// An environment variable the deployed application requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvVarSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
    pub example: &'static str,
    /// Validator expression written into the env schema source.
    pub validator: &'static str,
}

/// Package changes applied to the database package.
#[derive(Debug, Clone, Copy)]
pub struct Dependencies {
    /// Package name and version range pairs.
    pub add: &'static [(&'static str, &'static str)],
    /// Packages removed if present.
    pub remove: &'static [&'static str],
}

impl Dependencies {
    /// `name@version` specs for the package manager's add command.
    pub fn add_specs(&self) -> Vec<String> {
        self.add
            .iter()
            .map(|(name, version)| format!("{name}@{version}"))
            .collect()
    }
}

/// Generated file bodies.
#[derive(Debug, Clone, Copy)]
pub struct Templates {
    /// Client bootstrap source.
    pub client: &'static str,
    /// Migration tool config source.
    pub migration_config: &'static str,
    /// Container compose descriptor, written only for container options.
    pub compose: Option<&'static str>,
}

/// A backend the application can be switched to.
#[derive(Debug, Clone, Copy)]
pub struct ProviderDefinition {
    pub id: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub data_model_provider: DataModelProvider,
    pub dependencies: Dependencies,
    /// Ordered; the first entry is the default choice.
    pub local_dev_options: &'static [LocalDevOption],
    pub production_env_vars: &'static [EnvVarSpec],
    pub templates: Templates,
    pub setup: SetupFn,
}

impl ProviderDefinition {
    /// Finds the local-dev option of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownLocalDev`] when the provider does not
    /// offer that option.
    pub fn local_dev_option(&self, kind: LocalDevType) -> Result<&LocalDevOption, CoreError> {
        self.local_dev_options
            .iter()
            .find(|option| option.kind == kind)
            .ok_or_else(|| CoreError::UnknownLocalDev {
                provider: self.id.to_string(),
                kind: kind.to_string(),
                known: self
                    .local_dev_options
                    .iter()
                    .map(|option| option.kind.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Returns the only option when the provider offers exactly one.
    pub fn sole_local_dev_option(&self) -> Option<&LocalDevOption> {
        match self.local_dev_options {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Names of the production env vars, in declaration order.
    pub fn env_var_names(&self) -> Vec<&'static str> {
        self.production_env_vars.iter().map(|var| var.name).collect()
    }

    /// Runs the provider's setup routine.
    pub fn run_setup(
        &self,
        option: &LocalDevOption,
        ctx: &mut dyn SetupContext,
    ) -> Result<EnvValues, SetupError> {
        (self.setup)(option, ctx)
    }
}
