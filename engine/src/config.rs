//! Project configuration for the provider switch.
//!
//! Every path the switch reads or writes is configuration, relative to the
//! project root. A project without a config file gets the defaults below,
//! which match the usual monorepo layout (`packages/db`, `packages/auth`,
//! `packages/env`).
//!
//! # Example YAML
//!
//! ```yaml
//! package_manager: pnpm
//! db_package_filter: "@acme/db"
//! protected_dirs:
//!   - packages/db
//!   - packages/auth
//!   - packages/env
//! files:
//!   package_manifest: packages/db/package.json
//!   client: packages/db/src/client.ts
//!   data_model: packages/db/prisma/schema.prisma
//!   migration_config: packages/db/prisma.config.ts
//!   auth_adapter: packages/auth/src/auth.ts
//!   env_file: .env
//!   env_schema: packages/env/src/index.ts
//!   build_config: turbo.json
//!   readme: README.md
//!   compose: docker-compose.yml
//! migrations_dir: packages/db/prisma/migrations
//! env_schema_block: server
//! readme_markers:
//!   start: "<!-- db-provider:start -->"
//!   end: "<!-- db-provider:end -->"
//! env_links:
//!   source: .env
//!   targets:
//!     - apps/web
//!     - packages/db
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use dbswitch_patch::{README_END, README_START};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Config file looked up at the project root.
pub const CONFIG_FILE_NAME: &str = "dbswitch.yml";

/// Files the switch touches, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectFiles {
    /// Database package manifest (scripts and dependencies).
    pub package_manifest: PathBuf,
    /// Client bootstrap source, regenerated from the provider template.
    pub client: PathBuf,
    /// Data-model definition source.
    pub data_model: PathBuf,
    /// Migration tool config, regenerated from the provider template.
    pub migration_config: PathBuf,
    /// Auth adapter bootstrap; only its provider literal is patched.
    pub auth_adapter: PathBuf,
    /// Consolidated environment values.
    pub env_file: PathBuf,
    /// Env-validation declaration source.
    pub env_schema: PathBuf,
    /// Build orchestrator config carrying the global-env manifest.
    pub build_config: PathBuf,
    pub readme: PathBuf,
    /// Container compose descriptor, written for container options only.
    pub compose: PathBuf,
}

impl Default for ProjectFiles {
    fn default() -> Self {
        Self {
            package_manifest: "packages/db/package.json".into(),
            client: "packages/db/src/client.ts".into(),
            data_model: "packages/db/prisma/schema.prisma".into(),
            migration_config: "packages/db/prisma.config.ts".into(),
            auth_adapter: "packages/auth/src/auth.ts".into(),
            env_file: ".env".into(),
            env_schema: "packages/env/src/index.ts".into(),
            build_config: "turbo.json".into(),
            readme: "README.md".into(),
            compose: "docker-compose.yml".into(),
        }
    }
}

/// Delimiters of the generated README section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadmeMarkers {
    pub start: String,
    pub end: String,
}

impl Default for ReadmeMarkers {
    fn default() -> Self {
        Self {
            start: README_START.to_string(),
            end: README_END.to_string(),
        }
    }
}

/// Defaults for the `env-links` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvLinksConfig {
    /// The single env file every target links to.
    pub source: PathBuf,
    /// Directories that get a `.env` link.
    pub targets: Vec<PathBuf>,
}

impl Default for EnvLinksConfig {
    fn default() -> Self {
        Self {
            source: ".env".into(),
            targets: vec!["apps/web".into(), "apps/mobile".into(), "packages/db".into()],
        }
    }
}

/// Top-level switch configuration.
///
/// # Examples
///
/// ```
/// use dbswitch_engine::SwitchConfig;
///
/// let config: SwitchConfig = serde_yaml::from_str("package_manager: npm\n").unwrap();
/// assert_eq!(config.package_manager, "npm");
/// assert_eq!(config.env_schema_block, "server");
/// assert!(config.is_protected("packages/db/src/client.ts"));
/// assert!(!config.is_protected("apps/web/page.tsx"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    /// Package manager program (`pnpm`, `npm`, `yarn`, `bun`).
    pub package_manager: String,
    /// Workspace filter selecting the database package.
    pub db_package_filter: String,
    /// Directories that must be committed before a switch.
    pub protected_dirs: Vec<String>,
    pub files: ProjectFiles,
    /// Migration history of the current provider.
    pub migrations_dir: PathBuf,
    /// Name of the object block holding the env declarations.
    pub env_schema_block: String,
    pub readme_markers: ReadmeMarkers,
    pub env_links: EnvLinksConfig,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            package_manager: "pnpm".to_string(),
            db_package_filter: "@acme/db".to_string(),
            protected_dirs: vec![
                "packages/db".to_string(),
                "packages/auth".to_string(),
                "packages/env".to_string(),
            ],
            files: ProjectFiles::default(),
            migrations_dir: "packages/db/prisma/migrations".into(),
            env_schema_block: "server".to_string(),
            readme_markers: ReadmeMarkers::default(),
            env_links: EnvLinksConfig::default(),
        }
    }
}

impl SwitchConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::EngineError::Io) if the file cannot be read,
    /// or [`Yaml`](crate::EngineError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Loads `explicit` if given, else [`CONFIG_FILE_NAME`] under `root`
    /// when present, else the defaults.
    pub fn load_or_default(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = root.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            debug!(path = %candidate.display(), "loading switch config");
            Self::load(candidate)
        } else {
            debug!("no switch config found; using defaults");
            Ok(Self::default())
        }
    }

    /// Returns `true` if a root-relative path lies under a protected
    /// directory.
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_dirs.iter().any(|dir| {
            let dir = dir.trim_end_matches('/');
            dir.is_empty()
                || dir == "."
                || path == dir
                || path
                    .strip_prefix(dir)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Root-relative directory of the database package: the one holding
    /// its manifest.
    pub fn db_package_dir(&self) -> &Path {
        self.files
            .package_manifest
            .parent()
            .unwrap_or_else(|| Path::new(""))
    }

    /// Arguments selecting the database package for the package manager.
    pub fn filter_args(&self) -> Vec<String> {
        if self.db_package_filter.is_empty() {
            return Vec::new();
        }
        match self.package_manager.as_str() {
            "npm" => vec!["--workspace".to_string(), self.db_package_filter.clone()],
            "yarn" => vec!["workspace".to_string(), self.db_package_filter.clone()],
            _ => vec!["--filter".to_string(), self.db_package_filter.clone()],
        }
    }
}
