//! Candidate file contents and commands for a provider switch.
//!
//! Planning reads the project but never writes it. Every candidate whose
//! proposed content equals the current content is dropped here, so the
//! write set only ever holds files that actually change.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use dbswitch_core::{
    ADAPTER_PACKAGES, EnvValues, LocalDevOption, LocalDevType, ProviderDefinition,
    managed_env_var_names, managed_script_names,
};
use dbswitch_patch::{
    EnvVarDefinition, PendingWrite, add_vars, dependency_names, ensure_generator_compat,
    extract_var_names, merge_scripts, read_or_empty, remove_deprecated_url_field, remove_vars,
    replace_section, sync_global_env, unified_diff, update_adapter_provider,
    update_datasource_provider, upsert_env,
};
use tracing::{debug, warn};

use crate::config::SwitchConfig;
use crate::error::{EngineError, Result};
use crate::runner::CommandSpec;

/// One file that will change.
#[derive(Debug, Clone)]
pub struct FileChange {
    /// Root-relative path shown in previews.
    pub label: String,
    pub path: PathBuf,
    pub content: String,
    pub diff: String,
    /// The file does not exist yet.
    pub is_new: bool,
}

/// Package manager and migration commands run after the writes.
#[derive(Debug, Clone)]
pub struct PlannedCommands {
    /// Old adapter packages; `None` when none are installed.
    pub remove: Option<CommandSpec>,
    /// New adapter packages; failure rolls the switch back.
    pub add: Option<CommandSpec>,
    pub install: CommandSpec,
    pub generate: CommandSpec,
    pub migrate: CommandSpec,
}

impl PlannedCommands {
    /// Every command in execution order.
    pub fn all(&self) -> Vec<&CommandSpec> {
        self.remove
            .iter()
            .chain(self.add.iter())
            .chain([&self.install, &self.generate, &self.migrate])
            .collect()
    }
}

/// Everything a switch will do.
#[derive(Debug, Clone)]
pub struct SwitchPlan {
    pub provider: &'static ProviderDefinition,
    pub option: LocalDevOption,
    pub env_values: EnvValues,
    pub changes: Vec<FileChange>,
    pub commands: PlannedCommands,
}

impl SwitchPlan {
    /// The write set for the changed files.
    pub fn writes(&self) -> Vec<PendingWrite> {
        self.changes
            .iter()
            .map(|change| PendingWrite::new(&change.path, change.content.clone()))
            .collect()
    }
}

/// Computes candidate contents for every file the switch manages.
///
/// # Errors
///
/// Precondition failures only: a missing package manifest or data-model
/// source, an env schema without the declaration block, or a patch target
/// that cannot be located.
pub fn plan_switch(
    root: &Path,
    config: &SwitchConfig,
    provider: &'static ProviderDefinition,
    option: &LocalDevOption,
    env_values: EnvValues,
) -> Result<SwitchPlan> {
    let files = &config.files;
    let dialect = provider.data_model_provider;
    let mut changes = Changes::new(root);

    changes.propose(&files.client, provider.templates.client.to_string())?;
    changes.propose(
        &files.migration_config,
        provider.templates.migration_config.to_string(),
    )?;

    if let Some(current) = changes.read_optional(&files.auth_adapter)? {
        changes.propose(
            &files.auth_adapter,
            update_adapter_provider(&current, dialect)?,
        )?;
    } else {
        warn!(path = %files.auth_adapter.display(), "auth adapter not found; skipping");
    }

    let manifest = changes.read_required(&files.package_manifest)?;
    let stale_scripts = managed_script_names();
    changes.propose(
        &files.package_manifest,
        merge_scripts(&manifest, option.package_scripts, &stale_scripts)?,
    )?;

    let own_vars = provider.env_var_names();
    let foreign_vars: Vec<&str> = managed_env_var_names()
        .into_iter()
        .filter(|name| !own_vars.contains(name) && !env_values.contains_key(*name))
        .collect();

    let env_file = changes.read(&files.env_file)?;
    changes.propose(
        &files.env_file,
        upsert_env(&env_file, &env_values, &foreign_vars),
    )?;

    let schema = changes.read_required(&files.data_model)?;
    let schema = update_datasource_provider(&schema, dialect)?;
    let schema = remove_deprecated_url_field(&ensure_generator_compat(&schema));
    changes.propose(&files.data_model, schema)?;

    if let Some(readme) = changes.read_optional(&files.readme)? {
        let markers = &config.readme_markers;
        let body = readme_section(provider, option);
        changes.propose(
            &files.readme,
            replace_section(&readme, &markers.start, &markers.end, &body),
        )?;
    }

    if option.kind == LocalDevType::Container {
        if let Some(compose) = provider.templates.compose {
            changes.propose(&files.compose, compose.to_string())?;
        }
    }

    let block = &config.env_schema_block;
    let env_schema = changes.read(&files.env_schema)?;
    let definitions: Vec<EnvVarDefinition> = provider
        .production_env_vars
        .iter()
        .map(|var| {
            let def = EnvVarDefinition::new(var.name, var.validator).with_comment(var.description);
            if var.required { def } else { def.optional() }
        })
        .collect();
    let env_schema = add_vars(
        &remove_vars(&env_schema, block, &foreign_vars)?,
        block,
        &definitions,
    )?;
    let names = extract_var_names(&env_schema, block)?;
    changes.propose(&files.env_schema, env_schema)?;

    if let Some(build_config) = changes.read_optional(&files.build_config)? {
        let (patched, sync) = sync_global_env(&build_config, &names)?;
        debug!(added = ?sync.added, removed = ?sync.removed, "global env manifest synced");
        changes.propose(&files.build_config, patched)?;
    }

    let installed = dependency_names(&manifest)?;
    let commands = plan_commands(root, config, provider, &installed);

    Ok(SwitchPlan {
        provider,
        option: *option,
        env_values,
        changes: changes.into_inner(),
        commands,
    })
}

fn plan_commands(
    root: &Path,
    config: &SwitchConfig,
    provider: &ProviderDefinition,
    installed: &BTreeSet<String>,
) -> PlannedCommands {
    let adding: Vec<&str> = provider.dependencies.add.iter().map(|(name, _)| *name).collect();
    let removing: BTreeSet<&str> = provider
        .dependencies
        .remove
        .iter()
        .chain(ADAPTER_PACKAGES)
        .copied()
        .filter(|name| !adding.contains(name) && installed.contains(*name))
        .collect();

    let package_cmd = |subcommand: &str, packages: Vec<String>| {
        CommandSpec::new(&config.package_manager)
            .args(config.filter_args())
            .arg(subcommand)
            .args(packages)
            .current_dir(root)
    };

    let specs = provider.dependencies.add_specs();
    PlannedCommands {
        remove: (!removing.is_empty()).then(|| {
            package_cmd("remove", removing.iter().map(|s| s.to_string()).collect())
        }),
        add: (!specs.is_empty()).then(|| package_cmd("add", specs)),
        install: CommandSpec::new(&config.package_manager)
            .arg("install")
            .current_dir(root),
        generate: exec_cmd(root, config, &["prisma", "generate"]),
        migrate: exec_cmd(root, config, &["prisma", "migrate", "dev", "--name", "init"]),
    }
}

fn exec_cmd(root: &Path, config: &SwitchConfig, tool: &[&str]) -> CommandSpec {
    let mut cmd = CommandSpec::new(&config.package_manager)
        .args(config.filter_args())
        .arg("exec");
    if config.package_manager == "npm" {
        cmd = cmd.arg("--");
    }
    cmd.args(tool.iter().copied()).current_dir(root)
}

/// Markdown written between the README markers.
pub fn readme_section(provider: &ProviderDefinition, option: &LocalDevOption) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Database\n");
    let _ = writeln!(
        out,
        "This project uses **{}** ({}).\n",
        provider.display_name, provider.description
    );
    let _ = writeln!(
        out,
        "Local development: **{}**, {}.\n",
        option.label, option.description
    );
    if !option.package_scripts.is_empty() {
        for (name, command) in option.package_scripts {
            let _ = writeln!(out, "- `{name}`: `{command}`");
        }
        out.push('\n');
    }
    let _ = writeln!(out, "| Variable | Required | Example |");
    let _ = writeln!(out, "|---|---|---|");
    for var in provider.production_env_vars {
        let required = if var.required { "yes" } else { "no" };
        let _ = writeln!(out, "| `{}` | {required} | `{}` |", var.name, var.example);
    }
    out
}

/// Accumulates changed files, skipping identical content.
struct Changes<'a> {
    root: &'a Path,
    changes: Vec<FileChange>,
}

impl<'a> Changes<'a> {
    fn new(root: &'a Path) -> Self {
        Self {
            root,
            changes: Vec::new(),
        }
    }

    /// Current content, or empty when the file is missing.
    fn read(&self, relative: &Path) -> Result<String> {
        Ok(read_or_empty(&self.root.join(relative))?)
    }

    fn read_optional(&self, relative: &Path) -> Result<Option<String>> {
        let path = self.root.join(relative);
        if path.is_file() {
            Ok(Some(fs::read_to_string(path)?))
        } else {
            Ok(None)
        }
    }

    fn read_required(&self, relative: &Path) -> Result<String> {
        self.read_optional(relative)?
            .ok_or_else(|| EngineError::MissingProjectFile(relative.to_path_buf()))
    }

    fn propose(&mut self, relative: &Path, content: String) -> Result<()> {
        let path = self.root.join(relative);
        let is_new = !path.exists();
        let current = self.read(relative)?;
        let label = relative.display().to_string();
        let diff = unified_diff(&label, &current, &content);
        if diff.is_empty() {
            debug!(file = %label, "unchanged");
            return Ok(());
        }
        debug!(file = %label, is_new, "changed");
        self.changes.push(FileChange {
            label,
            path,
            content,
            diff,
            is_new,
        });
        Ok(())
    }

    fn into_inner(self) -> Vec<FileChange> {
        self.changes
    }
}
