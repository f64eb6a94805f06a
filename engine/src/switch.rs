//! The provider switch state machine.
//!
//! [`Switcher::run`] walks the [`Step`]s strictly in order. Steps before
//! [`Step::Backup`] never write; from there on every failure that aborts
//! the run first puts the write set back, so a failed switch leaves the
//! tree as it was.
//!
//! # Examples
//!
//! ```no_run
//! use std::path::Path;
//! use dbswitch_engine::{Console, CommandRunner, SwitchConfig, SwitchOptions, Switcher};
//!
//! fn switch(console: &mut dyn Console, runner: &mut dyn CommandRunner) {
//!     let root = Path::new(".");
//!     let config = SwitchConfig::load_or_default(root, None).unwrap();
//!     let options = SwitchOptions {
//!         provider: Some("postgres".to_string()),
//!         dry_run: true,
//!         ..Default::default()
//!     };
//!     Switcher::new(root, &config, console, runner).run(&options).unwrap();
//! }
//! ```

use std::fs;
use std::path::Path;

use dbswitch_core::{
    EnvValues, LocalDevOption, LocalDevType, ProviderDefinition, provider_choices,
    require_provider,
};
use dbswitch_patch::{Rollback, apply_writes};
use tracing::{debug, info, warn};

use crate::config::SwitchConfig;
use crate::console::Console;
use crate::error::{EngineError, Result};
use crate::git::{TreeState, ensure_directories_committed};
use crate::lock::WriteLock;
use crate::plan::{PlannedCommands, SwitchPlan, plan_switch};
use crate::runner::{CommandRunner, SetupBridge};
use crate::sysdeps::ensure_system_dependencies;

/// Orchestrator states, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    GitCheck,
    SelectProvider,
    SelectLocalDev,
    CheckSystemDeps,
    ProviderSetup,
    GenerateDiffs,
    PreviewAndConfirm,
    Backup,
    ApplyWrites,
    InstallDependencies,
    Migrate,
    ReportNextSteps,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GitCheck => "git-check",
            Self::SelectProvider => "select-provider",
            Self::SelectLocalDev => "select-local-dev",
            Self::CheckSystemDeps => "check-system-deps",
            Self::ProviderSetup => "provider-setup",
            Self::GenerateDiffs => "generate-diffs",
            Self::PreviewAndConfirm => "preview-and-confirm",
            Self::Backup => "backup",
            Self::ApplyWrites => "apply-writes",
            Self::InstallDependencies => "install-dependencies",
            Self::Migrate => "migrate",
            Self::ReportNextSteps => "report-next-steps",
        }
    }
}

/// Flags of the `db-switch` command.
#[derive(Debug, Clone, Default)]
pub struct SwitchOptions {
    /// Provider id; prompted for when `None`.
    pub provider: Option<String>,
    /// Local-dev type; auto-selected or prompted for when `None`.
    pub local: Option<LocalDevType>,
    /// Preview only.
    pub dry_run: bool,
    /// Skip confirmations, answering yes.
    pub yes: bool,
}

/// How the migration step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    Applied,
    /// The migration command failed; the switch itself stands.
    Failed,
    /// The operator kept the previous provider's history; nothing ran.
    KeptHistory,
}

/// Summary of an applied switch.
#[derive(Debug, Clone)]
pub struct SwitchReport {
    pub provider: &'static str,
    pub local_dev: LocalDevType,
    pub files_written: Vec<String>,
    pub migration: MigrationOutcome,
    pub next_steps: Vec<String>,
}

/// How a run ended without error.
#[derive(Debug)]
pub enum SwitchOutcome {
    /// Previewed only; nothing was written or run.
    DryRun(SwitchPlan),
    /// The operator declined the preview.
    Cancelled,
    /// Every managed file already matches the selection.
    NoChanges,
    Applied(SwitchReport),
}

/// Drives one provider switch.
pub struct Switcher<'a> {
    root: &'a Path,
    config: &'a SwitchConfig,
    console: &'a mut dyn Console,
    runner: &'a mut dyn CommandRunner,
    lock: WriteLock,
}

impl<'a> Switcher<'a> {
    pub fn new(
        root: &'a Path,
        config: &'a SwitchConfig,
        console: &'a mut dyn Console,
        runner: &'a mut dyn CommandRunner,
    ) -> Self {
        Self {
            root,
            config,
            console,
            runner,
            lock: WriteLock::new(),
        }
    }

    /// Shares `lock` with an interrupt handler.
    pub fn with_lock(mut self, lock: WriteLock) -> Self {
        self.lock = lock;
        self
    }

    /// Runs the switch.
    ///
    /// # Errors
    ///
    /// Gate failures (dirty tree, unknown provider or local-dev type,
    /// missing system dependencies, unpatchable sources) before anything is
    /// written; [`EngineError::Patch`] when a write fails (already rolled
    /// back); [`EngineError::Apply`] when adding the new packages fails
    /// (rolled back as well).
    pub fn run(&mut self, options: &SwitchOptions) -> Result<SwitchOutcome> {
        enter(Step::GitCheck);
        if ensure_directories_committed(&mut *self.runner, self.root, self.config)?
            == TreeState::NotARepository
        {
            self.console
                .warn("Not a git repository: proceeding with caution, backups are the only safety net.");
        }

        enter(Step::SelectProvider);
        let provider = self.select_provider(options.provider.as_deref())?;

        enter(Step::SelectLocalDev);
        let option = *self.select_local_dev(provider, options.local)?;

        enter(Step::CheckSystemDeps);
        ensure_system_dependencies(&*self.runner, option.system_deps)?;

        enter(Step::ProviderSetup);
        let env_values = self.provider_setup(provider, &option);

        enter(Step::GenerateDiffs);
        let plan = plan_switch(self.root, self.config, provider, &option, env_values)?;
        if plan.changes.is_empty() {
            self.console.success(&format!(
                "{} ({}) is already configured; nothing to change.",
                provider.display_name, option.label
            ));
            return Ok(SwitchOutcome::NoChanges);
        }

        enter(Step::PreviewAndConfirm);
        for change in &plan.changes {
            self.console.show_diff(&change.label, &change.diff);
        }
        if options.dry_run {
            self.console.info(&format!(
                "Dry run: {} file(s) would change. Commands that would run:",
                plan.changes.len()
            ));
            for cmd in plan.commands.all() {
                self.console.info(&format!("  {cmd}"));
            }
            return Ok(SwitchOutcome::DryRun(plan));
        }
        if !options.yes
            && !self.console.confirm(
                &format!("Apply {} change(s)?", plan.changes.len()),
                true,
            )?
        {
            self.console.info("Cancelled; no files were changed.");
            return Ok(SwitchOutcome::Cancelled);
        }

        let rollback = {
            let _guard = self.lock.hold();
            enter(Step::Backup);
            enter(Step::ApplyWrites);
            apply_writes(&plan.writes())?
        };
        let files_written: Vec<String> =
            plan.changes.iter().map(|change| change.label.clone()).collect();
        self.console
            .success(&format!("Updated {} file(s).", files_written.len()));

        enter(Step::InstallDependencies);
        self.install(&plan.commands, rollback)?;

        enter(Step::Migrate);
        let migration = self.migrate(&plan.commands, options.yes)?;

        enter(Step::ReportNextSteps);
        let next_steps = next_steps(self.config, &plan);
        self.console.success(&format!(
            "Switched to {} ({}).",
            provider.display_name, option.label
        ));
        self.console.info("Next steps:");
        for step in &next_steps {
            self.console.info(&format!("  - {step}"));
        }

        Ok(SwitchOutcome::Applied(SwitchReport {
            provider: provider.id,
            local_dev: option.kind,
            files_written,
            migration,
            next_steps,
        }))
    }

    fn select_provider(&mut self, id: Option<&str>) -> Result<&'static ProviderDefinition> {
        if let Some(id) = id {
            return Ok(require_provider(id)?);
        }
        let choices = provider_choices();
        let items: Vec<String> = choices
            .iter()
            .map(|choice| format!("{} - {}", choice.name, choice.description))
            .collect();
        let index = self.console.select("Database provider", &items, 0)?;
        let choice = choices
            .get(index)
            .ok_or_else(|| EngineError::Prompt(format!("no provider at index {index}")))?;
        Ok(require_provider(choice.value)?)
    }

    fn select_local_dev(
        &mut self,
        provider: &'static ProviderDefinition,
        kind: Option<LocalDevType>,
    ) -> Result<&'static LocalDevOption> {
        if let Some(kind) = kind {
            return Ok(provider.local_dev_option(kind)?);
        }
        if let Some(only) = provider.sole_local_dev_option() {
            debug!(kind = %only.kind, "single local-dev option; auto-selected");
            return Ok(only);
        }
        let items: Vec<String> = provider
            .local_dev_options
            .iter()
            .map(|option| format!("{} - {}", option.label, option.description))
            .collect();
        let index = self.console.select("Local development", &items, 0)?;
        provider
            .local_dev_options
            .get(index)
            .ok_or_else(|| EngineError::Prompt(format!("no local-dev option at index {index}")))
    }

    /// Runs the provider's setup; a failure degrades to empty values.
    fn provider_setup(
        &mut self,
        provider: &ProviderDefinition,
        option: &LocalDevOption,
    ) -> EnvValues {
        let mut bridge = SetupBridge {
            console: &mut *self.console,
            runner: &mut *self.runner,
            root: self.root,
            package_dir: self.root.join(self.config.db_package_dir()),
        };
        match provider.run_setup(option, &mut bridge) {
            Ok(values) => values,
            Err(err) => {
                warn!(provider = provider.id, error = %err, "provider setup failed");
                self.console.warn(&format!(
                    "Setup for {} failed ({err}); fill in the connection values in {} by hand.",
                    provider.display_name,
                    self.config.files.env_file.display()
                ));
                option
                    .env_vars
                    .iter()
                    .map(|(name, _)| ((*name).to_string(), String::new()))
                    .collect()
            }
        }
    }

    fn install(&mut self, commands: &PlannedCommands, rollback: Rollback) -> Result<()> {
        if let Some(remove) = &commands.remove {
            if let Err(err) = self.runner.run(remove) {
                warn!(error = %err, "removing old adapter packages failed");
                self.console.warn(&format!(
                    "Could not remove old adapter packages ({err}); remove them by hand if still listed."
                ));
            }
        }

        if let Some(add) = &commands.add {
            info!(command = %add, "adding adapter packages");
            if let Err(err) = self.runner.run(add) {
                let restored = {
                    let _guard = self.lock.hold();
                    match rollback.restore() {
                        Ok(()) => true,
                        Err(restore_err) => {
                            warn!(error = %restore_err, "rollback after failed install was incomplete");
                            false
                        }
                    }
                };
                return Err(EngineError::Apply {
                    source: Box::new(err),
                    restored,
                });
            }
        }

        for cmd in [&commands.install, &commands.generate] {
            info!(command = %cmd, "running");
            if let Err(err) = self.runner.run(cmd) {
                warn!(command = %cmd, error = %err, "post-switch command failed");
                self.console
                    .warn(&format!("`{cmd}` failed ({err}); run it again by hand."));
            }
        }
        Ok(())
    }

    fn migrate(&mut self, commands: &PlannedCommands, yes: bool) -> Result<MigrationOutcome> {
        let dir = self.root.join(&self.config.migrations_dir);
        if has_history(&dir) {
            let delete = yes
                || self.console.confirm(
                    "Existing migrations belong to the previous provider and will not apply. Delete them?",
                    true,
                )?;
            if !delete {
                self.console.warn(
                    "Keeping the old migration history; migrations may fail until it is removed.",
                );
                return Ok(MigrationOutcome::KeptHistory);
            }
            if let Err(err) = fs::remove_dir_all(&dir) {
                warn!(path = %dir.display(), error = %err, "could not delete migration history");
                self.console.warn(&format!(
                    "Could not delete {} ({err}); skipping the initial migration.",
                    dir.display()
                ));
                return Ok(MigrationOutcome::KeptHistory);
            }
            info!(path = %dir.display(), "deleted migration history");
        }

        match self.runner.run(&commands.migrate) {
            Ok(()) => Ok(MigrationOutcome::Applied),
            Err(err) => {
                warn!(error = %err, "initial migration failed");
                self.console.warn(&format!(
                    "Initial migration failed ({err}); run `{}` once the database is reachable.",
                    commands.migrate
                ));
                Ok(MigrationOutcome::Failed)
            }
        }
    }
}

fn enter(step: Step) {
    debug!(step = step.as_str(), "entering step");
}

fn has_history(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Follow-up instructions for the selected local-dev option.
pub fn next_steps(config: &SwitchConfig, plan: &SwitchPlan) -> Vec<String> {
    let run_script = |script: &str| {
        let mut parts = vec![config.package_manager.clone()];
        parts.extend(config.filter_args());
        parts.push("run".to_string());
        parts.push(script.to_string());
        parts.join(" ")
    };
    let env_file = config.files.env_file.display();
    let mut steps = Vec::new();

    match plan.option.kind {
        LocalDevType::LocalFile => {
            steps.push("The database file is created on the first migration; nothing to start.".to_string());
        }
        LocalDevType::ManagedDevServer => {
            steps.push(format!(
                "Start the local dev server with `{}` before running the app.",
                run_script("db:dev")
            ));
        }
        LocalDevType::Container => {
            steps.push(format!(
                "Start the database container with `{}`; stop it with `{}`.",
                run_script("db:start"),
                run_script("db:stop")
            ));
        }
        LocalDevType::VendorLocalStack => {
            steps.push("Start the local stack with `supabase start` (requires Docker).".to_string());
        }
        LocalDevType::Remote => {
            steps.push(format!(
                "Make sure the connection strings in {env_file} point at your hosted database."
            ));
        }
    }

    let blanks: Vec<&str> = plan
        .env_values
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name.as_str())
        .collect();
    if !blanks.is_empty() {
        steps.push(format!("Fill in {} in {env_file}.", blanks.join(", ")));
    }

    let production: Vec<&str> = plan.provider.env_var_names();
    steps.push(format!(
        "Set {} in your deployment environment.",
        production.join(", ")
    ));
    steps
}
