//! Interactive editing of the env-validation schema.
//!
//! Edits accumulate in an [`EnvConfigSession`] and touch nothing until
//! [`EnvConfigSession::apply`], which writes the schema and regenerates
//! the global-env manifest from it in one write set.

use std::path::{Path, PathBuf};

use dbswitch_patch::{
    EnvVarDefinition, PendingWrite, SyncResult, add_vars, apply_writes, extract_var_names,
    is_valid_var_name, parse_definitions, read_or_empty, remove_vars, sync_global_env,
    unified_diff,
};
use tracing::{debug, info};

use crate::config::SwitchConfig;
use crate::console::Console;
use crate::error::{EngineError, Result};
use crate::lock::WriteLock;

/// Validator offered when adding a variable.
pub const DEFAULT_VALIDATOR: &str = "z.string()";

/// A pending change to the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvEdit {
    Add(EnvVarDefinition),
    Remove(String),
}

/// Pending edits over the env schema source.
#[derive(Debug)]
pub struct EnvConfigSession {
    schema_path: PathBuf,
    build_config_path: PathBuf,
    label: String,
    block: String,
    original: String,
    pending: Vec<EnvEdit>,
}

impl EnvConfigSession {
    /// Reads the schema.
    ///
    /// # Errors
    ///
    /// [`EngineError::Patch`] with a schema parse error when the
    /// declaration block cannot be located.
    pub fn open(root: &Path, config: &SwitchConfig) -> Result<Self> {
        let schema_path = root.join(&config.files.env_schema);
        let original = read_or_empty(&schema_path)?;
        extract_var_names(&original, &config.env_schema_block)?;
        Ok(Self {
            schema_path,
            build_config_path: root.join(&config.files.build_config),
            label: config.files.env_schema.display().to_string(),
            block: config.env_schema_block.clone(),
            original,
            pending: Vec::new(),
        })
    }

    pub fn pending(&self) -> &[EnvEdit] {
        &self.pending
    }

    /// Declarations as they would be after the pending edits.
    pub fn list(&self) -> Result<Vec<EnvVarDefinition>> {
        Ok(parse_definitions(&self.preview()?, &self.block)?)
    }

    /// Names as they would be after the pending edits, sorted.
    pub fn names(&self) -> Result<Vec<String>> {
        Ok(extract_var_names(&self.preview()?, &self.block)?)
    }

    /// Queues a new declaration.
    pub fn add(&mut self, def: EnvVarDefinition) -> Result<()> {
        if !is_valid_var_name(&def.name) {
            return Err(EngineError::InvalidVarName(def.name));
        }
        if self.names()?.contains(&def.name) {
            return Err(EngineError::DuplicateVar(def.name));
        }
        debug!(name = %def.name, "queued add");
        self.pending.push(EnvEdit::Add(def));
        Ok(())
    }

    /// Queues removal of a declaration.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        if !self.names()?.iter().any(|existing| existing == name) {
            return Err(EngineError::UnknownVar(name.to_string()));
        }
        debug!(name, "queued remove");
        self.pending.push(EnvEdit::Remove(name.to_string()));
        Ok(())
    }

    /// Schema source with the pending edits applied in order.
    pub fn preview(&self) -> Result<String> {
        let mut source = self.original.clone();
        for edit in &self.pending {
            source = match edit {
                EnvEdit::Add(def) => add_vars(&source, &self.block, std::slice::from_ref(def))?,
                EnvEdit::Remove(name) => remove_vars(&source, &self.block, &[name])?,
            };
        }
        Ok(source)
    }

    /// Unified diff of the pending edits; empty when they cancel out.
    pub fn diff(&self) -> Result<String> {
        Ok(unified_diff(&self.label, &self.original, &self.preview()?))
    }

    /// Writes the schema and the synced manifest.
    ///
    /// Returns `None` when the pending edits change nothing. Either both
    /// files are written or neither is.
    pub fn apply(&mut self, lock: &WriteLock) -> Result<Option<SyncResult>> {
        let schema = self.preview()?;
        if schema == self.original {
            self.pending.clear();
            return Ok(None);
        }

        let names = extract_var_names(&schema, &self.block)?;
        let mut writes = vec![PendingWrite::new(&self.schema_path, schema.clone())];
        let mut sync = SyncResult::default();
        if self.build_config_path.is_file() {
            let manifest = read_or_empty(&self.build_config_path)?;
            let (patched, result) = sync_global_env(&manifest, &names)?;
            if patched != manifest {
                writes.push(PendingWrite::new(&self.build_config_path, patched));
            }
            sync = result;
        }

        {
            let _guard = lock.hold();
            apply_writes(&writes)?;
        }
        info!(files = writes.len(), "env schema applied");
        self.original = schema;
        self.pending.clear();
        Ok(Some(sync))
    }
}

const MENU: [&str; 5] = [
    "List variables",
    "Add a variable",
    "Remove a variable",
    "Apply pending changes",
    "Quit",
];

/// The interactive `env-config` loop.
pub fn run_env_config(
    console: &mut dyn Console,
    root: &Path,
    config: &SwitchConfig,
    lock: &WriteLock,
) -> Result<()> {
    let mut session = EnvConfigSession::open(root, config)?;
    let items: Vec<String> = MENU.iter().map(|item| (*item).to_string()).collect();

    loop {
        let title = match session.pending().len() {
            0 => "env-config".to_string(),
            n => format!("env-config ({n} pending)"),
        };
        match console.select(&title, &items, 0)? {
            0 => list(console, &session)?,
            1 => {
                let def = prompt_definition(console)?;
                if let Err(err) = session.add(def) {
                    console.warn(&err.to_string());
                }
            }
            2 => {
                let names = session.names()?;
                if names.is_empty() {
                    console.info("No variables declared.");
                    continue;
                }
                let index = console.select("Variable to remove", &names, 0)?;
                if let Some(name) = names.get(index) {
                    session.remove(name)?;
                }
            }
            3 => apply(console, &mut session, lock)?,
            _ => {
                if session.pending().is_empty()
                    || console.confirm("Discard pending changes?", false)?
                {
                    return Ok(());
                }
            }
        }
    }
}

fn list(console: &mut dyn Console, session: &EnvConfigSession) -> Result<()> {
    for def in session.list()? {
        let comment = def
            .comment
            .as_deref()
            .map(|c| format!("  // {c}"))
            .unwrap_or_default();
        console.info(&format!("{}: {}{comment}", def.name, def.validator));
    }
    Ok(())
}

fn prompt_definition(console: &mut dyn Console) -> Result<EnvVarDefinition> {
    let name = console.input("Variable name", None)?.trim().to_uppercase();
    let validator = console.input("Validator", Some(DEFAULT_VALIDATOR))?;
    let optional = console.confirm("Optional?", false)?;
    let comment = console.input("Comment (blank for none)", Some(""))?;

    let mut def = EnvVarDefinition::new(name, validator.trim());
    if optional {
        def = def.optional();
    }
    if !comment.trim().is_empty() {
        def = def.with_comment(comment.trim());
    }
    Ok(def)
}

fn apply(console: &mut dyn Console, session: &mut EnvConfigSession, lock: &WriteLock) -> Result<()> {
    let diff = session.diff()?;
    if diff.is_empty() {
        console.info("Nothing to apply.");
        return Ok(());
    }
    console.show_diff(&session.label, &diff);
    if !console.confirm("Write these changes?", true)? {
        return Ok(());
    }
    if let Some(sync) = session.apply(lock)? {
        console.success("Env schema updated.");
        if !sync.added.is_empty() {
            let added: Vec<&str> = sync.added.iter().map(String::as_str).collect();
            console.info(&format!("globalEnv added: {}", added.join(", ")));
        }
        if !sync.removed.is_empty() {
            let removed: Vec<&str> = sync.removed.iter().map(String::as_str).collect();
            console.info(&format!("globalEnv removed: {}", removed.join(", ")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "export const env = createEnv({\n  server: {\n    // Auth secret\n    AUTH_SECRET: z.string(),\n  },\n});\n";

    fn session() -> (tempfile::TempDir, EnvConfigSession) {
        let dir = tempfile::tempdir().unwrap();
        let config = SwitchConfig::default();
        let path = dir.path().join(&config.files.env_schema);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, SCHEMA).unwrap();
        let session = EnvConfigSession::open(dir.path(), &config).unwrap();
        (dir, session)
    }

    #[test]
    fn test_add_rejects_bad_and_duplicate_names() {
        let (_dir, mut session) = session();
        assert!(matches!(
            session.add(EnvVarDefinition::new("lower", "z.string()")),
            Err(EngineError::InvalidVarName(_))
        ));
        assert!(matches!(
            session.add(EnvVarDefinition::new("AUTH_SECRET", "z.string()")),
            Err(EngineError::DuplicateVar(_))
        ));
        session.add(EnvVarDefinition::new("API_KEY", "z.string()")).unwrap();
        assert!(matches!(
            session.add(EnvVarDefinition::new("API_KEY", "z.string()")),
            Err(EngineError::DuplicateVar(_))
        ));
    }

    #[test]
    fn test_add_then_remove_cancels_out() {
        let (_dir, mut session) = session();
        session.add(EnvVarDefinition::new("API_KEY", "z.string()")).unwrap();
        session.remove("API_KEY").unwrap();
        assert_eq!(session.diff().unwrap(), "");
        assert_eq!(session.pending().len(), 2);
    }

    #[test]
    fn test_remove_unknown_is_an_error() {
        let (_dir, mut session) = session();
        assert!(matches!(session.remove("NOPE"), Err(EngineError::UnknownVar(_))));
    }

    #[test]
    fn test_list_reflects_pending_edits() {
        let (_dir, mut session) = session();
        session
            .add(EnvVarDefinition::new("API_KEY", "z.string()").optional())
            .unwrap();
        let defs = session.list().unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].comment.as_deref(), Some("Auth secret"));
        assert!(defs[1].optional);
    }
}
