//! Scripted console, fake command runner and a fixture project.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use dbswitch_core::get_provider;
use dbswitch_engine::{CommandRunner, CommandSpec, Console, EngineError, Result, SwitchConfig};
use regex::Regex;
use tempfile::TempDir;

#[derive(Default)]
pub struct ScriptedConsole {
    pub selections: VecDeque<usize>,
    pub confirms: VecDeque<bool>,
    pub inputs: VecDeque<String>,
    pub diffs: Vec<(String, String)>,
    pub infos: Vec<String>,
    pub successes: Vec<String>,
    pub warnings: Vec<String>,
}

impl ScriptedConsole {
    pub fn with_selections(selections: &[usize]) -> Self {
        Self {
            selections: selections.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl Console for ScriptedConsole {
    fn select(&mut self, prompt: &str, items: &[String], _default: usize) -> Result<usize> {
        let index = self
            .selections
            .pop_front()
            .ok_or_else(|| EngineError::Prompt(format!("unexpected select: {prompt}")))?;
        assert!(index < items.len(), "selection {index} out of range for {prompt}");
        Ok(index)
    }

    fn confirm(&mut self, prompt: &str, _default: bool) -> Result<bool> {
        self.confirms
            .pop_front()
            .ok_or_else(|| EngineError::Prompt(format!("unexpected confirm: {prompt}")))
    }

    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        match self.inputs.pop_front() {
            Some(answer) if answer.is_empty() => Ok(default.unwrap_or_default().to_string()),
            Some(answer) => Ok(answer),
            None => Err(EngineError::Prompt(format!("unexpected input: {prompt}"))),
        }
    }

    fn info(&mut self, message: &str) {
        self.infos.push(message.to_string());
    }

    fn success(&mut self, message: &str) {
        self.successes.push(message.to_string());
    }

    fn warn(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    fn show_diff(&mut self, label: &str, diff: &str) {
        self.diffs.push((label.to_string(), diff.to_string()));
    }
}

/// Records every command; git answers come from fields.
pub struct FakeRunner {
    /// `None` means "not a repository".
    pub git_prefix: Option<String>,
    pub git_status: String,
    pub missing_commands: Vec<String>,
    /// Commands whose rendered form contains one of these fail.
    pub failing: Vec<String>,
    pub ran: Vec<String>,
    /// Output of long-running dev servers, delivered line by line.
    pub dev_server_output: Option<String>,
    /// Working directories long-running commands were started in.
    pub started_in: Vec<PathBuf>,
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self {
            git_prefix: Some(String::new()),
            git_status: String::new(),
            missing_commands: Vec::new(),
            failing: Vec::new(),
            ran: Vec::new(),
            dev_server_output: None,
            started_in: Vec::new(),
        }
    }
}

impl FakeRunner {
    fn failure(cmd: &CommandSpec) -> EngineError {
        EngineError::Command {
            program: cmd.program.clone(),
            status: "exit status: 1".to_string(),
        }
    }

    pub fn ran_matching(&self, needle: &str) -> bool {
        self.ran.iter().any(|line| line.contains(needle))
    }
}

impl CommandRunner for FakeRunner {
    fn run(&mut self, cmd: &CommandSpec) -> Result<()> {
        let line = cmd.to_string();
        self.ran.push(line.clone());
        if self.failing.iter().any(|needle| line.contains(needle.as_str())) {
            return Err(Self::failure(cmd));
        }
        Ok(())
    }

    fn capture(&mut self, cmd: &CommandSpec) -> Result<String> {
        match (cmd.program.as_str(), cmd.args.first().map(String::as_str)) {
            ("git", Some("rev-parse")) => self.git_prefix.clone().ok_or_else(|| Self::failure(cmd)),
            ("git", Some("status")) => Ok(self.git_status.clone()),
            _ => Err(Self::failure(cmd)),
        }
    }

    fn capture_until(&mut self, cmd: &CommandSpec, patterns: &[&Regex]) -> Result<Option<String>> {
        self.ran.push(cmd.to_string());
        self.started_in.extend(cmd.cwd.clone());
        let Some(output) = self.dev_server_output.take() else {
            return Ok(None);
        };
        let mut collected = String::new();
        for line in output.split_inclusive('\n') {
            collected.push_str(line);
            if patterns.iter().all(|pattern| pattern.is_match(&collected)) {
                return Ok(Some(collected));
            }
        }
        Ok(None)
    }

    fn command_exists(&self, command: &str) -> bool {
        !self.missing_commands.iter().any(|missing| missing == command)
    }
}

pub const PACKAGE_JSON: &str = r#"{
  "name": "@acme/db",
  "scripts": {
    "build": "tsc"
  },
  "dependencies": {
    "@prisma/adapter-better-sqlite3": "^6.16.0",
    "@prisma/client": "^6.16.0"
  },
  "devDependencies": {
    "prisma": "^6.16.0"
  }
}
"#;

pub const SCHEMA_PRISMA: &str = r#"generator client {
  provider = "prisma-client-js"
}

datasource db {
  provider = "sqlite"
  url      = env("DATABASE_URL")
}

model User {
  id    String @id @default(cuid())
  email String @unique
}
"#;

pub const AUTH_TS: &str = r#"import { betterAuth } from "better-auth";
import { prismaAdapter } from "better-auth/adapters/prisma";

import { db } from "@acme/db";

export const auth = betterAuth({
  database: prismaAdapter(db, {
    provider: "sqlite",
  }),
});
"#;

pub const ENV_FILE: &str = "# Shared environment\nAUTH_SECRET=\"s3cret\"\nDATABASE_URL=\"file:./dev.db\"\n";

pub const ENV_SCHEMA: &str = r#"import { createEnv } from "@t3-oss/env-core";
import { z } from "zod";

export const env = createEnv({
  server: {
    // Session signing secret
    AUTH_SECRET: z.string(),

    // Path or URL of the SQLite database file
    DATABASE_URL: z.string().min(1),
  },
  runtimeEnv: process.env,
});
"#;

pub const TURBO_JSON: &str = r#"{
  "$schema": "https://turbo.build/schema.json",
  "globalEnv": [
    "AUTH_SECRET",
    "DATABASE_URL"
  ],
  "tasks": {}
}
"#;

pub const README: &str = "# Acme\n\n<!-- db-provider:start -->\nSQLite\n<!-- db-provider:end -->\n\nMore docs.\n";

/// A monorepo currently on SQLite, with one migration in its history.
pub fn sqlite_project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let config = SwitchConfig::default();
    let sqlite = get_provider("sqlite").unwrap();
    let files = &config.files;
    let fixtures: [(&Path, &str); 9] = [
        (&files.package_manifest, PACKAGE_JSON),
        (&files.client, sqlite.templates.client),
        (&files.migration_config, sqlite.templates.migration_config),
        (&files.data_model, SCHEMA_PRISMA),
        (&files.auth_adapter, AUTH_TS),
        (&files.env_file, ENV_FILE),
        (&files.env_schema, ENV_SCHEMA),
        (&files.build_config, TURBO_JSON),
        (&files.readme, README),
    ];
    for (relative, content) in fixtures {
        write(dir.path(), relative, content);
    }
    write(
        dir.path(),
        &config.migrations_dir.join("20250101000000_init/migration.sql"),
        "CREATE TABLE \"User\" (\"id\" TEXT NOT NULL PRIMARY KEY);\n",
    );
    dir
}

pub fn write(root: &Path, relative: &Path, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

pub fn read(root: &Path, relative: impl AsRef<Path>) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}

/// Every file under `root` with its content.
pub fn snapshot(root: &Path) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let key = path.strip_prefix(root).unwrap().display().to_string();
                out.insert(key, fs::read_to_string(&path).unwrap());
            }
        }
    }
    out
}
