//! Setup routines that turn a local-dev option into concrete env values.
//!
//! Routines never talk to the terminal or spawn processes directly; they go
//! through [`SetupContext`], which the engine implements on top of its
//! console and command runner.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::SetupError;
use crate::types::{EnvValues, LocalDevOption, LocalDevType};

/// Capabilities a setup routine may use.
pub trait SetupContext {
    /// Asks the user for a value.
    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String, SetupError>;

    /// Runs a command to completion and returns its stdout.
    fn capture(&mut self, program: &str, args: &[&str]) -> Result<String, SetupError>;

    /// Starts a long-running command in the database package, reads its
    /// output until every pattern has matched it, then stops it. Returns
    /// everything read so far, or `None` if the process exited first.
    fn capture_until(
        &mut self,
        program: &str,
        args: &[&str],
        patterns: &[&Regex],
    ) -> Result<Option<String>, SetupError>;
}

/// Accelerated endpoint printed by `prisma dev`.
static PROXIED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"prisma\+postgres://[^\s"'`]+"#).expect("static regex must compile")
});
/// Plain TCP endpoint; the boundary keeps it from matching inside the
/// proxied URL.
static DIRECT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)(?:^|[\s"'=:])(postgres(?:ql)?://[^\s"'`]+)"#)
        .expect("static regex must compile")
});

/// Default routine: literal values are kept, `#` markers become prompts.
///
/// # Examples
///
/// ```
/// use dbswitch_core::{get_provider, setup::resolve_placeholders, LocalDevType};
/// # use dbswitch_core::setup::SetupContext;
/// # use dbswitch_core::SetupError;
/// # struct NoPrompt;
/// # impl SetupContext for NoPrompt {
/// #     fn input(&mut self, _: &str, _: Option<&str>) -> Result<String, SetupError> { unreachable!() }
/// #     fn capture(&mut self, _: &str, _: &[&str]) -> Result<String, SetupError> { unreachable!() }
/// #     fn capture_until(&mut self, _: &str, _: &[&str], _: &[&regex::Regex])
/// #         -> Result<Option<String>, SetupError> { unreachable!() }
/// # }
///
/// let sqlite = get_provider("sqlite").unwrap();
/// let option = sqlite.local_dev_option(LocalDevType::LocalFile).unwrap();
/// let values = resolve_placeholders(option, &mut NoPrompt).unwrap();
/// assert_eq!(values["DATABASE_URL"], "file:./dev.db");
/// ```
pub fn resolve_placeholders(
    option: &LocalDevOption,
    ctx: &mut dyn SetupContext,
) -> Result<EnvValues, SetupError> {
    let mut values = EnvValues::new();
    for (name, value) in option.env_vars {
        let resolved = match LocalDevOption::prompt_marker(value) {
            Some(prompt) => ctx.input(&format!("{name} ({prompt})"), None)?,
            None => (*value).to_string(),
        };
        values.insert((*name).to_string(), resolved.trim().to_string());
    }
    Ok(values)
}

/// Prisma Postgres: boots `prisma dev` just long enough to read its URLs.
pub fn prisma_dev(
    option: &LocalDevOption,
    ctx: &mut dyn SetupContext,
) -> Result<EnvValues, SetupError> {
    if option.kind != LocalDevType::ManagedDevServer {
        return resolve_placeholders(option, ctx);
    }

    let no_url = || SetupError::NoConnectionString("prisma dev".to_string());
    let output = ctx
        .capture_until("npx", &["prisma", "dev"], &[&*PROXIED_URL, &*DIRECT_URL])?
        .ok_or_else(no_url)?;

    let primary_url = PROXIED_URL
        .find(&output)
        .map(|m| m.as_str().to_string())
        .ok_or_else(no_url)?;
    let direct_url = DIRECT_URL
        .captures(&output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(no_url)?;
    debug!(%primary_url, "prisma dev reported connection strings");

    let mut values = EnvValues::new();
    values.insert("DATABASE_URL".to_string(), primary_url);
    values.insert("DIRECT_URL".to_string(), direct_url);
    Ok(values)
}

/// Supabase: reads the running local stack's DB URL, falling back to the
/// documented defaults when the stack is not up yet.
pub fn supabase_status(
    option: &LocalDevOption,
    ctx: &mut dyn SetupContext,
) -> Result<EnvValues, SetupError> {
    if option.kind != LocalDevType::VendorLocalStack {
        return resolve_placeholders(option, ctx);
    }

    let mut values = resolve_placeholders(option, ctx)?;
    match ctx.capture("supabase", &["status", "-o", "env"]) {
        Ok(status) => {
            if let Some(url) = parse_env_line(&status, "DB_URL") {
                values.insert("DATABASE_URL".to_string(), url.clone());
                values.insert("DIRECT_URL".to_string(), url);
            }
        }
        Err(err) => {
            warn!(error = %err, "supabase stack not running; using default local URLs");
        }
    }
    Ok(values)
}

/// Reads `KEY="value"` or `KEY=value` from dotenv-style output.
pub(crate) fn parse_env_line(output: &str, key: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let (name, value) = line.trim().split_once('=')?;
        if name.trim() != key {
            return None;
        }
        let value = value.trim().trim_matches('"').trim_matches('\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}
