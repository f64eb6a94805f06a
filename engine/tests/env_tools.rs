mod common;

use std::fs;
use std::path::PathBuf;

use common::{ScriptedConsole, read, sqlite_project};
use dbswitch_engine::{
    EngineError, EnvConfigSession, LinkStatus, SwitchConfig, WriteLock, link_env_files,
    run_env_config,
};
use dbswitch_patch::EnvVarDefinition;

#[test]
fn env_config_apply_writes_schema_and_syncs_manifest() {
    let project = sqlite_project();
    let root = project.path();
    let config = SwitchConfig::default();
    let mut session = EnvConfigSession::open(root, &config).unwrap();

    session
        .add(EnvVarDefinition::new("RESEND_API_KEY", "z.string()").with_comment("Transactional email"))
        .unwrap();
    session.remove("AUTH_SECRET").unwrap();
    assert!(read(root, "turbo.json").contains("AUTH_SECRET"));

    let sync = session.apply(&WriteLock::new()).unwrap().unwrap();

    assert_eq!(sync.added.iter().collect::<Vec<_>>(), ["RESEND_API_KEY"]);
    assert_eq!(sync.removed.iter().collect::<Vec<_>>(), ["AUTH_SECRET"]);
    let schema = read(root, "packages/env/src/index.ts");
    assert!(schema.contains("    // Transactional email\n    RESEND_API_KEY: z.string(),\n"));
    assert!(!schema.contains("AUTH_SECRET"));
    assert!(!schema.contains("Session signing secret"));
    let turbo = read(root, "turbo.json");
    assert!(turbo.contains("\"DATABASE_URL\",\n    \"RESEND_API_KEY\""));
    assert!(session.pending().is_empty());
}

#[test]
fn env_config_apply_with_nothing_pending_is_a_noop() {
    let project = sqlite_project();
    let config = SwitchConfig::default();
    let mut session = EnvConfigSession::open(project.path(), &config).unwrap();
    assert_eq!(session.apply(&WriteLock::new()).unwrap(), None);
}

#[test]
fn env_config_requires_the_declaration_block() {
    let project = sqlite_project();
    let config = SwitchConfig {
        env_schema_block: "client".to_string(),
        ..SwitchConfig::default()
    };
    let err = EnvConfigSession::open(project.path(), &config).unwrap_err();
    assert!(matches!(err, EngineError::Patch(_)));
}

#[test]
fn interactive_env_config_adds_and_applies() {
    let project = sqlite_project();
    let root = project.path();
    let config = SwitchConfig::default();
    // add, apply, quit
    let mut console = ScriptedConsole::with_selections(&[1, 3, 4]);
    console.inputs.extend([
        "sentry_dsn".to_string(),
        "z.string().url()".to_string(),
        String::new(),
    ]);
    console.confirms.extend([true, true]);

    run_env_config(&mut console, root, &config, &WriteLock::new()).unwrap();

    let schema = read(root, "packages/env/src/index.ts");
    assert!(schema.contains("SENTRY_DSN: z.string().url().optional(),"));
    assert_eq!(console.diffs.len(), 1);
    assert!(console.infos.iter().any(|line| line == "globalEnv added: SENTRY_DSN"));
}

#[test]
fn interactive_env_config_reports_invalid_names() {
    let project = sqlite_project();
    let root = project.path();
    let before = read(root, "packages/env/src/index.ts");
    let mut console = ScriptedConsole::with_selections(&[1, 4]);
    console.inputs.extend(["9LIVES".to_string(), String::new(), String::new()]);
    console.confirms.push_back(false);

    run_env_config(&mut console, root, &SwitchConfig::default(), &WriteLock::new()).unwrap();

    assert!(console.warnings[0].contains("invalid variable name '9LIVES'"));
    assert_eq!(read(root, "packages/env/src/index.ts"), before);
}

#[test]
fn env_links_require_existing_source() {
    let project = sqlite_project();
    let err = link_env_files(project.path(), "missing.env".as_ref(), &[]).unwrap_err();
    assert!(matches!(err, EngineError::MissingEnvSource(_)));
}

#[cfg(unix)]
#[test]
fn env_links_create_replace_and_skip() {
    let project = sqlite_project();
    let root = project.path();
    for dir in ["apps/web", "apps/mobile", "packages/db"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    std::os::unix::fs::symlink("../../old.env", root.join("apps/mobile/.env")).unwrap();
    fs::write(root.join("packages/db/.env"), "LOCAL=1\n").unwrap();

    let targets: Vec<PathBuf> = ["apps/web", "./apps/mobile", "packages/db", "apps/docs"]
        .iter()
        .map(PathBuf::from)
        .collect();
    let reports = link_env_files(root, ".env".as_ref(), &targets).unwrap();

    let statuses: Vec<&LinkStatus> = reports.iter().map(|report| &report.status).collect();
    assert_eq!(
        statuses,
        [
            &LinkStatus::Created,
            &LinkStatus::Replaced {
                previous: PathBuf::from("../../old.env")
            },
            &LinkStatus::SkippedRegularFile,
            &LinkStatus::MissingTarget,
        ]
    );
    assert_eq!(
        fs::read_link(root.join("apps/web/.env")).unwrap(),
        PathBuf::from("../../.env")
    );
    assert_eq!(read(root, "apps/mobile/.env"), read(root, ".env"));
    assert_eq!(read(root, "packages/db/.env"), "LOCAL=1\n");

    let again = link_env_files(root, ".env".as_ref(), &targets[..1]).unwrap();
    assert_eq!(again[0].status, LinkStatus::Unchanged);
}
