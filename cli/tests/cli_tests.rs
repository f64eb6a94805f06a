use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn settings(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_settings"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run settings")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn help_lists_every_subcommand() {
    let output = Command::new(env!("CARGO_BIN_EXE_settings"))
        .arg("--help")
        .output()
        .expect("failed to run settings");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["db-switch", "env-config", "env-links"] {
        assert!(stdout.contains(name), "missing {name} in:\n{stdout}");
    }
}

#[test]
fn invalid_local_type_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = settings(dir.path(), &["db-switch", "--local", "kubernetes"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("vendor-local-stack"));
}

#[test]
fn unknown_provider_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = settings(
        dir.path(),
        &["db-switch", "--provider", "mongodb", "--dry-run", "--yes"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error:"), "{}", stderr(&output));
}

#[test]
fn missing_root_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = settings(&dir.path().join("nowhere"), &["env-links"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("is not a directory"));
}

#[test]
fn env_links_without_source_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = settings(dir.path(), &["env-links"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains(".env"), "{}", stderr(&output));
}

#[cfg(unix)]
#[test]
fn env_links_links_explicit_targets() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join(".env"), "DATABASE_URL=\"file:./dev.db\"\n").unwrap();
    fs::create_dir_all(root.join("apps/web")).unwrap();
    fs::create_dir_all(root.join("apps/admin")).unwrap();

    let output = settings(root, &["env-links", "--targets", "apps/web, apps/admin"]);

    assert!(output.status.success(), "{}", stderr(&output));
    for target in ["apps/web", "apps/admin"] {
        let link = root.join(target).join(".env");
        assert_eq!(fs::read_link(&link).unwrap(), Path::new("../../.env"));
        assert!(fs::read_to_string(&link).unwrap().contains("DATABASE_URL"));
    }
}

#[cfg(unix)]
#[test]
fn env_links_reads_targets_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("shared.env"), "A=1\n").unwrap();
    fs::create_dir_all(root.join("services/api")).unwrap();
    fs::write(
        root.join("dbswitch.yml"),
        "env_links:\n  source: shared.env\n  targets:\n    - services/api\n    - services/missing\n",
    )
    .unwrap();

    let output = settings(root, &["env-links"]);

    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        fs::read_link(root.join("services/api/.env")).unwrap(),
        Path::new("../../shared.env")
    );
    assert!(stderr(&output).contains("services/missing"));
}
