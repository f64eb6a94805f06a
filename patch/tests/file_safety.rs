//! Backup, restore and write-set behaviour against a real directory tree.

use std::fs;
use std::io;
use std::path::PathBuf;

use dbswitch_patch::{PatchError, PendingWrite, apply_writes, apply_writes_with, backup, restore};
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().unwrap();
    let paths = files
        .iter()
        .map(|(name, content)| {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, content).unwrap();
            path
        })
        .collect();
    (dir, paths)
}

#[test]
fn restore_after_overwrite_yields_original_content() {
    let original = "DATABASE_URL=\"file:./dev.db\"\n# ünïcode stays\n";
    let (_dir, paths) = project(&[(".env", original)]);

    let backups = backup(&paths).unwrap();
    fs::write(&paths[0], "garbage").unwrap();
    restore(&backups).unwrap();

    assert_eq!(fs::read_to_string(&paths[0]).unwrap(), original);
    assert_eq!(backups[0].original_content, original);
}

#[test]
fn failed_write_rolls_back_every_file() {
    let originals = [
        ("packages/db/package.json", "{ \"name\": \"@acme/db\" }\n"),
        ("packages/db/prisma/schema.prisma", "datasource db {}\n"),
        ("packages/db/src/client.ts", "export const db = 1;\n"),
        ("apps/web/.env", "A=1\n"),
    ];
    let (_dir, paths) = project(&originals);
    let writes: Vec<PendingWrite> = paths
        .iter()
        .map(|path| PendingWrite::new(path, "rewritten\n"))
        .collect();

    for fail_at in 1..=writes.len() {
        let mut calls = 0;
        let err = apply_writes_with(&writes, |path, content| {
            calls += 1;
            if calls == fail_at {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            fs::write(path, content)
        })
        .unwrap_err();

        match err {
            PatchError::Write { path, restored, .. } => {
                assert_eq!(path, paths[fail_at - 1]);
                assert!(restored);
            }
            other => panic!("unexpected error: {other}"),
        }
        for (path, (_, original)) in paths.iter().zip(originals) {
            assert_eq!(fs::read_to_string(path).unwrap(), original);
        }
    }
}

#[test]
fn missing_backup_source_aborts_before_writing() {
    let (dir, paths) = project(&[("a.txt", "a")]);
    let err = backup(&[paths[0].clone(), dir.path().join("b.txt")]).unwrap_err();
    assert!(matches!(err, PatchError::Backup { .. }));
    assert_eq!(fs::read_to_string(&paths[0]).unwrap(), "a");
}

#[test]
fn rollback_after_success_undoes_whole_set() {
    let (dir, paths) = project(&[("package.json", "{}\n")]);
    let compose = dir.path().join("docker-compose.yml");
    let writes = vec![
        PendingWrite::new(&paths[0], "{ \"scripts\": {} }\n"),
        PendingWrite::new(&compose, "services: {}\n"),
    ];

    let rollback = apply_writes(&writes).unwrap();
    assert_eq!(rollback.backups().len(), 1);
    assert_eq!(rollback.created_files(), [compose.clone()]);

    rollback.restore().unwrap();
    assert_eq!(fs::read_to_string(&paths[0]).unwrap(), "{}\n");
    assert!(!compose.exists());
}

#[test]
fn new_file_left_by_failed_write_is_removed() {
    let (dir, paths) = project(&[("package.json", "{}\n")]);
    let compose = dir.path().join("docker-compose.yml");
    let writes = vec![
        PendingWrite::new(&paths[0], "{ \"scripts\": {} }\n"),
        PendingWrite::new(&compose, "services: {}\n"),
    ];

    let err = apply_writes_with(&writes, |path, content| {
        if path == compose {
            // Created and truncated, then the device fills up.
            fs::write(path, "")?;
            return Err(io::Error::other("disk full"));
        }
        fs::write(path, content)
    })
    .unwrap_err();

    assert!(matches!(err, PatchError::Write { restored: true, .. }));
    assert!(!compose.exists());
    assert_eq!(fs::read_to_string(&paths[0]).unwrap(), "{}\n");
}
