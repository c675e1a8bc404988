//! Local Command Execution Tests
//!
//! Runs resolved commands against a throwaway `$GPHOME` whose `bin/` holds
//! small shell scripts standing in for the real utilities.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use gpmgmt_core::application::{get_postgres_gp_version, start_cluster, CommandRunner};
use gpmgmt_core::domain::commands::{Initdb, Postgres};
use gpmgmt_infra_system::SubprocessExecutor;

fn install_script(gp_home: &Path, name: &str, body: &str) {
    let bin = gp_home.join("bin");
    std::fs::create_dir_all(&bin).unwrap();

    let path = bin.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn runner() -> CommandRunner {
    CommandRunner::new(Arc::new(SubprocessExecutor::new())).with_timeout(Duration::from_secs(10))
}

#[tokio::test]
async fn test_gp_version_from_real_binary() {
    let gp_home = tempfile::tempdir().unwrap();
    install_script(gp_home.path(), "postgres", r#"echo "   test-version-1234   ""#);

    let version = get_postgres_gp_version(&runner(), gp_home.path()).await.unwrap();

    assert_eq!(version, "test-version-1234");
}

#[tokio::test]
async fn test_failing_binary_reports_exit_code_and_stderr() {
    let gp_home = tempfile::tempdir().unwrap();
    install_script(gp_home.path(), "postgres", "echo failure >&2\nexit 1");

    let options = Postgres {
        gp_version: true,
        ..Default::default()
    };
    let err = runner().run(&options, gp_home.path()).await.unwrap_err();

    assert_eq!(err.exit_code(), Some(1));
    assert_eq!(err.output().unwrap().stderr_lossy().trim(), "failure");
}

#[tokio::test]
async fn test_missing_binary_is_spawn_failure() {
    let gp_home = tempfile::tempdir().unwrap();

    let options = Initdb {
        pg_data: "pgdata".to_string(),
        ..Default::default()
    };
    let err = runner().run(&options, gp_home.path()).await.unwrap_err();

    assert!(err.is_spawn_failure(), "unexpected error: {err}");
    assert_eq!(err.exit_code(), None);
}

#[tokio::test]
async fn test_arguments_arrive_as_separate_tokens() {
    let gp_home = tempfile::tempdir().unwrap();
    install_script(gp_home.path(), "initdb", r#"for arg in "$@"; do echo "[$arg]"; done"#);

    let options = Initdb {
        pg_data: "/data/with space".to_string(),
        data_checksums: true,
        wal_segsize: Some(0),
        ..Default::default()
    };
    let output = runner().run(&options, gp_home.path()).await.unwrap();

    assert_eq!(
        output.stdout_lossy(),
        "[--pgdata]\n[/data/with space]\n[--data-checksums]\n[--wal-segsize]\n[0]\n"
    );
}

#[tokio::test]
async fn test_start_cluster_passes_data_directory() {
    let gp_home = tempfile::tempdir().unwrap();
    install_script(gp_home.path(), "gpstart", r#"echo "$@""#);

    let output = start_cluster(&runner(), gp_home.path(), "/data/coordinator", false)
        .await
        .unwrap();

    assert_eq!(output.stdout_lossy().trim(), "-a -d /data/coordinator");
}

#[tokio::test]
async fn test_slow_binary_times_out() {
    let gp_home = tempfile::tempdir().unwrap();
    install_script(gp_home.path(), "postgres", "sleep 5");

    let runner = CommandRunner::new(Arc::new(SubprocessExecutor::new()))
        .with_timeout(Duration::from_millis(200));
    let err = get_postgres_gp_version(&runner, gp_home.path()).await.unwrap_err();

    assert!(err.command_error().unwrap().is_timeout(), "unexpected error: {err}");
}
