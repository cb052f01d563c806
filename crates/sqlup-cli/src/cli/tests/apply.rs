//! Tests for `apply`.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn cli_parse_apply_minimal() {
    match parse(&["sqlup", "apply", "--script", "init.sql", "--db", "app.db"]).command {
        CliCommand::Apply(args) => {
            assert_eq!(args.script, "init.sql");
            assert_eq!(args.db, "app.db");
            assert!(args.app_dir.is_none());
            assert!(args.base_url.is_none());
            assert!(args.pwd.is_none());
            assert!(args.sha256.is_none());
            assert!(!args.cold_run);
        }
        _ => panic!("expected Apply"),
    }
}

#[test]
fn cli_parse_apply_full() {
    let cli = parse(&[
        "sqlup",
        "--config",
        "/etc/sqlup.toml",
        "apply",
        "--script",
        "v2/patch.sql",
        "--db",
        "data/app.db",
        "--app-dir",
        "/opt/app",
        "--base-url",
        "https://updates.example.com/app/",
        "--pwd",
        "s3cret",
        "--sha256",
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        "--cold-run",
    ]);
    assert_eq!(cli.config, Some(PathBuf::from("/etc/sqlup.toml")));
    match cli.command {
        CliCommand::Apply(args) => {
            assert_eq!(args.app_dir, Some(PathBuf::from("/opt/app")));
            assert_eq!(
                args.base_url.as_deref(),
                Some("https://updates.example.com/app/")
            );
            assert_eq!(args.pwd.as_deref(), Some("s3cret"));
            assert!(args.sha256.is_some());
            assert!(args.cold_run);
        }
        _ => panic!("expected Apply"),
    }
}

#[test]
fn cli_parse_apply_requires_script_and_db() {
    assert!(Cli::try_parse_from(["sqlup", "apply", "--db", "app.db"]).is_err());
    assert!(Cli::try_parse_from(["sqlup", "apply", "--script", "x.sql"]).is_err());
}
