//! Configuration loading tests against real files on disk.

use prismatic::config::{Config, Installer};
use std::fs;

#[test]
fn load_config_and_connections_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    let connections_path = dir.path().join("connections.toml");

    fs::write(
        &config_path,
        format!(
            r#"
max_workers = 2
connection_column_name = "origin"

[paths]
connections = "{}"
"#,
            connections_path.display()
        ),
    )
    .unwrap();

    fs::write(
        &connections_path,
        r#"
[alpha]
engine = "postgres"
database = "app"
username = "svc"
password = "secret"

[alpha.environment.staging]
host = "alpha.staging.internal"

[beta]
engine = "postgres"
database = "app"
username = "svc"
password = "secret"

[beta.environment.production]
host = "beta.prod.internal"
"#,
    )
    .unwrap();

    let mut config = Config::from_file(&config_path).unwrap();
    config.load_connections().unwrap();

    assert_eq!(config.max_workers, 2);
    assert_eq!(config.connection_column_name, "origin");
    assert_eq!(config.connections.len(), 2);

    // alpha has a staging environment, beta does not.
    assert!(config.connections["alpha"]
        .resolve_environment("staging")
        .is_some());
    assert!(config.connections["beta"]
        .resolve_environment("staging")
        .is_none());
}

#[test]
fn missing_connections_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
[paths]
connections = "/nonexistent/connections.toml"
"#,
    )
    .unwrap();

    let mut config = Config::from_file(&config_path).unwrap();
    let err = config.load_connections().unwrap_err();
    assert!(err.to_string().contains("connections file"));
}

#[test]
fn invalid_console_output_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
[logger]
console_output = "syslog"
"#,
    )
    .unwrap();

    assert!(Config::from_file(&config_path).is_err());
}

#[test]
fn installed_defaults_load_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("config");

    Installer::new(&config_dir).install().unwrap();

    let config = Config::from_file(&config_dir.join("config.toml")).unwrap();
    assert_eq!(config.locale, "en_US");
    assert!(config_dir.join("connections.example.toml").exists());
}
