//! Unit tests for configuration loading and the backend registry

use std::path::Path;

use database_operator::backend::BackendRegistry;
use database_operator::config::{ConfigError, OperatorConfig, TlsMode};

const CONFIG: &str = r#"
resyncIntervalSeconds: 300
postgres:
  postgres-main:
    host: pg.example.internal
    user: postgres
    password: secret
  postgres-prod:
    host: pg-prod.example.internal
    port: 6432
    user: admin
    password: secret
    tls: require
    production: true
"#;

fn write_config(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!(
        "database-operator-{}-{}.yaml",
        name,
        std::process::id()
    ));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_config_file() {
    let path = write_config("valid", CONFIG);
    let config = OperatorConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.postgres.len(), 2);
    let main = &config.postgres["postgres-main"];
    assert_eq!(main.port, 5432);
    assert_eq!(main.tls, TlsMode::Disable);
    assert!(!main.production);

    let prod = &config.postgres["postgres-prod"];
    assert_eq!(prod.port, 6432);
    assert_eq!(prod.tls, TlsMode::Require);
    assert!(prod.production);
    assert_eq!(config.resync_interval().unwrap().as_secs(), 300);
}

#[test]
fn test_load_missing_file() {
    let err = OperatorConfig::load(Path::new("/nonexistent/database-operator.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_load_rejects_reserved_type() {
    let path = write_config(
        "reserved",
        "postgres:\n  test:\n    host: localhost\n    user: postgres\n    password: pw\n",
    );
    let err = OperatorConfig::load(&path).unwrap_err();
    std::fs::remove_file(&path).ok();

    assert!(matches!(err, ConfigError::InvalidBackend { ref backend, .. } if backend == "test"));
}

#[test]
fn test_load_rejects_unknown_fields() {
    let path = write_config("unknown", "postgress: {}\n");
    let err = OperatorConfig::load(&path).unwrap_err();
    std::fs::remove_file(&path).ok();

    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_registry_from_config() {
    let config = OperatorConfig::from_yaml(CONFIG).unwrap();
    let registry = BackendRegistry::from_config(&config).unwrap();

    assert_eq!(
        registry.types(),
        vec![
            "postgres-main".to_string(),
            "postgres-prod".to_string(),
            "test".to_string()
        ]
    );
    assert!(registry.get("postgres-main").is_some());
    assert!(registry.get("mysql").is_none());
}
