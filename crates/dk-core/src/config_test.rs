use super::*;
use crate::credentials::ServerCredential;
use tempfile::TempDir;

const MINIMAL: &str = r#"
name: shop
databases:
  - connection:
      hostname: ./shop.duckdb
      database: app
"#;

#[test]
fn test_parse_minimal_config() {
    let config: Config = serde_yaml::from_str(MINIMAL).unwrap();
    config.validate().unwrap();

    assert_eq!(config.name, "shop");
    assert_eq!(config.scripts_dir, "scripts");
    assert_eq!(config.output_dir, "target/docket");
    assert_eq!(config.output_name(), "shop");
    assert_eq!(config.script_extension, ".js");
    assert!(config.execute_scripts);
    assert!(!config.trim_trailing_whitespace);
    assert_eq!(config.script_timeout(), None);
    assert_eq!(config.ledger_phases, vec![Phase::Update]);
    assert_eq!(config.on_connection_error, ConnectionFailurePolicy::Abort);

    let db = &config.databases[0];
    assert_eq!(db.updates_collection, "appliedUpdates");
    assert_eq!(db.updates_name_field, "name");
    assert_eq!(db.connection.backend, StoreKind::DuckDb);
    assert_eq!(db.label(0), "databases[0] (app)");
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
name: shop
scripts_dir: src/main/mongodb
output_dir: build/mongodb
output_name: shop-1.2.0
script_extension: .mongo.js
execute_scripts: false
trim_trailing_whitespace: true
script_timeout_secs: 30
ledger_phases: [update, populate]
on_connection_error: skip
credentials_file: creds.yml
databases:
  - connection:
      type: mongodb
      hostname: mongo.internal
      port: 27018
      database: catalog
      server_id: prod-mongo
      options:
        app_name: docket
        connect_timeout_ms: 5000
        auth_source: admin
    updates_collection: migrations
    updates_name_field: script
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    config.validate().unwrap();

    assert_eq!(config.output_name(), "shop-1.2.0");
    assert!(!config.execute_scripts);
    assert_eq!(config.script_timeout(), Some(Duration::from_secs(30)));
    assert_eq!(config.ledger_phases, vec![Phase::Update, Phase::Populate]);
    assert_eq!(config.on_connection_error, ConnectionFailurePolicy::Skip);

    let conn = &config.databases[0].connection;
    assert_eq!(conn.backend, StoreKind::MongoDb);
    assert_eq!(conn.port, Some(27018));
    assert_eq!(conn.options.app_name.as_deref(), Some("docket"));
    assert_eq!(conn.options.auth_source.as_deref(), Some("admin"));
    assert_eq!(config.databases[0].updates_name_field, "script");
}

#[test]
fn test_unknown_field_rejected() {
    let yaml = "name: shop\nexecute: false\ndatabases: []\n";
    assert!(serde_yaml::from_str::<Config>(yaml).is_err());
}

#[test]
fn test_validate_requires_databases() {
    let config: Config = serde_yaml::from_str("name: shop").unwrap();
    let err = config.validate().unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[test]
fn test_validate_rejects_duplicate_database_names() {
    let yaml = r#"
name: shop
databases:
  - connection: { hostname: a.duckdb, database: app }
  - connection: { hostname: b.duckdb, database: app }
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Duplicate database name 'app'"));
}

#[test]
fn test_validate_rejects_database_names_unusable_as_paths() {
    for (name, reason) in [
        ("..", "single path component"),
        (".", "single path component"),
        ("a/b", "single path component"),
        (" app", "whitespace"),
        ("app ", "whitespace"),
        ("  ", "cannot be empty"),
    ] {
        let mut config: Config = serde_yaml::from_str(MINIMAL).unwrap();
        config.databases[0].connection.database = name.to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(reason), "{name:?}: {err}");
    }
}

#[test]
fn test_validate_rejects_zero_timeout() {
    let mut config: Config = serde_yaml::from_str(MINIMAL).unwrap();
    config.script_timeout_secs = Some(0);
    assert!(config.validate().is_err());
}

#[test]
fn test_load_from_dir() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("docket.yaml"), MINIMAL).unwrap();

    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.name, "shop");
}

#[test]
fn test_load_from_dir_missing() {
    let dir = TempDir::new().unwrap();
    let err = Config::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}

#[test]
fn test_load_reports_parse_errors_with_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("docket.yml");
    std::fs::write(&path, "name: [unclosed").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, CoreError::YamlParse { .. }));
    assert!(err.to_string().contains("docket.yml"));
}

#[test]
fn test_resolve_connections_fails_fast_on_first_bad_entry() {
    let yaml = r#"
name: shop
databases:
  - connection: { hostname: a.duckdb, database: app }
  - connection: { database: reports }
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    let err = config
        .resolve_connections(&CredentialStore::empty())
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("databases[1] (reports)"), "{msg}");
    assert!(msg.contains("No hostname defined!"), "{msg}");
}

#[test]
fn test_resolve_connections_with_reference() {
    let yaml = r#"
name: shop
databases:
  - connection: { hostname: mongo.internal, database: app, server_id: prod }
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    let store = CredentialStore {
        servers: vec![ServerCredential {
            id: "prod".to_string(),
            username: Some("deploy".to_string()),
            password: Some("pw".to_string()),
            hostname: None,
            port: None,
        }],
    };
    let resolved = config.resolve_connections(&store).unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].auth.as_ref().unwrap().username, "deploy");
}

#[test]
fn test_select_databases() {
    let yaml = r#"
name: shop
databases:
  - connection: { hostname: a.duckdb, database: app }
  - connection: { hostname: a.duckdb, database: reports }
  - connection: { hostname: a.duckdb, database: audit }
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();

    assert_eq!(config.select_databases(None).unwrap(), vec![0, 1, 2]);

    // Configuration order wins over filter order
    let filter = vec!["audit".to_string(), "app".to_string()];
    assert_eq!(config.select_databases(Some(&filter)).unwrap(), vec![0, 2]);

    let unknown = vec!["nope".to_string()];
    assert!(config.select_databases(Some(&unknown)).is_err());
}

// These tests modify environment variables and must run serially
use serial_test::serial;

#[test]
#[serial]
fn test_resolve_database_filter_cli_takes_precedence() {
    let original = std::env::var(DATABASE_ENV).ok();
    std::env::set_var(DATABASE_ENV, "reports");
    let result = Config::resolve_database_filter(Some("app, audit"));
    assert_eq!(result, Some(vec!["app".to_string(), "audit".to_string()]));
    match original {
        Some(v) => std::env::set_var(DATABASE_ENV, v),
        None => std::env::remove_var(DATABASE_ENV),
    }
}

#[test]
#[serial]
fn test_resolve_database_filter_uses_env_var() {
    let original = std::env::var(DATABASE_ENV).ok();
    std::env::set_var(DATABASE_ENV, "reports");
    let result = Config::resolve_database_filter(None);
    assert_eq!(result, Some(vec!["reports".to_string()]));
    match original {
        Some(v) => std::env::set_var(DATABASE_ENV, v),
        None => std::env::remove_var(DATABASE_ENV),
    }
}

#[test]
#[serial]
fn test_resolve_credentials_path_priority() {
    let original = std::env::var(CREDENTIALS_ENV).ok();
    std::env::remove_var(CREDENTIALS_ENV);

    let mut config: Config = serde_yaml::from_str(MINIMAL).unwrap();
    let root = Path::new("/project");
    assert_eq!(config.resolve_credentials_path(root, None), None);

    config.credentials_file = Some("creds.yml".to_string());
    assert_eq!(
        config.resolve_credentials_path(root, None),
        Some(PathBuf::from("/project/creds.yml"))
    );

    std::env::set_var(CREDENTIALS_ENV, "/etc/docket/creds.yml");
    assert_eq!(
        config.resolve_credentials_path(root, None),
        Some(PathBuf::from("/etc/docket/creds.yml"))
    );
    assert_eq!(
        config.resolve_credentials_path(root, Some("cli.yml")),
        Some(PathBuf::from("cli.yml"))
    );

    match original {
        Some(v) => std::env::set_var(CREDENTIALS_ENV, v),
        None => std::env::remove_var(CREDENTIALS_ENV),
    }
}
