use super::*;
use std::fs;
use tempfile::TempDir;

fn config(yaml: &str) -> Config {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("docket.yml");
    fs::write(&path, yaml).unwrap();
    Config::load(&path).unwrap()
}

const APP_ONLY: &str = r#"
name: shop
databases:
  - connection:
      hostname: ':memory:'
      database: app
"#;

fn codes(ctx: &ValidationContext) -> Vec<&'static str> {
    ctx.issues.iter().map(|i| i.code).collect()
}

#[test]
fn test_clean_project_has_no_issues() {
    let dir = TempDir::new().unwrap();
    let update = dir.path().join("scripts/app/update");
    fs::create_dir_all(&update).unwrap();
    fs::write(update.join("001.js"), "x\n").unwrap();

    let mut ctx = ValidationContext::default();
    check_scripts(&config(APP_ONLY), dir.path(), &mut ctx);

    assert!(ctx.issues.is_empty());
}

#[test]
fn test_script_warnings() {
    let dir = TempDir::new().unwrap();
    let update = dir.path().join("scripts/app/update");
    fs::create_dir_all(&update).unwrap();
    fs::write(update.join("notes.txt"), "x\n").unwrap();
    fs::create_dir_all(dir.path().join("scripts/legacy")).unwrap();

    let mut ctx = ValidationContext::default();
    check_scripts(&config(APP_ONLY), dir.path(), &mut ctx);

    assert_eq!(codes(&ctx), vec!["W002", "W003", "W004"]);
    assert_eq!(ctx.count(Severity::Error), 0);
}

#[test]
fn test_phase_path_that_is_a_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("scripts/app")).unwrap();
    fs::write(dir.path().join("scripts/app/create"), "oops").unwrap();

    let mut ctx = ValidationContext::default();
    check_scripts(&config(APP_ONLY), dir.path(), &mut ctx);

    assert!(codes(&ctx).contains(&"V003"));
    assert!(ctx.issues[0].message.ends_with("is not a directory"));
}

#[test]
fn test_unresolved_credentials_reported_per_entry() {
    let config = config(
        r#"
name: shop
databases:
  - connection:
      hostname: ':memory:'
      database: app
      server_id: prod
  - connection:
      database: reports
"#,
    );

    let mut ctx = ValidationContext::default();
    check_connections(&config, &CredentialStore::empty(), &mut ctx);

    assert_eq!(codes(&ctx), vec!["V002", "V002"]);
    assert!(ctx.issues[0].message.contains("databases[0] (app)"));
    assert!(ctx.issues[1].message.contains("No hostname defined!"));
}
