use clap::{Arg, Command};
use pagekey::handlers::*;
use pagekey_core::{DEFAULT_DB_NAME, SimilarSitePolicy};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const LOGIN_SNAPSHOT: &str = r#"{
    "package": "com.example.app",
    "windows": [{
        "root": {
            "class_name": "android.widget.LinearLayout",
            "children": [
                { "class_name": "android.widget.EditText", "autofill_id": "1", "hint": "Username" },
                { "class_name": "android.widget.EditText", "autofill_id": "2", "input_type": 129 }
            ]
        }
    }]
}"#;

// ============================================================================
// Snapshot loading
// ============================================================================

#[test]
fn test_load_tree_valid() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(LOGIN_SNAPSHOT.as_bytes()).unwrap();

    let tree = load_tree(file.path()).unwrap();
    assert_eq!(tree.package(), Some("com.example.app"));
    assert_eq!(tree.windows.len(), 1);
    assert_eq!(tree.nodes().count(), 3);
}

#[test]
fn test_load_tree_invalid_json() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "not a snapshot").unwrap();

    let err = load_tree(file.path()).unwrap_err();
    assert!(err.contains("Failed to parse snapshot"));
}

#[test]
fn test_load_tree_missing_file() {
    let err = load_tree(Path::new("/nonexistent/snapshot.json")).unwrap_err();
    assert!(err.contains("Failed to read snapshot"));
}

// ============================================================================
// Paths
// ============================================================================

#[test]
fn test_database_path_joins_default_name() {
    let path = database_path("/tmp/pagekey-test/");
    assert_eq!(path, PathBuf::from("/tmp/pagekey-test").join(DEFAULT_DB_NAME));
}

#[test]
fn test_database_path_expands_tilde() {
    let path = database_path("~/.config/pagekey/");
    assert!(!path.to_string_lossy().starts_with('~'));
    assert!(path.ends_with(DEFAULT_DB_NAME));
}

#[test]
fn test_resolve_db_path_prefers_override() {
    let path = resolve_db_path(Some(Path::new("/tmp/custom.db")));
    assert_eq!(path, PathBuf::from("/tmp/custom.db"));
}

#[test]
fn test_resolve_db_path_default() {
    assert_eq!(resolve_db_path(None), database_path(DEFAULT_CONFIG_DIR));
}

#[test]
fn test_open_database_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = open_database(&dir.path().join("missing.db")).unwrap_err();
    assert!(err.to_string().contains("pagekey init"));
}

// ============================================================================
// Formatting
// ============================================================================

#[test]
fn test_mask_password_hides_length() {
    assert_eq!(mask_password("ab").chars().count(), 4);
    assert_eq!(mask_password("hunter22").chars().count(), 8);
    assert_eq!(mask_password(&"x".repeat(40)).chars().count(), 12);
    assert!(!mask_password("hunter22").contains('h'));
}

#[test]
fn test_format_timestamp() {
    assert_eq!(format_timestamp(0), "1970-01-01 00:00:00");
    assert_eq!(format_timestamp(86_400_000 + 1_500), "1970-01-02 00:00:01");
}

// ============================================================================
// Policy parsing
// ============================================================================

fn policy_command() -> Command {
    Command::new("test").arg(
        Arg::new("on-similar")
            .long("on-similar")
            .default_value("use"),
    )
}

#[test]
fn test_parse_policy_default() {
    let matches = policy_command().get_matches_from(["test"]);
    assert_eq!(
        parse_policy(&matches).unwrap(),
        SimilarSitePolicy::UseMostRecent
    );
}

#[test]
fn test_parse_policy_explicit() {
    let matches = policy_command().get_matches_from(["test", "--on-similar", "new"]);
    assert_eq!(parse_policy(&matches).unwrap(), SimilarSitePolicy::CreateNew);
}

#[test]
fn test_parse_policy_rejects_unknown() {
    let matches = policy_command().get_matches_from(["test", "--on-similar", "maybe"]);
    assert!(parse_policy(&matches).is_err());
}

#[test]
fn test_parse_policy_without_argument() {
    let matches = Command::new("test").get_matches_from(["test"]);
    assert_eq!(
        parse_policy(&matches).unwrap(),
        SimilarSitePolicy::UseMostRecent
    );
}
