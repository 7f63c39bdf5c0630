// Tests for the fill and save pipelines

use pagekey_core::registry::RegistryConfig;
use pagekey_core::{
    AutofillService, Database, SaveOutcome, SimilarSitePolicy, SiteRegistry, Upsert,
};
use pagekey_engine::classify::input_type;
use pagekey_engine::{FieldId, FieldRole, Node, ViewTree, identify};
use std::sync::Arc;
use tempfile::TempDir;

fn create_service() -> (TempDir, AutofillService) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("test.db")).unwrap();
    (temp_dir, AutofillService::new(Arc::new(db)))
}

fn loose_registry(temp_dir: &TempDir) -> SiteRegistry {
    let db = Database::new(&temp_dir.path().join("test.db")).unwrap();
    SiteRegistry::with_config(
        Arc::new(db),
        RegistryConfig {
            similarity_threshold: 0.3,
        },
    )
}

fn edit_text(id: &str) -> Node {
    Node::new("android.widget.EditText").with_autofill_id(id)
}

/// Web login form on example.com, optionally with typed values.
fn web_login(username: Option<&str>, password: Option<&str>) -> ViewTree {
    let mut user = edit_text("user").with_hint("Email");
    if let Some(value) = username {
        user = user.with_value(value);
    }
    let mut pass = edit_text("pass").with_input_type(input_type::PASSWORD);
    if let Some(value) = password {
        pass = pass.with_value(value);
    }

    let root = Node::new("android.webkit.WebView")
        .with_web_domain("example.com")
        .with_child(user)
        .with_child(pass);
    ViewTree::single(Some("com.android.chrome"), root)
}

/// App login form without any domain; `labels` pick the form variant.
fn app_login(labels: (&str, &str), values: Option<(&str, &str)>) -> ViewTree {
    let mut user = Node::new("android.widget.EditText").with_text(labels.0);
    let mut pass = Node::new("android.widget.EditText").with_text(labels.1);
    if let Some((username, password)) = values {
        user = user.with_value(username);
        pass = pass.with_value(password);
    }
    let root = Node::new("android.widget.LinearLayout")
        .with_child(Node::new("android.widget.TextView").with_text("Acme Portal"))
        .with_child(user)
        .with_child(pass);
    ViewTree::single(Some("com.acme.app"), root)
}

fn bank_login(values: Option<(&str, &str)>) -> ViewTree {
    let mut rut = Node::new("android.view.View")
        .with_autofill_id("rut")
        .with_autofill_hint("off");
    let mut clave = Node::new("android.view.View")
        .with_autofill_id("clave")
        .with_autofill_hint("new-password");
    if let Some((username, password)) = values {
        rut = rut.with_value(username);
        clave = clave.with_value(password);
    }
    let root = Node::new("android.webkit.WebView")
        .with_web_domain("www.bancoestado.cl")
        .with_child(rut)
        .with_child(clave);
    ViewTree::single(Some("com.android.chrome"), root)
}

// ============================================================================
// Fill Tests
// ============================================================================

#[tokio::test]
async fn test_fill_without_fields() {
    let (_temp, service) = create_service();
    let tree = ViewTree::single(None, Node::new("android.widget.TextView").with_text("Hello"));

    assert!(service.fill(&tree).await.is_none());
}

#[tokio::test]
async fn test_fill_new_page_has_no_datasets() {
    let (_temp, service) = create_service();

    let response = service.fill(&web_login(None, None)).await.unwrap();

    assert_eq!(response.page.page_id, "example.com");
    assert_eq!(response.title, "Example");
    assert!(response.datasets.is_empty());
    assert_eq!(response.site.unwrap().name, "example.com");
    assert_eq!(
        response.save_info.unwrap().fields,
        vec![FieldId::new("pass")]
    );
}

#[tokio::test]
async fn test_save_then_fill() {
    let (_temp, service) = create_service();

    let outcome = service
        .save(&web_login(Some("ana@example.com"), Some("s3cret")))
        .await;
    let SaveOutcome::Saved { site, stored } = outcome else {
        panic!("expected Saved, got {:?}", outcome);
    };
    assert_eq!(site.page_id, "example.com");
    assert!(matches!(stored.as_slice(), [Upsert::Inserted(_)]));

    let response = service.fill(&web_login(None, None)).await.unwrap();
    assert_eq!(response.datasets.len(), 1);

    let dataset = &response.datasets[0];
    assert_eq!(dataset.label, "ana@example.com - Example");
    assert_eq!(
        dataset.values,
        vec![
            (FieldId::new("user"), "ana@example.com".to_string()),
            (FieldId::new("pass"), "s3cret".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_saved_credential_shape() {
    let (_temp, service) = create_service();
    service.save(&web_login(Some("ana"), Some("pw"))).await;

    let db = service.registry().database();
    let credential = db.find_credential("example.com", "ana").unwrap().unwrap();

    assert_eq!(credential.url, "https://example.com");
    assert_eq!(credential.title.as_deref(), Some("Example"));
}

#[tokio::test]
async fn test_save_upserts() {
    let (_temp, service) = create_service();

    let first = service.save(&web_login(Some("ana"), Some("pw"))).await;
    let again = service.save(&web_login(Some("ana"), Some("pw"))).await;
    let changed = service.save(&web_login(Some("ana"), Some("pw2"))).await;

    let id = match first {
        SaveOutcome::Saved { stored, .. } => stored[0].id(),
        other => panic!("expected Saved, got {:?}", other),
    };
    assert!(matches!(again, SaveOutcome::Saved { ref stored, .. } if stored == &[Upsert::Touched(id)]));
    assert!(matches!(changed, SaveOutcome::Saved { ref stored, .. } if stored == &[Upsert::Updated(id)]));

    let credentials = service
        .registry()
        .database()
        .credentials_for_domain("example.com")
        .unwrap();
    assert_eq!(credentials.len(), 1);
    assert_eq!(credentials[0].password, "pw2");
}

#[tokio::test]
async fn test_save_without_password() {
    let (_temp, service) = create_service();

    let outcome = service.save(&web_login(Some("ana"), None)).await;

    assert_eq!(outcome, SaveOutcome::NothingToSave);
    assert!(service.registry().database().all_sites().unwrap().is_empty());
}

// ============================================================================
// Known Site Tests
// ============================================================================

#[tokio::test]
async fn test_bank_fill_applies_overlay() {
    let (_temp, service) = create_service();

    let response = service.fill(&bank_login(None)).await.unwrap();
    let roles: Vec<&FieldRole> = response.fields.iter().map(|f| &f.role).collect();

    assert_eq!(roles, vec![&FieldRole::Username, &FieldRole::Password]);
}

#[tokio::test]
async fn test_bank_save_and_fill() {
    let (_temp, service) = create_service();

    let outcome = service.save(&bank_login(Some(("12345678-9", "clave")))).await;
    assert!(matches!(outcome, SaveOutcome::Saved { .. }));

    let credential = service
        .registry()
        .database()
        .find_credential("www.bancoestado.cl", "12345678-9")
        .unwrap()
        .unwrap();
    assert_eq!(credential.password, "clave");

    let response = service.fill(&bank_login(None)).await.unwrap();
    assert_eq!(response.datasets.len(), 1);
    assert_eq!(
        response.datasets[0].values,
        vec![
            (FieldId::new("rut"), "12345678-9".to_string()),
            (FieldId::new("clave"), "clave".to_string()),
        ]
    );
}

// ============================================================================
// Synthetic Page Tests
// ============================================================================

#[tokio::test]
async fn test_app_page_keys_credentials_by_page_id() {
    let (_temp, service) = create_service();
    let tree = app_login(("Username", "Password"), Some(("ana", "pw")));
    let page_id = identify(&tree).page_id;

    let outcome = service.save(&tree).await;
    let SaveOutcome::Saved { site, .. } = outcome else {
        panic!("expected Saved, got {:?}", outcome);
    };
    assert_eq!(site.name, "Acme Portal");

    let credential = service
        .registry()
        .database()
        .find_credential(&page_id, "ana")
        .unwrap()
        .unwrap();
    assert_eq!(credential.title.as_deref(), Some("Acme Portal"));

    let response = service
        .fill(&app_login(("Username", "Password"), None))
        .await
        .unwrap();
    assert_eq!(response.datasets.len(), 1);
    assert_eq!(response.datasets[0].label, "ana - Acme Portal");
}

#[tokio::test]
async fn test_similar_page_reuses_most_recent_site() {
    let temp_dir = TempDir::new().unwrap();
    let service = AutofillService::with_registry(loose_registry(&temp_dir));

    service
        .save(&app_login(("Username", "Password"), Some(("ana", "pw"))))
        .await;

    let response = service
        .fill(&app_login(("Usuario", "Contraseña"), None))
        .await
        .unwrap();

    assert_eq!(response.datasets.len(), 1);
    assert_eq!(
        response.datasets[0].values,
        vec![
            (FieldId::new("node:0.2"), "ana".to_string()),
            (FieldId::new("node:0.3"), "pw".to_string()),
        ]
    );
    assert_eq!(service.registry().database().all_sites().unwrap().len(), 1);
}

#[tokio::test]
async fn test_similar_page_confirm_policy() {
    let temp_dir = TempDir::new().unwrap();
    let service = AutofillService::with_registry(loose_registry(&temp_dir))
        .with_policy(SimilarSitePolicy::ConfirmMostRecent);

    service
        .save(&app_login(("Username", "Password"), Some(("ana", "pw"))))
        .await;

    let spanish = app_login(("Usuario", "Contraseña"), None);
    let response = service.fill(&spanish).await.unwrap();
    assert_eq!(response.datasets.len(), 1);

    let site = response.site.unwrap();
    assert_eq!(site.page_id, identify(&spanish).page_id);
    assert!(matches!(
        service.registry().resolve(&identify(&spanish)).unwrap(),
        pagekey_core::Resolution::ExactMatch(s) if s.id == site.id
    ));
}

#[tokio::test]
async fn test_similar_page_create_policy() {
    let temp_dir = TempDir::new().unwrap();
    let service = AutofillService::with_registry(loose_registry(&temp_dir))
        .with_policy(SimilarSitePolicy::CreateNew);

    service
        .save(&app_login(("Username", "Password"), Some(("ana", "pw"))))
        .await;

    let response = service
        .fill(&app_login(("Usuario", "Contraseña"), None))
        .await
        .unwrap();

    assert!(response.datasets.is_empty());
    let site = response.site.unwrap();
    assert!(site.is_user_named);
    assert_eq!(site.name, response.title);
    assert_eq!(service.registry().database().all_sites().unwrap().len(), 2);
}

// ============================================================================
// Failed Save Tests
// ============================================================================

#[tokio::test]
async fn test_failed_save_leaves_nothing_behind() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.db");
    let db = Arc::new(Database::new(&path).unwrap());

    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_bob BEFORE INSERT ON credentials
         WHEN NEW.username LIKE 'bob%'
         BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
    )
    .unwrap();
    drop(conn);

    let root = Node::new("android.webkit.WebView")
        .with_web_domain("example.com")
        .with_child(
            edit_text("user")
                .with_autofill_hint("username")
                .with_value("alice"),
        )
        .with_child(
            edit_text("mail")
                .with_autofill_hint("emailAddress")
                .with_value("bob@example.com"),
        )
        .with_child(
            edit_text("pass")
                .with_autofill_hint("password")
                .with_value("hunter2"),
        );
    let tree = ViewTree::single(Some("com.android.chrome"), root);

    let service = AutofillService::new(db.clone());
    let outcome = service.save(&tree).await;

    assert!(matches!(outcome, SaveOutcome::Failed(_)));
    assert!(db.all_sites().unwrap().is_empty());
    assert!(db.all_credentials().unwrap().is_empty());
}

// ============================================================================
// Policy Parsing Tests
// ============================================================================

#[test]
fn test_policy_from_str() {
    assert_eq!(
        "use".parse::<SimilarSitePolicy>().unwrap(),
        SimilarSitePolicy::UseMostRecent
    );
    assert_eq!(
        "confirm".parse::<SimilarSitePolicy>().unwrap(),
        SimilarSitePolicy::ConfirmMostRecent
    );
    assert_eq!(
        "new".parse::<SimilarSitePolicy>().unwrap(),
        SimilarSitePolicy::CreateNew
    );
    assert!("maybe".parse::<SimilarSitePolicy>().is_err());
    assert_eq!(SimilarSitePolicy::default().to_string(), "use");
}
