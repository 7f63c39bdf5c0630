// Tests for URL and domain discovery

use pagekey_engine::urls::{
    BrowserFamily, extract_domain, extract_url, extract_web_domain, is_valid_domain,
    normalize_domain, same_domain, url_from_text,
};
use pagekey_engine::{HtmlInfo, Node, ViewTree};

fn layout() -> Node {
    Node::new("android.widget.LinearLayout")
}

// ============================================================================
// Domain Helper Tests
// ============================================================================

#[test]
fn test_extract_domain_from_url() {
    assert_eq!(
        extract_domain("https://www.example.com/login?x=1"),
        Some("example.com".to_string())
    );
    assert_eq!(
        extract_domain("http://accounts.example.org"),
        Some("accounts.example.org".to_string())
    );
}

#[test]
fn test_extract_domain_manual_fallback() {
    assert_eq!(extract_domain("example.com/path"), Some("example.com".to_string()));
    assert_eq!(extract_domain("not a url"), Some("not a url".to_string()));
}

#[test]
fn test_same_domain() {
    assert!(same_domain(
        Some("https://www.example.com/a"),
        Some("http://EXAMPLE.com/b")
    ));
    assert!(!same_domain(Some("https://example.com"), Some("https://example.org")));
    assert!(!same_domain(None, Some("https://example.com")));
}

#[test]
fn test_is_valid_domain() {
    assert!(is_valid_domain("example.com"));
    assert!(is_valid_domain("login.bank.cl"));
    assert!(!is_valid_domain("com.android.chrome"));
    assert!(!is_valid_domain("localhost"));
    assert!(!is_valid_domain("-bad-.com"));
}

#[test]
fn test_normalize_domain() {
    assert_eq!(normalize_domain(" WWW.Example.COM "), "example.com");
}

#[test]
fn test_url_from_text_prefers_absolute_urls() {
    assert_eq!(
        url_from_text("Visit https://example.cl/login now"),
        Some("https://example.cl/login".to_string())
    );
}

#[test]
fn test_url_from_text_rejects_package_names() {
    assert_eq!(url_from_text("com.google.android.gms"), None);
}

// ============================================================================
// Strategy Order Tests
// ============================================================================

#[test]
fn test_web_domain_comes_first() {
    let root = layout()
        .with_child(Node::new("android.widget.TextView").with_text("https://other.org"))
        .with_child(Node::new("android.view.View").with_web_domain("shop.example.com"));
    let tree = ViewTree::single(Some("com.android.chrome"), root);

    assert_eq!(extract_web_domain(&tree), Some("shop.example.com".to_string()));
    assert_eq!(
        extract_url(&tree),
        Some("https://shop.example.com".to_string())
    );
}

#[test]
fn test_invalid_web_domain_is_ignored() {
    let root = layout().with_child(Node::new("android.view.View").with_web_domain("com.android.settings"));
    let tree = ViewTree::single(None, root);

    assert_eq!(extract_web_domain(&tree), None);
    assert_eq!(extract_url(&tree), None);
}

#[test]
fn test_window_title_url() {
    let tree = ViewTree::new(Some("com.example.app"))
        .with_window(Some("Login - https://portal.example.com/in"), layout());

    assert_eq!(
        extract_url(&tree),
        Some("https://portal.example.com/in".to_string())
    );
}

#[test]
fn test_chrome_address_bar() {
    let root = layout()
        .with_child(Node::new("android.widget.TextView").with_text("Welcome"))
        .with_child(
            Node::new("android.widget.EditText")
                .with_id_entry("url_bar")
                .with_text("www.mybank.cl/login"),
        );
    let tree = ViewTree::single(Some("com.android.chrome"), root);

    assert_eq!(
        extract_url(&tree),
        Some("https://www.mybank.cl".to_string())
    );
    assert_eq!(
        extract_url(&tree).as_deref().and_then(extract_domain),
        Some("mybank.cl".to_string())
    );

    let root = layout().with_child(
        Node::new("android.widget.EditText")
            .with_id_entry("url_bar")
            .with_text("https://www.mybank.cl/login"),
    );
    let tree = ViewTree::single(Some("com.android.chrome"), root);
    assert_eq!(
        extract_url(&tree),
        Some("https://www.mybank.cl/login".to_string())
    );
}

#[test]
fn test_firefox_toolbar() {
    let root = layout().with_child(
        Node::new("android.widget.TextView")
            .with_id_entry("mozac_browser_toolbar_url_view")
            .with_text("example.org"),
    );
    let tree = ViewTree::single(Some("org.mozilla.firefox"), root);

    assert_eq!(extract_url(&tree), Some("https://example.org".to_string()));
}

#[test]
fn test_html_href_attribute() {
    let root = layout().with_child(
        Node::new("android.view.View")
            .with_html(HtmlInfo::new("a").with_attr("href", "https://help.example.net/faq")),
    );
    let tree = ViewTree::single(Some("com.example.app"), root);

    assert_eq!(
        extract_url(&tree),
        Some("https://help.example.net/faq".to_string())
    );
}

#[test]
fn test_webview_domain() {
    let root = layout().with_child(
        Node::new("android.webkit.WebView").with_web_domain("com.android.internal"),
    );
    let tree = ViewTree::single(Some("com.example.app"), root);
    assert_eq!(extract_url(&tree), None);
}

#[test]
fn test_email_text_yields_nothing() {
    let root = layout().with_child(
        Node::new("android.widget.TextView").with_text("Questions? help@example.com"),
    );
    let tree = ViewTree::single(Some("com.example.app"), root);

    assert_eq!(extract_url(&tree), None);
}

#[test]
fn test_browser_family_detection() {
    assert_eq!(
        BrowserFamily::detect(Some("com.android.chrome")),
        BrowserFamily::Chrome
    );
    assert_eq!(
        BrowserFamily::detect(Some("org.mozilla.firefox")),
        BrowserFamily::Firefox
    );
    assert_eq!(BrowserFamily::detect(None), BrowserFamily::Generic);
}

#[test]
fn test_window_title_bare_domain_without_common_suffix() {
    let tree = ViewTree::new(Some("com.example.app"))
        .with_window(Some("santander.cl"), layout());

    assert_eq!(
        extract_url(&tree),
        Some("https://santander.cl".to_string())
    );
}

#[test]
fn test_bare_country_domain_in_plain_text_is_ignored() {
    let root = layout().with_child(Node::new("android.widget.TextView").with_text("bancoestado.cl"));
    let tree = ViewTree::single(Some("com.example.app"), root);

    assert_eq!(extract_url(&tree), None);
}
