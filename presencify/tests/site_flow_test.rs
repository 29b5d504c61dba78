//! End-to-end tests for the site router.
//!
//! These tests drive the full router in-process and verify that:
//! - The pricing selection rides along to the contact page
//! - Contact submissions carry the selection and leave a fresh form behind
//! - Portals redirect, deny or degrade the way visitors expect
//! - Sign-up, sign-in and sign-out manage the session cookie

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, StatusCode, header};
use chrono::{NaiveDate, Utc};
use presencify::config::Config;
use presencify::model::{AppRole, Project, ProjectStatus};
use presencify::store::SharedBackend;
use presencify::store::memory::{MemoryBackend, Operation};
use presencify::web::{AppState, app_router};
use tower::ServiceExt;

const PASSWORD: &str = "secret-pw";

/// Router over an in-memory backend the test can inspect and break.
struct TestFixture {
    backend: Arc<MemoryBackend>,
    app: Router,
}

impl TestFixture {
    fn new() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let shared: SharedBackend = backend.clone();
        let state = Arc::new(AppState::new(shared, &Config::default()));
        Self {
            backend,
            app: app_router(state),
        }
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Create an account with the given roles and return a session cookie.
    async fn signed_in(&self, email: &str, roles: &[AppRole]) -> (String, String) {
        let user_id = self.backend.add_user(email, PASSWORD, None).await;
        for role in roles {
            self.backend.grant_role(&user_id, *role).await;
        }

        let response = self
            .post_form(
                "/auth/signin",
                &format!("email={}&password={PASSWORD}", email.replace('@', "%40")),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/client");
        let cookie = cookie_pair(&response, "presencify_session").expect("session cookie set");
        (user_id, cookie)
    }
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}

/// `name=value` of the named Set-Cookie header, ready to send back.
fn cookie_pair(response: &Response<Body>, name: &str) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .filter_map(|c| c.split(';').next().map(str::to_string))
        .find(|pair| pair.starts_with(&format!("{name}=")))
}

fn project(client_id: &str, title: &str, status: ProjectStatus) -> Project {
    Project {
        id: uuid::Uuid::new_v4().to_string(),
        title: title.to_string(),
        description: None,
        status,
        budget: Some(5000),
        start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
        end_date: None,
        client_id: client_id.to_string(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_healthz_and_not_found() {
    let fixture = TestFixture::new();

    let response = fixture.get("/healthz", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");

    let response = fixture.get("/no-such-page", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Page not found"));
}

#[tokio::test]
async fn test_landing_and_stylesheet() {
    let fixture = TestFixture::new();

    let response = fixture.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("href=\"/pricing\""));
    assert!(body.contains("href=\"/contact\""));

    let response = fixture.get("/assets/site.css", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/css; charset=utf-8"
    );
}

#[tokio::test]
async fn test_pricing_shows_selection_total() {
    let fixture = TestFixture::new();

    let response = fixture.get("/pricing", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("$3,999"));

    let response = fixture.get("/pricing?addons=ecommerce,cms", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("$7,699"));
    assert!(body.contains("E-commerce Functionality"));
    assert!(body.contains("CMS Integration"));
}

#[tokio::test]
async fn test_quote_prefills_contact_then_submit_consumes_it() {
    let fixture = TestFixture::new();

    let response = fixture
        .post_form("/pricing/quote", "addons=ecommerce%2Ccms", None)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/contact?addons=ecommerce,cms");
    assert!(set_cookies(&response).is_empty());

    // Reading the contact page does not consume the selection.
    for _ in 0..2 {
        let response = fixture.get("/contact?addons=ecommerce,cms", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("E-commerce Functionality"));
        assert!(body.contains("CMS Integration"));
        assert!(body.contains("$7,699"));
        assert!(body.contains("name=\"addons\" value=\"ecommerce,cms\""));
    }

    let response = fixture
        .post_form(
            "/contact",
            "addons=ecommerce%2Ccms&name=Grace+Hopper&email=grace%40example.com&phone=&company=Acme&message=We+need+a+shop+for+our+bakery.",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/contact");
    let notice = cookie_pair(&response, "presencify_notice").expect("notice cookie set");
    assert_eq!(notice, "presencify_notice=contact-sent");

    let stored = fixture.backend.submissions().await;
    assert_eq!(stored.len(), 1);
    let submission = &stored[0];
    assert_eq!(submission.name, "Grace Hopper");
    assert_eq!(submission.company.as_deref(), Some("Acme"));
    assert_eq!(submission.phone, None);
    assert_eq!(submission.status, "new");
    assert_eq!(submission.selected_package.as_deref(), Some("Professional Website"));
    assert_eq!(
        submission.selected_addons.as_deref(),
        Some(&["E-commerce Functionality".to_string(), "CMS Integration".to_string()][..])
    );
    assert_eq!(submission.estimated_total, Some(7699));

    // The redirect target carries no selection; the flash shows once.
    let response = fixture.get("/contact", Some(&notice)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        set_cookies(&response)
            .iter()
            .any(|c| c.starts_with("presencify_notice=;") && c.contains("Max-Age=0"))
    );
    let body = body_text(response).await;
    assert!(body.contains("Message sent successfully!"));
    assert!(body.contains("Quick Response"));
    assert!(!body.contains("E-commerce Functionality"));
    assert!(!body.contains("name=\"addons\""));
}

#[tokio::test]
async fn test_quote_without_addons_selects_base_package() {
    let fixture = TestFixture::new();

    let response = fixture.post_form("/pricing/quote", "addons=", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/contact?addons=");

    let response = fixture.get("/contact?addons=", None).await;
    let body = body_text(response).await;
    assert!(body.contains("Your Selection"));
    assert!(body.contains("$3,999"));
}

#[tokio::test]
async fn test_repeated_addons_param_is_merged() {
    let fixture = TestFixture::new();

    let response = fixture.get("/contact?addons=cms&addons=seo", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("CMS Integration"));
    assert!(body.contains("SEO"));
    assert!(body.contains("name=\"addons\" value=\"cms,seo\""));

    let response = fixture.get("/pricing?addons=cms&addons=seo", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("CMS Integration"));

    // Junk ids fall back to the base package, never an error page.
    let response = fixture.get("/contact?addons=%ZZ&addons", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Your Selection"));
    assert!(body.contains("$3,999"));
}

#[tokio::test]
async fn test_contact_without_selection_stores_no_pricing() {
    let fixture = TestFixture::new();

    let response = fixture
        .post_form(
            "/contact",
            "name=Ada&email=ada%40example.com&message=Please+call+me+back+soon.",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let stored = fixture.backend.submissions().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].selected_package, None);
    assert_eq!(stored[0].selected_addons, None);
    assert_eq!(stored[0].estimated_total, None);
}

#[tokio::test]
async fn test_contact_validation_rejects_short_message() {
    let fixture = TestFixture::new();

    let response = fixture
        .post_form(
            "/contact",
            "name=Grace+Hopper&email=grace%40example.com&message=123456789",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_text(response).await;
    assert!(body.contains("Message must be at least 10 characters"));
    // Entered values are kept.
    assert!(body.contains("value=\"Grace Hopper\""));
    assert!(fixture.backend.submissions().await.is_empty());
}

#[tokio::test]
async fn test_contact_store_failure_keeps_form() {
    let fixture = TestFixture::new();
    fixture.backend.fail(Operation::InsertSubmission).await;

    let response = fixture
        .post_form(
            "/contact",
            "name=Grace+Hopper&email=grace%40example.com&message=We+need+a+new+website.",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert!(body.contains("Error sending message"));
    assert!(body.contains("value=\"Grace Hopper\""));
    assert!(fixture.backend.submissions().await.is_empty());
}

#[tokio::test]
async fn test_portals_require_sign_in() {
    let fixture = TestFixture::new();

    for path in ["/client", "/admin"] {
        let response = fixture.get(path, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth");
    }

    // A stale token is cleared on the way out.
    let response = fixture
        .get("/client", Some("presencify_session=expired-token"))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth");
    assert!(
        set_cookies(&response)
            .iter()
            .any(|c| c.starts_with("presencify_session=;") && c.contains("Max-Age=0"))
    );
}

#[tokio::test]
async fn test_sign_in_rejects_bad_password() {
    let fixture = TestFixture::new();
    fixture.backend.add_user("ada@example.com", PASSWORD, None).await;

    let response = fixture
        .post_form(
            "/auth/signin",
            "email=ada%40example.com&password=wrong-pw",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response).await.contains("Invalid email or password"));
    assert_eq!(fixture.backend.session_count().await, 0);
}

#[tokio::test]
async fn test_sign_up_then_client_portal() {
    let fixture = TestFixture::new();

    let response = fixture
        .post_form(
            "/auth/signup",
            "full_name=Ada+Lovelace&email=ada%40example.com&password=12345",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        body_text(response)
            .await
            .contains("Password must be at least 6 characters")
    );

    // Same email rule as the contact form.
    let response = fixture
        .post_form("/auth/signup", "email=ada%40localhost&password=123456", None)
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("Invalid email address"));

    let response = fixture
        .post_form(
            "/auth/signup",
            "full_name=Ada+Lovelace&email=ada%40example.com&password=123456",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/client");
    let session = cookie_pair(&response, "presencify_session").unwrap();

    let response = fixture.get("/client", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("No projects yet"));

    // Signed-in visitors skip the auth page.
    let response = fixture.get("/auth", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/client");

    let response = fixture
        .post_form(
            "/auth/signup",
            "full_name=Ada&email=ada%40example.com&password=123456",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(
        body_text(response)
            .await
            .contains("An account with this email already exists")
    );
}

#[tokio::test]
async fn test_client_portal_lists_own_projects() {
    let fixture = TestFixture::new();
    let (user_id, session) = fixture
        .signed_in("client@example.com", &[AppRole::Client])
        .await;
    fixture
        .backend
        .add_project(project(&user_id, "Bakery Storefront", ProjectStatus::InProgress))
        .await;
    fixture
        .backend
        .add_project(project("someone-else", "Other Client Site", ProjectStatus::Planning))
        .await;

    let response = fixture.get("/client", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Bakery Storefront"));
    assert!(!body.contains("Other Client Site"));
    assert!(body.contains("$5,000"));
}

#[tokio::test]
async fn test_client_portal_load_failure() {
    let fixture = TestFixture::new();
    let (_, session) = fixture
        .signed_in("client@example.com", &[AppRole::Client])
        .await;
    fixture.backend.fail(Operation::ListProjects).await;

    let response = fixture.get("/client", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Error loading projects"));
    assert!(!body.contains("No projects yet"));
}

#[tokio::test]
async fn test_admin_denied_for_client() {
    let fixture = TestFixture::new();
    let (_, session) = fixture
        .signed_in("client@example.com", &[AppRole::Client])
        .await;

    let response = fixture.get("/admin", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/client");
    let notice = cookie_pair(&response, "presencify_notice").unwrap();
    assert_eq!(notice, "presencify_notice=access-denied");

    let response = fixture
        .get("/client", Some(&format!("{session}; {notice}")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Access Denied"));
}

#[tokio::test]
async fn test_admin_role_check_failure() {
    let fixture = TestFixture::new();
    let (_, session) = fixture
        .signed_in("admin@example.com", &[AppRole::Client, AppRole::Admin])
        .await;
    fixture
        .backend
        .add_project(project("c1", "Secret Admin Row", ProjectStatus::Planning))
        .await;
    fixture.backend.fail(Operation::HasRole).await;

    let response = fixture.get("/admin", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_text(response).await;
    assert!(body.contains("verify your permissions"));
    assert!(!body.contains("Secret Admin Row"));
}

#[tokio::test]
async fn test_admin_dashboard() {
    let fixture = TestFixture::new();
    let (_, session) = fixture
        .signed_in("admin@example.com", &[AppRole::Client, AppRole::Admin])
        .await;
    fixture
        .backend
        .add_project(project("c1", "Bakery Storefront", ProjectStatus::InProgress))
        .await;
    fixture
        .backend
        .add_project(project("c2", "Dental Clinic", ProjectStatus::Completed))
        .await;

    let response = fixture
        .post_form(
            "/contact",
            "name=Grace+Hopper&email=grace%40example.com&message=We+need+a+new+website.",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = fixture.get("/admin", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Grace Hopper"));
    assert!(body.contains("grace@example.com"));
    assert!(body.contains("Bakery Storefront"));
    assert!(body.contains("Dental Clinic"));
}

#[tokio::test]
async fn test_admin_data_failure() {
    let fixture = TestFixture::new();
    let (_, session) = fixture
        .signed_in("admin@example.com", &[AppRole::Admin])
        .await;
    fixture.backend.fail(Operation::RecentSubmissions).await;

    let response = fixture.get("/admin", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Error loading data"));

    fixture.backend.recover(Operation::RecentSubmissions).await;
    let response = fixture.get("/admin", Some(&session)).await;
    assert!(!body_text(response).await.contains("Error loading data"));
}

#[tokio::test]
async fn test_sign_out_ends_session() {
    let fixture = TestFixture::new();
    let (_, session) = fixture
        .signed_in("client@example.com", &[AppRole::Client])
        .await;
    assert_eq!(fixture.backend.session_count().await, 1);

    let response = fixture.post_form("/signout", "", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let cookies = set_cookies(&response);
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with("presencify_session=;") && c.contains("Max-Age=0"))
    );
    assert!(cookies.iter().any(|c| c.starts_with("presencify_notice=signed-out")));
    assert_eq!(fixture.backend.session_count().await, 0);

    let response = fixture.get("/client", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth");
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_sql_backend_sign_up_and_contact() {
    use presencify::db::Database;
    use presencify::store::sql::SqlBackend;

    let temp_dir = tempfile::TempDir::new().unwrap();
    let config = Config::default();
    let database = Database::new(&config.database, temp_dir.path())
        .await
        .unwrap();
    let sql = Arc::new(SqlBackend::new(database.pool(), 3600));
    let shared: SharedBackend = sql.clone();
    let app = app_router(Arc::new(AppState::new(shared, &config)));

    let request = Request::builder()
        .method("POST")
        .uri("/auth/signup")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("full_name=Ada&email=ada%40example.com&password=123456"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let session = cookie_pair(&response, "presencify_session").unwrap();

    let request = Request::builder()
        .uri("/client")
        .header(header::COOKIE, &session)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .method("POST")
        .uri("/contact")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(
            "name=Grace+Hopper&email=grace%40example.com&message=We+need+a+new+website.",
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let stored = sql.list_submissions(10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].email, "grace@example.com");
    assert_eq!(stored[0].estimated_total, None);
}
