use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use ratarr::api::AppState;
use ratarr::auth::Role;
use ratarr::clients::mail::{Mailer, MemoryMailer, OutboundEmail};
use ratarr::config::Config;

async fn spawn_app() -> (Router, Arc<AppState>, Arc<MemoryMailer>) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.auth.token_secret = "integration-test-secret".to_string();

    let mailer = Arc::new(MemoryMailer::default());
    let state = ratarr::api::create_app_state_with_mailer(config, mailer.clone() as Arc<dyn Mailer>)
        .await
        .expect("Failed to create app state");
    let app = ratarr::api::router(state.clone());

    (app, state, mailer)
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(value) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

/// Walk the code-request and token-exchange flow for `email`, reading the
/// emailed secret back out of the memory mailer.
async fn obtain_access_token(app: &Router, mailer: &MemoryMailer, email: &str) -> String {
    let (status, _) = request(
        app,
        "POST",
        "/api/v1/auth/email",
        None,
        Some(json!({ "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let mail = mailer
        .sent()
        .into_iter()
        .find(|m| m.to == email)
        .expect("no mail dispatched");
    let secret = mail
        .body
        .strip_prefix("Your confirmation code: ")
        .expect("unexpected mail body")
        .to_string();

    let (status, body) = request(
        app,
        "POST",
        "/api/v1/auth/token",
        None,
        Some(json!({ "email": email, "secret": secret })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["refresh"].is_string());

    body["data"]["access"].as_str().unwrap().to_string()
}

async fn admin_token(app: &Router, state: &AppState, mailer: &MemoryMailer, email: &str) -> String {
    let token = obtain_access_token(app, mailer, email).await;
    state
        .store()
        .set_user_role(email, Role::Admin)
        .await
        .expect("failed to promote user");
    token
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_auth_flow() {
    let (app, _state, mailer) = spawn_app().await;

    let token = obtain_access_token(&app, &mailer, "alice@example.com").await;
    assert!(!token.is_empty());

    // The token works against an authenticated endpoint.
    let (status, body) = request(&app, "GET", "/api/v1/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_duplicate_email_is_rejected_without_mutation() {
    let (app, state, mailer) = spawn_app().await;

    obtain_access_token(&app, &mailer, "bob@example.com").await;

    let (status, _) = request(
        &app,
        "POST",
        "/api/v1/auth/email",
        None,
        Some(json!({ "email": "bob@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // No second mail, no second user.
    assert_eq!(mailer.sent().len(), 1);
    let (_, count) = state.store().list_users(1, 50).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_token_exchange_rejects_wrong_secret() {
    let (app, _state, mailer) = spawn_app().await;

    let (status, _) = request(
        &app,
        "POST",
        "/api/v1/auth/email",
        None,
        Some(json!({ "email": "carol@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(mailer.sent().len(), 1);

    let (status, _) = request(
        &app,
        "POST",
        "/api/v1/auth/token",
        None,
        Some(json!({ "email": "carol@example.com", "secret": "not-the-code" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_bearer_token_is_401() {
    let (app, _state, _mailer) = spawn_app().await;

    let (status, _) = request(&app, "GET", "/api/v1/titles", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

struct FailingMailer;

#[async_trait::async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: &OutboundEmail) -> anyhow::Result<()> {
        anyhow::bail!("relay down")
    }
}

#[tokio::test]
async fn test_mail_failure_surfaces_as_bad_gateway() {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.auth.token_secret = "integration-test-secret".to_string();

    let state = ratarr::api::create_app_state_with_mailer(config, Arc::new(FailingMailer))
        .await
        .expect("Failed to create app state");
    let app = ratarr::api::router(state);

    let (status, body) = request(
        &app,
        "POST",
        "/api/v1/auth/email",
        None,
        Some(json!({ "email": "dave@example.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
}

// ============================================================================
// Categories / Genres
// ============================================================================

#[tokio::test]
async fn test_category_writes_require_admin() {
    let (app, _state, mailer) = spawn_app().await;

    let payload = json!({ "name": "Films", "slug": "films" });

    let (status, _) = request(&app, "POST", "/api/v1/categories", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user = obtain_access_token(&app, &mailer, "plain@example.com").await;
    let (status, _) =
        request(&app, "POST", "/api/v1/categories", Some(&user), Some(payload)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_category_crud() {
    let (app, state, mailer) = spawn_app().await;
    let admin = admin_token(&app, &state, &mailer, "admin@example.com").await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/v1/categories",
        Some(&admin),
        Some(json!({ "name": "Films", "slug": "films" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["slug"], "films");

    // Duplicate slug.
    let (status, _) = request(
        &app,
        "POST",
        "/api/v1/categories",
        Some(&admin),
        Some(json!({ "name": "Films again", "slug": "films" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Anonymous list with exact-name search.
    let (status, body) = request(&app, "GET", "/api/v1/categories?search=Films", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["results"][0]["name"], "Films");

    let (status, _) = request(&app, "DELETE", "/api/v1/categories/films", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = request(&app, "DELETE", "/api/v1/categories/films", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pagination_envelope() {
    let (app, state, mailer) = spawn_app().await;
    let admin = admin_token(&app, &state, &mailer, "admin@example.com").await;

    for slug in ["one", "two", "three"] {
        let (status, _) = request(
            &app,
            "POST",
            "/api/v1/genres",
            Some(&admin),
            Some(json!({ "name": slug, "slug": slug })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = request(&app, "GET", "/api/v1/genres?page_size=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 3);
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 2);
    assert!(body["data"]["next"].is_string());
    assert!(body["data"]["previous"].is_null());

    let (status, body) =
        request(&app, "GET", "/api/v1/genres?page=2&page_size=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 1);
    assert!(body["data"]["next"].is_null());
    assert!(body["data"]["previous"].is_string());
}

#[tokio::test]
async fn test_pagination_links_preserve_filters() {
    let (app, state, mailer) = spawn_app().await;
    let admin = admin_token(&app, &state, &mailer, "admin@example.com").await;

    // Three genres share a name; a fourth must stay outside the filter.
    for (name, slug) in [
        ("Noir", "noir-us"),
        ("Noir", "noir-fr"),
        ("Noir", "noir-jp"),
        ("Western", "western"),
    ] {
        let (status, _) = request(
            &app,
            "POST",
            "/api/v1/genres",
            Some(&admin),
            Some(json!({ "name": name, "slug": slug })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) =
        request(&app, "GET", "/api/v1/genres?search=Noir&page_size=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 3);

    let next = body["data"]["next"].as_str().unwrap().to_string();
    assert!(next.contains("search=Noir"), "next link dropped the filter: {next}");

    // Following the link stays inside the filtered collection.
    let (status, body) = request(&app, "GET", &next, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 3);
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 1);

    let previous = body["data"]["previous"].as_str().unwrap();
    assert!(previous.contains("search=Noir"));
}

// ============================================================================
// Titles
// ============================================================================

async fn seed_taxonomy(app: &Router, admin: &str) {
    for (uri, name, slug) in [
        ("/api/v1/categories", "Films", "films"),
        ("/api/v1/categories", "Books", "books"),
        ("/api/v1/genres", "Drama", "drama"),
        ("/api/v1/genres", "Comedy", "comedy"),
    ] {
        let (status, _) = request(
            app,
            "POST",
            uri,
            Some(admin),
            Some(json!({ "name": name, "slug": slug })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

async fn create_title(app: &Router, admin: &str, payload: Value) -> i64 {
    let (status, body) = request(app, "POST", "/api/v1/titles", Some(admin), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_title_create_resolves_slugs() {
    let (app, state, mailer) = spawn_app().await;
    let admin = admin_token(&app, &state, &mailer, "admin@example.com").await;
    seed_taxonomy(&app, &admin).await;

    // Unknown genre slugs are dropped, known ones attached.
    let id = create_title(
        &app,
        &admin,
        json!({
            "name": "The Long Goodbye",
            "year": 1973,
            "category": "films",
            "genre": ["drama", "no-such-genre"]
        }),
    )
    .await;

    let (status, body) = request(&app, "GET", &format!("/api/v1/titles/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["category"]["slug"], "films");
    assert_eq!(body["data"]["genre"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["genre"][0]["slug"], "drama");
    assert!(body["data"]["rating"].is_null());

    // An unknown category slug is a 404.
    let (status, _) = request(
        &app,
        "POST",
        "/api/v1/titles",
        Some(&admin),
        Some(json!({ "name": "Nowhere", "year": 2000, "category": "no-such-category" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_title_filters() {
    let (app, state, mailer) = spawn_app().await;
    let admin = admin_token(&app, &state, &mailer, "admin@example.com").await;
    seed_taxonomy(&app, &admin).await;

    create_title(
        &app,
        &admin,
        json!({ "name": "Chinatown", "year": 1974, "category": "films", "genre": ["drama"] }),
    )
    .await;
    create_title(
        &app,
        &admin,
        json!({ "name": "China Court", "year": 1961, "category": "books", "genre": ["comedy"] }),
    )
    .await;

    let cases = [
        ("/api/v1/titles?genre=drama", 1, "Chinatown"),
        ("/api/v1/titles?category=books", 1, "China Court"),
        ("/api/v1/titles?year=1974", 1, "Chinatown"),
        ("/api/v1/titles?name=China", 2, "Chinatown"),
    ];
    for (uri, count, first) in cases {
        let (status, body) = request(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["data"]["count"], count, "{uri}");
        assert_eq!(body["data"]["results"][0]["name"], first, "{uri}");
    }

    // A filter on an unknown slug matches nothing.
    let (status, body) = request(&app, "GET", "/api/v1/titles?genre=no-such", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 0);
}

#[tokio::test]
async fn test_titles_order_by_rating_descending_unrated_last() {
    let (app, state, mailer) = spawn_app().await;
    let admin = admin_token(&app, &state, &mailer, "admin@example.com").await;
    let alice = obtain_access_token(&app, &mailer, "alice@example.com").await;

    let unrated = create_title(&app, &admin, json!({ "name": "Unseen", "year": 2001 })).await;
    let low = create_title(&app, &admin, json!({ "name": "Fine", "year": 2002 })).await;
    let high = create_title(&app, &admin, json!({ "name": "Great", "year": 2003 })).await;

    for (title, score) in [(low, 4), (high, 9)] {
        let (status, _) = request(
            &app,
            "POST",
            &format!("/api/v1/titles/{title}/reviews"),
            Some(&alice),
            Some(json!({ "text": "review", "score": score })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = request(&app, "GET", "/api/v1/titles", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let ids: Vec<i64> = body["data"]["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![high, low, unrated]);
}

#[tokio::test]
async fn test_title_patch_replaces_genres() {
    let (app, state, mailer) = spawn_app().await;
    let admin = admin_token(&app, &state, &mailer, "admin@example.com").await;
    seed_taxonomy(&app, &admin).await;

    let id = create_title(
        &app,
        &admin,
        json!({ "name": "Amarcord", "year": 1973, "genre": ["drama"] }),
    )
    .await;

    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/v1/titles/{id}"),
        Some(&admin),
        Some(json!({ "genre": ["comedy"], "category": "films" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["genre"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["genre"][0]["slug"], "comedy");
    assert_eq!(body["data"]["category"]["slug"], "films");
}

#[tokio::test]
async fn test_category_delete_detaches_titles() {
    let (app, state, mailer) = spawn_app().await;
    let admin = admin_token(&app, &state, &mailer, "admin@example.com").await;
    seed_taxonomy(&app, &admin).await;

    let id = create_title(
        &app,
        &admin,
        json!({ "name": "Solaris", "year": 1972, "category": "films" }),
    )
    .await;

    let (status, _) = request(&app, "DELETE", "/api/v1/categories/films", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = request(&app, "GET", &format!("/api/v1/titles/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["category"].is_null());
}

// ============================================================================
// Reviews and ratings
// ============================================================================

#[tokio::test]
async fn test_rating_follows_review_lifecycle() {
    let (app, state, mailer) = spawn_app().await;
    let admin = admin_token(&app, &state, &mailer, "admin@example.com").await;
    let alice = obtain_access_token(&app, &mailer, "alice@example.com").await;
    let bob = obtain_access_token(&app, &mailer, "bob@example.com").await;

    let title = create_title(&app, &admin, json!({ "name": "Stalker", "year": 1979 })).await;
    let reviews_uri = format!("/api/v1/titles/{title}/reviews");

    let rating_of = |body: &Value| body["data"]["rating"].clone();

    let (status, body) = request(
        &app,
        "POST",
        &reviews_uri,
        Some(&alice),
        Some(json!({ "text": "Slow and hypnotic", "score": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let alice_review = body["data"]["id"].as_i64().unwrap();

    let (_, body) = request(&app, "GET", &format!("/api/v1/titles/{title}"), None, None).await;
    assert_eq!(rating_of(&body), json!(6));

    let (status, body) = request(
        &app,
        "POST",
        &reviews_uri,
        Some(&bob),
        Some(json!({ "text": "A masterpiece", "score": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let bob_review = body["data"]["id"].as_i64().unwrap();

    // Mean of 6 and 7 rounds half away from zero.
    let (_, body) = request(&app, "GET", &format!("/api/v1/titles/{title}"), None, None).await;
    assert_eq!(rating_of(&body), json!(7));

    // A second review from the same author is a validation error.
    let (status, _) = request(
        &app,
        "POST",
        &reviews_uri,
        Some(&alice),
        Some(json!({ "text": "Changed my mind", "score": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Editing in place moves the rating.
    let (status, _) = request(
        &app,
        "PATCH",
        &format!("{reviews_uri}/{alice_review}"),
        Some(&alice),
        Some(json!({ "score": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request(&app, "GET", &format!("/api/v1/titles/{title}"), None, None).await;
    assert_eq!(rating_of(&body), json!(9));

    // Admin may delete someone else's review; the mean follows.
    let (status, _) = request(
        &app,
        "DELETE",
        &format!("{reviews_uri}/{bob_review}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = request(&app, "GET", &format!("/api/v1/titles/{title}"), None, None).await;
    assert_eq!(rating_of(&body), json!(10));

    // With the last review gone the title is unrated again.
    let (status, _) = request(
        &app,
        "DELETE",
        &format!("{reviews_uri}/{alice_review}"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = request(&app, "GET", &format!("/api/v1/titles/{title}"), None, None).await;
    assert!(rating_of(&body).is_null());
}

#[tokio::test]
async fn test_review_permissions_and_validation() {
    let (app, state, mailer) = spawn_app().await;
    let admin = admin_token(&app, &state, &mailer, "admin@example.com").await;
    let alice = obtain_access_token(&app, &mailer, "alice@example.com").await;
    let bob = obtain_access_token(&app, &mailer, "bob@example.com").await;

    let title = create_title(&app, &admin, json!({ "name": "Mirror", "year": 1975 })).await;
    let reviews_uri = format!("/api/v1/titles/{title}/reviews");

    // Anonymous cannot post.
    let (status, _) = request(
        &app,
        "POST",
        &reviews_uri,
        None,
        Some(json!({ "text": "x", "score": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Score outside 1..=10.
    let (status, _) = request(
        &app,
        "POST",
        &reviews_uri,
        Some(&alice),
        Some(json!({ "text": "x", "score": 11 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = request(
        &app,
        "POST",
        &reviews_uri,
        Some(&alice),
        Some(json!({ "text": "Dense but rewarding", "score": 8 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let review = body["data"]["id"].as_i64().unwrap();

    // Another plain user can neither edit nor delete it.
    let (status, _) = request(
        &app,
        "PATCH",
        &format!("{reviews_uri}/{review}"),
        Some(&bob),
        Some(json!({ "score": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("{reviews_uri}/{review}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A review under a missing title is a 404.
    let (status, _) = request(&app, "GET", "/api/v1/titles/9999/reviews", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Comments
// ============================================================================

#[tokio::test]
async fn test_comment_lifecycle() {
    let (app, state, mailer) = spawn_app().await;
    let admin = admin_token(&app, &state, &mailer, "admin@example.com").await;
    let alice = obtain_access_token(&app, &mailer, "alice@example.com").await;
    let bob = obtain_access_token(&app, &mailer, "bob@example.com").await;

    let title = create_title(&app, &admin, json!({ "name": "Nostalghia", "year": 1983 })).await;

    let (_, body) = request(
        &app,
        "POST",
        &format!("/api/v1/titles/{title}/reviews"),
        Some(&alice),
        Some(json!({ "text": "Haunting", "score": 9 })),
    )
    .await;
    let review = body["data"]["id"].as_i64().unwrap();
    let comments_uri = format!("/api/v1/titles/{title}/reviews/{review}/comments");

    let (status, body) = request(
        &app,
        "POST",
        &comments_uri,
        Some(&bob),
        Some(json!({ "text": "Agreed" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment = body["data"]["id"].as_i64().unwrap();

    // The review must be addressed through its own title.
    let (status, _) = request(
        &app,
        "GET",
        &format!("/api/v1/titles/9999/reviews/{review}/comments/{comment}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The author edits; a bystander cannot.
    let (status, body) = request(
        &app,
        "PATCH",
        &format!("{comments_uri}/{comment}"),
        Some(&bob),
        Some(json!({ "text": "Strongly agreed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["text"], "Strongly agreed");

    let (status, _) = request(
        &app,
        "PATCH",
        &format!("{comments_uri}/{comment}"),
        Some(&alice),
        Some(json!({ "text": "hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("{comments_uri}/{comment}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = request(&app, "GET", &comments_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 0);
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_me_cannot_change_role() {
    let (app, _state, mailer) = spawn_app().await;
    let alice = obtain_access_token(&app, &mailer, "alice@example.com").await;

    let (status, body) = request(
        &app,
        "PATCH",
        "/api/v1/users/me",
        Some(&alice),
        Some(json!({ "username": "alice", "bio": "reader" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["role"], "user");

    let (status, _) = request(
        &app,
        "PATCH",
        "/api/v1/users/me",
        Some(&alice),
        Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_user_management() {
    let (app, state, mailer) = spawn_app().await;
    let admin = admin_token(&app, &state, &mailer, "admin@example.com").await;
    let alice = obtain_access_token(&app, &mailer, "alice@example.com").await;

    // The collection is admin-only.
    let (status, _) = request(&app, "GET", "/api/v1/users", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = request(&app, "GET", "/api/v1/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 2);

    // Give alice a username, then manage her by it.
    let (status, _) = request(
        &app,
        "PATCH",
        "/api/v1/users/me",
        Some(&alice),
        Some(json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        &app,
        "PATCH",
        "/api/v1/users/alice",
        Some(&admin),
        Some(json!({ "role": "staff" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "staff");

    // "me" can never be claimed as a username.
    let (status, _) = request(
        &app,
        "PATCH",
        "/api/v1/users/alice",
        Some(&admin),
        Some(json!({ "username": "me" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(&app, "DELETE", "/api/v1/users/alice", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = request(&app, "GET", "/api/v1/users/alice", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// System
// ============================================================================

#[tokio::test]
async fn test_health_probes() {
    let (app, _state, _mailer) = spawn_app().await;

    let (status, body) = request(&app, "GET", "/api/v1/system/health/live", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "alive");

    let (status, body) = request(&app, "GET", "/api/v1/system/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ready"], true);
    assert_eq!(body["data"]["database"], true);
}

#[tokio::test]
async fn test_staff_can_moderate_reviews() {
    let (app, state, mailer) = spawn_app().await;
    let admin = admin_token(&app, &state, &mailer, "admin@example.com").await;
    let alice = obtain_access_token(&app, &mailer, "alice@example.com").await;
    let staff = obtain_access_token(&app, &mailer, "staff@example.com").await;
    state
        .store()
        .set_user_role("staff@example.com", Role::Staff)
        .await
        .unwrap();

    let title = create_title(&app, &admin, json!({ "name": "Ran", "year": 1985 })).await;

    let (_, body) = request(
        &app,
        "POST",
        &format!("/api/v1/titles/{title}/reviews"),
        Some(&alice),
        Some(json!({ "text": "Spam spam spam", "score": 1 })),
    )
    .await;
    let review = body["data"]["id"].as_i64().unwrap();

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/v1/titles/{title}/reviews/{review}"),
        Some(&staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
