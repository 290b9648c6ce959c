//! End-to-end drinks API tests.
//!
//! Requests go through the production router and middleware, tokens are
//! RS256 JWTs verified against a mock JWKS endpoint, and drinks are stored
//! in a SQLite database file.

mod common;

use std::sync::Arc;

use axum::{http::StatusCode, Router};
use serde_json::json;

use coffeeshop_api::http::{create_router_with_observability, AppState, ObservabilityOptions};
use coffeeshop_storage::{DrinkStore, SqliteConfig, SqliteDrinkStore};

use common::{jwks_verifier, mint_token, request, send, start_identity_provider};

struct TestService {
    app: Router,
    storage: Arc<SqliteDrinkStore>,
    provider: wiremock::MockServer,
    _dir: tempfile::TempDir,
}

async fn start_service() -> TestService {
    let dir = tempfile::tempdir().unwrap();
    let config = SqliteConfig {
        database_url: format!("sqlite://{}", dir.path().join("drinks.db").display()),
        ..Default::default()
    };
    let storage = SqliteDrinkStore::from_config(&config).await.unwrap();
    storage.run_migrations().await.unwrap();
    let storage = Arc::new(storage);

    let provider = start_identity_provider().await;
    let verifier = Arc::new(jwks_verifier(&provider));
    let app = create_router_with_observability(
        AppState::new(Arc::clone(&storage), verifier),
        ObservabilityOptions::default(),
    );

    TestService {
        app,
        storage,
        provider,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_barista_and_manager_flow() {
    let service = start_service().await;
    let manager = mint_token(
        &service.provider,
        &["get:drinks-detail", "post:drinks", "patch:drinks", "delete:drinks"],
    );
    let barista = mint_token(&service.provider, &["get:drinks-detail"]);

    // The manager creates a drink from a single ingredient object.
    let (status, created) = send(
        &service.app,
        request(
            "POST",
            "/drinks",
            Some(&manager),
            Some(json!({
                "title": "Water",
                "recipe": { "name": "water", "color": "blue", "parts": 1 }
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["drinks"][0]["id"].as_i64().unwrap();

    // Anyone sees the short view.
    let (status, public) = send(&service.app, request("GET", "/drinks", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        public["drinks"],
        json!([{ "id": id, "title": "Water", "recipe": [{ "name": "water", "color": "blue" }] }])
    );

    // The barista sees quantities but cannot change anything.
    let (status, detail) = send(
        &service.app,
        request("GET", "/drinks-detail", Some(&barista), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["drinks"][0]["recipe"][0]["parts"], 1);

    let (status, _) = send(
        &service.app,
        request("DELETE", &format!("/drinks/{id}"), Some(&barista), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The manager replaces and then deletes it.
    let (status, patched) = send(
        &service.app,
        request(
            "PATCH",
            &format!("/drinks/{id}"),
            Some(&manager),
            Some(json!({
                "title": "Sparkling Water",
                "recipe": [
                    { "name": "water", "color": "blue", "parts": 3 },
                    { "name": "bubbles", "color": "white", "parts": 1 }
                ]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["drinks"][0]["title"], "Sparkling Water");
    assert_eq!(
        service.storage.get_drink(id).await.unwrap().title,
        "Sparkling Water"
    );

    let (status, deleted) = send(
        &service.app,
        request("DELETE", &format!("/drinks/{id}"), Some(&manager), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({ "success": true, "delete": id }));

    let (status, _) = send(
        &service.app,
        request("DELETE", &format!("/drinks/{id}"), Some(&manager), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_title_leaves_database_unchanged() {
    let service = start_service().await;
    let token = mint_token(&service.provider, &["post:drinks"]);
    let body = json!({
        "title": "Latte",
        "recipe": [{ "name": "milk", "color": "white", "parts": 2 }]
    });

    let (status, _) = send(
        &service.app,
        request("POST", "/drinks", Some(&token), Some(body.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, error) = send(
        &service.app,
        request("POST", "/drinks", Some(&token), Some(body)),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        error,
        json!({ "success": false, "error": 422, "message": "unprocessable" })
    );
    assert_eq!(service.storage.list_drinks().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_token_from_another_issuer_is_rejected() {
    let service = start_service().await;
    let other_provider = start_identity_provider().await;
    // Same signing key, different issuer.
    let token = mint_token(&other_provider, &["post:drinks"]);

    let (status, body) = send(
        &service.app,
        request(
            "POST",
            "/drinks",
            Some(&token),
            Some(json!({ "title": "Tea", "recipe": [] })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["message"],
        "Incorrect claims. Please, check the audience and issuer."
    );
}

#[tokio::test]
async fn test_missing_authorization_on_every_protected_route() {
    let service = start_service().await;

    for (method, uri) in [
        ("GET", "/drinks-detail"),
        ("POST", "/drinks"),
        ("PATCH", "/drinks/1"),
        ("DELETE", "/drinks/1"),
    ] {
        let (status, body) = send(&service.app, request(method, uri, None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["error"], 401);
        assert_eq!(body["message"], "Authorization header is expected.");
    }
}

#[tokio::test]
async fn test_reset_seeds_single_drink() {
    let service = start_service().await;
    let token = mint_token(&service.provider, &["post:drinks"]);
    send(
        &service.app,
        request(
            "POST",
            "/drinks",
            Some(&token),
            Some(json!({
                "title": "Mocha",
                "recipe": [{ "name": "chocolate", "color": "brown", "parts": 1 }]
            })),
        ),
    )
    .await;

    service.storage.reset().await.unwrap();

    let (_, listing) = send(&service.app, request("GET", "/drinks", None, None)).await;
    assert_eq!(listing["drinks"].as_array().unwrap().len(), 1);
    assert_eq!(listing["drinks"][0]["title"], "water");
}
