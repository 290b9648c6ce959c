//! Shared helpers for the API integration suites.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use coffeeshop_api::auth::{AuthConfig, TokenVerifier};

pub const JWKS_PATH: &str = "/.well-known/jwks.json";
pub const KEY_ID: &str = "test-key-1";
pub const AUDIENCE: &str = "drinks";

const RSA_PRIVATE_PEM: &str = include_str!("../fixtures/rsa_private.pem");
const JWKS_DOCUMENT: &str = include_str!("../fixtures/jwks.json");

/// Issuer expected by verifiers built with [`jwks_verifier`].
pub fn issuer(server: &MockServer) -> String {
    format!("{}/", server.uri())
}

/// Starts a mock identity provider publishing the fixture key set.
pub async fn start_identity_provider() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(JWKS_DOCUMENT, "application/json"))
        .mount(&server)
        .await;
    server
}

/// RS256 verifier trusting the mock provider, with issuer and audience checks.
pub fn jwks_verifier(server: &MockServer) -> TokenVerifier {
    let jwks_uri = Url::parse(&format!("{}{}", server.uri(), JWKS_PATH)).unwrap();
    TokenVerifier::new(
        AuthConfig::jwks(jwks_uri)
            .with_issuer(issuer(server))
            .with_audience(AUDIENCE),
    )
    .unwrap()
}

/// Mints an RS256 token the way the identity provider would.
pub fn mint_token(server: &MockServer, permissions: &[&str]) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = json!({
        "iss": issuer(server),
        "sub": "auth0|manager",
        "aud": [AUDIENCE, format!("{}userinfo", issuer(server))],
        "iat": now,
        "exp": now + 3600,
        "permissions": permissions,
    });
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KEY_ID.to_string());
    encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(RSA_PRIVATE_PEM.as_bytes()).unwrap(),
    )
    .unwrap()
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Sends a request and decodes the JSON body (`Value::Null` if not JSON).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}
