//! End-to-end auth flows against a mock backend.

use std::sync::{Arc, Mutex};

use secrecy::SecretString;
use url::Url;
use vendor_connect_client::backend::token_store::{
    ACCESS_TOKEN_KEY, PROFILE_KEY, REFRESH_TOKEN_KEY, USER_KEY,
};
use vendor_connect_client::backend::{BackendClient, TokenStore};
use vendor_connect_client::config::BackendConfig;
use vendor_connect_client::session::{AuthState, SessionManager, SignUpRequest};
use vendor_connect_core::{UserId, UserType};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn backend_for(server: &MockServer, tokens: TokenStore) -> BackendClient {
    let config = BackendConfig {
        base_url: Url::parse(&server.uri()).expect("mock server uri"),
        api_key: SecretString::from("test-anon-key"),
    };
    BackendClient::new(&config, tokens)
}

fn seed_signed_in_vendor(tokens: &TokenStore) {
    tokens.set(ACCESS_TOKEN_KEY, "t1");
    tokens.set(USER_KEY, r#"{"id":"u1","email":"a@b.com"}"#);
    tokens.set(
        PROFILE_KEY,
        r#"{"id":"u1","name":"Ravi","user_type":"vendor"}"#,
    );
}

type SeenEvents = Arc<Mutex<Vec<(AuthState, Option<UserId>, Option<String>)>>>;

fn recording_listener(manager: &SessionManager) -> SeenEvents {
    let seen: SeenEvents = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    manager.subscribe(move |state, user, profile| {
        seen_clone.lock().expect("listener lock").push((
            state,
            user.map(|u| u.id.clone()),
            profile.map(|p| p.name.clone()),
        ));
    });
    seen
}

#[tokio::test]
async fn sign_up_persists_session_and_creates_profile() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(header("apikey", "test-anon-key"))
        .and(body_partial_json(serde_json::json!({
            "email": "a@b.com",
            "password": "abcdef",
            "data": { "name": "Ravi", "user_type": "vendor" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "user": { "id": "u1", "email": "a@b.com" },
            "access_token": "t1",
            "refresh_token": "r1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    // The profile insert must carry the new user's id and the session token.
    Mock::given(method("POST"))
        .and(path("/rest/v1/user_profiles"))
        .and(header("authorization", "Bearer t1"))
        .and(body_partial_json(serde_json::json!({
            "id": "u1",
            "user_type": "vendor",
            "phone": "9876543210"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!([{
            "id": "u1",
            "name": "Ravi",
            "user_type": "vendor",
            "phone": "9876543210"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = TokenStore::new();
    let manager = SessionManager::new(backend_for(&server, tokens.clone()));

    let outcome = manager
        .sign_up(SignUpRequest {
            email: "a@b.com".to_string(),
            password: "abcdef".to_string(),
            name: "Ravi".to_string(),
            user_type: UserType::Vendor,
            phone: "9876543210".to_string(),
            business_name: None,
            address_street: Some("12 Market Rd".to_string()),
            address_city: Some("Pune".to_string()),
            address_state: Some("MH".to_string()),
            address_pincode: Some("411001".to_string()),
        })
        .await
        .expect("sign up");

    assert!(outcome.authenticated);
    assert_eq!(outcome.user.id, UserId::new("u1"));
    assert_eq!(outcome.profile.id, UserId::new("u1"));

    // Session persisted under the fixed keys.
    assert_eq!(tokens.get(ACCESS_TOKEN_KEY).as_deref(), Some("t1"));
    assert_eq!(tokens.get(REFRESH_TOKEN_KEY).as_deref(), Some("r1"));
    assert!(tokens.get(USER_KEY).is_some());
    assert!(tokens.get(PROFILE_KEY).is_some());
}

#[tokio::test]
async fn sign_up_rejects_invalid_phone_before_network() {
    init_tracing();
    let server = MockServer::start().await;
    // No mocks mounted: a network call would 404 and fail differently.

    let manager = SessionManager::new(backend_for(&server, TokenStore::new()));
    let err = manager
        .sign_up(SignUpRequest {
            email: "a@b.com".to_string(),
            password: "abcdef".to_string(),
            name: "Ravi".to_string(),
            user_type: UserType::Vendor,
            phone: "1234567890".to_string(),
            business_name: None,
            address_street: None,
            address_city: None,
            address_state: None,
            address_pincode: None,
        })
        .await
        .expect_err("phone must fail validation");

    assert_eq!(
        err.to_string(),
        "Please enter a valid 10-digit phone number"
    );
    assert_eq!(server.received_requests().await.expect("requests").len(), 0);
}

#[tokio::test]
async fn sign_in_fetches_profile_and_notifies_listeners() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "t1",
            "refresh_token": "r1",
            "user": { "id": "u1", "email": "a@b.com" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/user_profiles"))
        .and(query_param("id", "eq.u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "id": "u1",
            "name": "Ravi",
            "user_type": "vendor"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let manager = SessionManager::new(backend_for(&server, TokenStore::new()));
    let seen = recording_listener(&manager);

    manager.sign_in("a@b.com", "abcdef").await.expect("sign in");

    let events = seen.lock().expect("events lock").clone();
    assert_eq!(events.len(), 2);
    // Replay on subscribe, then the sign-in transition with user + profile.
    assert_eq!(events.first().expect("replay event").0, AuthState::SignedOut);
    let (state, user, profile) = events.get(1).expect("transition event");
    assert_eq!(*state, AuthState::SignedIn);
    assert_eq!(user.clone().expect("user"), UserId::new("u1"));
    assert_eq!(profile.as_deref(), Some("Ravi"));
}

#[tokio::test]
async fn subscribe_after_sign_in_replays_current_state_once() {
    init_tracing();
    let server = MockServer::start().await;

    let tokens = TokenStore::new();
    seed_signed_in_vendor(&tokens);
    let manager = SessionManager::new(backend_for(&server, tokens));

    let seen = recording_listener(&manager);

    {
        let events = seen.lock().expect("events lock");
        assert_eq!(events.len(), 1);
        let (state, user, profile) = events.first().expect("replay event");
        assert_eq!(*state, AuthState::SignedIn);
        assert_eq!(user.clone().expect("user"), UserId::new("u1"));
        assert_eq!(profile.as_deref(), Some("Ravi"));
    }

    // The replay happened before any subsequent transition.
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    manager.sign_out().await;

    let events = seen.lock().expect("events lock");
    assert_eq!(events.len(), 2);
    assert_eq!(events.get(1).expect("sign-out event").0, AuthState::SignedOut);
}

#[tokio::test]
async fn sign_out_clears_local_state_even_when_remote_fails() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend down"))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = TokenStore::new();
    seed_signed_in_vendor(&tokens);
    tokens.set(REFRESH_TOKEN_KEY, "r1");
    let manager = SessionManager::new(backend_for(&server, tokens.clone()));
    let seen = recording_listener(&manager);

    manager.sign_out().await;

    // All four persistence keys cleared despite the failed remote call.
    assert!(tokens.get(ACCESS_TOKEN_KEY).is_none());
    assert!(tokens.get(REFRESH_TOKEN_KEY).is_none());
    assert!(tokens.get(USER_KEY).is_none());
    assert!(tokens.get(PROFILE_KEY).is_none());
    assert!(!manager.is_authenticated());

    let events = seen.lock().expect("events lock");
    assert_eq!(events.last().expect("final event").0, AuthState::SignedOut);
}

#[tokio::test]
async fn sign_in_provisions_default_profile_when_none_exists() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "t1",
            "user": {
                "id": "u1",
                "email": "ravi@example.com",
                "user_metadata": { "name": "Ravi Kumar" }
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/user_profiles"))
        .and(query_param("id", "eq.u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    // No profile row: a minimal vendor profile is written back.
    Mock::given(method("POST"))
        .and(path("/rest/v1/user_profiles"))
        .and(body_partial_json(serde_json::json!({
            "id": "u1",
            "name": "Ravi Kumar",
            "user_type": "vendor"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!([{
            "id": "u1",
            "name": "Ravi Kumar",
            "user_type": "vendor"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let manager = SessionManager::new(backend_for(&server, TokenStore::new()));
    manager
        .sign_in("ravi@example.com", "abcdef")
        .await
        .expect("sign in");

    assert!(manager.is_vendor());
}

#[tokio::test]
async fn verify_token_failure_signs_out() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "msg": "JWT expired"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let tokens = TokenStore::new();
    seed_signed_in_vendor(&tokens);
    let manager = SessionManager::new(backend_for(&server, tokens.clone()));

    assert!(!manager.verify_token().await);
    assert!(tokens.get(ACCESS_TOKEN_KEY).is_none());
    assert!(!manager.is_authenticated());
}

#[tokio::test]
async fn refresh_session_rotates_tokens() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_partial_json(serde_json::json!({ "refresh_token": "r1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "t2",
            "refresh_token": "r2",
            "user": { "id": "u1", "email": "a@b.com" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = TokenStore::new();
    seed_signed_in_vendor(&tokens);
    tokens.set(REFRESH_TOKEN_KEY, "r1");
    let manager = SessionManager::new(backend_for(&server, tokens.clone()));

    let session = manager.refresh_session().await.expect("refresh");

    assert_eq!(session.access_token, "t2");
    assert_eq!(tokens.get(ACCESS_TOKEN_KEY).as_deref(), Some("t2"));
    assert_eq!(tokens.get(REFRESH_TOKEN_KEY).as_deref(), Some("r2"));
}

#[tokio::test]
async fn sign_in_surfaces_domain_error_from_error_body() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let manager = SessionManager::new(backend_for(&server, TokenStore::new()));
    let err = manager
        .sign_in("a@b.com", "wrong-password")
        .await
        .expect_err("credentials must be rejected");

    assert_eq!(err.to_string(), "Backend error: Invalid login credentials");
    assert!(!manager.is_authenticated());
}
