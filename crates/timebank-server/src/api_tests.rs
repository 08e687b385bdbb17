use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use timebank_core::{MarketConfig, RatePolicy};

use crate::{build_router, AppState};

struct TestApp {
    router: Router,
    _temp: TempDir,
}

impl TestApp {
    fn new(config: MarketConfig) -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let config = MarketConfig {
            database_path: Some(temp.path().join("test.db")),
            ..config
        };
        let state = AppState::new(config).expect("Failed to create state");
        Self {
            router: build_router(state),
            _temp: temp,
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Register a user and return (id, token)
    async fn register(&self, username: &str, hourly_rate: Option<i64>) -> (String, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/users",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "hourlyRate": hourly_rate,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        (
            body["user"]["id"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    async fn credits(&self, token: &str) -> i64 {
        let (_, me) = self.call(Method::GET, "/api/users/me", Some(token), None).await;
        me["credits"].as_i64().unwrap()
    }
}

fn booking(provider_id: &str, duration: i64) -> Value {
    json!({
        "providerId": provider_id,
        "skill": "Sourdough",
        "duration": duration,
        "scheduledDate": "2026-11-02T18:00:00Z",
        "message": "Saturday morning?",
    })
}

fn starting(credits: i64) -> MarketConfig {
    MarketConfig {
        starting_credits: credits,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_health_is_open() {
    let app = TestApp::new(MarketConfig::default());
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_api_requires_bearer_token() {
    let app = TestApp::new(MarketConfig::default());
    let (status, body) = app.call(Method::GET, "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app
        .call(Method::GET, "/api/exchanges", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_registration_grants_starting_credits() {
    let app = TestApp::new(starting(10));
    let (id, token) = app.register("ines", Some(3)).await;

    let (status, me) = app.call(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], id.as_str());
    assert_eq!(me["credits"], 10);
    assert_eq!(me["hourlyRate"], 3);

    let (_, history) = app
        .call(Method::GET, "/api/users/me/transactions", Some(&token), None)
        .await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["reason"], "grant");

    // Other users see the profile without balance or email
    let (other, other_token) = app.register("jon", None).await;
    let (status, profile) = app
        .call(Method::GET, &format!("/api/users/{}", id), Some(&other_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(profile.get("credits").is_none());
    assert!(profile.get("email").is_none());
    assert_ne!(other, id);
}

#[tokio::test]
async fn test_profile_skill_names() {
    let app = TestApp::new(MarketConfig::default());
    let (_, token) = app.register("kai", None).await;

    app.call(
        Method::POST,
        "/api/users/me/skills",
        Some(&token),
        Some(json!({"name": "Woodwork"})),
    )
    .await;
    let (status, me) = app
        .call(
            Method::POST,
            "/api/users/me/skills",
            Some(&token),
            Some(json!({"name": "woodwork"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["skills"], json!(["Woodwork"]));
}

#[tokio::test]
async fn test_skill_listing_and_search() {
    let app = TestApp::new(MarketConfig::default());
    let (provider, token) = app.register("lena", None).await;

    for (title, category) in [
        ("Python basics", "Technology"),
        ("Watercolour", "Arts & Crafts"),
        ("Rust ownership", "Technology"),
    ] {
        let (status, _) = app
            .call(
                Method::POST,
                "/api/skills",
                Some(&token),
                Some(json!({
                    "title": title,
                    "description": "Hands-on sessions",
                    "category": category,
                    "difficulty": "Beginner",
                    "duration": 2,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, found) = app
        .call(Method::GET, "/api/skills?category=Technology", Some(&token), None)
        .await;
    let titles: Vec<&str> = found
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Python basics", "Rust ownership"]);

    let (_, found) = app
        .call(
            Method::GET,
            &format!("/api/skills?search=WATER&category=all&providerId={}", provider),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (status, body) = app
        .call(Method::GET, "/api/skills?category=Gardening", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_exchange_lifecycle_over_http() {
    let app = TestApp::new(starting(5));
    let (provider, provider_token) = app.register("mia", None).await;
    let (seeker, seeker_token) = app.register("noah", None).await;

    let (status, exchange) = app
        .call(Method::POST, "/api/exchanges", Some(&seeker_token), Some(booking(&provider, 3)))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", exchange);
    assert_eq!(exchange["status"], "pending");
    assert_eq!(exchange["seekerId"], seeker.as_str());
    assert_eq!(exchange["cost"], 3);
    assert_eq!(app.credits(&seeker_token).await, 2);
    assert_eq!(app.credits(&provider_token).await, 8);

    let uri = format!("/api/exchanges/{}", exchange["id"].as_str().unwrap());

    // Only the provider accepts
    let (status, body) = app
        .call(Method::PATCH, &uri, Some(&seeker_token), Some(json!({"status": "accepted"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, _) = app
        .call(Method::PATCH, &uri, Some(&provider_token), Some(json!({"status": "accepted"})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, done) = app
        .call(
            Method::PATCH,
            &uri,
            Some(&seeker_token),
            Some(json!({"status": "completed", "rating": 5, "review": "Lovely crumb"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "completed");
    assert_eq!(done["rating"]["seeker"], 5);

    let (status, body) = app
        .call(Method::PATCH, &uri, Some(&seeker_token), Some(json!({"status": "cancelled"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");
    assert_eq!(app.credits(&seeker_token).await, 2);
    assert_eq!(app.credits(&provider_token).await, 8);

    let (_, mine) = app
        .call(Method::GET, "/api/exchanges?status=completed", Some(&provider_token), None)
        .await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_exchange_errors_over_http() {
    let app = TestApp::new(MarketConfig {
        rate_policy: RatePolicy::ProviderRate,
        starting_credits: 4,
        ..Default::default()
    });
    let (provider, _) = app.register("olga", Some(3)).await;
    let (_, seeker_token) = app.register("pete", None).await;
    let (_, outsider_token) = app.register("quin", None).await;

    let (status, body) = app
        .call(Method::POST, "/api/exchanges", Some(&seeker_token), Some(booking(&provider, 2)))
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["code"], "INSUFFICIENT_CREDITS");
    assert_eq!(app.credits(&seeker_token).await, 4);

    let (status, body) = app
        .call(Method::POST, "/api/exchanges", Some(&seeker_token), Some(booking(&provider, 0)))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INVALID_DURATION");

    let mut forged = booking(&provider, 1);
    forged["seekerId"] = json!("someone-else");
    let (status, _) = app
        .call(Method::POST, "/api/exchanges", Some(&seeker_token), Some(forged))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, exchange) = app
        .call(Method::POST, "/api/exchanges", Some(&seeker_token), Some(booking(&provider, 1)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(exchange["cost"], 3);

    let uri = format!("/api/exchanges/{}", exchange["id"].as_str().unwrap());
    let (status, body) = app.call(Method::GET, &uri, Some(&outsider_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = app
        .call(Method::PATCH, &uri, Some(&seeker_token), Some(json!({"status": "cancelled"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.credits(&seeker_token).await, 4);
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let app = TestApp::new(starting(6));
    let (_, token) = app.register("rosa", None).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/users",
            None,
            Some(json!({"username": "rosa2", "email": "ROSA@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["error"].as_str().unwrap().contains("already registered"));

    let (status, _) = app.call(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.credits(&token).await, 6);
}

#[tokio::test]
async fn test_malformed_bodies_get_json_errors() {
    let app = TestApp::new(starting(5));
    let (provider, provider_token) = app.register("sami", None).await;
    let (_, seeker_token) = app.register("tara", None).await;

    let mut missing_provider = booking(&provider, 1);
    missing_provider.as_object_mut().unwrap().remove("providerId");
    let (status, body) = app
        .call(Method::POST, "/api/exchanges", Some(&seeker_token), Some(missing_provider))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["error"].as_str().unwrap().contains("providerId"));

    let (_, exchange) = app
        .call(Method::POST, "/api/exchanges", Some(&seeker_token), Some(booking(&provider, 1)))
        .await;
    let uri = format!("/api/exchanges/{}", exchange["id"].as_str().unwrap());
    let (status, body) = app
        .call(Method::PATCH, &uri, Some(&provider_token), Some(json!({"rating": 300})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = app
        .call(Method::GET, "/api/exchanges?scope=everyone", Some(&seeker_token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    // Nothing moved
    assert_eq!(app.credits(&seeker_token).await, 4);
}

#[tokio::test]
async fn test_profile_update() {
    let app = TestApp::new(MarketConfig::default());
    let (id, token) = app.register("uma", Some(2)).await;
    let (_, viewer_token) = app.register("vic", None).await;

    let (status, me) = app
        .call(
            Method::PATCH,
            "/api/users/me",
            Some(&token),
            Some(json!({
                "hourlyRate": 4,
                "bio": "Retired carpenter",
                "location": "Leeds",
                "availability": "Weekday evenings",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", me);
    assert_eq!(me["hourlyRate"], 4);
    assert_eq!(me["credits"], 10);

    let (_, profile) = app
        .call(Method::GET, &format!("/api/users/{}", id), Some(&viewer_token), None)
        .await;
    assert_eq!(profile["bio"], "Retired carpenter");
    assert_eq!(profile["location"], "Leeds");
    assert_eq!(profile["availability"], "Weekday evenings");
    assert_eq!(profile["hourlyRate"], 4);

    // An empty string clears a field
    let (_, me) = app
        .call(Method::PATCH, "/api/users/me", Some(&token), Some(json!({"location": ""})))
        .await;
    assert!(me.get("location").is_none());
    assert_eq!(me["bio"], "Retired carpenter");

    let (status, body) = app
        .call(Method::PATCH, "/api/users/me", Some(&token), Some(json!({"hourlyRate": 0})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, _) = app
        .call(Method::PATCH, "/api/users/me", Some(&token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_marketplace_listing_hides_private_fields() {
    let app = TestApp::new(starting(5));
    let (provider, provider_token) = app.register("wren", None).await;
    let (_, seeker_token) = app.register("xena", None).await;
    let (_, outsider_token) = app.register("yuri", None).await;

    let (_, exchange) = app
        .call(Method::POST, "/api/exchanges", Some(&seeker_token), Some(booking(&provider, 1)))
        .await;
    let uri = format!("/api/exchanges/{}", exchange["id"].as_str().unwrap());
    app.call(Method::PATCH, &uri, Some(&provider_token), Some(json!({"status": "accepted"})))
        .await;
    let (status, _) = app
        .call(
            Method::PATCH,
            &uri,
            Some(&seeker_token),
            Some(json!({
                "status": "completed",
                "completionNotes": "Covered starters",
                "rating": 4,
                "review": "Patient teacher",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, listed) = app
        .call(Method::GET, "/api/exchanges?scope=all", Some(&outsider_token), None)
        .await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].get("message").is_none());
    assert!(listed[0].get("completionNotes").is_none());
    assert!(listed[0]["reviews"]["seeker"].is_null());
    assert_eq!(listed[0]["rating"]["seeker"], 4);
    assert_eq!(listed[0]["status"], "completed");

    let (_, listed) = app
        .call(Method::GET, "/api/exchanges?scope=all", Some(&seeker_token), None)
        .await;
    assert_eq!(listed[0]["message"], "Saturday morning?");
    assert_eq!(listed[0]["completionNotes"], "Covered starters");
    assert_eq!(listed[0]["reviews"]["seeker"], "Patient teacher");
}
