//! Common test utilities for integration tests.
//!
//! Database-backed tests run against the PostgreSQL instance named by
//! `TEST_DATABASE_URL` and are skipped when it is unset. Router-only tests use
//! a lazy pool that never connects.

// Not every test binary uses every helper.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use complaint_portal_api::{
    app::create_app,
    config::{
        Config, DatabaseConfig, LimitsConfig, LoggingConfig, RealtimeConfig, SecurityConfig,
        ServerConfig, StorageConfig,
    },
    middleware::API_KEY_HEADER,
    services::SettingsCache,
};
use domain::models::{SiteSettings, Taxonomy};
use fake::{faker::name::en::Name, Fake};
use persistence::repositories::SettingRepository;
use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Plain admin key; the config only carries its hash.
pub const TEST_ADMIN_KEY: &str = "test-admin-key";

/// An upazila and one of its unions from the seeded taxonomy.
pub const TEST_UPAZILA: &str = "গোয়াইনঘাট";
pub const TEST_UNION: &str = "পূর্ব জাফলং";

/// Connects to the test database, or returns `None` when none is configured.
pub async fn create_test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    persistence::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    SettingRepository::new(pool.clone())
        .seed_taxonomy(&Taxonomy::default_seed())
        .await
        .expect("Failed to seed taxonomy");

    Some(pool)
}

/// Test configuration. Rate limiting is disabled and uploads go to a fresh
/// temporary directory.
pub fn test_config() -> Config {
    let storage_root = std::env::temp_dir().join(format!("cp-test-{}", uuid::Uuid::new_v4()));

    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            max_body_size: 1048576,
        },
        database: DatabaseConfig {
            url: std::env::var("TEST_DATABASE_URL")
                .unwrap_or_else(|_| "postgres://cp:cp@127.0.0.1:1/cp_unreachable".to_string()),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 1,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            cors_origins: vec![],
            rate_limit_per_minute: 0,
            admin_api_key_hash: shared::crypto::sha256_hex(TEST_ADMIN_KEY),
            hsts_enabled: false,
        },
        limits: LimitsConfig {
            max_images_per_problem: 5,
            max_upload_bytes: 64 * 1024,
            public_page_size: 9,
            admin_page_size: 10,
            recent_limit: 6,
            stats_row_limit: 1000,
        },
        storage: StorageConfig {
            root_dir: storage_root.to_string_lossy().into_owned(),
            public_base_url: "/uploads".to_string(),
        },
        realtime: RealtimeConfig {
            channel_capacity: 16,
            keep_alive_secs: 15,
        },
    }
}

/// Builds the full application over a connected pool.
pub async fn create_test_app(pool: PgPool) -> Router {
    create_test_app_with_config(test_config(), pool).await
}

pub async fn create_test_app_with_config(config: Config, pool: PgPool) -> Router {
    let settings = SettingsCache::load(&SettingRepository::new(pool.clone()))
        .await
        .expect("Failed to load settings");
    create_app(config, pool, settings)
}

/// Builds the application over a pool that never connects.
pub fn create_router_only_app(config: Config) -> Router {
    let db_config: persistence::DatabaseConfig = (&config.database).into();
    let pool = persistence::create_lazy_pool(&persistence::DatabaseConfig {
        url: "postgres://cp:cp@127.0.0.1:1/cp_unreachable".to_string(),
        ..db_config
    })
    .expect("Failed to create lazy pool");
    let settings = SettingsCache::new(Taxonomy::default_seed(), SiteSettings::default());
    create_app(config, pool, settings)
}

/// A submission that passes every rule. `marker` ends up in the title so
/// tests can find their own rows.
pub fn valid_problem_body(marker: &str) -> Value {
    let name: String = Name().fake();
    let number: u32 = (10_000_000..99_999_999).fake();

    json!({
        "category": "road",
        "title": format!("ভাঙা রাস্তা {}", marker),
        "description": "বর্ষায় রাস্তাটি চলাচলের অযোগ্য হয়ে পড়েছে, দ্রুত মেরামত প্রয়োজন।",
        "upazila": TEST_UPAZILA,
        "unionName": TEST_UNION,
        "ward": " ৩ ",
        "submitterName": name,
        "submitterPhone": format!("017{:08}", number),
        "images": []
    })
}

/// Percent-encodes a query string value.
pub fn encode_query_value(value: &str) -> String {
    value
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
                (b as char).to_string()
            } else {
                format!("%{:02X}", b)
            }
        })
        .collect()
}

/// Creates a problem from `body`, asserting 201.
pub async fn create_problem_with(app: &Router, body: Value) -> Value {
    use tower::ServiceExt;

    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/api/v1/problems", body))
        .await
        .unwrap();
    let status = response.status();
    let body = parse_response_body(response).await;
    assert_eq!(status, axum::http::StatusCode::CREATED, "create failed: {}", body);
    body
}

/// Ids in a paginated list response.
pub fn page_ids(body: &Value) -> Vec<i64> {
    body["data"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|p| p["id"].as_i64()).collect())
        .unwrap_or_default()
}

/// Unique marker for rows created by one test.
pub fn unique_marker() -> String {
    format!("t{}", uuid::Uuid::new_v4().simple())
}

/// Build a JSON request.
pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a JSON request carrying the admin key.
pub fn admin_json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(API_KEY_HEADER, TEST_ADMIN_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a bodyless request.
pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Build a bodyless request carrying the admin key.
pub fn admin_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(API_KEY_HEADER, TEST_ADMIN_KEY)
        .body(Body::empty())
        .unwrap()
}

/// Build a multipart request with a single `file` field.
pub fn multipart_request(
    uri: &str,
    admin: bool,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Request<Body> {
    let boundary = "cp-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        );
    if admin {
        builder = builder.header(API_KEY_HEADER, TEST_ADMIN_KEY);
    }
    builder.body(Body::from(body)).unwrap()
}

/// Helper to parse JSON response body.
pub async fn parse_response_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

/// Submits a valid problem and returns the created row.
pub async fn create_problem(app: &Router, marker: &str) -> Value {
    create_problem_with(app, valid_problem_body(marker)).await
}
