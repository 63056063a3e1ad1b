use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::FixedOffset;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use greentax::auth::jwt::{encode_token, Claims};
use greentax::config::Config;
use greentax::storage::EvidenceStore;
use greentax::verify::freshness::CaptureTimePolicy;

/// Payload stored as evidence in tests. The server checks content type,
/// not image structure, so a JPEG prefix is enough.
pub const FAKE_JPEG: &[u8] = b"\xFF\xD8\xFF\xE0 greentax test image";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
    pub evidence_dir: PathBuf,
    pub jwt_secret: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Mint a token the way the external identity provider would.
    pub fn token_for(&self, account_id: Uuid, role: &str) -> String {
        let claims = Claims::new(account_id, role.to_string());
        encode_token(&claims, &self.jwt_secret).expect("token encode failed")
    }

    /// Fresh user account: (account_id, bearer token).
    pub fn user(&self) -> (Uuid, String) {
        let id = Uuid::now_v7();
        (id, self.token_for(id, "user"))
    }

    /// Fresh admin account: (account_id, bearer token).
    pub fn admin(&self) -> (Uuid, String) {
        let id = Uuid::now_v7();
        (id, self.token_for(id, "admin"))
    }

    /// Create a facility as admin, return its JSON.
    pub async fn create_facility(
        &self,
        admin_token: &str,
        name: &str,
        coords: Option<(f64, f64)>,
        tax_amount: f64,
        owner: Uuid,
    ) -> Value {
        let mut body = json!({
            "name": name,
            "address": "12 Compost Lane",
            "tax_amount": tax_amount,
            "owner_account_id": owner,
        });
        if let Some((latitude, longitude)) = coords {
            body["latitude"] = json!(latitude);
            body["longitude"] = json!(longitude);
        }

        let (body, status) = self.post_auth("/api/v1/facilities", admin_token, &body).await;
        assert_eq!(status, StatusCode::OK, "create facility failed: {body}");
        body
    }

    /// Mark a facility verified as admin, return its JSON.
    pub async fn verify_facility(&self, admin_token: &str, facility_id: &str) -> Value {
        let (body, status) = self
            .post_auth(
                &format!("/api/v1/facilities/{facility_id}/verify"),
                admin_token,
                &json!({}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "verify facility failed: {body}");
        body
    }

    /// Upload evidence via multipart, return (body, status).
    pub async fn submit_evidence(
        &self,
        token: &str,
        facility_id: &str,
        latitude: f64,
        longitude: f64,
        captured_at: Option<&str>,
    ) -> (Value, StatusCode) {
        let mut form = Form::new()
            .text("facility_id", facility_id.to_string())
            .text("latitude", latitude.to_string())
            .text("longitude", longitude.to_string());
        if let Some(ts) = captured_at {
            form = form.text("captured_at", ts.to_string());
        }
        let part = Part::bytes(FAKE_JPEG.to_vec())
            .file_name("pile.jpg")
            .mime_str("image/jpeg")
            .unwrap();
        form = form.part("evidence", part);

        let resp = self
            .client
            .post(self.url("/api/v1/submissions"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("submit evidence failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Review a submission as admin, return (body, status).
    pub async fn review(
        &self,
        admin_token: &str,
        submission_id: &str,
        decision: &str,
    ) -> (Value, StatusCode) {
        self.post_auth(
            &format!("/api/v1/submissions/{submission_id}/review"),
            admin_token,
            &json!({ "decision": decision }),
        )
        .await
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated PUT request with JSON body.
    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

/// Spawn a test app with a fresh temporary database, or None when
/// DATABASE_URL is not set (the suite then skips rather than fails).
pub async fn try_spawn_app() -> Option<TestApp> {
    try_spawn_app_with(|_| {}).await
}

/// Like [`try_spawn_app`], with a hook to adjust the config first.
pub async fn try_spawn_app_with(adjust: impl FnOnce(&mut Config)) -> Option<TestApp> {
    let _ = dotenvy::dotenv();

    let Ok(base_url) = std::env::var("DATABASE_URL") else {
        eprintln!("skipping: DATABASE_URL is not set");
        return None;
    };

    // Create a unique test database
    let suffix = Uuid::now_v7().to_string().replace('-', "");
    let db_name = format!("greentax_test_{suffix}");

    // Connect to default postgres DB to create test DB
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    // Connect to test DB and run migrations
    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let evidence_dir = std::env::temp_dir().join(format!("greentax-test-{suffix}"));

    let mut config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        geofence_radius_meters: 50.0,
        max_evidence_age_hours: 2.0,
        discount_rate: 0.05,
        capture_time_policy: CaptureTimePolicy::Strict,
        capture_time_offset: FixedOffset::east_opt(0).unwrap(),
        evidence_dir: evidence_dir.clone(),
        max_body_size: 1_048_576,
        submission_rate_limit: 100,
        submission_rate_window_secs: 3600,
        trusted_proxies: vec![],
        location_timeout_secs: 15,
        log_level: "warn".to_string(),
    };
    adjust(&mut config);

    let jwt_secret = config.jwt_secret.clone();
    let evidence = EvidenceStore::init(config.evidence_dir.clone())
        .await
        .expect("Failed to initialize evidence store");

    let app = greentax::build_app(pool.clone(), config, evidence);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    // Spawn server in background
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    Some(TestApp {
        addr,
        pool,
        client,
        db_name,
        evidence_dir,
        jwt_secret,
    })
}

/// Drop the test database and evidence directory after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let _ = std::fs::remove_dir_all(&app.evidence_dir);

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
