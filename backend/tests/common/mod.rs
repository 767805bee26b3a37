#![allow(dead_code)]
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHasher,
};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use axum::routing::post;
use timecard_backend::{
    api,
    invites::InviteService,
    mail::{InviteEmail, InviteMailer, MailError},
    store::{MemoryStore, PgStore},
    AppState,
};

pub const APP_BASE_URL: &str = "http://app.test";

/// Mailer that records every invitation and can be switched to reject them.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<InviteEmail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        let mailer = Self::default();
        mailer.set_failing(true);
        mailer
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<InviteEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl InviteMailer for RecordingMailer {
    async fn send_invite(&self, email: &InviteEmail) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::RateLimited);
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }

    async fn test_configuration(&self) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Unauthorized);
        }
        Ok(())
    }
}

/// Invite service over an in-process store and a recording mailer.
pub fn memory_invites() -> (Arc<MemoryStore>, Arc<RecordingMailer>, InviteService) {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());
    let service = InviteService::new(store.clone(), mailer.clone(), APP_BASE_URL);
    (store, mailer, service)
}

/// Helper to generate a unique email for each test run.
pub fn unique_email(prefix: &str) -> String {
    format!("{}+{}@test.local", prefix, &Uuid::new_v4().to_string()[..8])
}

// -- Database-backed helpers --

/// `None` when TEST_DATABASE_URL is unset. Tests write and delete data, so
/// they never fall back to DATABASE_URL.
fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL") {
        Ok(url) if !url.is_empty() => Some(url),
        _ => {
            eprintln!("TEST_DATABASE_URL not set, skipping database-backed test");
            None
        }
    }
}
const JWT_SECRET: &str = "test-secret-that-is-at-least-32-chars-long!!";
const JWT_EXPIRY_HOURS: u64 = 12;

/// Spin up a real Axum server on a random port, returning its address, the
/// database pool and the mailer the app sends invites through. Test
/// isolation comes from creating unique orgs/users per test and cleaning up
/// afterwards. Returns `None` without a test database; callers return early.
pub async fn setup_test_app() -> Option<(SocketAddr, PgPool, Arc<RecordingMailer>)> {
    let url = database_url()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    // Run migrations to ensure schema is up-to-date
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let store = Arc::new(PgStore::new(pool.clone()));
    let mailer = Arc::new(RecordingMailer::default());

    let state = AppState {
        pool: pool.clone(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiry_hours: JWT_EXPIRY_HOURS,
        invites: InviteService::new(store.clone(), mailer.clone(), APP_BASE_URL),
        timesheets: store,
        mailer: mailer.clone(),
    };

    // main.rs mounts login behind a rate limiter; tests mount it bare.
    let login_router = axum::Router::new()
        .route("/api/auth/login", post(api::auth::login))
        .with_state(state.clone());

    let app = api::router(state).merge(login_router);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some((addr, pool, mailer))
}

/// Create a test organization with a unique slug. Returns the org ID.
pub async fn create_test_org(pool: &PgPool, suffix: &str) -> Uuid {
    let id = Uuid::new_v4();
    let slug = format!("test-org-{}-{}", suffix, &id.to_string()[..8]);
    let name = format!("Test Org {}", suffix);

    sqlx::query("INSERT INTO organizations (id, name, slug, timezone) VALUES ($1, $2, $3, 'UTC')")
        .bind(id)
        .bind(&name)
        .bind(&slug)
        .execute(pool)
        .await
        .expect("Failed to create test org");

    id
}

/// Create a user with an Argon2-hashed password and make them a member of
/// `org_id`. Returns (user_id, plaintext_password).
pub async fn create_test_user(
    pool: &PgPool,
    org_id: Uuid,
    role: &str,
    email: &str,
) -> (Uuid, String) {
    let user_id = Uuid::new_v4();
    let password = "testpass123";
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("Failed to hash password")
        .to_string();

    sqlx::query(
        "INSERT INTO users (id, first_name, last_name, email, password_hash, is_active) \
         VALUES ($1, 'Test', 'User', $2, $3, true)",
    )
    .bind(user_id)
    .bind(email)
    .bind(&hash)
    .execute(pool)
    .await
    .expect("Failed to create test user");

    sqlx::query(
        "INSERT INTO organization_members (org_id, user_id, role) VALUES ($1, $2, $3::app_role)",
    )
    .bind(org_id)
    .bind(user_id)
    .bind(role)
    .execute(pool)
    .await
    .expect("Failed to create test membership");

    (user_id, password.to_string())
}

/// Same as [`create_test_user`] but with `is_active = false`.
pub async fn create_inactive_user(pool: &PgPool, org_id: Uuid, email: &str) -> (Uuid, String) {
    let (user_id, password) = create_test_user(pool, org_id, "employee", email).await;

    sqlx::query("UPDATE users SET is_active = false WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("Failed to deactivate test user");

    (user_id, password)
}

/// Log in via the HTTP API and return the JWT token.
pub async fn get_auth_token(addr: SocketAddr, email: &str, password: &str) -> String {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{}/api/auth/login", addr))
        .json(&serde_json::json!({
            "email": email,
            "password": password,
        }))
        .send()
        .await
        .expect("Login request failed");

    assert_eq!(resp.status(), 200, "Login should return 200");

    let body: serde_json::Value = resp.json().await.expect("Failed to parse login response");
    body["token"]
        .as_str()
        .expect("Response should contain token")
        .to_string()
}

/// Create a JWT that expired an hour ago but is otherwise valid.
pub fn create_expired_token(user_id: Uuid, org_id: Uuid) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use timecard_backend::auth::{Claims, Role};

    let now = time::OffsetDateTime::now_utc();
    let claims = Claims {
        sub: user_id,
        org_id,
        role: Role::Employee,
        exp: (now - time::Duration::hours(1)).unix_timestamp(),
        iat: (now - time::Duration::hours(2)).unix_timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to create expired token")
}

/// Build a reqwest client (reusable across requests in a test).
pub fn http_client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Clean up all test data for a given org. Call this at the end of tests.
pub async fn cleanup_test_org(pool: &PgPool, org_id: Uuid) {
    let user_ids: Vec<Uuid> =
        sqlx::query_scalar("SELECT user_id FROM organization_members WHERE org_id = $1")
            .bind(org_id)
            .fetch_all(pool)
            .await
            .unwrap_or_default();

    // Delete in dependency order (child tables first)
    let cleanup_queries = [
        "DELETE FROM organization_invites WHERE organization_id = $1",
        "DELETE FROM weekly_summaries WHERE org_id = $1",
        "DELETE FROM time_entries WHERE org_id = $1",
        "DELETE FROM job_locations WHERE org_id = $1",
        "DELETE FROM organization_members WHERE org_id = $1",
        "DELETE FROM departments WHERE org_id = $1",
        "DELETE FROM organizations WHERE id = $1",
    ];

    for q in cleanup_queries {
        let _ = sqlx::query(q).bind(org_id).execute(pool).await;
    }

    for user_id in user_ids {
        let _ = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(pool)
            .await;
    }
}
