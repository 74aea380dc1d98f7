#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use certrack::config::Config;
use certrack::db::hash_password;
use certrack::domain::Role;
use certrack::models::catalog::{Category, CategoryInput};
use certrack::models::user::{NewUser, User};
use certrack::state::SharedState;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse-42";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<SharedState>,
}

pub fn test_config() -> Config {
    let root = std::env::temp_dir().join(format!("certrack-test-{}", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", root.join("certrack.db").display());
    config.uploads.root = root.join("uploads").display().to_string();
    config.server.secure_cookies = false;
    config.scheduler.enabled = false;
    config.observability.metrics_enabled = false;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let state = Arc::new(
        SharedState::new(config)
            .await
            .expect("failed to create shared state"),
    );
    let app_state = certrack::api::create_app_state(state.clone(), None);
    let router = certrack::api::router(app_state);
    TestApp { router, state }
}

pub struct UserSeed {
    pub email: &'static str,
    pub role: Role,
    pub is_active: bool,
    pub is_superuser: bool,
    pub must_change_password: bool,
}

impl UserSeed {
    pub const fn employee(email: &'static str) -> Self {
        Self {
            email,
            role: Role::Employee,
            is_active: true,
            is_superuser: false,
            must_change_password: false,
        }
    }

    pub const fn admin(email: &'static str) -> Self {
        Self {
            role: Role::Admin,
            ..Self::employee(email)
        }
    }
}

impl TestApp {
    pub async fn seed_user(&self, seed: UserSeed) -> User {
        let password_hash = hash_password(PASSWORD, Some(&self.state.config.security)).unwrap();
        self.state
            .store
            .create_user(NewUser {
                email: seed.email.to_string(),
                password_hash,
                first_name: "Test".to_string(),
                last_name: seed.email.split('@').next().unwrap().to_string(),
                department: "Engineering".to_string(),
                position: "Engineer".to_string(),
                role: seed.role,
                is_active: seed.is_active,
                is_superuser: seed.is_superuser,
                must_change_password: seed.must_change_password,
            })
            .await
            .unwrap()
    }

    pub async fn seed_category(&self, name: &str) -> Category {
        self.state
            .store
            .create_category(CategoryInput {
                name: name.to_string(),
                description: String::new(),
                icon_class: String::new(),
                color: "#3B82F6".to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Logs in and returns the session cookie.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .send(json_request(
                "POST",
                "/api/auth/login",
                None,
                &serde_json::json!({ "email": email, "password": password }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login failed for {email}");

        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .expect("login did not set a session cookie")
            .to_string()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn delete(&self, uri: &str, cookie: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub fn multipart_request(
    method: &str,
    uri: &str,
    cookie: &str,
    filename: &str,
    content: &[u8],
) -> Request<Body> {
    const BOUNDARY: &str = "certrack-test-boundary";

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// JSON body for the certificate form.
pub fn certificate_body(
    category_id: i32,
    issue_date: chrono::NaiveDate,
    expiry_date: Option<chrono::NaiveDate>,
) -> Value {
    serde_json::json!({
        "name": "AWS Solutions Architect",
        "certification_id": "SAA-C03",
        "provider_name": "Amazon Web Services",
        "category_id": category_id,
        "issue_date": issue_date,
        "expiry_date": expiry_date,
        "status": "ACTIVE",
        "verification_url": "https://aws.amazon.com/verification",
        "notes": "",
    })
}

/// Minimal PNG header with the given dimensions.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[8, 6, 0, 0, 0, 0, 0, 0, 0]);
    data
}
