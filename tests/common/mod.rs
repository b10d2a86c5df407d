#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    middleware, Router,
};
use chrono::{Duration, Utc};
use foodie_preorder_api::{
    api_routes,
    auth::{Claims, ADMIN_ROLE},
    config::AppConfig,
    db,
    middleware_helpers::request_id_middleware,
    notifications::{DeliveryReceipt, NotificationError, NotificationGateway},
    AppState,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration_secret_with_enough_entropy_0123456789";

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SentSms {
    pub phone: String,
    pub message: String,
}

/// Gateway that keeps every delivery in memory and can be told to fail.
#[derive(Default)]
pub struct RecordingGateway {
    emails: Mutex<Vec<SentEmail>>,
    sms: Mutex<Vec<SentSms>>,
    fail_email: AtomicBool,
    fail_sms: AtomicBool,
}

impl RecordingGateway {
    pub fn emails(&self) -> Vec<SentEmail> {
        self.emails.lock().unwrap().clone()
    }

    pub fn sms(&self) -> Vec<SentSms> {
        self.sms.lock().unwrap().clone()
    }

    pub fn fail_email(&self, fail: bool) {
        self.fail_email.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sms(&self, fail: bool) {
        self.fail_sms.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        text: &str,
    ) -> Result<DeliveryReceipt, NotificationError> {
        if self.fail_email.load(Ordering::SeqCst) {
            return Err(NotificationError::Delivery("smtp unavailable".into()));
        }
        self.emails.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
            text: text.to_string(),
        });
        Ok(DeliveryReceipt { delivered: true })
    }

    async fn send_sms(
        &self,
        phone: &str,
        message: &str,
    ) -> Result<DeliveryReceipt, NotificationError> {
        if self.fail_sms.load(Ordering::SeqCst) {
            return Err(NotificationError::Delivery("sms provider down".into()));
        }
        self.sms.lock().unwrap().push(SentSms {
            phone: phone.to_string(),
            message: message.to_string(),
        });
        Ok(DeliveryReceipt { delivered: true })
    }
}

/// Application router backed by a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: Arc<RecordingGateway>,
    admin_token: String,
    customer_token: String,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("foodie_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let gateway = Arc::new(RecordingGateway::default());
        let state = AppState::new(Arc::new(pool), cfg.clone(), gateway.clone());

        let router = Router::new()
            .nest("/api", api_routes())
            .layer(middleware::from_fn(request_id_middleware))
            .with_state(state.clone());

        Self {
            router,
            state,
            gateway,
            admin_token: token_for(&cfg, ADMIN_ROLE),
            customer_token: token_for(&cfg, "CUSTOMER"),
            _dir: dir,
        }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn customer_token(&self) -> &str {
        &self.customer_token
    }

    /// Sends a request and returns the status with the parsed JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        self.send(request).await
    }

    /// Sends a prebuilt request, for bodies that are not valid JSON.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }
}

fn token_for(cfg: &AppConfig, role: &str) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: format!("{}-user", role.to_ascii_lowercase()),
        email: Some("staff@foodie.example".to_string()),
        role: role.to_string(),
        iss: cfg.auth_issuer.clone(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(1)).timestamp(),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
    )
    .expect("encode access token")
}

/// Delivery slot the given number of hours from now.
pub fn future_slot(hours: i64) -> String {
    (Utc::now() + Duration::hours(hours)).to_rfc3339()
}

pub fn cart() -> Value {
    json!([
        { "menuItemId": 1, "name": "Paneer Tikka", "quantity": 2, "unitPrice": 249.5 },
        { "menuItemId": 7, "name": "Garlic Naan", "quantity": 3, "unitPrice": 45 }
    ])
}

/// Total of [`cart`]: 2 x 249.50 + 3 x 45.00.
pub const CART_TOTAL: f64 = 634.0;

pub fn checkout_body(payment_method: &str) -> Value {
    let reference = if payment_method == "BANK_TRANSFER" {
        json!("UTR-778899")
    } else {
        Value::Null
    };
    json!({
        "customerName": "Asha Rao",
        "email": "Asha.Rao@Example.com",
        "phone": "+91 98765 43210",
        "address": "12 Lake View Road, Bengaluru",
        "deliveryDate": future_slot(48),
        "specialInstructions": "Less spicy please",
        "items": cart(),
        "paymentMethod": payment_method,
        "paymentReference": reference,
    })
}

/// Reads a money field whether it was serialized as a string or a number.
pub fn amount(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.as_f64().expect("finite number"),
        other => panic!("not an amount: {other}"),
    }
}
