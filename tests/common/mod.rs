#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use tempfile::TempDir;

use taskhub_backend::auth::TokenVerifier;
use taskhub_backend::blob::BlobStore;
use taskhub_backend::config::JwtKey;
use taskhub_backend::routes::webhooks::webhooks_signature::WebhookVerifier;
use taskhub_backend::store::{MemoryStore, TaskHubStore};
use taskhub_backend::AppData;

pub const JWT_SECRET: &str = "integration-test-secret";
pub const WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";
pub const BOUNDARY: &str = "taskhub-test-boundary";

pub struct TestContext {
    pub data: AppData,
    pub store: Arc<MemoryStore>,
    pub uploads: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let uploads = tempfile::tempdir().unwrap();
        let tokens = TokenVerifier::new(&JwtKey::Secret(JWT_SECRET.to_string()), None).unwrap();
        let webhooks = WebhookVerifier::new(WEBHOOK_SECRET).unwrap();
        let shared: Arc<dyn TaskHubStore> = store.clone();
        let data = AppData::new(shared, tokens, BlobStore::new(uploads.path()), webhooks);
        Self { data, store, uploads }
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    sub: &'a str,
    exp: i64,
}

pub fn bearer(user_id: &str) -> (&'static str, String) {
    let claims = Claims {
        sub: user_id,
        exp: (Utc::now() + Duration::hours(1)).timestamp(),
    };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).unwrap();
    ("Authorization", format!("Bearer {}", token))
}

/// Headers of a correctly signed webhook delivery.
pub fn signed(id: &str, body: &str) -> Vec<(&'static str, String)> {
    let timestamp = Utc::now().timestamp().to_string();
    let signature = WebhookVerifier::new(WEBHOOK_SECRET)
        .unwrap()
        .signature_for(id, &timestamp, body.as_bytes())
        .unwrap();
    vec![
        ("svix-id", id.to_string()),
        ("svix-timestamp", timestamp),
        ("svix-signature", signature),
    ]
}

/// Content type header and body of a `taskId` + `file` form.
pub fn multipart(task_id: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"taskId\"\r\n\r\n{task_id}\r\n",
            b = BOUNDARY
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n",
            b = BOUNDARY
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}
