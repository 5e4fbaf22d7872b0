//! Shared fixtures for the integration tests.
//!
//! Every test gets its own in-memory store and a temporary public directory.
//! Set `TEST_LOG=1` to see the structured logs.

#![allow(dead_code)]

pub mod memory;

use std::sync::Arc;

use actix_web::cookie::Cookie;
use chrono::Utc;
use dispatch_server::{
    AppState, Config, get_subscriber, init_subscriber,
    models::{Account, Post},
    services::{cookies::ACCESS_TOKEN_COOKIE, password::hash_password},
};
use once_cell::sync::Lazy;
use tempfile::TempDir;
use uuid::Uuid;

use self::memory::MemoryStore;

pub const PASSWORD: &str = "correct-horse-battery";

static TRACING: Lazy<()> = Lazy::new(|| {
    let filter = "debug".to_string();
    let name = "test".to_string();
    if std::env::var("TEST_LOG").is_ok() {
        init_subscriber(get_subscriber(name, filter, std::io::stdout));
    } else {
        init_subscriber(get_subscriber(name, filter, std::io::sink));
    }
});

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub public_dir: TempDir,
}

pub fn context() -> TestContext {
    context_with(Config::default())
}

pub fn context_with(mut config: Config) -> TestContext {
    Lazy::force(&TRACING);

    let public_dir = tempfile::tempdir().expect("failed to create public dir");
    config.public_dir = public_dir.path().to_path_buf();

    let store = Arc::new(MemoryStore::new());
    let state = AppState::with_store(store.clone(), config);
    TestContext {
        store,
        state,
        public_dir,
    }
}

impl TestContext {
    /// Inserts an account with [`PASSWORD`] and opens a session for it.
    pub async fn user(&self, username: &str) -> (Account, String) {
        let hash = hash_password(PASSWORD).expect("failed to hash password");
        self.account(Account::new(username, hash)).await
    }

    /// Inserts the given account and opens a session for it.
    pub async fn account(&self, account: Account) -> (Account, String) {
        let account = self.store.insert_account(account).await;
        let token = self.store.open_session(account.id).await;
        (account, token)
    }

    pub fn image_path(&self, file_name: &str) -> std::path::PathBuf {
        self.public_dir.path().join("bleeter").join(file_name)
    }
}

pub fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::new(ACCESS_TOKEN_COOKIE, token.to_string())
}

pub fn post_for(user_id: Uuid, title: &str) -> Post {
    let now = Utc::now();
    Post {
        id: Uuid::new_v4(),
        user_id,
        creator_id: None,
        title: title.to_string(),
        body: Some("body".to_string()),
        body_data: None,
        image_id: None,
        image_blur_data: None,
        created_at: now,
        updated_at: now,
    }
}

pub const BOUNDARY: &str = "----dispatch-test-boundary";

/// Builds a single-part `multipart/form-data` body.
pub fn multipart_body(field: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"upload\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([20, 90, 200, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("failed to encode png");
    buf
}
