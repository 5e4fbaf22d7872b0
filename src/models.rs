//! Data models for accounts, bleeter posts/profiles, duty units and CAD configuration.
//!
//! This module defines all serializable structs used for store access and API responses.
//! Models derive Serde and SQLx traits for easy (de)serialization and DB mapping.
//! JSON uses camelCase keys; columns use snake_case.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    config::Config,
    db,
    events::EventBus,
    repository::{
        AccountRepository, CadRepository, DutyRepository, PostRepository, ProfileRepository,
        postgres::PgStore,
    },
    services::ImageStore,
};

/// Account rank, ordered by privilege (`User < Admin < Owner`).
///
/// Serialized in SCREAMING_SNAKE_CASE to match the `rank` Postgres enum.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "rank", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rank {
    User,
    Admin,
    /// Highest privilege. Owner accounts can never delete themselves.
    Owner,
}

impl From<&str> for Rank {
    fn from(value: &str) -> Self {
        match value {
            "OWNER" => Self::Owner,
            "ADMIN" => Self::Admin,
            _ => Self::User,
        }
    }
}

/// How unit statuses are rendered in the dispatch tables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "status_view_mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusViewMode {
    FullRowColor,
    #[default]
    DotColor,
}

/// Placement of the per-row action buttons in tables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "table_actions_alignment", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableActionsAlignment {
    #[default]
    None,
    Left,
    Right,
}

/// Per-user sound notification preferences.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SoundSettings {
    pub id: Uuid,
    pub panic_button: bool,
    pub signal100: bool,
    pub added_to_call: bool,
    pub stop_roleplay: bool,
    pub status_update: bool,
    pub incoming_call: bool,
    pub speech: bool,
    pub speech_voice: Option<String>,
}

/// A user account.
///
/// Password material is never serialized; the account can be returned to
/// its owner as-is.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    /// Argon2 PHC string, empty when no local password was ever set
    #[serde(skip)]
    pub password_hash: String,
    /// Override credential checked instead of `password_hash` when present
    #[serde(skip)]
    pub temp_password_hash: Option<String>,
    pub discord_id: Option<String>,
    pub steam_id: Option<String>,
    pub rank: Rank,
    pub is_dark_theme: bool,
    pub locale: Option<String>,
    pub status_view_mode: StatusViewMode,
    pub table_actions_alignment: TableActionsAlignment,
    pub developer_mode: bool,
    pub sound_settings_id: Option<Uuid>,
    #[sqlx(skip)]
    pub sound_settings: Option<SoundSettings>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Creates a plain `USER` account with default preferences.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: password_hash.into(),
            temp_password_hash: None,
            discord_id: None,
            steam_id: None,
            rank: Rank::User,
            is_dark_theme: true,
            locale: None,
            status_view_mode: StatusViewMode::default(),
            table_actions_alignment: TableActionsAlignment::default(),
            developer_mode: false,
            sound_settings_id: None,
            sound_settings: None,
            created_at: Utc::now(),
        }
    }

    /// True when the account came from Discord or Steam and never set a local password.
    pub fn is_oauth_only(&self) -> bool {
        let has_oauth = self.discord_id.is_some() || self.steam_id.is_some();
        has_oauth && self.password_hash.is_empty() && self.temp_password_hash.is_none()
    }
}

/// Validated preference changes applied by `PATCH /user`.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub username: String,
    pub is_dark_theme: Option<bool>,
    pub locale: Option<String>,
    pub status_view_mode: Option<StatusViewMode>,
    pub table_actions_alignment: Option<TableActionsAlignment>,
    pub developer_mode: Option<bool>,
    pub sound_settings: Option<SoundSettingsUpdate>,
}

/// Sound settings as submitted by the client (no id).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SoundSettingsUpdate {
    pub panic_button: bool,
    pub signal100: bool,
    pub added_to_call: bool,
    pub stop_roleplay: bool,
    pub status_update: bool,
    pub incoming_call: bool,
    pub speech: bool,
    pub speech_voice: Option<String>,
}

/// Application-wide CAD configuration merged into the fetch-self response.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CadConfig {
    pub id: Uuid,
    pub name: String,
    pub area_of_jurisdiction: Option<String>,
    pub features: serde_json::Value,
    pub version: Option<String>,
    /// Internal token for the public API, stripped from every response
    #[serde(skip_serializing, default)]
    pub api_token: Option<String>,
}

/// A bleeter author profile, one per user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub handle: String,
    pub name: String,
    pub bio: Option<String>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Normalized profile fields submitted by the owner.
#[derive(Debug, Clone)]
pub struct ProfileInput {
    pub handle: String,
    pub name: String,
    pub bio: Option<String>,
}

/// Outcome of a profile upsert.
#[derive(Debug, Clone)]
pub struct ProfileUpsert {
    pub profile: Profile,
    /// True when the profile did not exist before this request
    pub created: bool,
}

/// A bleeter post row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub creator_id: Option<Uuid>,
    pub title: String,
    pub body: Option<String>,
    pub body_data: Option<serde_json::Value>,
    pub image_id: Option<String>,
    pub image_blur_data: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post fields written by create and update.
#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    pub body: Option<String>,
    pub body_data: Option<serde_json::Value>,
}

/// Minimal author projection attached to posts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostAuthor {
    pub username: String,
}

/// A post joined with its author username and optional profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub user: PostAuthor,
    pub creator: Option<Profile>,
}

/// Paging window for the post feed.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub skip: i64,
    pub take: i64,
}

/// Result of the batched feed read behind `GET /bleeter`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub posts: Vec<PostWithAuthor>,
    pub total_count: i64,
    pub user_bleeter_profile: Option<Profile>,
}

/// Discipline of an on-duty unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnitKind {
    Officer,
    EmsFd,
}

impl UnitKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::Officer => "officers",
            Self::EmsFd => "ems_fd_deputies",
        }
    }
}

/// An officer or EMS/FD deputy record.
#[derive(Debug, Clone, PartialEq)]
pub struct DutyUnit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: UnitKind,
    pub status_id: Option<Uuid>,
    pub active_call_id: Option<Uuid>,
}

/// Shared application state for all handlers.
///
/// Holds the repository handles, the image store, the real-time event bus
/// and the loaded configuration.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<dyn PostRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub duty: Arc<dyn DutyRepository>,
    pub cads: Arc<dyn CadRepository>,
    pub images: ImageStore,
    pub events: EventBus,
    pub config: Arc<Config>,
}

impl AppState {
    /// Connects to Postgres, applies migrations and wires the Postgres store.
    ///
    /// # Errors
    /// Returns an error when the pool cannot be created or a migration fails.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = db::connect_pg_pool(&config).await?;
        db::run_migrations(&pool).await?;
        let store = Arc::new(PgStore::new(pool));
        Ok(Self::with_store(store, config))
    }

    /// Builds state around any store implementing every repository trait.
    pub fn with_store<S>(store: Arc<S>, config: Config) -> Self
    where
        S: PostRepository
            + ProfileRepository
            + AccountRepository
            + DutyRepository
            + CadRepository
            + 'static,
    {
        Self {
            posts: store.clone(),
            profiles: store.clone(),
            accounts: store.clone(),
            duty: store.clone(),
            cads: store,
            images: ImageStore::new(config.public_dir.join("bleeter")),
            events: EventBus::new(64),
            config: Arc::new(config),
        }
    }
}
