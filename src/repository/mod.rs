//! Persistence seams.
//!
//! Every handler talks to the store through these traits so the backing
//! technology is swappable. [`postgres::PgStore`] is the production store;
//! the integration tests provide an in-memory one.

pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Account, CadConfig, DutyUnit, Feed, Page, Post, PostInput, PostWithAuthor, Profile,
    ProfileInput, ProfileUpsert, SettingsUpdate, UnitKind,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("handle already taken by another profile")]
    HandleTaken,

    #[error("username already taken by another account")]
    UsernameTaken,

    #[error("record not found")]
    NotFound,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Posts newest first with authors, the total count and the caller's profile,
    /// read as one batch. `page = None` returns every post.
    async fn feed(&self, user_id: Uuid, page: Option<Page>) -> StoreResult<Feed>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<PostWithAuthor>>;

    async fn create(
        &self,
        user_id: Uuid,
        creator_id: Option<Uuid>,
        input: PostInput,
    ) -> StoreResult<Post>;

    async fn update(&self, id: Uuid, input: PostInput) -> StoreResult<Post>;

    async fn set_image(&self, id: Uuid, image_id: &str, blur_data: &str) -> StoreResult<Post>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;

    /// Creates or updates the user's profile.
    ///
    /// The handle check and the write happen atomically; a handle held by another
    /// user yields [`StoreError::HandleTaken`]. When the profile is created, the
    /// user's posts without a creator are attached to it in the same unit.
    async fn upsert(&self, user_id: Uuid, input: ProfileInput) -> StoreResult<ProfileUpsert>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Resolves an unexpired access token to its account.
    async fn find_by_session(&self, access_token: &str) -> StoreResult<Option<Account>>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Account>>;

    /// Applies preference changes, upserting the linked sound settings when given.
    ///
    /// A username claimed by another account in the meantime yields
    /// [`StoreError::UsernameTaken`].
    async fn update_settings(&self, id: Uuid, update: SettingsUpdate) -> StoreResult<Account>;

    /// Stores a new password hash and clears any temporary password.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    async fn delete_sessions(&self, user_id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait DutyRepository: Send + Sync {
    async fn remove_active_dispatcher(&self, user_id: Uuid) -> StoreResult<()>;

    /// The user's unit of this kind whose status is anything but off-duty.
    async fn find_on_duty(&self, user_id: Uuid, kind: UnitKind) -> StoreResult<Option<DutyUnit>>;

    /// Clears the unit's call and status, drops its dispatch chat and closes
    /// its open shift log.
    async fn end_shift(&self, unit: &DutyUnit) -> StoreResult<()>;
}

#[async_trait]
pub trait CadRepository: Send + Sync {
    async fn current(&self) -> StoreResult<Option<CadConfig>>;
}
