//! Postgres implementation of the repository traits.
//!
//! Queries are checked at runtime (`query_as` + `FromRow`) so the crate builds
//! without a live database. Multi-statement operations run in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{
    AccountRepository, CadRepository, DutyRepository, PostRepository, ProfileRepository,
    StoreError, StoreResult,
};
use crate::models::{
    Account, CadConfig, DutyUnit, Feed, Page, Post, PostAuthor, PostInput, PostWithAuthor,
    Profile, ProfileInput, ProfileUpsert, SettingsUpdate, SoundSettings, UnitKind,
};

const POST_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.creator_id, p.title, p.body, p.body_data, p.image_id,
           p.image_blur_data, p.created_at, p.updated_at,
           u.username,
           bp.id AS profile_id, bp.user_id AS profile_user_id, bp.handle AS profile_handle,
           bp.name AS profile_name, bp.bio AS profile_bio, bp.verified AS profile_verified,
           bp.created_at AS profile_created_at
      FROM bleeter_posts p
      JOIN users u ON u.id = p.user_id
      LEFT JOIN bleeter_profiles bp ON bp.id = p.creator_id
"#;

const HANDLE_CONSTRAINT: &str = "bleeter_profiles_handle_key";
const USERNAME_CONSTRAINT: &str = "users_username_key";

/// Store backed by a shared [`PgPool`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_sound_settings(&self, mut account: Account) -> StoreResult<Account> {
        if let Some(id) = account.sound_settings_id {
            account.sound_settings =
                sqlx::query_as::<_, SoundSettings>("SELECT * FROM user_sound_settings WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
        }
        Ok(account)
    }

    async fn with_sound_settings_opt(
        &self,
        account: Option<Account>,
    ) -> StoreResult<Option<Account>> {
        match account {
            Some(account) => Ok(Some(self.with_sound_settings(account).await?)),
            None => Ok(None),
        }
    }
}

#[derive(FromRow)]
struct PostRow {
    #[sqlx(flatten)]
    post: Post,
    username: String,
    profile_id: Option<Uuid>,
    profile_user_id: Option<Uuid>,
    profile_handle: Option<String>,
    profile_name: Option<String>,
    profile_bio: Option<String>,
    profile_verified: Option<bool>,
    profile_created_at: Option<DateTime<Utc>>,
}

impl From<PostRow> for PostWithAuthor {
    fn from(row: PostRow) -> Self {
        let creator = match (
            row.profile_id,
            row.profile_user_id,
            row.profile_handle,
            row.profile_name,
            row.profile_created_at,
        ) {
            (Some(id), Some(user_id), Some(handle), Some(name), Some(created_at)) => {
                Some(Profile {
                    id,
                    user_id,
                    handle,
                    name,
                    bio: row.profile_bio,
                    verified: row.profile_verified.unwrap_or(false),
                    created_at,
                })
            }
            _ => None,
        };

        Self {
            post: row.post,
            user: PostAuthor {
                username: row.username,
            },
            creator,
        }
    }
}

/// Profile row plus whether the upsert inserted it.
#[derive(FromRow)]
struct UpsertedProfile {
    #[sqlx(flatten)]
    profile: Profile,
    inserted: bool,
}

/// Name of the unique constraint `err` violated, if any.
fn violated_unique(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => db.constraint(),
        _ => None,
    }
}

/// Maps a unique violation on `constraint` to `conflict`, anything else to a database error.
fn map_conflict(err: sqlx::Error, constraint: &str, conflict: StoreError) -> StoreError {
    if violated_unique(&err) == Some(constraint) {
        conflict
    } else {
        StoreError::Database(err)
    }
}

#[async_trait]
impl PostRepository for PgStore {
    #[tracing::instrument(skip(self))]
    async fn feed(&self, user_id: Uuid, page: Option<Page>) -> StoreResult<Feed> {
        let (limit, offset) = match page {
            Some(page) => (Some(page.take), page.skip),
            None => (None, 0),
        };

        let mut tx = self.pool.begin().await?;

        let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bleeter_posts")
            .fetch_one(&mut *tx)
            .await?;

        let sql = format!("{POST_SELECT} ORDER BY p.created_at DESC LIMIT $1 OFFSET $2");
        let rows: Vec<PostRow> = sqlx::query_as(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *tx)
            .await?;

        let user_bleeter_profile =
            sqlx::query_as::<_, Profile>("SELECT * FROM bleeter_profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(Feed {
            posts: rows.into_iter().map(PostWithAuthor::from).collect(),
            total_count,
            user_bleeter_profile,
        })
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<PostWithAuthor>> {
        let sql = format!("{POST_SELECT} WHERE p.id = $1");
        let row: Option<PostRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(PostWithAuthor::from))
    }

    async fn create(
        &self,
        user_id: Uuid,
        creator_id: Option<Uuid>,
        input: PostInput,
    ) -> StoreResult<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"INSERT INTO bleeter_posts (id, user_id, creator_id, title, body, body_data)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(creator_id)
        .bind(input.title)
        .bind(input.body)
        .bind(input.body_data)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn update(&self, id: Uuid, input: PostInput) -> StoreResult<Post> {
        sqlx::query_as::<_, Post>(
            r#"UPDATE bleeter_posts
                  SET title = $2, body = $3, body_data = $4, updated_at = now()
                WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(input.title)
        .bind(input.body)
        .bind(input.body_data)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn set_image(&self, id: Uuid, image_id: &str, blur_data: &str) -> StoreResult<Post> {
        sqlx::query_as::<_, Post>(
            r#"UPDATE bleeter_posts
                  SET image_id = $2, image_blur_data = $3, updated_at = now()
                WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(image_id)
        .bind(blur_data)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM bleeter_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for PgStore {
    async fn find_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        let profile =
            sqlx::query_as::<_, Profile>("SELECT * FROM bleeter_profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(profile)
    }

    #[tracing::instrument(skip(self, input), fields(handle = %input.handle))]
    async fn upsert(&self, user_id: Uuid, input: ProfileInput) -> StoreResult<ProfileUpsert> {
        let mut tx = self.pool.begin().await?;

        let taken: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM bleeter_profiles WHERE handle = $1 AND user_id <> $2",
        )
        .bind(&input.handle)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if taken.is_some() {
            return Err(StoreError::HandleTaken);
        }

        // ON CONFLICT on user_id keeps concurrent first requests from racing
        let UpsertedProfile {
            profile,
            inserted: created,
        } = sqlx::query_as::<_, UpsertedProfile>(
            r#"INSERT INTO bleeter_profiles (id, user_id, handle, name, bio)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (user_id) DO UPDATE SET
                   handle = EXCLUDED.handle,
                   name = EXCLUDED.name,
                   bio = EXCLUDED.bio
               RETURNING *, (xmax = 0) AS inserted"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&input.handle)
        .bind(&input.name)
        .bind(&input.bio)
        .fetch_one(&mut *tx)
        .await
        // A concurrent writer can claim the handle between the check and the write
        .map_err(|e| map_conflict(e, HANDLE_CONSTRAINT, StoreError::HandleTaken))?;

        if created {
            let attached = sqlx::query(
                "UPDATE bleeter_posts SET creator_id = $1 WHERE user_id = $2 AND creator_id IS NULL",
            )
            .bind(profile.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
            tracing::debug!(
                attached_posts = attached.rows_affected(),
                "Attached existing posts to new profile"
            );
        }

        tx.commit().await?;
        Ok(ProfileUpsert { profile, created })
    }
}

#[async_trait]
impl AccountRepository for PgStore {
    async fn find_by_session(&self, access_token: &str) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"SELECT u.* FROM users u
                 JOIN user_sessions s ON s.user_id = u.id
                WHERE s.access_token = $1 AND s.expires_at > now()"#,
        )
        .bind(access_token)
        .fetch_optional(&self.pool)
        .await?;
        self.with_sound_settings_opt(account).await
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    #[tracing::instrument(skip(self, update))]
    async fn update_settings(&self, id: Uuid, update: SettingsUpdate) -> StoreResult<Account> {
        let mut tx = self.pool.begin().await?;

        let current: Option<Uuid> = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT sound_settings_id FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        let sound_settings_id = match update.sound_settings {
            Some(sound) => {
                let sound_id = current.unwrap_or_else(Uuid::new_v4);
                sqlx::query(
                    r#"INSERT INTO user_sound_settings
                           (id, panic_button, signal100, added_to_call, stop_roleplay,
                            status_update, incoming_call, speech, speech_voice)
                       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                       ON CONFLICT (id) DO UPDATE SET
                           panic_button = EXCLUDED.panic_button,
                           signal100 = EXCLUDED.signal100,
                           added_to_call = EXCLUDED.added_to_call,
                           stop_roleplay = EXCLUDED.stop_roleplay,
                           status_update = EXCLUDED.status_update,
                           incoming_call = EXCLUDED.incoming_call,
                           speech = EXCLUDED.speech,
                           speech_voice = EXCLUDED.speech_voice"#,
                )
                .bind(sound_id)
                .bind(sound.panic_button)
                .bind(sound.signal100)
                .bind(sound.added_to_call)
                .bind(sound.stop_roleplay)
                .bind(sound.status_update)
                .bind(sound.incoming_call)
                .bind(sound.speech)
                .bind(sound.speech_voice)
                .execute(&mut *tx)
                .await?;
                Some(sound_id)
            }
            None => current,
        };

        let account = sqlx::query_as::<_, Account>(
            r#"UPDATE users SET
                   username = $2,
                   is_dark_theme = COALESCE($3, is_dark_theme),
                   locale = COALESCE($4, locale),
                   status_view_mode = COALESCE($5, status_view_mode),
                   table_actions_alignment = COALESCE($6, table_actions_alignment),
                   developer_mode = COALESCE($7, developer_mode),
                   sound_settings_id = $8
                WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(update.username)
        .bind(update.is_dark_theme)
        .bind(update.locale)
        .bind(update.status_view_mode)
        .bind(update.table_actions_alignment)
        .bind(update.developer_mode)
        .bind(sound_settings_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_conflict(e, USERNAME_CONSTRAINT, StoreError::UsernameTaken))?;

        tx.commit().await?;
        self.with_sound_settings(account).await
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, temp_password_hash = NULL WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_sessions(&self, user_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM user_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DutyRepository for PgStore {
    async fn remove_active_dispatcher(&self, user_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM active_dispatchers WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_on_duty(&self, user_id: Uuid, kind: UnitKind) -> StoreResult<Option<DutyUnit>> {
        let sql = format!(
            r#"SELECT unit.id, unit.user_id, unit.status_id, unit.active_call_id
                 FROM {} unit
                 JOIN status_values s ON s.id = unit.status_id
                WHERE unit.user_id = $1 AND s.should_do <> 'SET_OFF_DUTY'
                LIMIT 1"#,
            kind.table()
        );
        let row: Option<(Uuid, Uuid, Option<Uuid>, Option<Uuid>)> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(id, user_id, status_id, active_call_id)| DutyUnit {
            id,
            user_id,
            kind,
            status_id,
            active_call_id,
        }))
    }

    #[tracing::instrument(skip(self), fields(unit_id = %unit.id, kind = ?unit.kind))]
    async fn end_shift(&self, unit: &DutyUnit) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE {} SET active_call_id = NULL, status_id = NULL WHERE id = $1",
            unit.kind.table()
        );
        sqlx::query(&sql).bind(unit.id).execute(&mut *tx).await?;

        sqlx::query("DELETE FROM dispatch_chat WHERE unit_id = $1")
            .bind(unit.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE officer_logs SET ended_at = now() WHERE unit_id = $1 AND ended_at IS NULL")
            .bind(unit.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl CadRepository for PgStore {
    async fn current(&self) -> StoreResult<Option<CadConfig>> {
        let cad = sqlx::query_as::<_, CadConfig>(
            r#"SELECT id, name, area_of_jurisdiction, features, version, api_token
                 FROM cads
             ORDER BY created_at
                LIMIT 1"#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(cad)
    }
}
