//! In-memory store backing the integration tests.
//!
//! All state lives behind one async mutex, so each trait call is atomic with
//! respect to every other call, the same guarantee the Postgres store gets from
//! its transactions.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use dispatch_server::models::{
    Account, CadConfig, DutyUnit, Feed, Page, Post, PostAuthor, PostInput, PostWithAuthor,
    Profile, ProfileInput, ProfileUpsert, SettingsUpdate, SoundSettings, UnitKind,
};
use dispatch_server::repository::{
    AccountRepository, CadRepository, DutyRepository, PostRepository, ProfileRepository,
    StoreError, StoreResult,
};

pub const OFF_DUTY: &str = "SET_OFF_DUTY";

#[derive(Debug, Clone)]
pub struct MemorySession {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DispatchChatMessage {
    pub unit_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ShiftLog {
    pub unit_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Raw tables. Public so tests can seed and inspect them.
#[derive(Debug, Default)]
pub struct MemoryState {
    pub accounts: HashMap<Uuid, Account>,
    pub sound_settings: HashMap<Uuid, SoundSettings>,
    pub sessions: HashMap<String, MemorySession>,
    pub active_dispatchers: HashSet<Uuid>,
    /// status id -> `should_do`
    pub statuses: HashMap<Uuid, String>,
    pub units: HashMap<Uuid, DutyUnit>,
    pub dispatch_chat: Vec<DispatchChatMessage>,
    pub shift_logs: Vec<ShiftLog>,
    pub profiles: HashMap<Uuid, Profile>,
    pub posts: HashMap<Uuid, Post>,
    pub cad: Option<CadConfig>,
}

impl MemoryState {
    fn with_author(&self, post: &Post) -> PostWithAuthor {
        let username = self
            .accounts
            .get(&post.user_id)
            .map(|a| a.username.clone())
            .unwrap_or_default();
        let creator = post
            .creator_id
            .and_then(|id| self.profiles.values().find(|p| p.id == id).cloned());

        PostWithAuthor {
            post: post.clone(),
            user: PostAuthor { username },
            creator,
        }
    }

    fn hydrate(&self, account: &Account) -> Account {
        let mut account = account.clone();
        account.sound_settings = account
            .sound_settings_id
            .and_then(|id| self.sound_settings.get(&id).cloned());
        account
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct access to the tables.
    pub async fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().await
    }

    pub async fn insert_account(&self, account: Account) -> Account {
        self.state
            .lock()
            .await
            .accounts
            .insert(account.id, account.clone());
        account
    }

    /// Opens a session valid for one hour and returns its access token.
    pub async fn open_session(&self, user_id: Uuid) -> String {
        let access_token = Uuid::new_v4().simple().to_string();
        self.state.lock().await.sessions.insert(
            access_token.clone(),
            MemorySession {
                user_id,
                expires_at: Utc::now() + chrono::Duration::hours(1),
            },
        );
        access_token
    }

    /// Inserts a unit for `user_id` holding a status with the given `should_do`.
    pub async fn insert_unit(&self, user_id: Uuid, kind: UnitKind, should_do: &str) -> DutyUnit {
        let status_id = Uuid::new_v4();
        let unit = DutyUnit {
            id: Uuid::new_v4(),
            user_id,
            kind,
            status_id: Some(status_id),
            active_call_id: Some(Uuid::new_v4()),
        };

        let mut state = self.state.lock().await;
        state.statuses.insert(status_id, should_do.to_string());
        state.units.insert(unit.id, unit.clone());
        state.shift_logs.push(ShiftLog {
            unit_id: unit.id,
            started_at: Utc::now(),
            ended_at: None,
        });
        unit
    }

    pub async fn insert_post(&self, post: Post) -> Post {
        self.state.lock().await.posts.insert(post.id, post.clone());
        post
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn feed(&self, user_id: Uuid, page: Option<Page>) -> StoreResult<Feed> {
        let state = self.state.lock().await;

        let mut posts: Vec<&Post> = state.posts.values().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let window: Vec<PostWithAuthor> = match page {
            Some(page) => posts
                .into_iter()
                .skip(page.skip.max(0) as usize)
                .take(page.take.max(0) as usize)
                .map(|p| state.with_author(p))
                .collect(),
            None => posts.into_iter().map(|p| state.with_author(p)).collect(),
        };

        Ok(Feed {
            posts: window,
            total_count: state.posts.len() as i64,
            user_bleeter_profile: state.profiles.get(&user_id).cloned(),
        })
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<PostWithAuthor>> {
        let state = self.state.lock().await;
        Ok(state.posts.get(&id).map(|p| state.with_author(p)))
    }

    async fn create(
        &self,
        user_id: Uuid,
        creator_id: Option<Uuid>,
        input: PostInput,
    ) -> StoreResult<Post> {
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            user_id,
            creator_id,
            title: input.title,
            body: input.body,
            body_data: input.body_data,
            image_id: None,
            image_blur_data: None,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, id: Uuid, input: PostInput) -> StoreResult<Post> {
        let mut state = self.state.lock().await;
        let post = state.posts.get_mut(&id).ok_or(StoreError::NotFound)?;
        post.title = input.title;
        post.body = input.body;
        post.body_data = input.body_data;
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn set_image(&self, id: Uuid, image_id: &str, blur_data: &str) -> StoreResult<Post> {
        let mut state = self.state.lock().await;
        let post = state.posts.get_mut(&id).ok_or(StoreError::NotFound)?;
        post.image_id = Some(image_id.to_string());
        post.image_blur_data = Some(blur_data.to_string());
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.state
            .lock()
            .await
            .posts
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn find_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.state.lock().await.profiles.get(&user_id).cloned())
    }

    async fn upsert(&self, user_id: Uuid, input: ProfileInput) -> StoreResult<ProfileUpsert> {
        let mut state = self.state.lock().await;

        let taken = state
            .profiles
            .values()
            .any(|p| p.handle == input.handle && p.user_id != user_id);
        if taken {
            return Err(StoreError::HandleTaken);
        }

        if let Some(profile) = state.profiles.get_mut(&user_id) {
            profile.handle = input.handle;
            profile.name = input.name;
            profile.bio = input.bio;
            return Ok(ProfileUpsert {
                profile: profile.clone(),
                created: false,
            });
        }

        let profile = Profile {
            id: Uuid::new_v4(),
            user_id,
            handle: input.handle,
            name: input.name,
            bio: input.bio,
            verified: false,
            created_at: Utc::now(),
        };
        state.profiles.insert(user_id, profile.clone());

        state
            .posts
            .values_mut()
            .filter(|p| p.user_id == user_id && p.creator_id.is_none())
            .for_each(|p| p.creator_id = Some(profile.id));

        Ok(ProfileUpsert {
            profile,
            created: true,
        })
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn find_by_session(&self, access_token: &str) -> StoreResult<Option<Account>> {
        let state = self.state.lock().await;
        let account = state
            .sessions
            .get(access_token)
            .filter(|s| s.expires_at > Utc::now())
            .and_then(|s| state.accounts.get(&s.user_id))
            .map(|a| state.hydrate(a));
        Ok(account)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.username == username)
            .map(|a| state.hydrate(a)))
    }

    async fn update_settings(&self, id: Uuid, update: SettingsUpdate) -> StoreResult<Account> {
        let mut state = self.state.lock().await;
        let current = state
            .accounts
            .get(&id)
            .ok_or(StoreError::NotFound)?
            .sound_settings_id;

        let sound_settings_id = match update.sound_settings {
            Some(sound) => {
                let sound_id = current.unwrap_or_else(Uuid::new_v4);
                state.sound_settings.insert(
                    sound_id,
                    SoundSettings {
                        id: sound_id,
                        panic_button: sound.panic_button,
                        signal100: sound.signal100,
                        added_to_call: sound.added_to_call,
                        stop_roleplay: sound.stop_roleplay,
                        status_update: sound.status_update,
                        incoming_call: sound.incoming_call,
                        speech: sound.speech,
                        speech_voice: sound.speech_voice,
                    },
                );
                Some(sound_id)
            }
            None => current,
        };

        let account = state.accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        account.username = update.username;
        if let Some(dark) = update.is_dark_theme {
            account.is_dark_theme = dark;
        }
        if let Some(locale) = update.locale {
            account.locale = Some(locale);
        }
        if let Some(mode) = update.status_view_mode {
            account.status_view_mode = mode;
        }
        if let Some(alignment) = update.table_actions_alignment {
            account.table_actions_alignment = alignment;
        }
        if let Some(developer_mode) = update.developer_mode {
            account.developer_mode = developer_mode;
        }
        account.sound_settings_id = sound_settings_id;

        let account = account.clone();
        Ok(state.hydrate(&account))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let account = state.accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        account.password_hash = password_hash.to_string();
        account.temp_password_hash = None;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.accounts.remove(&id).ok_or(StoreError::NotFound)?;
        state.sessions.retain(|_, s| s.user_id != id);
        state.profiles.remove(&id);
        state.posts.retain(|_, p| p.user_id != id);
        state.active_dispatchers.remove(&id);
        Ok(())
    }

    async fn delete_sessions(&self, user_id: Uuid) -> StoreResult<()> {
        self.state
            .lock()
            .await
            .sessions
            .retain(|_, s| s.user_id != user_id);
        Ok(())
    }
}

#[async_trait]
impl DutyRepository for MemoryStore {
    async fn remove_active_dispatcher(&self, user_id: Uuid) -> StoreResult<()> {
        self.state.lock().await.active_dispatchers.remove(&user_id);
        Ok(())
    }

    async fn find_on_duty(&self, user_id: Uuid, kind: UnitKind) -> StoreResult<Option<DutyUnit>> {
        let state = self.state.lock().await;
        let unit = state
            .units
            .values()
            .filter(|u| u.user_id == user_id && u.kind == kind)
            .find(|u| {
                u.status_id
                    .and_then(|status| state.statuses.get(&status))
                    .is_some_and(|should_do| should_do != OFF_DUTY)
            })
            .cloned();
        Ok(unit)
    }

    async fn end_shift(&self, unit: &DutyUnit) -> StoreResult<()> {
        let mut state = self.state.lock().await;

        let stored = state.units.get_mut(&unit.id).ok_or(StoreError::NotFound)?;
        stored.active_call_id = None;
        stored.status_id = None;

        state.dispatch_chat.retain(|m| m.unit_id != unit.id);

        let now = Utc::now();
        state
            .shift_logs
            .iter_mut()
            .filter(|log| log.unit_id == unit.id && log.ended_at.is_none())
            .for_each(|log| log.ended_at = Some(now));
        Ok(())
    }
}

#[async_trait]
impl CadRepository for MemoryStore {
    async fn current(&self) -> StoreResult<Option<CadConfig>> {
        Ok(self.state.lock().await.cad.clone())
    }
}
