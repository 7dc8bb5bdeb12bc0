use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::audio::{AudioController, AudioTrack, CommandPlayer, PlaybackState, Player};
use crate::cache::{LikedTips, TipCache};
use crate::config::{AccessLevel, BackendKind, Config};
use crate::db::{reshape, RealtimeClient, Repository, Reshaped, TipSource};
use crate::defaults::default_tips;
use crate::error::{AppError, ErrorCategory, Result};
use crate::i18n;
use crate::models::{Language, LikeOutcome, Situation, TipCollection, TipFilter, TipKey};
use crate::state::{StateManager, StatePatch, TipState};
use crate::storage::LocalStore;
use crate::tui::AppAction;
use crate::view::ViewController;

const USER_ID_KEY: &str = "userId";

// Message for a completed like request
pub struct LikeResult {
    pub key: TipKey,
    pub result: Result<(LikeOutcome, i64)>, // (outcome, like count)
}

pub struct AppParts {
    pub source: Option<Arc<dyn TipSource>>,
    pub access: AccessLevel,
    pub cache: TipCache,
    pub liked: LikedTips,
    pub player: Box<dyn Player>,
    pub language: Language,
    pub view: ViewController,
    pub rng: StdRng,
}

pub struct App {
    // State
    pub state: StateManager,
    pub view: ViewController,
    pub show_help: bool,
    rng: StdRng,

    // Async state
    like_rx: mpsc::Receiver<LikeResult>,
    like_tx: mpsc::Sender<LikeResult>,

    // Services
    source: Option<Arc<dyn TipSource>>,
    access: AccessLevel,
    cache: TipCache,
    liked: LikedTips,
    audio: AudioController<Box<dyn Player>>,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let store = LocalStore::new(&config.storage_path);
        let source = connect_backend(config, &store).await?;

        Ok(Self::assemble(AppParts {
            source: Some(source),
            access: config.access_level,
            cache: TipCache::new(store.clone(), config.cache_ttl()),
            liked: LikedTips::new(store),
            player: Box::new(CommandPlayer::new(
                &config.sounds_dir,
                config.audio_player.clone(),
            )),
            language: config.default_language,
            view: ViewController::new(config.like_cooldown(), config.banner_duration()),
            rng: StdRng::from_entropy(),
        }))
    }

    pub fn assemble(parts: AppParts) -> Self {
        let mut state = StateManager::new(TipState::new(parts.language));
        state.subscribe(|s| {
            tracing::trace!(
                language = %s.current_language,
                situation = ?s.current_situation,
                tip = ?s.current_tip_id,
                audio = s.is_audio_playing,
                "state changed"
            );
        });

        let (like_tx, like_rx) = mpsc::channel(8);

        Self {
            state,
            view: parts.view,
            show_help: false,
            rng: parts.rng,
            like_rx,
            like_tx,
            source: parts.source,
            access: parts.access,
            cache: parts.cache,
            liked: parts.liked,
            audio: AudioController::new(parts.player),
        }
    }

    pub fn language(&self) -> Language {
        self.state.state().current_language
    }

    pub fn is_audio_playing(&self) -> bool {
        self.audio.is_playing()
    }

    pub fn current_track(&self) -> AudioTrack {
        self.audio.current_track()
    }

    pub fn is_current_tip_liked(&self) -> bool {
        self.state
            .state()
            .current_tip_id
            .as_deref()
            .is_some_and(|id| self.liked.contains(id))
    }

    pub async fn handle_action(&mut self, action: AppAction) -> Result<bool> {
        match action {
            AppAction::Quit => {
                self.audio.stop();
                return Ok(true);
            }

            AppAction::ShowTip(situation) => self.show_tip(situation),

            AppAction::NextTip => {
                if let Some(situation) = self.state.state().current_situation {
                    self.show_tip(situation);
                }
            }

            AppAction::LikeTip => self.like_tip(),

            AppAction::SwitchLanguage => self.switch_language(),

            AppAction::ToggleAudio => {
                let result = self.audio.toggle();
                self.after_audio_change(result);
            }

            AppAction::NextTrack => {
                let result = self.audio.next_track();
                self.after_audio_change(result);
            }

            AppAction::ReloadTips => {
                self.cache.clear();
                self.load_tips().await;
            }

            AppAction::ShowHelp => {
                self.show_help = true;
            }

            AppAction::HideHelp => {
                self.show_help = false;
            }

            AppAction::Visibility(visible) => {
                let was_playing = self.audio.is_playing();
                self.audio.set_visible(visible);
                if was_playing != self.audio.is_playing() {
                    self.sync_audio_state();
                }
            }
        }

        Ok(false)
    }

    /// Cache first, then the backend, then the built-in tips.
    pub async fn load_tips(&mut self) {
        self.view.is_loading = true;

        let tips = match self.cache.load() {
            Some(cached) => {
                tracing::info!("Loading {} tips from cache", cached.len());
                cached
            }
            None => self.fetch_tips().await,
        };

        self.state.set_state(StatePatch {
            tips: Some(tips),
            ..Default::default()
        });
        self.view.is_loading = false;

        if let Some(situation) = self.state.state().current_situation {
            self.show_tip(situation);
        }
    }

    async fn fetch_tips(&mut self) -> TipCollection {
        let Some(source) = self.source.clone().filter(|_| self.access.can_read()) else {
            tracing::info!("Reading from the database is not allowed, using built-in tips");
            return default_tips();
        };

        match source.fetch_all(&TipFilter::default()).await {
            Ok(rows) => {
                let Reshaped { tips, skipped } = reshape(rows);
                if skipped > 0 {
                    tracing::warn!("Skipped {} malformed tip rows", skipped);
                }

                let tips = if tips.is_empty() {
                    let err = AppError::NotFound("no usable tips in backend".into());
                    tracing::warn!("{}, using built-in tips", err);
                    default_tips()
                } else {
                    tips
                };
                self.cache.save(&tips);
                tips
            }
            Err(e) => {
                tracing::error!("Failed to load tips: {}", e);
                let message = i18n::strings(self.language()).load_failed;
                self.view.show_error(message, Instant::now());
                default_tips()
            }
        }
    }

    fn show_tip(&mut self, situation: Situation) {
        let Some(key) = self.view.show_tip(&mut self.state, situation, &mut self.rng) else {
            return;
        };
        let Some(source) = self.writable_source() else {
            return;
        };
        tokio::spawn(async move {
            if let Err(e) = source.increment_display_count(&key).await {
                tracing::debug!("Failed to count display of {}: {}", key.id, e);
            }
        });
    }

    fn switch_language(&mut self) {
        let language = self.language().toggle();
        self.state.set_state(StatePatch {
            current_language: Some(language),
            ..Default::default()
        });

        if let Some(situation) = self.state.state().current_situation {
            self.show_tip(situation);
        }
    }

    fn like_tip(&mut self) {
        if !self.view.like_enabled() {
            return;
        }
        let Some(key) = self.state.state().current_tip_key() else {
            return;
        };
        let Some(source) = self.writable_source() else {
            tracing::info!("Writing to the database is not allowed in this environment");
            let message = i18n::strings(self.language()).read_only;
            self.view.show_error(message, Instant::now());
            return;
        };

        self.view.begin_like();
        let tx = self.like_tx.clone();

        // The key is captured now; the result applies to it even if the
        // user has moved on by the time it completes.
        tokio::spawn(async move {
            let result = async {
                let outcome = source.increment_like(&key).await?;
                let count = source.get_like_count(&key).await?;
                Ok::<_, AppError>((outcome, count))
            }
            .await;

            let _ = tx.send(LikeResult { key, result }).await;
        });
    }

    /// Poll for completed like requests (non-blocking)
    pub fn poll_like_result(&mut self) {
        while let Ok(result) = self.like_rx.try_recv() {
            self.apply_like_result(result, Instant::now());
        }
    }

    fn apply_like_result(&mut self, LikeResult { key, result }: LikeResult, now: Instant) {
        let is_current = self.state.state().current_tip_key().as_ref() == Some(&key);

        match result {
            Ok((outcome, count)) => {
                self.liked.remember(&key.id);
                if let Some(entry) = self.state.tips_mut().entry_mut(&key) {
                    entry.likes = count;
                }

                match outcome {
                    LikeOutcome::Recorded => {
                        tracing::info!("Liked tip {} ({} likes)", key.id, count);
                        if is_current {
                            self.view.show_like_confirmation(count, now);
                        }
                    }
                    LikeOutcome::AlreadyLiked => {
                        if is_current {
                            self.view.like_failed();
                        }
                        let message = i18n::strings(self.language()).already_liked;
                        self.view.show_error(message, now);
                    }
                }
            }
            Err(e) => {
                match e.category() {
                    ErrorCategory::NotFound => {
                        tracing::warn!("Tip {} is not stored in the backend: {}", key.id, e)
                    }
                    _ => tracing::error!("Failed to like tip {}: {}", key.id, e),
                }
                if is_current {
                    self.view.like_failed();
                }
                let message = i18n::strings(self.language()).like_failed;
                self.view.show_error(message, now);
            }
        }
    }

    pub fn tick(&mut self) {
        self.view.tick(Instant::now());
    }

    fn writable_source(&self) -> Option<Arc<dyn TipSource>> {
        self.source.clone().filter(|_| self.access.can_write())
    }

    fn after_audio_change(&mut self, result: Result<()>) {
        if let Err(e) = result {
            tracing::error!("Audio playback failed: {}", e);
            let message = i18n::strings(self.language()).audio_failed;
            self.view.show_error(message, Instant::now());
        }
        self.sync_audio_state();
    }

    fn sync_audio_state(&mut self) {
        self.state.set_state(StatePatch {
            is_audio_playing: Some(self.audio.state() != PlaybackState::Stopped),
            current_audio_type: Some(self.audio.current_track()),
            ..Default::default()
        });
    }
}

async fn connect_backend(config: &Config, store: &LocalStore) -> Result<Arc<dyn TipSource>> {
    match config.backend {
        BackendKind::Sqlite => {
            let repository = Repository::new(&config.db_path).await?;
            Ok(Arc::new(repository))
        }
        BackendKind::Realtime => {
            let realtime = config
                .realtime
                .as_ref()
                .ok_or_else(|| AppError::Config("missing [realtime] settings".into()))?;
            let user_id = match &realtime.user_id {
                Some(id) => id.clone(),
                None => store.get_or_insert_with(USER_ID_KEY, || Uuid::new_v4().to_string())?,
            };
            tracing::info!("Using realtime backend at {} as {}", realtime.url, user_id);
            let client = RealtimeClient::new(&realtime.url, realtime.auth_token.clone(), user_id)?;
            Ok(Arc::new(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::models::{TipEntry, TipRow};

    #[derive(Default)]
    struct MemorySource {
        rows: Mutex<Vec<TipRow>>,
        fail_reads: bool,
        fail_writes: bool,
        fetches: AtomicUsize,
        writes: AtomicUsize,
    }

    impl MemorySource {
        fn with_tips(tips: &TipCollection) -> Self {
            Self {
                rows: Mutex::new(tips.to_rows()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl TipSource for MemorySource {
        async fn fetch_all(&self, filter: &TipFilter) -> Result<Vec<TipRow>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads {
                return Err(AppError::Query("backend unavailable".into()));
            }
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|r| {
                    filter
                        .situation
                        .map_or(true, |s| r.situation.as_deref() == Some(s.as_str()))
                })
                .cloned()
                .collect())
        }

        async fn increment_like(&self, key: &TipKey) -> Result<LikeOutcome> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(AppError::Query("write rejected".into()));
            }
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|r| r.id == key.id)
                .ok_or_else(|| AppError::NotFound(key.id.clone()))?;
            row.likes += 1;
            Ok(LikeOutcome::Recorded)
        }

        async fn get_like_count(&self, key: &TipKey) -> Result<i64> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().find(|r| r.id == key.id).map_or(0, |r| r.likes))
        }

        async fn increment_display_count(&self, _key: &TipKey) -> Result<()> {
            Ok(())
        }
    }

    struct SilentPlayer;

    impl Player for SilentPlayer {
        fn start(&mut self, _track: AudioTrack) -> Result<()> {
            Ok(())
        }

        fn stop(&mut self, _track: AudioTrack) {}
    }

    fn sample_tips() -> TipCollection {
        let mut tips = TipCollection::new();
        for language in Language::ALL {
            tips.push(
                Situation::Work,
                language,
                TipEntry {
                    id: format!("work_{language}"),
                    content: format!("work tip in {language}"),
                    display_count: 0,
                    likes: 0,
                },
            );
        }
        tips
    }

    fn app_with(source: Arc<MemorySource>, access: AccessLevel) -> (TempDir, App) {
        let source: Arc<dyn TipSource> = source;
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("store.json"));
        let app = App::assemble(AppParts {
            source: Some(source),
            access,
            cache: TipCache::new(store.clone(), Duration::from_secs(24 * 60 * 60)),
            liked: LikedTips::new(store),
            player: Box::new(SilentPlayer),
            language: Language::Zh,
            view: ViewController::new(Duration::from_secs(2), Duration::from_secs(5)),
            rng: StdRng::seed_from_u64(42),
        });
        (dir, app)
    }

    #[tokio::test]
    async fn empty_backend_falls_back_to_defaults() {
        let source = Arc::new(MemorySource::default());
        let (_dir, mut app) = app_with(Arc::clone(&source), AccessLevel::ReadWrite);

        app.load_tips().await;

        let tips = &app.state.state().tips;
        assert_eq!(tips, &default_tips());
        for situation in Situation::ALL {
            for language in Language::ALL {
                let bucket = tips.bucket(situation, language);
                assert!(!bucket.is_empty());
                assert!(bucket.iter().all(|e| e.display_count == 0));
            }
        }
        assert!(tips.to_rows().iter().all(|r| r.is_active));
        assert!(!app.view.is_loading);
    }

    #[tokio::test]
    async fn failed_fetch_shows_banner_and_defaults_without_caching() {
        let source = Arc::new(MemorySource {
            fail_reads: true,
            ..Default::default()
        });
        let (_dir, mut app) = app_with(Arc::clone(&source), AccessLevel::ReadWrite);

        app.load_tips().await;
        assert_eq!(app.state.state().tips, default_tips());
        assert!(app.view.banner().is_some());
        assert_eq!(app.cache.load(), None);
    }

    #[tokio::test]
    async fn second_load_is_served_from_cache() {
        let source = Arc::new(MemorySource::with_tips(&sample_tips()));
        let (_dir, mut app) = app_with(Arc::clone(&source), AccessLevel::ReadWrite);

        app.load_tips().await;
        app.load_tips().await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        app.handle_action(AppAction::ReloadTips).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn without_read_access_backend_is_not_queried() {
        let source = Arc::new(MemorySource::with_tips(&sample_tips()));
        let (_dir, mut app) = app_with(Arc::clone(&source), AccessLevel::WriteOnly);

        tokio_test::block_on(app.load_tips());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(app.state.state().tips, default_tips());
    }

    #[tokio::test]
    async fn switching_language_keeps_situation() {
        let source = Arc::new(MemorySource::with_tips(&sample_tips()));
        let (_dir, mut app) = app_with(source, AccessLevel::ReadWrite);
        app.load_tips().await;

        app.handle_action(AppAction::ShowTip(Situation::Work)).await.unwrap();
        assert_eq!(app.view.tip_text(), Some("work tip in zh"));

        app.handle_action(AppAction::SwitchLanguage).await.unwrap();
        let state = app.state.state();
        assert_eq!(state.current_language, Language::En);
        assert_eq!(state.current_situation, Some(Situation::Work));
        assert_eq!(state.current_tip_id.as_deref(), Some("work_en"));
        assert_eq!(app.view.tip_text(), Some("work tip in en"));
    }

    #[tokio::test]
    async fn like_updates_count_after_remote_success() {
        let source = Arc::new(MemorySource::with_tips(&sample_tips()));
        let (_dir, mut app) = app_with(Arc::clone(&source), AccessLevel::ReadWrite);
        app.load_tips().await;
        app.handle_action(AppAction::ShowTip(Situation::Work)).await.unwrap();

        app.handle_action(AppAction::LikeTip).await.unwrap();
        assert!(!app.view.like_enabled());

        let result = app.like_rx.recv().await.unwrap();
        app.apply_like_result(result, Instant::now());

        assert_eq!(app.view.like_label(Language::Zh), "已喜欢 (1)");
        assert!(app.is_current_tip_liked());
        assert_eq!(
            app.state.state().tips.bucket(Situation::Work, Language::Zh)[0].likes,
            1
        );
    }

    #[tokio::test]
    async fn failed_like_keeps_count_and_re_enables() {
        let source = Arc::new(MemorySource {
            rows: Mutex::new(sample_tips().to_rows()),
            fail_writes: true,
            ..Default::default()
        });
        let (_dir, mut app) = app_with(Arc::clone(&source), AccessLevel::ReadWrite);
        app.load_tips().await;
        app.handle_action(AppAction::ShowTip(Situation::Work)).await.unwrap();

        app.handle_action(AppAction::LikeTip).await.unwrap();
        let result = app.like_rx.recv().await.unwrap();
        app.apply_like_result(result, Instant::now());

        assert!(app.view.like_enabled());
        assert!(app.view.banner().is_some());
        assert!(!app.is_current_tip_liked());
        assert_eq!(
            app.state.state().tips.bucket(Situation::Work, Language::Zh)[0].likes,
            0
        );
    }

    #[tokio::test]
    async fn like_result_for_previous_tip_does_not_touch_current_button() {
        let source = Arc::new(MemorySource::with_tips(&sample_tips()));
        let (_dir, mut app) = app_with(Arc::clone(&source), AccessLevel::ReadWrite);
        app.load_tips().await;
        app.handle_action(AppAction::ShowTip(Situation::Work)).await.unwrap();
        app.handle_action(AppAction::LikeTip).await.unwrap();

        app.handle_action(AppAction::SwitchLanguage).await.unwrap();
        let result = app.like_rx.recv().await.unwrap();
        assert_eq!(result.key.language, Language::Zh);
        app.apply_like_result(result, Instant::now());

        assert!(app.view.like_enabled());
        assert_eq!(
            app.state.state().tips.bucket(Situation::Work, Language::Zh)[0].likes,
            1
        );
        assert_eq!(
            app.state.state().tips.bucket(Situation::Work, Language::En)[0].likes,
            0
        );
    }

    #[tokio::test]
    async fn read_only_access_blocks_likes() {
        let source = Arc::new(MemorySource::with_tips(&sample_tips()));
        let (_dir, mut app) = app_with(Arc::clone(&source), AccessLevel::ReadOnly);
        app.load_tips().await;
        app.handle_action(AppAction::ShowTip(Situation::Work)).await.unwrap();

        app.handle_action(AppAction::LikeTip).await.unwrap();
        assert_eq!(source.writes.load(Ordering::SeqCst), 0);
        assert!(app.view.like_enabled());
        assert!(app.view.banner().is_some());
    }

    #[tokio::test]
    async fn audio_state_is_mirrored_and_paused_when_hidden() {
        let source = Arc::new(MemorySource::default());
        let (_dir, mut app) = app_with(source, AccessLevel::ReadWrite);

        app.handle_action(AppAction::NextTrack).await.unwrap();
        assert!(app.state.state().is_audio_playing);
        assert_eq!(app.state.state().current_audio_type, AudioTrack::Beach);

        app.handle_action(AppAction::Visibility(false)).await.unwrap();
        assert!(!app.state.state().is_audio_playing);

        app.handle_action(AppAction::Visibility(true)).await.unwrap();
        assert!(!app.is_audio_playing());

        app.handle_action(AppAction::ToggleAudio).await.unwrap();
        assert!(app.state.state().is_audio_playing);
        assert_eq!(app.current_track(), AudioTrack::Beach);
    }
}
