use std::time::{Duration, Instant};

use rand::Rng;

use crate::i18n;
use crate::models::{Language, Situation, TipKey};
use crate::state::{StatePatch, StateManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeButton {
    Enabled,
    /// A like request is in flight.
    Pending,
    /// Showing "Liked" until the instant passes.
    Confirmed { until: Instant },
}

#[derive(Debug, Clone)]
pub struct Banner {
    pub message: String,
    until: Instant,
}

/// What the terminal shows, derived from state by explicit calls.
pub struct ViewController {
    tip_text: Option<String>,
    like_count: i64,
    like_button: LikeButton,
    banner: Option<Banner>,
    pub is_loading: bool,
    like_cooldown: Duration,
    banner_duration: Duration,
}

impl ViewController {
    pub fn new(like_cooldown: Duration, banner_duration: Duration) -> Self {
        Self {
            tip_text: None,
            like_count: 0,
            like_button: LikeButton::Enabled,
            banner: None,
            is_loading: false,
            like_cooldown,
            banner_duration,
        }
    }

    pub fn tip_text(&self) -> Option<&str> {
        self.tip_text.as_deref()
    }

    pub fn like_button(&self) -> LikeButton {
        self.like_button
    }

    pub fn like_enabled(&self) -> bool {
        self.tip_text.is_some() && self.like_button == LikeButton::Enabled
    }

    pub fn like_label(&self, language: Language) -> String {
        let liked = matches!(self.like_button, LikeButton::Confirmed { .. });
        i18n::like_label(language, liked, self.like_count)
    }

    /// Picks a random tip from the (situation, current language) bucket and
    /// displays it. Repeats of the previous tip are possible.
    pub fn show_tip<R: Rng + ?Sized>(
        &mut self,
        state: &mut StateManager,
        situation: Situation,
        rng: &mut R,
    ) -> Option<TipKey> {
        let language = state.state().current_language;
        let bucket = state.state().tips.bucket(situation, language);

        if bucket.is_empty() {
            tracing::warn!("No tips for {}/{}", situation, language);
            state.set_state(StatePatch {
                current_situation: Some(Some(situation)),
                current_tip_id: Some(None),
                ..Default::default()
            });
            self.tip_text = None;
            self.like_count = 0;
            return None;
        }

        let index = rng.gen_range(0..bucket.len());
        let selected = bucket[index].clone();

        state.set_state(StatePatch {
            current_situation: Some(Some(situation)),
            current_tip_id: Some(Some(selected.id.clone())),
            ..Default::default()
        });

        self.tip_text = Some(selected.content);
        self.like_count = selected.likes;
        self.like_button = LikeButton::Enabled;

        Some(TipKey {
            id: selected.id,
            situation,
            language,
        })
    }

    pub fn begin_like(&mut self) {
        self.like_button = LikeButton::Pending;
    }

    pub fn show_like_confirmation(&mut self, count: i64, now: Instant) {
        self.like_count = count;
        self.like_button = LikeButton::Confirmed {
            until: now + self.like_cooldown,
        };
    }

    pub fn like_failed(&mut self) {
        self.like_button = LikeButton::Enabled;
    }

    pub fn show_error(&mut self, message: impl Into<String>, now: Instant) {
        self.banner = Some(Banner {
            message: message.into(),
            until: now + self.banner_duration,
        });
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_ref().map(|b| b.message.as_str())
    }

    /// Expires the like confirmation and the banner.
    pub fn tick(&mut self, now: Instant) {
        if let LikeButton::Confirmed { until } = self.like_button {
            if now >= until {
                self.like_button = LikeButton::Enabled;
            }
        }
        if self.banner.as_ref().is_some_and(|b| now >= b.until) {
            self.banner = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::defaults::default_tips;
    use crate::models::{TipCollection, TipEntry};
    use crate::state::TipState;

    fn view() -> ViewController {
        ViewController::new(Duration::from_secs(2), Duration::from_secs(5))
    }

    fn state_with(tips: TipCollection) -> StateManager {
        let mut state = StateManager::new(TipState::new(Language::En));
        state.set_state(StatePatch {
            tips: Some(tips),
            ..Default::default()
        });
        state
    }

    #[test]
    fn selection_stays_in_bucket_and_matches_content() {
        let mut tips = TipCollection::new();
        for i in 0..7 {
            tips.push(
                Situation::Work,
                Language::En,
                TipEntry {
                    id: format!("w{i}"),
                    content: format!("tip number {i}"),
                    display_count: 0,
                    likes: i,
                },
            );
        }
        let mut state = state_with(tips.clone());
        let mut view = view();
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = HashSet::new();

        for _ in 0..200 {
            let key = view.show_tip(&mut state, Situation::Work, &mut rng).unwrap();
            let bucket = tips.bucket(Situation::Work, Language::En);
            let index = bucket.iter().position(|e| e.id == key.id).unwrap();
            assert!(index < bucket.len());
            assert_eq!(view.tip_text(), Some(bucket[index].content.as_str()));
            assert_eq!(state.state().current_tip_id.as_deref(), Some(key.id.as_str()));
            seen.insert(index);
        }

        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn empty_bucket_shows_nothing_but_keeps_situation() {
        let mut state = state_with(TipCollection::new());
        let mut view = view();
        let mut rng = StdRng::seed_from_u64(1);

        assert!(view.show_tip(&mut state, Situation::Sleep, &mut rng).is_none());
        assert_eq!(view.tip_text(), None);
        assert!(!view.like_enabled());
        assert_eq!(state.state().current_situation, Some(Situation::Sleep));
        assert_eq!(state.state().current_tip_id, None);
    }

    #[test]
    fn like_confirmation_disables_for_cooldown() {
        let mut state = state_with(default_tips());
        let mut view = view();
        let mut rng = StdRng::seed_from_u64(3);
        view.show_tip(&mut state, Situation::Morning, &mut rng).unwrap();
        assert!(view.like_enabled());

        let start = Instant::now();
        view.begin_like();
        assert!(!view.like_enabled());

        view.show_like_confirmation(4, start);
        assert_eq!(view.like_label(Language::En), "Liked (4)");

        view.tick(start + Duration::from_millis(1999));
        assert!(!view.like_enabled());

        view.tick(start + Duration::from_secs(2));
        assert!(view.like_enabled());
        assert_eq!(view.like_label(Language::En), "Like (4)");
    }

    #[test]
    fn failed_like_re_enables_button() {
        let mut state = state_with(default_tips());
        let mut view = view();
        let mut rng = StdRng::seed_from_u64(3);
        view.show_tip(&mut state, Situation::Evening, &mut rng).unwrap();

        view.begin_like();
        view.like_failed();
        assert!(view.like_enabled());
        assert_eq!(view.like_label(Language::Zh), "喜欢");
    }

    #[test]
    fn banner_auto_dismisses() {
        let mut view = view();
        let start = Instant::now();
        view.show_error("Failed to load tips.", start);
        view.tick(start + Duration::from_secs(4));
        assert_eq!(view.banner(), Some("Failed to load tips."));
        view.tick(start + Duration::from_secs(5));
        assert_eq!(view.banner(), None);
    }
}
