//! Session state with synchronous change notification.
//!
//! Listeners run on the caller's thread, in subscription order, right after
//! each `set_state`. Overlapping updates apply in call order, last write
//! wins per field.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::audio::AudioTrack;
use crate::models::{Language, Situation, TipCollection, TipKey};

#[derive(Debug, Clone, PartialEq)]
pub struct TipState {
    pub current_language: Language,
    pub current_situation: Option<Situation>,
    pub current_tip_id: Option<String>,
    pub is_audio_playing: bool,
    pub current_audio_type: AudioTrack,
    pub tips: TipCollection,
}

impl TipState {
    pub fn new(language: Language) -> Self {
        Self {
            current_language: language,
            current_situation: None,
            current_tip_id: None,
            is_audio_playing: false,
            current_audio_type: AudioTrack::default(),
            tips: TipCollection::new(),
        }
    }

    pub fn current_tip_key(&self) -> Option<TipKey> {
        Some(TipKey {
            id: self.current_tip_id.clone()?,
            situation: self.current_situation?,
            language: self.current_language,
        })
    }
}

/// Fields to overwrite; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub current_language: Option<Language>,
    pub current_situation: Option<Option<Situation>>,
    pub current_tip_id: Option<Option<String>>,
    pub is_audio_playing: Option<bool>,
    pub current_audio_type: Option<AudioTrack>,
    pub tips: Option<TipCollection>,
}

type Listener = Box<dyn FnMut(&TipState)>;

struct Subscriber {
    active: Rc<Cell<bool>>,
    listener: Listener,
}

pub struct StateManager {
    state: TipState,
    subscribers: Rc<RefCell<Vec<Subscriber>>>,
}

/// Handle returned by `StateManager::subscribe`. Dropping it keeps the
/// listener subscribed.
pub struct Unsubscribe {
    active: Rc<Cell<bool>>,
    subscribers: Weak<RefCell<Vec<Subscriber>>>,
}

impl Unsubscribe {
    #[allow(dead_code)]
    pub fn unsubscribe(self) {
        self.active.set(false);
        if let Some(subscribers) = self.subscribers.upgrade() {
            // Busy means we are inside a notification; it prunes afterwards.
            if let Ok(mut subscribers) = subscribers.try_borrow_mut() {
                subscribers.retain(|s| s.active.get());
            }
        }
    }
}

impl StateManager {
    pub fn new(initial: TipState) -> Self {
        Self {
            state: initial,
            subscribers: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn state(&self) -> &TipState {
        &self.state
    }

    /// Direct access for in-place edits of the tip collection. Does not notify.
    pub fn tips_mut(&mut self) -> &mut TipCollection {
        &mut self.state.tips
    }

    pub fn set_state(&mut self, patch: StatePatch) {
        let StatePatch {
            current_language,
            current_situation,
            current_tip_id,
            is_audio_playing,
            current_audio_type,
            tips,
        } = patch;

        if let Some(language) = current_language {
            self.state.current_language = language;
        }
        if let Some(situation) = current_situation {
            self.state.current_situation = situation;
        }
        if let Some(tip_id) = current_tip_id {
            self.state.current_tip_id = tip_id;
        }
        if let Some(playing) = is_audio_playing {
            self.state.is_audio_playing = playing;
        }
        if let Some(track) = current_audio_type {
            self.state.current_audio_type = track;
        }
        if let Some(tips) = tips {
            self.state.tips = tips;
        }

        self.notify();
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&TipState) + 'static) -> Unsubscribe {
        let active = Rc::new(Cell::new(true));
        self.subscribers.borrow_mut().push(Subscriber {
            active: Rc::clone(&active),
            listener: Box::new(listener),
        });
        Unsubscribe {
            active,
            subscribers: Rc::downgrade(&self.subscribers),
        }
    }

    #[allow(dead_code)]
    pub fn listener_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|s| s.active.get())
            .count()
    }

    fn notify(&mut self) {
        let mut subscribers = self.subscribers.borrow_mut();
        for subscriber in subscribers.iter_mut() {
            if subscriber.active.get() {
                (subscriber.listener)(&self.state);
            }
        }
        subscribers.retain(|s| s.active.get());
    }
}
