use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::kv::KeyValueStore;

pub const SETTINGS_KEY: &str = "narratype:settings";

pub const PRACTICE_AREA_WIDTH_RANGE: (u32, u32) = (50, 100);
pub const TYPING_AREA_BOTTOM_RANGE: (i32, i32) = (20, 400);
pub const TYPING_AREA_HEIGHT_RANGE: (u32, u32) = (80, 200);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    Medium,
    #[default]
    Large,
    Xl,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

/// Process-wide practice preferences. Missing fields in a persisted record
/// take their defaults, so older records keep loading as fields are added.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// Percent of the window width, 50..=100.
    pub practice_area_width: u32,
    /// Pixels from the bottom edge, 20..=400.
    pub typing_area_bottom: i32,
    /// Pixels, 80..=200.
    pub typing_area_height: u32,
    pub show_stats: bool,
    pub show_progress: bool,
    pub show_title: bool,
    pub font_size: FontSize,
    pub theme: Theme,
    pub sound_enabled: bool,
    pub auto_focus_input: bool,
    pub highlight_errors: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            practice_area_width: 85,
            typing_area_bottom: 40,
            typing_area_height: 120,
            show_stats: true,
            show_progress: true,
            show_title: true,
            font_size: FontSize::Large,
            theme: Theme::Auto,
            sound_enabled: false,
            auto_focus_input: true,
            highlight_errors: true,
        }
    }
}

impl Preferences {
    /// Clamp layout fields into their allowed ranges.
    pub fn normalize(&mut self) {
        self.practice_area_width = self
            .practice_area_width
            .clamp(PRACTICE_AREA_WIDTH_RANGE.0, PRACTICE_AREA_WIDTH_RANGE.1);
        self.typing_area_bottom = self
            .typing_area_bottom
            .clamp(TYPING_AREA_BOTTOM_RANGE.0, TYPING_AREA_BOTTOM_RANGE.1);
        self.typing_area_height = self
            .typing_area_height
            .clamp(TYPING_AREA_HEIGHT_RANGE.0, TYPING_AREA_HEIGHT_RANGE.1);
    }

    /// Merge a stored record over the defaults field by field. A field with
    /// the wrong type keeps its default without discarding the others.
    fn parse(raw: &str) -> Option<Self> {
        let Ok(serde_json::Value::Object(stored)) = serde_json::from_str(raw) else {
            return None;
        };
        let mut merged = serde_json::to_value(Preferences::default()).ok()?;
        for (key, value) in stored {
            let mut candidate = merged.clone();
            candidate[key.as_str()] = value;
            if serde_json::from_value::<Preferences>(candidate.clone()).is_ok() {
                merged = candidate;
            } else {
                warn!(field = %key, "ignoring malformed stored preference");
            }
        }
        let mut prefs: Preferences = serde_json::from_value(merged).ok()?;
        prefs.normalize();
        Some(prefs)
    }
}

/// A partial preference record; `None` fields are left untouched by `update`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferencesPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practice_area_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typing_area_bottom: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typing_area_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_stats: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_progress: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_title: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<FontSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_focus_input: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_errors: Option<bool>,
}

impl PreferencesPatch {
    pub fn apply_to(&self, prefs: &mut Preferences) {
        if let Some(v) = self.practice_area_width {
            prefs.practice_area_width = v;
        }
        if let Some(v) = self.typing_area_bottom {
            prefs.typing_area_bottom = v;
        }
        if let Some(v) = self.typing_area_height {
            prefs.typing_area_height = v;
        }
        if let Some(v) = self.show_stats {
            prefs.show_stats = v;
        }
        if let Some(v) = self.show_progress {
            prefs.show_progress = v;
        }
        if let Some(v) = self.show_title {
            prefs.show_title = v;
        }
        if let Some(v) = self.font_size {
            prefs.font_size = v;
        }
        if let Some(v) = self.theme {
            prefs.theme = v;
        }
        if let Some(v) = self.sound_enabled {
            prefs.sound_enabled = v;
        }
        if let Some(v) = self.auto_focus_input {
            prefs.auto_focus_input = v;
        }
        if let Some(v) = self.highlight_errors {
            prefs.highlight_errors = v;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Rc<dyn Fn(&Preferences)>;

/// Single owner of the preference record. Every change goes through
/// `update` or `reset`, and every registered subscriber receives the full
/// merged value afterwards.
pub struct PreferenceStore {
    storage: Rc<dyn KeyValueStore>,
    current: Cell<Preferences>,
    listeners: RefCell<Vec<(SubscriptionId, Listener)>>,
    next_id: Cell<u64>,
}

impl PreferenceStore {
    pub fn new(storage: Rc<dyn KeyValueStore>) -> Self {
        let current = Self::load(storage.as_ref());
        Self {
            storage,
            current: Cell::new(current),
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    fn load(storage: &dyn KeyValueStore) -> Preferences {
        match storage.get(SETTINGS_KEY) {
            Some(raw) => Preferences::parse(&raw).unwrap_or_else(|| {
                warn!("stored preferences are malformed, using defaults");
                Preferences::default()
            }),
            None => Preferences::default(),
        }
    }

    pub fn get(&self) -> Preferences {
        self.current.get()
    }

    pub fn update(&self, patch: &PreferencesPatch) -> Preferences {
        let mut updated = self.current.get();
        patch.apply_to(&mut updated);
        updated.normalize();

        match serde_json::to_string(&updated) {
            Ok(json) => {
                if let Err(e) = self.storage.set(SETTINGS_KEY, &json) {
                    warn!(error = %e, "failed to persist preferences");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize preferences"),
        }

        self.current.set(updated);
        self.broadcast(&updated);
        updated
    }

    pub fn reset(&self) -> Preferences {
        if let Err(e) = self.storage.remove(SETTINGS_KEY) {
            warn!(error = %e, "failed to clear stored preferences");
        }
        let defaults = Preferences::default();
        self.current.set(defaults);
        self.broadcast(&defaults);
        defaults
    }

    pub fn subscribe(&self, listener: impl Fn(&Preferences) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Returns false if the subscription was already released.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn broadcast(&self, prefs: &Preferences) {
        // Snapshot so listeners may subscribe or update re-entrantly.
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        debug!(subscribers = listeners.len(), "broadcasting preferences");
        for listener in listeners {
            listener(prefs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::kv::MemoryStore;

    fn make_store() -> (Rc<MemoryStore>, PreferenceStore) {
        let storage = Rc::new(MemoryStore::new());
        let store = PreferenceStore::new(storage.clone());
        (storage, store)
    }

    #[test]
    fn test_defaults_on_first_access() {
        let (_storage, store) = make_store();
        assert_eq!(store.get(), Preferences::default());
        assert!(store.get().highlight_errors);
        assert_eq!(store.get().font_size, FontSize::Large);
    }

    #[test]
    fn test_update_merges_and_persists() {
        let (storage, store) = make_store();
        store.update(&PreferencesPatch {
            show_stats: Some(false),
            ..Default::default()
        });
        let prefs = store.update(&PreferencesPatch {
            font_size: Some(FontSize::Xl),
            ..Default::default()
        });
        assert!(!prefs.show_stats);
        assert_eq!(prefs.font_size, FontSize::Xl);
        assert_eq!(prefs.practice_area_width, 85);

        let raw = storage.get(SETTINGS_KEY).unwrap();
        assert!(raw.contains(r#""fontSize":"xl""#));
        assert!(raw.contains(r#""showStats":false"#));

        let reloaded = PreferenceStore::new(storage);
        assert_eq!(reloaded.get(), prefs);
    }

    #[test]
    fn test_partial_record_merges_over_defaults() {
        let storage = Rc::new(MemoryStore::new());
        storage
            .set(SETTINGS_KEY, r#"{"theme":"dark","typingAreaHeight":150}"#)
            .unwrap();
        let store = PreferenceStore::new(storage);
        let prefs = store.get();
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.typing_area_height, 150);
        assert!(prefs.show_title);
        assert_eq!(prefs.typing_area_bottom, 40);
    }

    #[test]
    fn test_malformed_record_uses_defaults() {
        let storage = Rc::new(MemoryStore::new());
        storage.set(SETTINGS_KEY, "{not json").unwrap();
        let store = PreferenceStore::new(storage);
        assert_eq!(store.get(), Preferences::default());
    }

    #[test]
    fn test_bad_field_keeps_valid_siblings() {
        let storage = Rc::new(MemoryStore::new());
        storage
            .set(
                SETTINGS_KEY,
                r#"{"showStats":false,"practiceAreaWidth":"wide","fontSize":"huge","theme":"dark"}"#,
            )
            .unwrap();
        let prefs = PreferenceStore::new(storage).get();
        assert!(!prefs.show_stats);
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.practice_area_width, 85);
        assert_eq!(prefs.font_size, FontSize::Large);
    }

    #[test]
    fn test_non_object_record_uses_defaults() {
        let storage = Rc::new(MemoryStore::new());
        storage.set(SETTINGS_KEY, "[1,2,3]").unwrap();
        assert_eq!(PreferenceStore::new(storage).get(), Preferences::default());
    }

    #[test]
    fn test_update_clamps_layout_fields() {
        let (_storage, store) = make_store();
        let prefs = store.update(&PreferencesPatch {
            practice_area_width: Some(10),
            typing_area_bottom: Some(900),
            typing_area_height: Some(500),
            ..Default::default()
        });
        assert_eq!(prefs.practice_area_width, 50);
        assert_eq!(prefs.typing_area_bottom, 400);
        assert_eq!(prefs.typing_area_height, 200);
    }

    #[test]
    fn test_every_subscriber_gets_full_value() {
        let (_storage, store) = make_store();
        let seen_a = Rc::new(RefCell::new(Vec::new()));
        let seen_b = Rc::new(RefCell::new(Vec::new()));
        let a = seen_a.clone();
        let b = seen_b.clone();
        store.subscribe(move |p| a.borrow_mut().push(*p));
        store.subscribe(move |p| b.borrow_mut().push(*p));

        store.update(&PreferencesPatch {
            sound_enabled: Some(true),
            ..Default::default()
        });

        for seen in [&seen_a, &seen_b] {
            let seen = seen.borrow();
            assert_eq!(seen.len(), 1);
            assert!(seen[0].sound_enabled);
            assert!(seen[0].show_stats);
        }
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let (_storage, store) = make_store();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let id = store.subscribe(move |_| c.set(c.get() + 1));

        store.update(&PreferencesPatch::default());
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.update(&PreferencesPatch::default());

        assert_eq!(count.get(), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_reset_clears_storage_and_broadcasts_defaults() {
        let (storage, store) = make_store();
        store.update(&PreferencesPatch {
            theme: Some(Theme::Light),
            ..Default::default()
        });
        let last = Rc::new(Cell::new(None));
        let l = last.clone();
        store.subscribe(move |p| l.set(Some(*p)));

        let prefs = store.reset();
        assert_eq!(prefs, Preferences::default());
        assert_eq!(last.get(), Some(Preferences::default()));
        assert_eq!(storage.get(SETTINGS_KEY), None);
    }

    #[test]
    fn test_patch_deserializes_from_partial_json() {
        let patch: PreferencesPatch =
            serde_json::from_str(r#"{"highlightErrors":false,"fontSize":"small"}"#).unwrap();
        assert_eq!(patch.highlight_errors, Some(false));
        assert_eq!(patch.font_size, Some(FontSize::Small));
        assert_eq!(patch.theme, None);
    }
}
