use std::rc::Rc;

use tracing::warn;

use crate::store::kv::KeyValueStore;

pub const FAVORITES_KEY: &str = "narratype:favorites";

/// Persisted set of favorited text identifiers, kept in insertion order.
/// There is no change notification; callers re-query after toggling.
pub struct FavoriteSet {
    storage: Rc<dyn KeyValueStore>,
}

impl FavoriteSet {
    pub fn new(storage: Rc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn list(&self) -> Vec<String> {
        self.storage
            .get(FAVORITES_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn is_favorited(&self, id: &str) -> bool {
        self.list().iter().any(|f| f == id)
    }

    /// Flip membership of `id` and return whether it is now favorited.
    pub fn toggle(&self, id: &str) -> bool {
        let mut favorites = self.list();
        let now_favorited = match favorites.iter().position(|f| f == id) {
            Some(pos) => {
                favorites.remove(pos);
                false
            }
            None => {
                favorites.push(id.to_string());
                true
            }
        };

        match serde_json::to_string(&favorites) {
            Ok(json) => {
                if let Err(e) = self.storage.set(FAVORITES_KEY, &json) {
                    warn!(error = %e, "failed to persist favorites");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize favorites"),
        }
        now_favorited
    }
}
