pub mod favorites;
pub mod kv;
pub mod preferences;

pub use favorites::FavoriteSet;
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use preferences::{PreferenceStore, Preferences, PreferencesPatch};
