//! Typing practice engine: validates keystrokes against a target text,
//! tracks progress and errors, derives live speed and accuracy, and drives
//! the session lifecycle. Rendering and routing belong to the host.

pub mod api;
pub mod config;
pub mod error;
pub mod layout;
pub mod session;
pub mod store;
pub mod text;

pub use error::{Error, Result};
