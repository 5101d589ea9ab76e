pub mod client;
pub mod worker;

pub use client::{CompletionRequest, HttpApi, PracticeApi};
pub use worker::{ApiEvent, ApiWorker};
