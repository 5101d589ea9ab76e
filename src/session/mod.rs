pub mod diff;
pub mod machine;
pub mod metrics;
pub mod result;

pub use diff::{EditKind, apply_edit};
pub use machine::{
    CharState, EditOutcome, Session, SessionEffect, SessionEngine, SessionState, SessionToken,
};
pub use metrics::Metrics;
pub use result::SessionSummary;
