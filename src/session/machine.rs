use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::api::client::CompletionRequest;
use crate::error::Result;
use crate::session::diff::{self, EditContext, EditKind};
use crate::session::metrics::Metrics;
use crate::session::result::SessionSummary;
use crate::store::preferences::PreferenceStore;
use crate::text::TargetText;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Active,
    Complete,
}

/// Identifies one session instance. Server responses carry the token of the
/// session that requested them so late answers can be told apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionToken(u64);

/// Server work the host must perform on the engine's behalf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEffect {
    CreateSession {
        token: SessionToken,
        text_id: i64,
    },
    CompleteSession {
        token: SessionToken,
        session_id: i64,
        payload: CompletionRequest,
    },
}

/// Render classification for one character of the target text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharState {
    Typed,
    Cursor,
    Pending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditOutcome {
    pub kind: EditKind,
    pub accepted: bool,
    /// The value the input widget should display now.
    pub input: String,
    pub completed: bool,
}

pub struct Session {
    text: TargetText,
    target: Vec<char>,
    input: String,
    cursor: usize,
    error_count: usize,
    metrics: Metrics,
    state: SessionState,
    started_at: Instant,
    session_id: Option<i64>,
    token: SessionToken,
    completion_fired: bool,
    summary: Option<SessionSummary>,
}

impl Session {
    fn new(text: TargetText, token: SessionToken, now: Instant) -> Self {
        let target: Vec<char> = text.content.chars().collect();
        let mut session = Self {
            text,
            target,
            input: String::new(),
            cursor: 0,
            error_count: 0,
            metrics: Metrics::default(),
            state: SessionState::NotStarted,
            started_at: now,
            session_id: None,
            token,
            completion_fired: false,
            summary: None,
        };
        // Nothing to type: finished on arrival, and there is nothing to report.
        if session.target.is_empty() {
            session.state = SessionState::Complete;
            session.completion_fired = true;
            session.summary = Some(SessionSummary::new(
                session.text.server_id(),
                None,
                session.metrics,
                0,
                0,
                0.0,
            ));
        }
        session
    }

    pub fn text(&self) -> &TargetText {
        &self.text
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    pub fn session_id(&self) -> Option<i64> {
        self.session_id
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.target.len() - self.cursor
    }

    pub fn progress(&self) -> f64 {
        if self.target.is_empty() {
            return 1.0;
        }
        self.cursor as f64 / self.target.len() as f64
    }

    pub fn char_states(&self) -> impl Iterator<Item = (char, CharState)> + '_ {
        self.target.iter().enumerate().map(move |(idx, &ch)| {
            let state = if idx < self.cursor {
                CharState::Typed
            } else if idx == self.cursor {
                CharState::Cursor
            } else {
                CharState::Pending
            };
            (ch, state)
        })
    }

    fn apply(
        &mut self,
        raw: &str,
        highlight_errors: bool,
        now: Instant,
    ) -> (EditOutcome, Option<SessionEffect>) {
        if self.is_complete() {
            return (
                EditOutcome {
                    kind: EditKind::NoOp,
                    accepted: false,
                    input: self.input.clone(),
                    completed: true,
                },
                None,
            );
        }
        self.state = SessionState::Active;

        let result = diff::apply_edit(
            &EditContext {
                target: &self.target,
                accepted_input: &self.input,
                cursor: self.cursor,
                highlight_errors,
            },
            raw,
        );
        let accepted = result.accepted();
        self.cursor = result.cursor;
        self.error_count += result.errors_added;
        self.input = result.input;
        debug_assert!(self.cursor <= self.target.len());

        // Rejected edits leave metrics as they were until the next accepted one.
        let mut effect = None;
        if accepted {
            self.metrics = Metrics::compute(
                self.cursor,
                self.error_count,
                now.saturating_duration_since(self.started_at),
            );
            if result.kind == EditKind::AppendMatch && self.cursor == self.target.len() {
                effect = self.complete(now);
            }
        }

        (
            EditOutcome {
                kind: result.kind,
                accepted,
                input: self.input.clone(),
                completed: self.is_complete(),
            },
            effect,
        )
    }

    fn complete(&mut self, now: Instant) -> Option<SessionEffect> {
        if self.completion_fired {
            return None;
        }
        self.completion_fired = true;
        self.state = SessionState::Complete;

        let elapsed = now.saturating_duration_since(self.started_at).as_secs_f64();
        let summary = SessionSummary::new(
            self.text.server_id(),
            self.session_id,
            self.metrics,
            self.cursor,
            self.error_count,
            elapsed,
        );
        info!(
            wpm = summary.wpm,
            accuracy = summary.accuracy,
            errors = summary.errors,
            "session complete"
        );

        let effect = match self.session_id {
            Some(session_id) => Some(SessionEffect::CompleteSession {
                token: self.token,
                session_id,
                payload: summary.to_request(),
            }),
            None => {
                if !self.text.is_ephemeral() {
                    warn!("no server session id yet, skipping completion call");
                }
                None
            }
        };
        self.summary = Some(summary);
        effect
    }
}

/// Owns the current session and everything that outlives a single one:
/// the token counter, the shared preferences, and queued server effects.
pub struct SessionEngine {
    preferences: Rc<PreferenceStore>,
    session: Session,
    next_token: u64,
    effects: Vec<SessionEffect>,
}

impl SessionEngine {
    pub fn start(text: TargetText, preferences: Rc<PreferenceStore>) -> Self {
        Self::start_at(text, preferences, Instant::now())
    }

    pub fn start_at(text: TargetText, preferences: Rc<PreferenceStore>, now: Instant) -> Self {
        let mut engine = Self {
            preferences,
            session: Session::new(text, SessionToken(0), now),
            next_token: 1,
            effects: Vec::new(),
        };
        engine.request_server_session();
        engine
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn preferences(&self) -> &Rc<PreferenceStore> {
        &self.preferences
    }

    pub fn handle_edit(&mut self, raw: &str) -> EditOutcome {
        self.handle_edit_at(raw, Instant::now())
    }

    pub fn handle_edit_at(&mut self, raw: &str, now: Instant) -> EditOutcome {
        // Read fresh on every edit; the setting may change mid-session.
        let highlight_errors = self.preferences.get().highlight_errors;
        let (outcome, effect) = self.session.apply(raw, highlight_errors, now);
        if let Some(effect) = effect {
            self.effects.push(effect);
        }
        outcome
    }

    /// Discard the current session and begin a fresh one on the same text.
    pub fn restart(&mut self) {
        self.restart_at(Instant::now());
    }

    pub fn restart_at(&mut self, now: Instant) {
        let token = SessionToken(self.next_token);
        self.next_token += 1;
        let text = self.session.text.clone();
        self.session = Session::new(text, token, now);
        // Effects queued for the discarded session must not reach the server.
        let current = self.session.token;
        self.effects.retain(|effect| match effect {
            SessionEffect::CreateSession { token, .. } => *token == current,
            SessionEffect::CompleteSession { .. } => true,
        });
        self.request_server_session();
    }

    /// Deliver the answer to a `CreateSession` effect. Returns whether the id
    /// was attached; answers for a discarded session are dropped.
    pub fn on_session_created(&mut self, token: SessionToken, result: Result<i64>) -> bool {
        if token != self.session.token {
            debug!(?token, "dropping session id for a discarded session");
            return false;
        }
        match result {
            Ok(id) => {
                self.session.session_id = Some(id);
                // Completion already happened without an id; keep the record
                // consistent but do not send it late.
                if let Some(summary) = self.session.summary.as_mut() {
                    summary.session_id = Some(id);
                }
                info!(session_id = id, "server session attached");
                true
            }
            Err(e) => {
                warn!(error = %e, "session creation failed, continuing locally");
                false
            }
        }
    }

    pub fn take_effects(&mut self) -> Vec<SessionEffect> {
        std::mem::take(&mut self.effects)
    }

    fn request_server_session(&mut self) {
        info!(title = %self.session.text.title, chars = self.session.len(), "session started");
        if self.session.is_complete() {
            return;
        }
        if let Some(text_id) = self.session.text.server_id() {
            self.effects.push(SessionEffect::CreateSession {
                token: self.session.token,
                text_id,
            });
        }
    }
}
