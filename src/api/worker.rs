use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::api::client::PracticeApi;
use crate::error::Result;
use crate::session::machine::{SessionEffect, SessionToken};

/// A server answer, delivered to the host's event loop after the fact.
#[derive(Debug)]
pub enum ApiEvent {
    SessionCreated {
        token: SessionToken,
        result: Result<i64>,
    },
    SessionCompleted {
        token: SessionToken,
        result: Result<()>,
    },
}

/// Performs session effects on a background thread so the typing path never
/// waits on the network. Requests are handled in submission order.
pub struct ApiWorker {
    tx: Option<mpsc::Sender<SessionEffect>>,
    handle: Option<JoinHandle<()>>,
}

impl ApiWorker {
    pub fn spawn<E>(api: Box<dyn PracticeApi + Send>, events: mpsc::Sender<E>) -> Self
    where
        E: From<ApiEvent> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<SessionEffect>();

        let handle = thread::spawn(move || {
            for effect in rx {
                let event = perform(api.as_ref(), effect);
                if events.send(E::from(event)).is_err() {
                    return;
                }
            }
        });

        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    /// Queue an effect. Returns false once the worker has shut down.
    pub fn submit(&self, effect: SessionEffect) -> bool {
        match &self.tx {
            Some(tx) => tx.send(effect).is_ok(),
            None => false,
        }
    }

    pub fn submit_all(&self, effects: Vec<SessionEffect>) {
        for effect in effects {
            if !self.submit(effect) {
                warn!("api worker is gone, dropping remaining effects");
                return;
            }
        }
    }
}

impl Drop for ApiWorker {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain and exit.
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn perform(api: &dyn PracticeApi, effect: SessionEffect) -> ApiEvent {
    match effect {
        SessionEffect::CreateSession { token, text_id } => {
            debug!(text_id, "creating server session");
            ApiEvent::SessionCreated {
                token,
                result: api.create_session(text_id),
            }
        }
        SessionEffect::CompleteSession {
            token,
            session_id,
            payload,
        } => {
            debug!(session_id, "completing server session");
            let result = api.complete_session(session_id, &payload);
            if let Err(e) = &result {
                warn!(session_id, error = %e, "session completion not recorded");
            }
            ApiEvent::SessionCompleted { token, result }
        }
    }
}
