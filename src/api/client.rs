use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::text::TargetText;

/// Body of `POST /sessions/{id}/complete`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub wpm: u32,
    pub accuracy: i32,
    pub characters_typed: usize,
    pub errors: usize,
}

#[derive(Serialize)]
struct CreateSessionRequest {
    text_id: i64,
}

#[derive(Deserialize)]
struct CreateSessionResponse {
    id: i64,
}

/// The server-side collaborator. Calls are blocking; the session engine never
/// makes them on the typing path (see `api::worker`).
pub trait PracticeApi {
    fn fetch_text(&self, id: i64) -> Result<TargetText>;
    fn create_session(&self, text_id: i64) -> Result<i64>;
    fn complete_session(&self, session_id: i64, payload: &CompletionRequest) -> Result<()>;
}

pub struct HttpApi {
    base_url: String,
    #[cfg(feature = "network")]
    client: reqwest::blocking::Client,
}

#[cfg(feature = "network")]
impl HttpApi {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(Error::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            })
        }
    }
}

#[cfg(feature = "network")]
impl PracticeApi for HttpApi {
    fn fetch_text(&self, id: i64) -> Result<TargetText> {
        let response = self.client.get(self.url(&format!("/texts/{id}/content"))).send()?;
        let text = Self::check(response)?
            .json::<TargetText>()
            .map_err(|e| Error::Decode(e.to_string()))?;
        Ok(text)
    }

    fn create_session(&self, text_id: i64) -> Result<i64> {
        let response = self
            .client
            .post(self.url("/sessions"))
            .json(&CreateSessionRequest { text_id })
            .send()?;
        let created = Self::check(response)?
            .json::<CreateSessionResponse>()
            .map_err(|e| Error::Decode(e.to_string()))?;
        Ok(created.id)
    }

    fn complete_session(&self, session_id: i64, payload: &CompletionRequest) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/sessions/{session_id}/complete")))
            .json(payload)
            .send()?;
        Self::check(response)?;
        Ok(())
    }
}

#[cfg(not(feature = "network"))]
impl HttpApi {
    pub fn new(base_url: &str, _timeout: std::time::Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[cfg(not(feature = "network"))]
impl PracticeApi for HttpApi {
    fn fetch_text(&self, _id: i64) -> Result<TargetText> {
        Err(Error::NetworkDisabled)
    }

    fn create_session(&self, _text_id: i64) -> Result<i64> {
        Err(Error::NetworkDisabled)
    }

    fn complete_session(&self, _session_id: i64, _payload: &CompletionRequest) -> Result<()> {
        Err(Error::NetworkDisabled)
    }
}

impl HttpApi {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Stand-in used when the host runs offline; every call fails fast.
pub struct OfflineApi;

impl PracticeApi for OfflineApi {
    fn fetch_text(&self, _id: i64) -> Result<TargetText> {
        Err(Error::NetworkDisabled)
    }

    fn create_session(&self, _text_id: i64) -> Result<i64> {
        Err(Error::NetworkDisabled)
    }

    fn complete_session(&self, _session_id: i64, _payload: &CompletionRequest) -> Result<()> {
        Err(Error::NetworkDisabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_wire_format() {
        let payload = CompletionRequest {
            wpm: 42,
            accuracy: 97,
            characters_typed: 120,
            errors: 3,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["wpm"], 42);
        assert_eq!(json["accuracy"], 97);
        assert_eq!(json["characters_typed"], 120);
        assert_eq!(json["errors"], 3);
    }

    #[test]
    fn test_create_session_wire_format() {
        let json = serde_json::to_string(&CreateSessionRequest { text_id: 5 }).unwrap();
        assert_eq!(json, r#"{"text_id":5}"#);
        let created: CreateSessionResponse =
            serde_json::from_str(r#"{"id":11,"started_at":"2024-01-01T00:00:00"}"#).unwrap();
        assert_eq!(created.id, 11);
    }

    #[test]
    fn test_http_api_trims_trailing_slash() {
        let api = HttpApi::new("http://localhost:8000/api/", std::time::Duration::from_secs(1))
            .unwrap();
        assert_eq!(api.base_url(), "http://localhost:8000/api");
    }

    #[test]
    fn test_offline_api_fails_fast() {
        assert!(OfflineApi.create_session(1).is_err());
        assert!(OfflineApi.fetch_text(1).is_err());
    }
}
