//! Test doubles for the application ports.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tollgate_domain::{ApiRequest, ApiResponse, SessionData, SessionId, TransportOptions};

use crate::ports::{
    Clock, HttpTransport, SessionError, SessionStore, TransportError, TransportFactory,
};

/// Session store backed by a map.
#[derive(Default)]
pub struct StubStore {
    sessions: Mutex<HashMap<SessionId, SessionData>>,
    saves: AtomicUsize,
    fail_loads: AtomicBool,
}

impl StubStore {
    pub fn get(&self, id: &SessionId) -> Option<SessionData> {
        self.sessions.lock().get(id).cloned()
    }

    pub fn put(&self, id: &SessionId, data: SessionData) {
        self.sessions.lock().insert(id.clone(), data);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn fail_loads(&self) {
        self.fail_loads.store(true, Ordering::SeqCst);
    }
}

impl SessionStore for StubStore {
    fn load(&self, id: &SessionId) -> Result<Option<SessionData>, SessionError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(SessionError::Serialization("corrupt".to_string()));
        }
        Ok(self.get(id))
    }

    fn save(&self, id: &SessionId, data: &SessionData) -> Result<(), SessionError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.put(id, data.clone());
        Ok(())
    }

    fn delete(&self, id: &SessionId) -> Result<(), SessionError> {
        self.sessions.lock().remove(id);
        Ok(())
    }
}

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync;

/// Transport answering through a closure and recording every request.
pub struct StubTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<ApiRequest>>,
    delay: Option<Duration>,
}

impl StubTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleeps before answering, to let concurrent requests overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// Requests whose path ends with `suffix`.
    pub fn requests_to(&self, suffix: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.path().ends_with(suffix))
            .collect()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(&request)
    }
}

/// Factory handing out one shared transport and recording the options.
pub struct StubFactory {
    transport: Arc<StubTransport>,
    options: Mutex<Vec<TransportOptions>>,
}

impl StubFactory {
    pub fn new(transport: Arc<StubTransport>) -> Self {
        Self {
            transport,
            options: Mutex::new(Vec::new()),
        }
    }

    pub fn built_with(&self) -> Vec<TransportOptions> {
        self.options.lock().clone()
    }
}

impl TransportFactory for StubFactory {
    fn build(&self, options: &TransportOptions) -> Result<Arc<dyn HttpTransport>, TransportError> {
        self.options.lock().push(options.clone());
        Ok(self.transport.clone())
    }
}

/// Clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn at(secs: i64) -> Self {
        Self(Mutex::new(DateTime::from_timestamp(secs, 0).unwrap()))
    }

    pub fn advance(&self, secs: i64) {
        *self.0.lock() += chrono::Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

/// JSON token endpoint answer.
pub fn token_json(access: &str, refresh: Option<&str>, expires_in: i64) -> ApiResponse {
    let mut body = serde_json::json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": expires_in,
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = serde_json::Value::from(refresh);
    }
    ApiResponse::new(200, serde_json::to_vec(&body).unwrap())
}

/// Decodes a form-urlencoded request body into pairs.
pub fn form_of(request: &ApiRequest) -> HashMap<String, String> {
    serde_urlencoded::from_bytes(request.body.as_deref().unwrap_or_default()).unwrap()
}
