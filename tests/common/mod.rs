//! Shared harness for router-level tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use beavy_calls::config::Config;
use beavy_calls::domain::call_log::{CallFinalization, CallLog, CallLogRepository, FinalizeOutcome};
use beavy_calls::domain::api_auth::ApiAuthManager;
use beavy_calls::domain::shared::{CallLogId, CallSid, DomainError, FixedClock, Result};
use beavy_calls::domain::telephony::{OriginatedCall, OutboundCallRequest, TelephonyProvider};
use beavy_calls::infrastructure::persistence::InMemoryStore;
use beavy_calls::interface::api::{build_router, AppState, Stores};
use chrono::{DateTime, TimeZone, Utc};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

/// Provider double recording every request
pub struct StubProvider {
    response: std::result::Result<OriginatedCall, DomainError>,
    pub requests: Mutex<Vec<OutboundCallRequest>>,
}

impl StubProvider {
    pub fn accepting(sid: &str) -> Self {
        Self {
            response: Ok(OriginatedCall {
                sid: CallSid::new(sid),
                status: "queued".to_string(),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            response: Err(DomainError::Upstream(message.to_string())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TelephonyProvider for StubProvider {
    async fn originate_call(&self, request: &OutboundCallRequest) -> Result<OriginatedCall> {
        self.requests.lock().unwrap().push(request.clone());
        self.response.clone()
    }
}

/// Call-log store whose writes and listings fail with a database error
pub struct FailingCallLogs {
    inner: InMemoryStore,
    message: String,
}

impl FailingCallLogs {
    pub fn new(inner: InMemoryStore, message: &str) -> Self {
        Self {
            inner,
            message: message.to_string(),
        }
    }

    fn error(&self) -> DomainError {
        DomainError::Database(self.message.clone())
    }
}

#[async_trait]
impl CallLogRepository for FailingCallLogs {
    async fn create(&self, log: &CallLog) -> Result<()> {
        CallLogRepository::create(&self.inner, log).await
    }

    async fn find_by_id(&self, id: CallLogId) -> Result<Option<CallLog>> {
        CallLogRepository::find_by_id(&self.inner, id).await
    }

    async fn find_by_room_name(&self, room_name: &str) -> Result<Option<CallLog>> {
        self.inner.find_by_room_name(room_name).await
    }

    async fn find_latest_by_summary_fragment(&self, fragment: &str) -> Result<Option<CallLog>> {
        self.inner.find_latest_by_summary_fragment(fragment).await
    }

    async fn find_by_call_sid(&self, sid: &CallSid) -> Result<Option<CallLog>> {
        self.inner.find_by_call_sid(sid).await
    }

    async fn finalize(
        &self,
        _id: CallLogId,
        _facts: &CallFinalization,
        _ended_at: DateTime<Utc>,
    ) -> Result<FinalizeOutcome> {
        Err(self.error())
    }

    async fn list_for_user(&self, _user_id: Uuid, _limit: i64, _offset: i64) -> Result<Vec<CallLog>> {
        Err(self.error())
    }

    async fn count_for_user(&self, _user_id: Uuid) -> Result<i64> {
        Err(self.error())
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.webhooks.public_base_url = "https://calls.example.com".to_string();
    config.webhooks.media_stream_url = "wss://media.example.com/stream".to_string();
    config.webhooks.ai_voice_url = "https://ai.example.com/voice".to_string();
    config.auth.jwt_secret = JWT_SECRET.to_string();
    config.telephony.auth_token = "twilio-token".to_string();
    config.livekit.url = "wss://livekit.example.com".to_string();
    config.livekit.api_key = "APIkey".to_string();
    config.livekit.api_secret = "livekit-secret".to_string();
    config
}

pub struct TestApp {
    pub router: Router,
    pub store: InMemoryStore,
    pub provider: Arc<StubProvider>,
    pub clock: Arc<FixedClock>,
}

impl TestApp {
    pub fn new(provider: StubProvider) -> Self {
        Self::with_config(test_config(), provider)
    }

    pub fn with_config(config: Config, provider: StubProvider) -> Self {
        Self::build(config, provider, |store| Arc::new(store))
    }

    /// Route call-log access through a wrapper around the shared store
    pub fn with_call_logs(
        provider: StubProvider,
        call_logs: impl FnOnce(InMemoryStore) -> Arc<dyn CallLogRepository>,
    ) -> Self {
        Self::build(test_config(), provider, call_logs)
    }

    fn build(
        config: Config,
        provider: StubProvider,
        call_logs: impl FnOnce(InMemoryStore) -> Arc<dyn CallLogRepository>,
    ) -> Self {
        let store = InMemoryStore::new();
        let mut stores = Stores::in_memory(store.clone());
        stores.call_logs = call_logs(store.clone());
        let provider = Arc::new(provider);
        // Monday 10:00 UTC
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap(),
        ));

        let state = AppState::new(
            &config,
            stores,
            provider.clone(),
            clock.clone(),
        );
        let prometheus_handle = PrometheusBuilder::new().build_recorder().handle();

        Self {
            router: build_router(state, prometheus_handle),
            store,
            provider,
            clock,
        }
    }

    pub fn bearer(&self, user_id: Uuid) -> String {
        let token = ApiAuthManager::new(JWT_SECRET)
            .generate_token(user_id, Some("agent@example.com".to_string()))
            .unwrap();
        format!("Bearer {}", token)
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    pub async fn post_json(
        &self,
        uri: &str,
        auth: Option<&str>,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }

        let (status, body) = self
            .send(builder.body(Body::from(body.to_string())).unwrap())
            .await;
        let json = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> (StatusCode, String) {
        self.post_form_with_headers(uri, fields, &[]).await
    }

    pub async fn post_form_with_headers(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> (StatusCode, String) {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, form_encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    pub async fn get(&self, uri: &str, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }
}

/// Minimal x-www-form-urlencoded encoding for test values
pub fn form_encode(value: &str) -> String {
    let mut encoded = String::new();
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push('+'),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
