//! Call finalization through `/calls/end` and provider status callbacks

mod common;

use axum::http::StatusCode;
use beavy_calls::domain::call_log::{CallLog, CallLogRepository, CallOutcome};
use beavy_calls::domain::shared::CallSid;
use common::{FailingCallLogs, StubProvider, TestApp};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Open a browser-call log through the token endpoint and return its room
async fn open_room_call(app: &TestApp, user_id: Uuid, room_name: &str) -> String {
    let auth = app.bearer(user_id);
    let (status, body) = app
        .post_json(
            "/livekit/token",
            Some(&auth),
            json!({ "roomName": room_name, "leadId": Uuid::new_v4() }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roomName"], room_name);
    assert!(!body["token"].as_str().unwrap().is_empty());
    body["callLogId"].as_str().unwrap().to_string()
}

async fn summary_of(app: &TestApp, user_id: Uuid) -> Option<String> {
    let auth = app.bearer(user_id);
    let (_, body) = app.get("/call-logs", Some(&auth)).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    json["call_logs"][0]["summary"].as_str().map(str::to_string)
}

#[tokio::test]
async fn test_end_call_by_room_name_sets_outcome() {
    let app = TestApp::new(StubProvider::accepting("CA1"));
    let user_id = Uuid::new_v4();
    let call_log_id = open_room_call(&app, user_id, "room-42").await;

    let (status, body) = app
        .post_json(
            "/calls/end",
            None,
            json!({
                "room_name": "room-42",
                "duration_seconds": 95,
                "outcome": "interested",
                "summary": "Kunde möchte ein Angebot",
                "transcript": "Agent: Hallo ..."
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["call_log_id"], call_log_id);
    assert!(body.get("already_applied").is_none());

    let auth = app.bearer(user_id);
    let (_, list) = app.get("/call-logs", Some(&auth)).await;
    let list: serde_json::Value = serde_json::from_str(&list).unwrap();
    assert_eq!(list["total"], 1);
    let log = &list["call_logs"][0];
    assert_eq!(log["outcome"], "interested");
    assert_eq!(log["duration_seconds"], 95);
    assert_eq!(log["room_name"], "room-42");
    assert!(log["ended_at"].is_string());
}

#[tokio::test]
async fn test_repeated_end_without_key_appends_summary_twice() {
    let app = TestApp::new(StubProvider::accepting("CA1"));
    let user_id = Uuid::new_v4();
    let call_log_id = open_room_call(&app, user_id, "room-7").await;

    for _ in 0..2 {
        let (status, _) = app
            .post_json(
                "/calls/end",
                None,
                json!({ "call_log_id": call_log_id, "summary": "Rückruf vereinbart" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(
        summary_of(&app, user_id).await.as_deref(),
        Some("Rückruf vereinbart\n\nRückruf vereinbart")
    );
}

#[tokio::test]
async fn test_repeated_end_with_key_is_applied_once() {
    let app = TestApp::new(StubProvider::accepting("CA1"));
    let user_id = Uuid::new_v4();
    let call_log_id = open_room_call(&app, user_id, "room-8").await;
    let request = json!({
        "call_log_id": call_log_id,
        "summary": "Termin am Dienstag",
        "idempotency_key": "agent-end-8"
    });

    let (_, first) = app.post_json("/calls/end", None, request.clone()).await;
    let (status, second) = app.post_json("/calls/end", None, request).await;

    assert!(first.get("already_applied").is_none());
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["success"], true);
    assert_eq!(second["already_applied"], true);
    assert_eq!(
        summary_of(&app, user_id).await.as_deref(),
        Some("Termin am Dienstag")
    );
}

#[tokio::test]
async fn test_unresolved_call_log_reports_failure() {
    let app = TestApp::new(StubProvider::accepting("CA1"));

    let (status, body) = app
        .post_json(
            "/calls/end",
            None,
            json!({ "room_name": "no-such-room", "summary": "x" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Call log not found");
}

#[tokio::test]
async fn test_store_failure_surfaces_underlying_message() {
    let app = TestApp::with_call_logs(StubProvider::accepting("CA1"), |store| {
        Arc::new(FailingCallLogs::new(store, "deadlock detected"))
    });
    let user_id = Uuid::new_v4();
    let log = CallLog::new(user_id, Uuid::new_v4(), None);
    CallLogRepository::create(&app.store, &log).await.unwrap();

    let (status, body) = app
        .post_json(
            "/calls/end",
            None,
            json!({ "call_log_id": log.id, "summary": "x" }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("deadlock detected"));

    let auth = app.bearer(user_id);
    let (status, body) = app.get("/call-logs", Some(&auth)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"], "deadlock detected");
}

#[tokio::test]
async fn test_invalid_outcome_is_rejected() {
    let app = TestApp::new(StubProvider::accepting("CA1"));
    let call_log_id = open_room_call(&app, Uuid::new_v4(), "room-9").await;

    let (status, body) = app
        .post_json(
            "/calls/end",
            None,
            json!({ "call_log_id": call_log_id, "outcome": "maybe_later" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("maybe_later"));
}

#[tokio::test]
async fn test_legacy_log_resolved_by_summary_fragment() {
    let app = TestApp::new(StubProvider::accepting("CA1"));
    let mut legacy = CallLog::new(Uuid::new_v4(), Uuid::new_v4(), None);
    legacy.summary = Some("Browser call in room legacy-room-3".to_string());
    app.store.create(&legacy).await.unwrap();

    let (_, body) = app
        .post_json(
            "/calls/end",
            None,
            json!({ "room_name": "LEGACY-ROOM-3", "outcome": "qualified" }),
        )
        .await;

    assert_eq!(body["success"], true);
    assert_eq!(body["call_log_id"], legacy.id.to_string());
}

#[tokio::test]
async fn test_status_callback_finalizes_outbound_call() {
    let app = TestApp::new(StubProvider::accepting("CA555"));
    let auth = app.bearer(Uuid::new_v4());
    app.post_json(
        "/calls/start",
        Some(&auth),
        json!({ "to": "+4930123456", "leadId": Uuid::new_v4() }),
    )
    .await;

    let (status, body) = app
        .post_form(
            "/twilio/status",
            &[
                ("CallSid", "CA555"),
                ("CallStatus", "completed"),
                ("CallDuration", "61"),
            ],
        )
        .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    let log = app
        .store
        .find_by_call_sid(&CallSid::new("CA555"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.outcome, Some(CallOutcome::Answered));
    assert_eq!(log.duration_seconds, Some(61));
    assert!(log.ended_at.is_some());
}

#[tokio::test]
async fn test_client_key_replayed_after_status_callback_is_applied_once() {
    let app = TestApp::new(StubProvider::accepting("CA556"));
    let auth = app.bearer(Uuid::new_v4());
    let (_, started) = app
        .post_json(
            "/calls/start",
            Some(&auth),
            json!({ "to": "+4930123456", "leadId": Uuid::new_v4() }),
        )
        .await;
    let call_log_id = started["callLogId"].as_str().unwrap().to_string();
    let request = json!({
        "call_log_id": call_log_id,
        "summary": "Angebot verschickt",
        "idempotency_key": "agent-end-556"
    });

    let (_, first) = app.post_json("/calls/end", None, request.clone()).await;
    assert!(first.get("already_applied").is_none());

    let (status, _) = app
        .post_form(
            "/twilio/status",
            &[
                ("CallSid", "CA556"),
                ("CallStatus", "completed"),
                ("CallDuration", "40"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, replay) = app.post_json("/calls/end", None, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["already_applied"], true);

    let log = app
        .store
        .find_by_call_sid(&CallSid::new("CA556"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.summary.as_deref(), Some("Angebot verschickt"));
    assert_eq!(log.duration_seconds, Some(40));
}

#[tokio::test]
async fn test_status_callback_for_unknown_call_is_acknowledged() {
    let app = TestApp::new(StubProvider::accepting("CA1"));

    let (status, _) = app
        .post_form(
            "/twilio/status",
            &[("CallSid", "CAunknown"), ("CallStatus", "completed")],
        )
        .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_call_logs_are_scoped_to_user() {
    let app = TestApp::new(StubProvider::accepting("CA1"));
    let owner = Uuid::new_v4();
    open_room_call(&app, owner, "room-a").await;
    open_room_call(&app, owner, "room-b").await;

    let (_, body) = app
        .get("/call-logs?limit=1", Some(&app.bearer(owner)))
        .await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["limit"], 1);
    assert_eq!(json["call_logs"].as_array().unwrap().len(), 1);

    let (_, body) = app
        .get("/call-logs", Some(&app.bearer(Uuid::new_v4())))
        .await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn test_room_token_requires_room_name() {
    let app = TestApp::new(StubProvider::accepting("CA1"));
    let auth = app.bearer(Uuid::new_v4());

    let (status, body) = app
        .post_json("/livekit/token", Some(&auth), json!({}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "roomName is required");
}
