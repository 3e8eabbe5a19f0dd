use capture::{CaptureSignal, RawEvent, SessionContext};
use gesturectl::{replay, HubClient, ReplayOptions, StartSession, WindowReport};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn start_request() -> StartSession {
    StartSession {
        study_id: "s1".into(),
        study_version: "v1".into(),
        schema_version: 1,
        consent_version: "c1".into(),
        capabilities: None,
        metadata: None,
    }
}

#[tokio::test]
async fn start_session_builds_handle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/start_session"))
        .and(body_partial_json(json!({"study_id": "s1", "study_version": "v1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "session_id": "sess-1",
            "study_id": "s1",
            "study_version": "v1",
            "schema_version": 1,
            "consent_version": "c1",
            "config": {"target_hz": 100, "min_hz": 60, "trials": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HubClient::new(&format!("{}/", server.uri()));
    let handle = client.start_session(&start_request()).await.unwrap();

    assert_eq!(handle.session_id, "sess-1");
    assert_eq!(handle.study.study_id, "s1");
    assert_eq!(handle.target_hz, 100);
    assert_eq!(handle.min_hz, 60);
}

#[tokio::test]
async fn server_errors_carry_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/end_session"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"ok": false, "error": "Session not found"})),
        )
        .mount(&server)
        .await;

    let client = HubClient::new(&server.uri());
    let err = client.end_session("missing").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("404"), "{}", message);
    assert!(message.contains("Session not found"), "{}", message);
}

#[tokio::test]
async fn replay_submits_windows_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit_trial"))
        .respond_with(|req: &Request| {
            let trial: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
            ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "trial_id": trial["trial_id"],
                "session_id": trial["session_id"],
                "sample_count": trial["diagnostics"]["sample_count"],
                "duration_ms": trial["diagnostics"]["duration_ms"],
                "effective_hz": trial["diagnostics"]["effective_hz"],
            }))
        })
        .expect(1)
        .mount(&server)
        .await;

    let mut signals = vec![CaptureSignal::Start { t_ms: Some(1000.0) }];
    for i in 0..20 {
        signals.push(CaptureSignal::Event(RawEvent::motion_xyz(
            1000.0 + i as f64 * 100.0,
            0.0,
            0.0,
            9.8,
        )));
    }
    signals.push(CaptureSignal::Stop { t_ms: Some(3000.0) });
    // empty window, skipped by default
    signals.push(CaptureSignal::Start { t_ms: Some(4000.0) });
    signals.push(CaptureSignal::Stop { t_ms: Some(5000.0) });

    let windows = replay::capture_windows(signals).await.unwrap();
    assert_eq!(windows.len(), 2);

    let handle = capture::SessionHandle {
        session_id: "sess-1".into(),
        study: capture::StudyInfo::new("s1", "v1", 1),
        consent_version: "c1".into(),
        target_hz: 100,
        min_hz: 60,
    };
    let mut ctx = SessionContext::new(handle);
    let client = HubClient::new(&server.uri());

    let reports = replay::submit_windows(&client, &mut ctx, windows, &ReplayOptions::default())
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    match &reports[0] {
        WindowReport::Submitted { window, receipt } => {
            assert_eq!(*window, 0);
            assert_eq!(receipt.session_id, "sess-1");
            assert_eq!(receipt.sample_count, 20);
            assert_eq!(receipt.effective_hz, 10.0);
        }
        other => panic!("expected submission, got {:?}", other),
    }
    assert!(matches!(reports[1], WindowReport::Skipped { window: 1, .. }));
    assert_eq!(ctx.next_trial_index(), 1);
}

#[tokio::test]
async fn submit_empty_sends_no_data_windows() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit_trial"))
        .and(body_partial_json(json!({"samples": [], "trial_index": 3})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "trial_id": "t",
            "session_id": "sess-1",
            "sample_count": 0,
            "duration_ms": 50.0,
            "effective_hz": 0.0,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let windows = replay::capture_windows(vec![
        CaptureSignal::Start { t_ms: Some(0.0) },
        CaptureSignal::Stop { t_ms: Some(50.0) },
    ])
    .await
    .unwrap();

    let handle = capture::SessionHandle {
        session_id: "sess-1".into(),
        study: capture::StudyInfo::new("s1", "v1", 1),
        consent_version: "c1".into(),
        target_hz: 100,
        min_hz: 60,
    };
    let mut ctx = SessionContext::starting_at(handle, 3);
    let options = ReplayOptions {
        stimulus_id: None,
        submit_empty: true,
    };

    let reports = replay::submit_windows(&HubClient::new(&server.uri()), &mut ctx, windows, &options)
        .await
        .unwrap();
    assert!(matches!(reports[0], WindowReport::Submitted { .. }));
}
