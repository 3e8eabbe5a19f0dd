use capture::{
    CaptureStatus, Channel, ManualClock, RawEvent, SampleBuffer, SessionContext, SessionHandle,
    StudyInfo, Survey,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn handle() -> SessionHandle {
    SessionHandle {
        session_id: "sess-9".into(),
        study: StudyInfo::new("gesture", "v3", 1),
        consent_version: "c1".into(),
        target_hz: 100,
        min_hz: 60,
    }
}

#[test]
fn phone_without_gyroscope() {
    let clock = ManualClock::new(0.0);
    let mut buffer = SampleBuffer::with_clock(clock.clone());
    let mut ctx = SessionContext::new(handle());

    buffer.push(&RawEvent::orientation(10.0, 20.0, 30.0));
    buffer.start_at(1000.0).unwrap();
    for i in 0..100 {
        let event: RawEvent = serde_json::from_value(json!({
            "type": "motion",
            "timeStamp": 1000.0 + i as f64 * 10.0,
            "acceleration": {"x": 0.1, "y": null, "z": 9.8},
            "accelerationIncludingGravity": {"x": 0.1, "y": 0.2, "z": 9.8},
            "rotationRate": null,
            "interval": 10
        }))
        .unwrap();
        buffer.push(&event);
    }
    let capture = buffer.stop_at(2000.0).unwrap();

    let diag = capture.diagnostics();
    assert_eq!(diag.sample_count, 100);
    assert_eq!(diag.effective_hz, 100.0);
    assert_eq!(diag.missing.acc, 100);
    assert_eq!(diag.missing.rot, 100);
    assert_eq!(diag.missing.acc_g, 0);
    assert_eq!(diag.missing.ori, 0);
    assert_eq!(
        diag.status(),
        CaptureStatus::Degraded {
            channels: vec![Channel::Acc, Channel::Rot]
        }
    );
    assert!(!diag.below_min_rate(60.0));

    let survey = Survey {
        tags: vec!["circle".into()],
        confidence: Some(0.9),
        notes: None,
        extra: Default::default(),
    };
    let trial = ctx.assemble(capture, Some("stim-1".into()), Some(survey));
    let payload = serde_json::to_value(&trial).unwrap();

    assert_eq!(payload["trial_index"], 0);
    assert_eq!(payload["session_id"], "sess-9");
    assert_eq!(payload["samples"][0]["acc_g"], json!({"x": 0.1, "y": 0.2, "z": 9.8}));
    assert_eq!(payload["samples"][0]["ori"], json!({"alpha": 10.0, "beta": 20.0, "gamma": 30.0}));
    assert!(payload["samples"][0].get("acc").is_none());
    assert!(payload["samples"][0].get("rot").is_none());
    assert_eq!(ctx.next_trial_index(), 1);
}

#[test]
fn empty_window_reports_no_data() {
    let mut buffer = SampleBuffer::with_clock(ManualClock::new(0.0));
    buffer.start_at(0.0).unwrap();
    let capture = buffer.stop_at(500.0).unwrap();

    let diag = capture.diagnostics();
    assert_eq!(diag.status(), CaptureStatus::NoData);
    assert_eq!(diag.effective_hz, 0.0);
    assert_eq!(diag.duration_ms, 500.0);
}
