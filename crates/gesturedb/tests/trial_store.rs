use gesturedb::{NewSession, NewTrial, StudyDb};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

fn open_db() -> (StudyDb, TempDir) {
    let dir = TempDir::new().unwrap();
    let db = StudyDb::open(dir.path().join("nested").join("study.db")).unwrap();
    (db, dir)
}

fn session(db: &StudyDb, study_version: &str) -> String {
    db.create_session(&NewSession {
        study_id: "gesture".into(),
        study_version: study_version.into(),
        schema_version: 1,
        consent_version: "c1".into(),
        capabilities: None,
        metadata: Some(json!({"ua": "test"})),
    })
    .unwrap()
    .id
    .0
}

fn trial(id: &str, session_id: &str, study_version: &str, samples: serde_json::Value) -> NewTrial {
    let sample_count = samples.as_array().map(|a| a.len()).unwrap_or(0) as i64;
    NewTrial {
        id: id.into(),
        session_id: session_id.into(),
        study_id: "gesture".into(),
        study_version: study_version.into(),
        schema_version: 1,
        trial_index: 0,
        stimulus_id: Some("stim".into()),
        t_start_perf_ms: 1000.0,
        t_end_perf_ms: 3000.0,
        survey: Some(json!({"tags": ["wave"]})),
        diagnostics: None,
        samples,
        sample_count,
        duration_ms: 2000.0,
        effective_hz: sample_count as f64 / 2.0,
    }
}

#[test]
fn resubmitted_trial_is_ignored() {
    let (db, _dir) = open_db();
    let sid = session(&db, "v1");

    let first = trial("t1", &sid, "v1", json!([{"t_ms": 1.0}]));
    let mut second = trial("t1", &sid, "v1", json!([{"t_ms": 1.0}, {"t_ms": 2.0}]));
    second.stimulus_id = Some("other".into());

    assert!(db.insert_trial(&first).unwrap());
    assert!(!db.insert_trial(&second).unwrap());

    assert_eq!(db.count_trials_for_session(&sid).unwrap(), 1);
    let stored = db.get_trial("t1").unwrap().unwrap();
    assert_eq!(stored.stimulus_id.as_deref(), Some("stim"));
    assert_eq!(stored.sample_count, 1);
    assert_eq!(stored.samples_json, r#"[{"t_ms":1.0}]"#);
    assert_eq!(stored.survey_json.as_deref(), Some(r#"{"tags":["wave"]}"#));
    assert_eq!(stored.diagnostics_json, None);
}

#[test]
fn study_query_filters_by_version_in_insert_order() {
    let (db, _dir) = open_db();
    let v1 = session(&db, "v1");
    let v2 = session(&db, "v2");

    db.insert_trial(&trial("a", &v1, "v1", json!([]))).unwrap();
    db.insert_trial(&trial("b", &v2, "v2", json!([]))).unwrap();
    db.insert_trial(&trial("c", &v1, "v1", json!([]))).unwrap();

    let ids = |rows: Vec<gesturedb::TrialRecord>| rows.into_iter().map(|r| r.id).collect::<Vec<_>>();

    assert_eq!(ids(db.trials_for_study("gesture", Some("v1")).unwrap()), vec!["a", "c"]);
    assert_eq!(ids(db.trials_for_study("gesture", None).unwrap()), vec!["a", "b", "c"]);
    assert!(db.trials_for_study("other", None).unwrap().is_empty());
}

#[test]
fn data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("study.db");

    let sid = {
        let db = StudyDb::open(&path).unwrap();
        session(&db, "v1")
    };

    let db = StudyDb::open(&path).unwrap();
    let stored = db.get_session(&sid).unwrap().unwrap();
    assert_eq!(stored.metadata, Some(json!({"ua": "test"})));
    assert_eq!(db.count_sessions().unwrap(), 1);
}
