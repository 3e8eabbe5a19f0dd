//! Replay recorded sensor events as capture windows.
//!
//! An event file holds one JSON value per line. Lines are either capture
//! signals (`{"signal": "start"}`, `{"signal": "event", ...}`,
//! `{"signal": "stop"}`) or bare raw events. A file with no start or stop
//! signal is treated as a single window spanning its events.
//!
//! Replay runs on the recorded time axis: every motion event must carry a
//! timestamp, and a start or stop without one takes the time of the
//! neighbouring event. Each file is captured on its own.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use capture::{
    spawn_capture_loop, Capture, CaptureSignal, CaptureStatus, Diagnostics, ManualClock,
    RawEvent, SampleBuffer, SessionContext, SessionHandle,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::{HubClient, TrialReceipt};

/// Parse one event file's contents into capture signals.
pub fn parse_signals(contents: &str, source: &str) -> Result<Vec<CaptureSignal>> {
    let mut signals = Vec::new();
    for (n, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid JSON", source, n + 1))?;

        let decoded = if value.get("signal").is_some() {
            serde_json::from_value::<CaptureSignal>(value)
        } else {
            serde_json::from_value::<RawEvent>(value).map(CaptureSignal::Event)
        };
        let signal = decoded.with_context(|| {
            format!("{}:{}: not a capture signal or sensor event", source, n + 1)
        })?;
        if motion_time(&signal) == Some(None) {
            bail!("{}:{}: motion event has no timestamp", source, n + 1);
        }
        signals.push(signal);
    }

    let explicit = signals
        .iter()
        .any(|s| !matches!(s, CaptureSignal::Event(_)));
    if explicit {
        fill_boundary_times(&mut signals);
        return Ok(signals);
    }

    let stamps: Vec<f64> = signals.iter().filter_map(|s| motion_time(s).flatten()).collect();
    let first = stamps.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let last = stamps.iter().copied().reduce(f64::max).unwrap_or(first);

    let mut wrapped = Vec::with_capacity(signals.len() + 2);
    wrapped.push(CaptureSignal::Start { t_ms: Some(first) });
    wrapped.extend(signals);
    wrapped.push(CaptureSignal::Stop { t_ms: Some(last) });
    Ok(wrapped)
}

/// `Some(t_ms)` for motion events, `None` for everything else.
fn motion_time(signal: &CaptureSignal) -> Option<Option<f64>> {
    match signal {
        CaptureSignal::Event(RawEvent::Motion(m)) => Some(m.t_ms),
        _ => None,
    }
}

/// Stamp untimed starts with the first motion event of their window and
/// untimed stops with the last one seen. Falls back to the previous
/// boundary, then zero.
fn fill_boundary_times(signals: &mut [CaptureSignal]) {
    let mut last: Option<f64> = None;
    for i in 0..signals.len() {
        let t = match signals[i] {
            CaptureSignal::Start { t_ms: None } => {
                let next = signals[i + 1..]
                    .iter()
                    .take_while(|s| matches!(s, CaptureSignal::Event(_)))
                    .find_map(|s| motion_time(s).flatten());
                let t = next.or(last).unwrap_or(0.0);
                signals[i] = CaptureSignal::Start { t_ms: Some(t) };
                t
            }
            CaptureSignal::Stop { t_ms: None } => {
                let t = last.unwrap_or(0.0);
                signals[i] = CaptureSignal::Stop { t_ms: Some(t) };
                t
            }
            CaptureSignal::Start { t_ms: Some(t) } | CaptureSignal::Stop { t_ms: Some(t) } => t,
            CaptureSignal::Event(RawEvent::Motion(ref m)) => match m.t_ms {
                Some(t) => t,
                None => continue,
            },
            CaptureSignal::Event(_) => continue,
        };
        last = Some(t);
    }
}

pub async fn read_signals(path: &Path) -> Result<Vec<CaptureSignal>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_signals(&contents, &path.display().to_string())
}

/// Feed every signal through one capture loop and collect the windows.
/// Rejected starts and stops are logged and dropped, as is a window still
/// open when the signals run out.
pub async fn capture_windows(signals: Vec<CaptureSignal>) -> Result<Vec<Capture>> {
    let (tx, rx) = mpsc::channel(64);
    let buffer = SampleBuffer::with_clock(ManualClock::new(0.0));
    let (mut results, handle) = spawn_capture_loop(buffer, rx);

    let feeder = tokio::spawn(async move {
        for signal in signals {
            if tx.send(signal).await.is_err() {
                break;
            }
        }
    });

    let mut windows = Vec::new();
    while let Some(result) = results.recv().await {
        match result {
            Ok(capture) => windows.push(capture),
            Err(e) => warn!("skipping signal: {}", e),
        }
    }

    feeder.await.context("Event feeder failed")?;
    let buffer = handle.await.context("Capture loop failed")?;
    if buffer.is_recording() {
        warn!(samples = buffer.len(), "window never stopped, discarded");
    }
    Ok(windows)
}

/// Capture each file separately and concatenate the windows in file order.
pub async fn replay_files(files: &[PathBuf]) -> Result<Vec<Capture>> {
    let mut windows = Vec::new();
    for file in files {
        let signals = read_signals(file).await?;
        let captured = capture_windows(signals).await?;
        debug!(file = %file.display(), windows = captured.len(), "file captured");
        windows.extend(captured);
    }
    Ok(windows)
}

/// How a window's observed rate compares to the session's rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateCheck {
    Ok,
    BelowTarget { effective_hz: f64, target_hz: u32 },
    BelowMinimum { effective_hz: f64, min_hz: u32 },
}

pub fn rate_check(diagnostics: &Diagnostics, handle: &SessionHandle) -> RateCheck {
    let effective_hz = diagnostics.effective_hz_rounded();
    if diagnostics.sample_count == 0 {
        RateCheck::Ok
    } else if diagnostics.below_min_rate(f64::from(handle.min_hz)) {
        RateCheck::BelowMinimum {
            effective_hz,
            min_hz: handle.min_hz,
        }
    } else if diagnostics.below_min_rate(f64::from(handle.target_hz)) {
        RateCheck::BelowTarget {
            effective_hz,
            target_hz: handle.target_hz,
        }
    } else {
        RateCheck::Ok
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    pub stimulus_id: Option<String>,
    pub submit_empty: bool,
}

/// Outcome for one window, printed as a JSON line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WindowReport {
    Submitted {
        window: usize,
        #[serde(flatten)]
        receipt: TrialReceipt,
    },
    Skipped {
        window: usize,
        reason: String,
    },
}

/// Assemble and submit each window as the next trial of the session.
pub async fn submit_windows(
    client: &HubClient,
    ctx: &mut SessionContext,
    windows: Vec<Capture>,
    options: &ReplayOptions,
) -> Result<Vec<WindowReport>> {
    let handle = ctx.handle();
    info!(
        session = %handle.session_id,
        consent_version = %handle.consent_version,
        windows = windows.len(),
        "replaying into session"
    );
    let mut reports = Vec::with_capacity(windows.len());

    for (window, capture) in windows.into_iter().enumerate() {
        let diagnostics = capture.diagnostics();
        match diagnostics.status() {
            CaptureStatus::NoData if !options.submit_empty => {
                warn!(window, "no data captured, window skipped");
                reports.push(WindowReport::Skipped {
                    window,
                    reason: "no data captured".to_string(),
                });
                continue;
            }
            CaptureStatus::NoData => warn!(window, "no data captured, submitting anyway"),
            CaptureStatus::Degraded { channels } => {
                let names: Vec<&str> = channels.iter().map(|c| c.as_str()).collect();
                warn!(window, missing = ?names, "degraded capture");
            }
            CaptureStatus::Complete => {}
        }
        match rate_check(&diagnostics, ctx.handle()) {
            RateCheck::BelowMinimum {
                effective_hz,
                min_hz,
            } => warn!(window, effective_hz, min_hz, "sampling rate below study minimum"),
            RateCheck::BelowTarget {
                effective_hz,
                target_hz,
            } => info!(window, effective_hz, target_hz, "sampling rate below target"),
            RateCheck::Ok => {}
        }

        let trial = ctx.assemble(capture, options.stimulus_id.clone(), None);
        let receipt = client
            .submit_trial(&trial)
            .await
            .with_context(|| format!("Failed to submit window {}", window))?;
        reports.push(WindowReport::Submitted { window, receipt });
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture::{MissingCounts, StudyInfo};
    use pretty_assertions::assert_eq;

    #[test]
    fn bare_events_get_an_implicit_window() {
        let contents = r#"
            {"type": "orientation", "alpha": 1, "beta": 2, "gamma": 3}
            {"type": "motion", "timeStamp": 1000, "acceleration": {"x": 0, "y": 0, "z": 1}}
            {"type": "motion", "timeStamp": 1500, "acceleration": {"x": 0, "y": 0, "z": 1}}
        "#;
        let signals = parse_signals(contents, "test").unwrap();

        assert_eq!(signals.len(), 5);
        assert_eq!(signals[0], CaptureSignal::Start { t_ms: Some(1000.0) });
        assert_eq!(signals[4], CaptureSignal::Stop { t_ms: Some(1500.0) });
    }

    #[test]
    fn explicit_signals_are_kept() {
        let contents = "{\"signal\": \"start\", \"t_ms\": 0}\n# comment\n{\"signal\": \"stop\", \"t_ms\": 10}\n";
        let signals = parse_signals(contents, "test").unwrap();
        assert_eq!(
            signals,
            vec![
                CaptureSignal::Start { t_ms: Some(0.0) },
                CaptureSignal::Stop { t_ms: Some(10.0) },
            ]
        );
    }

    #[test]
    fn bad_lines_name_their_location() {
        let err = parse_signals("{\"signal\": \"start\"}\nnot json\n", "events.jsonl").unwrap_err();
        assert!(err.to_string().contains("events.jsonl:2"));
    }

    #[test]
    fn untimed_motion_is_rejected() {
        let contents = r#"
            {"type": "motion", "acceleration": {"x": 0, "y": 0, "z": 1}}
            {"type": "motion", "acceleration": {"x": 0, "y": 0, "z": 1}}
        "#;
        let err = parse_signals(contents, "events.jsonl").unwrap_err();
        assert!(err.to_string().contains("events.jsonl:2"));
        assert!(err.to_string().contains("no timestamp"));
    }

    #[test]
    fn orientation_only_file_is_an_empty_window() {
        let contents = r#"{"type": "orientation", "alpha": 1, "beta": 2, "gamma": 3}"#;
        let signals = parse_signals(contents, "test").unwrap();
        assert_eq!(signals[0], CaptureSignal::Start { t_ms: Some(0.0) });
        assert_eq!(signals[2], CaptureSignal::Stop { t_ms: Some(0.0) });
    }

    #[tokio::test]
    async fn untimed_boundaries_use_recorded_time() {
        let mut contents = String::from("{\"signal\": \"start\"}\n");
        for i in 0..20 {
            contents.push_str(&format!(
                "{{\"type\": \"motion\", \"timeStamp\": {}, \"acceleration\": {{\"x\": 0, \"y\": 0, \"z\": 1}}}}\n",
                50_000 + i * 10
            ));
        }
        contents.push_str("{\"signal\": \"stop\"}\n");

        let signals = parse_signals(&contents, "test").unwrap();
        assert_eq!(signals[0], CaptureSignal::Start { t_ms: Some(50_000.0) });
        assert_eq!(signals[21], CaptureSignal::Stop { t_ms: Some(50_190.0) });

        let windows = capture_windows(signals).await.unwrap();
        assert_eq!(windows.len(), 1);
        let diag = windows[0].diagnostics();
        assert_eq!(diag.sample_count, 20);
        assert_eq!(diag.duration_ms, 190.0);
    }

    #[test]
    fn untimed_start_without_events_takes_previous_boundary() {
        let contents = "{\"signal\": \"start\", \"t_ms\": 100}\n{\"signal\": \"stop\", \"t_ms\": 400}\n{\"signal\": \"start\"}\n{\"signal\": \"stop\"}\n";
        let signals = parse_signals(contents, "test").unwrap();
        assert_eq!(signals[2], CaptureSignal::Start { t_ms: Some(400.0) });
        assert_eq!(signals[3], CaptureSignal::Stop { t_ms: Some(400.0) });
    }

    #[tokio::test]
    async fn files_are_captured_separately() {
        let dir = tempfile::TempDir::new().unwrap();
        let open = dir.path().join("open.jsonl");
        let bare = dir.path().join("bare.jsonl");

        let mut first = String::from("{\"signal\": \"start\", \"t_ms\": 0}\n");
        for t in [10, 20, 30] {
            first.push_str(&format!("{{\"type\": \"motion\", \"timeStamp\": {}}}\n", t));
        }
        std::fs::write(&open, first).unwrap();

        let mut second = String::new();
        for i in 0..10 {
            second.push_str(&format!(
                "{{\"type\": \"motion\", \"timeStamp\": {}}}\n",
                5000 + i * 100
            ));
        }
        std::fs::write(&bare, second).unwrap();

        let windows = replay_files(&[open, bare]).await.unwrap();
        assert_eq!(windows.len(), 1);
        let diag = windows[0].diagnostics();
        assert_eq!(diag.sample_count, 10);
        assert_eq!(diag.duration_ms, 900.0);
    }

    #[test]
    fn rate_against_session() {
        let handle = SessionHandle {
            session_id: "sess".into(),
            study: StudyInfo::new("s1", "v1", 1),
            consent_version: "c1".into(),
            target_hz: 100,
            min_hz: 60,
        };
        let diag_at = |hz: f64| Diagnostics {
            sample_count: 10,
            duration_ms: 1000.0,
            effective_hz: hz,
            missing: MissingCounts::default(),
        };

        assert_eq!(rate_check(&diag_at(120.0), &handle), RateCheck::Ok);
        assert_eq!(
            rate_check(&diag_at(80.0), &handle),
            RateCheck::BelowTarget {
                effective_hz: 80.0,
                target_hz: 100
            }
        );
        assert_eq!(
            rate_check(&diag_at(30.0), &handle),
            RateCheck::BelowMinimum {
                effective_hz: 30.0,
                min_hz: 60
            }
        );
        let empty = Diagnostics {
            sample_count: 0,
            ..diag_at(0.0)
        };
        assert_eq!(rate_check(&empty, &handle), RateCheck::Ok);
    }

    #[tokio::test]
    async fn windows_from_signals() {
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
        signals.push(CaptureSignal::Stop { t_ms: Some(3100.0) });

        let windows = capture_windows(signals).await.unwrap();
        assert_eq!(windows.len(), 1);
        let diag = windows[0].diagnostics();
        assert_eq!(diag.sample_count, 20);
        assert_eq!(diag.effective_hz, 10.0);
    }
}
