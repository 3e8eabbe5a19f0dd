//! Message-passing front end for the sample buffer.
//!
//! Sensor callbacks and start/stop button presses are all sent down one
//! channel, so the buffer sees them in arrival order and is the only writer.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::buffer::{Capture, SampleBuffer};
use crate::clock::Clock;
use crate::event::RawEvent;
use crate::CaptureError;

/// Input to the capture loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum CaptureSignal {
    /// Open a window, at `t_ms` if given or at the buffer clock's time.
    Start {
        #[serde(default)]
        t_ms: Option<f64>,
    },
    Event(RawEvent),
    Stop {
        #[serde(default)]
        t_ms: Option<f64>,
    },
}

/// Output of the capture loop: one per `Stop`, plus rejected `Start`s.
pub type CaptureResult = Result<Capture, CaptureError>;

/// Drain `signals` into `buffer` until the sender side closes or the output
/// receiver goes away.
pub async fn run_capture_loop<C: Clock>(
    buffer: &mut SampleBuffer<C>,
    signals: &mut mpsc::Receiver<CaptureSignal>,
    out: &mpsc::Sender<CaptureResult>,
) {
    while let Some(signal) = signals.recv().await {
        let result = match signal {
            CaptureSignal::Event(event) => {
                buffer.push(&event);
                continue;
            }
            CaptureSignal::Start { t_ms } => {
                let started = match t_ms {
                    Some(t) => buffer.start_at(t),
                    None => buffer.start(),
                };
                match started {
                    Ok(()) => continue,
                    Err(e) => Err(e),
                }
            }
            CaptureSignal::Stop { t_ms } => match t_ms {
                Some(t) => buffer.stop_at(t),
                None => buffer.stop(),
            },
        };

        if let Err(e) = &result {
            warn!("capture signal rejected: {}", e);
        }
        if out.send(result).await.is_err() {
            debug!("capture output closed, stopping loop");
            break;
        }
    }
}

/// Run the capture loop on its own task. The handle yields the buffer back
/// once the input channel closes.
pub fn spawn_capture_loop<C>(
    mut buffer: SampleBuffer<C>,
    mut signals: mpsc::Receiver<CaptureSignal>,
) -> (mpsc::Receiver<CaptureResult>, JoinHandle<SampleBuffer<C>>)
where
    C: Clock + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(async move {
        run_capture_loop(&mut buffer, &mut signals, &tx).await;
        buffer
    });
    (rx, handle)
}
