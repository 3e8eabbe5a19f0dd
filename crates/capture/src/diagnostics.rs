//! Quality metrics for a finished recording window.

use serde::{Deserialize, Serialize, Serializer};

use crate::sample::Sample;

/// Per-channel count of samples that lack the channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingCounts {
    pub acc: usize,
    pub acc_g: usize,
    pub rot: usize,
    pub ori: usize,
}

impl MissingCounts {
    pub fn get(&self, channel: Channel) -> usize {
        match channel {
            Channel::Acc => self.acc,
            Channel::AccG => self.acc_g,
            Channel::Rot => self.rot,
            Channel::Ori => self.ori,
        }
    }
}

/// Sensor channels carried by a [`Sample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Acc,
    AccG,
    Rot,
    Ori,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Acc, Channel::AccG, Channel::Rot, Channel::Ori];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Acc => "acc",
            Channel::AccG => "acc_g",
            Channel::Rot => "rot",
            Channel::Ori => "ori",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How usable a window is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    /// No samples arrived during the window.
    NoData,
    /// Samples arrived but these channels were missing from some of them.
    Degraded { channels: Vec<Channel> },
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub sample_count: usize,
    pub duration_ms: f64,
    /// Full precision in memory, two decimals on the wire.
    #[serde(serialize_with = "serialize_rounded")]
    pub effective_hz: f64,
    pub missing: MissingCounts,
}

impl Diagnostics {
    pub fn compute(samples: &[Sample], t_start_ms: f64, t_end_ms: f64) -> Self {
        let duration_ms = (t_end_ms - t_start_ms).max(0.0);
        let missing = samples.iter().fold(MissingCounts::default(), |mut m, s| {
            m.acc += usize::from(s.acc.is_none());
            m.acc_g += usize::from(s.acc_g.is_none());
            m.rot += usize::from(s.rot.is_none());
            m.ori += usize::from(s.ori.is_none());
            m
        });

        Self {
            sample_count: samples.len(),
            duration_ms,
            effective_hz: effective_hz(samples.len(), duration_ms),
            missing,
        }
    }

    pub fn effective_hz_rounded(&self) -> f64 {
        round2(self.effective_hz)
    }

    pub fn status(&self) -> CaptureStatus {
        if self.sample_count == 0 {
            return CaptureStatus::NoData;
        }
        let channels: Vec<Channel> = Channel::ALL
            .into_iter()
            .filter(|c| self.missing.get(*c) > 0)
            .collect();
        if channels.is_empty() {
            CaptureStatus::Complete
        } else {
            CaptureStatus::Degraded { channels }
        }
    }

    pub fn below_min_rate(&self, min_hz: f64) -> bool {
        self.effective_hz < min_hz
    }
}

/// Observed rate: `count / seconds`, or zero for an empty or zero-length window.
pub fn effective_hz(sample_count: usize, duration_ms: f64) -> f64 {
    if duration_ms > 0.0 {
        sample_count as f64 / (duration_ms / 1000.0)
    } else {
        0.0
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn serialize_rounded<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round2(*value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{Euler, Vec3};
    use pretty_assertions::assert_eq;

    fn sample(t_ms: f64) -> Sample {
        Sample {
            t_ms,
            acc: Some(Vec3 { x: 0.0, y: 0.0, z: 0.0 }),
            acc_g: Some(Vec3 { x: 0.0, y: 9.8, z: 0.0 }),
            rot: Some(Euler {
                alpha: 0.0,
                beta: 0.0,
                gamma: 0.0,
            }),
            ori: Some(Euler {
                alpha: 0.0,
                beta: 0.0,
                gamma: 0.0,
            }),
            interval_ms: Some(16.0),
        }
    }

    #[test]
    fn twenty_samples_over_two_seconds() {
        let samples: Vec<Sample> = (0..20).map(|i| sample(1000.0 + i as f64 * 100.0)).collect();
        let diag = Diagnostics::compute(&samples, 1000.0, 3000.0);

        assert_eq!(diag.duration_ms, 2000.0);
        assert_eq!(diag.sample_count, 20);
        assert_eq!(diag.effective_hz, 10.0);
        assert_eq!(diag.status(), CaptureStatus::Complete);
    }

    #[test]
    fn zero_length_window_has_zero_rate() {
        let diag = Diagnostics::compute(&[sample(5.0)], 5.0, 5.0);
        assert_eq!(diag.effective_hz, 0.0);
    }

    #[test]
    fn empty_window_is_no_data() {
        let diag = Diagnostics::compute(&[], 0.0, 1500.0);
        assert_eq!(diag.sample_count, 0);
        assert_eq!(diag.effective_hz, 0.0);
        assert_eq!(diag.status(), CaptureStatus::NoData);
    }

    #[test]
    fn rate_matches_formula() {
        for (count, duration) in [(1usize, 3.0f64), (7, 1234.5), (300, 2999.0), (0, 10.0)] {
            let samples: Vec<Sample> = (0..count).map(|i| sample(i as f64)).collect();
            let diag = Diagnostics::compute(&samples, 0.0, duration);
            assert_eq!(diag.effective_hz, count as f64 / (duration / 1000.0));
        }
    }

    #[test]
    fn missing_gyro_is_degraded() {
        let samples: Vec<Sample> = (0..3)
            .map(|i| Sample {
                rot: None,
                ..sample(i as f64)
            })
            .collect();
        let diag = Diagnostics::compute(&samples, 0.0, 30.0);

        assert_eq!(diag.missing.rot, 3);
        assert_eq!(diag.missing.acc, 0);
        assert_eq!(
            diag.status(),
            CaptureStatus::Degraded {
                channels: vec![Channel::Rot]
            }
        );
    }

    #[test]
    fn rate_is_rounded_on_the_wire_only() {
        let samples: Vec<Sample> = (0..1).map(|i| sample(i as f64)).collect();
        let diag = Diagnostics::compute(&samples, 0.0, 3.0);
        assert!((diag.effective_hz - 333.333_333).abs() < 1e-3);
        assert_eq!(diag.effective_hz_rounded(), 333.33);

        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["effective_hz"], serde_json::json!(333.33));
        assert_eq!(json["missing"]["acc_g"], 0);
    }

    #[test]
    fn below_min_rate() {
        let samples: Vec<Sample> = (0..50).map(|i| sample(i as f64)).collect();
        let diag = Diagnostics::compute(&samples, 0.0, 1000.0);
        assert!(diag.below_min_rate(60.0));
        assert!(!diag.below_min_rate(50.0));
    }
}
