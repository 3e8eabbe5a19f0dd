//! Raw sensor events as the browser delivers them.
//!
//! Every numeric member may be missing, null or garbage on real devices, so
//! decoding never fails on a bad value: it simply comes through as `None`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// One callback from a motion or orientation listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawEvent {
    Motion(MotionEvent),
    Orientation(OrientationEvent),
}

impl RawEvent {
    /// Motion event carrying only linear acceleration.
    pub fn motion_xyz(t_ms: f64, x: f64, y: f64, z: f64) -> Self {
        RawEvent::Motion(MotionEvent {
            t_ms: Some(t_ms),
            acceleration: Some(RawAxes::xyz(x, y, z)),
            ..MotionEvent::default()
        })
    }

    /// Orientation event with all three angles.
    pub fn orientation(alpha: f64, beta: f64, gamma: f64) -> Self {
        RawEvent::Orientation(OrientationEvent {
            t_ms: None,
            alpha: Some(alpha),
            beta: Some(beta),
            gamma: Some(gamma),
        })
    }
}

/// `devicemotion` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    /// Event timestamp on the monotonic page clock. Stamped by the buffer's
    /// clock when absent.
    #[serde(default, alias = "timeStamp", deserialize_with = "lenient")]
    pub t_ms: Option<f64>,

    #[serde(default, deserialize_with = "lenient")]
    pub acceleration: Option<RawAxes>,

    #[serde(
        default,
        alias = "accelerationIncludingGravity",
        deserialize_with = "lenient"
    )]
    pub acceleration_including_gravity: Option<RawAxes>,

    #[serde(default, alias = "rotationRate", deserialize_with = "lenient")]
    pub rotation_rate: Option<RawAxes>,

    /// Reported interval between events, in milliseconds.
    #[serde(default, alias = "interval", deserialize_with = "lenient")]
    pub interval_ms: Option<f64>,
}

/// `deviceorientation` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrientationEvent {
    #[serde(default, alias = "timeStamp", deserialize_with = "lenient")]
    pub t_ms: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub alpha: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub beta: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub gamma: Option<f64>,
}

/// A channel's members before validation. Acceleration uses `x/y/z`,
/// rotation rate uses `alpha/beta/gamma`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAxes {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
}

impl RawAxes {
    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
            ..Self::default()
        }
    }

    pub fn abg(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            alpha: Some(alpha),
            beta: Some(beta),
            gamma: Some(gamma),
            ..Self::default()
        }
    }
}

/// Decode `T`, mapping any shape mismatch to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}
