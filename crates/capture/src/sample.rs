use serde::{Deserialize, Serialize};

use crate::event::{MotionEvent, OrientationEvent, RawAxes};

/// Linear acceleration in m/s².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Rotation rate (deg/s) or orientation (deg), depending on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Euler {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

/// One timestamped reading. A channel is present only when every one of its
/// members was a finite number; it is never zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acc: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acc_g: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rot: Option<Euler>,
    /// Latest orientation seen when this sample was taken; may be stale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ori: Option<Euler>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<f64>,
}

impl Sample {
    /// Build a sample from a motion event stamped at `t_ms`.
    pub fn from_motion(t_ms: f64, event: &MotionEvent, ori: Option<Euler>) -> Self {
        Self {
            t_ms,
            acc: event.acceleration.as_ref().and_then(vec3),
            acc_g: event.acceleration_including_gravity.as_ref().and_then(vec3),
            rot: event.rotation_rate.as_ref().and_then(rotation),
            ori,
            interval_ms: event.interval_ms.filter(|v| v.is_finite()),
        }
    }
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|v| v.is_finite())
}

fn vec3(axes: &RawAxes) -> Option<Vec3> {
    Some(Vec3 {
        x: finite(axes.x)?,
        y: finite(axes.y)?,
        z: finite(axes.z)?,
    })
}

fn rotation(axes: &RawAxes) -> Option<Euler> {
    Some(Euler {
        alpha: finite(axes.alpha)?,
        beta: finite(axes.beta)?,
        gamma: finite(axes.gamma)?,
    })
}

/// Orientation angles, if all three are finite.
pub fn orientation(event: &OrientationEvent) -> Option<Euler> {
    Some(Euler {
        alpha: finite(event.alpha)?,
        beta: finite(event.beta)?,
        gamma: finite(event.gamma)?,
    })
}
