// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Common ranging types and the driver trait abstraction.
//!
//! This module provides sensor-agnostic types shared by every ranging
//! sensor family (RPLIDAR, Leishen MS10/M10P, single-beam time-of-flight),
//! and the [`RangingDriver`] trait a [`crate::session::RangingSession`] is
//! generic over.

use crate::buffer::RawScan;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved driver status: invalid argument (`EINVAL`).
pub const STATUS_INVALID_ARGUMENT: i32 = -22;

/// Reserved driver status: output buffer too small (`ENOBUFS`).
pub const STATUS_BUFFER_TOO_SMALL: i32 = -105;

/// Reserved driver status: no new scan available yet (`EAGAIN`).
pub const STATUS_WOULD_BLOCK: i32 = -11;

/// Quality reported for a sample with no reflected signal.
pub const QUALITY_INVALID: u8 = 0;

/// Highest quality a sample can report.
pub const QUALITY_MAX: u8 = 100;

/// One ranging sample.
///
/// A sample with `quality == 0` carries no usable distance and must not be
/// treated as a measured obstacle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RangingMeasurement {
    /// Distance in metres, 0 for invalid samples
    pub distance: f32,
    /// Standard deviation estimate of `distance` in metres
    pub distance_sigma: f32,
    /// Heading in radians, 0 for single-beam sensors
    pub heading: f32,
    /// Confidence 0-100, 0 means no return
    pub quality: u8,
}

impl RangingMeasurement {
    /// A sample marked as having no return.
    pub const INVALID: RangingMeasurement = RangingMeasurement {
        distance: 0.0,
        distance_sigma: 0.0,
        heading: 0.0,
        quality: QUALITY_INVALID,
    };

    /// Create a measurement, clamping quality into 0-100.
    pub fn new(distance: f32, distance_sigma: f32, heading: f32, quality: u8) -> Self {
        Self {
            distance,
            distance_sigma,
            heading,
            quality: quality.min(QUALITY_MAX),
        }
    }

    /// Invalid sample at the given heading.
    pub fn invalid(heading: f32) -> Self {
        Self {
            heading,
            ..Self::INVALID
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.quality > QUALITY_INVALID
    }

    /// Project onto the sensor plane, returning `(x, y)` in metres.
    ///
    /// Returns `None` for invalid samples.
    pub fn to_cartesian(&self) -> Option<(f32, f32)> {
        if !self.is_valid() {
            return None;
        }
        let (sin, cos) = self.heading.sin_cos();
        Some((self.distance * cos, self.distance * sin))
    }
}

/// Range preset for single-beam sensors, fixed at open time.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RangingDistance {
    Short,
    #[default]
    Medium,
    Long,
}

impl RangingDistance {
    /// Nominal maximum range of the preset in metres.
    pub fn max_range(&self) -> f32 {
        match self {
            RangingDistance::Short => 1.3,
            RangingDistance::Medium => 3.0,
            RangingDistance::Long => 4.0,
        }
    }
}

impl fmt::Display for RangingDistance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RangingDistance::Short => write!(f, "short"),
            RangingDistance::Medium => write!(f, "medium"),
            RangingDistance::Long => write!(f, "long"),
        }
    }
}

/// Normalization policy applied by each read.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RangingMeasurementMode {
    /// Raw samples, irregular angles, variable count
    Normal,
    /// Exactly `n` samples at `k * 2π / n`
    #[default]
    Interpolated,
}

impl fmt::Display for RangingMeasurementMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RangingMeasurementMode::Normal => write!(f, "normal"),
            RangingMeasurementMode::Interpolated => write!(f, "interpolated"),
        }
    }
}

/// Scanning sensor families with known per-revolution sample budgets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SensorModel {
    /// Slamtec RPLIDAR
    #[default]
    Rplidar,
    /// Leishen MS10
    LeishenMs10,
    /// Leishen M10P
    LeishenM10p,
}

impl SensorModel {
    /// Default samples per scan for the family.
    pub fn default_samples_per_scan(&self) -> usize {
        match self {
            SensorModel::Rplidar => 1680,
            SensorModel::LeishenMs10 | SensorModel::LeishenM10p => 1008,
        }
    }
}

impl fmt::Display for SensorModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SensorModel::Rplidar => write!(f, "rplidar"),
            SensorModel::LeishenMs10 => write!(f, "leishen-ms10"),
            SensorModel::LeishenM10p => write!(f, "leishen-m10p"),
        }
    }
}

/// Open-time configuration passed through to the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanConfig {
    /// Single-beam sensor range preset
    Distance(RangingDistance),
    /// Scanning sensor sample budget per revolution
    SamplesPerScan(usize),
}

impl From<RangingDistance> for ScanConfig {
    fn from(distance: RangingDistance) -> Self {
        ScanConfig::Distance(distance)
    }
}

impl From<SensorModel> for ScanConfig {
    fn from(model: SensorModel) -> Self {
        ScanConfig::SamplesPerScan(model.default_samples_per_scan())
    }
}

/// Interpolation gating for [`RangingMeasurementMode::Interpolated`] reads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance {
    /// Largest distance difference in metres a bracket may span
    pub max_distance: f32,
    /// Largest angular gap in radians a bracket may span
    pub max_angle: f32,
}

impl Tolerance {
    pub fn new(max_distance: f32, max_angle: f32) -> Self {
        Self {
            max_distance,
            max_angle,
        }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            max_distance: 0.1,
            max_angle: 2.0_f32.to_radians(),
        }
    }
}

/// Negative status returned by a driver entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverStatus {
    InvalidArgument,
    BufferTooSmall,
    /// No new scan is ready, poll again later
    WouldBlock,
    /// Any other negative code, carried opaquely
    Device(i32),
}

impl DriverStatus {
    /// Decode a raw negative status code.
    pub fn from_code(code: i32) -> Self {
        match code {
            STATUS_INVALID_ARGUMENT => DriverStatus::InvalidArgument,
            STATUS_BUFFER_TOO_SMALL => DriverStatus::BufferTooSmall,
            STATUS_WOULD_BLOCK => DriverStatus::WouldBlock,
            other => DriverStatus::Device(other),
        }
    }

    /// The raw status code.
    pub fn code(&self) -> i32 {
        match self {
            DriverStatus::InvalidArgument => STATUS_INVALID_ARGUMENT,
            DriverStatus::BufferTooSmall => STATUS_BUFFER_TOO_SMALL,
            DriverStatus::WouldBlock => STATUS_WOULD_BLOCK,
            DriverStatus::Device(code) => *code,
        }
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DriverStatus::InvalidArgument => write!(f, "invalid argument ({})", self.code()),
            DriverStatus::BufferTooSmall => write!(f, "buffer too small ({})", self.code()),
            DriverStatus::WouldBlock => write!(f, "would block ({})", self.code()),
            DriverStatus::Device(code) => write!(f, "device status {}", code),
        }
    }
}

/// Common error type for ranging operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error (file, serial or socket operations)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed recorded scan data
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bad URI or scan configuration at open time
    #[error("configuration error: {0}")]
    Config(String),

    /// No usable output channel or similar caller mistake
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Raw scan does not fit the negotiated capacity
    #[error("buffer too small: scan needs {required} samples, capacity is {capacity}")]
    BufferTooSmall { required: usize, capacity: usize },

    /// Driver or transport failure with its original status code
    #[error("device error: status {0}")]
    Device(i32),

    /// Read on a session that is not open
    #[error("session is not open")]
    NotOpen,
}

impl Error {
    /// The driver status code this error corresponds to, if any.
    pub fn status_code(&self) -> Option<i32> {
        match self {
            Error::InvalidArgument(_) => Some(STATUS_INVALID_ARGUMENT),
            Error::BufferTooSmall { .. } => Some(STATUS_BUFFER_TOO_SMALL),
            Error::Device(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<DriverStatus> for Error {
    fn from(status: DriverStatus) -> Self {
        Error::Device(status.code())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Capability set of a ranging sensor driver.
///
/// Implementations wrap a transport (serial, SPI, I2C, recorded data) and
/// perform the physical scan. The session applies the measurement policy on
/// top of the raw samples a driver produces, so drivers never interpolate.
pub trait RangingDriver {
    /// Exclusive native handle for one open sensor.
    type Handle;

    /// Connect to the sensor addressed by `uri` and initialise it.
    fn open(&mut self, uri: &str, config: &ScanConfig) -> Result<Self::Handle, DriverStatus>;

    /// Fill `scan` with the samples of the most recent revolution.
    ///
    /// Angles must be ascending radians in `[0, 2π)`. The scan is cleared by
    /// the caller beforehand. Returns [`DriverStatus::WouldBlock`] when no
    /// new revolution is ready.
    fn read_scan(
        &mut self,
        handle: &mut Self::Handle,
        scan: &mut RawScan,
    ) -> Result<(), DriverStatus>;

    /// Release the handle.
    fn close(&mut self, handle: Self::Handle) -> Result<(), DriverStatus>;

    /// Size of the driver's internal scan buffer in samples.
    fn scan_capacity(&self, handle: &Self::Handle) -> usize;
}

/// Get current timestamp in nanoseconds.
///
/// On Linux, uses `CLOCK_MONOTONIC_RAW` for best accuracy.
/// On other platforms, falls back to `SystemTime`.
#[cfg(target_os = "linux")]
pub fn timestamp() -> Result<u64> {
    let mut tp = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    let err = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC_RAW, &mut tp) };
    if err != 0 {
        return Err(std::io::Error::last_os_error().into());
    }

    Ok(tp.tv_sec as u64 * 1_000_000_000 + tp.tv_nsec as u64)
}

#[cfg(not(target_os = "linux"))]
pub fn timestamp() -> Result<u64> {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;
    Ok(duration.as_nanos() as u64)
}
