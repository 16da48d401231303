// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Simulated ranging sensor.
//!
//! [`SimulatedDriver`] ray-casts a rectangular room around the sensor and
//! produces scans with the same irregularities a real spinning sensor has:
//! angles start just after zero, are jittered, the sample count varies
//! between revolutions, and some samples have no return. Scans are released
//! once per period; polling faster yields would-block.
//!
//! URIs of the form `sim://<anything>` are accepted.

use crate::{
    buffer::RawScan,
    ranging::{DriverStatus, QUALITY_MAX, RangingDriver, ScanConfig},
};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use rand_distr::StandardNormal;
use std::{
    f32::consts::TAU,
    time::{Duration, Instant},
};

const URI_SCHEME: &str = "sim://";

/// Maximum range of the scanning mode in metres.
const SCAN_MAX_RANGE: f32 = 12.0;

/// Sigma grows linearly with distance.
const SIGMA_BASE: f32 = 0.005;
const SIGMA_PER_METRE: f32 = 0.01;

/// Quality lost per metre of distance.
const QUALITY_DECAY: f32 = 6.0;

/// Sensor placement inside an axis-aligned room, metres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Room {
    pub half_width: f32,
    pub half_depth: f32,
    /// Sensor offset from the room centre
    pub offset: (f32, f32),
}

impl Default for Room {
    fn default() -> Self {
        Self {
            half_width: 2.5,
            half_depth: 1.8,
            offset: (0.4, -0.3),
        }
    }
}

impl Room {
    /// Distance from the sensor to the nearest wall along `angle`.
    pub fn ray_cast(&self, angle: f32) -> f32 {
        let (sin, cos) = angle.sin_cos();
        let (ox, oy) = self.offset;
        let tx = if cos > f32::EPSILON {
            (self.half_width - ox) / cos
        } else if cos < -f32::EPSILON {
            (-self.half_width - ox) / cos
        } else {
            f32::INFINITY
        };
        let ty = if sin > f32::EPSILON {
            (self.half_depth - oy) / sin
        } else if sin < -f32::EPSILON {
            (-self.half_depth - oy) / sin
        } else {
            f32::INFINITY
        };
        tx.min(ty)
    }
}

/// Handle of an open simulated sensor.
#[derive(Debug)]
pub struct SimHandle {
    config: ScanConfig,
    next_scan: Instant,
    revolutions: u64,
}

impl SimHandle {
    /// Number of scans produced so far.
    pub fn revolutions(&self) -> u64 {
        self.revolutions
    }
}

/// Deterministic simulated sensor.
pub struct SimulatedDriver {
    seed: u64,
    rng: SmallRng,
    room: Room,
    period: Duration,
    range_stddev: f32,
    dropout_rate: f64,
    miss_rate: f64,
}

impl SimulatedDriver {
    /// Create a simulator seeded with `seed`, scanning at 10 Hz.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: SmallRng::seed_from_u64(seed),
            room: Room::default(),
            period: Duration::from_millis(100),
            range_stddev: 0.01,
            dropout_rate: 0.02,
            miss_rate: 0.01,
        }
    }

    pub fn with_room(mut self, room: Room) -> Self {
        self.room = room;
        self
    }

    /// Time between revolutions. Zero makes every read succeed.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_range_stddev(mut self, stddev: f32) -> Self {
        self.range_stddev = stddev;
        self
    }

    /// Probability that a sample has no return (quality 0).
    pub fn with_dropout_rate(mut self, rate: f64) -> Self {
        self.dropout_rate = probability(rate);
        self
    }

    /// Probability that a sample is missing from the scan entirely.
    pub fn with_miss_rate(mut self, rate: f64) -> Self {
        self.miss_rate = probability(rate);
        self
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    fn gaussian(&mut self, stddev: f32) -> f32 {
        if stddev == 0.0 {
            return 0.0;
        }
        let n: f32 = self.rng.sample(StandardNormal);
        n * stddev
    }

    /// Append one measured sample at `angle` to `scan`.
    fn measure(&mut self, scan: &mut RawScan, angle: f32, max_range: f32) {
        let truth = self.room.ray_cast(angle);
        if truth > max_range || self.rng.gen_bool(self.dropout_rate) {
            scan.push(angle, 0.0, 0.0, 0);
            return;
        }

        let sigma = SIGMA_BASE + SIGMA_PER_METRE * truth;
        let distance = (truth + self.gaussian(self.range_stddev)).max(0.0);
        let quality =
            (QUALITY_MAX as f32 - QUALITY_DECAY * distance).clamp(1.0, QUALITY_MAX as f32);
        scan.push(angle, distance, sigma, quality as u8);
    }

    fn scan_revolution(&mut self, samples: usize, scan: &mut RawScan) {
        let step = TAU / samples as f32;
        // First sample lands a little after zero, never on it
        let start = self.rng.gen_range(0.35_f32..0.5) * step;
        let mut last = 0.0_f32;

        for i in 0..samples {
            if self.rng.gen_bool(self.miss_rate) {
                continue;
            }
            let jitter = self.rng.gen_range(-0.3_f32..0.3) * step;
            let angle = (start + i as f32 * step + jitter).max(last);
            if angle >= TAU {
                break;
            }
            last = angle;
            self.measure(scan, angle, SCAN_MAX_RANGE);
        }
    }
}

/// Clamp `rate` into `[0, 1]`, NaN reading as 0.
fn probability(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RangingDriver for SimulatedDriver {
    type Handle = SimHandle;

    fn open(&mut self, uri: &str, config: &ScanConfig) -> Result<SimHandle, DriverStatus> {
        if !uri.starts_with(URI_SCHEME) {
            return Err(DriverStatus::InvalidArgument);
        }

        // Each open replays the same sequence for a given seed
        self.rng = SmallRng::seed_from_u64(self.seed);

        Ok(SimHandle {
            config: *config,
            next_scan: Instant::now(),
            revolutions: 0,
        })
    }

    fn read_scan(
        &mut self,
        handle: &mut SimHandle,
        scan: &mut RawScan,
    ) -> Result<(), DriverStatus> {
        let now = Instant::now();
        if now < handle.next_scan {
            return Err(DriverStatus::WouldBlock);
        }
        handle.next_scan = now + self.period;
        handle.revolutions += 1;

        match handle.config {
            ScanConfig::Distance(distance) => self.measure(scan, 0.0, distance.max_range()),
            ScanConfig::SamplesPerScan(samples) => self.scan_revolution(samples, scan),
        }

        Ok(())
    }

    fn close(&mut self, _handle: SimHandle) -> Result<(), DriverStatus> {
        Ok(())
    }

    fn scan_capacity(&self, handle: &SimHandle) -> usize {
        match handle.config {
            ScanConfig::Distance(_) => 1,
            ScanConfig::SamplesPerScan(samples) => samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranging::RangingDistance;
    use approx::assert_relative_eq;

    fn open(driver: &mut SimulatedDriver, config: ScanConfig) -> SimHandle {
        driver.open("sim://test", &config).unwrap()
    }

    #[test]
    fn test_ray_cast_axes() {
        let room = Room {
            half_width: 2.0,
            half_depth: 1.0,
            offset: (0.0, 0.0),
        };
        assert_relative_eq!(room.ray_cast(0.0), 2.0, epsilon = 1e-5);
        assert_relative_eq!(room.ray_cast(std::f32::consts::FRAC_PI_2), 1.0, epsilon = 1e-5);
        assert_relative_eq!(room.ray_cast(std::f32::consts::PI), 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_rejects_foreign_uri() {
        let mut driver = SimulatedDriver::new(1);
        let result = driver.open("serial:///dev/ttyUSB0", &ScanConfig::SamplesPerScan(360));
        assert_eq!(result.unwrap_err(), DriverStatus::InvalidArgument);
    }

    #[test]
    fn test_scan_shape() {
        let mut driver = SimulatedDriver::new(3).with_period(Duration::ZERO);
        let mut handle = open(&mut driver, ScanConfig::SamplesPerScan(1008));
        let mut scan = RawScan::with_capacity(1008);

        driver.read_scan(&mut handle, &mut scan).unwrap();
        assert!(scan.len() <= 1008);
        assert!(scan.len() > 900);
        assert!(scan.angle()[0] > 0.0);
        assert!(scan.angle().windows(2).all(|w| w[0] <= w[1]));
        assert!(scan.angle().iter().all(|&a| a < TAU));
        assert!(scan.quality().iter().all(|&q| q <= QUALITY_MAX));
    }

    #[test]
    fn test_deterministic_seed() {
        let mut a = SimulatedDriver::new(42).with_period(Duration::ZERO);
        let mut b = SimulatedDriver::new(42).with_period(Duration::ZERO);
        let mut ha = open(&mut a, ScanConfig::SamplesPerScan(360));
        let mut hb = open(&mut b, ScanConfig::SamplesPerScan(360));
        let mut sa = RawScan::default();
        let mut sb = RawScan::default();

        a.read_scan(&mut ha, &mut sa).unwrap();
        b.read_scan(&mut hb, &mut sb).unwrap();
        assert_eq!(sa, sb);
    }

    #[test]
    fn test_would_block_until_period() {
        let mut driver = SimulatedDriver::new(5).with_period(Duration::from_secs(3600));
        let mut handle = open(&mut driver, ScanConfig::SamplesPerScan(360));
        let mut scan = RawScan::default();

        driver.read_scan(&mut handle, &mut scan).unwrap();
        scan.clear();
        assert_eq!(
            driver.read_scan(&mut handle, &mut scan),
            Err(DriverStatus::WouldBlock)
        );
        assert_eq!(handle.revolutions(), 1);
    }

    #[test]
    fn test_nan_rates_disable_noise() {
        let mut driver = SimulatedDriver::new(11)
            .with_period(Duration::ZERO)
            .with_dropout_rate(f64::NAN)
            .with_miss_rate(f64::NAN);
        assert_eq!(driver.dropout_rate, 0.0);
        assert_eq!(driver.miss_rate, 0.0);

        let mut handle = open(&mut driver, ScanConfig::SamplesPerScan(360));
        let mut scan = RawScan::default();
        driver.read_scan(&mut handle, &mut scan).unwrap();
        assert_eq!(scan.len(), 360);
        assert!(scan.quality().iter().all(|&q| q > 0));
    }

    #[test]
    fn test_rates_clamped() {
        let driver = SimulatedDriver::new(0)
            .with_dropout_rate(1.5)
            .with_miss_rate(-0.2);
        assert_eq!(driver.dropout_rate, 1.0);
        assert_eq!(driver.miss_rate, 0.0);
    }

    #[test]
    fn test_single_beam_preset_range() {
        // Forward wall 3.5 m away: beyond SHORT, within LONG
        let room = Room {
            half_width: 3.5,
            half_depth: 1.0,
            offset: (0.0, 0.0),
        };
        let mut driver = SimulatedDriver::new(9)
            .with_room(room)
            .with_period(Duration::ZERO)
            .with_dropout_rate(0.0)
            .with_range_stddev(0.0);
        let mut scan = RawScan::default();

        let mut handle = open(&mut driver, RangingDistance::Short.into());
        driver.read_scan(&mut handle, &mut scan).unwrap();
        assert_eq!(scan.len(), 1);
        assert_eq!(scan.quality()[0], 0);
        assert_eq!(driver.scan_capacity(&handle), 1);

        scan.clear();
        let mut handle = open(&mut driver, RangingDistance::Long.into());
        driver.read_scan(&mut handle, &mut scan).unwrap();
        assert_eq!(scan.angle()[0], 0.0);
        assert_relative_eq!(scan.distance()[0], 3.5, epsilon = 1e-5);
        assert!(scan.quality()[0] > 0);
    }
}
