// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! EdgeFirst Ranging Publisher Library
//!
//! This library provides measurement acquisition for ranging sensors:
//! spinning 2-D LiDARs (RPLIDAR, Leishen MS10/M10P) and single-beam
//! time-of-flight sensors.
//!
//! # Architecture
//!
//! The library uses a **client-owned buffer** pattern for zero-allocation
//! polling:
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │  RangingDriver  │ ──► │  RangingSession  │ ──► │  MeasurementSet  │
//! │ (sim/replay/HW) │     │ (normal/interp.) │     │  (client-owned)  │
//! └─────────────────┘     └──────────────────┘     └──────────────────┘
//! ```
//!
//! 1. Client creates a set once: `MeasurementSet::with_capacity(N)`
//! 2. Client polls: `session.read(mode, &tolerance, &mut set)`
//! 3. The session pulls one raw revolution from the driver and writes it,
//!    either unchanged or resampled to exactly `N` fixed headings
//! 4. `Ok(0)` means no new scan yet; poll again later
//!
//! # Modules
//!
//! - [`ranging`]: Common types, driver trait, and error handling
//! - [`buffer`]: Raw scan and measurement set buffers
//! - [`interpolate`]: Normal and interpolated measurement policies
//! - [`session`]: Session lifecycle and the read contract
//! - [`sim`]: Simulated sensor
//! - [`replay`]: Recorded scan replay
//!
//! # Example
//!
//! ```
//! use edgefirst_rangingpub::{
//!     MeasurementSet, RangingMeasurementMode, RangingSession, ScanConfig, Tolerance,
//!     sim::SimulatedDriver,
//! };
//! use std::time::Duration;
//!
//! let driver = SimulatedDriver::new(1).with_period(Duration::ZERO);
//! let mut session = RangingSession::new(driver);
//! session.open("sim://lab", ScanConfig::SamplesPerScan(1008))?;
//!
//! let mut set = MeasurementSet::with_capacity(1008);
//! for _ in 0..3 {
//!     let n = session.read(RangingMeasurementMode::Normal, &Tolerance::default(), &mut set)?;
//!     for m in set.iter().filter(|m| m.is_valid()) {
//!         let _ = m.to_cartesian();
//!     }
//!     assert!(n <= 1008);
//! }
//! # Ok::<(), edgefirst_rangingpub::Error>(())
//! ```

pub mod buffer;
pub mod interpolate;
pub mod ranging;
pub mod replay;
pub mod session;
pub mod sim;

// Re-exports for convenience
pub use buffer::{MeasurementSet, RawScan};
pub use ranging::{
    DriverStatus, Error, RangingDistance, RangingDriver, RangingMeasurement,
    RangingMeasurementMode, Result, ScanConfig, SensorModel, Tolerance,
};
pub use session::RangingSession;
