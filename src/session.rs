// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Ranging session: one open sensor handle and the read contract.
//!
//! A [`RangingSession`] owns exactly one driver handle. It is not meant to be
//! shared between threads; wrap it in a mutex if more than one task needs to
//! poll the same sensor.
//!
//! # Example
//!
//! ```
//! use edgefirst_rangingpub::{
//!     MeasurementSet, RangingMeasurementMode, RangingSession, SensorModel, Tolerance,
//!     sim::SimulatedDriver,
//! };
//!
//! let mut session = RangingSession::new(SimulatedDriver::new(7));
//! session.open("sim://room", SensorModel::Rplidar.into())?;
//!
//! let mut set = MeasurementSet::with_capacity(720);
//! let n = session.read(RangingMeasurementMode::Interpolated, &Tolerance::default(), &mut set)?;
//! assert_eq!(n, 720);
//! assert_eq!(set.heading().unwrap()[0], 0.0);
//!
//! session.close()?;
//! # Ok::<(), edgefirst_rangingpub::Error>(())
//! ```

use crate::{
    buffer::{MeasurementSet, RawScan},
    interpolate,
    ranging::{
        DriverStatus, Error, RangingDriver, RangingMeasurementMode, Result, ScanConfig, Tolerance,
        timestamp,
    },
};
use tracing::{debug, instrument, trace, warn};

struct OpenHandle<H> {
    handle: H,
    uri: String,
    config: ScanConfig,
}

/// Session over one ranging sensor, generic over its driver.
pub struct RangingSession<D: RangingDriver> {
    driver: D,
    open: Option<OpenHandle<D::Handle>>,
    raw: RawScan,
}

impl<D: RangingDriver> RangingSession<D> {
    /// Create a closed session around `driver`.
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            open: None,
            raw: RawScan::default(),
        }
    }

    /// Open the sensor at `uri`.
    ///
    /// An already open handle is closed first; a failure releasing it is
    /// logged and does not prevent the new open. On error the session is
    /// left closed.
    #[instrument(skip(self), level = "debug")]
    pub fn open(&mut self, uri: &str, config: ScanConfig) -> Result<()> {
        if self.open.is_some() {
            debug!("re-opening, closing previous handle");
            if let Err(err) = self.close() {
                warn!("failed to release previous handle: {}", err);
            }
        }

        if uri.is_empty() {
            return Err(Error::Config("empty URI".to_string()));
        }
        if config == ScanConfig::SamplesPerScan(0) {
            return Err(Error::Config("samples per scan must be positive".to_string()));
        }

        let handle = self.driver.open(uri, &config).map_err(Error::from)?;
        self.raw.reserve_total(self.driver.scan_capacity(&handle));
        self.open = Some(OpenHandle {
            handle,
            uri: uri.to_string(),
            config,
        });

        debug!("opened {} with {:?}", uri, config);
        Ok(())
    }

    /// Read one scan into `out` using `mode`.
    ///
    /// Returns the number of samples written to the leading elements of
    /// every present channel, also recorded as `out.len()`. A driver that has
    /// no new scan yet yields `Ok(0)` with `out` emptied; its timestamp still
    /// refers to the last scan received.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `out` has no channel, before the
    ///   driver is touched
    /// - [`Error::NotOpen`] if the session is closed
    /// - [`Error::BufferTooSmall`] if a normal-mode scan does not fit
    /// - [`Error::Device`] for any other driver status
    ///
    /// `out` is not modified on error.
    pub fn read(
        &mut self,
        mode: RangingMeasurementMode,
        tolerance: &Tolerance,
        out: &mut MeasurementSet,
    ) -> Result<usize> {
        let capacity = out
            .capacity()
            .ok_or_else(|| Error::InvalidArgument("no output channel present".to_string()))?;

        let open = self.open.as_mut().ok_or(Error::NotOpen)?;

        self.raw.clear();
        match self.driver.read_scan(&mut open.handle, &mut self.raw) {
            Ok(()) => {}
            Err(DriverStatus::WouldBlock) => {
                trace!("no scan ready");
                out.clear();
                return Ok(0);
            }
            Err(DriverStatus::BufferTooSmall) => {
                return Err(Error::BufferTooSmall {
                    required: self.driver.scan_capacity(&open.handle),
                    capacity,
                });
            }
            Err(status) => return Err(status.into()),
        }
        let stamp = timestamp()?;

        debug_assert!(self.raw.is_consistent());
        let n = interpolate::normalize(mode, &self.raw, out, tolerance)?;
        out.commit(n, stamp);

        trace!("{} raw samples, {} written ({})", self.raw.len(), n, mode);
        Ok(n)
    }

    /// Release the sensor handle.
    ///
    /// Closing a closed session is a no-op. The session is closed afterwards
    /// even if the driver reports an error.
    pub fn close(&mut self) -> Result<()> {
        let Some(open) = self.open.take() else {
            return Ok(());
        };

        debug!("closing {}", open.uri);
        self.driver.close(open.handle).map_err(Error::from)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// URI of the open sensor.
    pub fn uri(&self) -> Option<&str> {
        self.open.as_ref().map(|open| open.uri.as_str())
    }

    /// Configuration the open sensor was opened with.
    pub fn config(&self) -> Option<ScanConfig> {
        self.open.as_ref().map(|open| open.config)
    }

    /// Size of the open driver's internal scan buffer.
    ///
    /// Normal-mode reads need a [`MeasurementSet`] at least this large.
    pub fn scan_capacity(&self) -> Option<usize> {
        self.open
            .as_ref()
            .map(|open| self.driver.scan_capacity(&open.handle))
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

impl<D: RangingDriver> Drop for RangingSession<D> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("failed to release handle on drop: {}", err);
        }
    }
}
