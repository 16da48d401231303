// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Recorded scan replay for testing and offline runs.
//!
//! [`ReplayDriver`] reads a JSON-lines file where each line holds one raw
//! revolution as parallel arrays:
//!
//! ```text
//! {"angle":[0.004,0.011,...],"distance":[1.52,1.53,...],"quality":[87,86,...]}
//! ```
//!
//! `distance_sigma` is optional and read as zero when absent. The URI passed
//! to `open` is the file path, with or without a `file://` prefix.
//!
//! # Example
//!
//! ```ignore
//! use edgefirst_rangingpub::{RangingSession, SensorModel, replay::ReplayDriver};
//!
//! let mut session = RangingSession::new(ReplayDriver::new(true));
//! session.open("file:///data/rplidar_office.jsonl", SensorModel::Rplidar.into())?;
//! ```

use crate::{
    buffer::RawScan,
    ranging::{DriverStatus, Error, QUALITY_MAX, RangingDriver, Result, ScanConfig},
};
use serde::{Deserialize, Serialize};
use std::{
    f32::consts::TAU,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};
use tracing::{debug, warn};

const URI_SCHEME: &str = "file://";

/// One recorded revolution.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub angle: Vec<f32>,
    pub distance: Vec<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distance_sigma: Vec<f32>,
    pub quality: Vec<u8>,
}

impl ScanRecord {
    fn validate(&self) -> std::result::Result<(), String> {
        let n = self.angle.len();
        if self.distance.len() != n || self.quality.len() != n {
            return Err(format!(
                "column lengths differ: angle {}, distance {}, quality {}",
                n,
                self.distance.len(),
                self.quality.len()
            ));
        }
        if !self.distance_sigma.is_empty() && self.distance_sigma.len() != n {
            return Err(format!(
                "distance_sigma has {} entries, expected {}",
                self.distance_sigma.len(),
                n
            ));
        }
        if let Some(angle) = self.angle.iter().find(|a| !(0.0..TAU).contains(*a)) {
            return Err(format!("angle {} outside [0, 2π)", angle));
        }
        if self.angle.windows(2).any(|w| w[0] > w[1]) {
            return Err("angles are not ascending".to_string());
        }
        if let Some(quality) = self.quality.iter().find(|&&q| q > QUALITY_MAX) {
            return Err(format!("quality {} above {}", quality, QUALITY_MAX));
        }
        Ok(())
    }

    fn fill(&self, scan: &mut RawScan) {
        for i in 0..self.angle.len() {
            let sigma = self.distance_sigma.get(i).copied().unwrap_or(0.0);
            scan.push(self.angle[i], self.distance[i], sigma, self.quality[i]);
        }
    }
}

impl From<&RawScan> for ScanRecord {
    fn from(scan: &RawScan) -> Self {
        Self {
            angle: scan.angle().to_vec(),
            distance: scan.distance().to_vec(),
            distance_sigma: scan.distance_sigma().to_vec(),
            quality: scan.quality().to_vec(),
        }
    }
}

/// Handle of an open replay.
#[derive(Debug)]
pub struct ReplayHandle {
    scans: Vec<ScanRecord>,
    index: usize,
    capacity: usize,
}

impl ReplayHandle {
    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    /// Index of the next scan to be returned.
    pub fn current_index(&self) -> usize {
        self.index
    }
}

/// Driver replaying scans recorded to a JSON-lines file.
#[derive(Debug, Default)]
pub struct ReplayDriver {
    looping: bool,
}

impl ReplayDriver {
    /// Create a replay driver. A looping replay restarts from the first scan
    /// when exhausted; otherwise it reports would-block from then on.
    pub fn new(looping: bool) -> Self {
        Self { looping }
    }

    /// Parse a JSON-lines recording. Blank lines are skipped.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<ScanRecord>> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut scans = Vec::new();

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ScanRecord = serde_json::from_str(&line)?;
            record
                .validate()
                .map_err(|msg| Error::Config(format!("line {}: {}", lineno + 1, msg)))?;
            scans.push(record);
        }

        Ok(scans)
    }
}

impl RangingDriver for ReplayDriver {
    type Handle = ReplayHandle;

    fn open(&mut self, uri: &str, _config: &ScanConfig) -> Result<ReplayHandle, DriverStatus> {
        let path = uri.strip_prefix(URI_SCHEME).unwrap_or(uri);
        let scans = Self::load(path).map_err(|err| {
            warn!("cannot replay {}: {}", path, err);
            DriverStatus::InvalidArgument
        })?;

        let capacity = scans.iter().map(|s| s.angle.len()).max().unwrap_or(0);
        debug!("loaded {} scans from {}, largest {}", scans.len(), path, capacity);

        Ok(ReplayHandle {
            scans,
            index: 0,
            capacity,
        })
    }

    fn read_scan(
        &mut self,
        handle: &mut ReplayHandle,
        scan: &mut RawScan,
    ) -> Result<(), DriverStatus> {
        if handle.index >= handle.scans.len() {
            if !self.looping || handle.scans.is_empty() {
                return Err(DriverStatus::WouldBlock);
            }
            handle.index = 0;
        }

        handle.scans[handle.index].fill(scan);
        handle.index += 1;
        Ok(())
    }

    fn close(&mut self, _handle: ReplayHandle) -> Result<(), DriverStatus> {
        Ok(())
    }

    fn scan_capacity(&self, handle: &ReplayHandle) -> usize {
        handle.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranging::SensorModel;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn recording(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn open(driver: &mut ReplayDriver, file: &NamedTempFile) -> ReplayHandle {
        let uri = format!("file://{}", file.path().display());
        driver
            .open(&uri, &ScanConfig::from(SensorModel::Rplidar))
            .unwrap()
    }

    #[test]
    fn test_load_and_replay() {
        let file = recording(&[
            concat!(
                r#"{"angle":[0.1,0.2],"distance":[1.0,2.0],"#,
                r#""distance_sigma":[0.01,0.02],"quality":[50,60]}"#
            ),
            "",
            r#"{"angle":[0.05,0.15,0.25],"distance":[1.1,1.2,1.3],"quality":[40,0,30]}"#,
        ]);
        let mut driver = ReplayDriver::new(false);
        let mut handle = open(&mut driver, &file);
        assert_eq!(handle.len(), 2);
        assert_eq!(driver.scan_capacity(&handle), 3);

        let mut scan = RawScan::default();
        driver.read_scan(&mut handle, &mut scan).unwrap();
        assert_eq!(scan.distance_sigma(), &[0.01, 0.02]);

        scan.clear();
        driver.read_scan(&mut handle, &mut scan).unwrap();
        assert_eq!(scan.len(), 3);
        assert_eq!(scan.distance_sigma(), &[0.0, 0.0, 0.0]);
        assert_eq!(scan.quality(), &[40, 0, 30]);

        scan.clear();
        assert_eq!(
            driver.read_scan(&mut handle, &mut scan),
            Err(DriverStatus::WouldBlock)
        );
    }

    #[test]
    fn test_looping_replay() {
        let file = recording(&[r#"{"angle":[0.1],"distance":[1.0],"quality":[50]}"#]);
        let mut driver = ReplayDriver::new(true);
        let mut handle = open(&mut driver, &file);
        let mut scan = RawScan::default();

        for _ in 0..3 {
            scan.clear();
            driver.read_scan(&mut handle, &mut scan).unwrap();
            assert_eq!(scan.distance(), &[1.0]);
        }
        assert_eq!(handle.current_index(), 1);
    }

    #[test]
    fn test_load_rejects_inconsistent_columns() {
        let file = recording(&[
            r#"{"angle":[0.1],"distance":[1.0],"quality":[50]}"#,
            r#"{"angle":[0.1,0.2],"distance":[1.0],"quality":[50,50]}"#,
        ]);
        let err = ReplayDriver::load(file.path()).unwrap_err();
        match err {
            Error::Config(msg) => assert!(msg.starts_with("line 2")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_load_rejects_descending_angles() {
        let file = recording(&[r#"{"angle":[0.2,0.1],"distance":[1.0,1.0],"quality":[5,5]}"#]);
        assert!(matches!(
            ReplayDriver::load(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_rejects_angle_out_of_range() {
        let file = recording(&[
            r#"{"angle":[0.1,0.2],"distance":[1.0,1.0],"quality":[5,5]}"#,
            r#"{"angle":[6.0,6.5],"distance":[1.0,1.0],"quality":[5,5]}"#,
        ]);
        match ReplayDriver::load(file.path()).unwrap_err() {
            Error::Config(msg) => assert!(msg.starts_with("line 2")),
            other => panic!("unexpected error: {}", other),
        }

        let file = recording(&[r#"{"angle":[-0.1,0.2],"distance":[1.0,1.0],"quality":[5,5]}"#]);
        assert!(matches!(
            ReplayDriver::load(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_rejects_quality_above_max() {
        let file = recording(&[r#"{"angle":[0.1,0.2],"distance":[1.0,1.0],"quality":[50,101]}"#]);
        match ReplayDriver::load(file.path()).unwrap_err() {
            Error::Config(msg) => {
                assert!(msg.starts_with("line 1"));
                assert!(msg.contains("101"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_load_malformed_json() {
        let file = recording(&["not json"]);
        assert!(matches!(
            ReplayDriver::load(file.path()),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let mut driver = ReplayDriver::new(false);
        let result = driver.open(
            "file:///nonexistent/scan.jsonl",
            &ScanConfig::SamplesPerScan(360),
        );
        assert_eq!(result.unwrap_err(), DriverStatus::InvalidArgument);
    }

    #[test]
    fn test_record_from_raw_scan() {
        let mut scan = RawScan::default();
        scan.push(0.1, 1.0, 0.01, 50);
        let record = ScanRecord::from(&scan);
        let json = serde_json::to_string(&record).unwrap();
        let back: ScanRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
