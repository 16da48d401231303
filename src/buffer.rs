// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Pre-allocated measurement buffers.
//!
//! Two buffers flow through every read:
//!
//! ```text
//! ┌───────────────┐     ┌──────────────┐     ┌──────────────────────┐
//! │ RangingDriver │ ──► │   RawScan    │ ──► │   MeasurementSet     │
//! │  (one rev.)   │     │(session-owned│     │  (caller-owned)      │
//! └───────────────┘     │ irregular)   │     │   distance: [f32]?   │
//!                       └──────────────┘     │   sigma:    [f32]?   │
//!                                            │   heading:  [f32]?   │
//!                                            │   quality:  [u8]?    │
//!                                            └──────────────────────┘
//! ```
//!
//! Both use a structure-of-arrays layout and are allocated once, then
//! reused across reads so a polling loop does not allocate.
//!
//! # Example
//!
//! ```
//! use edgefirst_rangingpub::buffer::MeasurementSet;
//!
//! // Only interested in distance and quality
//! let set = MeasurementSet::empty()
//!     .with_distance(720)
//!     .with_quality(360);
//!
//! // The negotiated capacity is the smallest present channel
//! assert_eq!(set.capacity(), Some(360));
//! assert!(set.heading().is_none());
//! ```

use crate::ranging::RangingMeasurement;

/// Raw samples of one revolution as delivered by a driver.
///
/// Angles are ascending radians but neither evenly spaced nor guaranteed to
/// start exactly at zero, and the count varies between revolutions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawScan {
    angle: Vec<f32>,
    distance: Vec<f32>,
    distance_sigma: Vec<f32>,
    quality: Vec<u8>,
}

impl RawScan {
    /// Create an empty scan with room for `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            angle: Vec::with_capacity(capacity),
            distance: Vec::with_capacity(capacity),
            distance_sigma: Vec::with_capacity(capacity),
            quality: Vec::with_capacity(capacity),
        }
    }

    /// Number of samples in the scan.
    #[inline]
    pub fn len(&self) -> usize {
        self.angle.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.angle.is_empty()
    }

    /// Samples the scan can hold without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.angle.capacity()
    }

    /// Drop all samples while retaining capacity.
    #[inline]
    pub fn clear(&mut self) {
        self.angle.clear();
        self.distance.clear();
        self.distance_sigma.clear();
        self.quality.clear();
    }

    /// Reserve room for at least `capacity` samples in total.
    pub fn reserve_total(&mut self, capacity: usize) {
        let additional = capacity.saturating_sub(self.len());
        self.angle.reserve(additional);
        self.distance.reserve(additional);
        self.distance_sigma.reserve(additional);
        self.quality.reserve(additional);
    }

    /// Append one sample.
    #[inline]
    pub fn push(&mut self, angle: f32, distance: f32, distance_sigma: f32, quality: u8) {
        self.angle.push(angle);
        self.distance.push(distance);
        self.distance_sigma.push(distance_sigma);
        self.quality.push(quality);
    }

    #[inline]
    pub fn angle(&self) -> &[f32] {
        &self.angle
    }

    #[inline]
    pub fn distance(&self) -> &[f32] {
        &self.distance
    }

    #[inline]
    pub fn distance_sigma(&self) -> &[f32] {
        &self.distance_sigma
    }

    #[inline]
    pub fn quality(&self) -> &[u8] {
        &self.quality
    }

    /// Sample `i` as a measurement, heading taken from the raw angle.
    #[inline]
    pub fn get(&self, i: usize) -> RangingMeasurement {
        RangingMeasurement {
            distance: self.distance[i],
            distance_sigma: self.distance_sigma[i],
            heading: self.angle[i],
            quality: self.quality[i],
        }
    }

    /// Whether the column lengths agree.
    pub fn is_consistent(&self) -> bool {
        let n = self.angle.len();
        self.distance.len() == n && self.distance_sigma.len() == n && self.quality.len() == n
    }
}

/// Caller-owned output buffer of parallel measurement channels.
///
/// Each channel is optional; a caller not interested in, say, the distance
/// standard deviation simply leaves that channel out and it is never
/// written. The capacity used by a read is the smallest length among the
/// present channels.
///
/// Only the leading [`len`](Self::len) elements of each channel belong to
/// the most recent read. Elements past that are stale and never zeroed.
#[derive(Debug, Clone, Default)]
pub struct MeasurementSet {
    distance: Option<Vec<f32>>,
    distance_sigma: Option<Vec<f32>>,
    heading: Option<Vec<f32>>,
    quality: Option<Vec<u8>>,
    len: usize,
    timestamp: u64,
}

impl MeasurementSet {
    /// Create a set with all four channels of `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::empty()
            .with_distance(capacity)
            .with_distance_sigma(capacity)
            .with_heading(capacity)
            .with_quality(capacity)
    }

    /// Create a set with no channels. Add channels with the `with_*`
    /// builders; reading into a set with no channels fails.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_distance(mut self, capacity: usize) -> Self {
        self.distance = Some(vec![0.0; capacity]);
        self
    }

    pub fn with_distance_sigma(mut self, capacity: usize) -> Self {
        self.distance_sigma = Some(vec![0.0; capacity]);
        self
    }

    pub fn with_heading(mut self, capacity: usize) -> Self {
        self.heading = Some(vec![0.0; capacity]);
        self
    }

    pub fn with_quality(mut self, capacity: usize) -> Self {
        self.quality = Some(vec![0; capacity]);
        self
    }

    /// Negotiated capacity: the minimum length of the present channels.
    ///
    /// Returns `None` when no channel is present.
    pub fn capacity(&self) -> Option<usize> {
        [
            self.distance.as_ref().map(Vec::len),
            self.distance_sigma.as_ref().map(Vec::len),
            self.heading.as_ref().map(Vec::len),
            self.quality.as_ref().map(Vec::len),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Number of leading elements written by the most recent read.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Timestamp in nanoseconds of the scan behind the most recent
    /// non-empty read.
    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Forget the populated samples. Channels keep their contents.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn distance(&self) -> Option<&[f32]> {
        self.distance.as_deref().map(|v| &v[..self.len])
    }

    pub fn distance_sigma(&self) -> Option<&[f32]> {
        self.distance_sigma.as_deref().map(|v| &v[..self.len])
    }

    pub fn heading(&self) -> Option<&[f32]> {
        self.heading.as_deref().map(|v| &v[..self.len])
    }

    pub fn quality(&self) -> Option<&[u8]> {
        self.quality.as_deref().map(|v| &v[..self.len])
    }

    /// Populated sample `i`, absent channels read as zero.
    pub fn get(&self, i: usize) -> Option<RangingMeasurement> {
        if i >= self.len {
            return None;
        }
        Some(RangingMeasurement {
            distance: self.distance.as_ref().map_or(0.0, |v| v[i]),
            distance_sigma: self.distance_sigma.as_ref().map_or(0.0, |v| v[i]),
            heading: self.heading.as_ref().map_or(0.0, |v| v[i]),
            quality: self.quality.as_ref().map_or(0, |v| v[i]),
        })
    }

    /// Iterate over the populated samples.
    pub fn iter(&self) -> impl Iterator<Item = RangingMeasurement> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    /// Number of populated samples with a non-zero quality.
    ///
    /// Returns `len()` when the quality channel is absent.
    pub fn valid_count(&self) -> usize {
        match self.quality() {
            Some(quality) => quality.iter().filter(|&&q| q > 0).count(),
            None => self.len,
        }
    }

    /// Write sample `i` into every present channel.
    ///
    /// The caller guarantees `i` is below the negotiated capacity.
    #[inline]
    pub(crate) fn write(&mut self, i: usize, m: &RangingMeasurement) {
        if let Some(v) = self.distance.as_mut() {
            v[i] = m.distance;
        }
        if let Some(v) = self.distance_sigma.as_mut() {
            v[i] = m.distance_sigma;
        }
        if let Some(v) = self.heading.as_mut() {
            v[i] = m.heading;
        }
        if let Some(v) = self.quality.as_mut() {
            v[i] = m.quality;
        }
    }

    /// Commit a read of `len` samples taken at `timestamp`.
    #[inline]
    pub(crate) fn commit(&mut self, len: usize, timestamp: u64) {
        debug_assert!(self.capacity().is_some_and(|cap| len <= cap));
        self.len = len;
        self.timestamp = timestamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_scan_basic() {
        let mut scan = RawScan::with_capacity(100);
        assert!(scan.is_empty());
        assert!(scan.capacity() >= 100);

        scan.push(0.01, 1.0, 0.01, 80);
        scan.push(0.02, 1.5, 0.02, 0);
        assert_eq!(scan.len(), 2);
        assert!(scan.is_consistent());
        assert_eq!(scan.angle(), &[0.01, 0.02]);
        assert_eq!(scan.quality(), &[80, 0]);

        let m = scan.get(1);
        assert_eq!(m.heading, 0.02);
        assert_eq!(m.distance, 1.5);
        assert!(!m.is_valid());

        scan.clear();
        assert!(scan.is_empty());
        assert!(scan.capacity() >= 100);
    }

    #[test]
    fn test_capacity_is_min_of_present() {
        let set = MeasurementSet::empty()
            .with_distance(500)
            .with_heading(200)
            .with_quality(300);
        assert_eq!(set.capacity(), Some(200));

        let set = MeasurementSet::with_capacity(64);
        assert_eq!(set.capacity(), Some(64));
    }

    #[test]
    fn test_capacity_none_without_channels() {
        assert_eq!(MeasurementSet::empty().capacity(), None);
    }

    #[test]
    fn test_write_and_commit() {
        let mut set = MeasurementSet::empty().with_distance(4).with_quality(4);
        set.write(0, &RangingMeasurement::new(1.0, 0.1, 0.5, 90));
        set.write(1, &RangingMeasurement::invalid(1.0));
        set.commit(2, 42);

        assert_eq!(set.len(), 2);
        assert_eq!(set.timestamp(), 42);
        assert_eq!(set.distance(), Some(&[1.0, 0.0][..]));
        assert_eq!(set.quality(), Some(&[90, 0][..]));
        assert!(set.heading().is_none());
        assert!(set.distance_sigma().is_none());
        assert_eq!(set.valid_count(), 1);

        // Absent channels read as zero
        let m = set.get(0).unwrap();
        assert_eq!(m.heading, 0.0);
        assert_eq!(m.distance_sigma, 0.0);
        assert!(set.get(2).is_none());
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn test_clear_keeps_channels() {
        let mut set = MeasurementSet::with_capacity(3);
        set.write(0, &RangingMeasurement::new(2.0, 0.0, 0.0, 10));
        set.commit(1, 1);
        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.capacity(), Some(3));
        assert_eq!(set.distance(), Some(&[][..]));
    }
}
