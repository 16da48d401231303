// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Measurement normalization policies.
//!
//! A driver hands back one revolution of raw samples at irregular angles.
//! Depending on the [`RangingMeasurementMode`] a read either copies them
//! through unchanged ([`copy_raw`]) or resamples them onto a fixed grid of
//! `n` headings at `k * 2π / n` ([`resample`]).
//!
//! # Resampling
//!
//! For each target heading the bracketing pair of raw samples is found,
//! wrapping across the 0/2π seam when the target lies before the first or
//! after the last raw angle. The pair then decides the output:
//!
//! | Bracket | Output |
//! |---|---|
//! | angular gap > `max_angle` | invalid (quality 0, distance 0) |
//! | either endpoint invalid | nearest endpoint, invalid if that one is |
//! | distance difference > `max_distance` | nearest endpoint |
//! | otherwise | linear interpolation |
//!
//! The nearest endpoint is the one whose angle is closer to the target,
//! ties going to the lower angle. Distance, sigma and quality are all taken
//! from that endpoint. A raw sample lying exactly on a target heading is
//! copied without consulting the bracket.

use crate::{
    buffer::{MeasurementSet, RawScan},
    ranging::{
        Error, QUALITY_INVALID, RangingMeasurement, RangingMeasurementMode, Result, Tolerance,
    },
};
use std::f32::consts::TAU;

/// Heading of target sample `k` out of `n`, in radians.
///
/// Heading 0 is exactly zero.
#[inline]
pub fn target_heading(k: usize, n: usize) -> f32 {
    (std::f64::consts::TAU * k as f64 / n as f64) as f32
}

/// Negotiated capacity of `out`, failing when no channel is present.
fn capacity(out: &MeasurementSet) -> Result<usize> {
    out.capacity()
        .ok_or_else(|| Error::InvalidArgument("no output channel present".to_string()))
}

/// Apply `mode` to `raw`, writing into the leading elements of `out`.
///
/// Returns the number of samples written. Nothing is written on error.
/// The caller commits the length to `out`.
pub fn normalize(
    mode: RangingMeasurementMode,
    raw: &RawScan,
    out: &mut MeasurementSet,
    tolerance: &Tolerance,
) -> Result<usize> {
    match mode {
        RangingMeasurementMode::Normal => copy_raw(raw, out),
        RangingMeasurementMode::Interpolated => resample(raw, out, tolerance),
    }
}

/// Copy raw samples through unchanged.
///
/// Fails with [`Error::BufferTooSmall`] if the scan does not fit in the
/// capacity of `out`.
pub fn copy_raw(raw: &RawScan, out: &mut MeasurementSet) -> Result<usize> {
    let capacity = capacity(out)?;
    if raw.len() > capacity {
        return Err(Error::BufferTooSmall {
            required: raw.len(),
            capacity,
        });
    }

    for i in 0..raw.len() {
        out.write(i, &raw.get(i));
    }

    Ok(raw.len())
}

/// Resample `raw` onto `n` evenly spaced headings, `n` being the capacity
/// of `out`.
///
/// Always writes exactly `n` samples. An empty raw scan yields `n` invalid
/// samples.
pub fn resample(raw: &RawScan, out: &mut MeasurementSet, tolerance: &Tolerance) -> Result<usize> {
    let n = capacity(out)?;
    let angles = raw.angle();
    let m = angles.len();

    if m == 0 {
        for k in 0..n {
            out.write(k, &RangingMeasurement::invalid(target_heading(k, n)));
        }
        return Ok(n);
    }

    // Both sequences ascend so a single forward sweep finds every bracket.
    // `hi` is the first raw sample strictly above the current target.
    let mut hi = 0;
    for k in 0..n {
        let target = target_heading(k, n);
        while hi < m && angles[hi] <= target {
            hi += 1;
        }

        let sample = if hi > 0 && angles[hi - 1] == target {
            RangingMeasurement {
                heading: target,
                ..raw.get(hi - 1)
            }
        } else {
            let (lo_idx, lo_angle, hi_idx, hi_angle) = bracket(angles, hi);
            sample_between(
                target,
                lo_angle,
                &raw.get(lo_idx),
                hi_angle,
                &raw.get(hi_idx),
                tolerance,
            )
        };

        out.write(k, &sample);
    }

    Ok(n)
}

/// Bracketing pair around a target given the index of the first raw angle
/// above it. Angles are unwrapped so that `lo_angle < hi_angle`.
#[inline]
fn bracket(angles: &[f32], hi: usize) -> (usize, f32, usize, f32) {
    let last = angles.len() - 1;
    if hi == 0 {
        (last, angles[last] - TAU, 0, angles[0])
    } else if hi > last {
        (last, angles[last], 0, angles[0] + TAU)
    } else {
        (hi - 1, angles[hi - 1], hi, angles[hi])
    }
}

/// Decide the output sample at `target` from its bracketing pair.
pub fn sample_between(
    target: f32,
    lo_angle: f32,
    lo: &RangingMeasurement,
    hi_angle: f32,
    hi: &RangingMeasurement,
    tolerance: &Tolerance,
) -> RangingMeasurement {
    let gap = hi_angle - lo_angle;
    if gap > tolerance.max_angle || gap <= 0.0 {
        return RangingMeasurement::invalid(target);
    }

    let nearest = if target - lo_angle <= hi_angle - target {
        lo
    } else {
        hi
    };
    let snapped = || {
        if nearest.is_valid() {
            RangingMeasurement {
                heading: target,
                ..*nearest
            }
        } else {
            RangingMeasurement::invalid(target)
        }
    };

    if !lo.is_valid() || !hi.is_valid() {
        return snapped();
    }

    if (hi.distance - lo.distance).abs() > tolerance.max_distance {
        return snapped();
    }

    let t = (target - lo_angle) / gap;
    let quality = lerp(lo.quality as f32, hi.quality as f32, t).round() as u8;

    RangingMeasurement {
        distance: lerp(lo.distance, hi.distance, t),
        distance_sigma: lerp(lo.distance_sigma, hi.distance_sigma, t),
        heading: target,
        quality: quality.max(QUALITY_INVALID + 1),
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    t.mul_add(b - a, a)
}
