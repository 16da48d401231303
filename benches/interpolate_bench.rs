// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Benchmarks for scan normalization.
//!
//! Measures:
//! - Resampling onto the RPLIDAR and Leishen heading grids
//! - Normal-mode copy of a raw revolution
//! - A full session read against the simulated sensor
//!
//! Run with: cargo bench --bench interpolate_bench
//!
//! For on-target profiling, cross-compile and run:
//!   cargo bench --bench interpolate_bench --target aarch64-unknown-linux-gnu

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use edgefirst_rangingpub::{
    MeasurementSet, RangingMeasurementMode, RangingSession, RawScan, ScanConfig, Tolerance,
    interpolate::{copy_raw, resample},
    sim::SimulatedDriver,
};
use std::{f32::consts::TAU, time::Duration};

/// Generate a revolution of `m` samples at slightly irregular angles.
///
/// Every 25th sample is a dropout and distances step every 40 samples so
/// that all resampling branches are exercised.
fn generate_scan(m: usize) -> RawScan {
    let mut scan = RawScan::with_capacity(m);
    let step = TAU / m as f32;

    for i in 0..m {
        let jitter = 0.2 * step * (i as f32 * 1.7).sin();
        let angle = (i as f32 + 0.5) * step + jitter;
        let distance = 1.0 + 0.5 * ((i / 40) % 3) as f32;
        let quality = if i % 25 == 0 { 0 } else { 80 };
        scan.push(angle, distance, 0.01, quality);
    }

    scan
}

/// Benchmark resampling for the common sensor grids.
fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");
    let tolerance = Tolerance::default();

    // RPLIDAR and Leishen M10P/MS10 defaults
    for &(m, n) in &[(1600, 1680), (1000, 1008), (500, 1008)] {
        let scan = generate_scan(m);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(
            BenchmarkId::new(format!("raw{}", m), n),
            &scan,
            |b, scan| {
                let mut out = MeasurementSet::with_capacity(n);
                b.iter(|| resample(scan, &mut out, &tolerance));
            },
        );
    }

    group.finish();
}

/// Benchmark the normal-mode passthrough.
fn bench_copy_raw(c: &mut Criterion) {
    let mut group = c.benchmark_group("copy_raw");

    for &m in &[1008, 1680] {
        let scan = generate_scan(m);

        group.throughput(Throughput::Elements(m as u64));
        group.bench_with_input(BenchmarkId::new("samples", m), &scan, |b, scan| {
            let mut out = MeasurementSet::with_capacity(m);
            b.iter(|| copy_raw(scan, &mut out));
        });
    }

    group.finish();
}

/// Benchmark a full read, including the simulated driver's scan generation.
fn bench_session_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_read");
    let tolerance = Tolerance::default();

    for mode in [
        RangingMeasurementMode::Normal,
        RangingMeasurementMode::Interpolated,
    ] {
        group.bench_function(mode.to_string(), |b| {
            let driver = SimulatedDriver::new(3).with_period(Duration::ZERO);
            let mut session = RangingSession::new(driver);
            if let Err(err) = session.open("sim://bench", ScanConfig::SamplesPerScan(1008)) {
                panic!("failed to open simulator: {}", err);
            }
            let capacity = session.scan_capacity().unwrap_or(1008).max(1008);
            let mut out = MeasurementSet::with_capacity(capacity);

            b.iter(|| session.read(mode, &tolerance, &mut out));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resample, bench_copy_raw, bench_session_read);
criterion_main!(benches);
