// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

mod args;

use args::{Args, DriverKind};
use clap::Parser as _;
use edgefirst_rangingpub::{
    Error, MeasurementSet, RangingDriver, RangingMeasurementMode, RangingSession, ScanConfig,
    replay::ReplayDriver, sim::SimulatedDriver,
};
use serde::Serialize;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};
use zenoh::{
    bytes::{Encoding, ZBytes},
    pubsub::Publisher,
    qos::{CongestionControl, Priority},
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// JSON payload published for each scan.
#[derive(Serialize)]
struct RangesMessage<'a> {
    timestamp: u64,
    mode: RangingMeasurementMode,
    count: usize,
    valid: usize,
    distance: Option<&'a [f32]>,
    distance_sigma: Option<&'a [f32]>,
    heading: Option<&'a [f32]>,
    quality: Option<&'a [u8]>,
}

impl<'a> RangesMessage<'a> {
    fn new(set: &'a MeasurementSet, mode: RangingMeasurementMode) -> Self {
        Self {
            timestamp: set.timestamp(),
            mode,
            count: set.len(),
            valid: set.valid_count(),
            distance: set.distance(),
            distance_sigma: set.distance_sigma(),
            heading: set.heading(),
            quality: set.quality(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.rust_log)
        .init();

    let session = zenoh::open(zenoh::config::Config::try_from(&args)?).await?;
    let publisher = match session
        .declare_publisher(args.ranges_topic.clone())
        .priority(Priority::DataHigh)
        .congestion_control(CongestionControl::Drop)
        .await
    {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to create publisher {}: {:?}", args.ranges_topic, e);
            return Err(e);
        }
    };
    debug!("declared publisher on {}", args.ranges_topic);

    match args.driver {
        DriverKind::Sim => {
            let driver = SimulatedDriver::new(args.seed)
                .with_period(Duration::from_millis(args.scan_period_ms));
            poll(RangingSession::new(driver), &args, &publisher).await
        }
        DriverKind::Replay => {
            let driver = ReplayDriver::new(args.loop_replay);
            poll(RangingSession::new(driver), &args, &publisher).await
        }
    }
}

/// Output capacity for the configured mode.
///
/// Interpolated reads return one sample per configured heading; normal
/// reads need room for the driver's whole internal scan.
fn output_capacity<D: RangingDriver>(session: &RangingSession<D>, args: &Args) -> usize {
    match (args.measurement_mode, args.scan_config()) {
        (RangingMeasurementMode::Interpolated, ScanConfig::SamplesPerScan(n)) => n,
        (RangingMeasurementMode::Interpolated, ScanConfig::Distance(_)) => 1,
        (RangingMeasurementMode::Normal, _) => session.scan_capacity().unwrap_or(1).max(1),
    }
}

async fn poll<D: RangingDriver>(
    mut session: RangingSession<D>,
    args: &Args,
    publisher: &Publisher<'_>,
) -> Result<(), BoxError> {
    session.open(&args.target, args.scan_config())?;
    info!(
        "opened {} ({:?}, {} mode)",
        args.target,
        args.scan_config(),
        args.measurement_mode
    );

    let tolerance = args.tolerance();
    let mut set = MeasurementSet::with_capacity(output_capacity(&session, args));
    let mut interval = tokio::time::interval(Duration::from_millis(args.period_ms.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Single listener across iterations, signals during read or put stay pending
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut ctrl_c => {
                info!("interrupted, closing {}", args.target);
                break;
            }
        }

        match session.read(args.measurement_mode, &tolerance, &mut set) {
            Ok(0) => trace!("no scan ready"),
            Ok(n) => {
                debug!("{} samples, {} valid", n, set.valid_count());
                let msg = serde_json::to_vec(&RangesMessage::new(&set, args.measurement_mode))?;
                match publisher
                    .put(ZBytes::from(msg))
                    .encoding(Encoding::APPLICATION_JSON)
                    .await
                {
                    Ok(_) => trace!("{} message sent", args.ranges_topic),
                    Err(e) => error!("{} message error: {:?}", args.ranges_topic, e),
                }
            }
            Err(Error::BufferTooSmall { required, capacity }) => {
                warn!(
                    "scan of {} samples exceeds buffer of {}, growing",
                    required, capacity
                );
                set = MeasurementSet::with_capacity(required);
            }
            Err(err) => {
                error!("read failed: {}", err);
                return Err(err.into());
            }
        }
    }

    session.close()?;
    Ok(())
}
