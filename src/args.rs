// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::{Parser, ValueEnum};
use edgefirst_rangingpub::{
    RangingDistance, RangingMeasurementMode, ScanConfig, SensorModel, Tolerance,
};
use serde_json::json;
use tracing::level_filters::LevelFilter;
use zenoh::config::{Config, WhatAmI};

/// Backend used to reach the sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum DriverKind {
    /// Simulated sensor in a rectangular room
    #[default]
    Sim,
    /// Replay of a recorded JSON-lines scan file
    Replay,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Sensor URI.  For the simulator any "sim://" URI, for replay the path
    /// of the recording with an optional "file://" prefix.
    #[arg(env, default_value = "sim://room")]
    pub target: String,

    /// Driver backend
    #[arg(long, env, value_enum, default_value_t = DriverKind::Sim)]
    pub driver: DriverKind,

    /// Scanning sensor model, selects the default samples per scan
    #[arg(long, env, value_enum, default_value_t = SensorModel::Rplidar)]
    pub model: SensorModel,

    /// Samples per scan, overrides the model default
    #[arg(long, env)]
    pub samples_per_scan: Option<usize>,

    /// Open as a single-beam sensor with this range preset
    #[arg(long, env, value_enum)]
    pub distance: Option<RangingDistance>,

    /// Measurement mode applied to each scan
    #[arg(long, env, value_enum, default_value_t = RangingMeasurementMode::Interpolated)]
    pub measurement_mode: RangingMeasurementMode,

    /// Largest distance step in metres that is still interpolated
    #[arg(long, env, default_value = "0.1")]
    pub max_interpolated_distance: f32,

    /// Largest angular gap in degrees that is still interpolated
    #[arg(long, env, default_value = "2.0")]
    pub max_interpolated_angle: f32,

    /// Polling period in milliseconds
    #[arg(long, env, default_value = "50")]
    pub period_ms: u64,

    /// Simulator revolution period in milliseconds
    #[arg(long, env, default_value = "100")]
    pub scan_period_ms: u64,

    /// Simulator random seed
    #[arg(long, env, default_value = "0")]
    pub seed: u64,

    /// Restart the replay when the recording is exhausted
    #[arg(long, env)]
    pub loop_replay: bool,

    /// ranges topic
    #[arg(long, env, default_value = "rt/lidar/ranges")]
    pub ranges_topic: String,

    /// Application log level
    #[arg(long, env, default_value = "info")]
    pub rust_log: LevelFilter,

    /// zenoh connection mode
    #[arg(long, env, default_value = "peer")]
    mode: WhatAmI,

    /// connect to zenoh endpoints
    #[arg(long, env)]
    connect: Vec<String>,

    /// listen to zenoh endpoints
    #[arg(long, env)]
    listen: Vec<String>,

    /// disable zenoh multicast scouting
    #[arg(long, env)]
    no_multicast_scouting: bool,
}

impl Args {
    /// Open-time configuration selected by the arguments.
    pub fn scan_config(&self) -> ScanConfig {
        match self.distance {
            Some(distance) => ScanConfig::Distance(distance),
            None => ScanConfig::SamplesPerScan(
                self.samples_per_scan
                    .unwrap_or_else(|| self.model.default_samples_per_scan()),
            ),
        }
    }

    pub fn tolerance(&self) -> Tolerance {
        Tolerance::new(
            self.max_interpolated_distance,
            self.max_interpolated_angle.to_radians(),
        )
    }
}

impl TryFrom<&Args> for Config {
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        let mut config = Config::default();

        config.insert_json5("mode", &json!(args.mode).to_string())?;

        if !args.connect.is_empty() {
            config.insert_json5("connect/endpoints", &json!(args.connect).to_string())?;
        }

        if !args.listen.is_empty() {
            config.insert_json5("listen/endpoints", &json!(args.listen).to_string())?;
        }

        if args.no_multicast_scouting {
            config.insert_json5("scouting/multicast/enabled", &json!(false).to_string())?;
        }

        config.insert_json5("scouting/multicast/interface", &json!("lo").to_string())?;

        Ok(config)
    }
}
