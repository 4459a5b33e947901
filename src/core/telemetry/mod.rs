// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

mod sidecar;
pub use sidecar::*;

use std::collections::BTreeMap;
use std::path::Path;

use crate::{ DatasetError, Result };

pub const DEFAULT_DEVICE: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorChannel {
    Accelerometer,
    Gyroscope,
}
impl SensorChannel {
    pub fn stream_key(&self) -> &'static str {
        match self {
            Self::Accelerometer => "ACCL",
            Self::Gyroscope     => "GYRO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub channel: SensorChannel,
    pub values: [f64; 3],
    pub capture_time: f64, // seconds
}

/// Accelerometer and gyroscope readings taken at the same sampling instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuPair {
    pub accl: SensorSample,
    pub gyro: SensorSample,
}
impl ImuPair {
    /// The merge orders pairs by the accelerometer clock.
    pub fn timestamp(&self) -> f64 { self.accl.capture_time }
}

#[derive(Debug, Clone, Default)]
pub struct ImuStreams {
    pub device_name: String,
    pub samples: Vec<ImuPair>,
    pub start_time: f64, // seconds, capture time of the first accelerometer sample
}

impl ImuStreams {
    pub fn from_file<P: AsRef<Path>>(path: P, device: &str) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| DatasetError::InputRead { path: path.display().to_string(), source })?;
        Self::from_slice(&data, device)
    }

    pub fn from_slice(data: &[u8], device: &str) -> Result<Self> {
        // Top level also carries non-device entries such as "frames/second"
        let mut root: BTreeMap<String, serde_json::Value> = serde_json::from_slice(data)?;
        let device_value = root.remove(device).ok_or_else(|| DatasetError::MalformedTelemetry(format!("device \"{device}\" not found")))?;
        let telemetry: DeviceTelemetry = serde_json::from_value(device_value)?;
        Self::from_device(telemetry)
    }

    pub fn from_device(mut telemetry: DeviceTelemetry) -> Result<Self> {
        let accl = telemetry.streams.remove(SensorChannel::Accelerometer.stream_key()).ok_or_else(|| DatasetError::MalformedTelemetry("ACCL stream is missing".into()))?;
        let gyro = telemetry.streams.remove(SensorChannel::Gyroscope.stream_key()).ok_or_else(|| DatasetError::MalformedTelemetry("GYRO stream is missing".into()))?;

        let other_streams: Vec<&String> = telemetry.streams.keys().collect();
        log::info!("Loaded IMU data from {} with other streams {:?}", telemetry.device_name, other_streams);
        log::info!("Using ACCL stream with name {} and unit {} which contains {} samples.", accl.display_name(), accl.display_units(), accl.samples.len());
        log::info!("Using GYRO stream with name {} and unit {} which contains {} samples.", gyro.display_name(), gyro.display_units(), gyro.samples.len());

        let accl = convert_samples(&accl.samples, SensorChannel::Accelerometer)?;
        let gyro = convert_samples(&gyro.samples, SensorChannel::Gyroscope)?;
        if accl.len() != gyro.len() {
            return Err(DatasetError::MalformedTelemetry(format!("ACCL has {} samples but GYRO has {}", accl.len(), gyro.len())));
        }

        let start_time = accl[0].capture_time;
        let samples = accl.into_iter().zip(gyro).map(|(accl, gyro)| ImuPair { accl, gyro }).collect();

        Ok(Self {
            device_name: telemetry.device_name,
            samples,
            start_time,
        })
    }

    pub fn len(&self) -> usize { self.samples.len() }
    pub fn is_empty(&self) -> bool { self.samples.is_empty() }
}

fn convert_samples(raw: &[RawSample], channel: SensorChannel) -> Result<Vec<SensorSample>> {
    let key = channel.stream_key();
    if raw.is_empty() {
        return Err(DatasetError::MalformedTelemetry(format!("{key} stream has no samples")));
    }
    let mut out = Vec::with_capacity(raw.len());
    let mut prev_cts = f64::NEG_INFINITY;
    for (i, s) in raw.iter().enumerate() {
        let values: [f64; 3] = s.value.as_slice().try_into().map_err(|_| {
            DatasetError::MalformedTelemetry(format!("{key} sample {i} has {} values, expected 3", s.value.len()))
        })?;
        if !s.cts.is_finite() || s.cts < prev_cts {
            return Err(DatasetError::MalformedTelemetry(format!("{key} sample {i} goes back in time ({} ms after {} ms)", s.cts, prev_cts)));
        }
        prev_cts = s.cts;
        out.push(SensorSample { channel, values, capture_time: s.cts / 1000.0 });
    }
    Ok(out)
}
