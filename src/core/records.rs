// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

use std::io::Write;
use serde::Serialize;

use crate::camera::CameraCalibration;
use crate::telemetry::{ SensorChannel, SensorSample };
use crate::{ DatasetError, Result };

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SensorReading {
    #[serde(rename = "type")]
    pub kind: SensorChannel,
    pub values: [f64; 3],
}

/// `{"sensor":{"type":"accelerometer","values":[x,y,z]},"time":t}`
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SensorLine {
    pub sensor: SensorReading,
    pub time: f64,
}
impl From<&SensorSample> for SensorLine {
    fn from(s: &SensorSample) -> Self {
        Self {
            sensor: SensorReading { kind: s.channel, values: s.values },
            time: s.capture_time,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct CameraFrame<'a> {
    #[serde(flatten)]
    pub calibration: &'a CameraCalibration,
    pub time: f64,
}

/// `{"frames":[{"cameraInd":0,"cameraParameters":{..},"imuToCamera":[..],"time":t}],"number":n,"time":t}`
#[derive(Serialize, Debug, Clone)]
pub struct FrameLine<'a> {
    pub frames: Vec<CameraFrame<'a>>,
    pub number: usize,
    pub time: f64,
}
impl<'a> FrameLine<'a> {
    pub fn new(number: usize, time: f64, calibration: &'a CameraCalibration) -> Self {
        Self {
            frames: vec![CameraFrame { calibration, time }],
            number,
            time,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(untagged)]
pub enum OutputRecord<'a> {
    Sensor(SensorLine),
    Frame(FrameLine<'a>),
}

pub trait RecordSink {
    fn emit(&mut self, record: &OutputRecord) -> Result<()>;
}

/// Writes each record as one JSON line, in the order it was emitted.
pub struct RecordWriter<W: Write> {
    out: W,
    lines: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, lines: 0 }
    }

    pub fn lines(&self) -> usize { self.lines }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> RecordSink for RecordWriter<W> {
    fn emit(&mut self, record: &OutputRecord) -> Result<()> {
        serde_json::to_writer(&mut self.out, record).map_err(|e| {
            if e.is_io() { DatasetError::IoWrite(e.into()) } else { DatasetError::Json(e) }
        })?;
        self.out.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }
}
