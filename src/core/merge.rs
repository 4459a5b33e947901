// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

use crate::camera::CameraCalibration;
use crate::frame_source::FrameEvent;
use crate::records::{ FrameLine, OutputRecord, RecordSink };
use crate::telemetry::{ ImuPair, ImuStreams };
use crate::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MergeSummary {
    pub frames: usize,
    pub samples_emitted: usize,
    pub samples_dropped: usize,
    pub last_frame_time: Option<f64>,
}

/// Interleaves IMU samples with video frames on the telemetry clock.
///
/// For every frame, all pending sample pairs captured at or before the frame time are emitted
/// (accelerometer first, then gyroscope), followed by the frame line itself.
/// Samples captured after the last frame are never emitted.
pub struct TemporalMerger<'a, S: RecordSink> {
    samples: &'a [ImuPair],
    start_time: f64,
    calibration: &'a CameraCalibration,
    sink: S,
    next_sample: usize,
    frames: usize,
    last_frame_time: Option<f64>,
}

impl<'a, S: RecordSink> TemporalMerger<'a, S> {
    pub fn new(imu: &'a ImuStreams, calibration: &'a CameraCalibration, sink: S) -> Self {
        Self::with_samples(&imu.samples, imu.start_time, calibration, sink)
    }

    pub fn with_samples(samples: &'a [ImuPair], start_time: f64, calibration: &'a CameraCalibration, sink: S) -> Self {
        Self {
            samples,
            start_time,
            calibration,
            sink,
            next_sample: 0,
            frames: 0,
            last_frame_time: None,
        }
    }

    /// Absolute time of a frame on the telemetry clock.
    pub fn frame_time(&self, frame: &FrameEvent) -> f64 {
        self.start_time + frame.presentation_time
    }

    pub fn push_frame(&mut self, frame: &FrameEvent) -> Result<f64> {
        let frame_time = self.frame_time(frame);

        while let Some(pair) = self.samples.get(self.next_sample) {
            if pair.timestamp() > frame_time {
                break;
            }
            self.sink.emit(&OutputRecord::Sensor((&pair.accl).into()))?;
            self.sink.emit(&OutputRecord::Sensor((&pair.gyro).into()))?;
            self.next_sample += 1;
        }

        self.sink.emit(&OutputRecord::Frame(FrameLine::new(frame.index, frame_time, self.calibration)))?;
        self.frames += 1;
        self.last_frame_time = Some(frame_time);
        Ok(frame_time)
    }

    pub fn merge<I: IntoIterator<Item = FrameEvent>>(&mut self, frames: I) -> Result<()> {
        for frame in frames {
            self.push_frame(&frame)?;
        }
        Ok(())
    }

    pub fn summary(&self) -> MergeSummary {
        MergeSummary {
            frames: self.frames,
            samples_emitted: self.next_sample,
            samples_dropped: self.samples.len() - self.next_sample,
            last_frame_time: self.last_frame_time,
        }
    }

    pub fn finish(self) -> (S, MergeSummary) {
        let summary = self.summary();
        log::info!("Merged {} frames with {} IMU samples", summary.frames, summary.samples_emitted);
        if summary.samples_dropped > 0 {
            // Trailing samples are not flushed after the last frame
            log::warn!("{} IMU samples after the last frame ({:.3}s) were dropped", summary.samples_dropped, summary.last_frame_time.unwrap_or(self.start_time));
        }
        (self.sink, summary)
    }
}
