// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

use std::fs::File;
use std::io::BufWriter;
use std::path::{ Path, PathBuf };

use crate::core::{ CameraCalibration, FrameEvent, ImuStreams, MergeSummary, RecordWriter, Result, TemporalMerger };
use crate::core::{ OUTPUT_JSONL_NAME, OUTPUT_VIDEO_NAME };

/// Produces the frame timing for the merge and writes the output video.
pub trait Transcoder {
    /// Best-effort number of frames, 0 if unknown.
    fn frame_count_hint(&self) -> usize;

    /// Calls `on_frame` once per frame, in presentation order.
    fn run(&mut self, on_frame: &mut dyn FnMut(FrameEvent) -> Result<()>) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub video: PathBuf,
    pub jsonl: PathBuf,
}
impl OutputPaths {
    pub fn create(output_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir)?;
        Ok(Self {
            video: output_dir.join(OUTPUT_VIDEO_NAME),
            jsonl: output_dir.join(OUTPUT_JSONL_NAME),
        })
    }
}

pub fn convert<T: Transcoder + ?Sized, F: FnMut(usize)>(imu: &ImuStreams, calibration: &CameraCalibration, jsonl_path: &Path, transcoder: &mut T, mut progress: F) -> Result<MergeSummary> {
    let file = File::create(jsonl_path)?;
    let mut merger = TemporalMerger::new(imu, calibration, RecordWriter::new(BufWriter::new(file)));

    transcoder.run(&mut |frame| {
        merger.push_frame(&frame)?;
        progress(frame.index + 1);
        Ok(())
    })?;

    let (writer, summary) = merger.finish();
    log::info!("Wrote {} lines to {}", writer.lines(), jsonl_path.display());
    writer.finish()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DatasetError;
    use crate::core::telemetry::DEFAULT_DEVICE;

    struct FixedFrames(Vec<f64>);
    impl Transcoder for FixedFrames {
        fn frame_count_hint(&self) -> usize { self.0.len() }
        fn run(&mut self, on_frame: &mut dyn FnMut(FrameEvent) -> Result<()>) -> Result<()> {
            for (index, &presentation_time) in self.0.iter().enumerate() {
                on_frame(FrameEvent { index, presentation_time, width: 1920, height: 1080 })?;
            }
            Ok(())
        }
    }

    struct FailingTranscoder;
    impl Transcoder for FailingTranscoder {
        fn frame_count_hint(&self) -> usize { 0 }
        fn run(&mut self, on_frame: &mut dyn FnMut(FrameEvent) -> Result<()>) -> Result<()> {
            on_frame(FrameEvent { index: 0, presentation_time: 0.0, width: 4, height: 4 })?;
            Err(DatasetError::ExternalTool { tool: "ffmpeg".into(), status: "exit status: 1".into() })
        }
    }

    const TELEMETRY: &str = r#"{
        "1": {
            "device name": "HERO9 Black",
            "streams": {
                "ACCL": { "name": "Accelerometer", "units": "m/s2", "samples": [
                    { "cts": 10000, "value": [0.1, 9.8, 0.2] }, { "cts": 10200, "value": [0.1, 9.8, 0.2] },
                    { "cts": 10600, "value": [0.1, 9.8, 0.2] }, { "cts": 11100, "value": [0.1, 9.8, 0.2] }
                ] },
                "GYRO": { "name": "Gyroscope", "units": "rad/s", "samples": [
                    { "cts": 10000, "value": [0.01, 0.02, 0.03] }, { "cts": 10200, "value": [0.01, 0.02, 0.03] },
                    { "cts": 10600, "value": [0.01, 0.02, 0.03] }, { "cts": 11100, "value": [0.01, 0.02, 0.03] }
                ] }
            }
        }
    }"#;

    #[test]
    fn writes_dataset_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::create(&dir.path().join("nested/out")).unwrap();
        assert_eq!(paths.jsonl.file_name().unwrap(), "data.jsonl");
        assert_eq!(paths.video.file_name().unwrap(), "data.mp4");

        let imu = ImuStreams::from_slice(TELEMETRY.as_bytes(), DEFAULT_DEVICE).unwrap();
        let mut progress = Vec::new();
        let summary = convert(&imu, &CameraCalibration::default(), &paths.jsonl, &mut FixedFrames(vec![0.0, 0.5, 1.0]), |n| progress.push(n)).unwrap();

        assert_eq!(progress, [1, 2, 3]);
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.samples_dropped, 1);

        let text = std::fs::read_to_string(&paths.jsonl).unwrap();
        let lines: Vec<serde_json::Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0]["sensor"]["type"], "accelerometer");
        assert_eq!(lines[1]["sensor"]["type"], "gyroscope");
        assert_eq!(lines[2]["number"], 0);
        assert_eq!(lines[8]["time"], 11.0);
    }

    #[test]
    fn transcoder_errors_abort_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::create(dir.path()).unwrap();
        let imu = ImuStreams::from_slice(TELEMETRY.as_bytes(), DEFAULT_DEVICE).unwrap();
        let res = convert(&imu, &CameraCalibration::default(), &paths.jsonl, &mut FailingTranscoder, |_| ());
        assert!(matches!(res, Err(DatasetError::ExternalTool { .. })));
    }

    #[test]
    fn unwritable_output_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let imu = ImuStreams::from_slice(TELEMETRY.as_bytes(), DEFAULT_DEVICE).unwrap();
        let res = convert(&imu, &CameraCalibration::default(), &dir.path().join("missing/data.jsonl"), &mut FixedFrames(vec![0.0]), |_| ());
        assert!(matches!(res, Err(DatasetError::IoWrite(_))));
    }
}
