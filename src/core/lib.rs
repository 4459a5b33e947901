// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

pub mod camera;
pub mod frame_source;
pub mod merge;
pub mod records;
pub mod telemetry;
pub mod transform;

pub use camera::CameraCalibration;
pub use frame_source::{ FrameEvent, SyntheticFrames };
pub use merge::{ MergeSummary, TemporalMerger };
pub use records::{ OutputRecord, RecordSink, RecordWriter };
pub use telemetry::{ ImuPair, ImuStreams, SensorChannel, SensorSample };

pub const OUTPUT_VIDEO_NAME: &str = "data.mp4";
pub const OUTPUT_JSONL_NAME: &str = "data.jsonl";

#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    #[error("Malformed telemetry: {0}")]                 MalformedTelemetry(String),
    #[error("Video container error: {0}")]              ContainerOpen(String),
    #[error("Cannot read {path}: {source:?}")]           InputRead { path: String, source: std::io::Error },
    #[error("Write failed: {0:?}")]                      IoWrite(#[from] std::io::Error),
    #[error("{tool} exited with {status}")]              ExternalTool { tool: String, status: String },
    #[error("Matrix is singular and cannot be inverted")] SingularMatrix,
    #[error("Invalid camera calibration: {0}")]         InvalidCalibration(String),
    #[error("Invalid frame source: {0}")]                InvalidFrameSource(String),
    #[error("{0}\nRun with --help for more information.")] Usage(String),
    #[error("Transcoding error: {0}")]                   Transcode(String),
    #[error("JSON error: {0:?}")]                        Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DatasetError>;
