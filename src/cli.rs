// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2022 Adrian <adrian.eddy at gmail>

use argh::FromArgs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;
use indicatif::{ ProgressBar, ProgressState, ProgressStyle };

use crate::core::{ CameraCalibration, DatasetError, ImuStreams, Result };
use crate::core::telemetry::DEFAULT_DEVICE;
use crate::pipeline::{ self, OutputPaths, Transcoder };
use crate::rendering::{ ExternalTranscoder, InlineTranscoder, TranscodeSettings };

/** GoPro dataset converter
Converts a GoPro video and its extracted IMU telemetry into data.mp4 and data.jsonl
*/
#[derive(FromArgs, Debug)]
pub struct Opts {
    /// input mp4 file
    #[argh(option, short = 'i')]
    input_video: Option<PathBuf>,

    /// input telemetry json file
    #[argh(option, short = 'j')]
    input_json: Option<PathBuf>,

    /// output directory, created if missing
    #[argh(option, short = 'o')]
    output_dir: Option<PathBuf>,

    /// integer factor the video resolution is divided by, default: 3
    #[argh(option, short = 'r', default = "3", from_str_fn(parse_ratio))]
    video_downres_ratio: u32,

    /// encoder constant rate factor, default: 20
    #[argh(option, default = "String::from(\"20\")")]
    crf: String,

    /// encoder thread count (inline mode only), default: 8
    #[argh(option, default = "8")]
    num_threads: usize,

    /// transcoding mode: "inline" re-encodes while decoding, "external" runs ffmpeg after the json pass. Default: inline
    #[argh(option, default = "Mode::Inline")]
    mode: Mode,

    /// telemetry device key, default: "1"
    #[argh(option, default = "String::from(DEFAULT_DEVICE)")]
    device: String,

    /// camera calibration json file. Defaults to the built-in GoPro calibration
    #[argh(option)]
    camera_config: Option<PathBuf>,

    /// ffmpeg executable used in external mode, default: ffmpeg
    #[argh(option, default = "String::from(\"ffmpeg\")")]
    ffmpeg: String,

    /// debug logging
    #[argh(switch, short = 'v')]
    pub verbose: bool,

    /// print app version
    #[argh(switch)]
    version: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Inline,
    External,
}
impl FromStr for Mode {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "inline"   => Ok(Self::Inline),
            "external" => Ok(Self::External),
            _ => Err(format!("unknown mode \"{s}\", expected inline or external"))
        }
    }
}

fn parse_ratio(value: &str) -> std::result::Result<u32, String> {
    match value.parse::<u32>() {
        Ok(v) if v >= 1 => Ok(v),
        Ok(_) => Err("video downres ratio must be at least 1".into()),
        Err(e) => Err(format!("invalid video downres ratio \"{value}\": {e}")),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub input_video: PathBuf,
    pub input_json: PathBuf,
    pub output_dir: PathBuf,
    pub settings: TranscodeSettings,
    pub mode: Mode,
    pub device: String,
    pub camera_config: Option<PathBuf>,
    pub ffmpeg: String,
}

impl Opts {
    pub fn into_config(self) -> std::result::Result<Config, String> {
        let missing = |name: &str| format!("Required option not provided: --{name}");
        Ok(Config {
            input_video: self.input_video.ok_or_else(|| missing("input-video"))?,
            input_json: self.input_json.ok_or_else(|| missing("input-json"))?,
            output_dir: self.output_dir.ok_or_else(|| missing("output-dir"))?,
            settings: TranscodeSettings {
                downres_ratio: self.video_downres_ratio,
                crf: self.crf,
                num_threads: self.num_threads,
            },
            mode: self.mode,
            device: self.device,
            camera_config: self.camera_config,
            ffmpeg: self.ffmpeg,
        })
    }
}

pub fn run(opts: Opts) -> Result<()> {
    if opts.version {
        println!("gopro-dataset v{}", crate::util::get_version());
        return Ok(());
    }
    let config = opts.into_config().map_err(DatasetError::Usage)?;
    convert(&config)
}

pub fn convert(config: &Config) -> Result<()> {
    let time = Instant::now();

    let imu = ImuStreams::from_file(&config.input_json, &config.device)?;
    let calibration = match &config.camera_config {
        Some(path) => CameraCalibration::load_from_file(path)?,
        None => CameraCalibration::default()
    };
    let paths = OutputPaths::create(&config.output_dir)?;

    let mut transcoder: Box<dyn Transcoder> = match config.mode {
        Mode::Inline   => Box::new(InlineTranscoder::new(&config.input_video, &paths.video, config.settings.clone())?),
        Mode::External => Box::new(ExternalTranscoder::open(&config.ffmpeg, &config.input_video, &paths.video, config.settings.clone())?),
    };

    let pb = progress_bar(transcoder.frame_count_hint());
    let summary = pipeline::convert(&imu, &calibration, &paths.jsonl, transcoder.as_mut(), |frames| {
        if pb.length().is_some_and(|len| frames as u64 > len) {
            pb.set_length(frames as u64);
        }
        pb.set_position(frames as u64);
    });
    pb.finish();
    let summary = summary?;

    log::info!("Done in {:.2}s: {} frames, {} IMU samples written to {}", time.elapsed().as_secs_f64(), summary.frames, summary.samples_emitted, config.output_dir.display());
    Ok(())
}

fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template("[{bar:50.cyan/blue}] {pos:>5}/{len:5} {eta:11} {msg}") {
        pb.set_style(style
            .with_key("eta", |state: &ProgressState, w: &mut dyn std::fmt::Write| { let _ = write!(w, "ETA {:.1}s", state.eta().as_secs_f64()); })
            .progress_chars("#>-"));
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn parse(args: &[&str]) -> std::result::Result<Opts, argh::EarlyExit> {
        Opts::from_args(&["gopro-dataset"], args)
    }

    #[test]
    fn defaults() {
        let config = parse(&["-i", "GX010001.MP4", "-j", "GX010001.json", "-o", "out"]).unwrap().into_config().unwrap();
        assert_eq!(config.input_video, PathBuf::from("GX010001.MP4"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.settings, TranscodeSettings { downres_ratio: 3, crf: "20".into(), num_threads: 8 });
        assert_eq!(config.mode, Mode::Inline);
        assert_eq!(config.device, "1");
        assert_eq!(config.camera_config, None);
        assert_eq!(config.ffmpeg, "ffmpeg");
    }

    #[test]
    fn all_options() {
        let config = parse(&[
            "--input-video", "a.mp4", "--input-json", "a.json", "--output-dir", "o",
            "-r", "2", "--crf", "18", "--num-threads", "4", "--mode", "external",
            "--device", "2", "--camera-config", "cam.json", "--ffmpeg", "/usr/bin/ffmpeg",
        ]).unwrap().into_config().unwrap();
        assert_eq!(config.settings, TranscodeSettings { downres_ratio: 2, crf: "18".into(), num_threads: 4 });
        assert_eq!(config.mode, Mode::External);
        assert_eq!(config.device, "2");
        assert_eq!(config.camera_config, Some(PathBuf::from("cam.json")));
        assert_eq!(config.ffmpeg, "/usr/bin/ffmpeg");
    }

    #[test_case(&["-r", "0"]; "zero ratio")]
    #[test_case(&["-r", "half"]; "non numeric ratio")]
    #[test_case(&["--mode", "gpu"]; "unknown mode")]
    fn rejects_bad_values(extra: &[&str]) {
        let mut args = vec!["-i", "a.mp4", "-j", "a.json", "-o", "out"];
        args.extend_from_slice(extra);
        assert!(parse(&args).is_err());
    }

    #[test]
    fn version_needs_no_paths() {
        let opts = parse(&["--version"]).unwrap();
        assert!(opts.version);
        assert!(opts.into_config().unwrap_err().contains("--input-video"));
    }

    #[test]
    fn missing_paths_are_a_usage_error() {
        let opts = parse(&["-i", "GX010001.MP4"]).unwrap();
        match run(opts) {
            Err(DatasetError::Usage(msg)) => assert!(msg.contains("--input-json")),
            other => panic!("expected a usage error, got {other:?}"),
        }
    }
}
