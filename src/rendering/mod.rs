// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

pub mod ffmpeg_transcoder;
pub mod external_tool;

pub use ffmpeg_transcoder::InlineTranscoder;
pub use external_tool::ExternalTranscoder;

use std::error;
use std::path::Path;
use std::sync::Once;
use ffmpeg_next::{ codec, encoder, ffi, format, media, Codec, Rational };

use crate::core::DatasetError;

#[derive(Debug)]
pub enum FFmpegError {
    EncoderNotFound(codec::Id),
    DecoderNotFound,
    NoVideoStream,
    NoOutputStream,
    InternalError(ffmpeg_next::Error),
    CannotOpenInputFile((String, ffmpeg_next::Error)),
    CannotOpenOutputFile((String, ffmpeg_next::Error)),
}

impl std::fmt::Display for FFmpegError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FFmpegError::EncoderNotFound(id)   => write!(f, "No encoder found for {:?}", id),
            FFmpegError::DecoderNotFound       => write!(f, "Decoder not found"),
            FFmpegError::NoVideoStream         => write!(f, "No video stream"),
            FFmpegError::NoOutputStream        => write!(f, "No output stream"),
            FFmpegError::InternalError(e)      => write!(f, "ffmpeg error: {:?}", e),
            FFmpegError::CannotOpenInputFile((url, e))  => write!(f, "Cannot open input file {url}: {e:?}"),
            FFmpegError::CannotOpenOutputFile((url, e)) => write!(f, "Cannot open output file {url}: {e:?}"),
        }
    }
}
impl error::Error for FFmpegError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            FFmpegError::InternalError(ref e) => Some(e),
            FFmpegError::CannotOpenInputFile((_, ref e)) => Some(e),
            FFmpegError::CannotOpenOutputFile((_, ref e)) => Some(e),
            _ => None
        }
    }
}
impl From<ffmpeg_next::Error> for FFmpegError {
    fn from(err: ffmpeg_next::Error) -> FFmpegError { FFmpegError::InternalError(err) }
}
impl From<FFmpegError> for DatasetError {
    fn from(err: FFmpegError) -> DatasetError {
        match err {
            FFmpegError::CannotOpenInputFile(_) |
            FFmpegError::NoVideoStream |
            FFmpegError::DecoderNotFound => DatasetError::ContainerOpen(err.to_string()),
            _ => DatasetError::Transcode(err.to_string()),
        }
    }
}

/// Resolution and quality settings shared by both transcoders.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeSettings {
    pub downres_ratio: u32,
    pub crf: String,
    pub num_threads: usize,
}
impl Default for TranscodeSettings {
    fn default() -> Self {
        Self { downres_ratio: 3, crf: "20".into(), num_threads: 8 }
    }
}
impl TranscodeSettings {
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        let ratio = self.downres_ratio.max(1);
        (width / ratio, height / ratio)
    }
}

#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub duration_ms: f64,
    pub frame_count: usize,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub codec: codec::Id,
}

pub fn init_log() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Error);
    });
}

pub fn get_video_info(path: &Path) -> Result<VideoInfo, FFmpegError> {
    ffmpeg_next::init()?;
    init_log();

    let context = format::input(path).map_err(|e| FFmpegError::CannotOpenInputFile((path.display().to_string(), e)))?;
    let stream = context.streams().best(media::Type::Video).ok_or(FFmpegError::NoVideoStream)?;
    let video = codec::context::Context::from_parameters(stream.parameters())?.decoder().video().map_err(|_| FFmpegError::DecoderNotFound)?;

    let mut fps = f64::from(stream.avg_frame_rate());
    if !fps.is_finite() || fps <= 0.0 { fps = f64::from(stream.rate()); }

    let duration_s = if stream.duration() > 0 {
        stream.duration() as f64 * f64::from(stream.time_base())
    } else {
        // Some muxers only store the duration on the container
        context.duration().max(0) as f64 / f64::from(ffi::AV_TIME_BASE)
    };

    Ok(VideoInfo {
        duration_ms: duration_s * 1000.0,
        frame_count: estimate_frame_count(stream.frames(), duration_s, fps),
        fps,
        width: video.width(),
        height: video.height(),
        codec: video.id(),
    })
}

/// Container frame count, or duration × fps when the muxer didn't store it.
pub fn estimate_frame_count(nb_frames: i64, duration_s: f64, fps: f64) -> usize {
    if nb_frames > 0 {
        return nb_frames as usize;
    }
    let estimate = (duration_s * fps).round();
    if estimate.is_finite() && estimate > 0.0 { estimate as usize } else { 0 }
}

/// Decoded frame time in seconds: pts, then the best-effort timestamp, then the index at the average frame rate.
pub fn presentation_time(pts: Option<i64>, best_effort: Option<i64>, time_base: Rational, index: usize, frame_rate: Rational) -> f64 {
    match pts.or(best_effort) {
        Some(ts) => ts as f64 * f64::from(time_base),
        None => index as f64 / f64::from(frame_rate),
    }
}

/// True when the codec has nothing more to give for now (EAGAIN) or ever (EOF).
pub fn is_drained(err: &ffmpeg_next::Error) -> bool {
    match err {
        ffmpeg_next::Error::Eof => true,
        ffmpeg_next::Error::Other { errno } => *errno == ffmpeg_next::util::error::EAGAIN,
        _ => false
    }
}

/// Encoder for the same codec as the input, or libx264 if this build can't encode it.
pub fn find_encoder(input_codec: codec::Id) -> Option<Codec> {
    encoder::find(input_codec).or_else(|| {
        log::warn!("No encoder for {:?}, falling back to libx264", input_codec);
        encoder::find_by_name("libx264")
    })
}
