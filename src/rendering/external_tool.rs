// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

use std::ffi::OsString;
use std::path::{ Path, PathBuf };
use std::process::Command;

use crate::core::{ DatasetError, FrameEvent, Result, SyntheticFrames };
use crate::pipeline::Transcoder;
use super::{ get_video_info, TranscodeSettings, VideoInfo };

/// Frame times come from the container metadata, the video is resized by an external
/// ffmpeg process once all frames were reported.
pub struct ExternalTranscoder {
    tool: String,
    input: PathBuf,
    output: PathBuf,
    settings: TranscodeSettings,
    info: VideoInfo,
}

impl ExternalTranscoder {
    pub fn open(tool: &str, input: &Path, output: &Path, settings: TranscodeSettings) -> Result<Self> {
        let info = get_video_info(input)?;
        log::info!("Input {}: {}x{} @ {:.3} fps, {:.1}s, {} frames (constant frame rate assumed)", input.display(), info.width, info.height, info.fps, info.duration_ms / 1000.0, info.frame_count);
        check_frame_count(input, &info)?;
        Ok(Self::with_info(tool, input, output, settings, info))
    }

    pub fn with_info(tool: &str, input: &Path, output: &Path, settings: TranscodeSettings, info: VideoInfo) -> Self {
        Self {
            tool: tool.to_owned(),
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            settings,
            info,
        }
    }

    pub fn args(&self) -> Vec<OsString> {
        let r = self.settings.downres_ratio.max(1);
        let mut args: Vec<OsString> = vec!["-y".into(), "-hide_banner".into(), "-loglevel".into(), "error".into(), "-i".into()];
        args.push(self.input.clone().into_os_string());
        args.extend([
            "-vf".into(), format!("scale=trunc(iw/{r}):trunc(ih/{r}):flags=area").into(),
            "-crf".into(), self.settings.crf.clone().into(),
            "-an".into(),
        ]);
        args.push(self.output.clone().into_os_string());
        args
    }

    fn transcode(&self) -> Result<()> {
        log::info!("Running {} {:?}", self.tool, self.args());
        let status = Command::new(&self.tool)
            .args(self.args())
            .status()
            .map_err(|e| DatasetError::ExternalTool { tool: self.tool.clone(), status: e.to_string() })?;

        if !status.success() {
            return Err(DatasetError::ExternalTool { tool: self.tool.clone(), status: status.to_string() });
        }
        log::info!("Wrote {}", self.output.display());
        Ok(())
    }
}

/// Frame times are synthesized from the container metadata, so it has to know how many there are.
fn check_frame_count(input: &Path, info: &VideoInfo) -> Result<()> {
    if info.frame_count == 0 {
        return Err(DatasetError::ContainerOpen(format!("{} has no frame count or duration, use --mode inline", input.display())));
    }
    Ok(())
}

impl Transcoder for ExternalTranscoder {
    fn frame_count_hint(&self) -> usize { self.info.frame_count }

    fn run(&mut self, on_frame: &mut dyn FnMut(FrameEvent) -> Result<()>) -> Result<()> {
        let frames = SyntheticFrames::new(self.info.frame_count, self.info.fps, self.info.width, self.info.height)?;
        for frame in frames {
            on_frame(frame)?;
        }
        self.transcode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_next::codec;

    fn info(frame_count: usize) -> VideoInfo {
        VideoInfo { duration_ms: frame_count as f64 * 20.0, frame_count, fps: 50.0, width: 2704, height: 1520, codec: codec::Id::HEVC }
    }

    fn transcoder(tool: &str, frames: usize) -> ExternalTranscoder {
        ExternalTranscoder::with_info(tool, Path::new("in/GX010001.MP4"), Path::new("out/data.mp4"), TranscodeSettings::default(), info(frames))
    }

    #[test]
    fn builds_scale_command() {
        let mut t = transcoder("ffmpeg", 0);
        t.settings.downres_ratio = 4;
        t.settings.crf = "28".into();
        let args: Vec<String> = t.args().into_iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, [
            "-y", "-hide_banner", "-loglevel", "error",
            "-i", "in/GX010001.MP4",
            "-vf", "scale=trunc(iw/4):trunc(ih/4):flags=area",
            "-crf", "28",
            "-an",
            "out/data.mp4",
        ]);
    }

    #[test]
    fn unknown_frame_count_is_a_container_error() {
        let res = check_frame_count(Path::new("GX010001.MP4"), &info(0));
        assert!(matches!(res, Err(DatasetError::ContainerOpen(ref msg)) if msg.contains("GX010001.MP4")));
        assert!(check_frame_count(Path::new("GX010001.MP4"), &info(1)).is_ok());
    }

    #[test]
    fn missing_input_fails_before_transcoding() {
        let res = ExternalTranscoder::open("ffmpeg", Path::new("/nonexistent/GX010001.MP4"), Path::new("out/data.mp4"), TranscodeSettings::default());
        assert!(matches!(res, Err(DatasetError::ContainerOpen(_))));
    }

    #[cfg(unix)]
    #[test]
    fn reports_synthetic_frames_before_running_the_tool() {
        let mut t = transcoder("true", 5);
        let mut times = Vec::new();
        t.run(&mut |f| { times.push((f.index, f.presentation_time, f.width)); Ok(()) }).unwrap();
        assert_eq!(times, [(0, 0.0, 2704), (1, 0.02, 2704), (2, 0.04, 2704), (3, 0.06, 2704), (4, 0.08, 2704)]);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_fatal() {
        let mut t = transcoder("false", 2);
        let res = t.run(&mut |_| Ok(()));
        assert!(matches!(res, Err(DatasetError::ExternalTool { ref tool, .. }) if tool == "false"));
    }

    #[test]
    fn missing_tool_is_fatal() {
        let mut t = transcoder("/nonexistent/ffmpeg", 1);
        assert!(matches!(t.run(&mut |_| Ok(())), Err(DatasetError::ExternalTool { .. })));
    }

    #[test]
    fn frame_callback_errors_abort_before_transcoding() {
        let mut t = transcoder("/nonexistent/ffmpeg", 3);
        let res = t.run(&mut |_| Err(DatasetError::IoWrite(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))));
        assert!(matches!(res, Err(DatasetError::IoWrite(_))));
    }
}
