// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

use std::path::{ Path, PathBuf };
use ffmpeg_next::{ codec, decoder, encoder, format, frame, media, picture, software, Dictionary, Packet, Rational };
use ffmpeg_next::codec::threading;

use crate::core::{ FrameEvent, Result };
use crate::pipeline::Transcoder;
use super::{ find_encoder, get_video_info, is_drained, presentation_time, FFmpegError, TranscodeSettings, VideoInfo };

/// Decodes the input, reports every decoded frame and re-encodes it downscaled.
pub struct InlineTranscoder {
    input: PathBuf,
    output: PathBuf,
    settings: TranscodeSettings,
    info: VideoInfo,
}

struct StreamDecoder {
    decoder: decoder::Video,
    stream_index: usize,
    time_base: Rational,
    frame_rate: Rational,
    next_index: usize,
}

struct StreamEncoder {
    encoder: encoder::video::Encoder,
    scaler: software::scaling::Context,
    ost_index: usize,
    encoder_time_base: Rational,
    ost_time_base: Rational,
}

impl InlineTranscoder {
    pub fn new(input: &Path, output: &Path, settings: TranscodeSettings) -> std::result::Result<Self, FFmpegError> {
        let info = get_video_info(input)?;
        let (w, h) = settings.output_size(info.width, info.height);
        log::info!("Input {}: {:?} {}x{} @ {:.3} fps, ~{} frames. Output {}x{}, crf {}, {} threads",
            input.display(), info.codec, info.width, info.height, info.fps, info.frame_count, w, h, settings.crf, settings.num_threads);

        Ok(Self {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            settings,
            info,
        })
    }

    fn open_input(&self) -> std::result::Result<(format::context::Input, StreamDecoder), FFmpegError> {
        let ictx = format::input(&self.input).map_err(|e| FFmpegError::CannotOpenInputFile((self.input.display().to_string(), e)))?;
        let stream = ictx.streams().best(media::Type::Video).ok_or(FFmpegError::NoVideoStream)?;

        let decoder = codec::context::Context::from_parameters(stream.parameters())?.decoder().video().map_err(|_| FFmpegError::DecoderNotFound)?;
        let mut frame_rate = stream.avg_frame_rate();
        if frame_rate.numerator() <= 0 || frame_rate.denominator() <= 0 { frame_rate = stream.rate(); }

        let dec = StreamDecoder {
            decoder,
            stream_index: stream.index(),
            time_base: stream.time_base(),
            frame_rate,
            next_index: 0,
        };
        Ok((ictx, dec))
    }

    fn receive_frames(&self, dec: &mut StreamDecoder, octx: &mut format::context::Output, enc: &mut Option<StreamEncoder>, on_frame: &mut dyn FnMut(FrameEvent) -> Result<()>) -> Result<()> {
        let mut frame = frame::Video::empty();
        loop {
            match dec.decoder.receive_frame(&mut frame) {
                Ok(()) => {}
                Err(e) if is_drained(&e) => break,
                Err(e) => return Err(FFmpegError::from(e).into()),
            }
            if frame.pts().is_none() && frame.timestamp().is_none() {
                log::debug!("Frame {} has no timestamp, using the average frame rate", dec.next_index);
            }
            let presentation_time = presentation_time(frame.pts(), frame.timestamp(), dec.time_base, dec.next_index, dec.frame_rate);

            on_frame(FrameEvent {
                index: dec.next_index,
                presentation_time,
                width: frame.width(),
                height: frame.height(),
            })?;

            if enc.is_none() {
                *enc = Some(StreamEncoder::new(&frame, dec, octx, &self.settings)?);
            }
            if let Some(enc) = enc.as_mut() {
                enc.encode(&frame, octx)?;
            }
            dec.next_index += 1;
        }
        Ok(())
    }
}

impl Transcoder for InlineTranscoder {
    fn frame_count_hint(&self) -> usize { self.info.frame_count }

    fn run(&mut self, on_frame: &mut dyn FnMut(FrameEvent) -> Result<()>) -> Result<()> {
        let (mut ictx, mut dec) = self.open_input()?;
        let mut octx = format::output(&self.output).map_err(|e| FFmpegError::CannotOpenOutputFile((self.output.display().to_string(), e)))?;
        let mut enc: Option<StreamEncoder> = None;

        for (stream, packet) in ictx.packets() {
            if stream.index() != dec.stream_index {
                continue;
            }
            dec.decoder.send_packet(&packet).map_err(FFmpegError::from)?;
            self.receive_frames(&mut dec, &mut octx, &mut enc, on_frame)?;
        }

        dec.decoder.send_eof().map_err(FFmpegError::from)?;
        self.receive_frames(&mut dec, &mut octx, &mut enc, on_frame)?;

        match enc.as_mut() {
            Some(enc) => {
                enc.flush(&mut octx)?;
                octx.write_trailer().map_err(FFmpegError::from)?;
                log::info!("Encoded {} frames to {}", dec.next_index, self.output.display());
            }
            None => log::warn!("No frames were decoded from {}", self.input.display()),
        }
        Ok(())
    }
}

impl StreamEncoder {
    fn new(first: &frame::Video, dec: &StreamDecoder, octx: &mut format::context::Output, settings: &TranscodeSettings) -> std::result::Result<Self, FFmpegError> {
        let (width, height) = settings.output_size(first.width(), first.height());
        let input_codec = dec.decoder.id();
        let codec = find_encoder(input_codec).ok_or(FFmpegError::EncoderNotFound(input_codec))?;
        let global_header = octx.format().flags().contains(format::Flags::GLOBAL_HEADER);

        let mut ost = octx.add_stream(codec)?;
        let ost_index = ost.index();

        let mut context = codec::context::Context::new_with_codec(codec);
        let mut threads = threading::Config::kind(threading::Type::Frame);
        threads.count = settings.num_threads;
        context.set_threading(threads);

        let mut encoder = context.encoder().video()?;
        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_aspect_ratio(dec.decoder.aspect_ratio());
        encoder.set_format(first.format());
        encoder.set_frame_rate(Some(dec.frame_rate));
        encoder.set_time_base(dec.time_base);
        if global_header {
            encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let mut options = Dictionary::new();
        options.set("crf", &settings.crf);
        let encoder = encoder.open_with(options)?;
        ost.set_parameters(&encoder);
        ost.set_time_base(dec.time_base);

        octx.write_header()?;
        let ost_time_base = octx.stream(ost_index).ok_or(FFmpegError::NoOutputStream)?.time_base();
        log::debug!("Output stream {} with {:?}, time base {} -> {}", ost_index, codec.name(), dec.time_base, ost_time_base);

        let scaler = software::scaling::Context::get(
            first.format(), first.width(), first.height(),
            first.format(), width, height,
            software::scaling::Flags::AREA,
        )?;

        Ok(Self {
            encoder,
            scaler,
            ost_index,
            encoder_time_base: dec.time_base,
            ost_time_base,
        })
    }

    fn encode(&mut self, frame: &frame::Video, octx: &mut format::context::Output) -> std::result::Result<(), FFmpegError> {
        // The encoder may keep a reference to the frame, so every frame gets its own buffer
        let mut scaled = frame::Video::empty();
        self.scaler.run(frame, &mut scaled)?;
        scaled.set_pts(frame.pts().or(frame.timestamp()));
        scaled.set_kind(picture::Type::None);

        self.encoder.send_frame(&scaled)?;
        self.write_packets(octx)
    }

    fn flush(&mut self, octx: &mut format::context::Output) -> std::result::Result<(), FFmpegError> {
        self.encoder.send_eof()?;
        self.write_packets(octx)
    }

    fn write_packets(&mut self, octx: &mut format::context::Output) -> std::result::Result<(), FFmpegError> {
        let mut packet = Packet::empty();
        loop {
            match self.encoder.receive_packet(&mut packet) {
                Ok(()) => {}
                Err(e) if is_drained(&e) => break,
                Err(e) => return Err(e.into()),
            }
            packet.set_stream(self.ost_index);
            packet.rescale_ts(self.encoder_time_base, self.ost_time_base);
            packet.write_interleaved(octx)?;
        }
        Ok(())
    }
}
