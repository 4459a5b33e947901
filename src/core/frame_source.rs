// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

use crate::{ DatasetError, Result };

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameEvent {
    pub index: usize,
    pub presentation_time: f64, // seconds from the start of the video stream
    pub width: u32,
    pub height: u32,
}

/// Frame times computed from the container's average frame rate, assuming a constant rate.
#[derive(Debug, Clone)]
pub struct SyntheticFrames {
    frame_count: usize,
    fps: f64,
    width: u32,
    height: u32,
    next: usize,
}

impl SyntheticFrames {
    pub fn new(frame_count: usize, fps: f64, width: u32, height: u32) -> Result<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(DatasetError::InvalidFrameSource(format!("frame rate must be positive, got {fps}")));
        }
        Ok(Self { frame_count, fps, width, height, next: 0 })
    }
}

impl Iterator for SyntheticFrames {
    type Item = FrameEvent;

    fn next(&mut self) -> Option<FrameEvent> {
        if self.next >= self.frame_count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(FrameEvent {
            index,
            presentation_time: index as f64 / self.fps,
            width: self.width,
            height: self.height,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.frame_count - self.next;
        (left, Some(left))
    }
}
impl ExactSizeIterator for SyntheticFrames { }
