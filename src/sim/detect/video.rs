//! Darkness detection from camera frames (level 5)

use crate::platform::PixelFrame;

/// Rec. 601 luma weights
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Mean luma over all whole RGBA pixels; `None` for an empty frame
pub fn frame_brightness(frame: &PixelFrame) -> Option<f32> {
    let pixels = frame.rgba.chunks_exact(4);
    let count = pixels.len();
    if count == 0 {
        return None;
    }
    let total: f32 = pixels
        .map(|px| LUMA_R * px[0] as f32 + LUMA_G * px[1] as f32 + LUMA_B * px[2] as f32)
        .sum();
    Some(total / count as f32)
}

pub fn is_dark(frame: &PixelFrame, threshold: f32) -> Option<bool> {
    frame_brightness(frame).map(|b| b < threshold)
}
