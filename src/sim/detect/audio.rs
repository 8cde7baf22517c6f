//! Silence detection from a byte frequency spectrum (level 4)

/// Mean magnitude across all bins; `None` for an empty capture
pub fn spectrum_average(spectrum: &[u8]) -> Option<f32> {
    if spectrum.is_empty() {
        return None;
    }
    let sum: u32 = spectrum.iter().map(|&b| b as u32).sum();
    Some(sum as f32 / spectrum.len() as f32)
}

/// `Some(true)` when the average magnitude is under `threshold`
pub fn is_silent(spectrum: &[u8], threshold: f32) -> Option<bool> {
    spectrum_average(spectrum).map(|avg| avg < threshold)
}
