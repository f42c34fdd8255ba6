// ============================================================
// Layer 3 — Image Sample
// ============================================================
// A decoded, resized image and its class index.
//
// Pixels are kept as raw RGB8 bytes in HWC order
// (row by row, 3 bytes per pixel). Converting to normalised
// floats happens in the batcher, so a sample costs
// size*size*3 bytes instead of 4x that as f32.

#[derive(Debug, Clone, PartialEq)]
pub struct ImageSample {
    /// RGB8 pixels, HWC, length == size * size * 3
    pub pixels: Vec<u8>,
    /// Side length of the square image
    pub size:   usize,
    /// Index into the sorted class list
    pub label:  usize,
}

impl ImageSample {
    pub fn new(pixels: Vec<u8>, size: usize, label: usize) -> Self {
        debug_assert_eq!(pixels.len(), size * size * 3);
        Self { pixels, size, label }
    }
}
