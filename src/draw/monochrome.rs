//! Hard two-level thresholding for the e-ink panel

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

use crate::error::Result;

/// Pixels less opaque than this count as background
pub const ALPHA_CUTOFF: u8 = 128;
/// Luma below this is ink
pub const LUMA_THRESHOLD: f32 = 200.0;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)
}

pub fn binarize_pixel(Rgba([r, g, b, a]): Rgba<u8>) -> Rgb<u8> {
    if a < ALPHA_CUTOFF || luma(r, g, b) >= LUMA_THRESHOLD {
        WHITE
    } else {
        BLACK
    }
}

/// Binarize the whole buffer in one pass over the raw pixels
pub fn binarize(image: &RgbaImage) -> RgbImage {
    let mut out = RgbImage::new(image.width(), image.height());
    for (dst, src) in out.pixels_mut().zip(image.pixels()) {
        *dst = binarize_pixel(*src);
    }
    out
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
