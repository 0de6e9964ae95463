use std::path::Path;

use image::{ImageFormat, RgbImage};
use ndarray::Array3;

use crate::error::{Result, SerError};
use crate::frame::DecodedFrame;

/// Lossless output container chosen from the file extension.
fn format_for(path: &Path) -> ImageFormat {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("tiff" | "tif") => ImageFormat::Tiff,
        _ => ImageFormat::Png,
    }
}

/// Convert an (h, w, 3) buffer into an `image` RGB buffer.
pub fn to_rgb_image(pixels: &Array3<u8>) -> RgbImage {
    let (h, w, _) = pixels.dim();
    let mut img = RgbImage::new(w as u32, h as u32);
    for (x, y, px) in img.enumerate_pixels_mut() {
        let (row, col) = (y as usize, x as usize);
        px.0 = [
            pixels[[row, col, 0]],
            pixels[[row, col, 1]],
            pixels[[row, col, 2]],
        ];
    }
    img
}

/// Save an RGB8 buffer as PNG (default) or TIFF, by extension.
pub fn save_rgb(pixels: &Array3<u8>, path: &Path) -> Result<()> {
    to_rgb_image(pixels)
        .save_with_format(path, format_for(path))
        .map_err(|source| SerError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// Save a decoded frame.
pub fn save_frame(frame: &DecodedFrame, path: &Path) -> Result<()> {
    save_rgb(&frame.pixels, path)
}

/// Load any RGB-convertible image into an (h, w, 3) buffer.
pub fn load_rgb(path: &Path) -> Result<Array3<u8>> {
    let img = image::open(path)
        .map_err(|source| SerError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();
    let (w, h) = img.dimensions();
    let mut pixels = Array3::<u8>::zeros((h as usize, w as usize, 3));
    for (x, y, px) in img.enumerate_pixels() {
        for c in 0..3 {
            pixels[[y as usize, x as usize, c]] = px.0[c];
        }
    }
    Ok(pixels)
}
