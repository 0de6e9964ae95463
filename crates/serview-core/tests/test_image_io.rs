use ndarray::Array3;

use serview_core::frame::DecodedFrame;
use serview_core::io::image_io::{load_rgb, save_frame, save_rgb, to_rgb_image};
use serview_core::SerError;

fn gradient(h: usize, w: usize) -> Array3<u8> {
    Array3::from_shape_fn((h, w, 3), |(r, c, ch)| (r * 40 + c * 10 + ch) as u8)
}

#[test]
fn test_save_load_roundtrip_png() {
    let pixels = gradient(4, 6);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");

    save_rgb(&pixels, &path).unwrap();
    assert_eq!(load_rgb(&path).unwrap(), pixels);
}

#[test]
fn test_save_load_roundtrip_tiff() {
    let pixels = gradient(3, 5);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.TIF");

    save_frame(&DecodedFrame::new(0, pixels.clone()), &path).unwrap();
    assert_eq!(load_rgb(&path).unwrap(), pixels);
}

#[test]
fn test_unknown_extension_writes_png() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.out");
    save_rgb(&gradient(2, 2), &path).unwrap();
    assert_eq!(&std::fs::read(&path).unwrap()[1..4], b"PNG");
}

#[test]
fn test_rgb_image_layout() {
    let img = to_rgb_image(&gradient(2, 3));
    assert_eq!(img.dimensions(), (3, 2));
    assert_eq!(img.get_pixel(2, 1).0, [60, 61, 62]);
}

#[test]
fn test_save_error_carries_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("frame.png");
    match save_rgb(&gradient(1, 1), &path).unwrap_err() {
        SerError::Image { path: p, .. } => assert_eq!(p, path),
        other => panic!("expected Image error, got {other:?}"),
    }
}
