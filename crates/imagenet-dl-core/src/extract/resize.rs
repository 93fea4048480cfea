//! Optional square resize of extracted images.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const JPEG_QUALITY: u8 = 95;

/// Decodes `bytes` as an image and writes it to `path` as a `size` x `size`
/// RGB JPEG. Returns `Ok(false)` without touching `path` when `bytes` is not
/// a decodable image.
pub(super) fn write_resized(bytes: &[u8], size: u32, path: &Path) -> Result<bool, image::ImageError> {
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(_) => return Ok(false),
    };
    let rgb = image::DynamicImage::ImageRgb8(
        img.resize_exact(size, size, FilterType::Lanczos3).to_rgb8(),
    );
    let mut out = BufWriter::new(File::create(path)?);
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))?;
    out.flush()?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    #[test]
    fn resizes_png_into_square_jpeg() {
        let mut png = Vec::new();
        RgbImage::from_pixel(40, 20, image::Rgb([200, 10, 10]))
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("cat.JPEG");
        assert!(write_resized(&png, 16, &out).unwrap());
        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }

    #[test]
    fn non_images_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("notes.txt");
        assert!(!write_resized(b"plain text", 16, &out).unwrap());
        assert!(!out.exists());
    }
}
