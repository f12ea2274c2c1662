use std::path::Path;

use anyhow::{Context, Result};
use render::FrameBuffer;

/// Writes `fb` as an 8-bit RGBA PNG.
///
/// # Errors
///
/// Fails when the file cannot be encoded or written.
pub fn save_png(fb: &FrameBuffer, path: &Path) -> Result<()> {
    fb.to_rgba_image()
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("writing snapshot {}", path.display()))?;
    tracing::info!("wrote {}x{} snapshot to {}", fb.width(), fb.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_png_keeps_size_and_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut fb = FrameBuffer::new(6, 4).unwrap();
        fb.words_mut()[0] = 0xFFFF_0000;

        save_png(&fb, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (6, 4));
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let fb = FrameBuffer::new(2, 2).unwrap();
        assert!(save_png(&fb, &dir.path().join("missing/frame.png")).is_err());
    }
}
