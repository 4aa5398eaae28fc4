//! Image file loading for batch detection.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::frame::Frame;

/// Decode an image file into a BGR frame.
pub fn load_image(path: &Path) -> Result<Frame> {
    let image = image::open(path).with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(Frame::from_dynamic(&image))
}

/// Decode every path, keeping per-file failures next to their path.
pub fn load_images<P: AsRef<Path>>(paths: &[P]) -> Vec<(PathBuf, Result<Frame>)> {
    paths
        .iter()
        .map(|p| {
            let path = p.as_ref().to_path_buf();
            let frame = load_image(&path);
            (path, frame)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn loads_png_as_bgr() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("site.png");
        RgbImage::from_pixel(3, 2, Rgb([200, 100, 50])).save(&path)?;

        let frame = load_image(&path)?;
        assert_eq!((frame.width, frame.height), (3, 2));
        assert_eq!(frame.pixel(2, 1), Some([50, 100, 200]));
        Ok(())
    }

    #[test]
    fn keeps_failures_per_path() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let good = dir.path().join("ok.png");
        RgbImage::new(2, 2).save(&good)?;
        let bad = dir.path().join("broken.png");
        std::fs::write(&bad, b"not an image")?;

        let loaded = load_images(&[good, bad]);
        assert!(loaded[0].1.is_ok());
        assert!(loaded[1].1.is_err());
        Ok(())
    }
}
