//! Decoded frames in the detector's channel order.
//!
//! Every image and video frame that enters the pipeline is held as packed
//! 8-bit BGR rows (`width * height * 3` bytes, no padding). Conversions to and
//! from the `image` crate's RGB buffers happen at the edges: loading image
//! files, annotating, and saving.

use anyhow::{anyhow, Result};
use image::{DynamicImage, RgbImage};

use crate::detect::{BoundingBox, Detection};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wrap packed BGR24 bytes. Fails when the length does not match.
    pub fn from_bgr(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = expected_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "BGR frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Wrap packed RGB24 bytes, swapping to BGR.
    pub fn from_rgb(mut data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        swap_red_blue(&mut data);
        Self::from_bgr(data, width, height)
    }

    pub fn from_rgb_image(image: &RgbImage) -> Self {
        let mut data = image.as_raw().clone();
        swap_red_blue(&mut data);
        Self {
            data,
            width: image.width(),
            height: image.height(),
        }
    }

    /// Any decoded image (gray, RGBA, 16-bit...) is reduced to 8-bit RGB first.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self::from_rgb_image(&image.to_rgb8())
    }

    /// Solid-color frame, mostly for tests and synthetic sources.
    pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&bgr);
        }
        Self {
            data,
            width,
            height,
        }
    }

    pub fn as_bgr(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bgr(self) -> Vec<u8> {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y as usize) * (self.width as usize) + x as usize) * 3;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ])
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        let mut data = self.data.clone();
        swap_red_blue(&mut data);
        // Length is checked on construction, so the buffer always fits.
        RgbImage::from_raw(self.width, self.height, data)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    /// Copy of the region covered by `bbox`, clamped to the frame.
    ///
    /// Returns `None` when the clamped region is empty.
    pub fn crop(&self, bbox: &BoundingBox) -> Option<Frame> {
        let clamped = bbox.clamp_to(self.width, self.height);
        let (x1, y1, x2, y2) = clamped.to_pixels();
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        let (x1, y1, x2, y2) = (x1 as usize, y1 as usize, x2 as usize, y2 as usize);
        let row_bytes = (self.width as usize) * 3;
        let mut data = Vec::with_capacity((x2 - x1) * (y2 - y1) * 3);
        for row in y1..y2 {
            let start = row * row_bytes + x1 * 3;
            let end = row * row_bytes + x2 * 3;
            data.extend_from_slice(&self.data[start..end]);
        }
        Some(Frame {
            data,
            width: (x2 - x1) as u32,
            height: (y2 - y1) as u32,
        })
    }
}

/// Crop every detection out of `frame`, skipping empty regions.
pub fn crop_detections(frame: &Frame, detections: &[Detection]) -> Vec<Frame> {
    detections
        .iter()
        .filter_map(|d| frame.crop(&d.bbox))
        .collect()
}

fn expected_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

fn swap_red_blue(data: &mut [u8]) {
    for px in data.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{normalize, RawDetection};

    #[test]
    fn rgb_round_trip_swaps_channels() -> Result<()> {
        let frame = Frame::from_rgb(vec![10, 20, 30, 40, 50, 60], 2, 1)?;
        assert_eq!(frame.as_bgr(), &[30, 20, 10, 60, 50, 40]);
        assert_eq!(frame.to_rgb_image().as_raw(), &vec![10, 20, 30, 40, 50, 60]);
        Ok(())
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Frame::from_bgr(vec![0; 5], 2, 1).is_err());
    }

    #[test]
    fn crop_clamps_and_skips_empty() {
        let mut data = Vec::new();
        for y in 0..4u8 {
            for x in 0..4u8 {
                data.extend_from_slice(&[x, y, 0]);
            }
        }
        let frame = Frame::from_bgr(data, 4, 4).unwrap();

        let crop = frame.crop(&BoundingBox::new(2.0, 1.0, 10.0, 3.0)).unwrap();
        assert_eq!((crop.width, crop.height), (2, 2));
        assert_eq!(crop.pixel(0, 0), Some([2, 1, 0]));
        assert_eq!(crop.pixel(1, 1), Some([3, 2, 0]));

        assert!(frame.crop(&BoundingBox::new(5.0, 5.0, 9.0, 9.0)).is_none());

        let dets = vec![
            normalize(RawDetection::new(BoundingBox::new(0.0, 0.0, 2.0, 2.0), 0.9, 0)),
            normalize(RawDetection::new(BoundingBox::new(8.0, 8.0, 9.0, 9.0), 0.9, 0)),
        ];
        assert_eq!(crop_detections(&frame, &dets).len(), 1);
    }
}
