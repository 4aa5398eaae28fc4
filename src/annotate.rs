//! Drawing detections onto frames.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::config::AnnotateSettings;
use crate::detect::Detection;
use crate::frame::Frame;

const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_PADDING: i32 = 10;

/// DejaVu Sans, used when no font file is configured.
static DEFAULT_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

fn default_font() -> Option<FontArc> {
    match FontArc::try_from_slice(DEFAULT_FONT) {
        Ok(font) => Some(font),
        Err(err) => {
            log::error!("embedded label font is unreadable: {}", err);
            None
        }
    }
}

/// Draws one box and one filled label per detection.
pub struct Annotator {
    line_thickness: u32,
    font_scale: f32,
    font: Option<FontArc>,
}

impl Default for Annotator {
    fn default() -> Self {
        Self {
            line_thickness: 2,
            font_scale: 18.0,
            font: default_font(),
        }
    }
}

impl Annotator {
    pub fn new(line_thickness: u32, font_scale: f32) -> Self {
        Self {
            line_thickness: line_thickness.max(1),
            font_scale,
            font: default_font(),
        }
    }

    pub fn from_settings(settings: &AnnotateSettings) -> Result<Self> {
        let annotator = Self::new(settings.line_thickness, settings.font_scale);
        match &settings.font_path {
            Some(path) => annotator.with_font_file(path),
            None => Ok(annotator),
        }
    }

    /// Render label text with a TrueType/OpenType font file.
    pub fn with_font_file(mut self, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.display()))?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| anyhow!("invalid font {}: {}", path.display(), e))?;
        self.font = Some(font);
        Ok(self)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Copy of `frame` with every detection drawn in its display color.
    pub fn annotate(&self, frame: &Frame, detections: &[Detection]) -> Frame {
        if detections.is_empty() || frame.is_empty() {
            return frame.clone();
        }
        let mut canvas = frame.to_rgb_image();
        for detection in detections {
            self.draw_detection(&mut canvas, detection);
        }
        Frame::from_rgb_image(&canvas)
    }

    fn draw_detection(&self, canvas: &mut RgbImage, detection: &Detection) {
        let color = Rgb(detection.display_color.0);
        let (x1, y1, x2, y2) = detection
            .bbox
            .clamp_to(canvas.width(), canvas.height())
            .to_pixels();
        if x2 <= x1 || y2 <= y1 {
            return;
        }
        let (w, h) = ((x2 - x1) as u32, (y2 - y1) as u32);

        for i in 0..self.line_thickness {
            let grow = i as i32;
            let rect = Rect::at(x1 - grow, y1 - grow).of_size(w + 2 * i, h + 2 * i);
            draw_hollow_rect_mut(canvas, rect, color);
        }

        let text = detection.label_text();
        let (text_w, text_h) = self.text_size(&text);
        let label_top = y1 - text_h as i32 - LABEL_PADDING;
        let label = Rect::at(x1, label_top).of_size(text_w.max(1), text_h + LABEL_PADDING as u32);
        draw_filled_rect_mut(canvas, label, color);

        if let Some(font) = &self.font {
            draw_text_mut(
                canvas,
                LABEL_TEXT_COLOR,
                x1,
                label_top + LABEL_PADDING / 2,
                PxScale::from(self.font_scale),
                font,
                &text,
            );
        }
    }

    fn text_size(&self, text: &str) -> (u32, u32) {
        match &self.font {
            Some(font) => text_size(PxScale::from(self.font_scale), font, text),
            None => {
                // Rough glyph metrics for a sans font at this pixel height.
                let glyph_w = self.font_scale * 0.55;
                (
                    (text.chars().count() as f32 * glyph_w).ceil() as u32,
                    (self.font_scale * 0.75).ceil() as u32,
                )
            }
        }
    }
}
