#![cfg(feature = "backend-tract")]

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::postprocess::{filter_candidates, nms_per_class};
use crate::detect::result::{BoundingBox, RawDetection};
use crate::frame::Frame;

type Plan = TypedRunnableModel<TypedModel>;

/// Tract-based backend for YOLO-style ONNX exports.
///
/// Expects a single `[1, 3, size, size]` float input (RGB, 0..1) and a
/// `[1, 4 + classes, anchors]` output of center boxes followed by per-class
/// scores, the layout of Ultralytics detection exports.
pub struct TractBackend {
    model_path: PathBuf,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
    model: Option<Plan>,
}

impl TractBackend {
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            input_size,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            model: None,
        }
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Override the default NMS overlap threshold.
    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let size = self.input_size;
        let rgb = frame.to_rgb_image();
        let resized = imageops::resize(&rgb, size, size, FilterType::Triangle);
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, size as usize, size as usize),
            |(_, channel, y, x)| resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0,
        );
        input.into_tensor()
    }

    fn decode(&self, outputs: TVec<TValue>, frame: &Frame) -> Result<Vec<RawDetection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("model output is not [1, 4 + classes, anchors]")?;

        let (rows, anchors) = (view.shape()[1], view.shape()[2]);
        if rows < 5 {
            return Err(anyhow!("model output has {} rows, expected at least 5", rows));
        }

        let sx = frame.width as f32 / self.input_size as f32;
        let sy = frame.height as f32 / self.input_size as f32;

        let mut candidates = Vec::new();
        for a in 0..anchors {
            let mut best_class = 0usize;
            let mut best_score = f32::NEG_INFINITY;
            for class in 0..rows - 4 {
                let score = view[[0, 4 + class, a]];
                if score > best_score {
                    best_score = score;
                    best_class = class;
                }
            }
            if best_score < self.confidence_threshold {
                continue;
            }
            let bbox = BoundingBox::from_center(
                view[[0, 0, a]],
                view[[0, 1, a]],
                view[[0, 2, a]],
                view[[0, 3, a]],
            )
            .scale(sx, sy)
            .clamp_to(frame.width, frame.height);
            candidates.push(RawDetection::new(bbox, best_score, best_class as i64));
        }

        let candidates = filter_candidates(candidates, self.confidence_threshold);
        Ok(nms_per_class(candidates, self.iou_threshold))
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn load(&mut self) -> Result<()> {
        if !self.model_path.exists() {
            return Err(anyhow!(
                "model file not found at {}",
                self.model_path.display()
            ));
        }
        let size = self.input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(&self.model_path)
            .with_context(|| {
                format!(
                    "failed to load ONNX model from {}",
                    self.model_path.display()
                )
            })?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;
        log::info!(
            "TractBackend: loaded {} ({}x{} input)",
            self.model_path.display(),
            size,
            size
        );
        self.model = Some(model);
        Ok(())
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| anyhow!("model not loaded"))?;
        let input = self.build_input(frame);
        let outputs = model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, frame)
    }
}
