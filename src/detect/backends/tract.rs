#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Region;
use crate::error::DetectorError;
use crate::frame::Frame;

const DEFAULT_INPUT_SIZE: u32 = 320;
const PERSON_CLASS: f32 = 0.0;

/// Tract-based backend for ONNX person detectors.
///
/// The model takes a `1x3xHxW` RGB tensor scaled to 0..1 and produces rows of
/// `[x1, y1, x2, y2, score, class]` in model-input pixel coordinates. Rows with
/// class 0 (person) at or above the confidence threshold become regions,
/// rescaled to the frame.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    input_width: u32,
    input_height: u32,
    confidence_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk with the default square input size.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Self::with_input_size(model_path, DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE)
    }

    pub fn with_input_size<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_width: width,
            input_height: height,
            confidence_threshold: 0.5,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let resized = imageops::resize(
            frame.image(),
            self.input_width,
            self.input_height,
            FilterType::Triangle,
        );
        let width = self.input_width as usize;
        let pixels = resized.as_raw();
        tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.input_height as usize, width),
            |(_, channel, y, x)| pixels[(y * width + x) * 3 + channel] as f32 / 255.0,
        )
        .into_tensor()
    }

    fn extract_regions(&self, outputs: TVec<TValue>, frame: &Frame) -> Result<Vec<Region>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let flat: Vec<f32> = view.iter().copied().collect();
        if flat.len() % 6 != 0 {
            return Err(anyhow!(
                "model output has {} values, expected rows of 6",
                flat.len()
            ));
        }

        let sx = frame.width() as f32 / self.input_width as f32;
        let sy = frame.height() as f32 / self.input_height as f32;
        let regions = flat
            .chunks_exact(6)
            .filter(|row| row[5] == PERSON_CLASS && row[4] >= self.confidence_threshold)
            .map(|row| {
                let (x1, y1) = (row[0] * sx, row[1] * sy);
                let (x2, y2) = (row[2] * sx, row[3] * sy);
                Region {
                    x: x1.round() as i32,
                    y: y1.round() as i32,
                    width: (x2 - x1).max(0.0).round() as u32,
                    height: (y2 - y1).max(0.0).round() as u32,
                    confidence: row[4],
                }
            })
            .collect();
        Ok(regions)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, DetectorError> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| DetectorError::new(self.name(), format!("ONNX inference failed: {e}")))?;
        self.extract_regions(outputs, frame)
            .map_err(|e| DetectorError::new(self.name(), e.to_string()))
    }
}
