#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoxRect, Detection};

/// COCO class names, in YOLO output index order.
pub const COCO_CLASSES: &[&str] = &[
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Square model input edge for YOLOv8-family exports.
const MODEL_INPUT: u32 = 640;

/// Candidate floor applied before suppression. The configured confidence
/// threshold is applied by `Detector` on top of this.
const CANDIDATE_FLOOR: f32 = 0.25;

const IOU_THRESHOLD: f32 = 0.45;

/// Tract-based backend for ONNX object detection.
///
/// Loads a YOLOv8-style export (output `1 x (4 + classes) x anchors`, boxes
/// as center/size in model pixels), resizes each frame to the model input,
/// and maps surviving boxes back to source-frame coordinates.
pub struct TractBackend {
    model: TypedSimplePlan<TypedModel>,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, MODEL_INPUT as usize, MODEL_INPUT as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model })
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        let expected = crate::frame::rgb_len(width, height)?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected,
                pixels.len()
            ));
        }

        let source = image::RgbImage::from_raw(width, height, pixels.to_vec())
            .ok_or_else(|| anyhow!("frame buffer did not match dimensions"))?;
        let resized = image::imageops::resize(
            &source,
            MODEL_INPUT,
            MODEL_INPUT,
            image::imageops::FilterType::Triangle,
        );

        let edge = MODEL_INPUT as usize;
        let input =
            tract_ndarray::Array4::from_shape_fn((1, 3, edge, edge), |(_, channel, y, x)| {
                resized.get_pixel(x as u32, y as u32).0[channel] as f32 / 255.0
            });

        Ok(input.into_tensor())
    }

    fn decode_output(
        &self,
        outputs: TVec<TValue>,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape();
        if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
            return Err(anyhow!("unexpected model output shape {:?}", shape));
        }
        let num_classes = shape[1] - 4;
        let num_anchors = shape[2];

        let sx = frame_width as f32 / MODEL_INPUT as f32;
        let sy = frame_height as f32 / MODEL_INPUT as f32;

        let mut candidates = Vec::new();
        for anchor in 0..num_anchors {
            let mut best_class = 0usize;
            let mut best_score = 0f32;
            for class in 0..num_classes {
                let score = view[[0, 4 + class, anchor]];
                if score > best_score {
                    best_score = score;
                    best_class = class;
                }
            }
            if !best_score.is_finite() || best_score < CANDIDATE_FLOOR {
                continue;
            }

            let cx = view[[0, 0, anchor]] * sx;
            let cy = view[[0, 1, anchor]] * sy;
            let w = view[[0, 2, anchor]] * sx;
            let h = view[[0, 3, anchor]] * sy;
            let label = COCO_CLASSES
                .get(best_class)
                .copied()
                .unwrap_or("unknown");

            candidates.push(Detection::new(
                label,
                best_score.min(1.0),
                BoxRect {
                    x: (cx - w / 2.0).round() as i32,
                    y: (cy - h / 2.0).round() as i32,
                    w: w.max(0.0).round() as u32,
                    h: h.max(0.0).round() as u32,
                },
            ));
        }

        Ok(suppress_overlaps(candidates))
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode_output(outputs, width, height)
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = vec![0u8; crate::frame::rgb_len(MODEL_INPUT, MODEL_INPUT)?];
        self.detect(&blank, MODEL_INPUT, MODEL_INPUT)?;
        Ok(())
    }
}

/// Greedy per-class suppression of overlapping boxes.
fn suppress_overlaps(mut candidates: Vec<Detection>) -> Vec<Detection> {
    candidates.retain(|d| d.confidence.is_finite());
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        let overlaps = kept.iter().any(|k| {
            k.label == candidate.label && iou(&k.rect, &candidate.rect) > IOU_THRESHOLD
        });
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

fn iou(a: &BoxRect, b: &BoxRect) -> f32 {
    let ax2 = a.x + a.w as i32;
    let ay2 = a.y + a.h as i32;
    let bx2 = b.x + b.w as i32;
    let by2 = b.y + b.h as i32;

    let ix = (ax2.min(bx2) - a.x.max(b.x)).max(0) as f32;
    let iy = (ay2.min(by2) - a.y.max(b.y)).max(0) as f32;
    let intersection = ix * iy;
    let union = (a.w as f32 * a.h as f32) + (b.w as f32 * b.h as f32) - intersection;
    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppression_keeps_highest_confidence_per_overlap() {
        let rect = BoxRect {
            x: 10,
            y: 10,
            w: 100,
            h: 100,
        };
        let nearly = BoxRect {
            x: 12,
            y: 12,
            w: 100,
            h: 100,
        };
        let elsewhere = BoxRect {
            x: 400,
            y: 300,
            w: 50,
            h: 50,
        };
        let kept = suppress_overlaps(vec![
            Detection::new("person", 0.6, nearly),
            Detection::new("person", 0.9, rect),
            Detection::new("person", 0.7, elsewhere),
        ]);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.7);
    }

    #[test]
    fn overlapping_boxes_of_different_classes_both_survive() {
        let rect = BoxRect {
            x: 10,
            y: 10,
            w: 100,
            h: 100,
        };
        let kept = suppress_overlaps(vec![
            Detection::new("person", 0.9, rect),
            Detection::new("dog", 0.8, rect),
        ]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = BoxRect {
            x: 0,
            y: 0,
            w: 10,
            h: 10,
        };
        let b = BoxRect {
            x: 100,
            y: 100,
            w: 10,
            h: 10,
        };
        assert_eq!(iou(&a, &b), 0.0);
    }
}
