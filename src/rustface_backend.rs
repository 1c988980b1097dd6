use std::path::Path;

use image::GrayImage;
use rustface::{Detector, ImageData};

use crate::detector::{crop_region, FeatureDetector, FeatureKind};
use crate::error::{Error, Result};
use crate::types::Rect;

/// Faces from the SeetaFace engine, eyes and smiles from another backend.
///
/// SeetaFace only knows frontal faces, so the per-face searches are handed to
/// `features`, typically a Haar-cascade detector.
pub struct RustfaceDetector<F> {
    detector: Box<dyn Detector>,
    features: F,
}

impl<F: FeatureDetector> RustfaceDetector<F> {
    /// Load a SeetaFace model file (e.g. `seeta_fd_frontal_v1.0.bin`).
    pub fn from_file(model: impl AsRef<Path>, min_face_size: u32, features: F) -> Result<Self> {
        let model = model.as_ref();
        let model_str = model.to_str().ok_or_else(|| Error::ModelLoad {
            path: model.to_path_buf(),
            reason: "path is not valid UTF-8".to_string(),
        })?;
        let mut detector = rustface::create_detector(model_str).map_err(|e| Error::ModelLoad {
            path: model.to_path_buf(),
            reason: e.to_string(),
        })?;
        detector.set_min_face_size(min_face_size);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);
        Ok(Self { detector, features })
    }

    fn detect_faces(&mut self, gray: &GrayImage, region: Rect) -> Vec<Rect> {
        let (crop, region) = crop_region(gray, region);
        if region.is_empty() {
            return Vec::new();
        }
        let faces = self
            .detector
            .detect(&ImageData::new(crop.as_raw(), crop.width(), crop.height()));

        faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                // SeetaFace boxes may hang over the frame edge
                let x = bbox.x().max(0) as u32;
                let y = bbox.y().max(0) as u32;
                let width = (bbox.width() as i64 + bbox.x().min(0) as i64).max(0) as u32;
                let height = (bbox.height() as i64 + bbox.y().min(0) as i64).max(0) as u32;
                Rect::new(x, y, width, height)
                    .clamp_to(crop.width(), crop.height())
                    .offset(region.x, region.y)
            })
            .filter(|r| !r.is_empty())
            .collect()
    }
}

impl<F: FeatureDetector> FeatureDetector for RustfaceDetector<F> {
    fn detect(&mut self, kind: FeatureKind, gray: &GrayImage, region: Rect) -> Vec<Rect> {
        match kind {
            FeatureKind::Face => self.detect_faces(gray, region),
            FeatureKind::Eye | FeatureKind::Smile => self.features.detect(kind, gray, region),
        }
    }
}
