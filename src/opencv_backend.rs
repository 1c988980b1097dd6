use std::path::{Path, PathBuf};

use image::{GrayImage, RgbImage};
use opencv::core::{Mat, Rect as CvRect, Scalar, Size, Vector, CV_8UC1};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};

use crate::detector::{crop_region, DetectionParams, FeatureDetector, FeatureKind};
use crate::error::{Error, Result};
use crate::session::FrameSource;
use crate::types::Rect;

/// Where distribution packages usually install the stock cascades.
pub const DEFAULT_CASCADE_DIR: &str = "/usr/share/opencv4/haarcascades";

/// Stock cascade file for each feature kind.
pub fn cascade_file_name(kind: FeatureKind) -> &'static str {
    match kind {
        FeatureKind::Face => "haarcascade_frontalface_default.xml",
        FeatureKind::Eye => "haarcascade_eye.xml",
        FeatureKind::Smile => "haarcascade_smile.xml",
    }
}

struct Cascade {
    classifier: CascadeClassifier,
    params: DetectionParams,
}

impl Cascade {
    fn load(path: &Path, params: DetectionParams) -> Result<Self> {
        let path_str = path.to_str().ok_or_else(|| Error::ModelLoad {
            path: path.to_path_buf(),
            reason: "path is not valid UTF-8".to_string(),
        })?;
        let classifier = CascadeClassifier::new(path_str).map_err(|e| Error::ModelLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if classifier.empty()? {
            return Err(Error::ModelLoad {
                path: path.to_path_buf(),
                reason: "cascade is empty or missing".to_string(),
            });
        }
        Ok(Self { classifier, params })
    }

    fn detect(&mut self, gray: &Mat) -> Result<Vec<Rect>> {
        let (min_w, min_h) = self.params.min_size.unwrap_or((0, 0));
        let mut found = Vector::<CvRect>::new();
        self.classifier.detect_multi_scale(
            gray,
            &mut found,
            self.params.scale_factor,
            self.params.min_neighbors,
            0,
            Size::new(min_w as i32, min_h as i32),
            Size::new(0, 0),
        )?;
        Ok(found
            .iter()
            .map(|r| {
                Rect::new(
                    r.x.max(0) as u32,
                    r.y.max(0) as u32,
                    r.width.max(0) as u32,
                    r.height.max(0) as u32,
                )
            })
            .collect())
    }
}

/// Haar-cascade detector for faces, eyes and smiles.
pub struct HaarCascadeDetector {
    face: Cascade,
    eye: Cascade,
    smile: Cascade,
}

impl HaarCascadeDetector {
    /// Load the three stock cascades from `dir` with the default tuning.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let load = |kind: FeatureKind| -> Result<Cascade> {
            let path: PathBuf = dir.join(cascade_file_name(kind));
            log::debug!("loading {} cascade from {}", kind.name(), path.display());
            Cascade::load(&path, DetectionParams::for_kind(kind))
        };
        Ok(Self {
            face: load(FeatureKind::Face)?,
            eye: load(FeatureKind::Eye)?,
            smile: load(FeatureKind::Smile)?,
        })
    }

    fn cascade_mut(&mut self, kind: FeatureKind) -> &mut Cascade {
        match kind {
            FeatureKind::Face => &mut self.face,
            FeatureKind::Eye => &mut self.eye,
            FeatureKind::Smile => &mut self.smile,
        }
    }

    fn try_detect(
        &mut self,
        kind: FeatureKind,
        gray: &GrayImage,
        region: Rect,
    ) -> Result<Vec<Rect>> {
        let (crop, region) = crop_region(gray, region);
        if region.is_empty() {
            return Ok(Vec::new());
        }
        let mat = gray_to_mat(&crop)?;
        let hits = self.cascade_mut(kind).detect(&mat)?;
        Ok(hits
            .into_iter()
            .map(|r| r.offset(region.x, region.y))
            .collect())
    }
}

impl FeatureDetector for HaarCascadeDetector {
    fn detect(&mut self, kind: FeatureKind, gray: &GrayImage, region: Rect) -> Vec<Rect> {
        self.try_detect(kind, gray, region).unwrap_or_else(|e| {
            log::warn!("{} detection failed: {}", kind.name(), e);
            Vec::new()
        })
    }
}

/// Copy a grayscale buffer into a single-channel `Mat`.
fn gray_to_mat(gray: &GrayImage) -> Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        gray.height() as i32,
        gray.width() as i32,
        CV_8UC1,
        Scalar::all(0.),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(gray.as_raw());
    Ok(mat)
}

/// Webcam frames through OpenCV's video I/O.
///
/// The device is released when the value is dropped.
pub struct OpenCvCamera {
    capture: VideoCapture,
    device: i32,
}

impl OpenCvCamera {
    pub fn open(device: i32) -> Result<Self> {
        let capture = VideoCapture::new(device, videoio::CAP_ANY)
            .map_err(|_| Error::CameraUnavailable { device })?;
        if !capture.is_opened()? {
            return Err(Error::CameraUnavailable { device });
        }
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0);
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0);
        log::info!("opened camera {device} at {width}x{height}");
        Ok(Self { capture, device })
    }
}

impl FrameSource for OpenCvCamera {
    fn read_frame(&mut self) -> Result<RgbImage> {
        let mut mat = Mat::default();
        let ok = self.capture.read(&mut mat).map_err(|e| {
            log::debug!("camera read error: {e}");
            Error::FrameRead
        })?;
        if !ok || mat.empty() {
            return Err(Error::FrameRead);
        }
        bgr_mat_to_rgb(&mat)
    }
}

impl Drop for OpenCvCamera {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            log::warn!("failed to release camera {}: {}", self.device, e);
        }
    }
}

/// Convert an 8-bit BGR `Mat` into an `RgbImage`.
fn bgr_mat_to_rgb(mat: &Mat) -> Result<RgbImage> {
    let width = mat.cols() as u32;
    let height = mat.rows() as u32;
    let bytes = if mat.is_continuous() {
        mat.data_bytes()?.to_vec()
    } else {
        mat.try_clone()?.data_bytes()?.to_vec()
    };
    if mat.channels() != 3 || bytes.len() != (width * height * 3) as usize {
        log::warn!("unexpected camera frame layout: {} channels", mat.channels());
        return Err(Error::FrameRead);
    }
    let rgb: Vec<u8> = bytes
        .chunks_exact(3)
        .flat_map(|bgr| [bgr[2], bgr[1], bgr[0]])
        .collect();
    RgbImage::from_raw(width, height, rgb).ok_or(Error::FrameRead)
}
