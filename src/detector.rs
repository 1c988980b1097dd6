use image::GrayImage;

use crate::types::Rect;

/// The visual patterns the capture loop asks a detector for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Face,
    Eye,
    Smile,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 3] = [
        FeatureKind::Face,
        FeatureKind::Eye,
        FeatureKind::Smile,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureKind::Face => "face",
            FeatureKind::Eye => "eye",
            FeatureKind::Smile => "smile",
        }
    }
}

/// Sensitivity knobs of a multi-scale sliding-window detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Image pyramid step between scales, must be > 1.0.
    pub scale_factor: f64,
    /// Overlapping candidates required before a hit is reported.
    pub min_neighbors: i32,
    /// Smallest object size `(width, height)`; `None` lets the model decide.
    pub min_size: Option<(u32, u32)>,
}

impl DetectionParams {
    /// Tuning used for each feature kind.
    ///
    /// Faces are searched coarsely, eyes with the cascade defaults, and
    /// smiles very conservatively since the smile cascade fires on almost
    /// any mouth at low neighbor counts.
    pub const fn for_kind(kind: FeatureKind) -> Self {
        match kind {
            FeatureKind::Face => Self {
                scale_factor: 1.3,
                min_neighbors: 5,
                min_size: None,
            },
            FeatureKind::Eye => Self {
                scale_factor: 1.1,
                min_neighbors: 3,
                min_size: None,
            },
            FeatureKind::Smile => Self {
                scale_factor: 1.8,
                min_neighbors: 20,
                min_size: Some((25, 25)),
            },
        }
    }
}

/// Pluggable detection backend.
///
/// Implementations search `gray` inside `region` for `kind` and return hits
/// in full-frame coordinates. Detection is total: a backend that fails
/// internally logs the failure and returns no hits.
pub trait FeatureDetector {
    fn detect(&mut self, kind: FeatureKind, gray: &GrayImage, region: Rect) -> Vec<Rect>;
}

impl<D: FeatureDetector + ?Sized> FeatureDetector for Box<D> {
    fn detect(&mut self, kind: FeatureKind, gray: &GrayImage, region: Rect) -> Vec<Rect> {
        (**self).detect(kind, gray, region)
    }
}

impl<D: FeatureDetector + ?Sized> FeatureDetector for &mut D {
    fn detect(&mut self, kind: FeatureKind, gray: &GrayImage, region: Rect) -> Vec<Rect> {
        (**self).detect(kind, gray, region)
    }
}

/// Copy the part of `gray` under `region` (clipped to the frame) into its own
/// buffer. Returns the clipped region alongside so hits can be offset back.
pub fn crop_region(gray: &GrayImage, region: Rect) -> (GrayImage, Rect) {
    let region = region.clamp_to(gray.width(), gray.height());
    let view = image::imageops::crop_imm(gray, region.x, region.y, region.width, region.height);
    (view.to_image(), region)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smile_params_are_strict() {
        let smile = DetectionParams::for_kind(FeatureKind::Smile);
        assert_eq!(smile.scale_factor, 1.8);
        assert_eq!(smile.min_neighbors, 20);
        assert_eq!(smile.min_size, Some((25, 25)));

        let face = DetectionParams::for_kind(FeatureKind::Face);
        assert_eq!(face.scale_factor, 1.3);
        assert_eq!(face.min_neighbors, 5);
        assert_eq!(face.min_size, None);
    }

    #[test]
    fn every_kind_has_a_valid_pyramid_step() {
        for kind in FeatureKind::ALL {
            assert!(DetectionParams::for_kind(kind).scale_factor > 1.0, "{}", kind.name());
        }
    }

    #[test]
    fn crop_region_copies_pixels_and_clips() {
        let gray = GrayImage::from_fn(10, 8, |x, y| image::Luma([(x + y * 10) as u8]));

        let (crop, region) = crop_region(&gray, Rect::new(2, 3, 4, 2));
        assert_eq!(region, Rect::new(2, 3, 4, 2));
        assert_eq!(crop.dimensions(), (4, 2));
        assert_eq!(crop.get_pixel(0, 0).0[0], 32);
        assert_eq!(crop.get_pixel(3, 1).0[0], 45);

        let (crop, region) = crop_region(&gray, Rect::new(8, 6, 5, 5));
        assert_eq!(region, Rect::new(8, 6, 2, 2));
        assert_eq!(crop.dimensions(), (2, 2));
    }

    struct Fixed(Vec<Rect>);

    impl FeatureDetector for Fixed {
        fn detect(&mut self, _kind: FeatureKind, _gray: &GrayImage, _region: Rect) -> Vec<Rect> {
            self.0.clone()
        }
    }

    #[test]
    fn boxed_detector_delegates() {
        let mut boxed: Box<dyn FeatureDetector> = Box::new(Fixed(vec![Rect::new(1, 2, 3, 4)]));
        let gray = GrayImage::new(4, 4);
        let hits = boxed.detect(FeatureKind::Face, &gray, Rect::full(4, 4));
        assert_eq!(hits, vec![Rect::new(1, 2, 3, 4)]);
    }
}
