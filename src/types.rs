use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in whole pixels, top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width` x `height` frame.
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Shift by `(dx, dy)`. Used to move detections found inside a region
    /// back into full-frame coordinates.
    pub fn offset(&self, dx: u32, dy: u32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.width,
            self.height,
        )
    }

    /// Intersect with a `width` x `height` frame.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self::new(
            x,
            y,
            self.right().min(width) - x,
            self.bottom().min(height) - y,
        )
    }
}

/// One detected face and the features found inside it.
///
/// `eyes` and `smiles` stay empty for faces the state machine never examined
/// (faces after the one that triggered a capture).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FaceFeatures {
    pub face: Rect,
    pub eyes: Vec<Rect>,
    pub smiles: Vec<Rect>,
}

impl FaceFeatures {
    pub fn new(face: Rect) -> Self {
        Self {
            face,
            eyes: Vec::new(),
            smiles: Vec::new(),
        }
    }

    pub fn is_smiling(&self) -> bool {
        !self.smiles.is_empty()
    }
}

/// Everything detected in one frame. Rebuilt every frame.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Detections {
    pub faces: Vec<FaceFeatures>,
}

impl Detections {
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn any_smiling(&self) -> bool {
        self.faces.iter().any(FaceFeatures::is_smiling)
    }
}
