use crate::identity::BoundingBox;
use crate::ReidError;

/// A person located in a frame by a detection engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
}

/// Locates person bounding boxes in a decoded frame.
///
/// The input is a decoded image buffer in whatever layout the concrete
/// model family expects; one implementation per model family. Filtering
/// detections by confidence or size is the caller's concern, not the
/// detector's.
///
/// # Thread Safety
///
/// Implementations must be safe for concurrent use.
pub trait PersonDetector: Send + Sync {
    /// Returns all person detections in the frame, unfiltered.
    fn detect(&self, image: &[u8]) -> Result<Vec<Detection>, ReidError>;
}

/// Turns a person crop into a fixed-dimension appearance embedding.
///
/// The output dimension is returned by [`FeatureExtractor::dimension`]
/// and must equal the registry's configured dimension.
///
/// # Thread Safety
///
/// Implementations must be safe for concurrent use.
pub trait FeatureExtractor: Send + Sync {
    /// Computes an appearance embedding for the person inside `bbox`.
    fn extract(&self, image: &[u8], bbox: &BoundingBox) -> Result<Vec<f32>, ReidError>;

    /// Returns the dimensionality of the embedding vectors (e.g., 512).
    fn dimension(&self) -> usize;
}
