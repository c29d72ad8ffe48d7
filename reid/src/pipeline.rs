use std::sync::Arc;

use crate::engine::{FeatureExtractor, PersonDetector};
use crate::identity::BoundingBox;
use crate::registry::Registry;
use crate::ReidError;

/// One resolved person in a processed frame.
#[derive(Debug, Clone)]
pub struct FrameSighting {
    /// Stable person ID assigned by the registry.
    pub id: String,
    pub bbox: BoundingBox,
    /// Detector confidence for this box.
    pub confidence: f32,
}

/// Per-frame glue: detector -> extractor -> registry.
///
/// Holds no state of its own; one pipeline per camera or video job,
/// all sharing the same registry for cross-camera re-identification.
pub struct Pipeline {
    detector: Arc<dyn PersonDetector>,
    extractor: Arc<dyn FeatureExtractor>,
    registry: Arc<Registry>,
}

impl Pipeline {
    /// Wires the engines to a shared registry. Fails if the extractor's
    /// embedding dimension does not match the registry's.
    pub fn new(
        detector: Arc<dyn PersonDetector>,
        extractor: Arc<dyn FeatureExtractor>,
        registry: Arc<Registry>,
    ) -> Result<Self, ReidError> {
        if extractor.dimension() != registry.dim() {
            return Err(ReidError::DimensionMismatch {
                expected: registry.dim(),
                got: extractor.dimension(),
            });
        }
        Ok(Self {
            detector,
            extractor,
            registry,
        })
    }

    /// Resolves every person in the frame to a stable ID.
    /// `camera` feeds per-camera statistics only.
    pub fn process_frame(
        &self,
        image: &[u8],
        camera: Option<&str>,
    ) -> Result<Vec<FrameSighting>, ReidError> {
        let detections = self.detector.detect(image)?;
        let mut sightings = Vec::with_capacity(detections.len());
        for det in detections {
            let emb = self.extractor.extract(image, &det.bbox)?;
            let id = self.registry.get_or_create(&emb, camera, Some(det.bbox))?;
            sightings.push(FrameSighting {
                id,
                bbox: det.bbox,
                confidence: det.confidence,
            });
        }
        Ok(sightings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Detection;
    use crate::Config;

    /// Reports one fixed box per frame.
    struct OneBoxDetector;

    impl PersonDetector for OneBoxDetector {
        fn detect(&self, _image: &[u8]) -> Result<Vec<Detection>, ReidError> {
            Ok(vec![Detection {
                bbox: BoundingBox {
                    x: 10.0,
                    y: 20.0,
                    width: 64.0,
                    height: 128.0,
                },
                confidence: 0.95,
            }])
        }
    }

    /// Maps the first image byte to one of a few fixed embeddings,
    /// standing in for a real appearance model.
    struct ByteExtractor;

    impl FeatureExtractor for ByteExtractor {
        fn extract(&self, image: &[u8], _bbox: &BoundingBox) -> Result<Vec<f32>, ReidError> {
            let mut emb = vec![0.0; 4];
            emb[(image[0] % 4) as usize] = 1.0;
            Ok(emb)
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    fn registry(dim: usize) -> Arc<Registry> {
        Arc::new(Registry::new(Config {
            dim,
            threshold: 0.9,
            ..Config::default()
        }))
    }

    #[test]
    fn same_appearance_same_id_across_frames() {
        let reg = registry(4);
        let pipe = Pipeline::new(
            Arc::new(OneBoxDetector),
            Arc::new(ByteExtractor),
            Arc::clone(&reg),
        )
        .unwrap();

        let frame1 = pipe.process_frame(&[0, 1, 2], Some("cam-1")).unwrap();
        let frame2 = pipe.process_frame(&[0, 9, 9], Some("cam-2")).unwrap();
        assert_eq!(frame1.len(), 1);
        assert_eq!(frame1[0].id, frame2[0].id, "same appearance across cameras");
        assert_eq!(frame1[0].confidence, 0.95);

        let other = pipe.process_frame(&[1, 0, 0], Some("cam-1")).unwrap();
        assert_ne!(frame1[0].id, other[0].id);

        assert_eq!(reg.active_count(), 2);
        assert_eq!(reg.camera_count("cam-1"), 2);
        assert_eq!(reg.camera_count("cam-2"), 1);
    }

    #[test]
    fn sighting_records_bbox() {
        let reg = registry(4);
        let pipe = Pipeline::new(
            Arc::new(OneBoxDetector),
            Arc::new(ByteExtractor),
            Arc::clone(&reg),
        )
        .unwrap();

        let frame = pipe.process_frame(&[2, 0, 0], None).unwrap();
        let p = reg.identity_of(&frame[0].id).unwrap();
        assert_eq!(p.last_box, Some(frame[0].bbox));
    }

    #[test]
    fn dimension_mismatch_at_wiring() {
        let reg = registry(512);
        assert!(matches!(
            Pipeline::new(Arc::new(OneBoxDetector), Arc::new(ByteExtractor), reg),
            Err(ReidError::DimensionMismatch {
                expected: 512,
                got: 4
            })
        ));
    }
}
