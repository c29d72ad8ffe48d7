use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Controls registry behavior.
///
/// All knobs are supplied once at construction; the registry never reads
/// ambient configuration. Zero/empty fields fall back to defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Embedding dimension (e.g. 512 for most person re-id models).
    /// Must be positive; fixed for the registry lifetime.
    pub dim: usize,

    /// Minimum cosine similarity to rematch an existing identity.
    /// Lower = more merges, higher = more new identities.
    /// Default: 0.7.
    pub threshold: f32,

    /// Weight of the incoming embedding when blending it into the
    /// representative vector on rematch (exponential moving average).
    /// 0 < alpha <= 1; 1 replaces the representative outright.
    /// Default: 0.3.
    pub merge_alpha: f32,

    /// Sightings required before an identity counts as confirmed
    /// (filters single-frame false positives). Default: 3.
    pub confirm_sightings: u64,

    /// How recent a camera's last sighting must be for the identity to
    /// count as currently visible on that camera. Default: 10 seconds.
    pub presence_window: Duration,

    /// Prepended to generated IDs (e.g. "person" -> "person:001").
    pub prefix: String,
}

impl Config {
    pub(crate) fn with_defaults(mut self) -> Self {
        if self.threshold == 0.0 {
            self.threshold = 0.7;
        }
        if self.merge_alpha == 0.0 {
            self.merge_alpha = 0.3;
        }
        if self.confirm_sightings == 0 {
            self.confirm_sightings = 3;
        }
        if self.presence_window.is_zero() {
            self.presence_window = Duration::seconds(10);
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dim: 0,
            threshold: 0.0,
            merge_alpha: 0.0,
            confirm_sightings: 0,
            presence_window: Duration::zero(),
            prefix: "person".into(),
        }
    }
}

/// Axis-aligned detection box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One tracked person: a globally unique ID plus the state needed to
/// rematch them across frames, cameras and time.
///
/// Accessors on the registry return clones; mutating a returned
/// `Identity` has no effect on registry state.
#[derive(Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Stable identifier (e.g. "person:001"). Assigned at creation,
    /// never reused, even after the identity is deactivated or cleared.
    pub id: String,

    /// Monotonic creation sequence; lower = created earlier.
    pub(crate) seq: u64,

    /// L2-normalized representative embedding, always dimension D.
    pub vector: Vec<f32>,

    pub created_at: DateTime<Utc>,

    /// Most recent sighting, any camera. Always >= created_at.
    pub last_seen: DateTime<Utc>,

    /// Per-camera last-seen timestamps. Empty for identities that were
    /// only ever fed without camera context.
    pub cameras: HashMap<String, DateTime<Utc>>,

    /// Successful matches plus the creation itself. Always >= 1.
    pub sightings: u64,

    /// Durable row correlation, set by the persistence collaborator.
    /// None until the identity is first persisted.
    pub db_id: Option<i64>,

    /// Eligible for matching. Inactive identities are kept for ID
    /// stability and counters but are never matched again.
    pub active: bool,

    /// Most recent detection box, reporting only.
    pub last_box: Option<BoundingBox>,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("sightings", &self.sightings)
            .field("active", &self.active)
            .field("cameras", &self.cameras.len())
            .field("vector_len", &self.vector.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_with_defaults() {
        let cfg = Config {
            dim: 512,
            ..Config::default()
        }
        .with_defaults();
        assert_eq!(cfg.threshold, 0.7);
        assert_eq!(cfg.merge_alpha, 0.3);
        assert_eq!(cfg.confirm_sightings, 3);
        assert_eq!(cfg.presence_window, Duration::seconds(10));
        assert_eq!(cfg.prefix, "person");
    }

    #[test]
    fn config_explicit_values_kept() {
        let cfg = Config {
            dim: 4,
            threshold: 0.9,
            merge_alpha: 1.0,
            confirm_sightings: 2,
            presence_window: Duration::seconds(30),
            prefix: "p".into(),
        }
        .with_defaults();
        assert_eq!(cfg.threshold, 0.9);
        assert_eq!(cfg.merge_alpha, 1.0);
        assert_eq!(cfg.confirm_sightings, 2);
        assert_eq!(cfg.presence_window, Duration::seconds(30));
    }
}
