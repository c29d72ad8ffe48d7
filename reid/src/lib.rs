//! Person re-identification core: stable global person IDs via cosine
//! matching over appearance embeddings.
//!
//! Detection pipelines feed one embedding per detected person into a
//! shared [`Registry`]; the registry decides whether it is someone
//! already seen (rematch) or a new individual (fresh ID), across frames,
//! cameras and time. Detection, feature extraction and durable storage
//! are external collaborators behind the [`PersonDetector`],
//! [`FeatureExtractor`] and [`IdentityStore`] traits.
//!
//! # Usage
//!
//! ```
//! use persontrack_reid::{Config, Registry};
//!
//! let reg = Registry::new(Config {
//!     dim: 4,
//!     threshold: 0.9,
//!     ..Config::default()
//! });
//!
//! let id = reg.get_or_create(&[1.0, 0.0, 0.0, 0.0], Some("cam-1"), None).unwrap();
//! // Same person, slightly different embedding, different camera.
//! let again = reg.get_or_create(&[0.97, 0.1, 0.0, 0.0], Some("cam-2"), None).unwrap();
//! assert_eq!(id, again);
//! ```
//!
//! # Design
//!
//! - The identity pool is small (tens to low thousands), so matching is
//!   a linear scan; no ANN index.
//! - [`Registry::get_or_create`] holds the write lock across the whole
//!   decide-and-mutate sequence, so concurrent sightings of the same
//!   person resolve to exactly one identity.
//! - [`Registry::try_match`] is the pure-read variant for callers that
//!   only need a "would this match" answer.
//! - Expired identities are deactivated, never deleted, so IDs and
//!   db-row correlations stay stable for the process lifetime.

mod engine;
mod error;
mod identity;
mod pipeline;
mod registry;
mod similarity;
mod store;

pub use engine::{Detection, FeatureExtractor, PersonDetector};
pub use error::ReidError;
pub use identity::{BoundingBox, Config, Identity};
pub use pipeline::{FrameSighting, Pipeline};
pub use registry::Registry;
pub use similarity::cosine_sim;
pub use store::{IdentityStore, MemoryStore};
