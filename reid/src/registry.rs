use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use crate::identity::{BoundingBox, Config, Identity};
use crate::similarity::{cosine_sim, l2_norm};
use crate::ReidError;

struct RegistryInner {
    cfg: Config,
    identities: Vec<Identity>,
    next_seq: u64,
    session_start: DateTime<Utc>,
}

impl RegistryInner {
    fn check_dim(&self, emb: &[f32]) -> Result<(), ReidError> {
        if emb.len() != self.cfg.dim {
            return Err(ReidError::DimensionMismatch {
                expected: self.cfg.dim,
                got: emb.len(),
            });
        }
        Ok(())
    }

    fn format_id(&self, seq: u64) -> String {
        if self.cfg.prefix.is_empty() {
            format!("{seq:03}")
        } else {
            format!("{}:{:03}", self.cfg.prefix, seq)
        }
    }

    /// Best active identity for the embedding, with its similarity.
    /// Ties on similarity prefer the most recent `last_seen`, then the
    /// lowest creation sequence, so results are deterministic.
    fn best_active(&self, emb: &[f32]) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, p) in self.identities.iter().enumerate() {
            if !p.active {
                continue;
            }
            let sim = cosine_sim(emb, &p.vector);
            let better = match best {
                None => true,
                Some((j, best_sim)) => {
                    let cur = &self.identities[j];
                    sim > best_sim
                        || (sim == best_sim
                            && (p.last_seen > cur.last_seen
                                || (p.last_seen == cur.last_seen && p.seq < cur.seq)))
                }
            };
            if better {
                best = Some((i, sim));
            }
        }
        best
    }

    fn find(&self, id: &str) -> Option<usize> {
        self.identities.iter().position(|p| p.id == id)
    }
}

/// Assigns stable person IDs to appearance embeddings.
///
/// One registry instance is shared by every detection pipeline in the
/// process; construct it explicitly and inject it into callers.
/// Thread-safe: all methods take `&self` and can be called concurrently.
/// Every read-then-write operation holds the write lock end-to-end, so
/// two concurrent sightings of the same person can never race into two
/// identities. No method performs I/O while holding the lock.
pub struct Registry {
    inner: RwLock<RegistryInner>,
}

impl Registry {
    /// Creates a new Registry. Panics if `cfg.dim` is 0.
    pub fn new(cfg: Config) -> Self {
        assert!(cfg.dim > 0, "reid: Config.dim must be positive");
        let cfg = cfg.with_defaults();
        Self {
            inner: RwLock::new(RegistryInner {
                cfg,
                identities: Vec::new(),
                next_seq: 0,
                session_start: Utc::now(),
            }),
        }
    }

    /// Embedding dimension this registry accepts.
    pub fn dim(&self) -> usize {
        self.inner.read().unwrap().cfg.dim
    }

    /// Resolves an embedding to a person ID, creating a new identity if
    /// no active one matches above the threshold.
    ///
    /// On rematch the representative vector is blended with the incoming
    /// embedding (EMA, `Config::merge_alpha`), `last_seen`, the camera's
    /// last-seen and the sighting count are updated. Matching is global
    /// across cameras; `camera` only feeds per-camera statistics and
    /// `bbox` is recorded for reporting only.
    pub fn get_or_create(
        &self,
        emb: &[f32],
        camera: Option<&str>,
        bbox: Option<BoundingBox>,
    ) -> Result<String, ReidError> {
        let mut inner = self.inner.write().unwrap();
        inner.check_dim(emb)?;

        let now = Utc::now();
        let threshold = inner.cfg.threshold;
        let alpha = inner.cfg.merge_alpha;

        let mut incoming = emb.to_vec();
        l2_norm(&mut incoming);

        if let Some((idx, sim)) = inner.best_active(emb) {
            if sim >= threshold {
                let p = &mut inner.identities[idx];
                for (r, x) in p.vector.iter_mut().zip(&incoming) {
                    *r = (1.0 - alpha) * *r + alpha * x;
                }
                l2_norm(&mut p.vector);
                p.last_seen = now;
                p.sightings += 1;
                if let Some(cam) = camera {
                    p.cameras.insert(cam.to_string(), now);
                }
                if bbox.is_some() {
                    p.last_box = bbox;
                }
                return Ok(p.id.clone());
            }
        }

        inner.next_seq += 1;
        let seq = inner.next_seq;
        let id = inner.format_id(seq);
        let mut cameras = std::collections::HashMap::new();
        if let Some(cam) = camera {
            cameras.insert(cam.to_string(), now);
        }
        inner.identities.push(Identity {
            id: id.clone(),
            seq,
            vector: incoming,
            created_at: now,
            last_seen: now,
            cameras,
            sightings: 1,
            db_id: None,
            active: true,
            last_box: bbox,
        });
        Ok(id)
    }

    /// Pure read: best active match for the embedding without mutating
    /// anything.
    ///
    /// Returns `(id, similarity, matched)`:
    /// - `id`: the best matching identity, or empty string if no active
    ///   identities exist
    /// - `similarity`: cosine similarity to it (0 when empty)
    /// - `matched`: true if the similarity clears the threshold
    pub fn try_match(&self, emb: &[f32]) -> Result<(String, f32, bool), ReidError> {
        let inner = self.inner.read().unwrap();
        inner.check_dim(emb)?;

        match inner.best_active(emb) {
            Some((idx, sim)) => {
                let id = inner.identities[idx].id.clone();
                Ok((id, sim, sim >= inner.cfg.threshold))
            }
            None => Ok((String::new(), 0.0, false)),
        }
    }

    /// Re-anchors an identity's representative vector outside the
    /// automatic matching path (e.g. after manual correction). The
    /// embedding replaces the representative outright. Works on inactive
    /// identities too. Does not count as a sighting.
    pub fn update_identity(
        &self,
        id: &str,
        emb: &[f32],
        camera: Option<&str>,
    ) -> Result<(), ReidError> {
        let mut inner = self.inner.write().unwrap();
        inner.check_dim(emb)?;

        let idx = inner.find(id).ok_or_else(|| ReidError::NotFound(id.to_string()))?;
        let now = Utc::now();
        let mut vector = emb.to_vec();
        l2_norm(&mut vector);
        let p = &mut inner.identities[idx];
        p.vector = vector;
        p.last_seen = now;
        if let Some(cam) = camera {
            p.cameras.insert(cam.to_string(), now);
        }
        Ok(())
    }

    /// Correlates an identity to its durable row once the persistence
    /// collaborator has written it. Re-setting the same row is allowed
    /// (idempotent re-persist); a *different* row for an already
    /// correlated identity means the collaborator wrote the identity
    /// twice and is caught by a debug assertion. Unknown IDs are a hard
    /// error.
    pub fn set_db_id(&self, id: &str, db_id: i64) -> Result<(), ReidError> {
        let mut inner = self.inner.write().unwrap();
        let idx = inner.find(id).ok_or_else(|| ReidError::NotFound(id.to_string()))?;
        let p = &mut inner.identities[idx];
        debug_assert!(
            p.db_id.is_none() || p.db_id == Some(db_id),
            "reid: {} already correlated to row {:?}, refusing silent remap to {db_id}",
            p.id,
            p.db_id,
        );
        p.db_id = Some(db_id);
        Ok(())
    }

    /// Durable row for an identity. `Ok(None)` means "not yet
    /// persisted", an expected transient state, not an error.
    pub fn get_db_id(&self, id: &str) -> Result<Option<i64>, ReidError> {
        let inner = self.inner.read().unwrap();
        let idx = inner.find(id).ok_or_else(|| ReidError::NotFound(id.to_string()))?;
        Ok(inner.identities[idx].db_id)
    }

    /// Deactivates every active identity not seen within `window`.
    /// Returns the number deactivated. Atomic with respect to matching:
    /// no concurrent `get_or_create` can observe a half-removed identity.
    pub fn cleanup_expired(&self, window: Duration) -> usize {
        let mut inner = self.inner.write().unwrap();
        let cutoff = Utc::now() - window;
        let mut n = 0;
        for p in inner.identities.iter_mut() {
            if p.active && p.last_seen < cutoff {
                p.active = false;
                n += 1;
            }
        }
        n
    }

    /// Removes every identity record. IDs are still never reused:
    /// the creation sequence survives the clear.
    pub fn clear_all(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.identities.clear();
    }

    /// Removes `camera`'s association from every active identity and
    /// deactivates identities left with no remaining camera association.
    /// Identities that never had camera context are untouched.
    /// Returns the number deactivated.
    pub fn clear_camera(&self, camera: &str) -> usize {
        let mut inner = self.inner.write().unwrap();
        let mut n = 0;
        for p in inner.identities.iter_mut() {
            if !p.active {
                continue;
            }
            if p.cameras.remove(camera).is_some() && p.cameras.is_empty() {
                p.active = false;
                n += 1;
            }
        }
        n
    }

    /// Starts a new counting session: `session_unique_count` reflects
    /// only identities created after this call. Nothing else changes.
    pub fn start_new_session(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.session_start = Utc::now();
    }

    /// Active identities, eligible for matching.
    pub fn active_count(&self) -> usize {
        let inner = self.inner.read().unwrap();
        inner.identities.iter().filter(|p| p.active).count()
    }

    /// Active identities with enough sightings to be trusted as real
    /// (`Config::confirm_sightings`).
    pub fn confirmed_count(&self) -> usize {
        let inner = self.inner.read().unwrap();
        inner
            .identities
            .iter()
            .filter(|p| p.active && p.sightings >= inner.cfg.confirm_sightings)
            .count()
    }

    /// Active identities ever sighted by `camera`.
    pub fn camera_count(&self, camera: &str) -> usize {
        let inner = self.inner.read().unwrap();
        inner
            .identities
            .iter()
            .filter(|p| p.active && p.cameras.contains_key(camera))
            .count()
    }

    /// Active identities sighted by `camera` within the presence window,
    /// i.e. people currently visible on that camera.
    pub fn currently_active_count(&self, camera: &str) -> usize {
        let inner = self.inner.read().unwrap();
        let cutoff = Utc::now() - inner.cfg.presence_window;
        inner
            .identities
            .iter()
            .filter(|p| {
                p.active && p.cameras.get(camera).is_some_and(|&seen| seen >= cutoff)
            })
            .count()
    }

    /// Identities ever created by this registry, active or not.
    /// Survives `cleanup_expired` and `clear_all`.
    pub fn global_unique_count(&self) -> usize {
        let inner = self.inner.read().unwrap();
        inner.next_seq as usize
    }

    /// Identities created in the current UTC calendar day.
    pub fn today_unique_count(&self) -> usize {
        let inner = self.inner.read().unwrap();
        let today = Utc::now().date_naive();
        inner
            .identities
            .iter()
            .filter(|p| p.created_at.date_naive() == today)
            .count()
    }

    /// Identities created since the last `start_new_session` call.
    pub fn session_unique_count(&self) -> usize {
        let inner = self.inner.read().unwrap();
        inner
            .identities
            .iter()
            .filter(|p| p.created_at >= inner.session_start)
            .count()
    }

    /// Snapshot of all active identities.
    pub fn identities(&self) -> Vec<Identity> {
        let inner = self.inner.read().unwrap();
        inner.identities.iter().filter(|p| p.active).cloned().collect()
    }

    /// Snapshot of one identity (active or not), or None if unknown.
    pub fn identity_of(&self, id: &str) -> Option<Identity> {
        let inner = self.inner.read().unwrap();
        inner.identities.iter().find(|p| p.id == id).cloned()
    }

    /// Number of active identities. Alias for [`Registry::active_count`].
    pub fn len(&self) -> usize {
        self.active_count()
    }

    /// True if no identity is active.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
