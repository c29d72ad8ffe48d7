//! reidsim - Synthetic multi-camera simulation for the person
//! re-identification registry.
//!
//! Spawns one task per simulated camera, each feeding noisy embeddings
//! drawn around per-person ground-truth centroids into one shared
//! registry, plus a periodic expiration sweeper. Prints a JSON report
//! comparing assigned identities against ground truth.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use persontrack_reid::{Config, IdentityStore, MemoryStore, Registry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "reidsim")]
#[command(about = "Synthetic multi-camera simulation for the person re-identification registry")]
struct Args {
    /// Number of simulated cameras
    #[arg(long, default_value_t = 3)]
    cameras: usize,

    /// Number of distinct simulated people
    #[arg(long, default_value_t = 10)]
    people: usize,

    /// Frames per camera
    #[arg(long, default_value_t = 200)]
    frames: usize,

    /// Embedding dimension
    #[arg(long, default_value_t = 512)]
    dim: usize,

    /// Match threshold (cosine similarity)
    #[arg(long, default_value_t = 0.8)]
    threshold: f32,

    /// Per-component uniform noise added to each sighting
    #[arg(long, default_value_t = 0.02)]
    noise: f32,

    /// Delay between frames per camera, in milliseconds
    #[arg(long, default_value_t = 2)]
    frame_ms: u64,

    /// Expiration sweep interval, in milliseconds
    #[arg(long, default_value_t = 100)]
    sweep_ms: u64,

    /// Expiration window, in seconds
    #[arg(long, default_value_t = 60)]
    expiry_secs: i64,

    /// RNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Debug, Serialize)]
struct Report {
    ground_truth_people: usize,
    global_unique: usize,
    active: usize,
    confirmed: usize,
    session_unique: usize,
    expired_total: usize,
    persisted_rows: usize,
    per_camera: Vec<CameraReport>,
}

#[derive(Debug, Serialize)]
struct CameraReport {
    camera: String,
    seen: usize,
    currently_active: usize,
}

fn random_unit_vec(rng: &mut StdRng, dim: usize) -> Vec<f32> {
    let mut v: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

fn noisy(rng: &mut StdRng, centroid: &[f32], noise: f32) -> Vec<f32> {
    centroid
        .iter()
        .map(|&x| x + rng.gen_range(-noise..noise))
        .collect()
}

async fn run_camera(
    camera: String,
    reg: Arc<Registry>,
    store: Arc<MemoryStore>,
    centroids: Arc<Vec<Vec<f32>>>,
    frames: usize,
    noise: f32,
    frame_ms: u64,
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    for frame in 0..frames {
        let person = rng.gen_range(0..centroids.len());
        let emb = noisy(&mut rng, &centroids[person], noise);

        let id = match reg.get_or_create(&emb, Some(&camera), None) {
            Ok(id) => id,
            Err(err) => {
                tracing::error!(%camera, frame, %err, "get_or_create failed");
                continue;
            }
        };
        debug!(%camera, frame, person, %id, "sighting");

        // Persist newly created identities off the matching path, then
        // complete the db correlation.
        if let Some(snapshot) = reg.identity_of(&id) {
            if snapshot.db_id.is_none() {
                match store.persist(&snapshot) {
                    Ok(row) => {
                        if let Err(err) = reg.set_db_id(&id, row) {
                            tracing::warn!(%id, %err, "db correlation failed");
                        }
                    }
                    Err(err) => tracing::warn!(%id, %err, "persist failed"),
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(frame_ms)).await;
    }
    info!(%camera, frames, "camera done");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let reg = Arc::new(Registry::new(Config {
        dim: args.dim,
        threshold: args.threshold,
        ..Config::default()
    }));
    let store = Arc::new(MemoryStore::new());

    let mut rng = StdRng::seed_from_u64(args.seed);
    let centroids = Arc::new(
        (0..args.people)
            .map(|_| random_unit_vec(&mut rng, args.dim))
            .collect::<Vec<_>>(),
    );
    info!(
        cameras = args.cameras,
        people = args.people,
        frames = args.frames,
        dim = args.dim,
        threshold = args.threshold,
        "starting simulation"
    );

    reg.start_new_session();

    // Periodic expiration sweep, as the surrounding system would run it.
    let sweeper = {
        let reg = Arc::clone(&reg);
        let window = chrono::Duration::seconds(args.expiry_secs);
        let mut ticker = tokio::time::interval(Duration::from_millis(args.sweep_ms));
        tokio::spawn(async move {
            let mut expired = 0usize;
            loop {
                ticker.tick().await;
                let n = reg.cleanup_expired(window);
                if n > 0 {
                    expired += n;
                    info!(n, expired, "expired identities");
                }
            }
        })
    };

    let mut tasks = Vec::new();
    for cam in 0..args.cameras {
        tasks.push(tokio::spawn(run_camera(
            format!("cam-{cam}"),
            Arc::clone(&reg),
            Arc::clone(&store),
            Arc::clone(&centroids),
            args.frames,
            args.noise,
            args.frame_ms,
            args.seed.wrapping_add(1 + cam as u64),
        )));
    }
    for t in tasks {
        t.await?;
    }
    sweeper.abort();

    let expired_total = reg.global_unique_count() - reg.active_count();
    let per_camera = (0..args.cameras)
        .map(|cam| {
            let camera = format!("cam-{cam}");
            CameraReport {
                seen: reg.camera_count(&camera),
                currently_active: reg.currently_active_count(&camera),
                camera,
            }
        })
        .collect();

    let report = Report {
        ground_truth_people: args.people,
        global_unique: reg.global_unique_count(),
        active: reg.active_count(),
        confirmed: reg.confirmed_count(),
        session_unique: reg.session_unique_count(),
        expired_total,
        persisted_rows: store.len()?,
        per_camera,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
