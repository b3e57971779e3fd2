//! Scene location demo
//!
//! Walks a simulated camera north through a handful of nearby posts, feeding
//! noisy location fixes and compass readings into the engine, then logs where
//! each post ended up in the scene.

use anyhow::{Context, Result};
use clap::Parser;
use nalgebra::Vector3;
use scene_location::algorithms::coordinates::shifted_along_bearing;
use scene_location::session::SimulatedLocationProvider;
use scene_location::{
    ConfigurationManager, Coordinate, EngineConfig, MemoryScene, MockTrackingSession, Post,
    SceneLocationEngine, ScreenPoint,
};
use std::path::PathBuf;
use std::thread;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for scene-location-demo
#[derive(Parser, Debug)]
#[command(name = "scene-location-demo")]
#[command(about = "Simulated walk through geo-anchored posts")]
struct Args {
    /// Engine configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of simulated camera frames
    #[arg(short, long, default_value_t = 24)]
    steps: u32,

    /// Seed for the simulated location provider
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Walking speed (meters per frame)
    #[arg(long, default_value_t = 0.8)]
    stride: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scene_location=debug,scene_location_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ConfigurationManager::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?
            .config()
            .clone(),
        None => EngineConfig::default(),
    };
    info!(?config, steps = args.steps, "starting scene location demo");

    let session = MockTrackingSession::new();
    let scene = MemoryScene::new();
    let mut engine = SceneLocationEngine::new(config.clone(), Box::new(session.clone()), Box::new(scene.clone()))
        .context("starting engine")?;
    engine.run()?;

    let origin = Coordinate::new(47.3769, 8.5417, 408.0);
    let mut provider = SimulatedLocationProvider::new(origin, args.seed).with_noise(2.0, (3.0, 15.0));

    // A fix that arrives before tracking has a pose seeds the first estimate
    engine.on_location_update(provider.fix_at(&Vector3::zeros()))?;

    engine.on_posts_loaded(vec![
        Post::new("fountain", shifted_along_bearing(&origin, 30.0, 20.0)).with_content("Meet at the fountain"),
        Post::new("bench", shifted_along_bearing(&origin, 300.0, 8.0)).with_content("Best sunset spot"),
        Post::new("tower", shifted_along_bearing(&origin, 90.0, 450.0)).with_content("View from the tower"),
    ])?;

    for step in 0..args.steps {
        let position = Vector3::new(0.0, 0.0, -(step as f64) * args.stride);
        engine.on_frame(Some(position))?;
        engine.on_heading_update(provider.heading(0.0))?;

        if step % 2 == 0 {
            engine.on_location_update(provider.fix_at(&position))?;
        }
        if step == args.steps / 2 {
            engine.on_post_created(Post::new("note", origin).with_content("Left a note here"))?;
            engine.on_reply_created("fountain", Post::new("fountain-reply", origin).with_content("See you there"))?;
        }

        thread::sleep(config.reconcile_period() / 2);
    }

    engine.flush()?;
    let snapshot = engine.snapshot()?;
    match snapshot.current_location {
        Some(location) => info!(
            latitude = location.coordinate.latitude,
            longitude = location.coordinate.longitude,
            accuracy = location.horizontal_accuracy,
            "camera location"
        ),
        None => warn!("camera location unknown"),
    }

    for id in &snapshot.node_ids {
        if let Some(node) = scene.node(id) {
            info!(
                post_id = %id,
                x = node.placement.position.x,
                y = node.placement.position.y,
                z = node.placement.position.z,
                scale = node.placement.scale,
                updates = node.updates,
                "post placement"
            );
        }
    }

    session.add_hit_region(ScreenPoint::new(200.0, 400.0), 40.0, "bench");
    let selected = engine.selected_node(ScreenPoint::new(210.0, 390.0))?;
    info!(?selected, "tap resolved");

    info!(
        estimates = snapshot.estimate_count,
        ticks = snapshot.reconcile_ticks,
        "demo finished"
    );

    engine.pause();
    engine.shutdown()?;
    Ok(())
}
