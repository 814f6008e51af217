//! Drive a headless display end to end: acquire, create surfaces, feed the
//! backend a display-size report and a key stroke, pump, release.

use anyhow::{Context, Result};
use clap::Parser;
use compositor_client::{
    BackendEvent, ClientConfig, DisplayRegistry, HeadlessBackend, IterationBudget, KeyState,
    Keyboard,
};
use log::{info, warn};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "client_demo")]
#[command(about = "Exercise the compositor client against the headless backend")]
#[command(version)]
struct Cli {
    /// Display name to acquire
    #[arg(short, long, default_value = "display-A")]
    display: String,

    /// Number of surfaces to create
    #[arg(short, long, default_value_t = 2)]
    surfaces: u32,

    /// Surface width
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Surface height
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Event loop iterations to run
    #[arg(short, long, default_value_t = 3)]
    iterations: u64,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

/// Counts keys delivered to the first surface
#[derive(Default)]
struct KeyCounter {
    presses: AtomicU32,
    releases: AtomicU32,
}

impl Keyboard for KeyCounter {
    fn direct(&self, key: u32, state: KeyState) {
        info!("⌨️ key {} {:?}", key, state);
        match state {
            KeyState::Pressed => self.presses.fetch_add(1, Ordering::Relaxed),
            KeyState::Released => self.releases.fetch_add(1, Ordering::Relaxed),
        };
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    info!("🚀 Starting compositor client demo");
    info!("📄 Version: {}", compositor_client::VERSION);

    let config = match &cli.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => ClientConfig::default(),
    };

    let backend = HeadlessBackend::new();
    let registry = DisplayRegistry::new(Arc::new(backend.clone()), config);

    let display = registry.acquire(&cli.display);
    if let Some(err) = display.initialization_error() {
        warn!("Backend not available: {}", err);
    }

    let surfaces: Vec<_> = (0..cli.surfaces)
        .map(|i| display.create_surface(&format!("surface-{}", i), cli.width, cli.height))
        .collect();

    let keys = Arc::new(KeyCounter::default());
    if let Some(first) = surfaces.first() {
        first.attach_keyboard(keys.clone());
    }

    backend.push_event(BackendEvent::DisplaySize {
        width: cli.width as i32,
        height: cli.height as i32,
    });
    backend.push_event(BackendEvent::KeyPressed(28));
    backend.push_event(BackendEvent::KeyReleased(28));

    let dispatched = display.run_until(&mut IterationBudget::new(cli.iterations));

    println!("display:        {}", display.name());
    println!("connected:      {}", display.is_connected());
    println!("surfaces:       {}", display.surface_count());
    println!("iterations:     {}", dispatched);
    println!("display size:   {:?}", display.display_size());
    println!("resize replies: {:?}", backend.resize_requests());
    println!(
        "keys:           {} pressed, {} released",
        keys.presses.load(Ordering::Relaxed),
        keys.releases.load(Ordering::Relaxed)
    );

    drop(surfaces);
    let status = display.release();
    println!("release:        {:?}", status);

    info!("🛑 Demo finished");
    Ok(())
}
