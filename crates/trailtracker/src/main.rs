//! Main application entry point for the trail tracker
//!
//! Loads configuration, sets up logging and either runs the tracker against
//! the headless host or inspects the stored paths.

mod cli;
mod config;
mod feed;
mod host;
mod logging;
mod signals;

use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use trail_core::{
    JsonPathStorage, Path, PathStorage, SaveReport, StorageResult, TrailService, WorldHost,
};

use cli::{CliArgs, Mode};
use config::AppConfig;
use host::HeadlessHost;
use signals::ShutdownSignals;

/// Main application struct
pub struct Application {
    config: AppConfig,
    mode: Mode,
    exit_on_eof: bool,
}

impl Application {
    /// Loads the configuration file and applies CLI overrides.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(paths_dir) = args.paths_dir {
            config.storage.directory = paths_dir.to_string_lossy().to_string();
        }

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }

        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {}", e).into());
        }

        Ok(Self {
            config,
            mode: args.mode,
            exit_on_eof: args.exit_on_eof,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let storage = Arc::new(
            JsonPathStorage::new(self.config.storage_directory())
                .with_default_radius(self.config.tracker.default_detection_radius),
        );
        match &self.mode {
            Mode::Serve => self.serve(storage).await,
            Mode::List => {
                let mut paths: Vec<Path> = storage.load_all().await?.paths.into_values().collect();
                paths.sort_by(|a, b| a.name().cmp(b.name()));
                if paths.is_empty() {
                    println!("No paths stored in {}", storage.directory().display());
                }
                for path in &paths {
                    println!(
                        "{:<32} {:>6} points  radius {:<5} {}",
                        path.name(),
                        path.point_count(),
                        path.detection_radius(),
                        path.description()
                    );
                }
                Ok(())
            }
            Mode::Info(name) => {
                let mut report = storage.load_all().await?;
                let path = report
                    .paths
                    .remove(name)
                    .ok_or_else(|| format!("There is no path named '{}'.", name))?;
                println!("{}", describe(&path));
                Ok(())
            }
        }
    }

    async fn serve(&self, storage: Arc<JsonPathStorage>) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting TrailTracker v{}", env!("CARGO_PKG_VERSION"));
        info!("📋 Configuration Summary:");
        info!("  📂 Path folder: {}", self.config.storage.directory);
        info!("  🎨 Render interval: {}ms", self.config.tracker.render_interval_ms);
        info!("  🔔 Reminder interval: {}ms", self.config.tracker.reminder_interval_ms);

        let mut signals = ShutdownSignals::install()?;
        let host = Arc::new(HeadlessHost::new());
        let service = Arc::new(TrailService::new(
            self.config.tracker.clone(),
            Arc::clone(&host) as Arc<dyn WorldHost>,
            storage,
        ));
        service.start().await?;
        let events = feed::spawn_stdin_reader()?;

        info!("✅ TrailTracker is now running, reading events from stdin");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        let report = run_service(service, host, events, self.exit_on_eof, signals.recv()).await?;
        if report.failed > 0 {
            error!("❌ {} path(s) could not be saved", report.failed);
        }

        info!("👋 TrailTracker shutdown complete");
        Ok(())
    }
}

/// Applies feed events until `shutdown` resolves, or until the feed closes
/// when `exit_on_eof` is set. Then stops the service and saves every path.
async fn run_service<S>(
    service: Arc<TrailService>,
    host: Arc<HeadlessHost>,
    events: mpsc::Receiver<String>,
    exit_on_eof: bool,
    shutdown: S,
) -> StorageResult<SaveReport>
where
    S: Future<Output = io::Result<&'static str>>,
{
    let mut feed_handle = tokio::spawn(feed::pump(events, Arc::clone(&service), Arc::clone(&host)));
    let mut feed_open = true;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            received = &mut shutdown => {
                match received {
                    Ok(name) => info!("📡 Received {}", name),
                    Err(e) => error!("❌ Signal handling failed: {}", e),
                }
                break;
            }
            applied = &mut feed_handle, if feed_open => {
                feed_open = false;
                info!("📭 Event feed closed after {} events", applied.unwrap_or_default());
                if exit_on_eof {
                    break;
                }
            }
        }
    }

    info!(
        "🛑 Shutting down with {} agent(s) online...",
        host.online_count()
    );
    feed_handle.abort();
    service.shutdown().await
}

/// Multi-line description of a stored path.
fn describe(path: &Path) -> String {
    let mut out = format!("Path: {}\n", path.name());
    if !path.description().is_empty() {
        out.push_str(&format!("Description: {}\n", path.description()));
    }
    out.push_str(&format!("Points: {}\n", path.point_count()));
    out.push_str(&format!("Detection radius: {}\n", path.detection_radius()));
    out.push_str(&format!("Display effect: {}\n", path.display_effect()));
    if path.max_points() > 0 {
        out.push_str(&format!("Max points: {}\n", path.max_points()));
    }
    out.push_str(&format!(
        "Created by {} on {}",
        path.created_by(),
        path.created_at().format("%Y-%m-%d %H:%M UTC")
    ));
    if let Some(first) = path.points().iter().next() {
        out.push_str(&format!("\nStarts at {}", first));
    }
    out
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = logging::setup_logging(&app.config().logging) {
                eprintln!("❌ Failed to initialize logging: {}", e);
            }
            if let Err(e) = app.run().await {
                error!("❌ Application error: {}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to start application: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
