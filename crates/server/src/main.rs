//! File Browser
//!
//! Serves a directory tree over HTTP.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use filebrowser::config::Config;
use filebrowser::files::FileManager;
use filebrowser::http::{self, AppState};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// File Browser - browse, upload and manage files under one directory.
#[derive(Parser, Debug)]
#[command(name = "filebrowser")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Base location to serve files from
    #[arg(value_name = "BASE")]
    pub base: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind
    #[arg(long)]
    pub port: Option<u16>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Enable file uploading
    #[arg(long)]
    pub enable_upload: bool,

    /// Enable new folder creation
    #[arg(long)]
    pub enable_new_folder: bool,

    /// Text for the notice banner
    #[arg(long)]
    pub notice_text: Option<String>,

    /// Write the effective configuration to FILE and exit
    #[arg(long, value_name = "FILE")]
    pub write_config: Option<PathBuf>,
}

impl Cli {
    /// Apply command-line values over file and environment configuration.
    ///
    /// Switches only ever turn features on.
    pub fn apply(&self, config: &mut Config) {
        if let Some(base) = &self.base {
            config.files.root = base.clone();
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.debug {
            config.server.log_level = "debug".to_string();
        }
        if self.enable_upload {
            config.files.enable_upload = true;
        }
        if self.enable_new_folder {
            config.files.enable_new_folder = true;
        }
        if let Some(text) = &self.notice_text {
            config.ui.notice_text = text.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default()?
    };

    // CLI beats environment beats file
    let env_overrides = config.apply_env_overrides();
    cli.apply(&mut config);
    config.validate()?;

    if let Some(path) = &cli.write_config {
        config.save(path)?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    let _guard = init_logging(&config.server.log_level, config.server.log_dir.as_deref())?;

    tracing::info!("File browser starting...");
    for variable in env_overrides {
        tracing::info!(variable, "Configuration overridden from environment");
    }

    let files = FileManager::from_config(&config)
        .with_context(|| format!("Cannot serve {}", config.files.root.display()))?;
    let features = files.features();
    let root = files.root().to_path_buf();

    let state = Arc::new(AppState::new(files, config.ui.notice_text.clone()));
    let app = http::router(state);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    tracing::info!(
        address = %address,
        root = %root.display(),
        upload = features.upload,
        new_folder = features.new_folder,
        "Serving files"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(http::shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("File browser stopped");
    Ok(())
}

/// Initialize tracing, writing to stderr and, when `log_dir` is set, to a
/// daily-rotated file. The returned guard must live until exit.
fn init_logging(level: &str, log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let level = level.to_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},tower_http={level}")));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "filebrowser.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}
