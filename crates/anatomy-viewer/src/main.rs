//! Anatomy Viewer - native entry point

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use anatomy_core::{LocationCode, ViewerConfig};
    use anatomy_scene::{Viewer, ViewerOptions};
    use anyhow::{Context, Result};
    use clap::Parser;
    use std::path::PathBuf;
    use tracing::{info, warn, Level};
    use tracing_subscriber::FmtSubscriber;

    #[derive(Parser, Debug)]
    #[command(name = "anatomy-viewer")]
    #[command(about = "3D anatomical viewer highlighting a diagnostic location")]
    #[command(version)]
    struct Args {
        /// glTF/GLB model to show (overrides the config file)
        #[arg(short, long)]
        asset: Option<String>,

        /// Diagnostic location code
        #[arg(long)]
        code: Option<String>,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Log level (trace, debug, info, warn, error)
        #[arg(short, long, default_value = "info")]
        log_level: String,
    }

    pub fn run() -> Result<()> {
        let args = Args::parse();

        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .finish();

        tracing::subscriber::set_global_default(subscriber)?;

        info!("Anatomy Viewer v{}", env!("CARGO_PKG_VERSION"));

        let mut config = match &args.config {
            Some(path) => ViewerConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ViewerConfig::default(),
        };
        if let Some(asset) = args.asset {
            config.model.asset_path = asset;
        }

        let code = args.code.as_deref().and_then(|text| {
            let parsed = LocationCode::parse(text);
            if parsed.is_none() {
                warn!("Ignoring malformed location code: {}", text);
            }
            parsed
        });

        info!(
            asset = %config.model.asset_path,
            code = ?code.map(|c| c.0),
            "Starting viewer"
        );

        let link = Viewer::create(ViewerOptions::with_config(config, code));
        link.dispose();
        info!(frames = link.frames(), "Viewer closed");
        Ok(())
    }
}
