use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docforge_core::artifact::ArtifactStore;
use docforge_core::capability::{
    Capability, CapabilityId, DocumentRenderCapability, ImageMagickCapability,
    OfficeEngineCapability, PandocCapability, PdfConvertCapability, PdfRenderCapability,
};
use docforge_core::format::FormatRegistry;
use docforge_core::job::JobTracker;
use docforge_core::pool::{ProcessPoolManager, SofficeEngine};
use docforge_core::router::FallbackRouter;
use docforge_core::{load_config, validate_config, Config};

use docforge_server::api::create_router;
use docforge_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("DOCFORGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        "Configuration loaded"
    );
    info!("Storage root: {:?}", config.storage.root_dir);
    info!("Pool size: {}", config.pool.size);

    // Create the artifact store and start the retention sweep
    let store = Arc::new(
        ArtifactStore::new(config.storage.clone()).context("Failed to create artifact store")?,
    );
    let (sweeper_handle, sweeper_stop) = store.spawn_sweeper();
    info!("Artifact store initialized");

    // Create the office engine pool
    let engine = Arc::new(SofficeEngine::new(&config.pool));
    let pool = Arc::new(ProcessPoolManager::new(config.pool.clone(), engine));
    pool.start().await;
    info!("Process pool started");

    // Build the capability set and the format registry
    let capabilities = build_capabilities(&config);
    let registry = Arc::new(
        FormatRegistry::new(&config.registry, capabilities)
            .context("Failed to build format registry")?,
    );
    info!(
        pairs = registry.supported_pairs().len(),
        "Format registry built"
    );

    // Create the job tracker and the fallback router
    let tracker = Arc::new(JobTracker::new());
    let router = Arc::new(FallbackRouter::new(
        Arc::clone(&registry),
        Arc::clone(&store),
        Arc::clone(&pool),
        Arc::clone(&tracker),
        config.router.clone(),
    ));

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&store),
        Arc::clone(&pool),
        registry,
        tracker,
        router,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    // Stop the sweep loop, then let busy workers finish before teardown.
    let _ = sweeper_stop.send(true);
    let _ = sweeper_handle.await;
    pool.drain().await;
    info!("Process pool drained");

    // Final sweep so restarts do not inherit expired files.
    store.sweep().await;

    Ok(())
}

/// The full capability set wired to the configured engine binaries.
fn build_capabilities(config: &Config) -> HashMap<CapabilityId, Arc<dyn Capability>> {
    let mut capabilities: HashMap<CapabilityId, Arc<dyn Capability>> = HashMap::new();
    capabilities.insert(
        CapabilityId::OfficeEngine,
        Arc::new(OfficeEngineCapability::new(&config.pool)),
    );
    capabilities.insert(
        CapabilityId::PdfConvert,
        Arc::new(PdfConvertCapability::new(&config.engines)),
    );
    capabilities.insert(
        CapabilityId::PdfRender,
        Arc::new(PdfRenderCapability::new(&config.engines)),
    );
    capabilities.insert(
        CapabilityId::ImageMagick,
        Arc::new(ImageMagickCapability::new(&config.engines)),
    );
    capabilities.insert(
        CapabilityId::Pandoc,
        Arc::new(PandocCapability::new(&config.engines)),
    );
    capabilities.insert(
        CapabilityId::DocumentRender,
        Arc::new(DocumentRenderCapability::new(&config.pool, &config.engines)),
    );
    capabilities
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
