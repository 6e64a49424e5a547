use anyhow::{Context, Result};
use clap::Parser;
use podbooth::{AppState, CaptureBackendFactory, Config, NatsGateway};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "podbooth", about = "Live interview recording booth")]
struct Args {
    /// Config file (without extension), resolved by the config crate
    #[arg(long, default_value = "config/podbooth")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)
        .with_context(|| format!("failed to load config {:?}", args.config))?;

    info!("{} starting", cfg.service.name);
    info!(
        "capture backend: {} ({} Hz, {} ch)",
        cfg.capture.backend, cfg.capture.sample_rate, cfg.capture.channels
    );
    info!("recordings path: {}", cfg.storage.recordings_path);

    let gateway = Arc::new(
        NatsGateway::connect(&cfg.nats.url)
            .await
            .context("failed to connect to the persistence gateway")?,
    );
    let backend = CaptureBackendFactory::create(cfg.backend_kind()?, cfg.capture_config());

    let state = AppState::new(gateway, backend, cfg.session_config());
    let app = podbooth::create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on {addr}");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
