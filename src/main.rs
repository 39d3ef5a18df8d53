use anyhow::{Context, Result};
use capture_booth::{
    create_router, AppState, CaptureSession, Config, EncoderFactory, SyntheticCamera,
    SyntheticEncoder, VideoEncoder,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "capture-booth")]
#[command(about = "Camera preview, snapshots and clip recording")]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/capture-booth")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve {
        /// Override the bind address
        #[arg(long)]
        bind: Option<String>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List video inputs
    Devices,
    /// Record a clip and save it
    Record {
        /// Duration to record in seconds
        #[arg(short, long, default_value = "5")]
        seconds: u64,

        /// Device to record from (defaults to facing mode resolution)
        #[arg(short, long)]
        device: Option<String>,

        /// Output directory (defaults to the configured one)
        #[arg(short, long)]
        output_dir: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = Config::load(&args.config).context("Failed to load config")?;

    let level = cfg.service.log_level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let backend = Arc::new(SyntheticCamera::new(cfg.synthetic.clone()));
    let interval = Duration::from_millis(cfg.recording.chunk_interval_ms);
    let capacity = cfg.recording.chunk_channel_capacity;
    let encoders: Arc<dyn EncoderFactory> = Arc::new(move || {
        Box::new(SyntheticEncoder::new(interval, capacity)) as Box<dyn VideoEncoder>
    });

    let session = Arc::new(CaptureSession::new(cfg.session_config(), backend, encoders));

    match args.command.unwrap_or(Command::Serve {
        bind: None,
        port: None,
    }) {
        Command::Serve { bind, port } => {
            let bind = bind.unwrap_or_else(|| cfg.service.http.bind.clone());
            let port = port.unwrap_or(cfg.service.http.port);
            serve(session, &bind, port).await
        }
        Command::Devices => {
            for (index, option) in session.refresh_devices().await.iter().enumerate() {
                println!("{:>2}. {} ({})", index + 1, option.label, option.id);
            }
            Ok(())
        }
        Command::Record {
            seconds,
            device,
            output_dir,
        } => {
            let output_dir = output_dir.unwrap_or_else(|| cfg.recording.output_dir.clone());
            let output_dir = PathBuf::from(shellexpand::tilde(&output_dir).into_owned());
            record(session, device, seconds, output_dir).await
        }
    }
}

async fn serve(session: Arc<CaptureSession>, bind: &str, port: u16) -> Result<()> {
    if let Err(e) = session.open().await {
        warn!("No preview available: {}", e);
    }
    session.watch_devices();

    let app = create_router(AppState::new(Arc::clone(&session)));
    let addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("HTTP server failed")?;

    session.shutdown().await;
    Ok(())
}

async fn record(
    session: Arc<CaptureSession>,
    device: Option<String>,
    seconds: u64,
    output_dir: PathBuf,
) -> Result<()> {
    session.refresh_devices().await;

    let stream = match device {
        Some(id) => session.select_device(id).await,
        None => session.rebind().await,
    }
    .context("Failed to acquire camera")?;

    info!("Recording {}s from {}", seconds, stream.device_id());

    session.start_recording().await?;
    tokio::time::sleep(Duration::from_secs(seconds)).await;
    let summary = session.stop_recording().await?;

    info!(
        "Recorded {:.1}s, {} chunk(s)",
        summary.duration_secs, summary.buffered_chunks
    );

    match session.export().await {
        Some(blob) => {
            let path = blob.save(&output_dir)?;
            println!("{}", path.display());
        }
        None => warn!("Nothing was recorded"),
    }

    session.shutdown().await;
    Ok(())
}
