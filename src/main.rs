use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use webpage_scraper::api::{self, AppState};
use webpage_scraper::persistent::Persistent;
use webpage_scraper::TaskDispatcher;

#[derive(Debug, Parser)]
#[command(about = "Scrape page text and images on request, off the request path")]
struct Args {
    /// SQLite database file.
    #[arg(long, default_value = "db.sqlite3")]
    db: PathBuf,

    /// Directory downloaded images are written to.
    #[arg(long, default_value = "media")]
    media_dir: PathBuf,

    /// Address to serve the API on.
    #[arg(long, default_value = "0.0.0.0:8000")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "debug,html5ever=error,selectors=error,hyper=warn,reqwest=info,sqlx=warn".into()
            }),
        )
        .with(ErrorLayer::default())
        .init();

    let args = Args::parse();

    let storage = Arc::new(Persistent::new(&args.db, &args.media_dir).await?);
    let dispatcher = Arc::new(TaskDispatcher::new(Arc::clone(&storage)));

    let app = api::router(
        AppState {
            storage,
            dispatcher,
        },
        &args.media_dir,
    );

    info!("Listening on {}", args.bind);
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
