use axum::{Router, routing::get};
use conf::Conf;
use rand::distr::SampleString;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::Level;

mod cli;
mod info;
mod s3;
mod store;

use crate::cli::{CliOperations, RunConfig};
use crate::info::health_check;

struct App {
    config: RunConfig,
}

type AppState = Arc<App>;

/// Signal for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http::trace=info".into()),
        )
        .compact()
        .init();

    let cli = cli::Cli::parse();
    let config = match cli.command {
        Some(CliOperations::Config(config)) => {
            println!("{config:#?}");
            std::process::exit(0);
        }
        Some(CliOperations::Credentials) => {
            let mut rng = rand::rng();
            let access_key = rand::distr::Alphanumeric
                .sample_string(&mut rng, 8)
                .to_uppercase();
            let secret_key = rand::distr::Alphanumeric
                .sample_string(&mut rng, 16)
                .to_uppercase();
            println!("AUTH_ACCESS_KEY={access_key}");
            println!("AUTH_SECRET_KEY={secret_key}");
            std::process::exit(0);
        }
        Some(CliOperations::Run(config)) => config,
        _ => cli.config,
    };

    run(config).await;
}

/// Creates the mount root and the multipart staging area when absent.
async fn prepare_mount(config: &RunConfig) -> std::io::Result<()> {
    for dir in [
        config.mount.clone(),
        config.mount.join(store::STAGING_DIR),
    ] {
        if tokio::fs::metadata(&dir).await.is_err() {
            tokio::fs::create_dir_all(&dir).await?;
            tracing::info!(path = %dir.display(), "Storage directory created");
        }
    }
    Ok(())
}

async fn run(config: RunConfig) {
    tracing::debug!(config = ?config, "Loaded configuration");

    if let Err(e) = prepare_mount(&config).await {
        tracing::error!(error = %e, mount = %config.mount.display(), "Can not create storage directories");
        std::process::exit(1);
    }

    let app_state = Arc::new(App {
        config: config.clone(),
    });

    let app = Router::new()
        .route("/healthz", get(health_check))
        .merge(s3::routes(&config))
        .with_state(app_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = config.listen_socket().await;
    tracing::info!(mount = %config.mount.display(), "Service started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start axum::serve");

    tracing::info!("Server shutdown complete");
}
