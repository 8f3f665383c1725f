use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
mod cli;
mod draft;
mod prompt;
use docrelay_core::Core;
use docrelay_provider::GeminiProvider;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::cli::{Cli, Command, ServeArgs};

const DEFAULT_LOG_FILTER: &str =
    "docrelay=info,docrelay_core=info,docrelay_provider=info,tower_http=info";

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    if let Err(err) = run(cli).await {
        eprintln!("docrelay failed: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error + Send + Sync>> {
    match cli.command {
        Some(Command::Draft(args)) => Ok(draft::run(args).await?),
        Some(Command::Serve(args)) => serve(args).await,
        None => serve(ServeArgs::from_env()).await,
    }
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let relay_config = args.relay_config();
    let gemini = GeminiProvider::new(args.gemini_config())?;
    if !gemini.has_credential() {
        warn!("GEMINI_API_KEY is not set; generation requests will be refused");
    }
    info!(
        environment = %relay_config.environment,
        allowed_origins = %relay_config.allowed_origins.join(", "),
        model = %gemini.model(),
        rate_limit_max = relay_config.rate_limit.max,
        rate_limit_window_secs = relay_config.rate_limit.window.as_secs(),
        "config loaded"
    );

    let core = Core::new(Arc::new(gemini), relay_config);
    let sweeper = core.limiter().spawn_sweeper();
    let app = core.router();

    let bind = args.bind_addr();
    let listener = TcpListener::bind(&bind).await?;
    info!(addr = %bind, "listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    info!("shut down");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}
