use std::{
    error::Error,
    fs::OpenOptions,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    sync::Arc,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use time::Duration;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use expense_tracker::{
    AppConfig, AppState, PlaidClient, PlaidConfig, PlaidEnvironment, build_router,
    graceful_shutdown, logging_middleware,
};

const MAX_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 60 * 24 * 365;

/// The web server for the expense tracker.
///
/// Every option can also be set with the environment variable named after it,
/// and a `.env` file in the working directory is loaded first.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The client ID for the Plaid API.
    #[arg(long, env = "PLAID_CLIENT_ID")]
    plaid_client_id: String,

    /// The secret for the Plaid API.
    #[arg(long, env = "PLAID_SECRET", hide_env_values = true)]
    plaid_secret: String,

    /// Which Plaid environment to connect to.
    #[arg(long, env = "PLAID_ENV", value_enum, default_value_t = PlaidEnvironment::Sandbox)]
    plaid_env: PlaidEnvironment,

    /// The URL Plaid should send webhooks to for newly linked banks.
    #[arg(long, env = "PLAID_WEBHOOK_URL")]
    plaid_webhook_url: Option<String>,

    /// The shared secret used to verify webhook signatures.
    #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    webhook_secret: String,

    /// File path to the application SQLite database.
    #[arg(long, env = "DATABASE_URL")]
    database_url: PathBuf,

    /// The secret used for session cookies and bearer tokens.
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    secret_key: String,

    /// The algorithm used to sign bearer tokens.
    #[arg(long, env = "ALGORITHM", default_value = AppConfig::DEFAULT_TOKEN_ALGORITHM)]
    algorithm: String,

    /// How long bearer tokens stay valid, in minutes. At most one year.
    #[arg(
        long,
        env = "ACCESS_TOKEN_EXPIRE_MINUTES",
        default_value_t = 30,
        value_parser = clap::value_parser!(i64).range(1..=MAX_ACCESS_TOKEN_EXPIRE_MINUTES)
    )]
    access_token_expire_minutes: i64,

    /// The address to serve the app from.
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    host: IpAddr,

    /// The port to serve the app from.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Also write logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    setup_logging(args.log_file.as_deref())?;

    let connection = Connection::open(&args.database_url)?;

    let config = AppConfig {
        link_webhook_url: args.plaid_webhook_url,
        token_algorithm: args.algorithm,
        access_token_duration: Duration::minutes(args.access_token_expire_minutes),
        ..AppConfig::new(&args.secret_key, &args.webhook_secret)
    };

    let plaid_client = PlaidClient::new(PlaidConfig {
        client_id: args.plaid_client_id,
        secret: args.plaid_secret,
        environment: args.plaid_env,
    })?;

    let state = AppState::new(connection, &config, Arc::new(plaid_client))?;

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(
        build_router(state).layer(middleware::from_fn(logging_middleware)),
    );

    #[cfg(debug_assertions)]
    let router = router.layer(LiveReloadLayer::new());

    let addr = SocketAddr::new(args.host, args.port);
    tracing::info!(
        "HTTP server listening on http://{addr} using Plaid {:?}",
        args.plaid_env
    );
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}

/// Log to stdout, and to `log_file` if given.
///
/// The level defaults to `info` and can be changed with `RUST_LOG`.
fn setup_logging(log_file: Option<&Path>) -> Result<(), std::io::Error> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let file_log = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_log)
        .with(file_log)
        .init();

    Ok(())
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
