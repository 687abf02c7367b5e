#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
// easier to use when using the functions as callback of foreign functions
#![allow(clippy::needless_pass_by_value)]

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::Extension;
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;
use uuid::Uuid;

use crate::api::AdminToken;
use crate::api::router;
use crate::resolver::RedirectResolver;
use crate::root::SpaIndex;
use crate::storage::Storage;
use crate::utils::env_var;
use crate::utils::env_var_or_else;

mod api;
mod graceful_shutdown;
mod normalize;
mod resolver;
mod root;
mod rules;
mod storage;
#[cfg(test)]
mod tests;
mod utils;

const DEFAULT_RUST_LOG: &str = "redirector=debug,tower_http=debug";
const DEFAULT_ADDRESS: &str = "0.0.0.0:6000";
const DEFAULT_CACHE_TTL_SECONDS: u64 = 60;

/// Everything the app needs besides its storage
pub struct Settings {
    /// Token protecting the management API
    pub admin_token: String,

    /// How long resolved paths are cached, zero disables the cache
    pub cache_ttl: Duration,

    /// Location of the SPA `index.html`
    pub spa_index: Option<String>,
}

impl Settings {
    /// Read the settings from the environment
    fn from_env() -> Result<Self> {
        let admin_token = env_var_or_else("ADMIN_TOKEN", || {
            let admin_token = Uuid::new_v4().simple().to_string();
            tracing::info!("`ADMIN_TOKEN` is not set, generating temporary one: {admin_token}");
            admin_token
        });

        let cache_ttl = match env_var("REDIRECT_CACHE_TTL") {
            Some(seconds) => seconds.parse::<u64>()?,
            None => DEFAULT_CACHE_TTL_SECONDS,
        };

        Ok(Self {
            admin_token,
            cache_ttl: Duration::from_secs(cache_ttl),
            spa_index: env_var("SPA_INDEX"),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_environment();
    setup_tracing();

    let settings = Settings::from_env()?;
    let storage = storage::setup().await?;

    let app = setup_app(storage, settings).await?;

    let address = setup_address()?;
    let listener = TcpListener::bind(address).await?;
    tracing::info!("Listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(graceful_shutdown::handler())
        .await?;

    Ok(())
}

/// Create and setup the app with its dependencies
///
/// # Errors
///
/// Will return `Err` if any of its dependencies fail to load:
/// - SPA index
pub async fn setup_app<S: Storage>(storage: S, settings: Settings) -> Result<Router> {
    let spa_index = SpaIndex::load(settings.spa_index.as_deref()).await?;

    if settings.cache_ttl.is_zero() {
        tracing::info!("Redirect cache is disabled");
    }

    let resolver = RedirectResolver::new(storage, settings.cache_ttl);
    let admin_token = AdminToken::new(&settings.admin_token);

    Ok(create_router(resolver, admin_token, spa_index))
}

/// Create the router for the redirector
fn create_router<S: Storage>(
    resolver: RedirectResolver<S>,
    admin_token: AdminToken,
    spa_index: SpaIndex,
) -> Router {
    Router::new()
        .nest("/api", router::<S>())
        .fallback(get(root::root::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(resolver))
        .layer(Extension(admin_token))
        .layer(Extension(spa_index))
}

fn setup_environment() {
    dotenvy::dotenv().ok();
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::registry;

    registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_RUST_LOG.into()),
        ))
        .with(fmt::layer())
        .init();
}

fn setup_address() -> Result<SocketAddr> {
    let mut address =
        env_var_or_else("ADDRESS", || String::from(DEFAULT_ADDRESS)).parse::<SocketAddr>()?;

    // optional override of just the port
    if let Some(port) = env_var("PORT") {
        address.set_port(port.parse::<u16>()?);
    }

    Ok(address)
}
