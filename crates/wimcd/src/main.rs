//! wimcd - the "Where Is My Content" daemon.
//!
//! Composition root: reads settings from the environment, wires the hub
//! resolver, agent registry, callback notifier and job manager together,
//! and serves the client and admin REST surfaces.

#![deny(unsafe_code)]

mod error;
mod handlers;
mod routes;
mod state;

use std::future::IntoFuture;
use std::net::Ipv4Addr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use wimc_agent::ProgressChannelRegistry;
use wimc_core::Settings;
use wimc_hub::{DefaultCatalogResolver, HubClientConfig};
use wimc_jobs::{
    AgentRegistry, CallbackNotifier, HttpCallbackTransport, JobManager, JobManagerConfig,
};

use crate::state::DaemonContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env().context("loading settings from environment")?;
    tracing::info!(
        hub = %settings.hub_url,
        client_port = settings.client_port,
        admin_port = settings.admin_port,
        store = %settings.store_path.display(),
        agent = %settings.agent_binary.display(),
        "starting wimcd"
    );

    let resolver = Arc::new(
        DefaultCatalogResolver::new(&HubClientConfig::new(&settings.hub_url))
            .context("building hub resolver")?,
    );
    let agents = Arc::new(AgentRegistry::new());
    let notifier = Arc::new(CallbackNotifier::new(
        Arc::new(HttpCallbackTransport::default()),
        settings.notify_attempts,
    ));
    let manager = Arc::new(JobManager::new(
        resolver,
        Arc::clone(&agents),
        notifier,
        Arc::new(ProgressChannelRegistry::new()),
        JobManagerConfig::from_settings(&settings),
    ));
    manager.spawn_retention_sweeper();

    let context: state::AppState = Arc::new(DaemonContext { manager, agents });

    let client_listener =
        tokio::net::TcpListener::bind((Ipv4Addr::UNSPECIFIED, settings.client_port))
            .await
            .context("binding client port")?;
    let admin_listener = tokio::net::TcpListener::bind((Ipv4Addr::UNSPECIFIED, settings.admin_port))
        .await
        .context("binding admin port")?;
    tracing::info!("wimcd listening");

    let client = routes::client_routes().with_state(Arc::clone(&context));
    let admin = routes::admin_routes().with_state(context);

    tokio::try_join!(
        axum::serve(client_listener, client).into_future(),
        axum::serve(admin_listener, admin).into_future(),
    )
    .context("serving")?;

    Ok(())
}
