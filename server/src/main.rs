#![allow(dead_code)]

mod email;
mod error;
mod prompt;
mod request_tracing;
mod routes;
mod server_config;
mod state;
mod triage;

use std::{env, net::SocketAddr, time::Duration};

use axum::{extract::FromRef, Router};
use mimalloc::MiMalloc;
use routes::AppRouter;
use state::SnapshotStore;
use tokio::{signal, task::JoinHandle};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::server_config::cfg;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub type HttpClient = reqwest::Client;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub http_client: HttpClient,
    pub snapshots: SnapshotStore,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::Layer::default().with_ansi(false))
        .init();

    let http_client = reqwest::ClientBuilder::new().use_rustls_tls().build()?;
    let state = ServerState {
        http_client,
        snapshots: SnapshotStore::new(),
    };

    let router = AppRouter::create(state.clone());

    let mut scheduler = JobScheduler::new()
        .await
        .expect("Failed to create scheduler");

    {
        // Initial inbox load shortly after startup
        let state_clone = state.clone();
        scheduler
            .add(Job::new_one_shot_async(
                Duration::from_secs(1),
                move |_uuid, _l| {
                    let state = state_clone.clone();
                    Box::pin(async move {
                        triage::run_refresh(state).await;
                    })
                },
            )?)
            .await?;

        let state_clone = state.clone();
        scheduler
            .add(Job::new_repeated_async(
                Duration::from_secs(cfg.fetch.refresh_interval_secs),
                move |_uuid, _l| {
                    let state = state_clone.clone();
                    Box::pin(async move {
                        tracing::info!("Running scheduled inbox refresh");
                        triage::run_refresh(state).await;
                    })
                },
            )?)
            .await?;
    }

    scheduler.set_shutdown_handler(Box::new(move || {
        Box::pin(async move {
            tracing::info!("Shutting down scheduler");
        })
    }));

    match scheduler.start().await {
        Ok(_) => {
            tracing::info!("Scheduler started");
        }
        Err(e) => {
            tracing::error!("Failed to start scheduler: {:?}", e);
        }
    }

    run_server(router, scheduler).await?;

    Ok(())
}

async fn shutdown_signal(mut scheduler: JobScheduler) {
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
        _ = ctrl_c => {
            scheduler.shutdown().await.unwrap();
            println!("Cleanups done, shutting down");
            std::process::exit(0);
        },
        _ = terminate => {
            scheduler.shutdown().await.unwrap();
            println!("Cleanups done, shutting down");
            std::process::exit(0);
        },
    }
}

fn run_server(router: Router, scheduler: JobScheduler) -> JoinHandle<()> {
    tokio::spawn(async {
        let port = env::var("PORT").unwrap_or("5006".to_string());
        tracing::info!("Triage server running on http://0.0.0.0:{}", port);
        println!("{}", *cfg);

        let addr = SocketAddr::from(([0, 0, 0, 0], port.parse::<u16>().unwrap()));
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal(scheduler))
            .await
            .unwrap();
    })
}
