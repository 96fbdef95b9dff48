// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Authoritative dice hub.
//!
//! Runs one simulator at a fixed tick, applies viewer actions after a short
//! delay, and broadcasts snapshots to every connected viewer over WebSocket.

mod hub;
mod ws;

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use axum::{routing::get, Router};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use clap::Parser;
use dice_app_core::config::ConfigService;
use dice_app_core::prefs::{HubPrefs, HUB_PREFS_KEY};
use dice_config_fs::FsConfigStore;
use dice_core::{Simulator, Walls};
use dice_session_proto::WS_PATH;
use tokio::sync::Mutex;
use tokio::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::hub::HubState;
use crate::ws::{ws_handler, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about = "Dice session hub")]
struct Args {
    /// TCP listener for viewers (e.g. 0.0.0.0:8080)
    #[arg(long)]
    listen: Option<SocketAddr>,
    /// Simulation tick period in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Delay before applying an inbound action, in milliseconds
    #[arg(long)]
    action_delay_ms: Option<u64>,
    /// Broadcast a resync every N frames while cubes move (0 disables)
    #[arg(long)]
    sync_every_frames: Option<u64>,
    /// Number of cube slots
    #[arg(long)]
    cube_count: Option<usize>,
    /// Floor half-width along X (requires --y-wall)
    #[arg(long, requires = "y_wall")]
    x_wall: Option<f64>,
    /// Floor half-depth along Y (requires --x-wall)
    #[arg(long, requires = "x_wall")]
    y_wall: Option<f64>,
    /// Maximum inbound frame size in bytes
    #[arg(long)]
    max_frame_bytes: Option<usize>,
    /// Allowed Origin values (repeatable). If none provided, all origins are accepted.
    #[arg(long)]
    allow_origin: Vec<String>,
    /// TLS certificate (PEM). If provided, key must also be provided.
    #[arg(long)]
    tls_cert: Option<PathBuf>,
    /// TLS private key (PEM). If provided, cert must also be provided.
    #[arg(long)]
    tls_key: Option<PathBuf>,
}

impl Args {
    fn apply_to(&self, prefs: &mut HubPrefs) {
        if let Some(listen) = self.listen {
            prefs.listen = listen.to_string();
        }
        if let Some(v) = self.tick_ms {
            prefs.tick_ms = v;
        }
        if let Some(v) = self.action_delay_ms {
            prefs.action_delay_ms = v;
        }
        if let Some(v) = self.sync_every_frames {
            prefs.sync_every_frames = v;
        }
        if let Some(v) = self.cube_count {
            prefs.cube_count = v;
        }
        if self.x_wall.is_some() {
            prefs.x_wall = self.x_wall;
            prefs.y_wall = self.y_wall;
        }
        if let Some(v) = self.max_frame_bytes {
            prefs.max_frame_bytes = v;
        }
        if !self.allow_origin.is_empty() {
            prefs.allow_origin.clone_from(&self.allow_origin);
        }
    }
}

/// Loads saved prefs (best-effort), persisting defaults once if absent.
fn load_prefs() -> HubPrefs {
    let store = match FsConfigStore::new() {
        Ok(store) => store,
        Err(err) => {
            warn!(?err, "config dir unavailable; using default prefs");
            return HubPrefs::default();
        }
    };
    info!(dir = %store.base().display(), "loading hub prefs");
    let config = ConfigService::new(store);
    match config.load_or_init::<HubPrefs>(HUB_PREFS_KEY) {
        Ok(prefs) => prefs,
        Err(err) => {
            warn!(?err, "unreadable hub prefs; using defaults");
            HubPrefs::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let mut prefs = load_prefs();
    args.apply_to(&mut prefs);

    let listen: SocketAddr = prefs
        .listen
        .parse()
        .with_context(|| format!("invalid listen address {:?}", prefs.listen))?;
    if prefs.tick_ms == 0 {
        return Err(anyhow!("tick_ms must be positive"));
    }
    let walls = prefs.walls().map(|(x, y)| Walls { x, y });
    let sim = Simulator::new(prefs.cube_count, walls);
    let hub = Arc::new(Mutex::new(HubState::new(sim, prefs.sync_every_frames)));

    let allow_origins = if prefs.allow_origin.is_empty() {
        None
    } else {
        Some(prefs.allow_origin.iter().cloned().collect())
    };
    let state = Arc::new(AppState {
        hub: hub.clone(),
        max_frame_bytes: prefs.max_frame_bytes,
        allow_origins,
        action_delay: Duration::from_millis(prefs.action_delay_ms),
    });

    let ticker = tokio::spawn(hub::run_ticker(hub, Duration::from_millis(prefs.tick_ms)));

    let app = Router::new()
        .route(WS_PATH, get(ws_handler))
        .with_state(state);

    let handle = Handle::new();
    // graceful shutdown on Ctrl+C
    let shutdown = handle.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => shutdown.shutdown(),
            Err(err) => warn!(?err, "failed to install ctrl-c handler"),
        }
    });

    info!(
        cubes = prefs.cube_count,
        tick_ms = prefs.tick_ms,
        action_delay_ms = prefs.action_delay_ms,
        "dice hub starting"
    );

    let served = match (args.tls_cert, args.tls_key) {
        (Some(cert), Some(key)) => {
            let tls_config = RustlsConfig::from_pem_file(cert, key)
                .await
                .context("load tls config")?;
            info!("dice hub listening (TLS) on {listen}");
            axum_server::bind_rustls(listen, tls_config)
                .handle(handle)
                .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                .await
        }
        (None, None) => {
            info!("dice hub listening on {listen}");
            axum_server::bind(listen)
                .handle(handle)
                .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                .await
        }
        _ => {
            return Err(anyhow!(
                "must provide both --tls-cert and --tls-key or neither"
            ))
        }
    };

    ticker.abort();
    served?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_saved_prefs() {
        let args = Args::parse_from([
            "dice-session-service",
            "--tick-ms",
            "8",
            "--x-wall",
            "6",
            "--y-wall",
            "4",
            "--allow-origin",
            "https://dice.example",
        ]);
        let mut prefs = HubPrefs {
            cube_count: 5,
            ..HubPrefs::default()
        };
        args.apply_to(&mut prefs);
        assert_eq!(prefs.tick_ms, 8);
        assert_eq!(prefs.cube_count, 5);
        assert_eq!(prefs.walls(), Some((6.0, 4.0)));
        assert_eq!(prefs.allow_origin, vec!["https://dice.example".to_string()]);
    }

    #[test]
    fn lone_wall_flag_is_rejected() {
        assert!(Args::try_parse_from(["dice-session-service", "--x-wall", "6"]).is_err());
    }
}
