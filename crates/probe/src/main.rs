// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether-probe: hold a link to a real-time server and log what happens.
//!
//! Useful for checking that a server accepts the handshake and for watching
//! the reconnect behavior while the server is restarted.

mod report;

use clap::Parser;
use tether_link::{ConnectionManager, ConnectorOptions, FailurePolicy, SessionConfig};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// tether-probe: watch a server link
#[derive(Parser, Debug)]
#[command(name = "tether-probe")]
#[command(about = "Connect to a real-time server and log link events")]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Path prefix the server is mounted under
    #[arg(long, default_value = "")]
    path: String,

    /// Connect with wss://
    #[arg(long)]
    ssl: bool,

    /// Reconnect period in milliseconds
    #[arg(long, default_value = "1000")]
    reconnect_ms: u64,

    /// Do not reconnect after the link drops
    #[arg(long)]
    no_reconnect: bool,

    /// Log every raw message frame
    #[arg(short, long)]
    messages: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn options(&self) -> ConnectorOptions {
        let session = SessionConfig {
            path: self.path.clone(),
            ssl: self.ssl,
            ..SessionConfig::new(self.host.clone(), self.port)
        };
        ConnectorOptions {
            auto_reconnect: !self.no_reconnect,
            auto_reconnect_timer_ms: self.reconnect_ms,
            on_failure: FailurePolicy::Emit,
            ..ConnectorOptions::new(session)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = args.options();
    info!("Starting tether-probe");
    info!("  Endpoint: {}", options.session.url());
    info!("  Reconnect: {}", if options.auto_reconnect { "on" } else { "off" });

    let manager = ConnectionManager::new(options);
    let mut events = manager.subscribe();

    if let Err(e) = manager.connect().await {
        // The monitor only repairs links that connected once.
        warn!("initial connect failed: {e}");
        return Err(e.into());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(line) = report::describe(&event, args.messages) {
                        info!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!("dropped {skipped} events"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    manager.close().await;
    info!("Probe stopped");
    Ok(())
}
