//! # relay
//!
//! Chat relay binary: loads settings, starts the web server, and, when a bot
//! token is configured, the gateway listener that feeds it.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use relay_core::LogFormat;
use relay_discord::{DiscordWebhook, GatewayConfig};
use relay_server::bridge;
use relay_server::config::ServerConfig;
use relay_server::relay::Relay;
use relay_server::server::RelayServer;
use relay_settings::RelaySettings;

/// Relay between a web chat page and a Discord channel.
#[derive(Parser, Debug)]
#[command(name = "relay", version, about)]
struct Cli {
    /// Settings file (defaults to `$RELAY_SETTINGS`, then `settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Log filter directive, e.g. `debug` (overrides settings).
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format: `compact` or `json` (overrides settings).
    #[arg(long)]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn settings_path(&self) -> PathBuf {
        self.settings
            .clone()
            .unwrap_or_else(relay_settings::settings_path)
    }

    /// Command-line flags win over file and environment values.
    fn apply(&self, settings: &mut RelaySettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ref level) = self.log_level {
            settings.logging.level.clone_from(level);
        }
        if let Some(format) = self.log_format {
            settings.logging.format = format;
        }
    }
}

fn gateway_config(settings: &RelaySettings) -> GatewayConfig {
    GatewayConfig {
        url: settings.gateway.url.clone(),
        token: settings.bot_token.clone(),
        intents: settings.gateway.intents,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let path = args.settings_path();
    let mut settings = relay_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    args.apply(&mut settings);

    relay_core::init_subscriber(&settings.logging.level, settings.logging.format);
    tracing::info!(path = %path.display(), "settings loaded");

    let metrics_handle = relay_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let webhook = DiscordWebhook::new(
        settings.webhook_url.clone(),
        Duration::from_millis(settings.webhook.timeout_ms),
    )
    .context("Failed to build webhook client")?;
    let relay = Arc::new(Relay::new(Arc::new(webhook), settings.channel_id));

    let server = RelayServer::new(
        ServerConfig::from_settings(&settings),
        Arc::clone(&relay),
        metrics_handle,
    )
    .context("Failed to build server")?;
    let (addr, serve_handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("relay listening on http://{addr}");

    let shutdown = server.shutdown();
    shutdown.track(serve_handle);
    if settings.listener_enabled() {
        shutdown.track(bridge::spawn_listener(
            Arc::clone(&relay),
            gateway_config(&settings),
            shutdown.token(),
        ));
    } else {
        tracing::warn!("no bot token configured, inbound relay disabled");
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("shutting down");
    let finished = shutdown.drain(None).await;
    tracing::info!(finished, "shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_override_nothing() {
        let cli = Cli::parse_from(["relay"]);
        let mut settings = RelaySettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.host, RelaySettings::default().server.host);
        assert_eq!(settings.server.port, RelaySettings::default().server.port);
        assert_eq!(settings.logging.format, LogFormat::Compact);
    }

    #[test]
    fn cli_flags_override_settings() {
        let cli = Cli::parse_from([
            "relay",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ]);
        let mut settings = RelaySettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn cli_rejects_bad_log_format() {
        assert!(Cli::try_parse_from(["relay", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn explicit_settings_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.json");
        std::fs::write(
            &path,
            r#"{"server_name": "Test Room", "channel_id": "123", "bot_token": "t"}"#,
        )
        .unwrap();

        let cli = Cli::parse_from(["relay", "--settings", path.to_str().unwrap()]);
        assert_eq!(cli.settings_path(), path);

        let settings = relay_settings::load_settings_from_path(&cli.settings_path()).unwrap();
        assert_eq!(settings.server_name, "Test Room");
        assert_eq!(settings.channel_id, 123);
        assert!(settings.listener_enabled());

        let gateway = gateway_config(&settings);
        assert_eq!(gateway.token, "t");
        assert_eq!(gateway.url, settings.gateway.url);
    }
}
