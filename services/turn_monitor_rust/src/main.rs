use anyhow::Result;
use dotenv::dotenv;
use log::{error, info, warn};
use std::sync::Arc;
use terra_rust_core::{ChatRelayClient, TerraClient};
use turn_monitor_rust::{Monitor, Notifier, ServiceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("terramonitor starting");

    let cfg = ServiceConfig::from_env()?;
    info!(
        "Config: monitor_config={} game_url={} poll={}s timeout={}s",
        cfg.monitor_config_path.display(),
        cfg.game_url,
        cfg.poll_interval.as_secs(),
        cfg.http_timeout.as_secs(),
    );
    if cfg.notify_accept_invalid_certs {
        warn!("TLS certificate verification disabled for chat relay calls (NOTIFY_ACCEPT_INVALID_CERTS)");
    }

    let fetcher = TerraClient::new(cfg.game_url.clone(), cfg.http_timeout)?;
    let relay = ChatRelayClient::new(cfg.http_timeout, cfg.notify_accept_invalid_certs)?;

    let mut monitor = Monitor::new(
        cfg.monitor_config_path.clone(),
        Arc::new(fetcher),
        Notifier::new(Arc::new(relay)),
    );

    monitor
        .run_until(cfg.poll_interval, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("terramonitor ending");
    Ok(())
}
