//! `relaygate run` and `relaygate check`.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use relaygate_broker::InProcessBrokerFactory;
use relaygate_core::{EventCallback, EventContext, GatewayEvent};
use relaygate_gateway::{EventSystemFactory, Gateway, GatewayDeps};
use relaygate_loader::LayeredLoader;

use crate::builtin;
use crate::config::{self, GatewayConfig};

/// Create the gateway, keep it up until ctrl-c or SIGTERM, then destroy it.
pub async fn run(config_path: &Path) -> anyhow::Result<()> {
    let config = load_checked(config_path)?;

    let brokers = Arc::new(InProcessBrokerFactory::new());
    let deps = GatewayDeps::new(
        Arc::new(LayeredLoader::new(builtin::registry())),
        brokers.clone(),
        Arc::new(EventSystemFactory),
    );
    let mut gateway = Gateway::create(deps, Some(&config.properties))
        .with_context(|| format!("failed to create gateway from {}", config_path.display()))?;
    for event in GatewayEvent::ALL {
        gateway.add_event_callback(event, trace_event());
    }
    tracing::info!(
        modules = gateway.modules().len(),
        links = gateway.links().len(),
        "gateway running"
    );

    shutdown_signal().await?;

    gateway.destroy();
    if let Some(broker) = brokers.last_issued() {
        if broker.ref_count() != 0 {
            tracing::warn!(refs = broker.ref_count(), "broker still referenced after destroy");
        }
    }
    tracing::info!("gateway stopped");
    Ok(())
}

/// Parse and validate the configuration; print a summary or the resolved
/// configuration as JSON.
pub fn check(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_checked(config_path)?;
    if json {
        let out = serde_json::to_string_pretty(&config.properties)
            .context("failed to serialize configuration")?;
        println!("{out}");
    } else {
        println!(
            "{}: ok ({} modules, {} links)",
            config.source.display(),
            config.properties.modules.len(),
            config.properties.links.len()
        );
    }
    Ok(())
}

fn load_checked(config_path: &Path) -> anyhow::Result<GatewayConfig> {
    let config = config::load(config_path)?;
    let issues = config::validate(&config.properties);
    if !issues.is_empty() {
        let list: Vec<String> = issues.iter().map(|i| format!("  - {i}")).collect();
        anyhow::bail!(
            "{} has {} problem(s):\n{}",
            config_path.display(),
            issues.len(),
            list.join("\n")
        );
    }
    Ok(config)
}

fn trace_event() -> EventCallback {
    Arc::new(|event: GatewayEvent, ctx: &EventContext| match &ctx.modules {
        Some(modules) => {
            let names: Vec<&str> = modules.iter().map(|m| m.name.as_str()).collect();
            tracing::info!(%event, at = %ctx.reported_at, modules = ?names, "gateway event");
        }
        None => tracing::info!(%event, at = %ctx.reported_at, "gateway event"),
    })
}

async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("failed to register SIGTERM handler")?;
        tokio::select! {
            res = ctrl_c => {
                res.context("failed to listen for ctrl-c")?;
                tracing::info!("received ctrl-c, shutting down");
            }
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.context("failed to listen for ctrl-c")?;
        tracing::info!("received ctrl-c, shutting down");
    }

    Ok(())
}
