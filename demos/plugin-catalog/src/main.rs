//! Plugin catalog demo.
//!
//! Runs the catalog and the team list against in-memory transports and
//! prints what a page would render: loading flags, errors and entities.
//!
//! Configuration is read from `CATALOG_*` environment variables; logging
//! is controlled with `RUST_LOG`.

use chrono::{TimeZone, Utc};
use loadstate_catalog::mocks::{Method, MockTransport};
use loadstate_catalog::plugins::{CatalogPlugin, PluginDetails, PluginLink, PluginType, PluginVersion};
use loadstate_catalog::teams::Team;
use loadstate_catalog::{CatalogConfig, PluginCatalog, TeamDirectory, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const WAIT: Duration = Duration::from_secs(5);

fn seed_transport() -> anyhow::Result<MockTransport> {
    let released = Utc
        .with_ymd_and_hms(2021, 5, 18, 10, 0, 0)
        .single()
        .ok_or_else(|| anyhow::anyhow!("invalid release date"))?;

    let clock = CatalogPlugin {
        description: "Clock panel for Grafana".to_string(),
        org_name: "Grafana Labs".to_string(),
        ..CatalogPlugin::new("grafana-clock-panel", "Clock", PluginType::Panel)
    };
    let worldmap = CatalogPlugin {
        description: "World map panel".to_string(),
        org_name: "Grafana Labs".to_string(),
        is_installed: true,
        has_update: true,
        installed_version: Some("0.3.2".to_string()),
        ..CatalogPlugin::new("grafana-worldmap-panel", "Worldmap", PluginType::Panel)
    };

    Ok(MockTransport::new()
        .with_plugins(vec![clock, worldmap])
        .with_details(
            "grafana-clock-panel",
            PluginDetails {
                readme: "# Clock\nShows the time.".to_string(),
                versions: vec![PluginVersion {
                    version: "1.3.0".to_string(),
                    created_at: released,
                }],
                links: vec![PluginLink {
                    name: "Source".to_string(),
                    url: "https://github.com/grafana/clock-panel".to_string(),
                }],
            },
        )
        .with_teams(vec![
            Team { member_count: 4, ..Team::new(1, "Platform") },
            Team { member_count: 7, ..Team::new(2, "Plugins") },
            Team { member_count: 2, ..Team::new(3, "Support") },
        ]))
}

fn print_plugins(title: &str, plugins: &[CatalogPlugin]) {
    println!("\n{title}");
    for plugin in plugins {
        let installed = plugin
            .installed_version
            .as_deref()
            .map_or_else(|| "not installed".to_string(), |v| format!("v{v}"));
        let update = if plugin.has_update { " (update available)" } else { "" };
        let details = if plugin.has_details() { " [details]" } else { "" };
        println!("  {:<24} {installed}{update}{details}", plugin.id);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plugin_catalog=debug,loadstate_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CatalogConfig::from_env()?;
    tracing::info!(?config, "Starting plugin catalog demo");

    let transport = seed_transport()?;
    let catalog = PluginCatalog::new(Arc::new(transport.clone()), config.clone())?;

    println!("=== Plugin Catalog ===");

    // Two views mount at once; only one bulk load goes out
    let mut list = catalog.subscribe();
    let mut page = catalog.subscribe();
    list.all().await?;
    println!("Loading: {}", catalog.fetch_status().await.pending);

    let clock = page.get("grafana-clock-panel").await?;
    list.settled(WAIT).await?;
    page.settled(WAIT).await?;
    println!("Clock present after load: {}", clock.is_some());

    print_plugins("Catalog:", &list.all().await?);

    // Update worldmap, then install clock with the backend refusing
    catalog
        .install("grafana-worldmap-panel", "0.3.3", true)
        .await?
        .wait_with_timeout(WAIT)
        .await?;

    transport.fail(
        Method::Install,
        TransportError::Status {
            code: 403,
            message: "admin rights required".to_string(),
        },
    );
    catalog
        .install("grafana-clock-panel", "1.3.0", false)
        .await?
        .wait_with_timeout(WAIT)
        .await?;

    let install = catalog.install_status().await;
    match install.error {
        Some(error) => println!("\nInstall failed: {error}"),
        None => println!("\nInstall succeeded"),
    }

    print_plugins("After installs:", &catalog.all().await);

    let calls = transport.calls();
    println!(
        "\nTransport calls: fetch_all={} fetch_details={} install={}",
        calls.fetch_all, calls.fetch_details, calls.install
    );

    println!("\n=== Teams ===");
    let teams = TeamDirectory::new(Arc::new(transport.clone()), config.store_config());
    teams.fetch_all().await?.wait_with_timeout(WAIT).await?;
    teams.set_search_query("p").await?;

    let matching = teams.filtered().await;
    println!("{} of {} teams match \"p\":", matching.len(), teams.count().await);
    for team in matching {
        println!("  {:<10} {} members", team.name, team.member_count);
    }

    catalog.shutdown().await?;
    teams.store().shutdown(config.shutdown_timeout()).await?;
    tracing::info!("Demo finished");

    Ok(())
}
