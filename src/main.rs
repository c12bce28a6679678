/// Courier - side-effect engine for an ActivityPub server
///
/// Runs the worker pools and the scheduler against the configured store
/// until interrupted.

use anyhow::Context;
use courier::config::ServerConfig;
use courier::{metrics, AppContext, Processor};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    let config = ServerConfig::from_env().context("loading configuration")?;
    let ctx = AppContext::new(config)
        .await
        .context("creating application context")?;

    let processor = Processor::new(ctx);
    processor.start();

    // Re-register poll expiries and scheduled statuses from the store
    processor
        .schedule_all()
        .await
        .context("restoring scheduled tasks")?;

    info!("Courier running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    info!("Shutting down");
    processor.stop().await;
    debug!("Final metrics:\n{}", metrics::render_metrics());

    Ok(())
}

fn print_banner() {
    println!(
        r#"
   ______                _
  / ____/___  __  ____(_)__  _____
 / /   / __ \/ / / / ___/ / _ \/ ___/
/ /___/ /_/ / /_/ / /  / /  __/ /
\____/\____/\__,_/_/  /_/\___/_/

        ActivityPub side-effect engine v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
