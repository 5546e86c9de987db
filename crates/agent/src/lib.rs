pub mod alerts;
pub mod api;
pub mod broker;
pub mod config;
pub mod identity;
pub mod logging;
pub mod store;

#[cfg(test)]
mod test_support;

use alerts::{EmailSender, Pipeline};
use anyhow::Context;
use config::{BrokerArgs, ServiceArgs};
use identity::IdentityLookup;
use std::future::Future;
use std::sync::Arc;
use store::AlertStore;

/// Alert agent delivers smart home alerts to the people responsible for them.
#[derive(Debug, clap::Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(flatten)]
    pub log: logging::LogArgs,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Serve the HTTP ingress, optionally running alert batches periodically.
    Serve(ServeArgs),
    /// Run a single batch of pending alerts, and print its result.
    RunBatch(RunBatchArgs),
    /// Ingest alerts from the MQTT broker for a bounded window of time.
    Listen(ListenArgs),
}

#[derive(Debug, clap::Args)]
pub struct ServeArgs {
    /// The port to listen on for API requests.
    #[clap(long, default_value = "8080", env = "PORT")]
    pub port: u16,
    /// Run a batch of pending alerts at this interval, such as `5m`.
    /// Batches aren't run by the server if unset.
    #[clap(long, env = "BATCH_INTERVAL")]
    pub batch_interval: Option<humantime::Duration>,
    #[clap(flatten)]
    pub services: ServiceArgs,
}

#[derive(Debug, clap::Args)]
pub struct RunBatchArgs {
    #[clap(flatten)]
    pub services: ServiceArgs,
}

#[derive(Debug, clap::Args)]
pub struct ListenArgs {
    /// How long to listen for messages before disconnecting.
    #[clap(long, env = "LISTEN_WINDOW", default_value = "58s")]
    pub listen_window: humantime::Duration,
    #[clap(flatten)]
    pub services: ServiceArgs,
    #[clap(flatten)]
    pub broker: BrokerArgs,
}

/// Runs `command` until it completes, or until `shutdown` resolves.
pub async fn run<F>(command: Command, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Clone + Send + 'static,
{
    match command {
        Command::Serve(args) => serve(args, shutdown).await,
        Command::RunBatch(args) => run_batch(args).await,
        Command::Listen(args) => listen(args).await,
    }
}

async fn serve<F>(args: ServeArgs, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Clone + Send + 'static,
{
    // The server starts even when configuration is missing, so that liveness
    // checks pass and submissions report what's missing.
    let pipeline = match args.services.credentials() {
        Ok(credentials) => Ok(Arc::new(args.services.build_pipeline(credentials)?)),
        Err(error) => {
            tracing::error!(%error, "serving without required configuration");
            Err(error)
        }
    };

    let batch_interval: Option<std::time::Duration> = args.batch_interval.map(Into::into);
    let batches = async {
        match (&pipeline, batch_interval) {
            (Ok(pipeline), Some(period)) => {
                run_batches(&**pipeline, period, shutdown.clone()).await
            }
            _ => Ok(()),
        }
    };

    let app = Arc::new(api::App::new(pipeline.clone()));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port))
        .await
        .context("failed to bind server port")?;
    tracing::info!(port = args.port, "serving alert API");

    let server = async {
        axum::serve(listener, api::build_router(app))
            .with_graceful_shutdown(shutdown.clone())
            .await
            .context("serving alert API")
    };

    let ((), ()) = tokio::try_join!(server, batches)?;
    Ok(())
}

/// Runs a batch every `period` until `shutdown` resolves. A batch that
/// overruns its period delays the next one, rather than overlapping it.
async fn run_batches<S, I, ES>(
    pipeline: &Pipeline<S, I, ES>,
    period: std::time::Duration,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()>
where
    S: AlertStore,
    I: IdentityLookup,
    ES: EmailSender,
{
    anyhow::ensure!(!period.is_zero(), "--batch-interval must be greater than zero");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => return Ok(()),
            _ = interval.tick() => {}
        }
        let result = pipeline.run_batch().await;
        tracing::debug!(?result, "periodic batch completed");
    }
}

async fn run_batch(args: RunBatchArgs) -> anyhow::Result<()> {
    let credentials = args.services.credentials()?;
    let pipeline = args.services.build_pipeline(credentials)?;

    let result = pipeline.run_batch().await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(error) = result.error {
        anyhow::bail!("batch processing failed: {error}");
    }
    Ok(())
}

async fn listen(args: ListenArgs) -> anyhow::Result<()> {
    let credentials = args.services.credentials()?;
    // Check the broker settings before connecting to anything.
    args.broker.host()?;
    let pipeline = args.services.build_pipeline(credentials)?;

    let summary = broker::listen(&pipeline, &args.broker, args.listen_window.into()).await?;
    tracing::info!(?summary, "finished listening");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
