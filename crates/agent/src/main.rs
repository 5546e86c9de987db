use alert_agent::{logging, Cli};
use clap::Parser;
use futures::FutureExt;

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log);
    tracing::info!(command = ?cli.command, "started!");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let task = runtime.spawn(async move {
        // Share-able future which completes when the agent should exit.
        let shutdown = tokio::signal::ctrl_c().map(|_| ()).shared();
        alert_agent::run(cli.command, shutdown).await
    });
    let result = runtime.block_on(task);

    tracing::info!(?result, "main function completed, shutting down runtime");
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    result?
}
