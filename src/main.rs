use anyhow::Context;
use clap::Parser;
use price_ledger::{config::Config, server::Server};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // connect tracing to stdout
    tracing_subscriber::fmt::init();

    let config = Config::parse();
    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("failed to listen on {}", config.listen_addr()))?;

    let server = Server::new(listener, config.max_connections());
    tracing::info!("Server listening on: {}", server.local_addr()?);

    let shutdown = CancellationToken::new();
    let signals = shutdown_signal().context("failed to install signal handlers")?;
    let token = shutdown.clone();
    tokio::spawn(async move {
        match signals.await {
            Ok(()) => tracing::info!("shutdown requested"),
            Err(err) => tracing::error!("failed waiting for a shutdown signal: {}", err),
        }
        token.cancel();
    });

    server.run(shutdown).await?;

    Ok(())
}

// Resolves once the process receives SIGINT or SIGQUIT
#[cfg(unix)]
fn shutdown_signal(
) -> tokio::io::Result<impl std::future::Future<Output = tokio::io::Result<()>>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut quit = signal(SignalKind::quit())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = quit.recv() => {}
        }
        Ok(())
    })
}

#[cfg(not(unix))]
fn shutdown_signal(
) -> tokio::io::Result<impl std::future::Future<Output = tokio::io::Result<()>>> {
    Ok(tokio::signal::ctrl_c())
}
