//! Main entry point for the dispatch backend.
//!
//! Loads configuration, installs structured logging, connects the Postgres
//! store and serves the API until Ctrl-C.

use actix_web::{App, HttpServer, web};
use anyhow::Context;
use dispatch_server::{
    AppState, Config, get_subscriber, handlers, init_subscriber, telemetry::RequestLoggingMiddleware,
};
use dotenv::dotenv;
use tracing_actix_web::TracingLogger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let subscriber = get_subscriber("dispatch".to_string(), "info".to_string(), std::io::stdout);
    init_subscriber(subscriber);

    let config = Config::from_env().context("failed to load configuration")?;
    let bind_address = config.bind_address.clone();

    let app_state = AppState::new(config)
        .await
        .context("failed to initialize application state")?;

    tracing::info!(%bind_address, "Starting dispatch server");

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(RequestLoggingMiddleware::new())
            .wrap(TracingLogger::default())
            .configure(handlers::configure_routes)
    })
    .bind(&bind_address)
    .with_context(|| format!("failed to bind {bind_address}"))?
    .run();

    let srv_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Shutdown signal received");
            srv_handle.stop(true).await;
        }
        res = server_task => {
            match res {
                Ok(Err(e)) => tracing::error!(error = %e, "Server exited with error"),
                Err(e) => tracing::error!(error = %e, "Server task failed"),
                Ok(Ok(())) => {}
            }
        }
    }

    Ok(())
}
