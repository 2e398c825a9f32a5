use backend::startup;
use tracing::{error, info};

mod telemetry;

#[tokio::main]
async fn main() {
    // Load `.env` in local development; deployments set the variables directly.
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let state = match startup().await {
        Ok(state) => state,
        Err(e) => {
            error!(code = e.code(), error = %e, "startup failed");
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    info!(
        bind = %state.config.bind_address(),
        mode = %state.config.server.mode,
        "ech0 backend ready"
    );
    println!("✅ Ech0 backend ready on {}", state.config.bind_address());

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }

    info!("shutting down");
    if let Err(e) = state.db.close().await {
        error!(error = %e, "failed to close database pool");
    }
}
