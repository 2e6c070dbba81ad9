use std::sync::Arc;

use backend::{AppState, config::Config, create_router, planner::Planner};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    let settings = config.settings();
    tracing::info!(
        "upstreams: wiki={} osrm={} ({}) geocoder={}",
        settings.wiki_url,
        settings.osrm_url,
        settings.osrm_profile,
        settings.geocode_url
    );
    match &settings.t5_url {
        Some(url) => tracing::info!("T5 model at {url}"),
        None => tracing::warn!("T5_URL not set, t-5 queries use the rule parser"),
    }
    if settings.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set, gemini queries use the rule parser");
    }

    let state = AppState {
        planner: Arc::new(Planner::new(&settings)?),
    };
    let app = create_router(state);

    tracing::info!("starting backend on http://{}", config.bind);
    tracing::info!("API endpoints:");
    tracing::info!("  GET / - Health ping");
    tracing::info!("  GET /getmap?query=..&model=.. - Start, end and sampled direct route");
    tracing::info!("  GET /api/plan?query=..&model=.. - Trip with stops and itinerary");

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
