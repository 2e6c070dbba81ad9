use std::path::PathBuf;

use backend::{config::Config, models::ModelKind, planner::Planner};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Plan a trip from a free-text query and print the itinerary"
)]
struct Args {
    /// Travel request, e.g. "from Lahore to Islamabad"
    query: String,

    /// t-5, gemini or rules
    #[arg(long, default_value = "rules")]
    model: ModelKind,

    /// Print the whole plan as JSON instead of the itinerary
    #[arg(long)]
    json: bool,

    /// Write the trip as a GPX file
    #[arg(long)]
    gpx: Option<PathBuf>,

    #[command(flatten)]
    config: Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let planner = Planner::new(&args.config.settings())?;
    let plan = planner.plan(&args.query, args.model).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        for line in &plan.itinerary {
            println!("- {line}");
        }
        println!(
            "\n{:.1} km, about {:.0} min, {} stops",
            plan.distance_km,
            plan.duration_min,
            plan.stops.len()
        );
    }

    if let Some(path) = &args.gpx {
        std::fs::write(path, BASE64.decode(&plan.gpx_base64)?)?;
        tracing::info!("GPX written to {}", path.display());
    }

    Ok(())
}
