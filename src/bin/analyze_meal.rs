//! One-shot meal analysis from the command line
//!
//! Selects a patient, uploads one meal photo and prints the dashboard.
//!
//! ```text
//! analyze_meal 3 ./lunch.jpg
//! analyze_meal --api-url https://api.example.com/default 3 ./lunch.jpg --json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use nutriview::api::HttpBackend;
use nutriview::config::ClientConfig;
use nutriview::session::{AnalysisSessionController, SubmitOutcome};
use nutriview::tools::dashboard;

#[derive(Parser)]
#[command(
    name = "analyze_meal",
    about = "Analyze one meal photo for a patient and print the nutrient dashboard"
)]
struct AnalyzeArgs {
    /// Patient user id
    user_id: i64,

    /// Path to the meal photo
    image: PathBuf,

    /// Backend base URL (overrides NUTRIVIEW_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Request timeout in seconds (overrides NUTRIVIEW_REQUEST_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print the dashboard as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = AnalyzeArgs::parse();

    let directive = if args.verbose {
        "nutriview=debug"
    } else {
        "nutriview=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env()?
        .with_overrides(args.api_url.as_deref(), args.timeout_secs)?;
    let backend = Arc::new(HttpBackend::new(&config)?);
    let session = AnalysisSessionController::new(backend);

    // The target patient is selected below; without a list any id is accepted
    if let Err(e) = session.fetch_patients().await {
        warn!("Could not load patients: {}", e);
    }

    session.select_patient(args.user_id).await?;
    session.attach_file(&args.image)?;
    let outcome = session.submit_analysis().await;

    let view = dashboard::build_dashboard(&session.snapshot());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", dashboard::render_text(&view));
    }

    match outcome {
        SubmitOutcome::Failed { message } | SubmitOutcome::Unconfirmed { message } => {
            Err(message.into())
        }
        _ => Ok(()),
    }
}
