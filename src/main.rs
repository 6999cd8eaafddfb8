//! NutriView
//!
//! An MCP server for clinical meal-photo analysis.

use std::sync::Arc;

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use nutriview::api::HttpBackend;
use nutriview::build_info;
use nutriview::config::ClientConfig;
use nutriview::mcp::NutriViewService;
use nutriview::session::AnalysisSessionController;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (output to stderr to not interfere with MCP stdio)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nutriview=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env()?;

    // Print startup banner to stderr
    build_info::print_startup_banner(&config);
    eprintln!("Starting MCP server on stdio...");

    let backend = Arc::new(HttpBackend::new(&config)?);
    let session = AnalysisSessionController::new(backend);

    // The server still starts when the backend is down; list_patients retries
    if let Err(e) = session.load_patients().await {
        warn!("Could not load patients at startup: {}", e);
    }

    // Create the NutriView service
    let service = NutriViewService::new(config, session);

    // Create stdio transport
    let transport = (stdin(), stdout());

    // Start the MCP server
    let server = service.serve(transport).await?;

    // Wait for the server to complete
    server.waiting().await?;

    Ok(())
}
