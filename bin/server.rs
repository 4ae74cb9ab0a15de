// Company Insights - Web Server
// Dashboard and company detail reports over HTTP

use anyhow::{Context, Result};
use company_insights::api::router;
use company_insights::InsightsConfig;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    println!("🌐 Company Insights - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Optional config file as the only argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = InsightsConfig::load(config_path.as_deref())
        .context("Failed to load configuration")?;

    println!("✓ Companies:    {}", config.data.companies.display());
    println!("✓ Transactions: {}", config.data.transactions.display());
    if !config.data.companies.exists() || !config.data.transactions.exists() {
        log::warn!("A dataset file is missing; requests will answer 503 until it exists");
    }

    let addr = config.bind_addr.clone();
    let app = router(config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/dashboard", addr);
    println!("        http://{}/api/company?id=<ID>", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
