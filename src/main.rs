// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use company_insights::config::parse_delimiter;
use company_insights::{
    load_datasets, CompanyDetailReport, DashboardReport, Datasets, InsightsConfig, LoadOptions,
};

#[derive(Parser)]
#[command(name = "company-insights")]
#[command(about = "Company lifecycle and transaction insights from two CSV files")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Companies CSV (overrides configuration)
    #[arg(long, global = true)]
    companies: Option<PathBuf>,

    /// Transactions CSV (overrides configuration)
    #[arg(long, global = true)]
    transactions: Option<PathBuf>,

    /// Field delimiter: a single character, or tab/comma/semicolon/pipe
    #[arg(long, global = true)]
    delimiter: Option<String>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Overview KPIs, stage distribution and volume by transaction type
    Summary,

    /// Detail report for one company
    Company {
        /// Company identifier (ID column)
        id: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match &cli.command {
        Some(Commands::Summary) => run_summary(&config, cli.json),
        Some(Commands::Company { id }) => run_company(&config, id, cli.json),
        // UI mode (default)
        None => run_ui_mode(config),
    }
}

fn resolve_config(cli: &Cli) -> Result<InsightsConfig> {
    let mut config = InsightsConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(path) = &cli.companies {
        config.data.companies = path.clone();
    }
    if let Some(path) = &cli.transactions {
        config.data.transactions = path.clone();
    }
    if let Some(raw) = &cli.delimiter {
        config.delimiter = Some(parse_delimiter(raw).context("Invalid --delimiter")?);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn load(config: &InsightsConfig) -> Result<Datasets> {
    let options = LoadOptions::with_delimiter(config.delimiter);
    load_datasets(&config.data, &options).with_context(|| {
        format!(
            "Failed to load datasets ({} + {})",
            config.data.companies.display(),
            config.data.transactions.display()
        )
    })
}

fn run_summary(config: &InsightsConfig, json: bool) -> Result<()> {
    let data = load(config)?;
    let report = DashboardReport::from_datasets(&data, &config.limits);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let currency = &config.currency;
    println!("📊 Company Insights - Overview");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🏢 Companies:      {}", report.kpis.total_companies);
    println!("⚠️  At risk:        {}", report.kpis.at_risk);
    println!("📈 Monthly growth: {}", report.kpis.growth_label);

    println!("\n🏷️  Lifecycle stages:");
    for share in &report.stage_distribution {
        println!("   {:<10} {:>5}  ({}%)", share.stage, share.count, share.percent);
    }

    println!("\n💸 Volume by transaction type:");
    for entry in &report.volume_by_type {
        println!("   {:<20} {:>20}", entry.label, currency.format(Some(entry.value)));
    }

    println!("\n📋 Companies:");
    for company in &report.featured {
        println!(
            "   {:<20} {}",
            company.id,
            company.sector.as_deref().unwrap_or(company_insights::report::MISSING)
        );
    }

    Ok(())
}

fn run_company(config: &InsightsConfig, id: &str, json: bool) -> Result<()> {
    let data = load(config)?;
    let report = CompanyDetailReport::from_datasets(id, &data, &config.limits);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if !report.found {
        eprintln!("⚠️  Company {} not found in {}", id, config.data.companies.display());
    }

    let currency = &config.currency;
    let cards = report.cards(currency);
    println!("🏢 Company {}", report.id);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("💰 Balance:          {}", cards.balance);
    println!("📉 Avg net flow:     {}", cards.average_net_flow);
    println!("🏷️  Stage:            {}", cards.lifecycle);
    println!("🏭 CNAE:             {}", cards.sector);

    println!("\n📅 Monthly net flow:");
    for point in &report.net_flow {
        println!("   {}  {:>20}", point.label, currency.format(Some(point.value)));
    }

    println!("\n🤝 Main relationships:");
    for counterparty in &report.counterparties {
        println!(
            "   {:<20} {:>20}",
            counterparty.id,
            currency.format(Some(counterparty.total))
        );
    }

    println!("\n🔎 Similar companies:");
    for company in &report.similar {
        let stage = company
            .lifecycle
            .map(|s| s.label())
            .unwrap_or(company_insights::report::MISSING);
        println!("   {:<20} {}", company.id, stage);
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: InsightsConfig) -> Result<()> {
    println!("🖥️  Loading Company Insights dashboard...\n");

    let data = load(&config)?;
    println!(
        "✓ Loaded {} companies and {} transactions\n",
        data.companies.len(),
        data.transactions.len()
    );
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(config, data);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: InsightsConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: company-insights summary");
    std::process::exit(1);
}
