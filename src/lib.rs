// Company Insights - Core Library
// Loads the company and transaction datasets and builds the dashboard reports
// used by the CLI, the terminal UI and the API server.

pub mod coercion;
pub mod error;
pub mod config;
pub mod loader;
pub mod classifier;
pub mod aggregator;
pub mod format;
pub mod report;
pub mod render;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use coercion::{parse_amount, parse_date, DateValue};
pub use error::{InsightsError, Result};
pub use config::{DataPaths, InsightsConfig, ReportLimits};
pub use loader::{
    load_companies, load_datasets, load_transactions, CompanyRecord, Datasets, LoadOptions,
    TransactionRecord,
};
pub use classifier::{classify, quantile, LifecycleStage, RevenueThresholds};
pub use aggregator::{group_count, group_sum, growth_rate, monthly_net_flow, GrowthRate};
pub use format::{format_brl, CurrencyFormat};
pub use report::{CompanyDetailReport, DashboardReport};
pub use render::{Chart, ChartSlot, RenderContext};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
