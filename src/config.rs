// Configuration - dataset locations, CSV dialect, report sizes
//
// Layers, lowest to highest precedence:
//   1. built-in defaults
//   2. optional JSON file
//   3. INSIGHTS_* environment variables
//   4. CLI flags (applied by the binaries)

use crate::error::{InsightsError, Result};
use crate::format::CurrencyFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_COMPANIES_PATH: &str = "./data/base1.csv";
pub const DEFAULT_TRANSACTIONS_PATH: &str = "./data/base2.csv";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

pub const ENV_COMPANIES: &str = "INSIGHTS_COMPANIES";
pub const ENV_TRANSACTIONS: &str = "INSIGHTS_TRANSACTIONS";
pub const ENV_DELIMITER: &str = "INSIGHTS_DELIMITER";
pub const ENV_BIND: &str = "INSIGHTS_BIND";

/// Where the two datasets live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub companies: PathBuf,
    pub transactions: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        DataPaths {
            companies: PathBuf::from(DEFAULT_COMPANIES_PATH),
            transactions: PathBuf::from(DEFAULT_TRANSACTIONS_PATH),
        }
    }
}

/// How many rows the overview and detail reports keep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportLimits {
    /// Companies listed on the overview
    pub featured_companies: usize,
    /// Counterparties listed on a company's detail view
    pub top_counterparties: usize,
    /// Same-sector companies listed on a company's detail view
    pub similar_companies: usize,
}

impl Default for ReportLimits {
    fn default() -> Self {
        ReportLimits {
            featured_companies: 8,
            top_counterparties: 5,
            similar_companies: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    pub data: DataPaths,

    /// Field delimiter. None = sniff it from each file's header line.
    pub delimiter: Option<char>,

    pub limits: ReportLimits,

    pub currency: CurrencyFormat,

    /// Address the API server listens on
    pub bind_addr: String,

    /// Directory served under /static by the API server
    pub static_dir: PathBuf,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        InsightsConfig {
            data: DataPaths::default(),
            delimiter: None,
            limits: ReportLimits::default(),
            currency: CurrencyFormat::default(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            static_dir: PathBuf::from("web"),
        }
    }
}

impl InsightsConfig {
    /// Load configuration from a JSON file. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            InsightsError::Config(format!("failed to read {:?}: {}", path.as_ref(), e))
        })?;

        let config: InsightsConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, optionally a JSON file, then environment overrides.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply INSIGHTS_* overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_COMPANIES) {
            self.data.companies = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_TRANSACTIONS) {
            self.data.transactions = PathBuf::from(path);
        }
        if let Some(raw) = lookup(ENV_DELIMITER) {
            self.delimiter = Some(parse_delimiter(&raw)?);
        }
        if let Some(addr) = lookup(ENV_BIND) {
            self.bind_addr = addr;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(delimiter) = self.delimiter {
            if !delimiter.is_ascii() {
                return Err(InsightsError::Config(format!(
                    "delimiter must be a single ASCII character, got {:?}",
                    delimiter
                )));
            }
        }
        if self.currency.decimals > 6 {
            return Err(InsightsError::Config(
                "currency.decimals must be at most 6".to_string(),
            ));
        }
        Ok(())
    }
}

/// Accepts a literal character or the names "tab", "comma", "semicolon", "pipe".
pub fn parse_delimiter(raw: &str) -> Result<char> {
    match raw.to_lowercase().as_str() {
        "tab" | "\\t" => return Ok('\t'),
        "comma" => return Ok(','),
        "semicolon" => return Ok(';'),
        "pipe" => return Ok('|'),
        _ => {}
    }

    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c),
        _ => Err(InsightsError::Config(format!("invalid delimiter: {:?}", raw))),
    }
}

// ============================================================================
// TESTS
// ============================================================================
